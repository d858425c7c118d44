//! Bidirectional slot ↔ remote-id mapping.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{IndexError, IndexResult};

/// Bijection between local index slots and remote store point ids.
///
/// Slots are dense and assigned sequentially, so the forward direction is a
/// plain vector indexed by slot; the reverse direction is a hash map. The
/// mapping grows in lockstep with the index: `len()` equals the index's
/// `ntotal()` at all times, and it is persisted and loaded together with it.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IdMap {
    slot_to_id: Vec<u64>,
    id_to_slot: HashMap<u64, u32>,
}

impl IdMap {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mapped slots.
    pub fn len(&self) -> usize {
        self.slot_to_id.len()
    }

    /// Whether the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.slot_to_id.is_empty()
    }

    /// Record a new slot → remote-id pair.
    ///
    /// Slots must arrive in sequence (the next unused slot) and neither the
    /// slot nor the remote id may have been recorded before.
    pub fn record(&mut self, slot: u32, remote_id: u64) -> IndexResult<()> {
        if (slot as usize) != self.slot_to_id.len() {
            return Err(IndexError::DuplicateSlot(slot));
        }
        if self.id_to_slot.contains_key(&remote_id) {
            return Err(IndexError::DuplicateId(remote_id));
        }
        self.slot_to_id.push(remote_id);
        self.id_to_slot.insert(remote_id, slot);
        Ok(())
    }

    /// Remote id for a slot, if mapped.
    pub fn remote_id_for(&self, slot: u32) -> Option<u64> {
        self.slot_to_id.get(slot as usize).copied()
    }

    /// Slot for a remote id, if mapped.
    pub fn slot_for(&self, remote_id: u64) -> Option<u32> {
        self.id_to_slot.get(&remote_id).copied()
    }

    /// Check the bijection invariant; used after loading from disk.
    pub fn is_consistent(&self) -> bool {
        if self.slot_to_id.len() != self.id_to_slot.len() {
            return false;
        }
        self.slot_to_id.iter().enumerate().all(|(slot, id)| {
            self.id_to_slot.get(id).copied() == Some(slot as u32)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bijection() {
        let mut map = IdMap::new();
        for (slot, id) in [(0u32, 100u64), (1, 205), (2, 17)] {
            map.record(slot, id).unwrap();
        }

        assert_eq!(map.len(), 3);
        for slot in 0..3u32 {
            let id = map.remote_id_for(slot).unwrap();
            assert_eq!(map.slot_for(id), Some(slot));
        }
        assert!(map.is_consistent());
    }

    #[test]
    fn test_out_of_sequence_slot_rejected() {
        let mut map = IdMap::new();
        map.record(0, 100).unwrap();
        assert!(matches!(map.record(0, 101), Err(IndexError::DuplicateSlot(0))));
        assert!(matches!(map.record(5, 101), Err(IndexError::DuplicateSlot(5))));
    }

    #[test]
    fn test_duplicate_remote_id_rejected() {
        let mut map = IdMap::new();
        map.record(0, 100).unwrap();
        assert!(matches!(map.record(1, 100), Err(IndexError::DuplicateId(100))));
        // The failed insert must not have grown the map
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_missing_keys_are_none() {
        let map = IdMap::new();
        assert_eq!(map.remote_id_for(0), None);
        assert_eq!(map.slot_for(42), None);
    }
}
