//! Companion-file persistence for the index and its id mapping.
//!
//! A persisted collection is two files written and read together:
//! `<collection>.ivf` (the serialized index, centroids included) and
//! `<collection>.ids` (the slot ↔ remote-id mapping). Absence of either,
//! a header mismatch, a decode failure, or an inconsistency between the
//! two yields [`IndexError::Corrupt`], which callers treat as "rebuild
//! from the remote store" — never as a partial load.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::{AnnIndex, IdMap, IndexError, IndexResult};

const MAGIC: &[u8; 4] = b"FSIX";
const VERSION: u8 = 1;

/// Path of the serialized index blob for a collection.
pub fn index_path(dir: &Path, collection: &str) -> PathBuf {
    dir.join(format!("{}.ivf", collection))
}

/// Path of the serialized mapping blob for a collection.
pub fn map_path(dir: &Path, collection: &str) -> PathBuf {
    dir.join(format!("{}.ids", collection))
}

/// Persist index and mapping for a collection.
pub fn save(dir: &Path, collection: &str, index: &AnnIndex, map: &IdMap) -> IndexResult<()> {
    std::fs::create_dir_all(dir)?;
    write_blob(&index_path(dir, collection), index)?;
    write_blob(&map_path(dir, collection), map)?;
    Ok(())
}

/// Load index and mapping for a collection, verifying their consistency.
pub fn load(dir: &Path, collection: &str) -> IndexResult<(AnnIndex, IdMap)> {
    let index_file = index_path(dir, collection);
    let map_file = map_path(dir, collection);

    if !index_file.exists() || !map_file.exists() {
        return Err(IndexError::Corrupt("companion file missing".to_string()));
    }

    let index: AnnIndex = read_blob(&index_file)?;
    let map: IdMap = read_blob(&map_file)?;

    if !map.is_consistent() {
        return Err(IndexError::Corrupt("id mapping is not a bijection".to_string()));
    }
    if map.len() != index.ntotal() {
        return Err(IndexError::Corrupt(format!(
            "mapping covers {} slots but index holds {} vectors",
            map.len(),
            index.ntotal()
        )));
    }

    Ok((index, map))
}

fn write_blob<T: serde::Serialize>(path: &Path, value: &T) -> IndexResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(MAGIC)?;
    writer.write_all(&[VERSION])?;
    bincode::serialize_into(&mut writer, value)
        .map_err(|e| IndexError::Corrupt(e.to_string()))?;
    writer.flush()?;
    Ok(())
}

fn read_blob<T: serde::de::DeserializeOwned>(path: &Path) -> IndexResult<T> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut header = [0u8; 5];
    reader
        .read_exact(&mut header)
        .map_err(|e| IndexError::Corrupt(format!("truncated header: {}", e)))?;
    if &header[..4] != MAGIC {
        return Err(IndexError::Corrupt("bad magic".to_string()));
    }
    if header[4] != VERSION {
        return Err(IndexError::Corrupt(format!("unsupported version {}", header[4])));
    }

    bincode::deserialize_from(reader).map_err(|e| IndexError::Corrupt(e.to_string()))
}
