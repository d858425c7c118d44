//! # Finsearch Web
//!
//! HTTP serving boundary for the finsearch species search engine.
//!
//! ## Quick Start
//!
//! ```bash
//! # Against a Qdrant instance (QDRANT_URL / QDRANT_API_KEY in the environment)
//! cargo run -p finsearch-web -- --port 5001
//!
//! # Self-contained demo without Qdrant
//! cargo run -p finsearch-web -- --in-memory
//! ```
//!
//! ## API Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Liveness check |
//! | GET | `/status` | Mode, counts and sync state |
//! | POST | `/initialize` | Set the operating mode |
//! | POST | `/search` | Text description search |
//! | POST | `/search/image` | Photograph search (raw image body) |
//! | POST | `/rebuild` | Force a full index resync |

pub mod factory;
pub mod routes;
pub mod state;

pub use state::AppState;
