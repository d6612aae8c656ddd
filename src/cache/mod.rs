//! Local persistence for offline support.
//!
//! This module is agnostic of the record shape it stores:
//! - A key-value storage seam (`KeyValueStore`) with SQLite and in-memory backends
//! - A single cache slot holding the last full fetch plus its write time
//! - Provenance metadata (`CacheSource`) describing where returned data came from

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{KeyValueStore, MemoryStorage, SqliteStorage};
pub use traits::{CacheEntry, CacheResult, CacheSource};
