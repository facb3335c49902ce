//! Persistent index storage keyed by remote tree version
//!
//! Caches built indexes in a string key-value store for fast startup. Each version
//! keeps three entries (primary index, alias index, metadata); see [`persistence`].
//!
//! Store backends:
//! - [`FileStore`]: one file per key under the cache directory
//! - [`MemoryStore`]: in-process map with an optional quota

pub mod metadata;
pub mod persistence;
pub mod store;

pub use metadata::CacheMetadata;
pub use persistence::{IndexPersistence, RestoredIndex, SaveOutcome};
pub use store::{FileStore, KeyValueStore, MemoryStore, SharedStore};
