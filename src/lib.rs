//! Plaza Image Index - find plaza photos by key in a Drive image tree
//!
//! This library turns the remote regions -> folders -> files tree into an in-memory
//! index and answers "which images belong to plaza `I-01-002-03`?" quickly. It
//! supports:
//!
//! - Building a key and alias index from the tree in a single pass
//! - Tiered lookup: exact key, alias, fuzzy substring, stale-version rebuild, and a
//!   remote single-key fallback
//! - Persisting built indexes per version with a freshness window and size ceiling
//! - Polling the remote version and rebuilding in the background
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use plaza_image_index::{FileStore, HttpTreeSource, ImageLocator, IndexConfig};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = IndexConfig::from_env()?;
//! let source = HttpTreeSource::new("https://plazas.example.com", config.http_timeout)?;
//! let store = FileStore::open("/tmp/plaza-index")?;
//! let locator = Arc::new(ImageLocator::new(Arc::new(source), Arc::new(store), config));
//!
//! let outcome = locator.build_index(false).await;
//! println!("Indexed {} keys (cached: {})", locator.index_size(), outcome.from_cache);
//!
//! for url in locator.find_image_urls("I-01-002-03").await {
//!     println!("{}", url);
//! }
//!
//! let watcher = locator.start_auto_refresh();
//! watcher.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod index_storage;
pub mod indexer;
pub mod lookup;
pub mod models;
pub mod parsers;
pub mod source;
pub mod utils;
pub mod watcher;

// Re-export commonly used types
pub use config::IndexConfig;
pub use index_storage::{FileStore, KeyValueStore, MemoryStore};
pub use indexer::build_index;
pub use lookup::{BuildOutcome, ImageLocator, IndexEvent, UpdateCheck};
pub use models::{ImageIndex, IndexEntry, TreePayload};
pub use source::{HttpTreeSource, LocalTreeSource, TreeSource};
pub use watcher::{VersionWatcher, WatcherHandle};
