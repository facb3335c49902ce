//! Remote tree sources
//!
//! The index only talks to the outside world through [`TreeSource`]:
//! - [`HttpTreeSource`]: the dashboard server endpoints
//! - [`LocalTreeSource`]: a `drive_tree.json` file on disk

pub mod http;
pub mod local;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::TreePayload;

pub use http::HttpTreeSource;
pub use local::LocalTreeSource;

#[async_trait]
pub trait TreeSource: Send + Sync {
    /// Opaque token that changes whenever the tree changes
    async fn fetch_version(&self) -> Result<String>;

    /// Full regions -> folders -> files tree
    async fn fetch_tree(&self) -> Result<TreePayload>;

    /// Narrow single-key lookup used as the last resort. Empty on no match.
    async fn lookup_single(&self, key: &str) -> Result<Vec<String>>;
}

pub type SharedSource = Arc<dyn TreeSource>;
