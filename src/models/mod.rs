//! Data models for the plaza image index.
//!
//! - [`TreePayload`] and its nodes - the remote regions -> folders -> files tree
//! - [`ImageIndex`] - the in-memory key->images and alias->key pair
//! - [`IndexEntry`] - one image under a plaza key
//! - [`BuildStats`] - counters reported by a build
//!
//! Tree nodes use lenient serde deserializers (see `parsers::deserializers`) so a
//! malformed folder or file only drops that node.

pub mod index;
pub mod tree;

pub use index::{AliasIndex, BuildStats, ImageIndex, IndexEntry, PrimaryIndex};
pub use tree::{FileNode, FolderNode, RegionNode, TreePayload, TreeRoot, VersionResponse};
