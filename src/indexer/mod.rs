//! Index building for the plaza image tree
//!
//! # Error Handling Strategy
//!
//! The indexer degrades gracefully on bad data and fails only on bad transport:
//!
//! - **Folder/file failures**: malformed or unresolvable nodes are skipped and counted,
//!   so one broken folder never hides the rest of the tree.
//!
//! - **Fetch failures**: network or JSON errors from the [`TreeSource`](crate::source::TreeSource)
//!   are returned with context; the caller decides whether to fall back to a cached index.
//!
//! - **Summary reporting**: every build logs region/folder/file/alias counts.

pub mod builder;

pub use builder::{BuiltIndex, build_index, fetch_and_build, synthesize_url};
