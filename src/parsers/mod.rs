//! Parsing helpers for the remote image tree
//!
//! # Error Handling Strategy
//!
//! Remote payloads are treated as untrusted and partially broken by default:
//!
//! - **Node-level failures**: a folder or file with the wrong shape is dropped by the
//!   lenient deserializers; its siblings are still parsed.
//! - **Field-level failures**: wrong-typed or blank optional fields become `None`
//!   (or `0` for sizes) rather than errors.
//! - **Payload-level failures**: only a body that is not JSON at all fails the parse,
//!   and that error propagates to the build caller.

pub mod deserializers;
pub mod key;

pub use key::{extract_key, normalize_query};
