//! Key lookup against the image index
//!
//! Resolution runs through five tiers, stopping at the first non-empty result:
//!
//! 1. Exact key (normalized, or extracted from a decorated name)
//! 2. Alias -> key
//! 3. Fuzzy substring, closest key length wins
//! 4. Staleness recovery: rebuild once if the remote version moved, retry tier 1
//! 5. The source's single-key lookup
//!
//! Tiers 1-3 are pure functions in [`tiers`]; [`ImageLocator`] owns the index
//! lifecycle and the network tiers.

pub mod events;
pub mod locator;
pub mod tiers;

pub use events::{BuildOutcome, IndexEvent, UpdateCheck};
pub use locator::ImageLocator;
pub use tiers::{MatchTier, Resolution, resolve_alias, resolve_exact, resolve_fuzzy, resolve_local};
