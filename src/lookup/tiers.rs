//! In-memory lookup tiers: exact, alias, fuzzy substring
//!
//! All tiers are pure functions over an [`ImageIndex`] snapshot. The network
//! tiers (staleness recovery and single-key fallback) live in the locator.

use crate::models::{ImageIndex, IndexEntry};
use crate::parsers::{extract_key, normalize_query};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Alias,
    Fuzzy,
}

impl MatchTier {
    pub fn is_fuzzy(self) -> bool {
        self == MatchTier::Fuzzy
    }
}

/// A successful in-memory lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub tier: MatchTier,
    pub key: &'a str,
    pub entries: &'a [IndexEntry],
}

impl Resolution<'_> {
    pub fn urls(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.url.clone()).collect()
    }
}

/// Tier 1: exact key match.
///
/// A decorated key such as `MEXICO_I-15-001-09` is also tried in its
/// normalized form.
pub fn resolve_exact<'a>(index: &'a ImageIndex, raw: &str) -> Option<Resolution<'a>> {
    let query = normalize_query(raw);
    if query.is_empty() {
        return None;
    }

    if let Some(resolution) = exact(index, &query) {
        return Some(resolution);
    }

    extract_key(raw).filter(|key| *key != query).and_then(|key| exact(index, &key))
}

fn exact<'a>(index: &'a ImageIndex, key: &str) -> Option<Resolution<'a>> {
    let (key, entries) = index.get_key_value(key)?;
    Some(Resolution { tier: MatchTier::Exact, key, entries })
}

/// Tier 2: alias -> key -> entries. A dangling alias is a miss.
pub fn resolve_alias<'a>(index: &'a ImageIndex, raw: &str) -> Option<Resolution<'a>> {
    let query = normalize_query(raw);
    let target = index.alias_target(&query)?;
    let resolution = exact(index, target)?;
    Some(Resolution { tier: MatchTier::Alias, ..resolution })
}

/// Tier 3: substring match in either direction, closest key length wins.
///
/// Ties keep the first candidate in index order; an equal-length candidate ends
/// the scan.
pub fn resolve_fuzzy<'a>(index: &'a ImageIndex, raw: &str) -> Option<Resolution<'a>> {
    let query = normalize_query(raw);
    if query.is_empty() {
        return None;
    }
    let query_len = query.chars().count();

    let mut best: Option<(usize, &'a str, &'a [IndexEntry])> = None;
    for (key, entries) in index.iter() {
        if entries.is_empty() || !(key.contains(query.as_str()) || query.contains(key)) {
            continue;
        }

        let diff = key.chars().count().abs_diff(query_len);
        if best.is_none_or(|(best_diff, _, _)| diff < best_diff) {
            best = Some((diff, key, entries));
            if diff == 0 {
                break;
            }
        }
    }

    best.map(|(_, key, entries)| Resolution { tier: MatchTier::Fuzzy, key, entries })
}

/// Tiers 1-3 in order, first non-empty hit wins
pub fn resolve_local<'a>(index: &'a ImageIndex, raw: &str) -> Option<Resolution<'a>> {
    resolve_exact(index, raw)
        .or_else(|| resolve_alias(index, raw))
        .or_else(|| resolve_fuzzy(index, raw))
        .filter(|resolution| !resolution.entries.is_empty())
}
