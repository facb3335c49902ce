use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One discoverable image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub url: String,
    pub size: u64,
}

/// Normalized key -> images, in remote tree order
pub type PrimaryIndex = IndexMap<String, Vec<IndexEntry>>;

/// Lowercased alias -> primary key
pub type AliasIndex = IndexMap<String, String>;

/// Counters collected while building an index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub folders: usize,
    pub files: usize,
    #[serde(default)]
    pub regions: usize,
}

/// The key->images and alias->key mapping pair.
///
/// Keys and aliases are stored trimmed and lowercased. A key is only present
/// when it has at least one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageIndex {
    primary: PrimaryIndex,
    aliases: AliasIndex,
}

impl ImageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an index from ordered pairs, dropping keys without entries
    pub fn from_pairs(
        primary: impl IntoIterator<Item = (String, Vec<IndexEntry>)>,
        aliases: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut index = Self::new();
        for (key, entries) in primary {
            index.append_entries(&key, entries);
        }
        for (alias, key) in aliases {
            index.insert_alias(&alias, &key);
        }
        index
    }

    /// Append entries under `key`. Empty batches are ignored.
    pub fn append_entries(&mut self, key: &str, entries: Vec<IndexEntry>) {
        if entries.is_empty() {
            return;
        }
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        self.primary.entry(key).or_default().extend(entries);
    }

    /// Record `alias -> key`. Aliases equal to their key are not stored.
    pub fn insert_alias(&mut self, alias: &str, key: &str) {
        let alias = alias.trim().to_lowercase();
        let key = key.trim().to_lowercase();
        if alias.is_empty() || key.is_empty() || alias == key {
            return;
        }
        self.aliases.insert(alias, key);
    }

    pub fn entries(&self, key: &str) -> Option<&[IndexEntry]> {
        self.primary.get(key).map(Vec::as_slice)
    }

    /// Stored key and its entries
    pub fn get_key_value(&self, key: &str) -> Option<(&str, &[IndexEntry])> {
        self.primary.get_key_value(key).map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn alias_target(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[IndexEntry])> {
        self.primary.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, k)| (a.as_str(), k.as_str()))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    pub fn file_count(&self) -> usize {
        self.primary.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }
}
