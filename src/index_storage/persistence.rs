//! Versioned index persistence with TTL and incremental cleanup
//!
//! Each index version occupies three store entries:
//! - `<index_prefix><version>`: primary index as JSON `[[key, [entry, ...]], ...]`
//! - `<index_prefix>alias_<version>`: alias index as JSON `[[alias, key], ...]`
//! - `<meta_prefix><version>`: [`CacheMetadata`]
//!
//! Persistence is an optimization. Every public operation logs and swallows
//! storage errors; callers only ever see "nothing cached".

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::metadata::CacheMetadata;
use super::store::SharedStore;
use crate::config::IndexConfig;
use crate::models::{BuildStats, ImageIndex, IndexEntry};

/// An index read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredIndex {
    pub version: String,
    pub index: ImageIndex,
    pub metadata: CacheMetadata,
}

/// What a save attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { bytes: usize, purged: usize },
    SkippedTooLarge { bytes: usize },
    Failed,
}

pub struct IndexPersistence {
    store: SharedStore,
    index_prefix: String,
    meta_prefix: String,
    ttl: Duration,
    cleanup_horizon: Duration,
    max_payload_bytes: usize,
}

impl IndexPersistence {
    pub fn new(store: SharedStore, config: &IndexConfig) -> Self {
        Self {
            store,
            index_prefix: config.index_prefix.clone(),
            meta_prefix: config.meta_prefix.clone(),
            ttl: config.ttl,
            cleanup_horizon: config.cleanup_horizon,
            max_payload_bytes: config.max_payload_bytes,
        }
    }

    fn index_key(&self, version: &str) -> String {
        format!("{}{}", self.index_prefix, version)
    }

    fn alias_key(&self, version: &str) -> String {
        format!("{}alias_{}", self.index_prefix, version)
    }

    fn meta_key(&self, version: &str) -> String {
        format!("{}{}", self.meta_prefix, version)
    }

    /// Persist `index` under `version`, then purge records past the cleanup horizon
    pub fn save(&self, version: &str, index: &ImageIndex, stats: &BuildStats) -> SaveOutcome {
        self.save_at(version, index, stats, Utc::now())
    }

    pub fn save_at(
        &self,
        version: &str,
        index: &ImageIndex,
        stats: &BuildStats,
        now: DateTime<Utc>,
    ) -> SaveOutcome {
        match self.try_save(version, index, stats, now) {
            Ok(SaveOutcome::Saved { bytes, .. }) => {
                let purged = self.cleanup_at(now);
                info!(version, bytes, purged, "persisted image index");
                SaveOutcome::Saved { bytes, purged }
            }
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(version, error = %format!("{:#}", e), "failed to persist image index");
                self.discard(version);
                SaveOutcome::Failed
            }
        }
    }

    fn try_save(
        &self,
        version: &str,
        index: &ImageIndex,
        stats: &BuildStats,
        now: DateTime<Utc>,
    ) -> Result<SaveOutcome> {
        let primary: Vec<(&str, &[IndexEntry])> = index.iter().collect();
        let aliases: Vec<(&str, &str)> = index.aliases().collect();

        let primary_json = serde_json::to_string(&primary).context("Failed to serialize index")?;
        let alias_json = serde_json::to_string(&aliases).context("Failed to serialize aliases")?;

        let bytes = primary_json.len() + alias_json.len();
        if bytes > self.max_payload_bytes {
            info!(
                version,
                bytes,
                limit = self.max_payload_bytes,
                "index too large to persist, keeping it in memory only"
            );
            return Ok(SaveOutcome::SkippedTooLarge { bytes });
        }

        let metadata = CacheMetadata::new(version, stats, now);
        let metadata_json =
            serde_json::to_string(&metadata).context("Failed to serialize metadata")?;

        // Metadata goes last: a record only counts once it exists
        self.store.set(&self.index_key(version), &primary_json)?;
        self.store.set(&self.alias_key(version), &alias_json)?;
        self.store.set(&self.meta_key(version), &metadata_json)?;

        Ok(SaveOutcome::Saved { bytes, purged: 0 })
    }

    /// Best-effort removal of a version's entries
    fn discard(&self, version: &str) {
        for key in [self.meta_key(version), self.index_key(version), self.alias_key(version)] {
            if let Err(e) = self.store.remove(&key) {
                debug!(key = %key, error = %e, "failed to remove store entry");
            }
        }
    }

    /// Restore `version` only if it was built less than the TTL ago
    pub fn load_if_fresh(&self, version: &str) -> Option<RestoredIndex> {
        self.load_if_fresh_at(version, Utc::now())
    }

    pub fn load_if_fresh_at(&self, version: &str, now: DateTime<Utc>) -> Option<RestoredIndex> {
        let metadata = match self.read_metadata(&self.meta_key(version)) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => return None,
            Err(e) => {
                warn!(version, error = %format!("{:#}", e), "unreadable cache metadata");
                return None;
            }
        };

        if !metadata.is_fresh(now, self.ttl) {
            debug!(version, age_ms = metadata.age_millis(now), "cached index expired");
            return None;
        }

        self.restore_logged(metadata)
    }

    /// Restore the newest stored version that reads back cleanly, ignoring the TTL
    ///
    /// Used when the network is unavailable: stale data beats no data.
    pub fn load_any_fallback(&self) -> Option<RestoredIndex> {
        self.newest_first()?.into_iter().find_map(|metadata| self.restore_logged(metadata))
    }

    /// Metadata of the most recently saved version, without reading its payload
    pub fn latest_metadata(&self) -> Option<CacheMetadata> {
        self.newest_first()?.into_iter().next()
    }

    fn newest_first(&self) -> Option<Vec<CacheMetadata>> {
        let mut records = match self.list_metadata() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "failed to list cached indexes");
                return None;
            }
        };

        // Ties broken by version for a deterministic pick
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.version.cmp(&b.version)));
        Some(records)
    }

    /// Delete every record older than the cleanup horizon with its payloads
    pub fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let records = match self.list_metadata() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "failed to list cached indexes for cleanup");
                return 0;
            }
        };

        let mut purged = 0;
        for metadata in records.into_iter().filter(|m| m.is_expired(now, self.cleanup_horizon)) {
            debug!(version = %metadata.version, "purging expired cached index");
            self.discard(&metadata.version);
            purged += 1;
        }
        purged
    }

    /// Versions currently stored, in key order
    pub fn stored_versions(&self) -> Vec<String> {
        self.list_metadata()
            .map(|records| records.into_iter().map(|m| m.version).collect())
            .unwrap_or_default()
    }

    fn read_metadata(&self, key: &str) -> Result<Option<CacheMetadata>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        let metadata =
            serde_json::from_str(&raw).with_context(|| format!("Failed to parse metadata {}", key))?;
        Ok(Some(metadata))
    }

    fn list_metadata(&self) -> Result<Vec<CacheMetadata>> {
        let mut records = Vec::new();
        for key in self.store.keys()? {
            if !key.starts_with(&self.meta_prefix) {
                continue;
            }
            match self.read_metadata(&key) {
                Ok(Some(metadata)) => records.push(metadata),
                Ok(None) => {}
                Err(e) => debug!(key = %key, error = %format!("{:#}", e), "skipping unreadable metadata"),
            }
        }
        Ok(records)
    }

    fn restore_logged(&self, metadata: CacheMetadata) -> Option<RestoredIndex> {
        match self.restore(&metadata.version) {
            Ok(Some(index)) => Some(RestoredIndex { version: metadata.version.clone(), index, metadata }),
            Ok(None) => {
                debug!(version = %metadata.version, "cached index payload missing");
                None
            }
            Err(e) => {
                warn!(version = %metadata.version, error = %format!("{:#}", e), "corrupt cached index");
                None
            }
        }
    }

    fn restore(&self, version: &str) -> Result<Option<ImageIndex>> {
        let Some(primary_json) = self.store.get(&self.index_key(version))? else {
            return Ok(None);
        };
        let primary: Vec<(String, Vec<IndexEntry>)> =
            serde_json::from_str(&primary_json).context("Failed to deserialize index")?;

        // A missing alias payload only loses aliases
        let aliases: Vec<(String, String)> = match self.store.get(&self.alias_key(version))? {
            Some(alias_json) => {
                serde_json::from_str(&alias_json).context("Failed to deserialize aliases")?
            }
            None => Vec::new(),
        };

        Ok(Some(ImageIndex::from_pairs(primary, aliases)))
    }
}
