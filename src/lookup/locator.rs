//! The image locator: owns the active index and resolves keys to URLs
//!
//! # Error Handling Strategy
//!
//! - **Build failures** (network, parse) are caught in [`ImageLocator::build_index`]
//!   and turned into a [`BuildOutcome`] with `success: false`, after trying any
//!   cached version regardless of age.
//! - **Lookup failures** never surface: each failing tier degrades to the next one
//!   and the last one degrades to an empty result.
//! - **Persistence failures** are logged by the storage layer and ignored here.

use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::events::{BuildOutcome, IndexEvent, UpdateCheck};
use super::tiers::{resolve_exact, resolve_local};
use crate::config::IndexConfig;
use crate::index_storage::{IndexPersistence, SharedStore};
use crate::indexer::fetch_and_build;
use crate::models::{BuildStats, ImageIndex};
use crate::parsers::normalize_query;
use crate::source::SharedSource;
use crate::watcher::{VersionWatcher, WatcherHandle};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Index snapshot swapped in as a whole after each successful build
#[derive(Debug, Default)]
struct ActiveIndex {
    version: Option<String>,
    index: ImageIndex,
    stats: BuildStats,
}

pub struct ImageLocator {
    source: SharedSource,
    persistence: IndexPersistence,
    config: IndexConfig,
    active: RwLock<Arc<ActiveIndex>>,
    events: broadcast::Sender<IndexEvent>,
}

impl ImageLocator {
    pub fn new(source: SharedSource, store: SharedStore, config: IndexConfig) -> Self {
        let persistence = IndexPersistence::new(store, &config);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            source,
            persistence,
            config,
            active: RwLock::new(Arc::new(ActiveIndex::default())),
            events,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Receive build and update notifications
    pub fn subscribe(&self) -> broadcast::Receiver<IndexEvent> {
        self.events.subscribe()
    }

    /// Number of keys in the active index
    pub fn index_size(&self) -> usize {
        self.snapshot().index.len()
    }

    pub fn alias_count(&self) -> usize {
        self.snapshot().index.alias_count()
    }

    /// Number of image entries across all keys
    pub fn file_count(&self) -> usize {
        self.snapshot().index.file_count()
    }

    /// Version of the tree the active index was built from
    pub fn held_version(&self) -> Option<String> {
        self.snapshot().version.clone()
    }

    /// Versions with a persisted index, in store order
    pub fn cached_versions(&self) -> Vec<String> {
        self.persistence.stored_versions()
    }

    /// When the newest persisted index was saved
    pub fn last_cached_at(&self) -> Option<DateTime<Utc>> {
        self.persistence.latest_metadata().and_then(|metadata| metadata.built_at())
    }

    /// Drop the active index and forget the held version
    pub fn teardown(&self) {
        self.install(None, ImageIndex::new(), BuildStats::default());
    }

    fn snapshot(&self) -> Arc<ActiveIndex> {
        let guard = self.active.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn install(&self, version: Option<String>, index: ImageIndex, stats: BuildStats) {
        let next = Arc::new(ActiveIndex { version, index, stats });
        let mut guard = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
    }

    pub(crate) fn notify(&self, event: IndexEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Make an index available, from memory, local cache or the remote tree
    ///
    /// With `force`, the freshness checks are skipped and the tree is always
    /// fetched. Never returns an error; failures are reported in the outcome.
    pub async fn build_index(&self, force: bool) -> BuildOutcome {
        self.notify(IndexEvent::BuildStarted { force });

        let outcome = match self.try_build(force).await {
            Ok(outcome) => outcome,
            Err(e) => self.recover_from_build_error(e),
        };

        if outcome.success {
            self.notify(IndexEvent::BuildSucceeded {
                from_cache: outcome.from_cache,
                is_fallback: outcome.is_fallback,
                stats: outcome.stats,
            });
        } else {
            self.notify(IndexEvent::BuildFailed { error: outcome.error.clone().unwrap_or_default() });
        }
        outcome
    }

    async fn try_build(&self, force: bool) -> Result<BuildOutcome> {
        let version = self.source.fetch_version().await.context("Failed to fetch tree version")?;

        if !force {
            let active = self.snapshot();
            if active.version.as_deref() == Some(version.as_str()) && !active.index.is_empty() {
                debug!(version = %version, "active index is current");
                return Ok(BuildOutcome::cached(active.stats));
            }

            if let Some(restored) = self.persistence.load_if_fresh(&version) {
                let stats = restored.metadata.stats();
                info!(version = %version, keys = restored.index.len(), "restored image index from cache");
                self.install(Some(version), restored.index, stats);
                return Ok(BuildOutcome::cached(stats));
            }
        }

        let built = fetch_and_build(self.source.as_ref(), &self.config.url_template).await?;
        self.persistence.save(&version, &built.index, &built.stats);
        self.install(Some(version), built.index, built.stats);
        Ok(BuildOutcome::built(built.stats))
    }

    fn recover_from_build_error(&self, error: anyhow::Error) -> BuildOutcome {
        let message = format!("{:#}", error);
        warn!(error = %message, "image index build failed");

        // An index already in memory is at least as new as anything cached
        if !self.snapshot().index.is_empty() {
            return BuildOutcome::failed(message);
        }

        match self.persistence.load_any_fallback() {
            Some(restored) => {
                let stats = restored.metadata.stats();
                info!(version = %restored.version, "serving cached image index while the source is unavailable");
                self.install(Some(restored.version), restored.index, stats);
                BuildOutcome::fallback(stats)
            }
            None => BuildOutcome::failed(message),
        }
    }

    /// Resolve a plaza key (or alias, or key fragment) to image URLs
    ///
    /// Tiers, in order: exact key, alias, fuzzy substring, rebuild-and-retry when
    /// the remote version moved, then the source's single-key lookup. A miss on
    /// every tier is an empty vector.
    pub async fn find_image_urls(&self, key: &str) -> Vec<String> {
        let query = normalize_query(key);
        if query.is_empty() {
            return Vec::new();
        }

        if self.snapshot().index.is_empty() {
            let outcome = self.build_index(false).await;
            if !outcome.success {
                debug!(key = %query, "no index available, using single-key lookup");
                return self.lookup_remote(key).await;
            }
        }

        let active = self.snapshot();
        if let Some(resolution) = resolve_local(&active.index, key) {
            debug!(key = %query, tier = ?resolution.tier, matched = resolution.key, "resolved from index");
            return resolution.urls();
        }

        if let Some(urls) = self.retry_after_refresh(key, active.version.as_deref()).await {
            return urls;
        }

        self.lookup_remote(key).await
    }

    /// Rebuild once when the remote version differs from `held`, then retry the exact tier
    async fn retry_after_refresh(&self, key: &str, held: Option<&str>) -> Option<Vec<String>> {
        let remote = match self.source.fetch_version().await {
            Ok(remote) => remote,
            Err(e) => {
                debug!(error = %format!("{:#}", e), "version check failed during lookup");
                return None;
            }
        };
        if held == Some(remote.as_str()) {
            return None;
        }

        info!(held = ?held, remote = %remote, "image index is stale, rebuilding");
        if !self.build_index(true).await.success {
            return None;
        }

        let active = self.snapshot();
        resolve_exact(&active.index, key)
            .filter(|resolution| !resolution.entries.is_empty())
            .map(|resolution| resolution.urls())
    }

    async fn lookup_remote(&self, key: &str) -> Vec<String> {
        match self.source.lookup_single(key.trim()).await {
            Ok(urls) => urls,
            Err(e) => {
                warn!(key = key.trim(), error = %format!("{:#}", e), "single-key lookup failed");
                Vec::new()
            }
        }
    }

    /// Compare the remote version with the held one
    pub async fn check_for_update(&self) -> UpdateCheck {
        match self.source.fetch_version().await {
            Ok(remote) => {
                if self.snapshot().version.as_deref() == Some(remote.as_str()) {
                    UpdateCheck::unchanged()
                } else {
                    UpdateCheck { needs_update: true, new_version: Some(remote) }
                }
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "version check failed");
                UpdateCheck::unchanged()
            }
        }
    }

    /// Compare the remote version with the newest persisted index, without building
    ///
    /// With nothing persisted any remote version counts as an update.
    pub async fn check_cached_version(&self) -> UpdateCheck {
        let remote = match self.source.fetch_version().await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "version check failed");
                return UpdateCheck::unchanged();
            }
        };

        match self.persistence.latest_metadata() {
            Some(metadata) if metadata.version == remote => UpdateCheck::unchanged(),
            _ => UpdateCheck { needs_update: true, new_version: Some(remote) },
        }
    }

    /// Poll the remote version every `poll_interval` and rebuild on change
    pub fn start_auto_refresh(self: &Arc<Self>) -> WatcherHandle {
        VersionWatcher::new(Arc::clone(self)).start(self.config.poll_interval)
    }
}
