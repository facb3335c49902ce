//! Runtime configuration for the image index
//!
//! Defaults mirror the production constants; each one can be overridden through a
//! `PLAZA_INDEX_*` environment variable.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Maximum age of a persisted index before it must be rebuilt
pub const DEFAULT_TTL: Duration = Duration::from_secs(2 * 60 * 60);
/// Persisted records older than this are purged on the next save
pub const DEFAULT_CLEANUP_HORIZON: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Serialized payloads above this size are kept in memory only (4.5 MiB)
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4 * 1024 * 1024 + 512 * 1024;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_INDEX_PREFIX: &str = "plaza_img_index_";
pub const DEFAULT_META_PREFIX: &str = "plaza_img_meta_";
/// `{id}` is replaced by the percent-encoded file identifier
pub const DEFAULT_URL_TEMPLATE: &str = "https://drive.google.com/uc?id={id}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub ttl: Duration,
    pub cleanup_horizon: Duration,
    pub max_payload_bytes: usize,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub index_prefix: String,
    pub meta_prefix: String,
    pub url_template: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            cleanup_horizon: DEFAULT_CLEANUP_HORIZON,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            poll_interval: DEFAULT_POLL_INTERVAL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            index_prefix: DEFAULT_INDEX_PREFIX.to_string(),
            meta_prefix: DEFAULT_META_PREFIX.to_string(),
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
        }
    }
}

impl IndexConfig {
    /// Load configuration from `PLAZA_INDEX_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64>(&lookup, "PLAZA_INDEX_TTL_SECS")? {
            config.ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "PLAZA_INDEX_CLEANUP_SECS")? {
            config.cleanup_horizon = Duration::from_secs(secs);
        }
        if let Some(bytes) = parse_var::<usize>(&lookup, "PLAZA_INDEX_MAX_PAYLOAD_BYTES")? {
            config.max_payload_bytes = bytes;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "PLAZA_INDEX_POLL_SECS")? {
            config.poll_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "PLAZA_INDEX_HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(prefix) = non_empty(&lookup, "PLAZA_INDEX_PREFIX") {
            config.index_prefix = prefix;
        }
        if let Some(prefix) = non_empty(&lookup, "PLAZA_INDEX_META_PREFIX") {
            config.meta_prefix = prefix;
        }
        if let Some(template) = non_empty(&lookup, "PLAZA_INDEX_URL_TEMPLATE") {
            config.url_template = template;
        }

        Ok(config)
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    non_empty(lookup, name)
        .map(|raw| raw.parse::<T>().with_context(|| format!("Invalid value for {}: {}", name, raw)))
        .transpose()
}
