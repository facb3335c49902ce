//! Cache metadata records for freshness and cleanup decisions

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::BuildStats;

/// Metadata stored next to each persisted index version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Build time, Unix milliseconds
    pub timestamp: i64,
    pub version: String,
    pub folders: usize,
    pub files: usize,
}

impl CacheMetadata {
    pub fn new(version: &str, stats: &BuildStats, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now.timestamp_millis(),
            version: version.to_string(),
            folders: stats.folders,
            files: stats.files,
        }
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Age in milliseconds (negative when the record comes from the future)
    pub fn age_millis(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis().saturating_sub(self.timestamp)
    }

    /// Fresh while strictly younger than `ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age_millis(now) < duration_millis(ttl)
    }

    /// Expired once strictly older than `horizon`
    pub fn is_expired(&self, now: DateTime<Utc>, horizon: Duration) -> bool {
        self.age_millis(now) > duration_millis(horizon)
    }

    pub fn stats(&self) -> BuildStats {
        BuildStats { folders: self.folders, files: self.files, regions: 0 }
    }
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    const TTL: Duration = Duration::from_secs(2 * 60 * 60);

    fn record_at(now: DateTime<Utc>) -> CacheMetadata {
        CacheMetadata::new("v1", &BuildStats { folders: 3, files: 9, regions: 1 }, now)
    }

    #[test]
    fn test_fresh_within_ttl() {
        let built = Utc::now();
        let record = record_at(built);
        assert!(record.is_fresh(built, TTL));
        assert!(record.is_fresh(built + TimeDelta::minutes(119), TTL));
    }

    #[test]
    fn test_stale_exactly_at_ttl() {
        let built = Utc::now();
        let record = record_at(built);
        assert!(!record.is_fresh(built + TimeDelta::hours(2), TTL));
        assert!(!record.is_fresh(built + TimeDelta::hours(3), TTL));
    }

    #[test]
    fn test_expiry_horizon() {
        let built = Utc::now();
        let record = record_at(built);
        let week = Duration::from_secs(7 * 24 * 60 * 60);
        assert!(!record.is_expired(built + TimeDelta::days(7), week));
        assert!(record.is_expired(built + TimeDelta::days(7) + TimeDelta::milliseconds(1), week));
    }

    #[test]
    fn test_json_shape() {
        let record = CacheMetadata { timestamp: 1_700_000_000_000, version: "v9".into(), folders: 2, files: 5 };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"timestamp": 1_700_000_000_000i64, "version": "v9", "folders": 2, "files": 5})
        );
        assert_eq!(record.stats().files, 5);
        assert!(record.built_at().is_some());
    }
}
