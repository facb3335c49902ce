use serde::Serialize;

use crate::models::BuildStats;

/// Result of [`ImageLocator::build_index`](super::ImageLocator::build_index)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutcome {
    pub success: bool,
    pub from_cache: bool,
    pub is_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<BuildStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BuildOutcome {
    pub fn built(stats: BuildStats) -> Self {
        Self { success: true, from_cache: false, is_fallback: false, stats: Some(stats), error: None }
    }

    pub fn cached(stats: BuildStats) -> Self {
        Self { success: true, from_cache: true, is_fallback: false, stats: Some(stats), error: None }
    }

    pub fn fallback(stats: BuildStats) -> Self {
        Self { success: true, from_cache: true, is_fallback: true, stats: Some(stats), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, from_cache: false, is_fallback: false, stats: None, error: Some(error.into()) }
    }
}

/// Result of a remote version check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCheck {
    pub needs_update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
}

impl UpdateCheck {
    pub fn unchanged() -> Self {
        Self { needs_update: false, new_version: None }
    }
}

/// Status notifications for the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IndexEvent {
    BuildStarted { force: bool },
    BuildSucceeded { from_cache: bool, is_fallback: bool, stats: Option<BuildStats> },
    BuildFailed { error: String },
    UpdateDetected { version: String },
}
