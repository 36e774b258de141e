use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one sync pass, returned to the caller and never persisted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub total_fetched: usize,
    pub by_source: BTreeMap<String, usize>,
    pub storage: StorageOutcome,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
    pub adzuna_countries_used: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Counts from the store-write phase of a sync.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct StorageOutcome {
    pub stored: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Body returned when the run itself cannot proceed (store unreachable).
#[derive(Debug, Serialize)]
pub struct SyncFailure {
    pub success: bool,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl SyncFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}
