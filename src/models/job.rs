use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel used when a source provides no usable title.
pub const DEFAULT_TITLE: &str = "No title";
/// Sentinel used when a source provides no organization.
pub const DEFAULT_ORGANIZATION: &str = "Unknown";
/// Sentinel used when a source provides no location.
pub const DEFAULT_LOCATION: &str = "Location not specified";

/// Canonical job record. Every source adapter maps its upstream schema
/// into this one shape; text fields are never null, they fall back to
/// the sentinel defaults above.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Deterministically derived from (source, source_id); stable across
    /// repeated syncs so upserts stay idempotent.
    pub id: String,
    pub source: String,
    pub source_id: String,
    pub title: String,
    pub organization: String,
    pub location: String,
    pub link: String,
    pub description: String,
    pub date_posted: DateTime<Utc>,
    /// First-seen timestamp; never changes once the record exists.
    pub date_added: DateTime<Utc>,
    /// Bumped on every re-sync that touches the record.
    pub last_updated: DateTime<Utc>,
    pub tags: Vec<String>,
    /// Formatted "min - max" or single bound; empty when unknown.
    pub salary: String,
    /// Region code the record was fetched under (multi-region source only).
    pub country_slug: Option<String>,
}
