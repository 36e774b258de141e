use chrono::{DateTime, Utc};

use crate::models::job::{DEFAULT_LOCATION, DEFAULT_ORGANIZATION, DEFAULT_TITLE, Job};

/// Best-effort fields as one adapter recovered them, before canonical
/// defaults and timestamps are applied.
#[derive(Debug, Default)]
pub struct RawJob {
    pub source_id: String,
    pub title: Option<String>,
    pub organization: Option<String>,
    pub location: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub date_posted: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub salary: Option<String>,
    pub country_slug: Option<String>,
}

/// Derive the canonical id for an upstream item: every non-alphanumeric
/// byte of the source id becomes `_`, prefixed with the source name.
/// Same (source, source_id) always yields the same id; source ids that
/// differ only in punctuation may collide, which is an accepted risk.
pub fn canonical_id(source: &str, source_id: &str) -> String {
    let slug: String = source_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{source}_{slug}")
}

/// Apply canonical defaults and timestamps, guaranteeing schema
/// uniformity regardless of source quirks.
pub fn normalize(source: &str, raw: RawJob) -> Job {
    let now = Utc::now();
    Job {
        id: canonical_id(source, &raw.source_id),
        source: source.to_string(),
        source_id: raw.source_id,
        title: non_empty(raw.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        organization: non_empty(raw.organization)
            .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string()),
        location: non_empty(raw.location).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        link: raw.link.unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        date_posted: raw.date_posted.unwrap_or(now),
        date_added: now,
        last_updated: now,
        tags: raw.tags,
        salary: raw.salary.unwrap_or_default(),
        country_slug: raw.country_slug,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
