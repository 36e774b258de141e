// Source adapters: one module per upstream kind, plus the declarative
// registry the orchestrator walks. Adding a source means adding a row
// here, not touching orchestration logic.

pub mod adzuna;
pub mod extract;
pub mod feeds;
pub mod reliefweb;

/// Title-splitting heuristics layered on top of the generic feed
/// extraction, per feed family. See `feeds::apply_style`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStyle {
    /// Split the title at the first colon; the remainder becomes the
    /// title and categories are the preferred organization source.
    ColonSplit,
    /// Same colon split, plus a short trailing comma-separated title
    /// segment is treated as the location when none was extracted.
    ColonSplitTrailingLocation,
}

#[derive(Debug, Clone, Copy)]
pub enum SourceKind {
    /// Single-endpoint structured JSON API (ReliefWeb).
    Json,
    /// Paginated JSON API fanned out per country code (Adzuna).
    MultiRegion,
    /// RSS/XML feed with free-text field layouts.
    Feed { url: &'static str, style: FeedStyle },
}

/// Declarative per-source configuration consulted by the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct SourceConfig {
    pub name: &'static str,
    pub enabled: bool,
    pub max_jobs: usize,
    pub kind: SourceKind,
}

pub const REGISTRY: &[SourceConfig] = &[
    SourceConfig {
        name: "reliefweb",
        enabled: true,
        max_jobs: 50,
        kind: SourceKind::Json,
    },
    SourceConfig {
        name: "adzuna",
        enabled: true,
        max_jobs: 50,
        kind: SourceKind::MultiRegion,
    },
    SourceConfig {
        name: "unjobs",
        enabled: true,
        max_jobs: 30,
        kind: SourceKind::Feed {
            url: "https://unjobs.org/new/feed",
            style: FeedStyle::ColonSplit,
        },
    },
    SourceConfig {
        name: "impactpool",
        enabled: true,
        max_jobs: 30,
        kind: SourceKind::Feed {
            url: "https://www.impactpool.org/rss/jobs.rss",
            style: FeedStyle::ColonSplitTrailingLocation,
        },
    },
];

/// Sources the orchestrator will actually invoke.
pub fn enabled_sources() -> impl Iterator<Item = &'static SourceConfig> {
    REGISTRY.iter().filter(|s| s.enabled)
}
