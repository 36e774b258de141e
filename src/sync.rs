use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;

use crate::error::AppError;
use crate::models::job::Job;
use crate::models::sync_report::SyncReport;
use crate::sources::{self, SourceConfig, SourceKind, adzuna, feeds, reliefweb};
use crate::store::JobStore;

/// Bound on every outbound fetch so one unresponsive upstream cannot
/// stall the whole run.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("jobfeed/", env!("CARGO_PKG_VERSION"));

/// Environment-level inputs one sync pass needs.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub reliefweb_appname: String,
    pub adzuna_app_id: Option<String>,
    pub adzuna_app_key: Option<String>,
    pub max_jobs_in_db: i64,
}

/// What one adapter produced: its jobs plus, for the multi-region
/// source, a combined error covering the regions that failed.
struct SourceFetch {
    jobs: Vec<Job>,
    partial_error: Option<String>,
}

/// One orchestration pass: invoke every enabled source, isolate
/// per-source failures, write the combined batch, run retention, and
/// report. Individual source failures never abort the run; they show
/// up as entries in the report's error map.
pub async fn run_sync(
    options: &SyncOptions,
    store: &dyn JobStore,
    requested_countries: &[String],
) -> SyncReport {
    let countries = adzuna::resolve_countries(requested_countries);

    let mut results: Vec<(&str, Result<SourceFetch, AppError>)> = Vec::new();
    for config in sources::enabled_sources() {
        let result = fetch_source(options, config, &countries).await;
        results.push((config.name, result));
    }

    assemble_report(results, countries, store, options.max_jobs_in_db).await
}

/// Dispatch on the registry's source kind. Building the client here
/// keeps a client construction failure scoped to one source like any
/// other fetch error.
async fn fetch_source(
    options: &SyncOptions,
    config: &SourceConfig,
    countries: &[String],
) -> Result<SourceFetch, AppError> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

    match config.kind {
        SourceKind::Json => {
            let jobs =
                reliefweb::fetch(&client, &options.reliefweb_appname, config.max_jobs).await?;
            Ok(SourceFetch {
                jobs,
                partial_error: None,
            })
        }
        SourceKind::MultiRegion => {
            let fetch = adzuna::fetch(
                &client,
                options.adzuna_app_id.as_deref(),
                options.adzuna_app_key.as_deref(),
                countries,
                config.max_jobs,
            )
            .await?;
            let partial_error = if fetch.errors.is_empty() {
                None
            } else {
                Some(
                    fetch
                        .errors
                        .iter()
                        .map(|(country, err)| format!("{country}: {err}"))
                        .collect::<Vec<_>>()
                        .join("; "),
                )
            };
            Ok(SourceFetch {
                jobs: fetch.jobs,
                partial_error,
            })
        }
        SourceKind::Feed { url, style } => {
            let jobs = feeds::fetch(&client, config.name, url, style, config.max_jobs).await?;
            Ok(SourceFetch {
                jobs,
                partial_error: None,
            })
        }
    }
}

/// Aggregate per-source outcomes, persist the batch, and sweep
/// retention. Separated from the fetch loop so the failure-isolation
/// contract is testable without the network.
async fn assemble_report(
    results: Vec<(&str, Result<SourceFetch, AppError>)>,
    countries: Vec<String>,
    store: &dyn JobStore,
    cap: i64,
) -> SyncReport {
    let mut by_source = BTreeMap::new();
    let mut errors = BTreeMap::new();
    let mut batch: Vec<Job> = Vec::new();

    for (name, result) in results {
        match result {
            Ok(fetch) => {
                tracing::info!("{name}: fetched {} jobs", fetch.jobs.len());
                by_source.insert(name.to_string(), fetch.jobs.len());
                if let Some(partial) = fetch.partial_error {
                    tracing::warn!("{name}: partial failure: {partial}");
                    errors.insert(name.to_string(), partial);
                }
                batch.extend(fetch.jobs);
            }
            Err(e) => {
                tracing::error!("{name}: fetch failed: {e}");
                by_source.insert(name.to_string(), 0);
                errors.insert(name.to_string(), e.to_string());
            }
        }
    }

    let total_fetched = batch.len();
    let storage = store.upsert_batch(&batch).await;

    match store.trim_to_cap(cap).await {
        Ok(0) => {}
        Ok(deleted) => tracing::info!("Retention removed {deleted} records beyond cap {cap}"),
        Err(e) => tracing::warn!("Retention sweep failed: {e}"),
    }

    tracing::info!(
        total_fetched,
        stored = storage.stored,
        updated = storage.updated,
        skipped = storage.skipped,
        "Sync complete"
    );

    SyncReport {
        success: true,
        total_fetched,
        by_source,
        storage,
        errors,
        adzuna_countries_used: countries,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{RawJob, normalize};
    use crate::store::memory::MemoryStore;

    fn fetched(source: &str, ids: &[&str]) -> SourceFetch {
        SourceFetch {
            jobs: ids
                .iter()
                .map(|id| {
                    normalize(
                        source,
                        RawJob {
                            source_id: id.to_string(),
                            title: Some(format!("Job {id}")),
                            link: Some(format!("https://example.org/{id}")),
                            ..Default::default()
                        },
                    )
                })
                .collect(),
            partial_error: None,
        }
    }

    #[tokio::test]
    async fn one_source_failing_never_loses_the_others() {
        let store = MemoryStore::new();
        let results = vec![
            (
                "reliefweb",
                Err(AppError::Source("ReliefWeb returned 503".to_string())),
            ),
            ("unjobs", Ok(fetched("unjobs", &["a", "b"]))),
        ];

        let report = assemble_report(results, vec!["gb".to_string()], &store, 2000).await;

        assert!(report.success);
        assert_eq!(report.by_source["reliefweb"], 0);
        assert_eq!(report.by_source["unjobs"], 2);
        assert_eq!(report.total_fetched, 2);
        assert_eq!(report.storage.stored, 2);
        assert!(report.errors["reliefweb"].contains("503"));
        assert!(!report.errors.contains_key("unjobs"));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn partial_region_errors_are_reported_alongside_jobs() {
        let store = MemoryStore::new();
        let mut fetch = fetched("adzuna", &["gb_1"]);
        fetch.partial_error = Some("us: returned 500".to_string());
        let results = vec![("adzuna", Ok(fetch))];

        let report = assemble_report(results, vec!["gb".to_string(), "us".to_string()], &store, 2000).await;

        assert_eq!(report.by_source["adzuna"], 1);
        assert_eq!(report.errors["adzuna"], "us: returned 500");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn write_failure_degrades_to_skipped_not_fatal() {
        let store = MemoryStore::new();
        store.fail_writes();
        let results = vec![("unjobs", Ok(fetched("unjobs", &["a"])))];

        let report = assemble_report(results, vec!["gb".to_string()], &store, 2000).await;

        assert!(report.success);
        assert_eq!(report.storage.skipped, 1);
        assert_eq!(report.storage.stored, 0);
    }

    #[tokio::test]
    async fn retention_runs_after_the_write_phase() {
        let store = MemoryStore::new();
        let results = vec![("unjobs", Ok(fetched("unjobs", &["a", "b", "c"])))];

        let report = assemble_report(results, vec!["gb".to_string()], &store, 2).await;

        assert_eq!(report.storage.stored, 3);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn requested_countries_echo_into_the_report() {
        let store = MemoryStore::new();
        let report = assemble_report(
            Vec::new(),
            vec!["gb".to_string(), "us".to_string()],
            &store,
            2000,
        )
        .await;
        assert_eq!(
            report.adzuna_countries_used,
            vec!["gb".to_string(), "us".to_string()]
        );
        assert_eq!(report.total_fetched, 0);
    }
}
