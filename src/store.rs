use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::job::Job;
use crate::models::sync_report::StorageOutcome;

/// Persistence seam for the pipeline. The orchestrator takes this by
/// reference so tests can substitute an in-memory store.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Cheap connectivity check. A failing ping is the only condition
    /// that makes a whole sync run fatal.
    async fn ping(&self) -> Result<(), AppError>;

    /// Upsert a batch keyed by canonical id, preserving each existing
    /// record's `date_added`. Writes commit together; a commit failure
    /// degrades the whole batch to `skipped` rather than erroring, so
    /// retention and the response still happen.
    async fn upsert_batch(&self, jobs: &[Job]) -> StorageOutcome;

    /// Retention sweep: delete everything past `cap` records ordered by
    /// `date_added` descending. Returns the number deleted.
    async fn trim_to_cap(&self, cap: i64) -> Result<u64, AppError>;
}

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_tx(&self, jobs: &[Job]) -> Result<StorageOutcome, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut outcome = StorageOutcome::default();

        for job in jobs {
            // xmax = 0 distinguishes a fresh insert from a conflict
            // update. date_added is deliberately absent from the SET
            // list so the first-seen timestamp survives re-syncs.
            let (inserted,): (bool,) = sqlx::query_as(
                "INSERT INTO jobs (id, source, source_id, title, organization, location, link, description, date_posted, date_added, last_updated, tags, salary, country_slug)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                 ON CONFLICT (id) DO UPDATE SET
                     source = EXCLUDED.source,
                     source_id = EXCLUDED.source_id,
                     title = EXCLUDED.title,
                     organization = EXCLUDED.organization,
                     location = EXCLUDED.location,
                     link = EXCLUDED.link,
                     description = EXCLUDED.description,
                     date_posted = EXCLUDED.date_posted,
                     last_updated = EXCLUDED.last_updated,
                     tags = EXCLUDED.tags,
                     salary = EXCLUDED.salary,
                     country_slug = EXCLUDED.country_slug
                 RETURNING (xmax = 0)",
            )
            .bind(&job.id)
            .bind(&job.source)
            .bind(&job.source_id)
            .bind(&job.title)
            .bind(&job.organization)
            .bind(&job.location)
            .bind(&job.link)
            .bind(&job.description)
            .bind(job.date_posted)
            .bind(job.date_added)
            .bind(job.last_updated)
            .bind(&job.tags)
            .bind(&job.salary)
            .bind(&job.country_slug)
            .fetch_one(&mut *tx)
            .await?;

            if inserted {
                outcome.stored += 1;
            } else {
                outcome.updated += 1;
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert_batch(&self, jobs: &[Job]) -> StorageOutcome {
        if jobs.is_empty() {
            return StorageOutcome::default();
        }
        match self.upsert_tx(jobs).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Batch write failed, {} jobs skipped: {e}", jobs.len());
                StorageOutcome {
                    skipped: jobs.len(),
                    ..Default::default()
                }
            }
        }
    }

    async fn trim_to_cap(&self, cap: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            "DELETE FROM jobs WHERE id IN (
                 SELECT id FROM jobs ORDER BY date_added DESC, id OFFSET $1
             )",
        )
        .bind(cap)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
