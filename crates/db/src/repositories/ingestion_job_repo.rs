//! Repository for the `ingestion_jobs` table.
//!
//! Uses `JobStatus` from `hrhub_core::ingestion_status` for every status literal.

use std::time::Duration;

use hrhub_core::ingestion_status::JobStatus;
use hrhub_core::types::DbId;
use sqlx::PgPool;

use crate::models::ingestion_job::{CreateIngestionJob, IngestionJobRow};

/// Column list for `ingestion_jobs` queries.
const COLUMNS: &str = "\
    id, source_id, file_path, status_id, records_processed, records_failed, \
    error_details, claimed_at, started_at, completed_at, created_at, updated_at";

/// Provides lifecycle operations for ingestion jobs.
pub struct IngestionJobRepo;

impl IngestionJobRepo {
    /// Record an uploaded document as a new job in `uploaded` status.
    pub async fn create(
        pool: &PgPool,
        input: &CreateIngestionJob,
    ) -> Result<IngestionJobRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO ingestion_jobs (source_id, file_path, status_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IngestionJobRow>(&query)
            .bind(input.source_id)
            .bind(&input.file_path)
            .bind(JobStatus::Uploaded.id())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<IngestionJobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM ingestion_jobs WHERE id = $1");
        sqlx::query_as::<_, IngestionJobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the oldest claimable `uploaded` job.
    ///
    /// A job is claimable when it was never claimed, or when its claim is
    /// older than `lease` and it is still `uploaded`. Stamps `claimed_at` and
    /// leaves the status alone. Uses `SELECT FOR UPDATE SKIP LOCKED` so
    /// concurrent dispatchers never claim the same job.
    pub async fn claim_next_uploaded(
        pool: &PgPool,
        lease: Duration,
    ) -> Result<Option<IngestionJobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE ingestion_jobs \
             SET claimed_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM ingestion_jobs \
                 WHERE status_id = $1 \
                   AND (claimed_at IS NULL OR claimed_at < NOW() - make_interval(secs => $2)) \
                 ORDER BY created_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IngestionJobRow>(&query)
            .bind(JobStatus::Uploaded.id())
            .bind(lease.as_secs_f64())
            .fetch_optional(pool)
            .await
    }

    /// Clear the claim on a job that is still `uploaded`, making it
    /// claimable again. Returns `false` if no such job exists.
    pub async fn release_claim(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ingestion_jobs SET claimed_at = NULL WHERE id = $1 AND status_id = $2",
        )
        .bind(job_id)
        .bind(JobStatus::Uploaded.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a job that never left `uploaded` straight to `failed`.
    ///
    /// Returns `false` if no such job exists.
    pub async fn fail_unstarted(
        pool: &PgPool,
        job_id: DbId,
        detail: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ingestion_jobs \
             SET status_id = $3, error_details = $4, completed_at = NOW() \
             WHERE id = $1 AND status_id = $2",
        )
        .bind(job_id)
        .bind(JobStatus::Uploaded.id())
        .bind(JobStatus::Failed.id())
        .bind(detail)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persist a status. Entering `validating` stamps `started_at`; entering
    /// a terminal status stamps `completed_at`.
    ///
    /// Returns `false` if no job with that id exists.
    pub async fn set_status(
        pool: &PgPool,
        job_id: DbId,
        status: JobStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ingestion_jobs \
             SET status_id = $2, \
                 started_at = CASE WHEN $3 THEN COALESCE(started_at, NOW()) ELSE started_at END, \
                 completed_at = CASE WHEN $4 THEN NOW() ELSE completed_at END \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(status.id())
        .bind(status == JobStatus::Validating)
        .bind(status.is_terminal())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Add to the progress counters. Returns `false` if the job does not exist.
    pub async fn increment_counters(
        pool: &PgPool,
        job_id: DbId,
        processed: i32,
        failed: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ingestion_jobs \
             SET records_processed = records_processed + $2, \
                 records_failed = records_failed + $3 \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(processed)
        .bind(failed)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite `error_details`. Returns `false` if the job does not exist.
    pub async fn set_error(pool: &PgPool, job_id: DbId, detail: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE ingestion_jobs SET error_details = $2 WHERE id = $1")
            .bind(job_id)
            .bind(detail)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
