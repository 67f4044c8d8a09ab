//! Integration tests for `IngestionJobRepo` and `PgJobTracker`.

use std::time::Duration;

use assert_matches::assert_matches;
use hrhub_core::collaborators::JobTracker;
use hrhub_core::error::TrackerError;
use hrhub_core::ingestion_status::JobStatus;
use hrhub_core::types::DbId;
use hrhub_db::models::data_source::CreateDataSource;
use hrhub_db::models::ingestion_job::CreateIngestionJob;
use hrhub_db::repositories::{DataSourceRepo, IngestionJobRepo};
use hrhub_db::store::PgJobTracker;
use sqlx::PgPool;

const LEASE: Duration = Duration::from_secs(300);

async fn seed_source(pool: &PgPool) -> DbId {
    DataSourceRepo::create(
        pool,
        &CreateDataSource {
            name: "SAP Germany".to_string(),
            system_type: "sap_hcm".to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_job(pool: &PgPool, source_id: DbId, file_path: &str) -> DbId {
    IngestionJobRepo::create(
        pool,
        &CreateIngestionJob {
            source_id,
            file_path: file_path.to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn new_job_starts_uploaded_with_zero_counters(pool: PgPool) {
    let source_id = seed_source(&pool).await;
    let job_id = seed_job(&pool, source_id, "sap/a.xml").await;

    let job = PgJobTracker::new(pool.clone()).load(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Uploaded);
    assert_eq!(job.records_processed, 0);
    assert_eq!(job.records_failed, 0);
    assert!(job.started_at.is_none());
    assert!(job.completed_at.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claim_next_uploaded_claims_each_job_once(pool: PgPool) {
    let source_id = seed_source(&pool).await;
    let first = seed_job(&pool, source_id, "sap/a.xml").await;
    let second = seed_job(&pool, source_id, "sap/b.xml").await;

    let a = IngestionJobRepo::claim_next_uploaded(&pool, LEASE).await.unwrap().unwrap();
    let b = IngestionJobRepo::claim_next_uploaded(&pool, LEASE).await.unwrap().unwrap();
    let none = IngestionJobRepo::claim_next_uploaded(&pool, LEASE).await.unwrap();

    assert_eq!(a.id, first);
    assert_eq!(b.id, second);
    assert!(a.claimed_at.is_some());
    assert_eq!(a.status_id, JobStatus::Uploaded.id());
    assert!(none.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stale_claim_is_taken_back_after_lease(pool: PgPool) {
    let source_id = seed_source(&pool).await;
    let job_id = seed_job(&pool, source_id, "sap/a.xml").await;

    let first = IngestionJobRepo::claim_next_uploaded(&pool, LEASE).await.unwrap().unwrap();
    assert_eq!(first.id, job_id);
    assert!(IngestionJobRepo::claim_next_uploaded(&pool, LEASE).await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(20)).await;
    let again = IngestionJobRepo::claim_next_uploaded(&pool, Duration::from_millis(5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.id, job_id);
    assert!(again.claimed_at > first.claimed_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn started_job_is_never_claimed_again(pool: PgPool) {
    let source_id = seed_source(&pool).await;
    let job_id = seed_job(&pool, source_id, "sap/a.xml").await;
    IngestionJobRepo::claim_next_uploaded(&pool, LEASE).await.unwrap().unwrap();
    PgJobTracker::new(pool.clone())
        .set_status(job_id, JobStatus::Validating)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let claimed = IngestionJobRepo::claim_next_uploaded(&pool, Duration::ZERO).await.unwrap();
    assert!(claimed.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn released_claim_makes_job_claimable(pool: PgPool) {
    let source_id = seed_source(&pool).await;
    let job_id = seed_job(&pool, source_id, "sap/a.xml").await;
    IngestionJobRepo::claim_next_uploaded(&pool, LEASE).await.unwrap().unwrap();

    assert!(IngestionJobRepo::release_claim(&pool, job_id).await.unwrap());
    let row = IngestionJobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert!(row.claimed_at.is_none());

    let again = IngestionJobRepo::claim_next_uploaded(&pool, LEASE).await.unwrap().unwrap();
    assert_eq!(again.id, job_id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn release_and_fail_leave_started_jobs_alone(pool: PgPool) {
    let source_id = seed_source(&pool).await;
    let job_id = seed_job(&pool, source_id, "sap/a.xml").await;
    IngestionJobRepo::claim_next_uploaded(&pool, LEASE).await.unwrap().unwrap();
    PgJobTracker::new(pool.clone())
        .set_status(job_id, JobStatus::Validating)
        .await
        .unwrap();

    assert!(!IngestionJobRepo::release_claim(&pool, job_id).await.unwrap());
    assert!(!IngestionJobRepo::fail_unstarted(&pool, job_id, "boom").await.unwrap());

    let row = IngestionJobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(row.status_id, JobStatus::Validating.id());
    assert!(row.claimed_at.is_some());
    assert!(row.error_details.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn fail_unstarted_records_reason_and_completion(pool: PgPool) {
    let source_id = seed_source(&pool).await;
    let job_id = seed_job(&pool, source_id, "sap/a.xml").await;

    assert!(IngestionJobRepo::fail_unstarted(&pool, job_id, "Ingestion job not found: 7")
        .await
        .unwrap());

    let job = PgJobTracker::new(pool.clone()).load(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_details.as_deref(), Some("Ingestion job not found: 7"));
    assert!(job.completed_at.is_some());
    assert!(IngestionJobRepo::claim_next_uploaded(&pool, Duration::ZERO).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_changes_stamp_lifecycle_timestamps(pool: PgPool) {
    let source_id = seed_source(&pool).await;
    let job_id = seed_job(&pool, source_id, "sap/a.xml").await;
    let tracker = PgJobTracker::new(pool.clone());

    tracker.set_status(job_id, JobStatus::Validating).await.unwrap();
    let validating = tracker.load(job_id).await.unwrap();
    assert!(validating.started_at.is_some());
    assert!(validating.completed_at.is_none());

    tracker.set_status(job_id, JobStatus::Processing).await.unwrap();
    tracker.set_status(job_id, JobStatus::Completed).await.unwrap();
    let completed = tracker.load(job_id).await.unwrap();
    assert_eq!(completed.status, JobStatus::Completed);
    assert_eq!(completed.started_at, validating.started_at);
    assert!(completed.completed_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn counters_accumulate_and_error_is_recorded(pool: PgPool) {
    let source_id = seed_source(&pool).await;
    let job_id = seed_job(&pool, source_id, "sap/a.xml").await;
    let tracker = PgJobTracker::new(pool.clone());

    tracker.increment_counters(job_id, 3, 1).await.unwrap();
    tracker.increment_counters(job_id, 2, 0).await.unwrap();
    tracker.set_error(job_id, "1 record failed").await.unwrap();

    let job = tracker.load(job_id).await.unwrap();
    assert_eq!(job.records_processed, 5);
    assert_eq!(job.records_failed, 1);
    assert_eq!(job.error_details.as_deref(), Some("1 record failed"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_job_is_reported(pool: PgPool) {
    let tracker = PgJobTracker::new(pool);
    assert_matches!(tracker.load(999).await, Err(TrackerError::JobNotFound(999)));
    assert_matches!(
        tracker.set_status(999, JobStatus::Failed).await,
        Err(TrackerError::JobNotFound(999))
    );
}
