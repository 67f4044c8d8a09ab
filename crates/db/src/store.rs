//! PostgreSQL implementations of the collaborator traits.

use async_trait::async_trait;
use hrhub_core::collaborators::{EmployeeStore, EmployeeUnitOfWork, IngestionJob, JobTracker};
use hrhub_core::employee::{CanonicalEmployeeRecord, NewChangeLogEntry, PersistedEmployee};
use hrhub_core::error::{StoreError, TrackerError};
use hrhub_core::ingestion_status::JobStatus;
use hrhub_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::repositories::{ChangeLogRepo, EmployeeRepo, IngestionJobRepo};

fn store_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn tracker_err(e: sqlx::Error) -> TrackerError {
    TrackerError::Database(e.to_string())
}

// ---------------------------------------------------------------------------
// Employee store
// ---------------------------------------------------------------------------

/// Employee store backed by one PostgreSQL transaction per unit of work.
#[derive(Clone)]
pub struct PgEmployeeStore {
    pool: PgPool,
}

impl PgEmployeeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeStore for PgEmployeeStore {
    /// Opens a transaction and takes `pg_advisory_xact_lock(source_id)`, so
    /// reconciliation of one source is serialized across workers.
    async fn begin(&self, source_id: DbId) -> Result<Box<dyn EmployeeUnitOfWork>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(source_id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        tracing::debug!(source_id, "Acquired source reconciliation lock");
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// A single open transaction holding the source lock.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl EmployeeUnitOfWork for PgUnitOfWork {
    async fn find_by_natural_key(
        &mut self,
        source_id: DbId,
        employee_id: &str,
    ) -> Result<Option<PersistedEmployee>, StoreError> {
        EmployeeRepo::find_by_natural_key_for_update(&mut self.tx, source_id, employee_id)
            .await
            .map_err(store_err)?
            .map(PersistedEmployee::try_from)
            .transpose()
    }

    async fn upsert(
        &mut self,
        record: &CanonicalEmployeeRecord,
    ) -> Result<PersistedEmployee, StoreError> {
        let row = EmployeeRepo::upsert(&mut self.tx, record)
            .await
            .map_err(store_err)?;
        PersistedEmployee::try_from(row)
    }

    async fn append_change_log(
        &mut self,
        entries: &[NewChangeLogEntry],
    ) -> Result<(), StoreError> {
        ChangeLogRepo::append(&mut self.tx, entries)
            .await
            .map_err(store_err)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(store_err)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(store_err)
    }
}

// ---------------------------------------------------------------------------
// Job tracker
// ---------------------------------------------------------------------------

/// Job tracker writing straight to `ingestion_jobs`.
#[derive(Clone)]
pub struct PgJobTracker {
    pool: PgPool,
}

impl PgJobTracker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobTracker for PgJobTracker {
    async fn load(&self, job_id: DbId) -> Result<IngestionJob, TrackerError> {
        IngestionJobRepo::find_by_id(&self.pool, job_id)
            .await
            .map_err(tracker_err)?
            .ok_or(TrackerError::JobNotFound(job_id))?
            .try_into()
    }

    async fn set_status(&self, job_id: DbId, status: JobStatus) -> Result<(), TrackerError> {
        let found = IngestionJobRepo::set_status(&self.pool, job_id, status)
            .await
            .map_err(tracker_err)?;
        found.then_some(()).ok_or(TrackerError::JobNotFound(job_id))
    }

    async fn increment_counters(
        &self,
        job_id: DbId,
        processed: i32,
        failed: i32,
    ) -> Result<(), TrackerError> {
        let found = IngestionJobRepo::increment_counters(&self.pool, job_id, processed, failed)
            .await
            .map_err(tracker_err)?;
        found.then_some(()).ok_or(TrackerError::JobNotFound(job_id))
    }

    async fn set_error(&self, job_id: DbId, detail: &str) -> Result<(), TrackerError> {
        let found = IngestionJobRepo::set_error(&self.pool, job_id, detail)
            .await
            .map_err(tracker_err)?;
        found.then_some(()).ok_or(TrackerError::JobNotFound(job_id))
    }
}
