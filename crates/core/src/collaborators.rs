//! Collaborator traits the ingestion pipeline is written against.
//!
//! PostgreSQL implementations live in `hrhub-db`; in-memory ones and a local
//! directory document source live in `hrhub-pipeline`.

use async_trait::async_trait;
use serde::Serialize;

use crate::employee::{CanonicalEmployeeRecord, NewChangeLogEntry, PersistedEmployee};
use crate::error::{DocumentError, StoreError, TrackerError};
use crate::ingestion_status::JobStatus;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Ingestion job
// ---------------------------------------------------------------------------

/// Snapshot of an ingestion job as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionJob {
    pub id: DbId,
    pub source_id: DbId,
    /// Document reference, relative to the document root.
    pub file_path: String,
    pub status: JobStatus,
    pub records_processed: i32,
    pub records_failed: i32,
    pub error_details: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Document source
// ---------------------------------------------------------------------------

/// Supplies the raw bytes of the document uploaded for a job.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, job: &IngestionJob) -> Result<Vec<u8>, DocumentError>;
}

// ---------------------------------------------------------------------------
// Employee store
// ---------------------------------------------------------------------------

/// Opens units of work against the employee store.
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Begin a unit of work holding the per-source reconciliation lock until
    /// it is committed or rolled back.
    async fn begin(&self, source_id: DbId) -> Result<Box<dyn EmployeeUnitOfWork>, StoreError>;
}

/// One atomic batch of employee mutations and change log appends.
///
/// Dropping a unit of work without committing discards its writes.
#[async_trait]
pub trait EmployeeUnitOfWork: Send {
    /// Look up an employee by natural key, locking the row for this unit of work.
    async fn find_by_natural_key(
        &mut self,
        source_id: DbId,
        employee_id: &str,
    ) -> Result<Option<PersistedEmployee>, StoreError>;

    /// Insert or overwrite the employee identified by the record's natural key.
    async fn upsert(
        &mut self,
        record: &CanonicalEmployeeRecord,
    ) -> Result<PersistedEmployee, StoreError>;

    async fn append_change_log(&mut self, entries: &[NewChangeLogEntry])
        -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Job tracker
// ---------------------------------------------------------------------------

/// Reads and updates ingestion job state.
#[async_trait]
pub trait JobTracker: Send + Sync {
    async fn load(&self, job_id: DbId) -> Result<IngestionJob, TrackerError>;

    /// Persist a new status. Entering `Validating` stamps `started_at`;
    /// entering a terminal status stamps `completed_at`.
    async fn set_status(&self, job_id: DbId, status: JobStatus) -> Result<(), TrackerError>;

    /// Add to the progress counters.
    async fn increment_counters(
        &self,
        job_id: DbId,
        processed: i32,
        failed: i32,
    ) -> Result<(), TrackerError>;

    async fn set_error(&self, job_id: DbId, detail: &str) -> Result<(), TrackerError>;
}
