//! Error types shared by the parsers and the collaborator traits.
//!
//! Per-record outcomes ([`ValidationFailed`](crate::transform::ValidationFailed))
//! and batch preconditions
//! ([`DuplicateRecordsFound`](crate::duplicate_detection::DuplicateRecordsFound))
//! live next to the code that produces them.

use crate::types::DbId;

/// Failure to turn document bytes into raw employee records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Unparseable XML, or XML carrying a DTD / unresolvable entity.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// The root element matches no recognized dialect.
    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),
}

/// Failure reported by an [`EmployeeStore`](crate::collaborators::EmployeeStore)
/// or one of its units of work.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Failure reported by a [`DocumentSource`](crate::collaborators::DocumentSource).
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Document not found for job {job_id}")]
    NotFound { job_id: DbId },

    #[error("Timed out reading document for job {job_id}")]
    IoTimeout { job_id: DbId },

    #[error("I/O error reading document: {0}")]
    Io(String),
}

/// Failure reported by a [`JobTracker`](crate::collaborators::JobTracker).
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Ingestion job not found: {0}")]
    JobNotFound(DbId),

    #[error("Database error: {0}")]
    Database(String),
}
