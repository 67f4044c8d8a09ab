//! Pipeline-level error taxonomy.

use std::time::Duration;

use hrhub_core::duplicate_detection::DuplicateRecordsFound;
use hrhub_core::error::{DocumentError, SchemaError, StoreError, TrackerError};
use hrhub_core::ingestion_status::JobStatus;
use hrhub_core::types::DbId;

/// Why an ingestion job failed.
///
/// Per-record validation failures are not errors at this level; they are
/// counted and summarized on an otherwise successful job.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),

    #[error(transparent)]
    DuplicateRecordsFound(#[from] DuplicateRecordsFound),

    #[error("No valid employee data found ({failed} records failed validation)")]
    NoValidRecords { failed: usize },

    #[error("Document not found for job {job_id}")]
    DocumentNotFound { job_id: DbId },

    #[error("Ingestion job not found: {0}")]
    JobNotFound(DbId),

    /// `after` is zero when the collaborator itself reported the timeout.
    #[error("{operation} timed out")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: DbId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Ingestion cancelled")]
    Cancelled,
}

impl IngestError {
    /// Whether rerunning the same document as a new job may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::PersistenceFailed(_))
    }
}

impl From<SchemaError> for IngestError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::MalformedDocument(msg) => Self::MalformedDocument(msg),
            SchemaError::UnsupportedSchema(msg) => Self::UnsupportedSchema(msg),
        }
    }
}

impl From<StoreError> for IngestError {
    fn from(e: StoreError) -> Self {
        Self::PersistenceFailed(e.to_string())
    }
}

impl From<TrackerError> for IngestError {
    fn from(e: TrackerError) -> Self {
        match e {
            TrackerError::JobNotFound(id) => Self::JobNotFound(id),
            TrackerError::Database(msg) => Self::PersistenceFailed(msg),
        }
    }
}

impl From<DocumentError> for IngestError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::NotFound { job_id } => Self::DocumentNotFound { job_id },
            DocumentError::IoTimeout { .. } => Self::Timeout {
                operation: "document fetch",
                after: Duration::ZERO,
            },
            DocumentError::Io(msg) => Self::PersistenceFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn only_infrastructure_failures_are_retryable() {
        assert!(IngestError::PersistenceFailed("connection reset".into()).is_retryable());
        assert!(IngestError::Timeout {
            operation: "employee upsert",
            after: Duration::from_secs(30),
        }
        .is_retryable());

        assert!(!IngestError::MalformedDocument("bad".into()).is_retryable());
        assert!(!IngestError::UnsupportedSchema("root".into()).is_retryable());
        assert!(!IngestError::NoValidRecords { failed: 2 }.is_retryable());
        assert!(!IngestError::DocumentNotFound { job_id: 1 }.is_retryable());
        assert!(!IngestError::Cancelled.is_retryable());
    }

    #[test]
    fn collaborator_errors_map_onto_taxonomy() {
        assert_matches!(
            IngestError::from(SchemaError::UnsupportedSchema("x".into())),
            IngestError::UnsupportedSchema(_)
        );
        assert_matches!(
            IngestError::from(DocumentError::NotFound { job_id: 4 }),
            IngestError::DocumentNotFound { job_id: 4 }
        );
        assert_matches!(
            IngestError::from(DocumentError::IoTimeout { job_id: 4 }),
            IngestError::Timeout { .. }
        );
        assert_matches!(
            IngestError::from(TrackerError::JobNotFound(9)),
            IngestError::JobNotFound(9)
        );
        assert_matches!(
            IngestError::from(StoreError::Database("connection reset".into())),
            IngestError::PersistenceFailed(_)
        );
    }

    #[test]
    fn timeout_message_names_operation() {
        let err = IngestError::Timeout {
            operation: "employee lookup",
            after: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "employee lookup timed out");
    }
}
