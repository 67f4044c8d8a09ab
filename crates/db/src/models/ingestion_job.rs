//! Ingestion job models.

use hrhub_core::collaborators::IngestionJob;
use hrhub_core::error::TrackerError;
use hrhub_core::ingestion_status::{JobStatus, StatusId};
use hrhub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `ingestion_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IngestionJobRow {
    pub id: DbId,
    pub source_id: DbId,
    pub file_path: String,
    pub status_id: StatusId,
    pub records_processed: i32,
    pub records_failed: i32,
    pub error_details: Option<String>,
    pub claimed_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording an uploaded document.
#[derive(Debug, Deserialize)]
pub struct CreateIngestionJob {
    pub source_id: DbId,
    pub file_path: String,
}

impl TryFrom<IngestionJobRow> for IngestionJob {
    type Error = TrackerError;

    fn try_from(row: IngestionJobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::from_id(row.status_id).ok_or_else(|| {
            TrackerError::Database(format!(
                "ingestion job {} has unknown status_id {}",
                row.id, row.status_id
            ))
        })?;
        Ok(IngestionJob {
            id: row.id,
            source_id: row.source_id,
            file_path: row.file_path,
            status,
            records_processed: row.records_processed,
            records_failed: row.records_failed,
            error_details: row.error_details,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
        })
    }
}
