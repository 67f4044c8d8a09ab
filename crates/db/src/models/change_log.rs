//! Employee change log row model.

use hrhub_core::employee::{ChangeLogEntry, ChangeType};
use hrhub_core::error::StoreError;
use hrhub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `employee_change_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChangeLogRow {
    pub id: DbId,
    pub employee_id: DbId,
    pub ingestion_job_id: DbId,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    /// `created` or `updated`.
    pub change_type: String,
    pub created_at: Timestamp,
}

impl TryFrom<ChangeLogRow> for ChangeLogEntry {
    type Error = StoreError;

    fn try_from(row: ChangeLogRow) -> Result<Self, Self::Error> {
        let change_type = ChangeType::from_str(&row.change_type).ok_or_else(|| {
            StoreError::Database(format!(
                "change log {} has unknown change type '{}'",
                row.id, row.change_type
            ))
        })?;
        Ok(ChangeLogEntry {
            id: row.id,
            employee_id: row.employee_id,
            ingestion_job_id: row.ingestion_job_id,
            field_name: row.field_name,
            old_value: row.old_value,
            new_value: row.new_value,
            change_type,
            created_at: row.created_at,
        })
    }
}
