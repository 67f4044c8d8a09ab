//! Employee row model.

use chrono::NaiveDate;
use hrhub_core::employee::{EmployeeStatus, PersistedEmployee};
use hrhub_core::error::StoreError;
use hrhub_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `employees` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmployeeRow {
    pub id: DbId,
    pub source_id: DbId,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub hire_date: Option<NaiveDate>,
    /// Storage name of an [`EmployeeStatus`].
    pub status: String,
    pub manager_id: Option<String>,
    pub salary: Option<f64>,
    pub raw_data: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<EmployeeRow> for PersistedEmployee {
    type Error = StoreError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let status = EmployeeStatus::from_str(&row.status).ok_or_else(|| {
            StoreError::Database(format!(
                "employee {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;
        Ok(PersistedEmployee {
            id: row.id,
            source_id: row.source_id,
            employee_id: row.employee_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            department: row.department,
            job_title: row.job_title,
            hire_date: row.hire_date,
            status,
            manager_id: row.manager_id,
            salary: row.salary,
            raw_data: row.raw_data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
