//! Repository for the append-only `employee_change_logs` table.

use hrhub_core::employee::NewChangeLogEntry;
use hrhub_core::types::DbId;
use sqlx::PgConnection;

use crate::models::change_log::ChangeLogRow;

/// Column list for `employee_change_logs` queries.
const COLUMNS: &str = "\
    id, employee_id, ingestion_job_id, field_name, old_value, new_value, \
    change_type, created_at";

/// Appends and reads field-level change entries. Entries are never updated.
pub struct ChangeLogRepo;

impl ChangeLogRepo {
    /// Append entries in order.
    pub async fn append(
        conn: &mut PgConnection,
        entries: &[NewChangeLogEntry],
    ) -> Result<(), sqlx::Error> {
        for entry in entries {
            sqlx::query(
                "INSERT INTO employee_change_logs \
                     (employee_id, ingestion_job_id, field_name, old_value, new_value, change_type) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(entry.employee_id)
            .bind(entry.ingestion_job_id)
            .bind(&entry.field_name)
            .bind(&entry.old_value)
            .bind(&entry.new_value)
            .bind(entry.change_type.as_str())
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    pub async fn list_for_job(
        conn: &mut PgConnection,
        ingestion_job_id: DbId,
    ) -> Result<Vec<ChangeLogRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM employee_change_logs WHERE ingestion_job_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, ChangeLogRow>(&query)
            .bind(ingestion_job_id)
            .fetch_all(conn)
            .await
    }
}
