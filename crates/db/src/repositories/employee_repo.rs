//! Repository for the `employees` table.

use hrhub_core::employee::CanonicalEmployeeRecord;
use hrhub_core::types::DbId;
use sqlx::PgConnection;

use crate::models::employee::EmployeeRow;

/// Column list for `employees` queries.
const COLUMNS: &str = "\
    id, source_id, employee_id, first_name, last_name, email, department, \
    job_title, hire_date, status, manager_id, salary, raw_data, \
    created_at, updated_at";

/// Provides lookups and upserts for canonical employees.
pub struct EmployeeRepo;

impl EmployeeRepo {
    /// Find an employee by natural key without locking.
    pub async fn find_by_natural_key(
        conn: &mut PgConnection,
        source_id: DbId,
        employee_id: &str,
    ) -> Result<Option<EmployeeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM employees WHERE source_id = $1 AND employee_id = $2"
        );
        sqlx::query_as::<_, EmployeeRow>(&query)
            .bind(source_id)
            .bind(employee_id)
            .fetch_optional(conn)
            .await
    }

    /// Find an employee by natural key and lock the row until the enclosing
    /// transaction ends.
    pub async fn find_by_natural_key_for_update(
        conn: &mut PgConnection,
        source_id: DbId,
        employee_id: &str,
    ) -> Result<Option<EmployeeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM employees \
             WHERE source_id = $1 AND employee_id = $2 \
             FOR UPDATE"
        );
        sqlx::query_as::<_, EmployeeRow>(&query)
            .bind(source_id)
            .bind(employee_id)
            .fetch_optional(conn)
            .await
    }

    /// Insert the record, or overwrite every field of the existing row with
    /// the same `(source_id, employee_id)`.
    pub async fn upsert(
        conn: &mut PgConnection,
        record: &CanonicalEmployeeRecord,
    ) -> Result<EmployeeRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO employees \
                 (source_id, employee_id, first_name, last_name, email, department, \
                  job_title, hire_date, status, manager_id, salary, raw_data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (source_id, employee_id) DO UPDATE SET \
                 first_name = EXCLUDED.first_name, \
                 last_name = EXCLUDED.last_name, \
                 email = EXCLUDED.email, \
                 department = EXCLUDED.department, \
                 job_title = EXCLUDED.job_title, \
                 hire_date = EXCLUDED.hire_date, \
                 status = EXCLUDED.status, \
                 manager_id = EXCLUDED.manager_id, \
                 salary = EXCLUDED.salary, \
                 raw_data = EXCLUDED.raw_data \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EmployeeRow>(&query)
            .bind(record.source_id)
            .bind(&record.source_employee_id)
            .bind(&record.first_name)
            .bind(&record.last_name)
            .bind(&record.email)
            .bind(&record.department)
            .bind(&record.job_title)
            .bind(record.hire_date)
            .bind(record.status.as_str())
            .bind(&record.manager_id)
            .bind(record.salary)
            .bind(&record.raw_data)
            .fetch_one(conn)
            .await
    }

    /// List every employee of a source, ordered by natural key.
    pub async fn list_by_source(
        conn: &mut PgConnection,
        source_id: DbId,
    ) -> Result<Vec<EmployeeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM employees WHERE source_id = $1 ORDER BY employee_id"
        );
        sqlx::query_as::<_, EmployeeRow>(&query)
            .bind(source_id)
            .fetch_all(conn)
            .await
    }
}
