//! Repository for the `data_sources` table.

use hrhub_core::types::DbId;
use sqlx::PgPool;

use crate::models::data_source::{CreateDataSource, DataSource};

/// Column list for `data_sources` queries.
const COLUMNS: &str = "id, name, system_type, created_at, updated_at";

/// Provides access to registered HR source systems.
pub struct DataSourceRepo;

impl DataSourceRepo {
    pub async fn create(pool: &PgPool, input: &CreateDataSource) -> Result<DataSource, sqlx::Error> {
        let query = format!(
            "INSERT INTO data_sources (name, system_type) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DataSource>(&query)
            .bind(&input.name)
            .bind(&input.system_type)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DataSource>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM data_sources WHERE id = $1");
        sqlx::query_as::<_, DataSource>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
