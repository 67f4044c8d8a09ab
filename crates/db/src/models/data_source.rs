//! HR source system models.

use hrhub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `data_sources` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DataSource {
    pub id: DbId,
    pub name: String,
    /// `workday` or `sap_hcm`.
    pub system_type: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a source system.
#[derive(Debug, Deserialize)]
pub struct CreateDataSource {
    pub name: String,
    pub system_type: String,
}
