//! Employee record shapes at each pipeline stage.
//!
//! - [`RawEmployeeRecord`]: flat string map straight out of a schema parser.
//! - [`CanonicalEmployeeRecord`]: cleaned, validated and normalized.
//! - [`PersistedEmployee`]: the durable row, keyed by `(source_id, employee_id)`.
//! - [`NewChangeLogEntry`] / [`ChangeLogEntry`]: the field-level audit trail.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Raw record keys
// ---------------------------------------------------------------------------

pub const KEY_EMPLOYEE_ID: &str = "employee_id";
pub const KEY_FIRST_NAME: &str = "first_name";
pub const KEY_LAST_NAME: &str = "last_name";
pub const KEY_EMAIL: &str = "email";
pub const KEY_DEPARTMENT: &str = "department";
pub const KEY_JOB_TITLE: &str = "job_title";
pub const KEY_HIRE_DATE: &str = "hire_date";
pub const KEY_STATUS: &str = "status";
pub const KEY_MANAGER_ID: &str = "manager_id";
pub const KEY_SALARY: &str = "salary";

// ---------------------------------------------------------------------------
// Employee status
// ---------------------------------------------------------------------------

/// Employment status of a canonical or persisted employee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
    #[serde(rename = "On Leave")]
    OnLeave,
    Suspended,
}

impl EmployeeStatus {
    /// Return the status name as stored in the database and the change log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::OnLeave => "On Leave",
            Self::Suspended => "Suspended",
        }
    }

    /// Parse a stored status name. Returns `None` for unknown values.
    ///
    /// This is the inverse of [`as_str`](Self::as_str), not the synonym
    /// lookup applied to source data (see
    /// [`normalize_status`](crate::transform::normalize_status)).
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(Self::Active),
            "Inactive" => Some(Self::Inactive),
            "On Leave" => Some(Self::OnLeave),
            "Suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

impl std::fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Raw record
// ---------------------------------------------------------------------------

/// Flat mapping of field key to string value for one employee element.
///
/// Absent fields read as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawEmployeeRecord {
    fields: BTreeMap<String, String>,
}

impl RawEmployeeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder-style insert, mostly useful in tests.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Value for `key`, or `""` when the field was absent.
    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// JSON object of every captured field, stored as the employee's `raw_data`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawEmployeeRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical record
// ---------------------------------------------------------------------------

/// A validated, normalized employee record ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEmployeeRecord {
    pub source_id: DbId,
    /// Natural key within the source.
    pub source_employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: EmployeeStatus,
    pub manager_id: Option<String>,
    pub salary: Option<f64>,
    /// Every field the parser captured, including dialect-only extras.
    pub raw_data: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Persisted employee
// ---------------------------------------------------------------------------

/// The durable employee row, unique on `(source_id, employee_id)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedEmployee {
    pub id: DbId,
    pub source_id: DbId,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: EmployeeStatus,
    pub manager_id: Option<String>,
    pub salary: Option<f64>,
    pub raw_data: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Change log
// ---------------------------------------------------------------------------

/// Kind of event a change log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Updated,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change log entry about to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewChangeLogEntry {
    pub employee_id: DbId,
    pub ingestion_job_id: DbId,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub change_type: ChangeType,
}

/// An appended, immutable change log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeLogEntry {
    pub id: DbId,
    pub employee_id: DbId,
    pub ingestion_job_id: DbId,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub change_type: ChangeType,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_storage_name() {
        for status in [
            EmployeeStatus::Active,
            EmployeeStatus::Inactive,
            EmployeeStatus::OnLeave,
            EmployeeStatus::Suspended,
        ] {
            assert_eq!(EmployeeStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(EmployeeStatus::from_str("on leave"), None);
    }

    #[test]
    fn raw_record_absent_field_reads_empty() {
        let raw = RawEmployeeRecord::new().with(KEY_EMPLOYEE_ID, "EMP001");
        assert_eq!(raw.get(KEY_EMPLOYEE_ID), "EMP001");
        assert_eq!(raw.get(KEY_EMAIL), "");
    }

    #[test]
    fn raw_record_serializes_as_flat_object() {
        let raw = RawEmployeeRecord::new()
            .with("employee_id", "EMP001")
            .with("cost_center", "CC-10");
        assert_eq!(
            raw.to_json(),
            serde_json::json!({ "employee_id": "EMP001", "cost_center": "CC-10" })
        );
        assert_eq!(serde_json::to_value(&raw).unwrap(), raw.to_json());
    }
}
