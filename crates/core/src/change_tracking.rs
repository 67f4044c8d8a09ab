//! Field-level change detection between a persisted employee and an incoming
//! canonical record.
//!
//! Values are compared in their stored text form: status by storage name,
//! dates as `YYYY-MM-DD`, salary with two decimals.

use serde::Serialize;

use crate::employee::{
    CanonicalEmployeeRecord, ChangeType, NewChangeLogEntry, PersistedEmployee, KEY_EMPLOYEE_ID,
    KEY_SALARY,
};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Tracked fields
// ---------------------------------------------------------------------------

/// Fields diffed on update. Salary is recorded on creation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    FirstName,
    LastName,
    Email,
    Department,
    JobTitle,
    HireDate,
    Status,
    ManagerId,
}

impl TrackedField {
    /// All tracked fields in change-log order.
    pub const ALL: &'static [TrackedField] = &[
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Department,
        Self::JobTitle,
        Self::HireDate,
        Self::Status,
        Self::ManagerId,
    ];

    /// Column / change-log field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Department => "department",
            Self::JobTitle => "job_title",
            Self::HireDate => "hire_date",
            Self::Status => "status",
            Self::ManagerId => "manager_id",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == s)
    }

    /// Text form of this field on the stored row.
    pub fn stored_value(&self, employee: &PersistedEmployee) -> Option<String> {
        match self {
            Self::FirstName => Some(employee.first_name.clone()),
            Self::LastName => Some(employee.last_name.clone()),
            Self::Email => employee.email.clone(),
            Self::Department => employee.department.clone(),
            Self::JobTitle => employee.job_title.clone(),
            Self::HireDate => employee.hire_date.map(|d| d.to_string()),
            Self::Status => Some(employee.status.as_str().to_string()),
            Self::ManagerId => employee.manager_id.clone(),
        }
    }

    /// Text form of this field on an incoming record.
    pub fn incoming_value(&self, record: &CanonicalEmployeeRecord) -> Option<String> {
        match self {
            Self::FirstName => Some(record.first_name.clone()),
            Self::LastName => Some(record.last_name.clone()),
            Self::Email => record.email.clone(),
            Self::Department => record.department.clone(),
            Self::JobTitle => record.job_title.clone(),
            Self::HireDate => record.hire_date.map(|d| d.to_string()),
            Self::Status => Some(record.status.as_str().to_string()),
            Self::ManagerId => record.manager_id.clone(),
        }
    }
}

impl std::fmt::Display for TrackedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text form of a salary in the change log.
pub fn salary_text(salary: f64) -> String {
    format!("{salary:.2}")
}

// ---------------------------------------------------------------------------
// Field changes
// ---------------------------------------------------------------------------

/// One detected field difference, not yet bound to an employee row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl FieldChange {
    pub fn into_entry(
        self,
        employee_id: DbId,
        ingestion_job_id: DbId,
        change_type: ChangeType,
    ) -> NewChangeLogEntry {
        NewChangeLogEntry {
            employee_id,
            ingestion_job_id,
            field_name: self.field.to_string(),
            old_value: self.old_value,
            new_value: self.new_value,
            change_type,
        }
    }
}

/// One `created` change per non-null field of a new employee.
///
/// Covers the natural key, every tracked field, and salary.
pub fn creation_changes(record: &CanonicalEmployeeRecord) -> Vec<FieldChange> {
    let natural_key = std::iter::once((KEY_EMPLOYEE_ID, Some(record.source_employee_id.clone())));
    let tracked = TrackedField::ALL
        .iter()
        .map(|field| (field.as_str(), field.incoming_value(record)));
    let salary = std::iter::once((KEY_SALARY, record.salary.map(salary_text)));

    natural_key
        .chain(tracked)
        .chain(salary)
        .filter_map(|(field, value)| {
            value.map(|new_value| FieldChange {
                field,
                old_value: None,
                new_value: Some(new_value),
            })
        })
        .collect()
}

/// One `updated` change per tracked field whose text differs, including
/// transitions to or from null.
pub fn update_changes(
    existing: &PersistedEmployee,
    incoming: &CanonicalEmployeeRecord,
) -> Vec<FieldChange> {
    TrackedField::ALL
        .iter()
        .filter_map(|field| {
            let old_value = field.stored_value(existing);
            let new_value = field.incoming_value(incoming);
            (old_value != new_value).then_some(FieldChange {
                field: field.as_str(),
                old_value,
                new_value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employee::EmployeeStatus;
    use chrono::{NaiveDate, Utc};

    fn canonical(id: &str) -> CanonicalEmployeeRecord {
        CanonicalEmployeeRecord {
            source_id: 1,
            source_employee_id: id.to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            email: None,
            department: None,
            job_title: None,
            hire_date: None,
            status: EmployeeStatus::Active,
            manager_id: None,
            salary: None,
            raw_data: serde_json::json!({}),
        }
    }

    /// The row an insert of `record` would produce.
    fn persisted(record: &CanonicalEmployeeRecord) -> PersistedEmployee {
        PersistedEmployee {
            id: 42,
            source_id: record.source_id,
            employee_id: record.source_employee_id.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            department: record.department.clone(),
            job_title: record.job_title.clone(),
            hire_date: record.hire_date,
            status: record.status,
            manager_id: record.manager_id.clone(),
            salary: record.salary,
            raw_data: record.raw_data.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // -- Creation ------------------------------------------------------------

    #[test]
    fn six_populated_fields_yield_six_created_changes() {
        let mut record = canonical("EMP001");
        record.email = Some("john@example.com".to_string());
        record.department = Some("Engineering".to_string());

        let changes = creation_changes(&record);
        let fields: Vec<&str> = changes.iter().map(|c| c.field).collect();
        assert_eq!(
            fields,
            vec!["employee_id", "first_name", "last_name", "email", "department", "status"]
        );
        assert!(changes.iter().all(|c| c.old_value.is_none()));
        assert_eq!(changes[5].new_value.as_deref(), Some("Active"));
    }

    #[test]
    fn creation_includes_salary_and_date_text() {
        let mut record = canonical("EMP001");
        record.salary = Some(95000.0);
        record.hire_date = NaiveDate::from_ymd_opt(2023, 1, 15);

        let changes = creation_changes(&record);
        let salary = changes.iter().find(|c| c.field == "salary").unwrap();
        assert_eq!(salary.new_value.as_deref(), Some("95000.00"));
        let hire = changes.iter().find(|c| c.field == "hire_date").unwrap();
        assert_eq!(hire.new_value.as_deref(), Some("2023-01-15"));
    }

    // -- Update --------------------------------------------------------------

    #[test]
    fn unchanged_record_yields_no_changes() {
        let mut record = canonical("EMP001");
        record.email = Some("john@example.com".to_string());
        record.hire_date = NaiveDate::from_ymd_opt(2020, 5, 1);
        assert!(update_changes(&persisted(&record), &record).is_empty());
    }

    #[test]
    fn department_change_yields_one_update() {
        let mut before = canonical("EMP001");
        before.department = Some("Engineering".to_string());
        let mut after = before.clone();
        after.department = Some("Marketing".to_string());

        let changes = update_changes(&persisted(&before), &after);
        assert_eq!(
            changes,
            vec![FieldChange {
                field: "department",
                old_value: Some("Engineering".to_string()),
                new_value: Some("Marketing".to_string()),
            }]
        );
    }

    #[test]
    fn transitions_to_and_from_null_are_changes() {
        let mut before = canonical("EMP001");
        before.email = Some("john@example.com".to_string());
        let mut after = before.clone();
        after.email = None;
        after.manager_id = Some("EMP900".to_string());

        let changes = update_changes(&persisted(&before), &after);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field, "email");
        assert_eq!(changes[0].new_value, None);
        assert_eq!(changes[1].field, "manager_id");
        assert_eq!(changes[1].old_value, None);
    }

    #[test]
    fn salary_change_is_not_tracked_on_update() {
        let mut before = canonical("EMP001");
        before.salary = Some(50000.0);
        let mut after = before.clone();
        after.salary = Some(60000.0);
        assert!(update_changes(&persisted(&before), &after).is_empty());
    }

    #[test]
    fn status_compares_by_storage_name() {
        let before = canonical("EMP001");
        let mut after = before.clone();
        after.status = EmployeeStatus::OnLeave;

        let changes = update_changes(&persisted(&before), &after);
        assert_eq!(changes[0].old_value.as_deref(), Some("Active"));
        assert_eq!(changes[0].new_value.as_deref(), Some("On Leave"));
    }

    // -- TrackedField --------------------------------------------------------

    #[test]
    fn tracked_field_names_round_trip() {
        for field in TrackedField::ALL {
            assert_eq!(TrackedField::from_str(field.as_str()), Some(*field));
        }
        assert_eq!(TrackedField::from_str("salary"), None);
    }

    #[test]
    fn into_entry_binds_ids() {
        let entry = FieldChange {
            field: "department",
            old_value: None,
            new_value: Some("HR".to_string()),
        }
        .into_entry(5, 9, ChangeType::Created);
        assert_eq!(entry.employee_id, 5);
        assert_eq!(entry.ingestion_job_id, 9);
        assert_eq!(entry.field_name, "department");
        assert_eq!(entry.change_type, ChangeType::Created);
    }
}
