//! Field-level cleaning, validation, and normalization of raw employee
//! records into [`CanonicalEmployeeRecord`]s.
//!
//! Only the three required identity fields can reject a record. A bad email,
//! date, or salary is recovered by nulling the field and logging a warning.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::employee::{
    CanonicalEmployeeRecord, EmployeeStatus, RawEmployeeRecord, KEY_DEPARTMENT, KEY_EMAIL,
    KEY_EMPLOYEE_ID, KEY_FIRST_NAME, KEY_HIRE_DATE, KEY_JOB_TITLE, KEY_LAST_NAME,
    KEY_MANAGER_ID, KEY_SALARY, KEY_STATUS,
};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length (in characters) of any cleaned string field.
pub const MAX_FIELD_LENGTH: usize = 255;

/// Upper bound of an accepted salary value.
pub const MAX_SALARY: f64 = 10_000_000.0;

/// Fields that must be non-empty after cleaning, in reporting order.
pub const REQUIRED_FIELDS: &[&str] = &[KEY_EMPLOYEE_ID, KEY_FIRST_NAME, KEY_LAST_NAME];

/// Characters removed from every string field.
const STRIPPED_CHARS: &[char] = &['<', '>', '"', '\''];

/// Characters removed from a salary before parsing.
const SALARY_NOISE: &[char] = &['$', '€', '£', '¥', ',', ' '];

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

/// Accepted date shapes and the chrono format each one parses with.
static DATE_FORMATS: LazyLock<[(Regex, &'static str); 3]> = LazyLock::new(|| {
    [
        (Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"), "%Y-%m-%d"),
        (Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("valid regex"), "%m/%d/%Y"),
        (Regex::new(r"^\d{2}-\d{2}-\d{4}$").expect("valid regex"), "%m-%d-%Y"),
    ]
});

// ---------------------------------------------------------------------------
// Validation outcome
// ---------------------------------------------------------------------------

/// A record rejected by the required-field check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Validation failed: {}", self.reasons().join(", "))]
pub struct ValidationFailed {
    /// Cleaned employee id, empty when that is one of the missing fields.
    pub employee_id: String,
    pub missing_fields: Vec<&'static str>,
}

impl ValidationFailed {
    /// Human-readable reason per missing field.
    pub fn reasons(&self) -> Vec<String> {
        self.missing_fields
            .iter()
            .map(|field| format!("{field} is required"))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

/// Trim, collapse whitespace runs, strip `< > " '`, and truncate.
///
/// A value that is only whitespace once stripped cleans to `""`.
pub fn clean_string(value: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(value.trim(), " ");
    let stripped: String = collapsed
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect();
    if stripped.trim().is_empty() {
        return String::new();
    }
    stripped.chars().take(MAX_FIELD_LENGTH).collect()
}

/// [`clean_string`], with an empty result mapped to `None`.
pub fn clean_optional(value: &str) -> Option<String> {
    Some(clean_string(value)).filter(|s| !s.is_empty())
}

/// Lower-case and shape-check an email address. Invalid addresses yield `None`.
pub fn normalize_email(value: &str) -> Option<String> {
    let email = value.trim().to_lowercase();
    if email.is_empty() {
        return None;
    }
    if EMAIL_RE.is_match(&email) {
        Some(email)
    } else {
        tracing::warn!(email = %email, "Invalid email format, field dropped");
        None
    }
}

/// Parse a date in `YYYY-MM-DD`, `MM/DD/YYYY` or `MM-DD-YYYY` form.
///
/// Unrecognized shapes and impossible calendar dates yield `None`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let parsed = DATE_FORMATS
        .iter()
        .find(|(shape, _)| shape.is_match(value))
        .and_then(|(_, format)| NaiveDate::parse_from_str(value, format).ok());
    if parsed.is_none() {
        tracing::warn!(date = %value, "Invalid date format, field dropped");
    }
    parsed
}

/// Map a source status string onto [`EmployeeStatus`].
///
/// Lookup is case-insensitive; anything unrecognized (or absent) is `Active`.
pub fn normalize_status(value: &str) -> EmployeeStatus {
    match value.trim().to_lowercase().as_str() {
        "inactive" | "terminated" => EmployeeStatus::Inactive,
        "on leave" | "leave" => EmployeeStatus::OnLeave,
        "suspended" => EmployeeStatus::Suspended,
        _ => EmployeeStatus::Active,
    }
}

/// Parse a salary, ignoring currency symbols, commas and spaces.
///
/// Only finite values in `[0, MAX_SALARY]` are accepted.
pub fn parse_salary(value: &str) -> Option<f64> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !SALARY_NOISE.contains(c))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    match cleaned.parse::<f64>() {
        // `abs` folds a parsed `-0` into `0.0`.
        Ok(salary) if salary.is_finite() && (0.0..=MAX_SALARY).contains(&salary) => {
            Some(salary.abs())
        }
        _ => {
            tracing::warn!(salary = %value, "Invalid salary value, field dropped");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Transformer
// ---------------------------------------------------------------------------

/// Turns raw records of one source into canonical records.
///
/// Holds nothing but the owning source id; build one per job.
#[derive(Debug, Clone, Copy)]
pub struct DataTransformer {
    source_id: DbId,
}

impl DataTransformer {
    pub fn new(source_id: DbId) -> Self {
        Self { source_id }
    }

    pub fn source_id(&self) -> DbId {
        self.source_id
    }

    /// The natural key a raw record will have once transformed.
    pub fn natural_key(raw: &RawEmployeeRecord) -> String {
        clean_string(raw.get(KEY_EMPLOYEE_ID))
    }

    /// Clean, normalize and validate one raw record.
    pub fn transform(
        &self,
        raw: &RawEmployeeRecord,
    ) -> Result<CanonicalEmployeeRecord, ValidationFailed> {
        let employee_id = clean_string(raw.get(KEY_EMPLOYEE_ID));
        let first_name = clean_string(raw.get(KEY_FIRST_NAME));
        let last_name = clean_string(raw.get(KEY_LAST_NAME));

        let missing_fields: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .zip([&employee_id, &first_name, &last_name])
            .filter(|(_, value)| value.is_empty())
            .map(|(field, _)| *field)
            .collect();
        if !missing_fields.is_empty() {
            return Err(ValidationFailed {
                employee_id,
                missing_fields,
            });
        }

        Ok(CanonicalEmployeeRecord {
            source_id: self.source_id,
            source_employee_id: employee_id,
            first_name,
            last_name,
            email: normalize_email(raw.get(KEY_EMAIL)),
            department: clean_optional(raw.get(KEY_DEPARTMENT)),
            job_title: clean_optional(raw.get(KEY_JOB_TITLE)),
            hire_date: parse_date(raw.get(KEY_HIRE_DATE)),
            status: normalize_status(raw.get(KEY_STATUS)),
            manager_id: clean_optional(raw.get(KEY_MANAGER_ID)),
            salary: parse_salary(raw.get(KEY_SALARY)),
            raw_data: raw.to_json(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
