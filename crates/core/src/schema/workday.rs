//! Workday `HR_Employee_Export` report layout.

use super::{FieldSpec, SchemaDialect, SchemaLayout, SchemaParser};

pub const WORKDAY_NAMESPACE: &str = "urn:com.workday.report/HR_Employee_Export";

pub(super) static LAYOUT: SchemaLayout = SchemaLayout {
    namespace: WORKDAY_NAMESPACE,
    employee_tag: "Employee",
    naked_roots: &["Report_Data", "root"],
    fields: &[
        FieldSpec { element: "Employee_ID", key: "employee_id" },
        FieldSpec { element: "First_Name", key: "first_name" },
        FieldSpec { element: "Last_Name", key: "last_name" },
        FieldSpec { element: "Email_Address", key: "email" },
        FieldSpec { element: "Department", key: "department" },
        FieldSpec { element: "Position_Title", key: "job_title" },
        FieldSpec { element: "Hire_Date", key: "hire_date" },
        FieldSpec { element: "Employee_Status", key: "status" },
        FieldSpec { element: "Manager_ID", key: "manager_id" },
        FieldSpec { element: "Salary", key: "salary" },
        FieldSpec { element: "Location", key: "location" },
    ],
};

/// Parser for Workday exports.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkdayParser;

impl SchemaParser for WorkdayParser {
    fn dialect(&self) -> SchemaDialect {
        SchemaDialect::Workday
    }

    fn layout(&self) -> &'static SchemaLayout {
        &LAYOUT
    }
}
