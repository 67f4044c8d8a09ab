//! SAP HCM `hcm:employee:export` layout.

use super::{FieldSpec, SchemaDialect, SchemaLayout, SchemaParser};

pub const SAP_HCM_NAMESPACE: &str = "urn:sap.com:hcm:employee:export";

pub(super) static LAYOUT: SchemaLayout = SchemaLayout {
    namespace: SAP_HCM_NAMESPACE,
    employee_tag: "Employee",
    naked_roots: &[],
    fields: &[
        FieldSpec { element: "PersonnelNumber", key: "employee_id" },
        FieldSpec { element: "FirstName", key: "first_name" },
        FieldSpec { element: "LastName", key: "last_name" },
        FieldSpec { element: "EmailAddress", key: "email" },
        FieldSpec { element: "OrganizationalUnit", key: "department" },
        FieldSpec { element: "JobTitle", key: "job_title" },
        FieldSpec { element: "HireDate", key: "hire_date" },
        FieldSpec { element: "EmployeeStatus", key: "status" },
        FieldSpec { element: "SupervisorNumber", key: "manager_id" },
        FieldSpec { element: "Salary", key: "salary" },
        FieldSpec { element: "CostCenter", key: "cost_center" },
        FieldSpec { element: "CompanyCode", key: "company_code" },
    ],
};

/// Parser for SAP HCM exports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SapHcmParser;

impl SchemaParser for SapHcmParser {
    fn dialect(&self) -> SchemaDialect {
        SchemaDialect::SapHcm
    }

    fn layout(&self) -> &'static SchemaLayout {
        &LAYOUT
    }
}
