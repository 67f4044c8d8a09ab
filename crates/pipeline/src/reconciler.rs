//! Upsert-with-change-tracking of canonical records inside a unit of work.

use std::time::Duration;

use hrhub_core::change_tracking::{creation_changes, update_changes};
use hrhub_core::collaborators::EmployeeUnitOfWork;
use hrhub_core::employee::{CanonicalEmployeeRecord, ChangeType, NewChangeLogEntry, PersistedEmployee};
use hrhub_core::types::DbId;
use tokio_util::sync::CancellationToken;

use crate::call::cancellable;
use crate::error::IngestError;

/// Result of reconciling one record.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub employee: PersistedEmployee,
    pub change_type: ChangeType,
    /// Number of change log entries appended.
    pub entries: usize,
}

/// Reconciles the records of one job against the employee store.
#[derive(Debug, Clone)]
pub struct Reconciler {
    job_id: DbId,
    call_timeout: Duration,
}

impl Reconciler {
    pub fn new(job_id: DbId, call_timeout: Duration) -> Self {
        Self {
            job_id,
            call_timeout,
        }
    }

    /// Create or update the employee behind `record` and append the matching
    /// change log entries, all within `uow`.
    ///
    /// An absent employee gets one `created` entry per populated field. A
    /// present one gets one `updated` entry per differing tracked field and
    /// is then overwritten with the incoming record.
    pub async fn reconcile(
        &self,
        uow: &mut dyn EmployeeUnitOfWork,
        record: &CanonicalEmployeeRecord,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, IngestError> {
        let existing = cancellable(
            cancel,
            "employee lookup",
            self.call_timeout,
            uow.find_by_natural_key(record.source_id, &record.source_employee_id),
        )
        .await?;

        let (change_type, changes) = match &existing {
            Some(current) => (ChangeType::Updated, update_changes(current, record)),
            None => (ChangeType::Created, creation_changes(record)),
        };

        let employee = cancellable(
            cancel,
            "employee upsert",
            self.call_timeout,
            uow.upsert(record),
        )
        .await?;

        let entries: Vec<NewChangeLogEntry> = changes
            .into_iter()
            .map(|change| change.into_entry(employee.id, self.job_id, change_type))
            .collect();

        if !entries.is_empty() {
            cancellable(
                cancel,
                "change log append",
                self.call_timeout,
                uow.append_change_log(&entries),
            )
            .await?;
        }

        match change_type {
            ChangeType::Created => tracing::debug!(
                job_id = self.job_id,
                source_id = record.source_id,
                employee_id = %record.source_employee_id,
                entries = entries.len(),
                "Created employee",
            ),
            ChangeType::Updated => tracing::debug!(
                job_id = self.job_id,
                source_id = record.source_id,
                employee_id = %record.source_employee_id,
                entries = entries.len(),
                "Updated employee",
            ),
        }

        Ok(ReconcileOutcome {
            employee,
            change_type,
            entries: entries.len(),
        })
    }
}
