//! Ingestion orchestrator.
//!
//! Drives one job through `uploaded -> validating -> processing ->
//! completed | failed`:
//!
//! - **validating**: fetch the document, parse it, reject duplicate keys.
//! - **processing**: transform every record, then reconcile the valid ones in
//!   document order under the configured [`CommitScope`].
//!
//! Any error moves the job to `failed` with the error text in
//! `error_details`. Counters are written once the batch's fate is known.

use std::sync::Arc;

use hrhub_core::collaborators::{
    DocumentSource, EmployeeStore, EmployeeUnitOfWork, IngestionJob, JobTracker,
};
use hrhub_core::duplicate_detection::check_batch;
use hrhub_core::employee::{CanonicalEmployeeRecord, ChangeType};
use hrhub_core::ingestion_status::JobStatus;
use hrhub_core::schema::{parse_document, EmployeeMatch, SchemaDialect};
use hrhub_core::transform::{DataTransformer, ValidationFailed};
use hrhub_core::types::DbId;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::call::{cancellable, timed};
use crate::config::{CommitScope, PipelineConfig};
use crate::error::IngestError;
use crate::reconciler::Reconciler;

/// Number of validation failures quoted in a job's `error_details`.
const SUMMARY_REASON_LIMIT: usize = 3;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Outcome of a completed job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: DbId,
    pub dialect: SchemaDialect,
    pub employee_match: EmployeeMatch,
    pub employee_count: usize,
    pub records_processed: usize,
    pub records_failed: usize,
    pub employees_created: usize,
    pub employees_updated: usize,
    pub change_entries: usize,
    /// `error_details` written for a partial success.
    pub summary: Option<String>,
}

/// A record excluded by validation, with its position in the document.
#[derive(Debug, Clone)]
struct RecordFailure {
    index: usize,
    error: ValidationFailed,
}

impl RecordFailure {
    fn describe(&self) -> String {
        if self.error.employee_id.is_empty() {
            format!("record {}: {}", self.index, self.error)
        } else {
            format!("record {} ({}): {}", self.index, self.error.employee_id, self.error)
        }
    }
}

/// Partial-success text: the failure count plus the first few reasons.
fn failure_summary(processed: usize, failures: &[RecordFailure]) -> String {
    let reasons: Vec<String> = failures
        .iter()
        .take(SUMMARY_REASON_LIMIT)
        .map(RecordFailure::describe)
        .collect();
    let more = failures.len().saturating_sub(SUMMARY_REASON_LIMIT);
    let tail = if more > 0 {
        format!(" (and {more} more)")
    } else {
        String::new()
    };
    format!(
        "Processed {processed} records; {} failed validation: {}{tail}",
        failures.len(),
        reasons.join("; "),
    )
}

fn counter(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Job state
// ---------------------------------------------------------------------------

/// The pipeline's view of a job's status, advanced only along valid edges.
struct JobRun<'a> {
    tracker: &'a dyn JobTracker,
    config: PipelineConfig,
    job_id: DbId,
    status: JobStatus,
    /// Records whose employee data is already committed.
    committed: usize,
}

impl JobRun<'_> {
    async fn advance(&mut self, to: JobStatus) -> Result<(), IngestError> {
        if !self.status.can_transition_to(to) {
            return Err(IngestError::InvalidTransition {
                job_id: self.job_id,
                from: self.status,
                to,
            });
        }
        timed(
            "job status update",
            self.config.call_timeout,
            self.tracker.set_status(self.job_id, to),
        )
        .await?;
        tracing::debug!(job_id = self.job_id, from = %self.status, to = %to, "Job status changed");
        self.status = to;
        Ok(())
    }

    async fn add_counters(&self, processed: usize, failed: usize) -> Result<(), IngestError> {
        if processed == 0 && failed == 0 {
            return Ok(());
        }
        timed(
            "job counter update",
            self.config.call_timeout,
            self.tracker
                .increment_counters(self.job_id, counter(processed), counter(failed)),
        )
        .await
    }

    async fn set_error(&self, detail: &str) -> Result<(), IngestError> {
        timed(
            "job error update",
            self.config.call_timeout,
            self.tracker.set_error(self.job_id, detail),
        )
        .await
    }

    /// Record `error` on the job and move it to `failed`. Tracker failures
    /// here are logged, not returned.
    ///
    /// When employee data was already committed the detail names how many
    /// records.
    async fn fail(&mut self, error: &IngestError) {
        tracing::error!(
            job_id = self.job_id,
            status = %self.status,
            retryable = error.is_retryable(),
            committed = self.committed,
            error = %error,
            "Ingestion job failed",
        );
        if self.status.is_terminal() {
            return;
        }
        let detail = if self.committed > 0 {
            tracing::error!(
                job_id = self.job_id,
                committed = self.committed,
                "Employee data committed before the failure; job counters may be incomplete",
            );
            format!("{error} (committed records: {})", self.committed)
        } else {
            error.to_string()
        };
        if let Err(e) = self.set_error(&detail).await {
            tracing::error!(job_id = self.job_id, error = %e, "Failed to record job error");
        }
        if let Err(e) = self.advance(JobStatus::Failed).await {
            tracing::error!(job_id = self.job_id, error = %e, "Failed to mark job failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs ingestion jobs against a fixed set of collaborators.
#[derive(Clone)]
pub struct IngestionPipeline {
    documents: Arc<dyn DocumentSource>,
    store: Arc<dyn EmployeeStore>,
    tracker: Arc<dyn JobTracker>,
    config: PipelineConfig,
}

impl IngestionPipeline {
    pub fn new(
        documents: Arc<dyn DocumentSource>,
        store: Arc<dyn EmployeeStore>,
        tracker: Arc<dyn JobTracker>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            documents,
            store,
            tracker,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one job to a terminal status.
    ///
    /// The job must be `uploaded`; otherwise it is left untouched and
    /// [`IngestError::InvalidTransition`] is returned. Once started, every
    /// error (including cancellation) leaves the job `failed`.
    pub async fn run(
        &self,
        job_id: DbId,
        cancel: &CancellationToken,
    ) -> Result<JobReport, IngestError> {
        let job = timed(
            "job load",
            self.config.call_timeout,
            self.tracker.load(job_id),
        )
        .await?;

        if job.status != JobStatus::Uploaded {
            return Err(IngestError::InvalidTransition {
                job_id,
                from: job.status,
                to: JobStatus::Validating,
            });
        }
        let mut run = JobRun {
            tracker: self.tracker.as_ref(),
            config: self.config,
            job_id,
            status: job.status,
            committed: 0,
        };

        tracing::info!(
            job_id,
            source_id = job.source_id,
            file_path = %job.file_path,
            commit_scope = %self.config.commit_scope,
            "Ingestion job started",
        );

        match self.execute(&job, &mut run, cancel).await {
            Ok(report) => {
                tracing::info!(
                    job_id,
                    source_id = job.source_id,
                    dialect = report.dialect.as_str(),
                    employee_count = report.employee_count,
                    records_processed = report.records_processed,
                    records_failed = report.records_failed,
                    created = report.employees_created,
                    updated = report.employees_updated,
                    change_entries = report.change_entries,
                    "Ingestion job completed",
                );
                Ok(report)
            }
            Err(e) => {
                run.fail(&e).await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        job: &IngestionJob,
        run: &mut JobRun<'_>,
        cancel: &CancellationToken,
    ) -> Result<JobReport, IngestError> {
        // -- Validating ------------------------------------------------------
        run.advance(JobStatus::Validating).await?;

        let document = cancellable(
            cancel,
            "document fetch",
            self.config.call_timeout,
            self.documents.fetch(job),
        )
        .await?;

        let parsed = parse_document(&document)?;
        tracing::info!(
            job_id = job.id,
            dialect = parsed.dialect.as_str(),
            employee_match = ?parsed.employee_match,
            employee_count = parsed.employee_count(),
            "Document parsed",
        );
        check_batch(&parsed.employees)?;

        // -- Processing ------------------------------------------------------
        run.advance(JobStatus::Processing).await?;

        let transformer = DataTransformer::new(job.source_id);
        let mut valid: Vec<CanonicalEmployeeRecord> = Vec::with_capacity(parsed.employees.len());
        let mut failures: Vec<RecordFailure> = Vec::new();
        for (index, raw) in parsed.employees.iter().enumerate() {
            match transformer.transform(raw) {
                Ok(record) => valid.push(record),
                Err(error) => {
                    tracing::warn!(
                        job_id = job.id,
                        index,
                        employee_id = %error.employee_id,
                        error = %error,
                        "Record failed validation",
                    );
                    failures.push(RecordFailure { index, error });
                }
            }
        }

        if valid.is_empty() {
            run.add_counters(0, failures.len()).await?;
            return Err(IngestError::NoValidRecords {
                failed: failures.len(),
            });
        }

        let reconciler = Reconciler::new(job.id, self.config.call_timeout);
        let mut tally = Tally::default();
        let outcome = match self.config.commit_scope {
            CommitScope::Job => {
                self.reconcile_as_one_unit(job.source_id, &reconciler, &valid, cancel, &mut tally)
                    .await
            }
            CommitScope::Record => {
                self.reconcile_per_record(job.source_id, &reconciler, &valid, cancel, &mut tally)
                    .await
            }
        };
        run.committed = tally.committed;

        run.add_counters(tally.committed, failures.len()).await?;
        outcome?;

        let summary = (!failures.is_empty()).then(|| failure_summary(tally.committed, &failures));
        if let Some(summary) = &summary {
            run.set_error(summary).await?;
        }
        run.advance(JobStatus::Completed).await?;

        Ok(JobReport {
            job_id: job.id,
            dialect: parsed.dialect,
            employee_match: parsed.employee_match,
            employee_count: parsed.employee_count(),
            records_processed: tally.committed,
            records_failed: failures.len(),
            employees_created: tally.created,
            employees_updated: tally.updated,
            change_entries: tally.entries,
            summary,
        })
    }

    /// Reconcile every record in one unit of work and commit once.
    async fn reconcile_as_one_unit(
        &self,
        source_id: DbId,
        reconciler: &Reconciler,
        records: &[CanonicalEmployeeRecord],
        cancel: &CancellationToken,
        tally: &mut Tally,
    ) -> Result<(), IngestError> {
        let mut uow = self.begin(source_id, cancel).await?;
        let mut pending = Tally::default();

        for record in records {
            let result = if cancel.is_cancelled() {
                Err(IngestError::Cancelled)
            } else {
                reconciler.reconcile(uow.as_mut(), record, cancel).await
            };
            match result {
                Ok(outcome) => pending.record(outcome.change_type, outcome.entries),
                Err(e) => {
                    self.rollback(uow, rollback_reason(&e)).await;
                    return Err(e);
                }
            }
        }

        self.commit(uow).await?;
        tally.absorb(pending);
        Ok(())
    }

    /// Reconcile and commit each record on its own. Records committed before
    /// a failure stay committed.
    async fn reconcile_per_record(
        &self,
        source_id: DbId,
        reconciler: &Reconciler,
        records: &[CanonicalEmployeeRecord],
        cancel: &CancellationToken,
        tally: &mut Tally,
    ) -> Result<(), IngestError> {
        for record in records {
            if cancel.is_cancelled() {
                return Err(IngestError::Cancelled);
            }
            let mut uow = self.begin(source_id, cancel).await?;
            match reconciler.reconcile(uow.as_mut(), record, cancel).await {
                Ok(outcome) => {
                    self.commit(uow).await?;
                    let mut single = Tally::default();
                    single.record(outcome.change_type, outcome.entries);
                    tally.absorb(single);
                }
                Err(e) => {
                    self.rollback(uow, rollback_reason(&e)).await;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn begin(
        &self,
        source_id: DbId,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn EmployeeUnitOfWork>, IngestError> {
        cancellable(
            cancel,
            "store begin",
            self.config.call_timeout,
            self.store.begin(source_id),
        )
        .await
    }

    /// Commits are awaited without a timeout: an abandoned commit could land
    /// after the job was already marked failed.
    async fn commit(&self, uow: Box<dyn EmployeeUnitOfWork>) -> Result<(), IngestError> {
        uow.commit().await.map_err(IngestError::from)
    }

    async fn rollback(&self, uow: Box<dyn EmployeeUnitOfWork>, reason: &'static str) {
        tracing::debug!(reason, "Rolling back unit of work");
        if let Err(e) = timed("store rollback", self.config.call_timeout, uow.rollback()).await {
            tracing::warn!(error = %e, "Rollback failed");
        }
    }
}

fn rollback_reason(error: &IngestError) -> &'static str {
    match error {
        IngestError::Cancelled => "cancelled",
        IngestError::Timeout { .. } => "timeout",
        _ => "error",
    }
}

/// Reconciliation counts of committed work.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    committed: usize,
    created: usize,
    updated: usize,
    entries: usize,
}

impl Tally {
    fn record(&mut self, change_type: ChangeType, entries: usize) {
        self.committed += 1;
        self.entries += entries;
        match change_type {
            ChangeType::Created => self.created += 1,
            ChangeType::Updated => self.updated += 1,
        }
    }

    fn absorb(&mut self, other: Tally) {
        self.committed += other.committed;
        self.created += other.created;
        self.updated += other.updated;
        self.entries += other.entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(index: usize, employee_id: &str, missing: &'static str) -> RecordFailure {
        RecordFailure {
            index,
            error: ValidationFailed {
                employee_id: employee_id.to_string(),
                missing_fields: vec![missing],
            },
        }
    }

    #[test]
    fn summary_quotes_first_three_reasons() {
        let failures = vec![
            failure(1, "EMP002", "first_name"),
            failure(2, "", "employee_id"),
            failure(4, "EMP005", "last_name"),
            failure(6, "EMP007", "last_name"),
        ];
        assert_eq!(
            failure_summary(3, &failures),
            "Processed 3 records; 4 failed validation: \
             record 1 (EMP002): Validation failed: first_name is required; \
             record 2: Validation failed: employee_id is required; \
             record 4 (EMP005): Validation failed: last_name is required (and 1 more)"
        );
    }

    #[test]
    fn summary_without_overflow_has_no_tail() {
        let failures = vec![failure(0, "EMP001", "first_name")];
        assert_eq!(
            failure_summary(2, &failures),
            "Processed 2 records; 1 failed validation: \
             record 0 (EMP001): Validation failed: first_name is required"
        );
    }

    #[test]
    fn tally_counts_by_change_type() {
        let mut tally = Tally::default();
        tally.record(ChangeType::Created, 6);
        tally.record(ChangeType::Updated, 1);
        tally.record(ChangeType::Updated, 0);
        assert_eq!(tally.committed, 3);
        assert_eq!(tally.created, 1);
        assert_eq!(tally.updated, 2);
        assert_eq!(tally.entries, 7);
    }
}
