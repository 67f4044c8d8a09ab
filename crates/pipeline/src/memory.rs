//! In-memory collaborators for tests and embedding.
//!
//! The employee store serializes units of work per source with an async
//! mutex and stages writes until commit, mirroring the PostgreSQL store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hrhub_core::collaborators::{
    DocumentSource, EmployeeStore, EmployeeUnitOfWork, IngestionJob, JobTracker,
};
use hrhub_core::employee::{
    CanonicalEmployeeRecord, ChangeLogEntry, NewChangeLogEntry, PersistedEmployee,
};
use hrhub_core::error::{DocumentError, StoreError, TrackerError};
use hrhub_core::ingestion_status::JobStatus;
use hrhub_core::types::DbId;
use tokio::sync::OwnedMutexGuard;

type NaturalKey = (DbId, String);

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Database("in-memory store lock poisoned".into()))
}

// ---------------------------------------------------------------------------
// Employee store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    employees: BTreeMap<NaturalKey, PersistedEmployee>,
    change_log: Vec<ChangeLogEntry>,
}

/// Failures injected into the in-memory store.
#[derive(Debug, Default, Clone)]
struct Faults {
    fail_upsert_for: HashSet<String>,
    upsert_delay: Option<Duration>,
    commit_delay: Option<Duration>,
}

#[derive(Default)]
struct StoreInner {
    state: Mutex<StoreState>,
    source_locks: Mutex<HashMap<DbId, Arc<tokio::sync::Mutex<()>>>>,
    faults: Mutex<Faults>,
    next_employee_id: AtomicI64,
    next_entry_id: AtomicI64,
}

/// Employee store kept entirely in memory.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryEmployeeStore {
    inner: Arc<StoreInner>,
}

impl InMemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later upsert of `employee_id` fail with a database error.
    pub fn fail_upsert_for(&self, employee_id: &str) {
        if let Ok(mut faults) = self.inner.faults.lock() {
            faults.fail_upsert_for.insert(employee_id.to_string());
        }
    }

    /// Delay every later upsert by `delay`.
    pub fn delay_upserts(&self, delay: Duration) {
        if let Ok(mut faults) = self.inner.faults.lock() {
            faults.upsert_delay = Some(delay);
        }
    }

    /// Delay every later commit by `delay`. Staged writes land once it ends.
    pub fn delay_commits(&self, delay: Duration) {
        if let Ok(mut faults) = self.inner.faults.lock() {
            faults.commit_delay = Some(delay);
        }
    }

    /// Committed employees of a source, ordered by natural key.
    pub fn employees(&self, source_id: DbId) -> Vec<PersistedEmployee> {
        self.inner
            .state
            .lock()
            .map(|state| {
                state
                    .employees
                    .values()
                    .filter(|e| e.source_id == source_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn employee(&self, source_id: DbId, employee_id: &str) -> Option<PersistedEmployee> {
        let state = self.inner.state.lock().ok()?;
        state
            .employees
            .get(&(source_id, employee_id.to_string()))
            .cloned()
    }

    /// Every committed change log entry, in append order.
    pub fn change_log(&self) -> Vec<ChangeLogEntry> {
        self.inner
            .state
            .lock()
            .map(|state| state.change_log.clone())
            .unwrap_or_default()
    }

    pub fn change_log_for_job(&self, ingestion_job_id: DbId) -> Vec<ChangeLogEntry> {
        self.change_log()
            .into_iter()
            .filter(|e| e.ingestion_job_id == ingestion_job_id)
            .collect()
    }

    fn source_lock(&self, source_id: DbId) -> Result<Arc<tokio::sync::Mutex<()>>, StoreError> {
        let mut locks = lock(&self.inner.source_locks)?;
        Ok(locks.entry(source_id).or_default().clone())
    }
}

#[async_trait]
impl EmployeeStore for InMemoryEmployeeStore {
    async fn begin(&self, source_id: DbId) -> Result<Box<dyn EmployeeUnitOfWork>, StoreError> {
        let guard = self.source_lock(source_id)?.lock_owned().await;
        Ok(Box::new(InMemoryUnitOfWork {
            store: self.clone(),
            _guard: guard,
            employees: BTreeMap::new(),
            entries: Vec::new(),
        }))
    }
}

/// Staged writes of one in-memory unit of work.
pub struct InMemoryUnitOfWork {
    store: InMemoryEmployeeStore,
    _guard: OwnedMutexGuard<()>,
    employees: BTreeMap<NaturalKey, PersistedEmployee>,
    entries: Vec<ChangeLogEntry>,
}

#[async_trait]
impl EmployeeUnitOfWork for InMemoryUnitOfWork {
    async fn find_by_natural_key(
        &mut self,
        source_id: DbId,
        employee_id: &str,
    ) -> Result<Option<PersistedEmployee>, StoreError> {
        let key = (source_id, employee_id.to_string());
        if let Some(staged) = self.employees.get(&key) {
            return Ok(Some(staged.clone()));
        }
        let state = lock(&self.store.inner.state)?;
        Ok(state.employees.get(&key).cloned())
    }

    async fn upsert(
        &mut self,
        record: &CanonicalEmployeeRecord,
    ) -> Result<PersistedEmployee, StoreError> {
        let faults = lock(&self.store.inner.faults)?.clone();
        if let Some(delay) = faults.upsert_delay {
            tokio::time::sleep(delay).await;
        }
        if faults.fail_upsert_for.contains(&record.source_employee_id) {
            return Err(StoreError::Database(format!(
                "injected upsert failure for {}",
                record.source_employee_id
            )));
        }

        let existing = self
            .find_by_natural_key(record.source_id, &record.source_employee_id)
            .await?;
        let now = Utc::now();
        let (id, created_at) = match &existing {
            Some(e) => (e.id, e.created_at),
            None => (
                self.store.inner.next_employee_id.fetch_add(1, Ordering::SeqCst) + 1,
                now,
            ),
        };

        let employee = PersistedEmployee {
            id,
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
            created_at,
            updated_at: now,
        };
        self.employees.insert(
            (record.source_id, record.source_employee_id.clone()),
            employee.clone(),
        );
        Ok(employee)
    }

    async fn append_change_log(
        &mut self,
        entries: &[NewChangeLogEntry],
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        self.entries.extend(entries.iter().map(|e| ChangeLogEntry {
            id: self.store.inner.next_entry_id.fetch_add(1, Ordering::SeqCst) + 1,
            employee_id: e.employee_id,
            ingestion_job_id: e.ingestion_job_id,
            field_name: e.field_name.clone(),
            old_value: e.old_value.clone(),
            new_value: e.new_value.clone(),
            change_type: e.change_type,
            created_at: now,
        }));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let delay = lock(&self.store.inner.faults)?.commit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let this = *self;
        let mut state = lock(&this.store.inner.state)?;
        state.employees.extend(this.employees);
        state.change_log.extend(this.entries);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Job tracker
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TrackerState {
    jobs: HashMap<DbId, IngestionJob>,
    history: HashMap<DbId, Vec<JobStatus>>,
    next_id: DbId,
    fail_counters: bool,
}

/// Job tracker kept entirely in memory. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryJobTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl InMemoryJobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, TrackerState>, TrackerError> {
        self.state
            .lock()
            .map_err(|_| TrackerError::Database("in-memory tracker lock poisoned".into()))
    }

    /// Register a new job in `uploaded` status.
    pub fn create(&self, source_id: DbId, file_path: &str) -> Result<IngestionJob, TrackerError> {
        let mut state = self.state()?;
        state.next_id += 1;
        let job = IngestionJob {
            id: state.next_id,
            source_id,
            file_path: file_path.to_string(),
            status: JobStatus::Uploaded,
            records_processed: 0,
            records_failed: 0,
            error_details: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        state.jobs.insert(job.id, job.clone());
        state.history.insert(job.id, vec![JobStatus::Uploaded]);
        Ok(job)
    }

    /// Make every later counter update fail with a database error.
    pub fn fail_counter_updates(&self) {
        if let Ok(mut state) = self.state() {
            state.fail_counters = true;
        }
    }

    /// Every status the job has been in, oldest first.
    pub fn status_history(&self, job_id: DbId) -> Vec<JobStatus> {
        self.state()
            .ok()
            .and_then(|state| state.history.get(&job_id).cloned())
            .unwrap_or_default()
    }

    fn with_job<T>(
        &self,
        job_id: DbId,
        f: impl FnOnce(&mut IngestionJob) -> T,
    ) -> Result<T, TrackerError> {
        let mut state = self.state()?;
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or(TrackerError::JobNotFound(job_id))?;
        Ok(f(job))
    }
}

#[async_trait]
impl JobTracker for InMemoryJobTracker {
    async fn load(&self, job_id: DbId) -> Result<IngestionJob, TrackerError> {
        self.with_job(job_id, |job| job.clone())
    }

    async fn set_status(&self, job_id: DbId, status: JobStatus) -> Result<(), TrackerError> {
        self.with_job(job_id, |job| {
            job.status = status;
            if status == JobStatus::Validating && job.started_at.is_none() {
                job.started_at = Some(Utc::now());
            }
            if status.is_terminal() {
                job.completed_at = Some(Utc::now());
            }
        })?;
        let mut state = self.state()?;
        state.history.entry(job_id).or_default().push(status);
        Ok(())
    }

    async fn increment_counters(
        &self,
        job_id: DbId,
        processed: i32,
        failed: i32,
    ) -> Result<(), TrackerError> {
        if self.state()?.fail_counters {
            return Err(TrackerError::Database("injected counter update failure".into()));
        }
        self.with_job(job_id, |job| {
            job.records_processed += processed;
            job.records_failed += failed;
        })
    }

    async fn set_error(&self, job_id: DbId, detail: &str) -> Result<(), TrackerError> {
        self.with_job(job_id, |job| job.error_details = Some(detail.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Document source
// ---------------------------------------------------------------------------

/// Document source serving bytes registered per job id.
#[derive(Clone, Default)]
pub struct InMemoryDocumentSource {
    documents: Arc<Mutex<HashMap<DbId, Vec<u8>>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl InMemoryDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job_id: DbId, document: impl Into<Vec<u8>>) {
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(job_id, document.into());
        }
    }

    /// Delay every later fetch by `delay`.
    pub fn delay_fetches(&self, delay: Duration) {
        if let Ok(mut slot) = self.delay.lock() {
            *slot = Some(delay);
        }
    }
}

#[async_trait]
impl DocumentSource for InMemoryDocumentSource {
    async fn fetch(&self, job: &IngestionJob) -> Result<Vec<u8>, DocumentError> {
        let delay = self.delay.lock().ok().and_then(|slot| *slot);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.documents
            .lock()
            .map_err(|_| DocumentError::Io("in-memory document lock poisoned".into()))?
            .get(&job.id)
            .cloned()
            .ok_or(DocumentError::NotFound { job_id: job.id })
    }
}
