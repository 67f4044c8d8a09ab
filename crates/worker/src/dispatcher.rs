//! Ingestion job dispatcher.
//!
//! Polls for `uploaded` jobs every `poll_interval` and runs each claimed job
//! on a [`JoinSet`], with at most `concurrency` jobs in flight. Uses
//! `SELECT FOR UPDATE SKIP LOCKED` via
//! [`IngestionJobRepo::claim_next_uploaded`] to prevent double-dispatch.
//!
//! A claimed job whose run fails before it leaves `uploaded` is either
//! released for a later claim (retryable errors) or failed outright. Claims
//! older than the lease are taken back, which covers a worker that died
//! between claiming and starting a job.

use std::sync::Arc;
use std::time::Duration;

use hrhub_core::types::DbId;
use hrhub_db::repositories::IngestionJobRepo;
use hrhub_pipeline::{IngestError, IngestionPipeline};
use sqlx::PgPool;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Default age after which an unstarted claim is taken back.
pub const DEFAULT_CLAIM_LEASE: Duration = Duration::from_secs(300);

/// Default time in-flight jobs get to finish after shutdown is requested.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Background ingestion dispatcher.
pub struct JobDispatcher {
    pool: PgPool,
    pipeline: IngestionPipeline,
    poll_interval: Duration,
    claim_lease: Duration,
    shutdown_grace: Duration,
    permits: Arc<Semaphore>,
}

impl JobDispatcher {
    pub fn new(
        pool: PgPool,
        pipeline: IngestionPipeline,
        poll_interval: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            pool,
            pipeline,
            poll_interval,
            claim_lease: DEFAULT_CLAIM_LEASE,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    pub fn with_claim_lease(mut self, lease: Duration) -> Self {
        self.claim_lease = lease;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Run the dispatcher loop until `shutdown` is triggered.
    ///
    /// Polling stops at once; in-flight jobs keep running for up to the
    /// shutdown grace period and are cancelled only when it elapses.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        let mut running: JoinSet<()> = JoinSet::new();
        let jobs = CancellationToken::new();
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            concurrency = self.permits.available_permits(),
            claim_lease_secs = self.claim_lease.as_secs(),
            "Ingestion dispatcher started",
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(in_flight = running.len(), "Ingestion dispatcher shutting down");
                    break;
                }
                Some(joined) = running.join_next(), if !running.is_empty() => {
                    log_join(joined);
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.dispatch_available(&mut running, &jobs).await {
                        tracing::error!(error = %e, "Dispatch cycle failed");
                    }
                }
            }
        }

        if tokio::time::timeout(self.shutdown_grace, drain(&mut running))
            .await
            .is_err()
        {
            tracing::warn!(
                in_flight = running.len(),
                grace_secs = self.shutdown_grace.as_secs(),
                "Shutdown grace period elapsed, cancelling in-flight jobs",
            );
            jobs.cancel();
            drain(&mut running).await;
        }
        tracing::info!("Ingestion dispatcher stopped");
    }

    /// One dispatch cycle: claim jobs while permits remain.
    async fn dispatch_available(
        &self,
        running: &mut JoinSet<()>,
        jobs: &CancellationToken,
    ) -> Result<(), sqlx::Error> {
        loop {
            let Ok(permit) = self.permits.clone().try_acquire_owned() else {
                return Ok(());
            };
            let claimed =
                IngestionJobRepo::claim_next_uploaded(&self.pool, self.claim_lease).await?;
            let Some(job) = claimed else {
                return Ok(());
            };
            tracing::info!(job_id = job.id, source_id = job.source_id, "Ingestion job claimed");
            self.spawn(running, job.id, permit, jobs.clone());
        }
    }

    fn spawn(
        &self,
        running: &mut JoinSet<()>,
        job_id: DbId,
        permit: OwnedSemaphorePermit,
        cancel: CancellationToken,
    ) {
        let pipeline = self.pipeline.clone();
        let pool = self.pool.clone();
        running.spawn(async move {
            let _permit = permit;
            if let Err(e) = pipeline.run(job_id, &cancel).await {
                tracing::warn!(job_id, retryable = e.is_retryable(), error = %e, "Ingestion job did not complete");
                settle_unstarted(&pool, job_id, &e).await;
            }
        });
    }
}

async fn drain(running: &mut JoinSet<()>) {
    while let Some(joined) = running.join_next().await {
        log_join(joined);
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Ingestion task panicked");
    }
}

/// Settle a job whose run failed while it was still `uploaded`.
///
/// Retryable failures release the claim; anything else fails the job with
/// the error text. Jobs that already left `uploaded` are not touched.
async fn settle_unstarted(pool: &PgPool, job_id: DbId, error: &IngestError) {
    let retryable = error.is_retryable();
    let settled = if retryable {
        IngestionJobRepo::release_claim(pool, job_id).await
    } else {
        IngestionJobRepo::fail_unstarted(pool, job_id, &error.to_string()).await
    };
    match settled {
        Ok(true) if retryable => {
            tracing::info!(job_id, error = %error, "Released claim on unstarted job");
        }
        Ok(true) => tracing::warn!(job_id, error = %error, "Failed unstarted job"),
        Ok(false) => {}
        Err(e) => tracing::error!(job_id, error = %e, "Failed to settle unstarted job"),
    }
}
