use std::sync::Arc;

use hrhub_db::store::{PgEmployeeStore, PgJobTracker};
use hrhub_pipeline::document::LocalDirectoryDocumentSource;
use hrhub_pipeline::IngestionPipeline;
use hrhub_worker::config::WorkerConfig;
use hrhub_worker::dispatcher::JobDispatcher;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env().expect("invalid worker configuration");
    hrhub_worker::logging::init(config.log_format);

    let pool = hrhub_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    hrhub_db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    tracing::info!(
        document_root = %config.document_root.display(),
        commit_scope = %config.pipeline.commit_scope,
        "Worker starting",
    );

    let pipeline = IngestionPipeline::new(
        Arc::new(LocalDirectoryDocumentSource::new(&config.document_root)),
        Arc::new(PgEmployeeStore::new(pool.clone())),
        Arc::new(PgJobTracker::new(pool.clone())),
        config.pipeline,
    );
    let dispatcher = JobDispatcher::new(pool, pipeline, config.poll_interval, config.concurrency)
        .with_claim_lease(config.claim_lease)
        .with_shutdown_grace(config.shutdown_grace);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        shutdown.cancel();
    });

    dispatcher.run(cancel).await;
}
