//! Timeout and cancellation wrappers for collaborator calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::IngestError;

/// Await `fut` for at most `limit`.
pub(crate) async fn timed<T, E, F>(
    operation: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, IngestError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<IngestError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "Collaborator call timed out");
            Err(IngestError::Timeout {
                operation,
                after: limit,
            })
        }
    }
}

/// [`timed`], abandoned early with [`IngestError::Cancelled`] once `cancel` fires.
pub(crate) async fn cancellable<T, E, F>(
    cancel: &CancellationToken,
    operation: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, IngestError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<IngestError>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(IngestError::Cancelled),
        result = timed(operation, limit, fut) => result,
    }
}
