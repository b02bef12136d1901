use std::future::Future;
use std::time::Duration;

use crate::domain::DomainError;

/// Awaits an upstream call, turning an elapsed `limit` into a retryable
/// [`DomainError::UpstreamTimeout`].
pub async fn with_deadline<F>(
    limit: Duration,
    operation: &str,
    call: F,
) -> Result<F::Output, DomainError>
where
    F: Future,
{
    tokio::time::timeout(limit, call).await.map_err(|_| {
        DomainError::timeout(format!(
            "{operation} did not finish within {}s",
            limit.as_secs()
        ))
    })
}
