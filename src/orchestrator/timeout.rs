use std::future::Future;
use std::time::Duration;

use crate::error::{CartToolsError, Result};

/// Wait at most `max_wait` for `operation`.
///
/// The operation runs on its own task and is left running when the timer
/// wins: a page call that already reached the store can still complete (and
/// still mutate the cart) after the caller has been told it timed out.
pub async fn with_timeout<T, F>(operation: F, max_wait: Duration, label: &str) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(operation);

    match tokio::time::timeout(max_wait, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(CartToolsError::Other(format!(
            "{} failed: {}",
            label, join_error
        ))),
        Err(_) => {
            tracing::debug!("{} still running after {:?}; no longer waiting", label, max_wait);
            Err(CartToolsError::Timeout {
                label: label.to_string(),
                ms: u64::try_from(max_wait.as_millis()).unwrap_or(u64::MAX),
            })
        }
    }
}
