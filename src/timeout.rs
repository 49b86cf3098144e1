//! Deadlines for blocking work such as loading archived sessions.
//!
//! The closure runs on tokio's blocking pool. When the deadline passes the caller gets
//! [`DriveGradeError::Timeout`] immediately and the closure's
//! [`CancellationToken`] is cancelled; closures that check the token stop early, others
//! run to completion and their result is dropped.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{DriveGradeError, Result};

/// Deadline applied to archived session loads unless configured otherwise.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(45);

pub async fn run_with_timeout<T, F>(description: &str, timeout: Duration, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(CancellationToken) -> Result<T> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = tokio::task::spawn_blocking(move || work(token));

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(DriveGradeError::provider_failed_with_source(
            description,
            "blocking task panicked or was cancelled",
            Box::new(join_error),
        )),
        Err(_) => {
            cancel.cancel();
            warn!(description, ?timeout, "Blocking operation timed out");
            Err(DriveGradeError::Timeout { description: description.to_string(), timeout })
        }
    }
}
