//! Timeout wrapper for store and catalog calls

use std::{future::Future, time::Duration};

use crate::error::ApplicationError;

/// Default bound on a single store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Await `fut` for at most `limit`, surfacing expiry as a transient
/// [`ApplicationError::Timeout`]
///
/// Dropping the future on expiry cancels it; the adapters only commit in a
/// single statement, so nothing partial is left behind.
pub async fn bounded<T, F>(limit: Duration, what: &str, fut: F) -> Result<T, ApplicationError>
where
    F: Future<Output = Result<T, ApplicationError>>,
{
    tokio::time::timeout(limit, fut).await.map_err(|_| {
        ApplicationError::Timeout(format!("{what} did not finish within {} ms", limit.as_millis()))
    })?
}
