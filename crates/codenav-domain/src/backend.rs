//! Timeout enforcement for backing calls.

use std::future::Future;
use std::time::Duration;

use codenav_storage::StorageResult;
use tokio::time::timeout;

use crate::error::{DomainError, DomainResult};

/// Awaits a backing call, failing with [`DomainError::Timeout`] once `limit` elapses.
///
/// The not-found kinds stay inside `Ok(Err(_))` so callers can memoize them
/// before anything is converted into a domain error.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> DomainResult<StorageResult<T>>
where
    F: Future<Output = StorageResult<T>>,
{
    timeout(limit, call).await.map_err(|_| DomainError::Timeout {
        duration_ms: limit.as_millis() as u64,
    })
}
