//! Catch-and-translate boundary.
//!
//! Every public bridge operation runs through [`guard_sync`] or
//! [`guard_async`]: panics become [`BridgeError::Internal`] and every error
//! that crosses the boundary is counted.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures_util::FutureExt;

use crate::error::BridgeError;
use crate::metrics::BridgeMetrics;
use crate::types::Operation;
use sync_types::ErrorKind;

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Count a caught panic and turn it into an error.
pub(crate) fn caught_panic(
    metrics: &BridgeMetrics,
    operation: Operation,
    payload: Box<dyn Any + Send>,
) -> BridgeError {
    BridgeMetrics::incr(&metrics.panics_caught);
    let message = panic_message(payload.as_ref());
    tracing::warn!(%operation, "Caught panic at bridge boundary: {}", message);
    BridgeError::Internal(message)
}

/// Run a synchronous operation behind the boundary.
pub(crate) fn guard_sync<T, F>(
    operation: Operation,
    metrics: &BridgeMetrics,
    call: F,
) -> Result<T, BridgeError>
where
    F: FnOnce() -> Result<T, BridgeError>,
{
    let result = panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(caught_panic(metrics, operation, payload)));
    record(operation, metrics, result)
}

/// Run an asynchronous operation behind the boundary.
pub(crate) async fn guard_async<T, F>(
    operation: Operation,
    metrics: &BridgeMetrics,
    call: F,
) -> Result<T, BridgeError>
where
    F: Future<Output = Result<T, BridgeError>>,
{
    let result = AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(caught_panic(metrics, operation, payload)));
    record(operation, metrics, result)
}

fn record<T>(
    operation: Operation,
    metrics: &BridgeMetrics,
    result: Result<T, BridgeError>,
) -> Result<T, BridgeError> {
    if let Err(err) = &result {
        BridgeMetrics::incr(&metrics.boundary_errors);
        match err.kind() {
            ErrorKind::InvalidHandle => {
                BridgeMetrics::incr(&metrics.stale_handle_rejections);
                tracing::debug!(%operation, "Rejected handle: {}", err);
            }
            ErrorKind::EngineRejected => {
                tracing::warn!(%operation, "{}", err);
            }
            // Already logged where the panic was caught
            ErrorKind::Internal => {}
            _ => {
                tracing::debug!(%operation, "{}", err);
            }
        }
    }
    result
}
