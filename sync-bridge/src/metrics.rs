//! Operational counters for the bridge.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bridge activity counters.
///
/// All counters are monotonically increasing for the life of the bridge.
/// Thread-safe via `AtomicU64`, no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// Sessions allocated by create.
    pub sessions_created: AtomicU64,
    /// Sessions released by any unbind.
    pub sessions_released: AtomicU64,
    /// Binds the engine accepted.
    pub binds: AtomicU64,
    /// Refreshes the engine accepted.
    pub refreshes: AtomicU64,
    /// Commit notifications forwarded to the engine.
    pub commits_forwarded: AtomicU64,
    /// Calls rejected for a null, stale or unknown handle.
    pub stale_handle_rejections: AtomicU64,
    /// Errors returned across the boundary.
    pub boundary_errors: AtomicU64,
    /// Panics caught in the engine, marshaling or observers.
    pub panics_caught: AtomicU64,
}

/// Point-in-time copy of [`BridgeMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Live sessions at snapshot time.
    pub sessions_live: u64,
    /// Sessions allocated by create.
    pub sessions_created: u64,
    /// Sessions released by any unbind.
    pub sessions_released: u64,
    /// Binds the engine accepted.
    pub binds: u64,
    /// Refreshes the engine accepted.
    pub refreshes: u64,
    /// Commit notifications forwarded to the engine.
    pub commits_forwarded: u64,
    /// Calls rejected for a null, stale or unknown handle.
    pub stale_handle_rejections: u64,
    /// Errors returned across the boundary.
    pub boundary_errors: u64,
    /// Panics caught in the engine, marshaling or observers.
    pub panics_caught: u64,
}

impl BridgeMetrics {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy every counter.
    pub fn snapshot(&self, sessions_live: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_live: sessions_live as u64,
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            sessions_released: self.sessions_released.load(Ordering::Relaxed),
            binds: self.binds.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            commits_forwarded: self.commits_forwarded.load(Ordering::Relaxed),
            stale_handle_rejections: self.stale_handle_rejections.load(Ordering::Relaxed),
            boundary_errors: self.boundary_errors.load(Ordering::Relaxed),
            panics_caught: self.panics_caught.load(Ordering::Relaxed),
        }
    }
}
