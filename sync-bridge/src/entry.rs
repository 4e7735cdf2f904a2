//! Per-handle session wrapper.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use sync_core::{Action, Event, SessionEvent, SessionState};
use sync_engine::{EngineSession, SessionObserver};
use sync_types::LocalPath;
use tokio::sync::RwLock;

use crate::boundary::panic_message;
use crate::metrics::BridgeMetrics;

/// What the arena stores for each live handle.
///
/// Held behind an `Arc` so a forced unbind can detach it while a forwarded
/// call still runs against it.
pub(crate) struct SessionEntry {
    pub(crate) local_path: LocalPath,
    pub(crate) session: Arc<dyn EngineSession>,
    pub(crate) observer: Option<Arc<GuardedObserver>>,
    state: Mutex<SessionState>,
    /// Shared by each forwarded call, taken exclusively to await quiescence.
    pub(crate) in_flight: RwLock<()>,
}

impl SessionEntry {
    pub(crate) fn new(
        local_path: LocalPath,
        session: Arc<dyn EngineSession>,
        observer: Option<Arc<GuardedObserver>>,
    ) -> Self {
        Self {
            local_path,
            session,
            observer,
            state: Mutex::new(SessionState::new()),
            in_flight: RwLock::new(()),
        }
    }

    /// Feed one event to the state machine.
    ///
    /// Returns the name of the state the event arrived in, plus the actions
    /// the transition produced.
    pub(crate) fn step(&self, event: Event) -> (&'static str, Vec<Action>) {
        let mut state = self.state.lock();
        let previous = std::mem::take(&mut *state);
        let name = previous.name();
        let (next, actions) = previous.on_event(event);
        *state = next;
        (name, actions)
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state.lock().clone()
    }
}

impl std::fmt::Debug for SessionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEntry")
            .field("local_path", &self.local_path)
            .field("state", &*self.state.lock())
            .field("has_observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

/// Caller observer with panics contained.
///
/// The engine receives this wrapper too, so events raised on engine threads
/// cannot unwind into the engine either.
pub(crate) struct GuardedObserver {
    inner: Arc<dyn SessionObserver>,
    metrics: Arc<BridgeMetrics>,
}

impl GuardedObserver {
    pub(crate) fn new(inner: Arc<dyn SessionObserver>, metrics: Arc<BridgeMetrics>) -> Self {
        Self { inner, metrics }
    }

    /// Deliver an event, returning the panic message if the observer panicked.
    pub(crate) fn deliver(&self, event: &SessionEvent) -> Result<(), String> {
        panic::catch_unwind(AssertUnwindSafe(|| self.inner.on_event(event))).map_err(|payload| {
            BridgeMetrics::incr(&self.metrics.panics_caught);
            let message = panic_message(payload.as_ref());
            tracing::warn!(
                event = event.kind(),
                "Observer panicked delivering event: {}",
                message
            );
            message
        })
    }
}

impl SessionObserver for GuardedObserver {
    fn on_event(&self, event: &SessionEvent) {
        // Engine threads have nobody to report to; deliver() already logged it.
        let _ = self.deliver(event);
    }
}
