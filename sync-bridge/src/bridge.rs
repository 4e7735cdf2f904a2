//! SessionBridge: handle-based boundary over engine sessions.
//!
//! Callers hold plain integer handles; the bridge resolves them through a
//! generational arena, marshals text arguments, steps the session state
//! machine and forwards the resulting calls to the engine.

use std::collections::VecDeque;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::RwLock;
use sync_core::{Action, Event, HandleArena, SessionState, UnbindMode};
use sync_engine::{ClientRegistry, EngineError, SessionObserver};
use sync_types::{AccessToken, LocalPath, RemoteUrl, SessionHandle, Version};
use tokio::sync::RwLockReadGuard;
use tracing::{debug, info, warn, Instrument};

use crate::boundary::{caught_panic, guard_async, guard_sync};
use crate::config::BridgeConfig;
use crate::entry::{GuardedObserver, SessionEntry};
use crate::error::BridgeError;
use crate::metrics::{BridgeMetrics, MetricsSnapshot};
use crate::types::{Operation, SessionInfo};

/// Handle-based session bridge.
///
/// Every public method is a boundary operation: it never panics and reports
/// failures as [`BridgeError`].
pub struct SessionBridge {
    config: BridgeConfig,
    clients: Arc<ClientRegistry>,
    sessions: RwLock<HandleArena<Arc<SessionEntry>>>,
    metrics: Arc<BridgeMetrics>,
}

impl std::fmt::Debug for SessionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBridge")
            .field("config", &self.config)
            .field("clients", &self.clients)
            .field("sessions_count", &self.sessions.read().len())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl SessionBridge {
    /// Create a bridge resolving client handles through `clients`.
    pub fn new(config: BridgeConfig, clients: Arc<ClientRegistry>) -> Self {
        let arena = match config.limits.session_limit() {
            Some(limit) => HandleArena::with_limit(limit),
            None => HandleArena::new(),
        };
        Self {
            config,
            clients,
            sessions: RwLock::new(arena),
            metrics: Arc::new(BridgeMetrics::default()),
        }
    }

    /// Configuration the bridge was built with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Registry client handles are resolved through.
    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Copy of the bridge counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.len())
    }

    /// Convert a caller's raw handle, counting a rejection against `operation`.
    pub fn handle_from_raw(
        &self,
        operation: Operation,
        raw: u64,
    ) -> Result<SessionHandle, BridgeError> {
        guard_sync(operation, &self.metrics, || Ok(SessionHandle::from_raw(raw)?))
    }

    /// Open an engine session for `local_path` and allocate a handle for it.
    ///
    /// Returns `Ok(None)` when `client` names no registered engine client.
    pub fn create(
        &self,
        client: u64,
        local_path: &str,
        observer: Option<Arc<dyn SessionObserver>>,
    ) -> Result<Option<SessionHandle>, BridgeError> {
        let _span = tracing::debug_span!("create", client).entered();
        guard_sync(Operation::Create, &self.metrics, || {
            self.create_inner(client, local_path, observer)
        })
    }

    fn create_inner(
        &self,
        client: u64,
        local_path: &str,
        observer: Option<Arc<dyn SessionObserver>>,
    ) -> Result<Option<SessionHandle>, BridgeError> {
        let Some(engine) = self.clients.resolve(client) else {
            debug!("Unknown client handle {}", client);
            return Ok(None);
        };
        let local_path = LocalPath::parse(local_path)?;

        let observer = observer
            .map(|inner| Arc::new(GuardedObserver::new(inner, Arc::clone(&self.metrics))));
        let session = engine
            .open_session(
                &local_path,
                observer
                    .clone()
                    .map(|guarded| guarded as Arc<dyn SessionObserver>),
            )
            .map_err(|e| rejected(Operation::Create, e))?;

        let entry = Arc::new(SessionEntry::new(
            local_path.clone(),
            Arc::clone(&session),
            observer,
        ));
        let inserted = self.sessions.write().insert(entry);
        let handle = match inserted {
            Ok(handle) => handle,
            Err(err) => {
                session.abort();
                return Err(err.into());
            }
        };

        BridgeMetrics::incr(&self.metrics.sessions_created);
        info!("Created session {} for {}", handle, local_path);
        Ok(Some(handle))
    }

    /// Attach the session to a remote endpoint.
    ///
    /// On engine failure the session returns to `created` and may be bound again.
    pub async fn bind(
        &self,
        handle: SessionHandle,
        remote_url: &str,
        access_token: &str,
    ) -> Result<(), BridgeError> {
        let span = tracing::debug_span!("bind", %handle);
        guard_async(
            Operation::Bind,
            &self.metrics,
            async {
                let entry = self.entry(handle)?;
                let remote_url = RemoteUrl::parse(remote_url)?;
                let token = AccessToken::parse(access_token)?;
                self.request(
                    &entry,
                    handle,
                    Operation::Bind,
                    Event::BindRequested { remote_url, token },
                )
                .await
            }
            .instrument(span),
        )
        .await
    }

    /// Release the handle at once and abort the engine session.
    ///
    /// In-flight calls are not waited for. Also escalates a pending
    /// [`unbind_graceful`](Self::unbind_graceful).
    pub fn unbind(&self, handle: SessionHandle) -> Result<(), BridgeError> {
        let _span = tracing::debug_span!("unbind", %handle).entered();
        guard_sync(Operation::Unbind, &self.metrics, || self.release_now(handle))
    }

    fn release_now(&self, handle: SessionHandle) -> Result<(), BridgeError> {
        let entry = self.entry(handle)?;
        let actions = self.submit(
            &entry,
            handle,
            Operation::Unbind,
            Event::UnbindRequested {
                mode: UnbindMode::Forced,
            },
        )?;
        self.drive_now(&entry, handle, Operation::Unbind, actions)
    }

    /// Signal stop, wait for in-flight calls to drain, then release.
    ///
    /// The wait is bounded by `shutdown.quiesce_timeout_ms`; past it the
    /// session is aborted and released anyway.
    pub async fn unbind_graceful(&self, handle: SessionHandle) -> Result<(), BridgeError> {
        let span = tracing::debug_span!("unbind_graceful", %handle);
        guard_async(
            Operation::Unbind,
            &self.metrics,
            async {
                let entry = self.entry(handle)?;
                // Quiescing takes the gate exclusively, so this path must not hold it.
                let actions = self.submit(
                    &entry,
                    handle,
                    Operation::Unbind,
                    Event::UnbindRequested {
                        mode: UnbindMode::Graceful,
                    },
                )?;
                self.drive(&entry, handle, Operation::Unbind, actions).await
            }
            .instrument(span),
        )
        .await
    }

    /// Replace the credential of a bound session.
    ///
    /// Success or failure, the session stays bound.
    pub async fn refresh(
        &self,
        handle: SessionHandle,
        access_token: &str,
    ) -> Result<(), BridgeError> {
        let span = tracing::debug_span!("refresh", %handle);
        guard_async(
            Operation::Refresh,
            &self.metrics,
            async {
                let entry = self.entry(handle)?;
                let token = AccessToken::parse(access_token)?;
                self.request(
                    &entry,
                    handle,
                    Operation::Refresh,
                    Event::RefreshRequested { token },
                )
                .await
            }
            .instrument(span),
        )
        .await
    }

    /// Tell the engine a local transaction reached `version`.
    ///
    /// Repeated or lower versions are forwarded as well.
    pub fn notify_commit_happened(
        &self,
        handle: SessionHandle,
        version: i64,
    ) -> Result<(), BridgeError> {
        let _span = tracing::debug_span!("notify_commit", %handle).entered();
        guard_sync(Operation::NotifyCommit, &self.metrics, || {
            let entry = self.entry(handle)?;
            let version = Version::from_caller(version)?;
            let _in_flight = enter(&entry, handle, Operation::NotifyCommit)?;
            let actions = self.submit(
                &entry,
                handle,
                Operation::NotifyCommit,
                Event::CommitNotified { version },
            )?;
            self.drive_now(&entry, handle, Operation::NotifyCommit, actions)
        })
    }

    /// Current lifecycle state of a live handle.
    pub fn state(&self, handle: SessionHandle) -> Result<SessionState, BridgeError> {
        guard_sync(Operation::Describe, &self.metrics, || {
            Ok(self.entry(handle)?.state())
        })
    }

    /// Snapshot of a live handle.
    pub fn describe(&self, handle: SessionHandle) -> Result<SessionInfo, BridgeError> {
        guard_sync(Operation::Describe, &self.metrics, || {
            let entry = self.entry(handle)?;
            let state = entry.state();
            Ok(SessionInfo {
                handle: handle.to_raw(),
                local_path: entry.local_path.to_string(),
                state: state.name(),
                last_version: state.last_version().map(|v| v.value()),
            })
        })
    }

    /// Force-unbind every live session. Returns how many were released.
    pub fn unbind_all(&self) -> usize {
        let handles = self.sessions.read().handles();
        let released = self.release_each(handles);
        if released > 0 {
            info!("Released {} sessions", released);
        }
        released
    }

    /// Force-unbind `handles`, skipping any another caller released first.
    ///
    /// Teardown sweeps are not caller errors, so nothing is recorded against
    /// the boundary counters except caught panics.
    fn release_each(&self, handles: Vec<SessionHandle>) -> usize {
        handles
            .into_iter()
            .filter(|handle| {
                match panic::catch_unwind(AssertUnwindSafe(|| self.release_now(*handle))) {
                    Ok(Ok(())) => true,
                    Ok(Err(err)) => {
                        debug!("Skipping {} during unbind_all: {}", handle, err);
                        false
                    }
                    Err(payload) => {
                        caught_panic(&self.metrics, Operation::Unbind, payload);
                        false
                    }
                }
            })
            .count()
    }

    fn entry(&self, handle: SessionHandle) -> Result<Arc<SessionEntry>, BridgeError> {
        Ok(Arc::clone(self.sessions.read().get(handle)?))
    }

    /// Step a caller request, refusing it when the state yields no actions.
    fn submit(
        &self,
        entry: &SessionEntry,
        handle: SessionHandle,
        operation: Operation,
        event: Event,
    ) -> Result<Vec<Action>, BridgeError> {
        debug_assert!(event.is_request());
        let (state, actions) = entry.step(event);
        if actions.is_empty() {
            return Err(refused(handle, operation, state));
        }
        Ok(actions)
    }

    /// Enter the in-flight gate, then step and drive the request inside it.
    async fn request(
        &self,
        entry: &Arc<SessionEntry>,
        handle: SessionHandle,
        operation: Operation,
        event: Event,
    ) -> Result<(), BridgeError> {
        let _in_flight = enter(entry, handle, operation)?;
        let actions = self.submit(entry, handle, operation, event)?;
        self.drive(entry, handle, operation, actions).await
    }

    /// Execute actions, feeding completions back into the state machine.
    ///
    /// Keeps going after a failed action and returns the first error.
    async fn drive(
        &self,
        entry: &Arc<SessionEntry>,
        handle: SessionHandle,
        operation: Operation,
        actions: Vec<Action>,
    ) -> Result<(), BridgeError> {
        let mut queue: VecDeque<Action> = actions.into();
        let mut outcome = Ok(());

        while let Some(action) = queue.pop_front() {
            match action {
                Action::ForwardBind { remote_url, token } => {
                    debug!("Forwarding bind for {} to {}", handle, remote_url);
                    let result = self
                        .forward(entry, Operation::Bind, entry.session.bind(&remote_url, &token))
                        .await;
                    let event = match &result {
                        Ok(()) => {
                            BridgeMetrics::incr(&self.metrics.binds);
                            Event::BindSucceeded
                        }
                        Err(err) => Event::BindFailed {
                            error: failure_detail(err),
                        },
                    };
                    queue.extend(self.complete(entry, handle, event));
                    outcome = outcome.and(result);
                }
                Action::ForwardRefresh { token } => {
                    debug!("Forwarding refresh for {}", handle);
                    let result = self
                        .forward(entry, Operation::Refresh, entry.session.refresh(&token))
                        .await;
                    let event = match &result {
                        Ok(()) => {
                            BridgeMetrics::incr(&self.metrics.refreshes);
                            Event::RefreshSucceeded
                        }
                        Err(err) => Event::RefreshFailed {
                            error: failure_detail(err),
                        },
                    };
                    queue.extend(self.complete(entry, handle, event));
                    outcome = outcome.and(result);
                }
                Action::SignalStop => {
                    debug!("Signalling stop for {}", handle);
                    match AssertUnwindSafe(entry.session.shutdown())
                        .catch_unwind()
                        .await
                    {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => warn!("Stop signal for {} failed: {}", handle, err),
                        Err(payload) => {
                            caught_panic(&self.metrics, operation, payload);
                        }
                    }
                }
                Action::AwaitQuiesced => {
                    let timeout = self.config.shutdown.quiesce_timeout();
                    let event = match tokio::time::timeout(timeout, entry.in_flight.write()).await
                    {
                        Ok(_quiesced) => Event::Quiesced,
                        Err(_) => {
                            warn!(
                                "Session {} did not quiesce within {:?}, aborting",
                                handle, timeout
                            );
                            Event::QuiesceTimedOut
                        }
                    };
                    queue.extend(self.complete(entry, handle, event));
                }
                action => {
                    outcome = outcome.and(self.apply_now(entry, handle, operation, action));
                }
            }
        }
        outcome
    }

    /// Execute actions that never wait.
    fn drive_now(
        &self,
        entry: &Arc<SessionEntry>,
        handle: SessionHandle,
        operation: Operation,
        actions: Vec<Action>,
    ) -> Result<(), BridgeError> {
        actions.into_iter().fold(Ok(()), |outcome, action| {
            outcome.and(self.apply_now(entry, handle, operation, action))
        })
    }

    fn apply_now(
        &self,
        entry: &Arc<SessionEntry>,
        handle: SessionHandle,
        operation: Operation,
        action: Action,
    ) -> Result<(), BridgeError> {
        match action {
            Action::ForwardCommit {
                version,
                regression,
            } => {
                if regression {
                    debug!(
                        "Commit version {} for {} does not advance past the highest notified",
                        version.value(),
                        handle
                    );
                }
                match panic::catch_unwind(AssertUnwindSafe(|| entry.session.notify_commit(version)))
                {
                    Ok(Ok(())) => {
                        BridgeMetrics::incr(&self.metrics.commits_forwarded);
                        Ok(())
                    }
                    Ok(Err(err)) => Err(rejected(Operation::NotifyCommit, err)),
                    Err(payload) => Err(caught_panic(&self.metrics, operation, payload)),
                }
            }
            Action::Abort => {
                debug!("Aborting engine session for {}", handle);
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| entry.session.abort()))
                {
                    caught_panic(&self.metrics, operation, payload);
                }
                Ok(())
            }
            Action::Release => {
                let removed = self.sessions.write().remove(handle);
                match removed {
                    Ok(_) => {
                        BridgeMetrics::incr(&self.metrics.sessions_released);
                        info!("Released session {} ({})", handle, entry.local_path);
                    }
                    Err(err) => debug!("Session {} already released: {}", handle, err),
                }
                Ok(())
            }
            Action::EmitEvent(event) => match &entry.observer {
                Some(observer) => observer.deliver(&event).map_err(BridgeError::Internal),
                None => Ok(()),
            },
            Action::ForwardBind { .. }
            | Action::ForwardRefresh { .. }
            | Action::SignalStop
            | Action::AwaitQuiesced => Err(BridgeError::Internal(format!(
                "{operation} produced an action that must be awaited"
            ))),
        }
    }

    /// Feed a completion event back. Completions the state no longer
    /// expects (the handle was unbound meanwhile) are dropped.
    fn complete(&self, entry: &SessionEntry, handle: SessionHandle, event: Event) -> Vec<Action> {
        debug_assert!(!event.is_request());
        let (state, actions) = entry.step(event);
        if actions.is_empty() {
            debug!("Completion for {} arrived while {}, ignored", handle, state);
        }
        actions
    }

    /// Run one forwarded engine call. The caller already holds the in-flight gate.
    async fn forward<F>(
        &self,
        entry: &SessionEntry,
        operation: Operation,
        call: F,
    ) -> Result<(), BridgeError>
    where
        F: Future<Output = Result<(), EngineError>>,
    {
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(rejected(operation, err)),
            Err(payload) => Err(caught_panic(&self.metrics, operation, payload)),
        }
    }
}

/// Take a shared guard on the entry's in-flight gate.
///
/// Only a graceful unbind ever takes the gate exclusively, so a contended
/// gate means the session is stopping and the call is refused.
fn enter<'a>(
    entry: &'a SessionEntry,
    handle: SessionHandle,
    operation: Operation,
) -> Result<RwLockReadGuard<'a, ()>, BridgeError> {
    entry
        .in_flight
        .try_read()
        .map_err(|_| refused(handle, operation, entry.state().name()))
}

fn rejected(operation: Operation, err: EngineError) -> BridgeError {
    BridgeError::EngineRejected {
        operation,
        message: err.to_string(),
    }
}

/// A request the state machine refused. An unbound entry means another
/// caller released the handle first.
fn refused(handle: SessionHandle, operation: Operation, state: &'static str) -> BridgeError {
    if state == SessionState::Unbound.name() {
        BridgeError::InvalidHandle(format!("session {handle} already released"))
    } else {
        BridgeError::InvalidState { operation, state }
    }
}

fn failure_detail(err: &BridgeError) -> String {
    match err {
        BridgeError::EngineRejected { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use sync_engine::MockEngine;
    use sync_types::ErrorKind;

    fn setup() -> (SessionBridge, MockEngine, u64) {
        let registry = Arc::new(ClientRegistry::new());
        let engine = MockEngine::new();
        let client = registry.register(Arc::new(engine.clone())).to_raw();
        (
            SessionBridge::new(BridgeConfig::default(), registry),
            engine,
            client,
        )
    }

    async fn bound(bridge: &SessionBridge, client: u64) -> SessionHandle {
        let handle = bridge.create(client, "/tmp/a.realm", None).unwrap().unwrap();
        bridge
            .bind(handle, "realm://example/a", "token123")
            .await
            .unwrap();
        handle
    }

    // ===========================================
    // Create Tests
    // ===========================================

    #[test]
    fn create_allocates_nonzero_handle() {
        let (bridge, engine, client) = setup();
        let handle = bridge.create(client, "/tmp/a.realm", None).unwrap().unwrap();

        assert_ne!(handle.to_raw(), SessionHandle::NULL_RAW);
        assert_eq!(bridge.len(), 1);
        assert_eq!(bridge.state(handle).unwrap(), SessionState::Created);
        assert_eq!(engine.sessions().len(), 1);
    }

    #[test]
    fn create_with_unknown_client_returns_none() {
        let (bridge, engine, _) = setup();

        assert_eq!(bridge.create(0, "/tmp/a.realm", None), Ok(None));
        assert_eq!(bridge.create(77, "/tmp/a.realm", None), Ok(None));
        assert!(engine.sessions().is_empty());
        assert!(bridge.is_empty());
    }

    #[test]
    fn create_rejects_empty_path() {
        let (bridge, _, client) = setup();
        let err = bridge.create(client, "", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Marshaling);
    }

    #[test]
    fn create_reports_open_failure() {
        let (bridge, engine, client) = setup();
        engine.fail_next_open(EngineError::Rejected("locked".into()));

        let err = bridge.create(client, "/tmp/a.realm", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineRejected);
        assert!(bridge.is_empty());
    }

    // ===========================================
    // Bind / Refresh / Commit Tests
    // ===========================================

    #[tokio::test]
    async fn bind_forwards_to_engine() {
        let (bridge, engine, client) = setup();
        let handle = bound(&bridge, client).await;

        assert!(bridge.state(handle).unwrap().is_bound());
        assert_eq!(
            engine.last_session().unwrap().binds(),
            vec![("realm://example/a".to_string(), "token123".to_string())]
        );
        assert_eq!(bridge.metrics().binds, 1);
    }

    #[tokio::test]
    async fn failed_bind_returns_to_created() {
        let (bridge, engine, client) = setup();
        let handle = bridge.create(client, "/tmp/a.realm", None).unwrap().unwrap();
        engine.fail_next_bind(EngineError::InvalidCredential("expired".into()));

        let err = bridge
            .bind(handle, "realm://example/a", "token123")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineRejected);
        assert_eq!(bridge.state(handle).unwrap(), SessionState::Created);

        // Retry succeeds
        bridge
            .bind(handle, "realm://example/a", "token123")
            .await
            .unwrap();
        assert!(bridge.state(handle).unwrap().is_bound());
    }

    #[tokio::test]
    async fn bind_twice_is_invalid_state() {
        let (bridge, _, client) = setup();
        let handle = bound(&bridge, client).await;

        let err = bridge
            .bind(handle, "realm://example/a", "token123")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::InvalidState {
                operation: Operation::Bind,
                state: "bound"
            }
        );
    }

    #[tokio::test]
    async fn refresh_keeps_binding() {
        let (bridge, engine, client) = setup();
        let handle = bound(&bridge, client).await;

        bridge.refresh(handle, "token456").await.unwrap();
        assert!(bridge.state(handle).unwrap().is_bound());

        engine.fail_next_refresh(EngineError::InvalidCredential("revoked".into()));
        let err = bridge.refresh(handle, "token789").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineRejected);
        assert!(bridge.state(handle).unwrap().is_bound());

        bridge.notify_commit_happened(handle, 3).unwrap();
        let mock = engine.last_session().unwrap();
        assert_eq!(mock.refreshes(), vec!["token456".to_string()]);
        assert_eq!(mock.binds().len(), 1);
        assert_eq!(mock.commits(), vec![Version::new(3)]);
    }

    #[tokio::test]
    async fn refresh_before_bind_is_invalid_state() {
        let (bridge, _, client) = setup();
        let handle = bridge.create(client, "/tmp/a.realm", None).unwrap().unwrap();

        let err = bridge.refresh(handle, "token456").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn commit_before_bind_is_invalid_state() {
        let (bridge, engine, client) = setup();
        let handle = bridge.create(client, "/tmp/a.realm", None).unwrap().unwrap();

        let err = bridge.notify_commit_happened(handle, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(engine.last_session().unwrap().commits().is_empty());
    }

    #[tokio::test]
    async fn negative_version_is_marshaling_error() {
        let (bridge, _, client) = setup();
        let handle = bound(&bridge, client).await;

        let err = bridge.notify_commit_happened(handle, -4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Marshaling);
    }

    #[tokio::test]
    async fn regressing_versions_are_forwarded() {
        let (bridge, engine, client) = setup();
        let handle = bound(&bridge, client).await;

        for version in [5, 5, 2, 9] {
            bridge.notify_commit_happened(handle, version).unwrap();
        }

        let commits: Vec<u64> = engine
            .last_session()
            .unwrap()
            .commits()
            .iter()
            .map(|v| v.value())
            .collect();
        assert_eq!(commits, vec![5, 5, 2, 9]);
        assert_eq!(bridge.describe(handle).unwrap().last_version, Some(9));
        assert_eq!(bridge.metrics().commits_forwarded, 4);
    }

    // ===========================================
    // Unbind Tests
    // ===========================================

    #[tokio::test]
    async fn unbind_releases_and_aborts() {
        let (bridge, engine, client) = setup();
        let handle = bound(&bridge, client).await;

        bridge.unbind(handle).unwrap();
        assert!(bridge.is_empty());
        assert!(engine.last_session().unwrap().is_aborted());

        let err = bridge.notify_commit_happened(handle, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHandle);
        let err = bridge.unbind(handle).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHandle);
    }

    #[tokio::test]
    async fn graceful_unbind_signals_stop() {
        let (bridge, engine, client) = setup();
        let handle = bound(&bridge, client).await;

        bridge.unbind_graceful(handle).await.unwrap();

        let mock = engine.last_session().unwrap();
        assert_eq!(mock.shutdown_count(), 1);
        assert!(!mock.is_aborted());
        assert!(bridge.is_empty());
        assert_eq!(bridge.metrics().sessions_released, 1);
    }

    #[test]
    fn unbind_all_releases_everything() {
        let (bridge, engine, client) = setup();
        for _ in 0..3 {
            bridge.create(client, "/tmp/a.realm", None).unwrap();
        }

        assert_eq!(bridge.unbind_all(), 3);
        assert!(bridge.is_empty());
        assert!(engine.sessions().iter().all(|s| s.is_aborted()));
    }

    #[test]
    fn unbind_all_skips_released_handles_quietly() {
        let (bridge, _, client) = setup();
        let gone = bridge.create(client, "/tmp/a.realm", None).unwrap().unwrap();
        let live = bridge.create(client, "/tmp/b.realm", None).unwrap().unwrap();
        bridge.unbind(gone).unwrap();

        assert_eq!(bridge.release_each(vec![gone, live]), 1);
        assert!(bridge.is_empty());
        let metrics = bridge.metrics();
        assert_eq!(metrics.boundary_errors, 0);
        assert_eq!(metrics.stale_handle_rejections, 0);
        assert_eq!(metrics.sessions_released, 2);
    }

    #[tokio::test]
    async fn calls_are_refused_while_quiescing() {
        let (bridge, engine, client) = setup();
        let handle = bound(&bridge, client).await;
        let entry = bridge.entry(handle).unwrap();
        let in_flight = entry.in_flight.read().await;

        let unbind = bridge.unbind_graceful(handle);
        tokio::pin!(unbind);
        let pending = tokio::time::timeout(Duration::from_millis(20), &mut unbind).await;
        assert!(pending.is_err());

        let err = bridge.notify_commit_happened(handle, 1).unwrap_err();
        assert_eq!(
            err,
            BridgeError::InvalidState {
                operation: Operation::NotifyCommit,
                state: "stopping"
            }
        );
        let err = bridge.refresh(handle, "token456").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        drop(in_flight);
        unbind.await.unwrap();
        let mock = engine.last_session().unwrap();
        assert!(mock.commits().is_empty());
        assert!(mock.refreshes().is_empty());
        assert!(!mock.is_aborted());
    }

    // ===========================================
    // Boundary Tests
    // ===========================================

    #[tokio::test]
    async fn engine_panic_becomes_internal() {
        let (bridge, engine, client) = setup();
        let handle = bridge.create(client, "/tmp/a.realm", None).unwrap().unwrap();
        engine.panic_next_bind();

        let err = bridge
            .bind(handle, "realm://example/a", "token123")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(bridge.state(handle).unwrap(), SessionState::Created);
        assert_eq!(bridge.metrics().panics_caught, 1);
    }

    #[test]
    fn null_raw_handle_is_rejected() {
        let (bridge, _, _) = setup();
        let err = bridge.handle_from_raw(Operation::Bind, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHandle);
        assert_eq!(bridge.metrics().stale_handle_rejections, 1);
    }

    #[test]
    fn describe_reports_path_and_state() {
        let (bridge, _, client) = setup();
        let handle = bridge.create(client, "/tmp/a.realm", None).unwrap().unwrap();

        let info = bridge.describe(handle).unwrap();
        assert_eq!(info.handle, handle.to_raw());
        assert_eq!(info.local_path, "/tmp/a.realm");
        assert_eq!(info.state, "created");
        assert_eq!(info.last_version, None);
    }
}
