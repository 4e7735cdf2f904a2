//! Mock engine for testing.
//!
//! Records every forwarded call and lets tests inject failures, delays and
//! panics into the next engine call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sync_core::SessionEvent;
use sync_types::{AccessToken, LocalPath, RemoteUrl, Version};

use crate::error::EngineError;
use crate::session::{EngineClient, EngineSession, SessionObserver};

/// Mock engine client.
///
/// Clones share state, so a test can keep one clone for inspection and hand
/// another to a registry.
#[derive(Debug, Default, Clone)]
pub struct MockEngine {
    sessions: Arc<Mutex<Vec<MockSession>>>,
    faults: Arc<Mutex<Faults>>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_next_open: Option<EngineError>,
    fail_next_bind: Option<EngineError>,
    fail_next_refresh: Option<EngineError>,
    fail_next_commit: Option<EngineError>,
    panic_next_bind: bool,
    bind_delay: Option<Duration>,
    commit_delay: Option<Duration>,
}

impl MockEngine {
    /// Create a new mock engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every session opened so far, in order.
    pub fn sessions(&self) -> Vec<MockSession> {
        self.sessions.lock().clone()
    }

    /// The most recently opened session.
    pub fn last_session(&self) -> Option<MockSession> {
        self.sessions.lock().last().cloned()
    }

    /// Cause the next open_session() to fail with the given error.
    pub fn fail_next_open(&self, error: EngineError) {
        self.faults.lock().fail_next_open = Some(error);
    }

    /// Cause the next bind() on any session to fail with the given error.
    pub fn fail_next_bind(&self, error: EngineError) {
        self.faults.lock().fail_next_bind = Some(error);
    }

    /// Cause the next refresh() on any session to fail with the given error.
    pub fn fail_next_refresh(&self, error: EngineError) {
        self.faults.lock().fail_next_refresh = Some(error);
    }

    /// Cause the next notify_commit() on any session to fail with the given error.
    pub fn fail_next_commit(&self, error: EngineError) {
        self.faults.lock().fail_next_commit = Some(error);
    }

    /// Cause the next bind() on any session to panic.
    pub fn panic_next_bind(&self) {
        self.faults.lock().panic_next_bind = true;
    }

    /// Delay every bind() by `delay` before it completes.
    pub fn set_bind_delay(&self, delay: Option<Duration>) {
        self.faults.lock().bind_delay = delay;
    }

    /// Block every notify_commit() for `delay` before it is recorded.
    pub fn set_commit_delay(&self, delay: Option<Duration>) {
        self.faults.lock().commit_delay = delay;
    }
}

impl EngineClient for MockEngine {
    fn open_session(
        &self,
        local_path: &LocalPath,
        observer: Option<Arc<dyn SessionObserver>>,
    ) -> Result<Arc<dyn EngineSession>, EngineError> {
        if let Some(error) = self.faults.lock().fail_next_open.take() {
            return Err(error);
        }

        let session = MockSession {
            local_path: local_path.clone(),
            record: Arc::new(Mutex::new(SessionRecord::default())),
            faults: Arc::clone(&self.faults),
            observer,
        };
        self.sessions.lock().push(session.clone());
        Ok(Arc::new(session))
    }
}

/// Mock engine session.
#[derive(Clone)]
pub struct MockSession {
    local_path: LocalPath,
    record: Arc<Mutex<SessionRecord>>,
    faults: Arc<Mutex<Faults>>,
    observer: Option<Arc<dyn SessionObserver>>,
}

#[derive(Debug, Default)]
struct SessionRecord {
    binds: Vec<(String, String)>,
    refreshes: Vec<String>,
    commits: Vec<Version>,
    shutdowns: usize,
    aborted: bool,
}

impl std::fmt::Debug for MockSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSession")
            .field("local_path", &self.local_path)
            .field("record", &*self.record.lock())
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

impl MockSession {
    /// Path the session was opened for.
    pub fn local_path(&self) -> &LocalPath {
        &self.local_path
    }

    /// Every accepted bind as `(remote_url, token)`.
    pub fn binds(&self) -> Vec<(String, String)> {
        self.record.lock().binds.clone()
    }

    /// Every accepted refresh token.
    pub fn refreshes(&self) -> Vec<String> {
        self.record.lock().refreshes.clone()
    }

    /// Every accepted commit version, in arrival order.
    pub fn commits(&self) -> Vec<Version> {
        self.record.lock().commits.clone()
    }

    /// How many times shutdown() was called.
    pub fn shutdown_count(&self) -> usize {
        self.record.lock().shutdowns
    }

    /// Whether abort() was called.
    pub fn is_aborted(&self) -> bool {
        self.record.lock().aborted
    }

    /// Whether an observer was attached at open time.
    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Raise an engine-originated error towards the observer.
    pub fn emit_error(&self, message: &str) {
        if let Some(observer) = &self.observer {
            observer.on_event(&SessionEvent::EngineError {
                message: message.to_string(),
            });
        }
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.record.lock().aborted {
            return Err(EngineError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl EngineSession for MockSession {
    async fn bind(&self, remote_url: &RemoteUrl, token: &AccessToken) -> Result<(), EngineError> {
        let (delay, fault, panic) = {
            let mut faults = self.faults.lock();
            (
                faults.bind_delay,
                faults.fail_next_bind.take(),
                std::mem::take(&mut faults.panic_next_bind),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if panic {
            panic!("mock engine panicked during bind");
        }
        self.ensure_open()?;
        if let Some(error) = fault {
            return Err(error);
        }

        self.record
            .lock()
            .binds
            .push((remote_url.to_string(), token.expose().to_string()));
        Ok(())
    }

    async fn refresh(&self, token: &AccessToken) -> Result<(), EngineError> {
        self.ensure_open()?;
        if let Some(error) = self.faults.lock().fail_next_refresh.take() {
            return Err(error);
        }

        self.record.lock().refreshes.push(token.expose().to_string());
        Ok(())
    }

    fn notify_commit(&self, version: Version) -> Result<(), EngineError> {
        self.ensure_open()?;
        let (delay, fault) = {
            let mut faults = self.faults.lock();
            (faults.commit_delay, faults.fail_next_commit.take())
        };
        if let Some(error) = fault {
            return Err(error);
        }
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        self.record.lock().commits.push(version);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        self.record.lock().shutdowns += 1;
        Ok(())
    }

    fn abort(&self) {
        self.record.lock().aborted = true;
    }
}
