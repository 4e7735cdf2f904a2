//! Contracts the bridge forwards to.
//!
//! The engine itself (protocol, history storage, network transport) lives
//! outside Tether. These traits are the only surface the bridge relies on.
//!
//! # Design
//!
//! - `EngineClient` is long-lived and opens one `EngineSession` per local file
//! - `bind()` and `refresh()` may block on setup, so they are async
//! - `notify_commit()` is expected to return immediately and defer the upload
//! - `shutdown()` asks for a graceful stop, `abort()` tears down at once

use std::sync::Arc;

use async_trait::async_trait;
use sync_core::SessionEvent;
use sync_types::{AccessToken, LocalPath, RemoteUrl, Version};

use crate::error::EngineError;

/// Callback target living in the calling runtime.
///
/// The engine may call this from its own threads.
pub trait SessionObserver: Send + Sync {
    /// Deliver one lifecycle or engine event.
    fn on_event(&self, event: &SessionEvent);
}

/// One engine session: a local file paired (eventually) with a remote endpoint.
#[async_trait]
pub trait EngineSession: Send + Sync {
    /// Attach to a remote endpoint and start synchronizing.
    async fn bind(&self, remote_url: &RemoteUrl, token: &AccessToken) -> Result<(), EngineError>;

    /// Replace the credential without tearing down the binding.
    async fn refresh(&self, token: &AccessToken) -> Result<(), EngineError>;

    /// Report that a local transaction reached `version`.
    fn notify_commit(&self, version: Version) -> Result<(), EngineError>;

    /// Ask the session to stop its sync activity.
    async fn shutdown(&self) -> Result<(), EngineError>;

    /// Stop immediately, abandoning in-flight work.
    fn abort(&self);
}

/// A long-lived engine client that opens sessions.
pub trait EngineClient: Send + Sync {
    /// Open a session for the data file at `local_path`.
    ///
    /// `observer` is where the session delivers events raised on engine threads.
    fn open_session(
        &self,
        local_path: &LocalPath,
        observer: Option<Arc<dyn SessionObserver>>,
    ) -> Result<Arc<dyn EngineSession>, EngineError>;
}
