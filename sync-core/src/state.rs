//! Session lifecycle state machine for Tether.
//!
//! This module provides a pure, side-effect-free state machine for one
//! session handle. The state machine takes events as input and produces a new
//! state plus a list of actions to execute.
//!
//! The actual calls into the engine are performed by sync-bridge, not by
//! this module.

use std::fmt;
use sync_types::{AccessToken, RemoteUrl, Version};

/// Session lifecycle state - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Wrapper allocated, engine session opened, not yet bound.
    Created,
    /// Bind forwarded to the engine, awaiting its result.
    Binding,
    /// Attached to a remote endpoint.
    Bound {
        /// Highest commit version notified so far.
        last_version: Option<Version>,
    },
    /// Credential refresh forwarded to the engine.
    Refreshing {
        /// Highest commit version notified so far.
        last_version: Option<Version>,
    },
    /// Graceful unbind in progress: stop signalled, waiting for quiescence.
    Stopping,
    /// Released. Terminal.
    Unbound,
}

impl SessionState {
    /// Create a new state machine in the Created state.
    pub fn new() -> Self {
        Self::Created
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (sync-bridge)
    /// is responsible for executing the returned actions. Events that make no
    /// sense in the current state leave it unchanged and yield no actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // Binding
            (Self::Created, Event::BindRequested { remote_url, token }) => (
                Self::Binding,
                vec![Action::ForwardBind { remote_url, token }],
            ),
            (Self::Binding, Event::BindSucceeded) => (
                Self::Bound { last_version: None },
                vec![Action::EmitEvent(SessionEvent::Bound)],
            ),
            (Self::Binding, Event::BindFailed { error }) => (
                Self::Created,
                vec![Action::EmitEvent(SessionEvent::BindFailed { error })],
            ),

            // Refreshing
            (Self::Bound { last_version }, Event::RefreshRequested { token }) => (
                Self::Refreshing { last_version },
                vec![Action::ForwardRefresh { token }],
            ),
            (Self::Refreshing { last_version }, Event::RefreshSucceeded) => (
                Self::Bound { last_version },
                vec![Action::EmitEvent(SessionEvent::Refreshed)],
            ),
            (Self::Refreshing { last_version }, Event::RefreshFailed { error }) => (
                Self::Bound { last_version },
                vec![Action::EmitEvent(SessionEvent::RefreshFailed { error })],
            ),

            // Commit notifications
            (Self::Bound { last_version }, Event::CommitNotified { version }) => {
                let (last_version, action) = track_commit(last_version, version);
                (Self::Bound { last_version }, vec![action])
            }
            (Self::Refreshing { last_version }, Event::CommitNotified { version }) => {
                let (last_version, action) = track_commit(last_version, version);
                (Self::Refreshing { last_version }, vec![action])
            }

            // Unbinding
            (
                Self::Created | Self::Binding | Self::Bound { .. } | Self::Refreshing { .. },
                Event::UnbindRequested {
                    mode: UnbindMode::Graceful,
                },
            ) => (
                Self::Stopping,
                vec![Action::SignalStop, Action::AwaitQuiesced],
            ),
            (
                Self::Created
                | Self::Binding
                | Self::Bound { .. }
                | Self::Refreshing { .. }
                | Self::Stopping,
                Event::UnbindRequested {
                    mode: UnbindMode::Forced,
                },
            ) => (
                Self::Unbound,
                vec![
                    Action::Release,
                    Action::Abort,
                    Action::EmitEvent(SessionEvent::Unbound { graceful: false }),
                ],
            ),
            (Self::Stopping, Event::Quiesced) => (
                Self::Unbound,
                vec![
                    Action::Release,
                    Action::EmitEvent(SessionEvent::Unbound { graceful: true }),
                ],
            ),
            (Self::Stopping, Event::QuiesceTimedOut) => (
                Self::Unbound,
                vec![
                    Action::Abort,
                    Action::Release,
                    Action::EmitEvent(SessionEvent::Unbound { graceful: false }),
                ],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Short name for logs and bindings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Binding => "binding",
            Self::Bound { .. } => "bound",
            Self::Refreshing { .. } => "refreshing",
            Self::Stopping => "stopping",
            Self::Unbound => "unbound",
        }
    }

    /// Check if attached to a remote endpoint.
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound { .. } | Self::Refreshing { .. })
    }

    /// Highest commit version notified while bound.
    pub fn last_version(&self) -> Option<Version> {
        match self {
            Self::Bound { last_version } | Self::Refreshing { last_version } => *last_version,
            _ => None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn track_commit(last_version: Option<Version>, version: Version) -> (Option<Version>, Action) {
    let regression = last_version.is_some_and(|last| version <= last);
    let last_version = Some(last_version.map_or(version, |last| last.max(version)));
    (
        last_version,
        Action::ForwardCommit {
            version,
            regression,
        },
    )
}

/// How an unbind releases the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnbindMode {
    /// Signal stop, wait for in-flight calls, then release.
    Graceful,
    /// Release and abort immediately.
    Forced,
}

/// Events that can occur in a session's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Caller asked to bind.
    BindRequested {
        /// Remote endpoint.
        remote_url: RemoteUrl,
        /// Credential for the endpoint.
        token: AccessToken,
    },
    /// Engine accepted the bind.
    BindSucceeded,
    /// Engine rejected the bind.
    BindFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Caller asked to refresh the credential.
    RefreshRequested {
        /// Replacement credential.
        token: AccessToken,
    },
    /// Engine accepted the new credential.
    RefreshSucceeded,
    /// Engine rejected the new credential.
    RefreshFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Caller reported a local commit.
    CommitNotified {
        /// Version the local store reached.
        version: Version,
    },
    /// Caller asked to unbind.
    UnbindRequested {
        /// Graceful or forced.
        mode: UnbindMode,
    },
    /// No forwarded call is in flight any more.
    Quiesced,
    /// In-flight calls did not drain in time.
    QuiesceTimedOut,
}

impl Event {
    /// Whether this event is a caller request (as opposed to a completion).
    ///
    /// A request that yields no actions is a usage error.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Self::BindRequested { .. }
                | Self::RefreshRequested { .. }
                | Self::CommitNotified { .. }
                | Self::UnbindRequested { .. }
        )
    }
}

/// Actions to be executed by the bridge.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Forward a bind to the engine session.
    ForwardBind {
        /// Remote endpoint.
        remote_url: RemoteUrl,
        /// Credential for the endpoint.
        token: AccessToken,
    },
    /// Forward a credential refresh to the engine session.
    ForwardRefresh {
        /// Replacement credential.
        token: AccessToken,
    },
    /// Forward a commit notification to the engine session.
    ForwardCommit {
        /// Version the local store reached.
        version: Version,
        /// Version is not above one already notified.
        regression: bool,
    },
    /// Ask the engine session to stop.
    SignalStop,
    /// Wait for in-flight forwarded calls to drain.
    AwaitQuiesced,
    /// Tear the engine session down without waiting.
    Abort,
    /// Free the handle's slot.
    Release,
    /// Deliver an event to the session's observer.
    EmitEvent(SessionEvent),
}

/// Events delivered to the caller's observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Bind completed.
    Bound,
    /// Bind failed; the session is back in Created.
    BindFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Credential refresh completed.
    Refreshed,
    /// Credential refresh failed; the existing binding is kept.
    RefreshFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The handle was released.
    Unbound {
        /// Whether in-flight work drained before release.
        graceful: bool,
    },
    /// The engine reported a failure on its own threads.
    EngineError {
        /// Error message from the engine.
        message: String,
    },
}

impl SessionEvent {
    /// Short name for bindings.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bound => "bound",
            Self::BindFailed { .. } => "bind_failed",
            Self::Refreshed => "refreshed",
            Self::RefreshFailed { .. } => "refresh_failed",
            Self::Unbound { .. } => "unbound",
            Self::EngineError { .. } => "engine_error",
        }
    }

    /// Free-text detail, if the event carries one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::BindFailed { error } | Self::RefreshFailed { error } => Some(error),
            Self::EngineError { message } => Some(message),
            _ => None,
        }
    }
}
