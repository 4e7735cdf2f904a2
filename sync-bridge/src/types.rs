//! Flat types returned across the bridge.
//!
//! No generics, no lifetimes, no trait objects.

use serde::Serialize;
use std::fmt;

/// Boundary operation, used in errors and log spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Open a session and allocate a handle.
    Create,
    /// Attach to a remote endpoint.
    Bind,
    /// Release a handle (forced or graceful).
    Unbind,
    /// Replace the credential.
    Refresh,
    /// Report a local commit.
    NotifyCommit,
    /// Inspect a handle.
    Describe,
}

impl Operation {
    /// Short snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Bind => "bind",
            Self::Unbind => "unbind",
            Self::Refresh => "refresh",
            Self::NotifyCommit => "notify_commit",
            Self::Describe => "describe",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    /// Raw handle value.
    pub handle: u64,
    /// Local data file the session was opened for.
    pub local_path: String,
    /// Lifecycle state name.
    pub state: &'static str,
    /// Highest commit version notified while bound.
    pub last_version: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_names() {
        assert_eq!(Operation::NotifyCommit.to_string(), "notify_commit");
        assert_eq!(Operation::Bind.as_str(), "bind");
        assert_eq!(
            serde_json::to_string(&Operation::NotifyCommit).unwrap(),
            "\"notify_commit\""
        );
    }

    #[test]
    fn session_info_serializes() {
        let info = SessionInfo {
            handle: (1 << 32) | 2,
            local_path: "/tmp/a.realm".to_string(),
            state: "bound",
            last_version: Some(5),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["state"], "bound");
        assert_eq!(json["last_version"], 5);
        assert_eq!(json["local_path"], "/tmp/a.realm");
    }
}
