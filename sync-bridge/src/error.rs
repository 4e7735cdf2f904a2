//! Error types for sync-bridge.
//!
//! All lower-layer errors flatten to human-readable strings.
//! Binding consumers get an [`ErrorKind`] and a message, not Rust enum internals.

use sync_core::ArenaError;
use sync_types::{ErrorKind, HandleError, MarshalError};
use thiserror::Error;

use crate::types::Operation;

/// Errors from sync-bridge operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Null, malformed, stale or unknown session handle.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    /// A caller argument could not be converted.
    #[error("marshaling failed: {0}")]
    Marshaling(String),

    /// The engine refused the forwarded call.
    #[error("engine rejected {operation}: {message}")]
    EngineRejected {
        /// Operation that was forwarded.
        operation: Operation,
        /// Engine's error message.
        message: String,
    },

    /// The operation is not valid in the session's current state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: Operation,
        /// State the session was in.
        state: &'static str,
    },

    /// No room for another session.
    #[error("session capacity exhausted (limit: {0})")]
    CapacityExhausted(usize),

    /// A panic was caught at the boundary.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Boundary taxonomy entry for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidHandle(_) => ErrorKind::InvalidHandle,
            Self::Marshaling(_) => ErrorKind::Marshaling,
            Self::EngineRejected { .. } => ErrorKind::EngineRejected,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::CapacityExhausted(_) => ErrorKind::CapacityExhausted,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable numeric code of [`kind`](Self::kind).
    pub fn code(&self) -> i32 {
        self.kind().code()
    }
}

impl From<HandleError> for BridgeError {
    fn from(err: HandleError) -> Self {
        BridgeError::InvalidHandle(err.to_string())
    }
}

impl From<MarshalError> for BridgeError {
    fn from(err: MarshalError) -> Self {
        BridgeError::Marshaling(err.to_string())
    }
}

impl From<ArenaError> for BridgeError {
    fn from(err: ArenaError) -> Self {
        match err {
            ArenaError::Stale(_) | ArenaError::Unknown(_) => {
                BridgeError::InvalidHandle(err.to_string())
            }
            ArenaError::Full { limit } => BridgeError::CapacityExhausted(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;
    use sync_types::SessionHandle;

    fn handle() -> SessionHandle {
        SessionHandle::new(3, NonZeroU32::MIN)
    }

    #[test]
    fn handle_error_maps_to_invalid_handle() {
        let err: BridgeError = HandleError::Null.into();
        assert_eq!(err.kind(), ErrorKind::InvalidHandle);
        assert_eq!(err.to_string(), "invalid handle: null handle");
    }

    #[test]
    fn marshal_error_maps_to_marshaling() {
        let err: BridgeError = MarshalError::NegativeVersion(-1).into();
        assert_eq!(err.kind(), ErrorKind::Marshaling);
        assert!(err.to_string().contains("-1"));
    }

    #[test]
    fn stale_and_unknown_map_to_invalid_handle() {
        let stale: BridgeError = ArenaError::Stale(handle()).into();
        assert_eq!(stale.kind(), ErrorKind::InvalidHandle);
        assert!(stale.to_string().contains("stale"));

        let unknown: BridgeError = ArenaError::Unknown(handle()).into();
        assert_eq!(unknown.kind(), ErrorKind::InvalidHandle);
    }

    #[test]
    fn full_maps_to_capacity() {
        let err: BridgeError = ArenaError::Full { limit: 8 }.into();
        assert_eq!(err, BridgeError::CapacityExhausted(8));
        assert_eq!(err.code(), 5);
    }

    #[test]
    fn display_is_human_readable() {
        let err = BridgeError::InvalidState {
            operation: Operation::Refresh,
            state: "created",
        };
        assert_eq!(err.to_string(), "cannot refresh while created");

        let err = BridgeError::EngineRejected {
            operation: Operation::Bind,
            message: "invalid credential: expired".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "engine rejected bind: invalid credential: expired"
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(BridgeError::InvalidHandle(String::new()).code(), 1);
        assert_eq!(BridgeError::Marshaling(String::new()).code(), 2);
        assert_eq!(BridgeError::Internal(String::new()).code(), 6);
    }
}
