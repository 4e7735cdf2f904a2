//! Error types for Tether boundary values.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A raw handle that cannot name any slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandleError {
    /// The null handle (raw 0).
    #[error("null handle")]
    Null,

    /// Non-zero raw value with a zero generation.
    #[error("malformed handle: {0:#x}")]
    Malformed(u64),
}

/// Conversion of a caller argument into its native form failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    /// Required text was empty.
    #[error("{argument} must not be empty")]
    Empty {
        /// Name of the offending argument.
        argument: &'static str,
    },

    /// Text contained a character the native side cannot carry.
    #[error("{argument} contains an invalid character at byte {position}")]
    InvalidCharacter {
        /// Name of the offending argument.
        argument: &'static str,
        /// Byte offset of the first invalid character.
        position: usize,
    },

    /// Remote URL did not parse or is not a sync endpoint.
    #[error("invalid remote url: {reason}")]
    InvalidUrl {
        /// Why the URL was rejected.
        reason: String,
    },

    /// Commit versions are unsigned on the native side.
    #[error("version must not be negative, got {0}")]
    NegativeVersion(i64),
}

/// Fixed error taxonomy every boundary failure maps onto.
///
/// Codes are stable; bindings use them to pick an exception class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Null, malformed, stale or unknown handle.
    InvalidHandle,
    /// Argument conversion failed.
    Marshaling,
    /// The engine refused the forwarded call.
    EngineRejected,
    /// The operation is not valid in the session's current state.
    InvalidState,
    /// No room for another session.
    CapacityExhausted,
    /// A panic was caught at the boundary.
    Internal,
}

impl ErrorKind {
    /// Stable numeric code.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidHandle => 1,
            Self::Marshaling => 2,
            Self::EngineRejected => 3,
            Self::InvalidState => 4,
            Self::CapacityExhausted => 5,
            Self::Internal => 6,
        }
    }

    /// Short snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidHandle => "invalid_handle",
            Self::Marshaling => "marshaling",
            Self::EngineRejected => "engine_rejected",
            Self::InvalidState => "invalid_state",
            Self::CapacityExhausted => "capacity_exhausted",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = MarshalError::Empty {
            argument: "access_token",
        };
        assert_eq!(err.to_string(), "access_token must not be empty");

        let err = HandleError::Malformed(0x2a);
        assert_eq!(err.to_string(), "malformed handle: 0x2a");
    }

    #[test]
    fn error_kind_codes_are_distinct() {
        let kinds = [
            ErrorKind::InvalidHandle,
            ErrorKind::Marshaling,
            ErrorKind::EngineRejected,
            ErrorKind::InvalidState,
            ErrorKind::CapacityExhausted,
            ErrorKind::Internal,
        ];
        let mut codes: Vec<i32> = kinds.iter().map(ErrorKind::code).collect();
        codes.dedup();
        assert_eq!(codes, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::EngineRejected).unwrap();
        assert_eq!(json, "\"engine_rejected\"");
        assert_eq!(ErrorKind::EngineRejected.to_string(), "engine_rejected");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MarshalError>();
        assert_send_sync::<HandleError>();
    }
}
