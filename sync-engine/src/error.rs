//! Engine error type.

use thiserror::Error;

/// Failures reported by an engine client or session.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The credential was refused.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The remote endpoint was refused.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The session has been shut down or aborted.
    #[error("session closed")]
    Closed,

    /// Any other refusal.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Local file access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
