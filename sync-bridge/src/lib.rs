//! # sync-bridge
//!
//! Handle-based session bridge for Tether multi-language bindings.
//!
//! This crate exposes [`SessionBridge`]: callers name sessions with plain
//! integer handles and pass text arguments, and the bridge resolves,
//! marshals and forwards each call to the sync engine. sync-python (PyO3)
//! wraps it directly.
//!
//! ## Design
//!
//! - Handles are generational: a handle kept past unbind is rejected, never
//!   aliased to a newer session
//! - Errors flatten to an [`ErrorKind`](sync_types::ErrorKind) plus a
//!   human-readable message
//! - No panic crosses the boundary
//! - Thin wrappers: lifecycle rules live in sync-core, engine calls in sync-engine

#![warn(missing_docs)]
#![warn(clippy::all)]

mod boundary;
pub mod bridge;
pub mod config;
mod entry;
pub mod error;
pub mod metrics;
pub mod types;

pub use bridge::SessionBridge;
pub use config::{BridgeConfig, ConfigError, LimitsConfig, LoggingConfig, ShutdownConfig};
pub use error::BridgeError;
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use types::{Operation, SessionInfo};
