//! # sync-engine
//!
//! The sync engine as Tether sees it.
//!
//! Tether does not implement synchronization. This crate defines the
//! contracts the bridge forwards to, the registry that resolves client
//! handles, and a mock engine for tests.
//!
//! ## Features
//!
//! - **Engine Contracts**: [`EngineClient`], [`EngineSession`], [`SessionObserver`]
//! - **Client Registry**: concurrent client handle lookup
//! - **Mock Engine**: records forwarded calls, injects faults

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod mock;
pub mod registry;
pub mod session;

pub use error::EngineError;
pub use mock::{MockEngine, MockSession};
pub use registry::ClientRegistry;
pub use session::{EngineClient, EngineSession, SessionObserver};
