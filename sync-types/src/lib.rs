//! # sync-types
//!
//! Boundary types for the Tether session bridge.
//!
//! This crate provides the foundational types used across all Tether crates:
//! - [`SessionHandle`], [`ClientHandle`] - Opaque caller-held tokens
//! - [`Version`] - Local commit ordering
//! - [`RemoteUrl`], [`AccessToken`], [`LocalPath`] - Marshaled arguments
//! - [`ErrorKind`] - The fixed boundary error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

mod args;
mod error;
mod ids;

pub use args::{AccessToken, LocalPath, RemoteUrl, REMOTE_SCHEMES};
pub use error::{ErrorKind, HandleError, MarshalError};
pub use ids::{ClientHandle, SessionHandle, Version};
