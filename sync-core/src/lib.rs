//! # sync-core
//!
//! Pure logic for Tether (no I/O, instant tests).
//!
//! This crate implements the handle arena and the session lifecycle state
//! machine without touching any engine, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. The actual engine calls are performed by
//! `sync-bridge`, which interprets the actions produced by the state machine.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arena;
pub mod state;

pub use arena::{ArenaError, HandleArena};
pub use state::{Action, Event, SessionEvent, SessionState, UnbindMode};
