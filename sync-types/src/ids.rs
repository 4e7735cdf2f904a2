//! Handle and ordering types for Tether.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::{NonZeroU32, NonZeroU64};

use crate::error::HandleError;

/// Reference to a long-lived engine client held in a client registry.
///
/// Zero is never a valid client handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientHandle(NonZeroU64);

impl ClientHandle {
    /// Create a ClientHandle from a non-zero value.
    pub fn new(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// Create a ClientHandle from the raw value a caller holds.
    ///
    /// Returns `None` for zero.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Get the raw value handed to callers.
    pub fn to_raw(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientHandle({})", self.0)
    }
}

/// Opaque capability token for one session wrapper.
///
/// A slot index plus the slot's generation at allocation time. Callers see
/// it as a single `u64`: the generation in the high 32 bits, the index in the
/// low 32 bits. Generations start at 1, so a live handle is never zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle {
    index: u32,
    generation: NonZeroU32,
}

impl SessionHandle {
    /// The raw value callers receive when no handle could be created.
    pub const NULL_RAW: u64 = 0;

    /// Create a handle from its parts.
    pub fn new(index: u32, generation: NonZeroU32) -> Self {
        Self { index, generation }
    }

    /// Decode the raw value a caller passed back.
    pub fn from_raw(raw: u64) -> Result<Self, HandleError> {
        if raw == Self::NULL_RAW {
            return Err(HandleError::Null);
        }
        let generation = NonZeroU32::new((raw >> 32) as u32).ok_or(HandleError::Malformed(raw))?;
        Ok(Self {
            index: raw as u32,
            generation,
        })
    }

    /// Encode for the caller.
    pub fn to_raw(&self) -> u64 {
        (u64::from(self.generation.get()) << 32) | u64::from(self.index)
    }

    /// Slot index in the arena.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation at allocation time.
    pub fn generation(&self) -> NonZeroU32 {
        self.generation
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionHandle({}v{})", self.index, self.generation)
    }
}

/// A local commit version reported by the caller.
///
/// Versions are assigned by the local store, not by the bridge. The bridge
/// only compares them to spot regressions worth logging.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Version(u64);

impl Version {
    /// Create a Version with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this Version.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({})", self.0)
    }
}
