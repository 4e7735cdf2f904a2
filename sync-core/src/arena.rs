//! Generational handle arena.
//!
//! Maps opaque [`SessionHandle`]s to owned values. Every slot carries a
//! generation that advances when its value is removed, so a handle kept past
//! removal is reported as stale instead of silently reaching whatever value
//! reuses the slot.

use std::num::NonZeroU32;

use sync_types::SessionHandle;
use thiserror::Error;

/// Arena lookup and allocation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// The handle's slot has been released (and possibly reused) since.
    #[error("stale handle {0}")]
    Stale(SessionHandle),

    /// The handle names a slot this arena never allocated.
    #[error("unknown handle {0}")]
    Unknown(SessionHandle),

    /// The arena holds as many values as it may.
    #[error("arena full (limit: {limit})")]
    Full {
        /// Configured or addressable limit.
        limit: usize,
    },
}

#[derive(Debug)]
struct Slot<T> {
    generation: NonZeroU32,
    value: Option<T>,
}

/// Slot arena with generation-checked handles.
#[derive(Debug)]
pub struct HandleArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    limit: Option<usize>,
}

impl<T> HandleArena<T> {
    /// Create an unbounded arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            limit: None,
        }
    }

    /// Create an arena holding at most `limit` live values.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no value is live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a value and return the handle that names it.
    ///
    /// Freed slots are reused before the arena grows.
    pub fn insert(&mut self, value: T) -> Result<SessionHandle, ArenaError> {
        if let Some(limit) = self.limit {
            if self.len >= limit {
                return Err(ArenaError::Full { limit });
            }
        }

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            self.len += 1;
            return Ok(SessionHandle::new(index, slot.generation));
        }

        let index = u32::try_from(self.slots.len()).map_err(|_| ArenaError::Full {
            limit: u32::MAX as usize,
        })?;
        let generation = NonZeroU32::MIN;
        self.slots.push(Slot {
            generation,
            value: Some(value),
        });
        self.len += 1;
        Ok(SessionHandle::new(index, generation))
    }

    /// Borrow the value a handle names.
    pub fn get(&self, handle: SessionHandle) -> Result<&T, ArenaError> {
        let slot = self
            .slots
            .get(handle.index() as usize)
            .ok_or(ArenaError::Unknown(handle))?;
        if slot.generation != handle.generation() {
            return Err(ArenaError::Stale(handle));
        }
        slot.value.as_ref().ok_or(ArenaError::Stale(handle))
    }

    /// Whether the handle names a live value.
    pub fn contains(&self, handle: SessionHandle) -> bool {
        self.get(handle).is_ok()
    }

    /// Take the value out and invalidate every copy of the handle.
    pub fn remove(&mut self, handle: SessionHandle) -> Result<T, ArenaError> {
        let index = handle.index();
        let slot = self
            .slots
            .get_mut(index as usize)
            .ok_or(ArenaError::Unknown(handle))?;
        if slot.generation != handle.generation() {
            return Err(ArenaError::Stale(handle));
        }
        let value = slot.value.take().ok_or(ArenaError::Stale(handle))?;
        self.len -= 1;

        // An exhausted slot is retired rather than wrapped back to a
        // generation an old handle may still carry.
        if let Some(next) = slot.generation.checked_add(1) {
            slot.generation = next;
            self.free.push(index);
        }
        Ok(value)
    }

    /// Handles of every live value, in slot order.
    pub fn handles(&self) -> Vec<SessionHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(index, slot)| SessionHandle::new(index as u32, slot.generation))
            .collect()
    }

    #[cfg(test)]
    fn force_generation(&mut self, index: u32, generation: NonZeroU32) {
        self.slots[index as usize].generation = generation;
    }
}

impl<T> Default for HandleArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
