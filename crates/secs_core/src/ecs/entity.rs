//! # Entity Identifiers
//!
//! Entities are opaque 32-bit ids handed out in strictly increasing order.
//! Ids are never reused.

use serde::Serialize;

/// Unique identifier for an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an entity id from its raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Hands out entity ids in increasing order.
#[derive(Debug, Default, Clone)]
pub struct EntityAllocator {
    next: u32,
}

impl EntityAllocator {
    /// Creates an allocator starting at id 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Returns the next id.
    ///
    /// # Panics
    ///
    /// Panics once all `u32::MAX` ids have been handed out.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self
            .next
            .checked_add(1)
            .unwrap_or_else(|| panic!("entity id space exhausted"));
        id
    }

    /// Number of ids handed out so far.
    #[inline]
    #[must_use]
    pub const fn allocated(&self) -> u32 {
        self.next
    }
}
