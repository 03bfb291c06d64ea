//! # Handle Table
//!
//! Out-of-line storage for reference-like components.
//!
//! A boxed pool stores one `u64` handle per slot; the value itself lives here.
//! Slots are recycled through a free list, so churn does not grow the table.

use std::any::Any;

/// Owned, type-erased component value.
pub type BoxedValue = Box<dyn Any + Send + Sync>;

/// Handle to a value stored in a [`HandleTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    /// Index into the table.
    index: usize,
}

impl Handle {
    /// Encodes the handle into a pool word.
    #[inline]
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        self.index as u64
    }

    /// Decodes a handle from a pool word.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as usize,
        }
    }
}

/// Growable slot allocator holding boxed values.
///
/// # Thread Safety
///
/// Not synchronized; the owning pool is only mutated through `&mut`.
#[derive(Default)]
pub struct HandleTable {
    /// Slot storage. `None` marks a free slot.
    slots: Vec<Option<BoxedValue>>,
    /// Indices of free slots.
    free_list: Vec<usize>,
    /// Number of occupied slots.
    live: usize,
}

impl HandleTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Number of live values.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no value is stored.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Stores a value and returns its handle.
    ///
    /// Reuses a freed slot when one is available.
    pub fn insert(&mut self, value: BoxedValue) -> Handle {
        let index = if let Some(index) = self.free_list.pop() {
            self.slots[index] = Some(value);
            index
        } else {
            self.slots.push(Some(value));
            self.slots.len() - 1
        };
        self.live += 1;
        Handle { index }
    }

    /// Releases a value, returning it.
    ///
    /// Returns `None` if the handle is stale or out of range.
    pub fn release(&mut self, handle: Handle) -> Option<BoxedValue> {
        let value = self.slots.get_mut(handle.index)?.take()?;
        self.free_list.push(handle.index);
        self.live -= 1;
        Some(value)
    }

    /// Gets a stored value.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&BoxedValue> {
        self.slots.get(handle.index)?.as_ref()
    }

    /// Gets a stored value mutably.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut BoxedValue> {
        self.slots.get_mut(handle.index)?.as_mut()
    }

    /// Drops every value and returns the slot memory.
    pub fn clear(&mut self) {
        self.slots = Vec::new();
        self.free_list = Vec::new();
        self.live = 0;
    }
}

impl std::fmt::Debug for HandleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleTable")
            .field("slots", &self.slots.len())
            .field("live", &self.live)
            .finish()
    }
}
