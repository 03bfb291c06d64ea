//! # Component Pool
//!
//! Growable, densely packed, type-erased storage for one component type.
//!
//! ## Layout
//!
//! ```text
//! words:  [u64][u64][u64][u64][u64][u64] ...   capacity
//! bytes:  [ e0  ][ e1  ][ e2  ]                used = count × stride
//! ```
//!
//! The backing buffer is a `Vec<u64>`, so every slot offset is 8-byte aligned
//! and typed views go through `bytemuck` without `unsafe`. Boxed pools store
//! one handle word per element and keep the values in a [`HandleTable`].
//!
//! Any growth may reallocate the buffer. Views are borrowed from the pool, so
//! the borrow checker rejects holding one across an append.

use std::any::type_name;

use tracing::trace;

use crate::config::{PoolConfig, RemovalPolicy};
use crate::ecs::{Component, ComponentType, Storage, StorageKind};
use crate::error::{EcsError, EcsResult};

use super::handles::{BoxedValue, Handle, HandleTable};

const WORD: usize = std::mem::size_of::<u64>();

/// Storage for every value of one component type within one archetype.
pub struct ComponentPool {
    /// Declared element type. Fixed for the pool's lifetime.
    component: ComponentType,
    /// Backing buffer.
    words: Vec<u64>,
    /// Stored elements.
    count: usize,
    /// Bytes in use (`count * stride`).
    used: usize,
    /// Out-of-line values for boxed pools.
    handles: HandleTable,
    /// Growth settings.
    growth: PoolConfig,
}

impl ComponentPool {
    /// Creates an empty pool. No memory is allocated until the first append.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnsupportedLayout`] if the type cannot be stored.
    pub fn new(component: ComponentType, growth: PoolConfig) -> EcsResult<Self> {
        component.check_layout()?;
        Ok(Self {
            component,
            words: Vec::new(),
            count: 0,
            used: 0,
            handles: HandleTable::new(),
            growth,
        })
    }

    /// Creates an empty pool for `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnsupportedLayout`] if `T` cannot be stored.
    pub fn of<T: Component>(growth: PoolConfig) -> EcsResult<Self> {
        Self::new(ComponentType::of::<T>(), growth)
    }

    /// The pool's component type.
    #[inline]
    #[must_use]
    pub const fn component(&self) -> &ComponentType {
        &self.component
    }

    /// Number of stored elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the pool holds no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Bytes per element.
    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.component.stride()
    }

    /// Bytes in use.
    #[inline]
    #[must_use]
    pub const fn used_bytes(&self) -> usize {
        self.used
    }

    /// Allocated bytes.
    #[inline]
    #[must_use]
    pub fn capacity_bytes(&self) -> usize {
        self.words.len() * WORD
    }

    /// Number of live out-of-line values (boxed pools only).
    #[inline]
    #[must_use]
    pub const fn live_handles(&self) -> usize {
        self.handles.len()
    }

    /// The packed region `[0, used)`.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.all_bytes()[..self.used]
    }

    /// Makes room for `additional` more elements.
    ///
    /// # Errors
    ///
    /// [`EcsError::AllocationFailed`] if the buffer cannot grow. The pool is
    /// unchanged in that case.
    pub fn reserve(&mut self, additional: usize) -> EcsResult<()> {
        let bytes = additional
            .checked_mul(self.stride())
            .ok_or(EcsError::AllocationFailed {
                component: self.component.name(),
                bytes: usize::MAX,
            })?;
        self.reserve_bytes(bytes)
    }

    /// Appends a value and returns its index.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeMismatch`] if `T` is not the pool's type,
    /// [`EcsError::AllocationFailed`] if growth fails.
    pub fn push<T: Component>(&mut self, value: T) -> EcsResult<usize> {
        self.check::<T>()?;
        <T::Storage as Storage<T>>::push(self, value)
    }

    /// Reads the element at `index`.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeMismatch`] or [`EcsError::IndexOutOfBounds`].
    pub fn get<T: Component>(&self, index: usize) -> EcsResult<&T> {
        self.check::<T>()?;
        <T::Storage as Storage<T>>::get(self, index)
    }

    /// Reads the element at `index` mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeMismatch`] or [`EcsError::IndexOutOfBounds`].
    pub fn get_mut<T: Component>(&mut self, index: usize) -> EcsResult<&mut T> {
        self.check::<T>()?;
        <T::Storage as Storage<T>>::get_mut(self, index)
    }

    /// Iterates every element in slot order.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeMismatch`] if `T` is not the pool's type.
    pub fn iter<T: Component>(&self) -> EcsResult<impl Iterator<Item = &T> + '_> {
        self.check::<T>()?;
        Ok((0..self.count).filter_map(move |index| <T::Storage as Storage<T>>::get(self, index).ok()))
    }

    /// The whole packed region as a typed slice (inline pools only).
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeMismatch`] if `T` is not the pool's type.
    pub fn as_slice<T: Component + bytemuck::Pod>(&self) -> EcsResult<&[T]> {
        self.check::<T>()?;
        if self.component.size() == 0 {
            // A Vec of a zero-sized type never allocates, so leaking it
            // frees nothing. Every value of `T` is the zeroed one.
            return Ok(Vec::leak(vec![T::zeroed(); self.count]));
        }
        bytemuck::try_cast_slice(self.bytes()).map_err(|_| EcsError::UnsupportedLayout {
            component: self.component.name(),
            align: self.component.align(),
            max_align: WORD,
        })
    }

    /// Removes the element at `index`.
    ///
    /// Returns `false` (and does nothing) if `index` is out of range. With
    /// [`RemovalPolicy::SwapRemove`] the last element moves into `index`; with
    /// [`RemovalPolicy::ShiftDown`] every later element moves down one slot.
    /// Out-of-line values are released.
    pub fn remove(&mut self, index: usize, policy: RemovalPolicy) -> bool {
        if index >= self.count {
            return false;
        }
        if self.component.kind() == StorageKind::Boxed {
            self.handles.release(Handle::from_raw(self.words[index]));
        }

        let stride = self.stride();
        let last = self.count - 1;
        let used = self.used;
        let bytes = self.all_bytes_mut();
        if index != last {
            match policy {
                RemovalPolicy::SwapRemove => {
                    bytes.copy_within(last * stride..used, index * stride);
                }
                RemovalPolicy::ShiftDown => {
                    bytes.copy_within((index + 1) * stride..used, index * stride);
                }
            }
        }
        bytes[last * stride..used].fill(0);

        self.used -= stride;
        self.count -= 1;
        true
    }

    /// Appends `count` elements starting at `start` to `dest`.
    ///
    /// Inline values are copied byte for byte; boxed values are cloned into
    /// `dest`'s own handle table. An empty `dest` ends up with exactly `count`
    /// elements. Nothing is written unless the whole range can be copied.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeMismatch`] if the pools hold different types,
    /// [`EcsError::IndexOutOfBounds`] if the range exceeds this pool,
    /// [`EcsError::AllocationFailed`] if `dest` cannot grow.
    pub fn copy_range_into(&self, start: usize, count: usize, dest: &mut Self) -> EcsResult<()> {
        if dest.component != self.component {
            return Err(EcsError::TypeMismatch {
                expected: dest.component.name(),
                found: self.component.name(),
            });
        }
        let end = start
            .checked_add(count)
            .filter(|&end| end <= self.count)
            .ok_or(EcsError::IndexOutOfBounds {
                index: start.saturating_add(count),
                len: self.count,
            })?;
        if count == 0 {
            return Ok(());
        }

        let stride = self.stride();
        match self.component.kind() {
            StorageKind::Inline => {
                dest.reserve_bytes(count * stride)?;
                let source = &self.all_bytes()[start * stride..end * stride];
                let at = dest.used;
                dest.all_bytes_mut()[at..at + source.len()].copy_from_slice(source);
            }
            StorageKind::Boxed => {
                let mut cloned = Vec::with_capacity(count);
                for index in start..end {
                    let value = self.boxed(index)?;
                    cloned.push(self.component.clone_value(&**value).ok_or(
                        EcsError::TypeMismatch {
                            expected: self.component.name(),
                            found: "unknown",
                        },
                    )?);
                }
                dest.reserve_bytes(count * stride)?;
                let base = dest.count;
                for (offset, value) in cloned.into_iter().enumerate() {
                    let handle = dest.handles.insert(value);
                    dest.words[base + offset] = handle.to_raw();
                }
            }
        }
        dest.used += count * stride;
        dest.count += count;
        Ok(())
    }

    /// Serializes the element at `index`.
    ///
    /// # Errors
    ///
    /// [`EcsError::IndexOutOfBounds`] or [`EcsError::Export`].
    pub fn export(&self, index: usize) -> EcsResult<serde_json::Value> {
        self.component.export_value(self, index)
    }

    /// Removes every element, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.handles.clear();
        self.words.fill(0);
        self.count = 0;
        self.used = 0;
    }

    /// Removes every element and frees the backing memory.
    pub fn release(&mut self) {
        self.handles.clear();
        self.words = Vec::new();
        self.count = 0;
        self.used = 0;
    }

    fn check<T: 'static>(&self) -> EcsResult<()> {
        if self.component.is::<T>() {
            Ok(())
        } else {
            Err(EcsError::TypeMismatch {
                expected: self.component.name(),
                found: type_name::<T>(),
            })
        }
    }

    fn all_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    fn all_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.words)
    }

    fn out_of_bounds(&self, index: usize) -> EcsError {
        EcsError::IndexOutOfBounds {
            index,
            len: self.count,
        }
    }

    /// Grows capacity to at least `used + additional` bytes.
    fn reserve_bytes(&mut self, additional: usize) -> EcsResult<()> {
        let component = self.component.name();
        let needed = self
            .used
            .checked_add(additional)
            .ok_or(EcsError::AllocationFailed {
                component,
                bytes: usize::MAX,
            })?;
        let capacity = self.capacity_bytes();
        if needed <= capacity {
            return Ok(());
        }

        let factor = self.growth.growth_factor.max(2);
        let mut target = capacity.max(self.growth.baseline_bytes).max(WORD);
        while target < needed {
            target = target
                .checked_mul(factor)
                .ok_or(EcsError::AllocationFailed {
                    component,
                    bytes: needed,
                })?;
        }

        let words = target.div_ceil(WORD);
        self.words
            .try_reserve_exact(words - self.words.len())
            .map_err(|_| EcsError::AllocationFailed {
                component,
                bytes: target,
            })?;
        self.words.resize(words, 0);

        trace!(component, from = capacity, to = words * WORD, "pool grew");
        Ok(())
    }

    pub(crate) fn push_bytes(&mut self, value: &[u8]) -> EcsResult<usize> {
        debug_assert_eq!(value.len(), self.stride());
        self.reserve_bytes(value.len())?;
        let at = self.used;
        self.all_bytes_mut()[at..at + value.len()].copy_from_slice(value);
        self.used += value.len();
        self.count += 1;
        Ok(self.count - 1)
    }

    /// Drops the last element, releasing its out-of-line value.
    pub(crate) fn pop(&mut self) -> bool {
        match self.count.checked_sub(1) {
            Some(last) => self.remove(last, RemovalPolicy::SwapRemove),
            None => false,
        }
    }

    pub(crate) fn slot_bytes(&self, index: usize) -> EcsResult<&[u8]> {
        if index >= self.count {
            return Err(self.out_of_bounds(index));
        }
        let stride = self.stride();
        Ok(&self.all_bytes()[index * stride..(index + 1) * stride])
    }

    pub(crate) fn slot_bytes_mut(&mut self, index: usize) -> EcsResult<&mut [u8]> {
        if index >= self.count {
            return Err(self.out_of_bounds(index));
        }
        let stride = self.stride();
        Ok(&mut self.all_bytes_mut()[index * stride..(index + 1) * stride])
    }

    pub(crate) fn push_boxed(&mut self, value: BoxedValue) -> EcsResult<usize> {
        self.reserve_bytes(WORD)?;
        let handle = self.handles.insert(value);
        self.words[self.count] = handle.to_raw();
        self.used += WORD;
        self.count += 1;
        Ok(self.count - 1)
    }

    pub(crate) fn boxed(&self, index: usize) -> EcsResult<&BoxedValue> {
        if index >= self.count {
            return Err(self.out_of_bounds(index));
        }
        self.handles
            .get(Handle::from_raw(self.words[index]))
            .ok_or(self.out_of_bounds(index))
    }

    pub(crate) fn boxed_mut(&mut self, index: usize) -> EcsResult<&mut BoxedValue> {
        if index >= self.count {
            return Err(self.out_of_bounds(index));
        }
        let error = self.out_of_bounds(index);
        self.handles
            .get_mut(Handle::from_raw(self.words[index]))
            .ok_or(error)
    }
}

impl std::fmt::Debug for ComponentPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentPool")
            .field("component", &self.component.name())
            .field("count", &self.count)
            .field("used", &self.used)
            .field("capacity", &self.capacity_bytes())
            .finish()
    }
}
