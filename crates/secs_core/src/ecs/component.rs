//! # Component Definitions
//!
//! Components are plain values attached to entities. Each component type picks
//! a storage strategy:
//!
//! - [`Inline`]: plain data (`bytemuck::Pod`) stored by value, packed
//!   back to back in the pool's byte buffer.
//! - [`Boxed`]: reference-like or variable-length data (e.g. `String`). The
//!   pool slot holds a `u64` handle; the value lives out of line and is
//!   released when the slot is removed.
//!
//! ```rust,ignore
//! #[derive(Clone, Copy, Pod, Zeroable, Serialize)]
//! #[repr(C)]
//! struct Position { x: f32, y: f32 }
//!
//! impl_component!(Inline: Position);
//! ```
//!
//! [`EntityId`](super::EntityId) is reserved and does not implement
//! [`Component`], so it can never be stored as one.

use std::any::{type_name, Any, TypeId};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::mem::{align_of, size_of};

use bytemuck::Pod;
use serde::Serialize;

use crate::error::{EcsError, EcsResult};
use crate::memory::{BoxedValue, ComponentPool};

/// Bytes occupied by one boxed slot (a `u64` handle).
pub const HANDLE_STRIDE: usize = size_of::<u64>();

/// Largest alignment an inline component may have.
pub const MAX_INLINE_ALIGN: usize = align_of::<u64>();

/// Storage strategy of a component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum StorageKind {
    /// Stored by value.
    Inline,
    /// Stored out of line behind a handle.
    Boxed,
}

/// Marker for by-value storage of `Pod` components.
#[derive(Clone, Copy, Debug)]
pub struct Inline;

/// Marker for out-of-line storage.
#[derive(Clone, Copy, Debug)]
pub struct Boxed;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Inline {}
    impl Sealed for super::Boxed {}
}

/// Trait implemented by all component types.
///
/// `Serialize` is required for the debug export.
pub trait Component: Clone + Serialize + Send + Sync + 'static {
    /// Either [`Inline`] or [`Boxed`].
    type Storage: Storage<Self>;
}

/// Typed access to a pool's slots. Implemented by [`Inline`] and [`Boxed`] only.
pub trait Storage<T: 'static>: sealed::Sealed {
    /// Runtime tag for this strategy.
    const KIND: StorageKind;

    /// Appends a value, returning its index.
    ///
    /// # Errors
    ///
    /// Fails if the pool cannot grow.
    fn push(pool: &mut ComponentPool, value: T) -> EcsResult<usize>;

    /// Reads the value at `index`.
    ///
    /// # Errors
    ///
    /// Fails if `index` is out of range.
    fn get(pool: &ComponentPool, index: usize) -> EcsResult<&T>;

    /// Reads the value at `index` mutably.
    ///
    /// # Errors
    ///
    /// Fails if `index` is out of range.
    fn get_mut(pool: &mut ComponentPool, index: usize) -> EcsResult<&mut T>;
}

fn layout_error<T>() -> EcsError {
    EcsError::UnsupportedLayout {
        component: type_name::<T>(),
        align: align_of::<T>(),
        max_align: MAX_INLINE_ALIGN,
    }
}

impl<T: Pod> Storage<T> for Inline {
    const KIND: StorageKind = StorageKind::Inline;

    #[inline]
    fn push(pool: &mut ComponentPool, value: T) -> EcsResult<usize> {
        pool.push_bytes(bytemuck::bytes_of(&value))
    }

    #[inline]
    fn get(pool: &ComponentPool, index: usize) -> EcsResult<&T> {
        bytemuck::try_from_bytes(pool.slot_bytes(index)?).map_err(|_| layout_error::<T>())
    }

    #[inline]
    fn get_mut(pool: &mut ComponentPool, index: usize) -> EcsResult<&mut T> {
        bytemuck::try_from_bytes_mut(pool.slot_bytes_mut(index)?).map_err(|_| layout_error::<T>())
    }
}

impl<T: Any + Send + Sync> Storage<T> for Boxed {
    const KIND: StorageKind = StorageKind::Boxed;

    fn push(pool: &mut ComponentPool, value: T) -> EcsResult<usize> {
        pool.push_boxed(Box::new(value))
    }

    fn get(pool: &ComponentPool, index: usize) -> EcsResult<&T> {
        let expected = pool.component().name();
        pool.boxed(index)?
            .downcast_ref::<T>()
            .ok_or(EcsError::TypeMismatch {
                expected,
                found: type_name::<T>(),
            })
    }

    fn get_mut(pool: &mut ComponentPool, index: usize) -> EcsResult<&mut T> {
        let expected = pool.component().name();
        pool.boxed_mut(index)?
            .downcast_mut::<T>()
            .ok_or(EcsError::TypeMismatch {
                expected,
                found: type_name::<T>(),
            })
    }
}

/// Implements [`Component`] for one or more types with the given storage.
///
/// ```rust,ignore
/// impl_component!(Inline: Position, Velocity);
/// impl_component!(Boxed: Name);
/// ```
#[macro_export]
macro_rules! impl_component {
    ($storage:ident: $($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Component for $ty {
                type Storage = $crate::$storage;
            }
        )+
    };
}

crate::impl_component!(Inline: u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);
crate::impl_component!(Boxed: String);

impl<T: Clone + Serialize + Send + Sync + 'static> Component for Vec<T> {
    type Storage = Boxed;
}

/// Runtime token for a component type.
///
/// Carries the layout facts a pool needs plus type-erased clone and export
/// functions. Equality, ordering and hashing use the `TypeId` only.
#[derive(Clone, Copy)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
    size: usize,
    align: usize,
    kind: StorageKind,
    clone_boxed: fn(&(dyn Any + Send + Sync)) -> Option<BoxedValue>,
    export: fn(&ComponentPool, usize) -> EcsResult<serde_json::Value>,
}

fn clone_boxed<T: Component>(value: &(dyn Any + Send + Sync)) -> Option<BoxedValue> {
    value
        .downcast_ref::<T>()
        .map(|v| Box::new(v.clone()) as BoxedValue)
}

fn export_at<T: Component>(pool: &ComponentPool, index: usize) -> EcsResult<serde_json::Value> {
    Ok(serde_json::to_value(pool.get::<T>(index)?)?)
}

impl ComponentType {
    /// Token for `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
            kind: <T::Storage as Storage<T>>::KIND,
            clone_boxed: clone_boxed::<T>,
            export: export_at::<T>,
        }
    }

    /// The `TypeId` of the component.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// `size_of` the value type.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// `align_of` the value type.
    #[inline]
    #[must_use]
    pub const fn align(&self) -> usize {
        self.align
    }

    /// Storage strategy.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> StorageKind {
        self.kind
    }

    /// Bytes per pool element: the value size for inline types, one handle
    /// for boxed types.
    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        match self.kind {
            StorageKind::Inline => self.size,
            StorageKind::Boxed => HANDLE_STRIDE,
        }
    }

    /// Returns `true` if this token describes `T`.
    #[inline]
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Checks that a pool can hold this type.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnsupportedLayout`] for inline types aligned above
    /// [`MAX_INLINE_ALIGN`].
    pub fn check_layout(&self) -> EcsResult<()> {
        if self.kind == StorageKind::Inline && self.align > MAX_INLINE_ALIGN {
            return Err(EcsError::UnsupportedLayout {
                component: self.name,
                align: self.align,
                max_align: MAX_INLINE_ALIGN,
            });
        }
        Ok(())
    }

    pub(crate) fn clone_value(&self, value: &(dyn Any + Send + Sync)) -> Option<BoxedValue> {
        (self.clone_boxed)(value)
    }

    pub(crate) fn export_value(
        &self,
        pool: &ComponentPool,
        index: usize,
    ) -> EcsResult<serde_json::Value> {
        (self.export)(pool, index)
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

impl PartialOrd for ComponentType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComponentType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for ComponentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("stride", &self.stride())
            .finish()
    }
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod, Serialize)]
    #[repr(C)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Clone, Copy, Zeroable, Pod, Serialize)]
    #[repr(C, align(16))]
    #[allow(dead_code)] // only its layout is used
    struct Wide([u8; 16]);

    crate::impl_component!(Inline: Position, Wide);

    #[test]
    fn test_inline_token() {
        let token = ComponentType::of::<Position>();
        assert!(token.is::<Position>());
        assert_eq!(token.kind(), StorageKind::Inline);
        assert_eq!(token.size(), 8);
        assert_eq!(token.stride(), 8);
        assert!(token.check_layout().is_ok());
    }

    #[test]
    fn test_boxed_token() {
        let token = ComponentType::of::<String>();
        assert_eq!(token.kind(), StorageKind::Boxed);
        assert_eq!(token.stride(), HANDLE_STRIDE);
        assert!(token.check_layout().is_ok());
    }

    #[test]
    fn test_token_identity() {
        assert_eq!(ComponentType::of::<u32>(), ComponentType::of::<u32>());
        assert_ne!(ComponentType::of::<u32>(), ComponentType::of::<i32>());
    }

    #[test]
    fn test_over_aligned_rejected() {
        let err = ComponentType::of::<Wide>().check_layout().unwrap_err();
        assert!(matches!(
            err,
            EcsError::UnsupportedLayout { align: 16, max_align: 8, .. }
        ));
    }

    #[test]
    fn test_clone_value() {
        let token = ComponentType::of::<String>();
        let original: BoxedValue = Box::new(String::from("name"));

        let copy = token.clone_value(&*original).unwrap();
        assert_eq!(copy.downcast_ref::<String>().unwrap(), "name");

        let wrong: BoxedValue = Box::new(5u32);
        assert!(token.clone_value(&*wrong).is_none());
    }
}
