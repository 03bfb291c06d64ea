//! # Type-Keyed Collections
//!
//! Containers indexed by a runtime type token, for systems that keep
//! per-type side tables (asset lists, per-component lookup maps).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::hash::Hash;

/// A `Vec<T>` with its element type erased.
trait ErasedList: Send + Sync {
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Send + Sync + 'static> ErasedList for Vec<T> {
    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One homogeneous list per type.
#[derive(Default)]
pub struct TypeLookup {
    lists: HashMap<TypeId, Box<dyn ErasedList>>,
}

impl TypeLookup {
    /// Creates an empty lookup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The list for `T`, empty if none was created yet.
    #[must_use]
    pub fn list<T: Send + Sync + 'static>(&self) -> &[T] {
        self.lists
            .get(&TypeId::of::<T>())
            .and_then(|list| list.as_any().downcast_ref::<Vec<T>>())
            .map_or(&[] as &[T], Vec::as_slice)
    }

    /// The list for `T`, if one was created by [`TypeLookup::register`].
    pub fn list_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut Vec<T>> {
        self.lists
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<Vec<T>>()
    }

    /// Appends `value` to its type's list, creating the list on first use,
    /// and returns its index.
    pub fn register<T: Send + Sync + 'static>(&mut self, value: T) -> usize {
        if let Some(list) = self.list_mut::<T>() {
            list.push(value);
            return list.len() - 1;
        }
        self.lists.insert(TypeId::of::<T>(), Box::new(vec![value]));
        0
    }

    /// Returns `true` if a list for `T` exists, even an empty one.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.contains_type(TypeId::of::<T>())
    }

    /// Returns `true` if a list for this type id exists.
    #[must_use]
    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.lists.contains_key(&type_id)
    }

    /// Type ids that have a list, in no particular order.
    pub fn types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.lists.keys().copied()
    }

    /// Empties every list. The lists themselves stay registered.
    pub fn clear(&mut self) {
        for list in self.lists.values_mut() {
            list.clear();
        }
    }
}

impl std::fmt::Debug for TypeLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeLookup")
            .field("types", &self.lists.len())
            .finish()
    }
}

/// A map keyed by `(type, key)`. The same key can hold a different value
/// under every type.
#[derive(Debug, Clone)]
pub struct TypeKeyedMap<K, V> {
    entries: HashMap<TypeId, HashMap<K, V>>,
}

impl<K, V> Default for TypeKeyedMap<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> TypeKeyedMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts under `(T, key)`, returning the previous value.
    pub fn insert<T: 'static>(&mut self, key: K, value: V) -> Option<V> {
        self.entries
            .entry(TypeId::of::<T>())
            .or_default()
            .insert(key, value)
    }

    /// Value under `(T, key)`.
    #[must_use]
    pub fn get<T: 'static>(&self, key: &K) -> Option<&V> {
        self.get_by_type_id(TypeId::of::<T>(), key)
    }

    /// Mutable value under `(T, key)`.
    pub fn get_mut<T: 'static>(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(&TypeId::of::<T>())?.get_mut(key)
    }

    /// Value under `(type_id, key)`, for callers holding only a runtime token.
    #[must_use]
    pub fn get_by_type_id(&self, type_id: TypeId, key: &K) -> Option<&V> {
        self.entries.get(&type_id)?.get(key)
    }

    /// Returns `true` if `(T, key)` is present.
    #[must_use]
    pub fn contains<T: 'static>(&self, key: &K) -> bool {
        self.get::<T>(key).is_some()
    }

    /// Removes and returns the value under `(T, key)`.
    pub fn remove<T: 'static>(&mut self, key: &K) -> Option<V> {
        let type_id = TypeId::of::<T>();
        let inner = self.entries.get_mut(&type_id)?;
        let removed = inner.remove(key);
        if inner.is_empty() {
            self.entries.remove(&type_id);
        }
        removed
    }

    /// Total entries across all types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    /// Returns `true` if the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
