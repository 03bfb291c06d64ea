//! # Archetype Storage
//!
//! An archetype stores every entity that has exactly one particular set of
//! component types.
//!
//! ```text
//! Archetype {Position, Velocity}:
//!   entities:  [e4,  e7,  e2 ]
//!   Position:  [P4,  P7,  P2 ]   <- slot i belongs to entities[i]
//!   Velocity:  [V4,  V7,  V2 ]
//! ```
//!
//! Invariant: every pool holds exactly `len()` elements, and slot `i` of every
//! pool belongs to `entities[i]`. Migration between archetypes is
//! copy-then-delete: [`Archetype::copy_entity_to`] first, then
//! [`Archetype::remove_all_of`] on the source.

use std::any::{type_name, TypeId};
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::component::{Component, ComponentType};
use super::entity::EntityId;
use crate::config::{RegistryConfig, RemovalPolicy};
use crate::error::{EcsError, EcsResult};
use crate::memory::ComponentPool;

/// Identifier of an archetype. Equal to its vertex index in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// The archetype with no component types. Root of the graph.
    pub const EMPTY: Self = Self(0);

    /// Creates an id from a vertex index.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit in 32 bits.
    #[inline]
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or_else(|_| panic!("archetype index {index} overflows u32")))
    }

    /// The vertex index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// Sorted, deduplicated set of component types.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArchetypeSignature {
    /// Sorted by `TypeId`.
    components: Vec<ComponentType>,
}

impl ArchetypeSignature {
    /// Creates a signature from component types.
    #[must_use]
    pub fn new(mut components: Vec<ComponentType>) -> Self {
        components.sort();
        components.dedup();
        Self { components }
    }

    /// The empty signature.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Checks if this signature contains a component type.
    #[must_use]
    pub fn contains<C: Component>(&self) -> bool {
        self.contains_id(TypeId::of::<C>())
    }

    /// Checks if this signature contains the given `TypeId`.
    #[must_use]
    pub fn contains_id(&self, id: TypeId) -> bool {
        self.components
            .binary_search_by(|c| c.id().cmp(&id))
            .is_ok()
    }

    /// Returns the number of component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` for the empty signature.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The component types, sorted.
    #[must_use]
    pub fn types(&self) -> &[ComponentType] {
        &self.components
    }

    /// This signature plus `component`.
    #[must_use]
    pub fn with(&self, component: ComponentType) -> Self {
        let mut components = self.components.clone();
        components.push(component);
        Self::new(components)
    }

    /// This signature minus the type with `id`.
    #[must_use]
    pub fn without(&self, id: TypeId) -> Self {
        Self {
            components: self
                .components
                .iter()
                .copied()
                .filter(|c| c.id() != id)
                .collect(),
        }
    }
}

/// Storage for all entities sharing one exact component-type set.
pub struct Archetype {
    id: ArchetypeId,
    signature: ArchetypeSignature,
    /// One pool per component type.
    pools: BTreeMap<TypeId, ComponentPool>,
    /// Slot → entity.
    entities: Vec<EntityId>,
    /// Entity → slot.
    slots: HashMap<EntityId, usize>,
    policy: RemovalPolicy,
}

impl Archetype {
    /// Creates an empty archetype with one pool per signature type.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnsupportedLayout`] if a type cannot be pooled.
    pub fn new(
        id: ArchetypeId,
        signature: ArchetypeSignature,
        config: &RegistryConfig,
    ) -> EcsResult<Self> {
        let pools = signature
            .types()
            .iter()
            .map(|&component| Ok((component.id(), ComponentPool::new(component, config.pool)?)))
            .collect::<EcsResult<BTreeMap<_, _>>>()?;

        Ok(Self {
            id,
            signature,
            pools,
            entities: Vec::new(),
            slots: HashMap::new(),
            policy: config.removal,
        })
    }

    /// The empty archetype. It has no pools and only tracks entity slots.
    #[must_use]
    pub fn empty(config: &RegistryConfig) -> Self {
        Self {
            id: ArchetypeId::EMPTY,
            signature: ArchetypeSignature::empty(),
            pools: BTreeMap::new(),
            entities: Vec::new(),
            slots: HashMap::new(),
            policy: config.removal,
        }
    }

    /// The archetype's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ArchetypeId {
        self.id
    }

    /// The archetype's type-set.
    #[inline]
    #[must_use]
    pub const fn signature(&self) -> &ArchetypeSignature {
        &self.signature
    }

    /// Number of entities stored.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entity is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in slot order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Returns `true` if `entity` lives here.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.slots.contains_key(&entity)
    }

    /// The slot of `entity`, if it lives here.
    #[inline]
    #[must_use]
    pub fn slot_of(&self, entity: EntityId) -> Option<usize> {
        self.slots.get(&entity).copied()
    }

    /// Returns `true` if this archetype stores `T`.
    #[inline]
    #[must_use]
    pub fn has_component<T: Component>(&self) -> bool {
        self.pools.contains_key(&TypeId::of::<T>())
    }

    /// The pool for a component type.
    #[must_use]
    pub fn pool(&self, id: TypeId) -> Option<&ComponentPool> {
        self.pools.get(&id)
    }

    /// All pools, ordered by `TypeId`.
    pub fn pools(&self) -> impl Iterator<Item = &ComponentPool> {
        self.pools.values()
    }

    /// Makes room for `additional` entities in every pool.
    ///
    /// # Errors
    ///
    /// [`EcsError::AllocationFailed`] if a pool cannot grow.
    pub fn reserve(&mut self, additional: usize) -> EcsResult<()> {
        for pool in self.pools.values_mut() {
            pool.reserve(additional)?;
        }
        self.entities.reserve(additional);
        Ok(())
    }

    /// Appends `value` to the pool for `T` and records `entity`'s slot.
    ///
    /// Only valid as the first step of a migration: the caller must follow up
    /// with [`copy_entity_to`](Self::copy_entity_to) from the source archetype
    /// so every other pool gains the entity too.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeNotInArchetype`] if `T` is not part of the signature.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, value: T) -> EcsResult<usize> {
        let pool = self
            .pools
            .get_mut(&TypeId::of::<T>())
            .ok_or(EcsError::TypeNotInArchetype {
                archetype: self.id,
                component: type_name::<T>(),
            })?;
        let index = pool.push(value)?;
        let slot = self.claim_slot(entity);
        debug_assert_eq!(index, slot, "pool out of step with entity slots");
        Ok(slot)
    }

    /// Copies `entity`'s values for every type shared with `target`.
    ///
    /// No-op if `entity` is not stored here. The source is left untouched,
    /// and so is `target` when any pool fails to copy.
    ///
    /// # Errors
    ///
    /// [`EcsError::AllocationFailed`] if a target pool cannot grow.
    pub fn copy_entity_to(&self, entity: EntityId, target: &mut Self) -> EcsResult<()> {
        let Some(&slot) = self.slots.get(&entity) else {
            return Ok(());
        };
        let mut copied = Vec::with_capacity(self.pools.len());
        for (id, pool) in &self.pools {
            if let Some(dest) = target.pools.get_mut(id) {
                if let Err(err) = pool.copy_range_into(slot, 1, dest) {
                    for id in &copied {
                        if let Some(dest) = target.pools.get_mut(id) {
                            dest.pop();
                        }
                    }
                    return Err(err);
                }
                copied.push(*id);
            }
        }
        target.claim_slot(entity);
        Ok(())
    }

    /// Removes `entity` from every pool and from the slot index.
    ///
    /// Returns `false` if `entity` was not stored here.
    pub fn remove_all_of(&mut self, entity: EntityId) -> bool {
        let Some(slot) = self.slots.remove(&entity) else {
            return false;
        };
        for pool in self.pools.values_mut() {
            pool.remove(slot, self.policy);
        }

        match self.policy {
            RemovalPolicy::SwapRemove => {
                self.entities.swap_remove(slot);
                if let Some(&moved) = self.entities.get(slot) {
                    self.slots.insert(moved, slot);
                }
            }
            RemovalPolicy::ShiftDown => {
                self.entities.remove(slot);
                for (index, &shifted) in self.entities.iter().enumerate().skip(slot) {
                    self.slots.insert(shifted, index);
                }
            }
        }
        true
    }

    /// Reads `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::ComponentNotFound`].
    pub fn get<T: Component>(&self, entity: EntityId) -> EcsResult<&T> {
        let slot = self.slot_of(entity).ok_or(EcsError::EntityNotFound(entity))?;
        self.pools
            .get(&TypeId::of::<T>())
            .ok_or(EcsError::ComponentNotFound {
                entity,
                component: type_name::<T>(),
            })?
            .get(slot)
    }

    /// Reads `entity`'s `T` mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::ComponentNotFound`].
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        let slot = self.slot_of(entity).ok_or(EcsError::EntityNotFound(entity))?;
        self.pools
            .get_mut(&TypeId::of::<T>())
            .ok_or(EcsError::ComponentNotFound {
                entity,
                component: type_name::<T>(),
            })?
            .get_mut(slot)
    }

    /// Every `(entity, &T)` pair in slot order. Empty if `T` is not stored here.
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.pools
            .get(&TypeId::of::<T>())
            .and_then(|pool| pool.iter::<T>().ok())
            .into_iter()
            .flatten()
            .zip(self.entities.iter())
            .map(|(value, &entity)| (entity, value))
    }

    /// Checks the density invariant: every pool holds `len()` elements and
    /// the slot index is the inverse of the entity list.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.pools.values().all(|pool| pool.len() == self.entities.len())
            && self.slots.len() == self.entities.len()
            && self
                .entities
                .iter()
                .enumerate()
                .all(|(slot, entity)| self.slots.get(entity) == Some(&slot))
    }

    /// Removes every entity, keeping pool capacity.
    pub fn clear(&mut self) {
        for pool in self.pools.values_mut() {
            pool.clear();
        }
        self.entities.clear();
        self.slots.clear();
    }

    /// Removes every entity and frees pool memory.
    pub fn release(&mut self) {
        for pool in self.pools.values_mut() {
            pool.release();
        }
        self.entities = Vec::new();
        self.slots = HashMap::new();
    }

    /// Records `entity` in the slot index without touching any pool.
    pub(crate) fn claim_slot(&mut self, entity: EntityId) -> usize {
        if let Some(&slot) = self.slots.get(&entity) {
            return slot;
        }
        self.entities.push(entity);
        let slot = self.entities.len() - 1;
        self.slots.insert(entity, slot);
        slot
    }
}

impl std::fmt::Debug for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .field("entities", &self.entities.len())
            .finish()
    }
}
