//! # Registry
//!
//! The facade over the archetype graph. Owns every archetype and pool, hands
//! out entity ids, and migrates entities between archetypes when their
//! component set changes.
//!
//! ## Entity lifecycle
//!
//! ```text
//! NonExistent --create--> Empty --add/remove*--> S_i --destroy--> NonExistent
//! ```
//!
//! ## Migration
//!
//! Adding `T` to an entity in archetype `A`:
//! 1. resolve `B = A + T` through the graph (memoized edge)
//! 2. reserve one slot in every pool of `B`
//! 3. append the new `T` to `B`
//! 4. copy the entity's other values from `A` to `B`
//! 5. remove the entity from `A`
//! 6. record `B` as the entity's archetype
//!
//! A failure before step 5 rolls `B` back, so callers see either the old
//! state or the new one.
//!
//! # Thread Safety
//!
//! Not thread-safe. Use [`SharedRegistry`](crate::SharedRegistry) to share one
//! across threads.

use std::any::type_name;
use std::collections::BTreeMap;

use tracing::trace;

use super::archetype::{Archetype, ArchetypeId};
use super::component::{Component, ComponentType};
use super::entity::{EntityAllocator, EntityId};
use super::export::ArchetypeDump;
use super::graph::ArchetypeGraph;
use super::query::EntityHandle;
use crate::config::RegistryConfig;
use crate::error::{EcsError, EcsResult};

/// Owns all entities, archetypes and component data of one simulation.
pub struct Registry {
    config: RegistryConfig,
    graph: ArchetypeGraph,
    /// Entity → current archetype.
    locations: BTreeMap<EntityId, ArchetypeId>,
    allocator: EntityAllocator,
    /// Bumped by every committed structural change.
    version: u64,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(RegistryConfig::default())
    }

    /// Creates a registry with a custom configuration.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if the configuration is invalid.
    pub fn with_config(config: RegistryConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: RegistryConfig) -> Self {
        Self {
            config,
            graph: ArchetypeGraph::new(config),
            locations: BTreeMap::new(),
            allocator: EntityAllocator::new(),
            version: 0,
        }
    }

    /// The active configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The archetype graph.
    #[inline]
    #[must_use]
    pub const fn graph(&self) -> &ArchetypeGraph {
        &self.graph
    }

    /// Structural change counter.
    ///
    /// Incremented by every committed create, destroy, add, remove and clear.
    /// In-place writes through [`get_component_mut`](Self::get_component_mut)
    /// do not change it.
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    // =========================================================================
    // ENTITIES
    // =========================================================================

    /// Creates an entity with no components.
    ///
    /// # Panics
    ///
    /// Panics if the 32-bit id space is exhausted.
    pub fn create_entity(&mut self) -> EntityId {
        let entity = self.allocator.allocate();
        self.graph.root_mut().claim_slot(entity);
        self.locations.insert(entity, ArchetypeId::EMPTY);
        self.version += 1;
        trace!(entity = %entity, "entity created");
        entity
    }

    /// Destroys an entity and all its components.
    ///
    /// Returns `false` if the entity does not exist. Destroying twice is
    /// therefore harmless.
    pub fn destroy_entity(&mut self, entity: EntityId) -> bool {
        let Some(archetype) = self.locations.remove(&entity) else {
            return false;
        };
        if let Ok(archetype) = self.graph.get_mut(archetype) {
            archetype.remove_all_of(entity);
        }
        self.version += 1;
        trace!(entity = %entity, "entity destroyed");
        true
    }

    /// Returns `true` if the entity exists.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.locations.contains_key(&entity)
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.locations.len()
    }

    /// Snapshot of all live entities, ascending.
    ///
    /// The returned `Vec` is detached from the registry, so it stays valid
    /// across later mutations.
    #[must_use]
    pub fn all_entities(&self) -> Vec<EntityId> {
        self.locations.keys().copied().collect()
    }

    /// Handle for reading and mutating one entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] if the entity does not exist.
    pub fn entity(&mut self, entity: EntityId) -> EcsResult<EntityHandle<'_>> {
        if !self.contains(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        Ok(EntityHandle::new(self, entity))
    }

    // =========================================================================
    // COMPONENTS
    // =========================================================================

    /// Adds a component, migrating the entity to the archetype for its new
    /// type-set. Returns a reference to the stored value.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if the entity does not exist
    /// - [`EcsError::DuplicateComponent`] if it already has a `T`
    /// - [`EcsError::UnsupportedLayout`] if `T` cannot be pooled
    /// - [`EcsError::AllocationFailed`] if storage cannot grow
    pub fn add_component<T: Component>(&mut self, entity: EntityId, value: T) -> EcsResult<&mut T> {
        let from = self.location(entity)?;
        let component = ComponentType::of::<T>();
        if self.graph.get(from)?.signature().contains_id(component.id()) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: component.name(),
            });
        }

        let to = self.graph.extend(from, component)?;
        let (source, target) = self.graph.pair_mut(from, to)?;
        target.reserve(1)?;
        target.add_component(entity, value)?;
        if let Err(err) = source.copy_entity_to(entity, target) {
            target.remove_all_of(entity);
            return Err(err);
        }
        source.remove_all_of(entity);

        self.commit(entity, from, to);
        self.graph.get_mut(to)?.get_mut::<T>(entity)
    }

    /// Removes a component, migrating the entity to the archetype without it.
    ///
    /// Returns `Ok(false)` if the entity does not exist or has no `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::AllocationFailed`] if storage cannot grow.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> EcsResult<bool> {
        let Some(&from) = self.locations.get(&entity) else {
            return Ok(false);
        };
        let component = ComponentType::of::<T>();
        if !self.graph.get(from)?.signature().contains_id(component.id()) {
            return Ok(false);
        }

        let to = self.graph.reduce(from, component)?;
        let (source, target) = self.graph.pair_mut(from, to)?;
        target.reserve(1)?;
        if let Err(err) = source.copy_entity_to(entity, target) {
            target.remove_all_of(entity);
            return Err(err);
        }
        source.remove_all_of(entity);

        self.commit(entity, from, to);
        Ok(true)
    }

    /// Reads a component.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::ComponentNotFound`].
    pub fn get_component<T: Component>(&self, entity: EntityId) -> EcsResult<&T> {
        let location = self.location(entity)?;
        self.graph.get(location)?.get::<T>(entity)
    }

    /// Reads a component mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::ComponentNotFound`].
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> EcsResult<&mut T> {
        let location = self.location(entity)?;
        self.graph.get_mut(location)?.get_mut::<T>(entity)
    }

    /// Returns `true` if the entity exists and has a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.archetype_of(entity)
            .and_then(|id| self.graph.archetype(id))
            .is_some_and(Archetype::has_component::<T>)
    }

    /// Every `(entity, &T)` pair, archetype by archetype.
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.graph
            .archetypes()
            .filter(|archetype| archetype.has_component::<T>())
            .flat_map(|archetype| archetype.iter::<T>())
    }

    // =========================================================================
    // ARCHETYPES
    // =========================================================================

    /// The archetype an entity currently lives in.
    #[inline]
    #[must_use]
    pub fn archetype_of(&self, entity: EntityId) -> Option<ArchetypeId> {
        self.locations.get(&entity).copied()
    }

    /// Looks up an archetype.
    #[inline]
    #[must_use]
    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.graph.archetype(id)
    }

    /// All archetypes in id order.
    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.graph.archetypes()
    }

    /// Number of archetypes, including the empty one.
    #[inline]
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.graph.vertex_count()
    }

    /// Entities of one archetype in slot order.
    ///
    /// # Errors
    ///
    /// [`EcsError::ArchetypeNotFound`].
    pub fn entities_of(&self, id: ArchetypeId) -> EcsResult<&[EntityId]> {
        Ok(self.graph.get(id)?.entities())
    }

    /// Ids of every archetype that stores `T`.
    #[must_use]
    pub fn archetypes_with<T: Component>(&self) -> Vec<ArchetypeId> {
        self.graph
            .archetypes()
            .filter(|archetype| archetype.has_component::<T>())
            .map(Archetype::id)
            .collect()
    }

    /// Every archetype reachable from `from` by adding components, in
    /// depth-first order (including `from`).
    #[must_use]
    pub fn reachable_archetypes(&self, from: ArchetypeId) -> Vec<ArchetypeId> {
        self.graph.depth_first(from).map(Archetype::id).collect()
    }

    /// Pretty JSON dump of one archetype.
    ///
    /// # Errors
    ///
    /// [`EcsError::ArchetypeNotFound`] or [`EcsError::Export`].
    pub fn export_archetype(&self, id: ArchetypeId) -> EcsResult<String> {
        ArchetypeDump::capture(self.graph.get(id)?)?.to_json_pretty()
    }

    /// Destroys every entity and frees all pool memory.
    ///
    /// Archetypes and edges are kept. Entity ids keep increasing.
    pub fn clear(&mut self) {
        for archetype in self.graph.archetypes_mut() {
            archetype.release();
        }
        self.locations.clear();
        self.version += 1;
        trace!("registry cleared");
    }

    fn location(&self, entity: EntityId) -> EcsResult<ArchetypeId> {
        self.archetype_of(entity)
            .ok_or(EcsError::EntityNotFound(entity))
    }

    fn commit(&mut self, entity: EntityId, from: ArchetypeId, to: ArchetypeId) {
        self.locations.insert(entity, to);
        self.version += 1;
        trace!(entity = %entity, from = %from, to = %to, "entity migrated");
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entities", &self.locations.len())
            .field("archetypes", &self.graph.vertex_count())
            .field("version", &self.version)
            .finish()
    }
}

/// Name of `T` as used in errors and exports.
#[must_use]
pub fn component_name<T: Component>() -> &'static str {
    type_name::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemovalPolicy;
    use bytemuck::{Pod, Zeroable};
    use serde::Serialize;

    #[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod, Serialize)]
    #[repr(C)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod, Serialize)]
    #[repr(C)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod, Serialize)]
    #[repr(C)]
    struct Health(u32);

    #[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod, Serialize)]
    #[repr(C)]
    struct Asleep([u8; 0]);

    crate::impl_component!(Inline: Position, Velocity, Health, Asleep);

    #[test]
    fn test_create_entity_lands_in_empty() {
        let mut registry = Registry::new();
        let e = registry.create_entity();

        assert!(registry.contains(e));
        assert_eq!(registry.archetype_of(e), Some(ArchetypeId::EMPTY));
        assert_eq!(registry.entities_of(ArchetypeId::EMPTY).unwrap(), &[e]);
        assert_eq!(registry.version(), 1);
    }

    #[test]
    fn test_add_get_round_trip() {
        let mut registry = Registry::new();
        let e = registry.create_entity();

        let stored = registry.add_component(e, Position { x: 1.0, y: 2.0 }).unwrap();
        assert_eq!(*stored, Position { x: 1.0, y: 2.0 });
        assert_eq!(
            *registry.get_component::<Position>(e).unwrap(),
            Position { x: 1.0, y: 2.0 }
        );
        assert!(registry.has_component::<Position>(e));
        assert!(!registry.has_component::<Velocity>(e));
        assert!(registry.entities_of(ArchetypeId::EMPTY).unwrap().is_empty());
    }

    #[test]
    fn test_add_returns_mutable_reference() {
        let mut registry = Registry::new();
        let e = registry.create_entity();

        registry.add_component(e, Health(10)).unwrap().0 = 50;
        assert_eq!(registry.get_component::<Health>(e).unwrap().0, 50);
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_component(e, Health(1)).unwrap();
        let archetype = registry.archetype_of(e);
        let version = registry.version();

        let err = registry.add_component(e, Health(2)).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
        assert_eq!(registry.get_component::<Health>(e).unwrap().0, 1);
        assert_eq!(registry.archetype_of(e), archetype);
        assert_eq!(registry.version(), version);
    }

    #[test]
    fn test_missing_entity_errors() {
        let mut registry = Registry::new();
        let ghost = EntityId::from_raw(99);

        assert_eq!(
            registry.add_component(ghost, Health(1)).unwrap_err(),
            EcsError::EntityNotFound(ghost)
        );
        assert_eq!(
            registry.get_component::<Health>(ghost).unwrap_err(),
            EcsError::EntityNotFound(ghost)
        );
        assert!(!registry.has_component::<Health>(ghost));
        assert!(!registry.remove_component::<Health>(ghost).unwrap());
        assert!(registry.entity(ghost).is_err());
    }

    #[test]
    fn test_missing_component_errors() {
        let mut registry = Registry::new();
        let e = registry.create_entity();

        assert!(matches!(
            registry.get_component::<Position>(e),
            Err(EcsError::ComponentNotFound { .. })
        ));
        assert!(!registry.remove_component::<Position>(e).unwrap());
        assert_eq!(registry.archetype_of(e), Some(ArchetypeId::EMPTY));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_component(e, Position { x: 0.0, y: 0.0 }).unwrap();
        let archetype = registry.archetype_of(e).unwrap();

        assert!(registry.destroy_entity(e));
        let version = registry.version();
        assert!(!registry.destroy_entity(e));

        assert_eq!(registry.version(), version);
        assert!(!registry.contains(e));
        assert!(registry.entities_of(archetype).unwrap().is_empty());
        assert_eq!(registry.entity_count(), 0);
    }

    #[test]
    fn test_remove_keeps_other_values() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_component(e, Position { x: 3.0, y: 4.0 }).unwrap();
        registry.add_component(e, Velocity { dx: 1.0, dy: 1.0 }).unwrap();

        assert!(registry.remove_component::<Position>(e).unwrap());

        assert!(!registry.has_component::<Position>(e));
        assert_eq!(
            *registry.get_component::<Velocity>(e).unwrap(),
            Velocity { dx: 1.0, dy: 1.0 }
        );
        let archetype = registry.archetype(registry.archetype_of(e).unwrap()).unwrap();
        assert_eq!(archetype.signature().len(), 1);
    }

    #[test]
    fn test_remove_back_to_empty_reuses_root() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_component(e, Health(1)).unwrap();
        registry.remove_component::<Health>(e).unwrap();

        assert_eq!(registry.archetype_of(e), Some(ArchetypeId::EMPTY));
        assert_eq!(registry.archetype_count(), 2);
    }

    #[test]
    fn test_all_entities_sorted_snapshot() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();
        let c = registry.create_entity();
        registry.add_component(c, Health(1)).unwrap();
        registry.destroy_entity(b);

        let snapshot = registry.all_entities();
        registry.create_entity();

        assert_eq!(snapshot, vec![a, c]);
        assert_eq!(registry.entity_count(), 3);
    }

    #[test]
    fn test_archetypes_with_and_iter() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();
        registry.add_component(a, Health(1)).unwrap();
        registry.add_component(b, Position { x: 0.0, y: 0.0 }).unwrap();
        registry.add_component(b, Health(2)).unwrap();

        assert_eq!(registry.archetypes_with::<Health>().len(), 2);
        assert_eq!(registry.archetypes_with::<Velocity>().len(), 0);

        let mut health: Vec<_> = registry.iter::<Health>().map(|(e, h)| (e, h.0)).collect();
        health.sort_unstable();
        assert_eq!(health, vec![(a, 1), (b, 2)]);
    }

    #[test]
    fn test_reachable_archetypes() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_component(e, Position { x: 0.0, y: 0.0 }).unwrap();
        registry.add_component(e, Velocity { dx: 0.0, dy: 0.0 }).unwrap();

        let reachable = registry.reachable_archetypes(ArchetypeId::EMPTY);
        assert_eq!(reachable.len(), 3);
        assert_eq!(reachable[0], ArchetypeId::EMPTY);
        assert_eq!(
            registry.reachable_archetypes(registry.archetype_of(e).unwrap()).len(),
            1
        );
    }

    #[test]
    fn test_shift_down_policy() {
        let config = RegistryConfig {
            removal: RemovalPolicy::ShiftDown,
            ..RegistryConfig::default()
        };
        let mut registry = Registry::with_config(config).unwrap();
        let entities: Vec<_> = (0..5).map(|_| registry.create_entity()).collect();
        for (i, &e) in entities.iter().enumerate() {
            registry.add_component(e, Health(i as u32)).unwrap();
        }
        registry.destroy_entity(entities[1]);

        let archetype = registry.archetype_of(entities[0]).unwrap();
        assert_eq!(
            registry.entities_of(archetype).unwrap(),
            &[entities[0], entities[2], entities[3], entities[4]]
        );
        for &e in &entities[2..] {
            assert_eq!(
                registry.get_component::<Health>(e).unwrap().0,
                e.raw()
            );
        }
        assert!(registry.archetype(archetype).unwrap().is_consistent());
    }

    #[test]
    fn test_failed_migration_keeps_entity_in_place() {
        let mut config = RegistryConfig::default();
        config.pool.baseline_bytes = usize::MAX / 4 * 3;
        let mut registry = Registry::with_config(config).unwrap();
        let e = registry.create_entity();
        registry.add_component(e, Asleep([])).unwrap();
        let before = registry.archetype_of(e).unwrap();
        let version = registry.version();

        let err = registry.add_component(e, Health(5)).unwrap_err();

        assert!(matches!(err, EcsError::AllocationFailed { .. }));
        assert_eq!(registry.archetype_of(e), Some(before));
        assert_eq!(registry.version(), version);
        assert!(registry.has_component::<Asleep>(e));
        assert!(!registry.has_component::<Health>(e));
        assert_eq!(registry.entities_of(before).unwrap(), &[e]);
        assert!(registry.archetypes().all(Archetype::is_consistent));

        // the entity can still move along edges that need no storage
        assert!(registry.remove_component::<Asleep>(e).unwrap());
        assert_eq!(registry.archetype_of(e), Some(ArchetypeId::EMPTY));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RegistryConfig {
            graph_capacity: 0,
            ..RegistryConfig::default()
        };
        assert!(matches!(
            Registry::with_config(config),
            Err(EcsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_boxed_components_follow_entity() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_component(e, String::from("player")).unwrap();
        registry.add_component(e, vec![1u8, 2, 3]).unwrap();
        registry.add_component(e, Health(3)).unwrap();
        registry.remove_component::<Vec<u8>>(e).unwrap();

        assert_eq!(registry.get_component::<String>(e).unwrap(), "player");
        registry.get_component_mut::<String>(e).unwrap().push('1');
        assert_eq!(registry.get_component::<String>(e).unwrap(), "player1");
        assert!(!registry.has_component::<Vec<u8>>(e));
    }

    #[test]
    fn test_clear_releases_storage() {
        let mut registry = Registry::new();
        for _ in 0..10 {
            let e = registry.create_entity();
            registry.add_component(e, Health(0)).unwrap();
        }
        let archetypes = registry.archetype_count();

        registry.clear();

        assert_eq!(registry.entity_count(), 0);
        assert_eq!(registry.archetype_count(), archetypes);
        assert!(registry
            .archetypes()
            .flat_map(|archetype| archetype.pools())
            .all(|pool| pool.capacity_bytes() == 0));
        let next = registry.create_entity();
        assert_eq!(next.raw(), 10);
    }

    #[test]
    fn test_export_archetype() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.add_component(e, Health(42)).unwrap();
        let archetype = registry.archetype_of(e).unwrap();

        let json = registry.export_archetype(archetype).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["archetype"], serde_json::json!(archetype.index()));
        assert_eq!(parsed["slots"][0]["entity"], serde_json::json!(e.raw()));
        assert_eq!(
            parsed["slots"][0]["components"][component_name::<Health>()],
            serde_json::json!(42)
        );
        assert!(registry.export_archetype(ArchetypeId::from_index(50)).is_err());
    }
}
