//! # Queries
//!
//! - [`EntityHandle`]: per-entity view over a mutably borrowed registry
//! - [`CachedQuery`]: memoized query results, recomputed only after a
//!   structural change

use super::archetype::ArchetypeId;
use super::component::Component;
use super::entity::EntityId;
use super::registry::Registry;
use crate::error::EcsResult;

/// Mutable view of one entity.
///
/// Obtained from [`Registry::entity`]. The entity existed when the handle was
/// created; after [`destroy`](Self::destroy) the handle is consumed.
pub struct EntityHandle<'r> {
    registry: &'r mut Registry,
    entity: EntityId,
}

impl<'r> EntityHandle<'r> {
    pub(crate) fn new(registry: &'r mut Registry, entity: EntityId) -> Self {
        Self { registry, entity }
    }

    /// The entity's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.entity
    }

    /// The entity's current archetype.
    #[must_use]
    pub fn archetype(&self) -> Option<ArchetypeId> {
        self.registry.archetype_of(self.entity)
    }

    /// Reads a component.
    ///
    /// # Errors
    ///
    /// See [`Registry::get_component`].
    pub fn get<T: Component>(&self) -> EcsResult<&T> {
        self.registry.get_component(self.entity)
    }

    /// Reads a component mutably.
    ///
    /// # Errors
    ///
    /// See [`Registry::get_component_mut`].
    pub fn get_mut<T: Component>(&mut self) -> EcsResult<&mut T> {
        self.registry.get_component_mut(self.entity)
    }

    /// Returns `true` if the entity has a `T`.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.registry.has_component::<T>(self.entity)
    }

    /// Adds a component. Chainable.
    ///
    /// # Errors
    ///
    /// See [`Registry::add_component`].
    pub fn add<T: Component>(&mut self, value: T) -> EcsResult<&mut Self> {
        self.registry.add_component(self.entity, value)?;
        Ok(self)
    }

    /// Removes a component. Returns `false` if it was absent.
    ///
    /// # Errors
    ///
    /// See [`Registry::remove_component`].
    pub fn remove<T: Component>(&mut self) -> EcsResult<bool> {
        self.registry.remove_component::<T>(self.entity)
    }

    /// Destroys the entity.
    pub fn destroy(self) -> bool {
        self.registry.destroy_entity(self.entity)
    }
}

type QueryFn<R> = dyn Fn(&Registry) -> Vec<R> + Send + Sync;

/// Memoizes the results of a query over a [`Registry`].
///
/// The query runs again only when [`Registry::version`] has moved since the
/// last evaluation. In-place component writes do not bump the version, so
/// cache results that depend on structure (which entities, which archetypes)
/// rather than on component values.
///
/// A cache must be used with a single registry.
pub struct CachedQuery<R> {
    query: Box<QueryFn<R>>,
    results: Vec<R>,
    version: Option<u64>,
}

impl<R> CachedQuery<R> {
    /// Wraps a query closure.
    pub fn new<F>(query: F) -> Self
    where
        F: Fn(&Registry) -> Vec<R> + Send + Sync + 'static,
    {
        Self {
            query: Box::new(query),
            results: Vec::new(),
            version: None,
        }
    }

    /// Cached results, recomputed if the registry changed.
    pub fn get(&mut self, registry: &Registry) -> &[R] {
        if self.is_stale(registry) {
            self.results = (self.query)(registry);
            self.version = Some(registry.version());
        }
        &self.results
    }

    /// Returns `true` if the next [`get`](Self::get) will re-run the query.
    #[must_use]
    pub fn is_stale(&self, registry: &Registry) -> bool {
        self.version != Some(registry.version())
    }

    /// Forces the next [`get`](Self::get) to re-run the query.
    pub fn invalidate(&mut self) {
        self.version = None;
    }
}

impl CachedQuery<EntityId> {
    /// Cached list of every entity that has a `T`.
    #[must_use]
    pub fn with<T: Component>() -> Self {
        Self::new(|registry| registry.iter::<T>().map(|(entity, _)| entity).collect())
    }
}

impl<R> std::fmt::Debug for CachedQuery<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedQuery")
            .field("results", &self.results.len())
            .field("version", &self.version)
            .finish()
    }
}
