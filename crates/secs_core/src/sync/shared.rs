//! Lock-guarded registry handle.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::RegistryConfig;
use crate::ecs::{Component, EntityId, Registry};
use crate::error::EcsResult;

/// Cloneable, thread-safe handle to one [`Registry`].
#[derive(Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl SharedRegistry {
    /// Wraps a registry.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Creates a shared registry from a configuration.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`](crate::EcsError::InvalidConfig).
    pub fn with_config(config: RegistryConfig) -> EcsResult<Self> {
        Ok(Self::new(Registry::with_config(config)?))
    }

    /// Shared read access. Blocks while a writer holds the lock.
    pub fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.read()
    }

    /// Exclusive write access. Blocks while any guard is held.
    pub fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner.write()
    }

    /// Creates an entity under the write lock.
    pub fn create_entity(&self) -> EntityId {
        self.inner.write().create_entity()
    }

    /// Destroys an entity under the write lock.
    pub fn destroy_entity(&self, entity: EntityId) -> bool {
        self.inner.write().destroy_entity(entity)
    }

    /// Adds a component under the write lock.
    ///
    /// # Errors
    ///
    /// See [`Registry::add_component`].
    pub fn add_component<T: Component>(&self, entity: EntityId, value: T) -> EcsResult<()> {
        self.inner.write().add_component(entity, value).map(|_| ())
    }

    /// Removes a component under the write lock.
    ///
    /// # Errors
    ///
    /// See [`Registry::remove_component`].
    pub fn remove_component<T: Component>(&self, entity: EntityId) -> EcsResult<bool> {
        self.inner.write().remove_component::<T>(entity)
    }

    /// Runs `f` on a component under the read lock.
    ///
    /// # Errors
    ///
    /// See [`Registry::get_component`].
    pub fn with_component<T: Component, R>(
        &self,
        entity: EntityId,
        f: impl FnOnce(&T) -> R,
    ) -> EcsResult<R> {
        let registry = self.inner.read();
        registry.get_component::<T>(entity).map(f)
    }

    /// Runs `f` on a component under the write lock.
    ///
    /// # Errors
    ///
    /// See [`Registry::get_component_mut`].
    pub fn with_component_mut<T: Component, R>(
        &self,
        entity: EntityId,
        f: impl FnOnce(&mut T) -> R,
    ) -> EcsResult<R> {
        let mut registry = self.inner.write();
        registry.get_component_mut::<T>(entity).map(f)
    }

    /// Returns `true` if the entity has a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.inner.read().has_component::<T>(entity)
    }

    /// Snapshot of all live entities.
    #[must_use]
    pub fn all_entities(&self) -> Vec<EntityId> {
        self.inner.read().all_entities()
    }

    /// Structural change counter.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.read().version()
    }
}

impl std::fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedRegistry").field(&*self.inner.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_shared_mutation() {
        let shared = SharedRegistry::default();
        let e = shared.create_entity();

        shared.add_component(e, 10u32).unwrap();
        shared.with_component_mut::<u32, _>(e, |v| *v += 5).unwrap();

        assert_eq!(shared.with_component::<u32, _>(e, |v| *v).unwrap(), 15);
        assert!(shared.has_component::<u32>(e));
        assert!(shared.remove_component::<u32>(e).unwrap());
        assert!(shared.destroy_entity(e));
        assert!(shared.all_entities().is_empty());
    }

    #[test]
    fn test_concurrent_writers() {
        let shared = SharedRegistry::default();

        let workers: Vec<_> = (0..4)
            .map(|t| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..50u32 {
                        let e = shared.create_entity();
                        shared.add_component(e, t * 1000 + i).unwrap();
                        if i % 2 == 0 {
                            shared.add_component(e, String::from("even")).unwrap();
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let registry = shared.read();
        assert_eq!(registry.entity_count(), 200);
        assert_eq!(registry.iter::<u32>().count(), 200);
        assert_eq!(registry.iter::<String>().count(), 100);
        assert!(registry.archetypes().all(|a| a.is_consistent()));
    }

    #[test]
    fn test_invalid_config() {
        let config = RegistryConfig {
            graph_capacity: 0,
            ..RegistryConfig::default()
        };
        assert!(SharedRegistry::with_config(config).is_err());
    }
}
