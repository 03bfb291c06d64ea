//! # SECS Core
//!
//! Archetype-based entity/component storage engine.
//!
//! Entities that share an exact component-type set live together in one
//! archetype, and each component type is packed contiguously in its own pool.
//! Adding or removing a component migrates the entity between archetypes,
//! following memoized edges of an archetype graph.
//!
//! ## Architecture Rules
//!
//! 1. **No unsafe code** - byte layout goes through `bytemuck`
//! 2. **All-or-nothing mutations** - a failed migration leaves the old state
//! 3. **No global state** - a [`Registry`] is an explicitly owned value
//!
//! ## Example
//!
//! ```rust,ignore
//! use secs_core::{impl_component, Registry};
//!
//! #[derive(Clone, Copy, Pod, Zeroable, Serialize)]
//! #[repr(C)]
//! struct Position { x: f32, y: f32 }
//! impl_component!(Inline: Position);
//!
//! let mut registry = Registry::new();
//! let e = registry.create_entity();
//! registry.add_component(e, Position { x: 0.0, y: 0.0 })?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;
pub mod sync;

pub use config::{PoolConfig, RegistryConfig, RemovalPolicy};
pub use ecs::{
    component_name, Archetype, ArchetypeDump, ArchetypeGraph, ArchetypeId, ArchetypeSignature,
    Boxed, CachedQuery, Component, ComponentType, EntityHandle, EntityId, Inline, Registry,
    Storage, StorageKind,
};
pub use error::{EcsError, EcsResult};
pub use memory::{ComponentPool, HandleTable};
pub use sync::SharedRegistry;
