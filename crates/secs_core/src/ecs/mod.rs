//! # Entity Component System
//!
//! Archetype-based storage: entities with the same component-type set share
//! one [`Archetype`], whose pools keep each component type densely packed.
//!
//! ## Design Philosophy
//!
//! - One archetype per exact type-set, found through a memoized graph
//! - Migration is copy-then-delete, never the reverse
//! - Every pool of an archetype holds exactly one element per entity
//! - No global state: the [`Registry`] is an owned value

pub mod archetype;
mod component;
mod entity;
pub mod export;
pub mod graph;
mod query;
mod registry;

pub use archetype::{Archetype, ArchetypeId, ArchetypeSignature};
pub use component::{
    Boxed, Component, ComponentType, Inline, Storage, StorageKind, HANDLE_STRIDE,
    MAX_INLINE_ALIGN,
};
pub use entity::{EntityAllocator, EntityId};
pub use export::{ArchetypeDump, SlotDump};
pub use graph::{ArchetypeGraph, DepthFirst, Direction, Edge};
pub use query::{CachedQuery, EntityHandle};
pub use registry::{component_name, Registry};
