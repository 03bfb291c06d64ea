//! # Storage Error Types
//!
//! All errors that can occur in the storage engine.
//!
//! Destructive operations on absent entities (destroy, remove) are no-ops and
//! never produce an error. Reads that must return a value report `NotFound`
//! style variants instead of handing out uninitialized memory.

use thiserror::Error;

use crate::ecs::{ArchetypeId, EntityId};

/// Errors that can occur in the storage engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The entity does not exist (never created, or already destroyed).
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The entity exists but does not carry the requested component.
    #[error("entity {entity} has no component {component}")]
    ComponentNotFound {
        /// The entity that was queried.
        entity: EntityId,
        /// Name of the missing component type.
        component: &'static str,
    },

    /// No archetype with this id exists in the graph.
    #[error("archetype not found: {0}")]
    ArchetypeNotFound(ArchetypeId),

    /// Element index outside `[0, len)`.
    #[error("index {index} out of bounds for pool of {len} elements")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// Number of stored elements.
        len: usize,
    },

    /// The entity already carries this component type.
    #[error("entity {entity} already has component {component}")]
    DuplicateComponent {
        /// The entity that was targeted.
        entity: EntityId,
        /// Name of the component type.
        component: &'static str,
    },

    /// The archetype's signature does not include this component type.
    #[error("archetype {archetype} does not store component {component}")]
    TypeNotInArchetype {
        /// The archetype that was targeted.
        archetype: ArchetypeId,
        /// Name of the component type.
        component: &'static str,
    },

    /// A pool was accessed with a type other than the one it was created for.
    #[error("type mismatch: pool holds {expected}, accessed as {found}")]
    TypeMismatch {
        /// The pool's declared component type.
        expected: &'static str,
        /// The type the caller used.
        found: &'static str,
    },

    /// The component's memory layout cannot be stored in a pool.
    #[error("unsupported layout for component {component}: align {align} exceeds {max_align}")]
    UnsupportedLayout {
        /// Name of the component type.
        component: &'static str,
        /// The type's alignment.
        align: usize,
        /// Largest alignment a pool can honour.
        max_align: usize,
    },

    /// An outgoing edge with this label already leads somewhere else.
    #[error("edge conflict: {from} --{label}--> already leads to {existing}, not {requested}")]
    EdgeConflict {
        /// Source archetype.
        from: ArchetypeId,
        /// Edge label (component type name).
        label: &'static str,
        /// Destination already recorded.
        existing: ArchetypeId,
        /// Destination that was requested.
        requested: ArchetypeId,
    },

    /// The destination's type-set is not the source's type-set plus the label.
    #[error("invalid edge: {to} is not {from} plus {label}")]
    InvalidEdge {
        /// Source archetype.
        from: ArchetypeId,
        /// Edge label (component type name).
        label: &'static str,
        /// Destination archetype.
        to: ArchetypeId,
    },

    /// Growing a pool's backing buffer failed. The pool is left unchanged.
    #[error("allocation of {bytes} bytes failed for component {component}")]
    AllocationFailed {
        /// Name of the component type.
        component: &'static str,
        /// Requested byte capacity.
        bytes: usize,
    },

    /// Invalid configuration value or file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Debug export failed to serialize a value.
    #[error("export failed: {0}")]
    Export(String),
}

impl From<serde_json::Error> for EcsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Export(err.to_string())
    }
}

impl From<toml::de::Error> for EcsError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Result type for storage operations.
pub type EcsResult<T> = Result<T, EcsError>;
