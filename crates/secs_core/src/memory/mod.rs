//! # Memory Management
//!
//! Byte-level storage behind archetypes:
//! - [`ComponentPool`]: packed, type-erased storage for one component type
//! - [`HandleTable`]: out-of-line values referenced from boxed pools

pub mod handles;
pub mod pool;

pub use handles::{BoxedValue, Handle, HandleTable};
pub use pool::ComponentPool;
