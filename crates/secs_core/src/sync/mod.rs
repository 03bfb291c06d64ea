//! # Shared Registry
//!
//! [`Registry`] is single-threaded. To share one across threads, wrap it in a
//! [`SharedRegistry`]: a cloneable handle around one `parking_lot::RwLock`.
//!
//! ```text
//! create / destroy / add / remove  --> write lock (exclusive)
//! get / has / iterate              --> read lock  (shared)
//! ```
//!
//! A reader holds its guard for the whole iteration, so no structural change
//! (and no pool reallocation) can interleave with it.

mod shared;

pub use shared::SharedRegistry;
