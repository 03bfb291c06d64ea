//! # SECS
//!
//! Systems and a game loop over the [`secs_core`] archetype storage engine.
//!
//! A [`Game`] owns one [`Registry`] and hands it to every [`System`] hook in
//! registration order. The storage engine is re-exported, so a game needs
//! only this crate.
//!
//! ## Example
//!
//! ```rust,ignore
//! use secs::{AnonymousSystem, Game};
//!
//! let mut game = Game::new();
//! game.add_system(AnonymousSystem::new().on_update(|registry| {
//!     registry.create_entity();
//! }));
//! game.start();
//! let stats = game.tick(1.0 / 60.0);
//! game.dispose();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod collections;
pub mod error;
pub mod game;
pub mod system;

pub use collections::{TypeKeyedMap, TypeLookup};
pub use error::{GameError, GameResult};
pub use game::{FrameStats, Game, GameConfig};
pub use system::{AnonymousSystem, System};

pub use secs_core::*;
