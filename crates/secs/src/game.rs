//! # Game
//!
//! Owns one [`Registry`] and an ordered list of systems, and drives the
//! lifecycle hooks across them.
//!
//! ```text
//! Frame N (tick):
//! ┌───────────────────────────────────────────────┐
//! │ 1. physics_update(dt)  every system, in order │
//! │ 2. update              every system, in order │
//! │ 3. late_update         every system, in order │
//! │ 4. render              every system, in order │
//! │ 5. budget check        warn! when over budget │
//! └───────────────────────────────────────────────┘
//! ```

use std::any::TypeId;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use secs_core::{Registry, RegistryConfig};

use crate::error::{GameError, GameResult};
use crate::system::System;

/// Frame budget for 60 FPS, in milliseconds.
pub const DEFAULT_FRAME_BUDGET_MS: f64 = 16.666;

/// Configuration for a [`Game`].
///
/// ```toml
/// frame_budget_ms = 8.333
///
/// [registry]
/// removal = "shift_down"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// A tick slower than this logs a warning.
    pub frame_budget_ms: f64,
    /// Settings for the owned registry.
    pub registry: RegistryConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            frame_budget_ms: DEFAULT_FRAME_BUDGET_MS,
            registry: RegistryConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] on malformed TOML or a bad budget,
    /// [`GameError::Registry`] if the registry section is invalid.
    pub fn from_toml_str(source: &str) -> GameResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// As [`GameConfig::from_toml_str`], or [`GameError::InvalidConfig`] if
    /// the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> GameResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| GameError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// See [`GameConfig::from_toml_str`].
    pub fn validate(&self) -> GameResult<()> {
        if !self.frame_budget_ms.is_finite() || self.frame_budget_ms <= 0.0 {
            return Err(GameError::InvalidConfig(format!(
                "frame_budget_ms must be positive, got {}",
                self.frame_budget_ms
            )));
        }
        self.registry.validate()?;
        Ok(())
    }

    /// The budget as a duration.
    #[must_use]
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(self.frame_budget_ms / 1000.0)
    }
}

/// Timing of one [`Game::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 0.
    pub frame: u64,
    /// Physics phase time in microseconds.
    pub physics_us: u64,
    /// Update phase time in microseconds.
    pub update_us: u64,
    /// Late update phase time in microseconds.
    pub late_update_us: u64,
    /// Render phase time in microseconds.
    pub render_us: u64,
    /// Whole frame in microseconds.
    pub total_us: u64,
    /// The frame took longer than the configured budget.
    pub over_budget: bool,
}

fn micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

/// The system dispatcher.
pub struct Game {
    registry: Registry,
    systems: Vec<(TypeId, Box<dyn System>)>,
    config: GameConfig,
    frame: u64,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// Creates a game with the default configuration and an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            systems: Vec::new(),
            config: GameConfig::default(),
            frame: 0,
        }
    }

    /// Creates a game from a validated configuration.
    ///
    /// # Errors
    ///
    /// See [`GameConfig::validate`].
    pub fn with_config(config: GameConfig) -> GameResult<Self> {
        config.validate()?;
        Ok(Self {
            registry: Registry::with_config(config.registry)?,
            systems: Vec::new(),
            config,
            frame: 0,
        })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The owned registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable access to the owned registry, for setup outside of systems.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Frames completed by [`Game::tick`].
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Number of registered systems.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if a system of type `S` is registered.
    #[must_use]
    pub fn has_system<S: System>(&self) -> bool {
        let id = TypeId::of::<S>();
        self.systems.iter().any(|(ty, _)| *ty == id)
    }

    /// Appends a system. Systems run in registration order.
    pub fn add_system<S: System>(&mut self, system: S) {
        debug!(system = system.name(), "system added");
        self.systems.push((TypeId::of::<S>(), Box::new(system)));
    }

    /// Appends a default-constructed `S`.
    pub fn add_default_system<S: System + Default>(&mut self) {
        self.add_system(S::default());
    }

    /// Removes the first registered system of type `S`.
    ///
    /// # Errors
    ///
    /// [`GameError::SystemNotFound`] if none is registered.
    pub fn remove_system<S: System>(&mut self) -> GameResult<()> {
        let id = TypeId::of::<S>();
        let index = self
            .systems
            .iter()
            .position(|(ty, _)| *ty == id)
            .ok_or(GameError::SystemNotFound(std::any::type_name::<S>()))?;
        let (_, system) = self.systems.remove(index);
        debug!(system = system.name(), "system removed");
        Ok(())
    }

    /// Drops every system without calling `dispose`.
    pub fn clear_systems(&mut self) {
        self.systems.clear();
    }

    /// Runs every system's `start` hook.
    pub fn start(&mut self) {
        for (_, system) in &mut self.systems {
            system.start(&mut self.registry);
        }
    }

    /// Runs every system's `physics_update` hook.
    pub fn physics_update(&mut self, dt: f32) {
        for (_, system) in &mut self.systems {
            system.physics_update(&mut self.registry, dt);
        }
    }

    /// Runs every system's `update` hook.
    pub fn update(&mut self) {
        for (_, system) in &mut self.systems {
            system.update(&mut self.registry);
        }
    }

    /// Runs every system's `late_update` hook.
    pub fn late_update(&mut self) {
        for (_, system) in &mut self.systems {
            system.late_update(&mut self.registry);
        }
    }

    /// Runs every system's `render` hook.
    pub fn render(&mut self) {
        for (_, system) in &mut self.systems {
            system.render(&self.registry);
        }
    }

    /// Runs one frame and reports its timing.
    pub fn tick(&mut self, dt: f32) -> FrameStats {
        let frame_start = Instant::now();

        let phase = Instant::now();
        self.physics_update(dt);
        let physics_us = micros(phase.elapsed());

        let phase = Instant::now();
        self.update();
        let update_us = micros(phase.elapsed());

        let phase = Instant::now();
        self.late_update();
        let late_update_us = micros(phase.elapsed());

        let phase = Instant::now();
        self.render();
        let render_us = micros(phase.elapsed());

        let elapsed = frame_start.elapsed();
        let over_budget = elapsed > self.config.frame_budget();
        if over_budget {
            warn!(
                frame = self.frame,
                elapsed_us = micros(elapsed),
                budget_ms = self.config.frame_budget_ms,
                "frame over budget"
            );
        }

        let stats = FrameStats {
            frame: self.frame,
            physics_us,
            update_us,
            late_update_us,
            render_us,
            total_us: micros(elapsed),
            over_budget,
        };
        self.frame += 1;
        stats
    }

    /// Runs every system's `dispose` hook in order, then clears the registry
    /// and releases its memory. Systems stay registered.
    pub fn dispose(&mut self) {
        for (_, system) in &mut self.systems {
            system.dispose(&mut self.registry);
        }
        self.registry.clear();
        debug!(systems = self.systems.len(), "game disposed");
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.systems.iter().map(|(_, s)| s.name()).collect();
        f.debug_struct("Game")
            .field("systems", &names)
            .field("frame", &self.frame)
            .field("entities", &self.registry.entity_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::AnonymousSystem;
    use std::sync::Arc;

    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(tag: &'static str, log: &Log) -> AnonymousSystem {
        let (a, b, c, d, e, f) = (
            Arc::clone(log),
            Arc::clone(log),
            Arc::clone(log),
            Arc::clone(log),
            Arc::clone(log),
            Arc::clone(log),
        );
        AnonymousSystem::new()
            .on_start(move |_| a.lock().push(format!("{tag}:start")))
            .on_physics_update(move |_, _| b.lock().push(format!("{tag}:physics")))
            .on_update(move |_| c.lock().push(format!("{tag}:update")))
            .on_late_update(move |_| d.lock().push(format!("{tag}:late")))
            .on_render(move |_| e.lock().push(format!("{tag}:render")))
            .on_dispose(move |_| f.lock().push(format!("{tag}:dispose")))
    }

    #[derive(Default)]
    struct Spawner {
        spawned: u32,
    }

    impl System for Spawner {
        fn update(&mut self, registry: &mut Registry) {
            let e = registry.create_entity();
            registry.add_component(e, self.spawned).unwrap();
            self.spawned += 1;
        }
    }

    #[test]
    fn test_hooks_run_in_phase_then_registration_order() {
        let log = Log::default();
        let mut game = Game::new();
        game.add_system(recorder("a", &log));
        game.add_system(recorder("b", &log));

        game.start();
        game.tick(0.016);
        game.dispose();

        assert_eq!(
            *log.lock(),
            [
                "a:start", "b:start", "a:physics", "b:physics", "a:update", "b:update",
                "a:late", "b:late", "a:render", "b:render", "a:dispose", "b:dispose",
            ]
        );
    }

    #[test]
    fn test_tick_counts_frames() {
        let mut game = Game::new();
        game.add_default_system::<Spawner>();

        let first = game.tick(0.016);
        let second = game.tick(0.016);

        assert_eq!(first.frame, 0);
        assert_eq!(second.frame, 1);
        assert_eq!(game.frame(), 2);
        assert_eq!(game.registry().iter::<u32>().count(), 2);
        assert!(second.total_us >= second.update_us);
    }

    #[test]
    fn test_remove_system_takes_first_of_type() {
        let mut game = Game::new();
        game.add_default_system::<Spawner>();
        game.add_system(AnonymousSystem::new());
        game.add_default_system::<Spawner>();
        assert_eq!(game.system_count(), 3);

        game.remove_system::<Spawner>().unwrap();
        assert_eq!(game.system_count(), 2);
        assert!(game.has_system::<Spawner>());

        game.remove_system::<Spawner>().unwrap();
        assert!(!game.has_system::<Spawner>());
        assert!(matches!(
            game.remove_system::<Spawner>(),
            Err(GameError::SystemNotFound(_))
        ));
        assert!(game.has_system::<AnonymousSystem>());
    }

    #[test]
    fn test_clear_systems() {
        let mut game = Game::new();
        game.add_default_system::<Spawner>();
        game.clear_systems();
        game.tick(0.016);

        assert_eq!(game.system_count(), 0);
        assert_eq!(game.registry().entity_count(), 0);
    }

    #[test]
    fn test_dispose_clears_registry_after_hooks() {
        let seen = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&seen);

        let mut game = Game::new();
        game.add_default_system::<Spawner>();
        game.add_system(AnonymousSystem::new().on_dispose(move |r| *sink.lock() = r.entity_count()));
        game.tick(0.016);
        game.tick(0.016);
        game.dispose();

        assert_eq!(*seen.lock(), 2);
        assert_eq!(game.registry().entity_count(), 0);
        assert_eq!(game.system_count(), 2);
    }

    #[test]
    fn test_over_budget_frame_is_flagged() {
        let config = GameConfig {
            frame_budget_ms: 0.001,
            ..GameConfig::default()
        };
        let mut game = Game::with_config(config).unwrap();
        game.add_system(
            AnonymousSystem::new().on_update(|_| std::thread::sleep(Duration::from_millis(2))),
        );

        assert!(game.tick(0.016).over_budget);
    }

    #[test]
    fn test_config_from_toml() {
        let config = GameConfig::from_toml_str(
            r#"
            frame_budget_ms = 8.0

            [registry]
            removal = "shift_down"
            "#,
        )
        .unwrap();

        assert!((config.frame_budget_ms - 8.0).abs() < f64::EPSILON);
        assert_eq!(config.registry.removal, secs_core::RemovalPolicy::ShiftDown);
        assert!((config.frame_budget().as_secs_f64() - 0.008).abs() < 1e-9);
        assert_eq!(GameConfig::from_toml_str("").unwrap(), GameConfig::default());
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(matches!(
            GameConfig::from_toml_str("frame_budget_ms = 0.0"),
            Err(GameError::InvalidConfig(_))
        ));
        assert!(matches!(
            GameConfig::from_toml_str("[registry]\ngraph_capacity = 0"),
            Err(GameError::Registry(_))
        ));
        assert!(matches!(
            GameConfig::from_toml_str("frame_budget_ms = \"fast\""),
            Err(GameError::InvalidConfig(_))
        ));
    }
}
