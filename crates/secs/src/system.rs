//! # Systems
//!
//! A system is a bundle of lifecycle hooks the [`Game`](crate::Game) calls in
//! registration order. Every hook receives the registry explicitly; there is
//! no global world to reach for.
//!
//! ```text
//! start ─► ( physics_update(dt) ─► update ─► late_update ─► render )* ─► dispose
//! ```

use std::fmt;

use secs_core::Registry;

/// Lifecycle hooks. Every hook defaults to a no-op, so a system implements
/// only what it needs.
pub trait System: Send + 'static {
    /// Called once before the first frame.
    fn start(&mut self, _registry: &mut Registry) {}

    /// Fixed-step simulation, `dt` in seconds.
    fn physics_update(&mut self, _registry: &mut Registry, _dt: f32) {}

    /// Per-frame logic.
    fn update(&mut self, _registry: &mut Registry) {}

    /// Runs after every system's `update`.
    fn late_update(&mut self, _registry: &mut Registry) {}

    /// Read-only pass over the frame's final state.
    fn render(&mut self, _registry: &Registry) {}

    /// Called once on shutdown, before the registry is cleared.
    fn dispose(&mut self, _registry: &mut Registry) {}

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

type MutHook = Box<dyn FnMut(&mut Registry) + Send>;
type PhysicsHook = Box<dyn FnMut(&mut Registry, f32) + Send>;
type RenderHook = Box<dyn FnMut(&Registry) + Send>;

/// A system assembled from closures. Unset hooks do nothing.
///
/// ```rust,ignore
/// let counter = AnonymousSystem::new()
///     .on_update(|registry| { registry.create_entity(); })
///     .on_dispose(|_| tracing::info!("bye"));
/// game.add_system(counter);
/// ```
#[derive(Default)]
pub struct AnonymousSystem {
    on_start: Option<MutHook>,
    on_physics_update: Option<PhysicsHook>,
    on_update: Option<MutHook>,
    on_late_update: Option<MutHook>,
    on_render: Option<RenderHook>,
    on_dispose: Option<MutHook>,
}

impl AnonymousSystem {
    /// Creates a system with no hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `start` hook.
    #[must_use]
    pub fn on_start(mut self, hook: impl FnMut(&mut Registry) + Send + 'static) -> Self {
        self.on_start = Some(Box::new(hook));
        self
    }

    /// Sets the `physics_update` hook.
    #[must_use]
    pub fn on_physics_update(
        mut self,
        hook: impl FnMut(&mut Registry, f32) + Send + 'static,
    ) -> Self {
        self.on_physics_update = Some(Box::new(hook));
        self
    }

    /// Sets the `update` hook.
    #[must_use]
    pub fn on_update(mut self, hook: impl FnMut(&mut Registry) + Send + 'static) -> Self {
        self.on_update = Some(Box::new(hook));
        self
    }

    /// Sets the `late_update` hook.
    #[must_use]
    pub fn on_late_update(mut self, hook: impl FnMut(&mut Registry) + Send + 'static) -> Self {
        self.on_late_update = Some(Box::new(hook));
        self
    }

    /// Sets the `render` hook.
    #[must_use]
    pub fn on_render(mut self, hook: impl FnMut(&Registry) + Send + 'static) -> Self {
        self.on_render = Some(Box::new(hook));
        self
    }

    /// Sets the `dispose` hook.
    #[must_use]
    pub fn on_dispose(mut self, hook: impl FnMut(&mut Registry) + Send + 'static) -> Self {
        self.on_dispose = Some(Box::new(hook));
        self
    }
}

impl System for AnonymousSystem {
    fn start(&mut self, registry: &mut Registry) {
        if let Some(hook) = &mut self.on_start {
            hook(registry);
        }
    }

    fn physics_update(&mut self, registry: &mut Registry, dt: f32) {
        if let Some(hook) = &mut self.on_physics_update {
            hook(registry, dt);
        }
    }

    fn update(&mut self, registry: &mut Registry) {
        if let Some(hook) = &mut self.on_update {
            hook(registry);
        }
    }

    fn late_update(&mut self, registry: &mut Registry) {
        if let Some(hook) = &mut self.on_late_update {
            hook(registry);
        }
    }

    fn render(&mut self, registry: &Registry) {
        if let Some(hook) = &mut self.on_render {
            hook(registry);
        }
    }

    fn dispose(&mut self, registry: &mut Registry) {
        if let Some(hook) = &mut self.on_dispose {
            hook(registry);
        }
    }
}

impl fmt::Debug for AnonymousSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnonymousSystem")
            .field("on_start", &self.on_start.is_some())
            .field("on_physics_update", &self.on_physics_update.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_late_update", &self.on_late_update.is_some())
            .field("on_render", &self.on_render.is_some())
            .field("on_dispose", &self.on_dispose.is_some())
            .finish()
    }
}
