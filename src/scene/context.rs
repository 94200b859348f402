//! What a vignette hook can reach.

use glam::Vec3;
use hecs::Entity;
use rand_pcg::Pcg64Mcg;

use crate::config::AppConfig;
use crate::controls::{ControlId, ControlKind, ControlPanel};
use crate::pair::{Measurement, PairHandle};
use crate::pool::{Spawn, TimedPool};
use crate::render::{Color, Shape};
use crate::schedule::TimerId;
use crate::state::Trigger;
use crate::transform::Transform;
use crate::tween::{TweenId, TweenTarget};

use super::controller::SceneCore;
use super::scene::{Generation, Vignette};
use super::transition::Easing;

/// Handle passed to every [`Vignette`] hook.
///
/// All spawning, retiring, scheduling and control registration goes through
/// here, so everything a vignette creates is owned by its scene and torn
/// down with it.
pub struct SceneCtx<'a, V: Vignette> {
    pub(super) core: &'a mut SceneCore<V>,
    pub(super) controls: &'a mut ControlPanel,
    pub(super) config: &'a AppConfig,
    pub(super) trigger: Trigger,
}

impl<'a, V: Vignette> SceneCtx<'a, V> {
    pub(super) fn new(
        core: &'a mut SceneCore<V>,
        controls: &'a mut ControlPanel,
        config: &'a AppConfig,
        trigger: Trigger,
    ) -> Self {
        Self {
            core,
            controls,
            config,
            trigger,
        }
    }

    /// Scene time in seconds.
    pub fn now(&self) -> f32 {
        self.core.clock.now()
    }

    pub fn generation(&self) -> Generation {
        self.core.generation
    }

    pub fn config(&self) -> &AppConfig {
        self.config
    }

    pub fn state(&self) -> V::State {
        self.core.machine.current()
    }

    /// Seconds spent in the current state.
    pub fn time_in_state(&self) -> f32 {
        self.core.machine.elapsed(self.now())
    }

    /// Ask for a state change. It is applied after the current hook
    /// returns; a request for the current state does nothing.
    pub fn request(&mut self, state: V::State) {
        self.core.requests.push_back((state, self.trigger));
    }

    /// The scene's seeded random source.
    pub fn rng(&mut self) -> &mut Pcg64Mcg {
        &mut self.core.rng
    }

    pub fn spawn(&mut self, origin: Vec3, spawn: Spawn, lifespan: Option<f32>) -> Option<Entity> {
        let now = self.now();
        self.core.pool.spawn(now, origin, spawn, lifespan)
    }

    pub fn spawn_pair(
        &mut self,
        center: Vec3,
        offset: Vec3,
        spawn: Spawn,
        lifespan: Option<f32>,
        connector: Option<Color>,
    ) -> Option<PairHandle> {
        let now = self.now();
        self.core
            .pool
            .spawn_pair(now, center, offset, spawn, lifespan, connector)
    }

    pub fn add_static(&mut self, tag: &'static str, shape: Shape, color: Color, transform: Transform) -> Entity {
        self.core.pool.add_static(tag, shape, color, transform)
    }

    pub fn retire(&mut self, entity: Entity) -> bool {
        self.core.tweens.cancel_entity(entity);
        self.core.pool.retire(entity)
    }

    pub fn retire_all(&mut self) -> usize {
        self.core.pool.retire_all()
    }

    pub fn retire_tagged(&mut self, tag: &str) -> usize {
        self.core.pool.retire_tagged(tag)
    }

    pub fn count_tagged(&self, tag: &str) -> usize {
        self.core.pool.count_tagged(tag)
    }

    /// Resolve a pair member, fixing its partner's outcome in the same call.
    pub fn measure(&mut self, entity: Entity) -> Option<Measurement> {
        let core = &mut *self.core;
        core.pool.measure(entity, &mut core.rng)
    }

    pub fn set_cap(&mut self, cap: Option<usize>) {
        self.core.pool.set_cap(cap);
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.core.pool.graph().transform(entity)
    }

    pub fn set_transform(&mut self, entity: Entity, transform: Transform) -> bool {
        self.core.pool.graph_mut().set_transform(entity, transform)
    }

    pub fn set_color(&mut self, entity: Entity, color: Color) -> bool {
        self.core.pool.graph_mut().set_color(entity, color)
    }

    pub fn set_visible(&mut self, entity: Entity, visible: bool) -> bool {
        self.core.pool.graph_mut().set_visible(entity, visible)
    }

    /// Tween a node property. `on_complete` comes back through
    /// [`Vignette::on_message`] on the frame after the tween finishes,
    /// unless the scene is disposed first.
    pub fn animate_to(
        &mut self,
        entity: Entity,
        target: TweenTarget,
        duration: f32,
        easing: Easing,
        on_complete: Option<V::Message>,
    ) -> Option<TweenId> {
        let core = &mut *self.core;
        core.tweens.animate_to(
            core.pool.graph().world(),
            entity,
            target,
            duration,
            easing,
            on_complete,
        )
    }

    pub fn cancel_tween(&mut self, id: TweenId) -> bool {
        self.core.tweens.cancel(id)
    }

    /// Deliver `message` to [`Vignette::on_message`] after `delay` seconds of
    /// scene time.
    pub fn after(&mut self, delay: f32, message: V::Message) -> TimerId {
        let now = self.now();
        self.core.scheduler.after(now, delay, message)
    }

    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        self.core.scheduler.cancel(id)
    }

    /// Register a widget bound to `action`. The scene unregisters it on
    /// dispose.
    pub fn register_control(&mut self, kind: ControlKind, action: V::Action) -> ControlId {
        let core = &mut *self.core;
        let token = self
            .controls
            .register(core.generation, kind, core.pool.graph_mut().ledger_mut());
        let id = token.id();
        core.bindings.push((token, action));
        id
    }

    pub fn pool(&self) -> &TimedPool {
        &self.core.pool
    }

    pub fn pool_mut(&mut self) -> &mut TimedPool {
        &mut self.core.pool
    }
}
