//! Turns a [`Vignette`] into a [`Scene`] and enforces the lifecycle.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use crate::app::AppContext;
use crate::clock::{SceneClock, Tick};
use crate::config::AppConfig;
use crate::controls::{ControlId, ControlPanel, ControlToken, ControlValue};
use crate::error::VignetteResult;
use crate::pool::TimedPool;
use crate::render::InstanceRaw;
use crate::schedule::Scheduler;
use crate::state::{StateMachine, Trigger};
use crate::tween::Tweens;

use super::context::SceneCtx;
use super::scene::{DisposeReport, Generation, Scene, SceneId, SceneStats, Vignette};

/// State changes applied per settle before the rest are dropped. Catches
/// vignettes whose transition hooks keep requesting each other.
const MAX_SETTLE_STEPS: usize = 32;

/// Where a controller is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Active,
    Disposed,
}

/// Everything one initialised scene instance owns. Dropped as a unit on
/// dispose, which is what makes late completions unreachable.
pub(crate) struct SceneCore<V: Vignette> {
    pub(super) generation: Generation,
    pub(super) clock: SceneClock,
    pub(super) machine: StateMachine<V::State>,
    pub(super) pool: TimedPool,
    pub(super) tweens: Tweens<V::Message>,
    pub(super) scheduler: Scheduler<V::Message>,
    pub(super) bindings: Vec<(ControlToken, V::Action)>,
    pub(super) queued: VecDeque<(ControlId, ControlValue)>,
    pub(super) requests: VecDeque<(V::State, Trigger)>,
    pub(super) completions: Vec<V::Message>,
    pub(super) rng: Pcg64Mcg,
    pub(super) last_tick: Option<Tick>,
}

impl<V: Vignette> SceneCore<V> {
    fn new(generation: Generation, config: &AppConfig, initial: V::State) -> Self {
        let seed = config.seed.wrapping_add(u64::from(generation.get()));
        Self {
            generation,
            clock: SceneClock::new(config.max_dt),
            machine: StateMachine::new(initial),
            pool: TimedPool::new(generation),
            tweens: Tweens::new(),
            scheduler: Scheduler::new(generation),
            bindings: Vec::new(),
            queued: VecDeque::new(),
            requests: VecDeque::new(),
            completions: Vec::new(),
            rng: Pcg64Mcg::seed_from_u64(seed),
            last_tick: None,
        }
    }

    fn action_for(&self, id: ControlId) -> Option<V::Action> {
        self.bindings
            .iter()
            .find(|(token, _)| token.id() == id)
            .map(|(_, action)| *action)
    }

    /// Cancel, unregister and release everything. Safe to call on a
    /// partially built core.
    fn teardown(&mut self, controls: &mut ControlPanel) -> DisposeReport {
        let timers_cancelled = self.scheduler.cancel_all();
        let tweens_cancelled = self.tweens.cancel_all() + self.completions.len();
        self.completions.clear();
        self.queued.clear();
        self.requests.clear();

        let ledger = self.pool.graph_mut().ledger_mut();
        let mut listeners_released = 0;
        for (token, _) in self.bindings.drain(..) {
            if controls.unregister(token, ledger) {
                listeners_released += 1;
            }
        }

        let nodes_removed = self.pool.clear();
        let leftover = self.pool.graph_mut().ledger_mut().release_all();
        if leftover > 0 {
            tracing::warn!(leftover, "resources outlived their nodes");
        }

        let ledger = self.pool.graph().ledger();
        DisposeReport {
            performed: true,
            timers_cancelled,
            tweens_cancelled,
            listeners_released,
            nodes_removed,
            allocated: ledger.allocated(),
            released: ledger.released(),
        }
    }
}

/// Lifecycle controller for one vignette.
///
/// `init` builds a fresh [`SceneCore`] under a new generation, `update`
/// drives it, and `dispose` tears it down and drops it. After dispose the
/// controller is inert: updates, control events and a second dispose do
/// nothing.
pub struct SceneController<V: Vignette> {
    id: SceneId,
    vignette: V,
    lifecycle: Lifecycle,
    core: Option<SceneCore<V>>,
}

impl<V: Vignette> SceneController<V> {
    pub fn new(id: impl Into<SceneId>, vignette: V) -> Self {
        Self {
            id: id.into(),
            vignette,
            lifecycle: Lifecycle::Created,
            core: None,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn vignette(&self) -> &V {
        &self.vignette
    }

    /// Current state, `None` unless active.
    pub fn state(&self) -> Option<V::State> {
        self.core.as_ref().map(|c| c.machine.current())
    }

    pub fn now(&self) -> Option<f32> {
        self.core.as_ref().map(|c| c.clock.now())
    }

    /// The live pool, for inspection.
    pub fn pool(&self) -> Option<&TimedPool> {
        self.core.as_ref().map(|c| &c.pool)
    }

    /// Run `f` against the live scene as if it were a hook, then apply any
    /// state changes it requested. Returns `None` when the scene is not
    /// active.
    pub fn with_ctx<R>(
        &mut self,
        app: &mut AppContext,
        f: impl FnOnce(&mut V, &mut SceneCtx<'_, V>) -> R,
    ) -> Option<R> {
        let core = self.core.as_mut()?;
        let result = {
            let mut ctx = SceneCtx::new(core, &mut app.controls, &app.config, Trigger::Internal);
            f(&mut self.vignette, &mut ctx)
        };
        settle(&mut self.vignette, core, &mut app.controls, &app.config);
        app.forward(core.pool.graph_mut().ledger_mut());
        Some(result)
    }
}

/// Apply queued state requests and elapsed phases until none are left.
fn settle<V: Vignette>(
    vignette: &mut V,
    core: &mut SceneCore<V>,
    controls: &mut ControlPanel,
    config: &AppConfig,
) {
    for _ in 0..MAX_SETTLE_STEPS {
        let now = core.clock.now();
        let change = match core.requests.pop_front() {
            Some((target, trigger)) => match core.machine.request(target, now, trigger) {
                Some(change) => change,
                None => continue,
            },
            None => match core.machine.poll(now) {
                Some(change) => change,
                None => return,
            },
        };
        tracing::debug!(
            generation = %core.generation,
            from = ?change.from,
            to = ?change.to,
            trigger = ?change.trigger,
            "state changed"
        );
        let mut ctx = SceneCtx::new(core, controls, config, Trigger::Internal);
        vignette.on_transition(&mut ctx, &change);
    }
    if !core.requests.is_empty() {
        tracing::warn!(
            dropped = core.requests.len(),
            "state changes kept requesting each other; dropping the rest"
        );
        core.requests.clear();
    }
}

impl<V: Vignette> Scene for SceneController<V> {
    fn id(&self) -> &SceneId {
        &self.id
    }

    fn generation(&self) -> Option<Generation> {
        self.core.as_ref().map(|c| c.generation)
    }

    #[tracing::instrument(skip_all, fields(scene = %self.id))]
    fn init(&mut self, app: &mut AppContext) -> VignetteResult<()> {
        if self.lifecycle == Lifecycle::Active {
            tracing::warn!("init on an active scene ignored");
            return Ok(());
        }
        app.surface.attach(&self.id)?;

        let generation = app.next_generation();
        let mut core = SceneCore::new(generation, &app.config, self.vignette.initial_state());

        let built = {
            let mut ctx = SceneCtx::new(&mut core, &mut app.controls, &app.config, Trigger::Internal);
            let cycle = self.vignette.phase_cycle(&ctx);
            ctx.core.machine.set_cycle(cycle);
            self.vignette.init(&mut ctx)
        };
        if let Err(err) = built {
            let report = core.teardown(&mut app.controls);
            self.vignette.on_dispose();
            app.forward(core.pool.graph_mut().ledger_mut());
            app.surface.detach(&self.id);
            tracing::info!(%generation, %err, balanced = report.is_balanced(), "scene init failed");
            return Err(err);
        }

        settle(&mut self.vignette, &mut core, &mut app.controls, &app.config);
        app.forward(core.pool.graph_mut().ledger_mut());

        tracing::info!(
            %generation,
            nodes = core.pool.graph().len(),
            controls = core.bindings.len(),
            "scene initialised"
        );
        self.core = Some(core);
        self.lifecycle = Lifecycle::Active;
        Ok(())
    }

    fn update(&mut self, app: &mut AppContext, dt: f32) {
        let Some(core) = self.core.as_mut() else {
            return;
        };
        let vignette = &mut self.vignette;
        let controls = &mut app.controls;
        let config = &app.config;

        let tick = core.clock.advance(dt);
        core.pool.begin_frame();

        // Transitions: controls, elapsed phases, deferred messages.
        while let Some((id, value)) = core.queued.pop_front() {
            let Some(action) = core.action_for(id) else {
                tracing::trace!(?id, "event for an unbound control dropped");
                continue;
            };
            let mut ctx = SceneCtx::new(core, controls, config, Trigger::Control);
            vignette.on_action(&mut ctx, action, value);
            settle(vignette, core, controls, config);
        }
        settle(vignette, core, controls, config);

        let mut messages = std::mem::take(&mut core.completions);
        messages.extend(core.scheduler.due(tick.time, Some(core.generation)));
        for message in messages {
            let mut ctx = SceneCtx::new(core, controls, config, Trigger::Deferred);
            vignette.on_message(&mut ctx, message);
            settle(vignette, core, controls, config);
        }

        // Expiry.
        let expired = core.pool.tick(tick.dt);
        if !expired.is_empty() {
            let mut ctx = SceneCtx::new(core, controls, config, Trigger::Internal);
            vignette.on_expired(&mut ctx, &expired);
            settle(vignette, core, controls, config);
        }

        // Continuous motion.
        let finished = core.tweens.advance(core.pool.graph_mut().world_mut(), tick.dt);
        core.completions.extend(finished);
        core.pool.integrate(tick.dt);
        {
            let mut ctx = SceneCtx::new(core, controls, config, Trigger::Internal);
            vignette.advance(&mut ctx, tick);
        }
        settle(vignette, core, controls, config);
        core.pool.sync_connectors();

        core.last_tick = Some(tick);
        app.forward(core.pool.graph_mut().ledger_mut());
    }

    fn control(&mut self, id: ControlId, value: ControlValue) {
        if let Some(core) = self.core.as_mut() {
            core.queued.push_back((id, value));
        }
    }

    #[tracing::instrument(skip_all, fields(scene = %self.id))]
    fn dispose(&mut self, app: &mut AppContext) -> DisposeReport {
        let Some(mut core) = self.core.take() else {
            tracing::trace!("dispose on an inactive scene ignored");
            return DisposeReport::default();
        };
        let report = core.teardown(&mut app.controls);
        self.vignette.on_dispose();
        app.forward(core.pool.graph_mut().ledger_mut());
        app.surface.detach(&self.id);
        self.lifecycle = Lifecycle::Disposed;

        tracing::info!(
            generation = %core.generation,
            nodes = report.nodes_removed,
            timers = report.timers_cancelled,
            tweens = report.tweens_cancelled,
            listeners = report.listeners_released,
            balanced = report.is_balanced(),
            "scene disposed"
        );
        report
    }

    fn is_disposed(&self) -> bool {
        self.lifecycle == Lifecycle::Disposed
    }

    fn instances(&self, out: &mut Vec<InstanceRaw>) {
        if let Some(core) = &self.core {
            core.pool.graph().collect_instances(out);
        }
    }

    fn last_tick(&self) -> Option<Tick> {
        self.core.as_ref().and_then(|c| c.last_tick)
    }

    fn stats(&self) -> SceneStats {
        let Some(core) = &self.core else {
            return SceneStats {
                state: format!("{:?}", self.lifecycle),
                ..Default::default()
            };
        };
        let ledger = core.pool.graph().ledger();
        SceneStats {
            state: format!("{:?}", core.machine.current()),
            live_objects: core.pool.live_count(),
            nodes: core.pool.graph().len(),
            resources_live: ledger.live_count(),
            resources_allocated: ledger.allocated(),
            resources_released: ledger.released(),
            pending_timers: core.scheduler.len(),
            active_tweens: core.tweens.len(),
            controls: core.bindings.len(),
            transitions: core.machine.transitions(),
            spawn_refusals: core.pool.stats().refused,
        }
    }
}

impl<V: Vignette> Drop for SceneController<V> {
    fn drop(&mut self) {
        if let Some(core) = &self.core {
            tracing::warn!(
                scene = %self.id,
                generation = %core.generation,
                "scene dropped without dispose"
            );
        }
    }
}
