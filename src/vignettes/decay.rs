//! Decay: an unstable parent splits into particle/antiparticle pairs.
//!
//! The parent decays on its own after an exponentially distributed delay set
//! by the half-life slider, or at once when the Decay button is pressed.
//! Products are emitted in staggered pairs with random lifespans; once the
//! last pair has faded a new parent forms.

use std::f32::consts::LN_2;

use glam::Vec3;
use hecs::Entity;
use rand::Rng;

use crate::clock::Tick;
use crate::components::Motion;
use crate::config::{AppConfig, LifespanRange};
use crate::controls::{ControlKind, ControlValue};
use crate::error::VignetteResult;
use crate::pool::Spawn;
use crate::render::{Color, Shape};
use crate::schedule::TimerId;
use crate::scene::{Easing, SceneCtx, Vignette};
use crate::state::{SceneState, StateChange};
use crate::tween::TweenTarget;

use super::random_direction;

const PARENT: &str = "parent";
const PRODUCT: &str = "product";
const PARENT_SCALE: f32 = 0.35;
const PRODUCT_SPEED: f32 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nucleus {
    Stable,
    Decaying,
}

impl SceneState for Nucleus {
    fn permits(self, target: Self) -> bool {
        self != target
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Decay,
    HalfLife,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// Emit the `n`th product pair.
    Emit(usize),
    /// The half-life timer ran out.
    Spontaneous,
}

pub struct Decay {
    products: usize,
    stagger: f32,
    lifespan: LifespanRange,
    half_life: f32,
    parent: Option<Entity>,
    timer: Option<TimerId>,
    /// Product pairs scheduled but not yet emitted.
    pending: usize,
    decays: usize,
}

impl Decay {
    pub const DEFAULT_HALF_LIFE: f32 = 4.0;

    pub fn new(config: &AppConfig) -> Self {
        let tuning = &config.vignettes;
        Self {
            products: tuning.decay_products,
            stagger: tuning.decay_stagger,
            lifespan: tuning.decay_lifespan,
            half_life: Self::DEFAULT_HALF_LIFE,
            parent: None,
            timer: None,
            pending: 0,
            decays: 0,
        }
    }

    pub fn half_life(&self) -> f32 {
        self.half_life
    }

    /// Completed decays since init.
    pub fn decays(&self) -> usize {
        self.decays
    }

    fn form_parent(&mut self, ctx: &mut SceneCtx<'_, Self>) {
        let spawn = Spawn::new(PARENT, Shape::Sphere, Color::GOLD).scale(0.0);
        self.parent = ctx.spawn(Vec3::ZERO, spawn, None);
        if let Some(parent) = self.parent {
            ctx.animate_to(
                parent,
                TweenTarget::Scale(PARENT_SCALE),
                0.5,
                Easing::InOutCubic,
                None,
            );
        }
        self.arm_timer(ctx);
    }

    /// Schedule spontaneous decay after an exponential waiting time.
    fn arm_timer(&mut self, ctx: &mut SceneCtx<'_, Self>) {
        if let Some(timer) = self.timer.take() {
            ctx.cancel_timer(timer);
        }
        let u: f32 = ctx.rng().gen_range(f32::EPSILON..1.0);
        let delay = -u.ln() * self.half_life / LN_2;
        self.timer = Some(ctx.after(delay, Cue::Spontaneous));
    }

    fn emit(&mut self, ctx: &mut SceneCtx<'_, Self>) {
        let direction = random_direction(ctx.rng());
        let lifespan = if self.lifespan.max > self.lifespan.min {
            ctx.rng().gen_range(self.lifespan.min..=self.lifespan.max)
        } else {
            self.lifespan.min
        };
        let spawn = Spawn::new(PRODUCT, Shape::Sphere, Color::UP)
            .scale(0.08)
            .motion(Motion::drifting(direction * PRODUCT_SPEED).spin(2.0));
        if let Some(pair) = ctx.spawn_pair(Vec3::ZERO, direction * 0.1, spawn, Some(lifespan), None) {
            ctx.set_color(pair.b, Color::DOWN);
        }
    }
}

impl Vignette for Decay {
    type State = Nucleus;
    type Action = Action;
    type Message = Cue;

    fn initial_state(&self) -> Nucleus {
        Nucleus::Stable
    }

    fn init(&mut self, ctx: &mut SceneCtx<'_, Self>) -> VignetteResult<()> {
        ctx.set_cap(Some(self.products * 2 + 1));
        ctx.register_control(ControlKind::button("Decay"), Action::Decay);
        ctx.register_control(
            ControlKind::slider("Half-life", 0.5, 10.0, 0.5, self.half_life),
            Action::HalfLife,
        );
        self.form_parent(ctx);
        Ok(())
    }

    fn on_action(&mut self, ctx: &mut SceneCtx<'_, Self>, action: Action, value: ControlValue) {
        match action {
            Action::Decay => ctx.request(Nucleus::Decaying),
            Action::HalfLife => {
                if let Some(half_life) = value.as_f32() {
                    self.half_life = half_life;
                    if ctx.state() == Nucleus::Stable {
                        self.arm_timer(ctx);
                    }
                }
            }
        }
    }

    fn on_transition(&mut self, ctx: &mut SceneCtx<'_, Self>, change: &StateChange<Nucleus>) {
        match change.to {
            Nucleus::Decaying => {
                if let Some(timer) = self.timer.take() {
                    ctx.cancel_timer(timer);
                }
                if let Some(parent) = self.parent.take() {
                    ctx.retire(parent);
                }
                for n in 0..self.products {
                    ctx.after(self.stagger * n as f32, Cue::Emit(n));
                }
                self.pending = self.products;
                self.decays += 1;
            }
            Nucleus::Stable => self.form_parent(ctx),
        }
    }

    fn on_message(&mut self, ctx: &mut SceneCtx<'_, Self>, message: Cue) {
        match message {
            Cue::Emit(n) => {
                tracing::trace!(n, "emitting decay products");
                self.pending = self.pending.saturating_sub(1);
                self.emit(ctx);
            }
            Cue::Spontaneous => {
                self.timer = None;
                ctx.request(Nucleus::Decaying);
            }
        }
    }

    fn advance(&mut self, ctx: &mut SceneCtx<'_, Self>, _tick: Tick) {
        if ctx.state() == Nucleus::Decaying && self.pending == 0 && ctx.count_tagged(PRODUCT) == 0 {
            ctx.request(Nucleus::Stable);
        }
    }

    fn on_dispose(&mut self) {
        self.parent = None;
        self.timer = None;
        self.pending = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppContext;
    use crate::render::HeadlessSurface;
    use crate::scene::{Scene, SceneController};

    fn setup() -> (AppContext, SceneController<Decay>) {
        let config = AppConfig::default();
        let scene = SceneController::new("decay", Decay::new(&config));
        (AppContext::new(HeadlessSurface::new(), config), scene)
    }

    fn press(app: &AppContext, scene: &mut SceneController<Decay>, label: &str, value: ControlValue) {
        let id = app.controls.find(label).unwrap().id;
        scene.control(id, value);
    }

    #[test]
    fn decay_emits_staggered_pairs_then_reforms() {
        let (mut app, mut scene) = setup();
        scene.init(&mut app).unwrap();
        press(&app, &mut scene, "Decay", ControlValue::Pressed);
        scene.update(&mut app, 0.05);
        assert_eq!(scene.state(), Some(Nucleus::Decaying));
        assert_eq!(scene.pool().unwrap().count_tagged(PARENT), 0);

        let mut most = 0;
        for _ in 0..20 {
            scene.update(&mut app, 0.05);
            let products = scene.pool().unwrap().count_tagged(PRODUCT);
            assert_eq!(products % 2, 0);
            most = most.max(products);
        }
        assert_eq!(most, app.config.vignettes.decay_products * 2);

        let mut reformed = false;
        for _ in 0..80 {
            scene.update(&mut app, 0.05);
            if scene.state() == Some(Nucleus::Stable) {
                reformed = true;
                break;
            }
        }
        assert!(reformed);
        assert_eq!(scene.pool().unwrap().count_tagged(PARENT), 1);
        assert!(scene.vignette().decays() >= 1);
        assert!(scene.dispose(&mut app).is_balanced());
    }

    #[test]
    fn disposing_mid_decay_cancels_pending_emissions() {
        let (mut app, mut scene) = setup();
        scene.init(&mut app).unwrap();
        press(&app, &mut scene, "Decay", ControlValue::Pressed);
        scene.update(&mut app, 0.05);
        assert!(scene.stats().pending_timers > 0);

        let report = scene.dispose(&mut app);
        assert!(report.timers_cancelled > 0);
        assert!(report.is_balanced());

        for _ in 0..10 {
            scene.update(&mut app, 0.1);
        }
        assert!(scene.pool().is_none());
    }

    #[test]
    fn half_life_slider_snaps_and_rearms() {
        let (mut app, mut scene) = setup();
        scene.init(&mut app).unwrap();
        let id = app.controls.find("Half-life").unwrap().id;
        let (_, value) = app.controls.resolve(id, ControlValue::Value(2.2)).unwrap();
        scene.control(id, value);
        scene.update(&mut app, 0.01);
        assert_eq!(scene.vignette().half_life(), 2.0);
        assert_eq!(scene.stats().pending_timers, 1);
        scene.dispose(&mut app);
    }
}
