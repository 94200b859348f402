//! Superposition: a probability cloud that collapses to one point when
//! measured.
//!
//! While in [`Wave::Superposition`] short-lived cloud particles flicker in
//! and out around the nucleus, capped by the pool. Measuring retires the whole
//! cloud in one step and spawns a single resolved particle at a position
//! drawn at that moment. Reset goes back to the cloud.

use glam::Vec3;
use hecs::Entity;
use rand::Rng;

use crate::clock::Tick;
use crate::components::Motion;
use crate::config::AppConfig;
use crate::controls::{ControlKind, ControlValue};
use crate::error::VignetteResult;
use crate::pool::Spawn;
use crate::render::{Color, Shape};
use crate::scene::{Easing, SceneCtx, Vignette};
use crate::state::{SceneState, StateChange};
use crate::transform::Transform;
use crate::tween::TweenTarget;

use super::{random_in_ball, spawn_count};

const CLOUD: &str = "cloud";
const RESOLVED: &str = "resolved";
const CLOUD_RADIUS: f32 = 1.2;
const RESOLVED_SCALE: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wave {
    Superposition,
    Collapsed,
}

impl SceneState for Wave {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Measure,
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// The resolved particle finished growing in.
    Settled,
}

pub struct Superposition {
    cap: usize,
    rate: f32,
    lifespan: f32,
    resolved: Option<Entity>,
    /// Position drawn when the wave collapsed.
    outcome: Option<Vec3>,
    settled: bool,
}

impl Superposition {
    pub fn new(config: &AppConfig) -> Self {
        let tuning = &config.vignettes;
        Self {
            cap: tuning.particle_cap,
            rate: tuning.spawn_rate,
            lifespan: tuning.cloud_lifespan,
            resolved: None,
            outcome: None,
            settled: false,
        }
    }

    /// Where the last measurement found the particle.
    pub fn outcome(&self) -> Option<Vec3> {
        self.outcome
    }

    pub fn resolved(&self) -> Option<Entity> {
        self.resolved
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }
}

impl Vignette for Superposition {
    type State = Wave;
    type Action = Action;
    type Message = Cue;

    fn initial_state(&self) -> Wave {
        Wave::Superposition
    }

    fn init(&mut self, ctx: &mut SceneCtx<'_, Self>) -> VignetteResult<()> {
        ctx.set_cap(Some(self.cap));
        ctx.add_static(
            "nucleus",
            Shape::Sphere,
            Color::WHITE.with_alpha(0.3),
            Transform::new().uniform_scale(0.12),
        );
        ctx.add_static(
            "orbit",
            Shape::Ring,
            Color::CLOUD.with_alpha(0.25),
            Transform::new().uniform_scale(CLOUD_RADIUS * 2.0),
        );
        ctx.register_control(ControlKind::button("Measure"), Action::Measure);
        ctx.register_control(ControlKind::button("Reset"), Action::Reset);
        Ok(())
    }

    fn on_action(&mut self, ctx: &mut SceneCtx<'_, Self>, action: Action, _value: ControlValue) {
        match action {
            Action::Measure => ctx.request(Wave::Collapsed),
            Action::Reset => ctx.request(Wave::Superposition),
        }
    }

    fn on_transition(&mut self, ctx: &mut SceneCtx<'_, Self>, change: &StateChange<Wave>) {
        match change.to {
            Wave::Collapsed => {
                let retired = ctx.retire_tagged(CLOUD);
                let position = random_in_ball(ctx.rng(), CLOUD_RADIUS);
                self.outcome = Some(position);
                self.settled = false;
                self.resolved = ctx.spawn(
                    position,
                    Spawn::new(RESOLVED, Shape::Sphere, Color::GOLD).scale(0.0),
                    None,
                );
                if let Some(resolved) = self.resolved {
                    ctx.animate_to(
                        resolved,
                        TweenTarget::Scale(RESOLVED_SCALE),
                        0.4,
                        Easing::EaseOut,
                        Some(Cue::Settled),
                    );
                }
                tracing::debug!(retired, ?position, "wave collapsed");
            }
            Wave::Superposition => {
                if let Some(resolved) = self.resolved.take() {
                    ctx.retire(resolved);
                }
                self.outcome = None;
                self.settled = false;
            }
        }
    }

    fn on_message(&mut self, _ctx: &mut SceneCtx<'_, Self>, message: Cue) {
        match message {
            Cue::Settled => self.settled = true,
        }
    }

    fn advance(&mut self, ctx: &mut SceneCtx<'_, Self>, tick: Tick) {
        match ctx.state() {
            Wave::Superposition => {
                let count = spawn_count(ctx.rng(), self.rate, tick.dt);
                for _ in 0..count {
                    let origin = random_in_ball(ctx.rng(), CLOUD_RADIUS);
                    let drift = random_in_ball(ctx.rng(), 0.15);
                    let size = ctx.rng().gen_range(0.03..0.07);
                    let spawn = Spawn::new(CLOUD, Shape::Sphere, Color::CLOUD)
                        .scale(size)
                        .motion(Motion::drifting(drift));
                    if ctx.spawn(origin, spawn, Some(self.lifespan)).is_none() {
                        break;
                    }
                }
            }
            Wave::Collapsed => {
                if let (Some(resolved), true) = (self.resolved, self.settled) {
                    let pulse = 1.0 + 0.08 * (tick.time * 4.0).sin();
                    if let Some(t) = ctx.transform(resolved) {
                        ctx.set_transform(resolved, t.uniform_scale(RESOLVED_SCALE * pulse));
                    }
                }
            }
        }
    }

    fn on_dispose(&mut self) {
        self.resolved = None;
        self.outcome = None;
        self.settled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppContext;
    use crate::render::HeadlessSurface;
    use crate::scene::{Scene, SceneController};

    fn setup() -> (AppContext, SceneController<Superposition>) {
        let config = AppConfig::default();
        let scene = SceneController::new("superposition", Superposition::new(&config));
        (AppContext::new(HeadlessSurface::new(), config), scene)
    }

    fn press(app: &mut AppContext, scene: &mut SceneController<Superposition>, label: &str) {
        let id = app.controls.find(label).unwrap().id;
        scene.control(id, ControlValue::Pressed);
    }

    #[test]
    fn cloud_respects_the_cap() {
        let (mut app, mut scene) = setup();
        scene.init(&mut app).unwrap();
        for _ in 0..120 {
            scene.update(&mut app, 0.1);
        }
        let pool = scene.pool().unwrap();
        assert!(pool.live_count() <= app.config.vignettes.particle_cap);
        assert!(pool.count_tagged(CLOUD) > 0);
        scene.dispose(&mut app);
    }

    #[test]
    fn measure_collapses_and_repeat_is_a_noop() {
        let (mut app, mut scene) = setup();
        scene.init(&mut app).unwrap();
        for _ in 0..10 {
            scene.update(&mut app, 0.05);
        }

        press(&mut app, &mut scene, "Measure");
        scene.update(&mut app, 0.05);
        assert_eq!(scene.state(), Some(Wave::Collapsed));
        assert_eq!(scene.pool().unwrap().count_tagged(CLOUD), 0);
        let outcome = scene.vignette().outcome();
        let before = scene.stats();

        press(&mut app, &mut scene, "Measure");
        scene.update(&mut app, 0.05);
        let after = scene.stats();
        assert_eq!(scene.vignette().outcome(), outcome);
        assert_eq!(after.transitions, before.transitions);
        assert_eq!(after.live_objects, before.live_objects);
        assert_eq!(after.resources_live, before.resources_live);
        scene.dispose(&mut app);
    }

    #[test]
    fn resolved_particle_settles_then_reset_restores_cloud() {
        let (mut app, mut scene) = setup();
        scene.init(&mut app).unwrap();
        press(&mut app, &mut scene, "Measure");
        for _ in 0..12 {
            scene.update(&mut app, 0.05);
        }
        assert!(scene.vignette().is_settled());

        press(&mut app, &mut scene, "Reset");
        scene.update(&mut app, 0.05);
        assert_eq!(scene.state(), Some(Wave::Superposition));
        assert_eq!(scene.pool().unwrap().count_tagged(RESOLVED), 0);
        assert!(scene.vignette().resolved().is_none());
        let report = scene.dispose(&mut app);
        assert!(report.is_balanced());
    }
}
