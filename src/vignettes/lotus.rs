//! Lotus: a flower that opens, glows and closes on a fixed loop.
//!
//! Unlike the other verses the lotus needs no input. Its four phases run on
//! the durations in [`LotusPhases`](crate::LotusPhases), and every loop ends
//! with exactly the objects it started with.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use hecs::Entity;
use rand::Rng;

use crate::clock::Tick;
use crate::components::Motion;
use crate::config::{AppConfig, LotusPhases};
use crate::controls::{ControlKind, ControlValue};
use crate::error::VignetteResult;
use crate::pool::Spawn;
use crate::render::{Color, Shape};
use crate::scene::{Easing, SceneCtx, Vignette};
use crate::state::{PhaseCycle, SceneState, StateChange};
use crate::transform::Transform;
use crate::tween::TweenTarget;

use super::{random_in_ball, spawn_count};

const PETAL: &str = "petal";
const SPARK: &str = "spark";
const PETALS: usize = 8;
const CLOSED_TILT: f32 = 0.15;
const OPEN_TILT: f32 = 1.1;
const SPARK_LIFESPAN: f32 = 1.2;
const SPARK_RATE: f32 = 30.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bloom {
    Closed,
    Opening,
    Open,
    Emanating,
}

impl SceneState for Bloom {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Fold the petals back up and restart the loop.
    Close,
}

pub struct Lotus {
    phases: LotusPhases,
    spark_cap: usize,
    petals: Vec<Entity>,
    loops: usize,
}

impl Lotus {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            phases: config.vignettes.lotus,
            spark_cap: config.vignettes.spark_cap,
            petals: Vec::new(),
            loops: 0,
        }
    }

    pub fn petals(&self) -> &[Entity] {
        &self.petals
    }

    /// Full loops completed since init.
    pub fn loops(&self) -> usize {
        self.loops
    }

    fn tilt(&self, ctx: &mut SceneCtx<'_, Self>, tilt: f32, duration: f32, easing: Easing) {
        for (i, &petal) in self.petals.iter().enumerate() {
            ctx.animate_to(
                petal,
                TweenTarget::Rotation(petal_rotation(i, tilt)),
                duration,
                easing,
                None,
            );
        }
    }
}

fn petal_rotation(index: usize, tilt: f32) -> Quat {
    let angle = index as f32 / PETALS as f32 * TAU;
    Quat::from_rotation_y(angle) * Quat::from_rotation_x(tilt)
}

impl Vignette for Lotus {
    type State = Bloom;
    type Action = Action;
    type Message = ();

    fn initial_state(&self) -> Bloom {
        Bloom::Closed
    }

    fn phase_cycle(&self, _ctx: &SceneCtx<'_, Self>) -> Option<PhaseCycle<Bloom>> {
        Some(PhaseCycle::new([
            (Bloom::Closed, self.phases.closed),
            (Bloom::Opening, self.phases.opening),
            (Bloom::Open, self.phases.open),
            (Bloom::Emanating, self.phases.emanating),
        ]))
    }

    fn init(&mut self, ctx: &mut SceneCtx<'_, Self>) -> VignetteResult<()> {
        ctx.set_cap(Some(self.spark_cap));
        ctx.add_static(
            "stem",
            Shape::Segment,
            Color::rgb(0.3, 0.7, 0.4),
            Transform::segment(Vec3::new(0.0, -1.5, 0.0), Vec3::ZERO, 0.04),
        );
        ctx.add_static(
            "heart",
            Shape::Sphere,
            Color::GOLD,
            Transform::new().uniform_scale(0.15),
        );
        self.petals = (0..PETALS)
            .map(|i| {
                let transform = Transform::new()
                    .rotation(petal_rotation(i, CLOSED_TILT))
                    .scale(Vec3::new(0.35, 0.05, 0.9));
                ctx.add_static(PETAL, Shape::Petal, Color::rgb(1.0, 0.7, 0.85), transform)
            })
            .collect();
        ctx.register_control(ControlKind::button("Close"), Action::Close);
        Ok(())
    }

    fn on_action(&mut self, ctx: &mut SceneCtx<'_, Self>, action: Action, _value: ControlValue) {
        match action {
            Action::Close => ctx.request(Bloom::Closed),
        }
    }

    fn on_transition(&mut self, ctx: &mut SceneCtx<'_, Self>, change: &StateChange<Bloom>) {
        tracing::debug!(from = ?change.from, to = ?change.to, at = change.at, "lotus phase");
        match change.to {
            Bloom::Closed => {
                ctx.retire_tagged(SPARK);
                self.tilt(ctx, CLOSED_TILT, self.phases.closed * 0.5, Easing::EaseInOut);
                if change.from == Bloom::Emanating {
                    self.loops += 1;
                }
            }
            Bloom::Opening => {
                self.tilt(ctx, OPEN_TILT, self.phases.opening, Easing::InOutCubic);
            }
            Bloom::Open | Bloom::Emanating => {}
        }
    }

    fn advance(&mut self, ctx: &mut SceneCtx<'_, Self>, tick: Tick) {
        if ctx.state() != Bloom::Emanating {
            return;
        }
        let count = spawn_count(ctx.rng(), SPARK_RATE, tick.dt);
        for _ in 0..count {
            let origin = random_in_ball(ctx.rng(), 0.2);
            let rise = ctx.rng().gen_range(0.4..0.9);
            let drift = random_in_ball(ctx.rng(), 0.2) + Vec3::Y * rise;
            let spawn = Spawn::new(SPARK, Shape::Sphere, Color::GOLD.with_alpha(0.8))
                .scale(0.03)
                .motion(Motion::drifting(drift));
            if ctx.spawn(origin, spawn, Some(SPARK_LIFESPAN)).is_none() {
                break;
            }
        }
    }

    fn on_dispose(&mut self) {
        self.petals.clear();
    }
}
