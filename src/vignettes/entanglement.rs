//! Entanglement: two particles orbit a shared center, joined by a connector.
//! Measuring one fixes both.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::clock::Tick;
use crate::config::AppConfig;
use crate::controls::{ControlKind, ControlValue};
use crate::error::VignetteResult;
use crate::pair::{Measurement, PairHandle};
use crate::pool::Spawn;
use crate::render::{Color, Shape};
use crate::scene::{Easing, SceneCtx, Vignette};
use crate::state::{SceneState, StateChange};
use crate::transform::Transform;
use crate::tween::TweenTarget;

const PARTICLE: &str = "particle";
const ORBIT_RADIUS: f32 = 1.0;
/// Revolutions per second.
const ORBIT_RATE: f32 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Link {
    Entangled,
    Measured,
}

impl SceneState for Link {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Measure,
    Reset,
}

#[derive(Default)]
pub struct Entanglement {
    pair: Option<PairHandle>,
    measurement: Option<Measurement>,
}

impl Entanglement {
    pub fn new(_config: &AppConfig) -> Self {
        Self::default()
    }

    pub fn pair(&self) -> Option<PairHandle> {
        self.pair
    }

    pub fn measurement(&self) -> Option<Measurement> {
        self.measurement
    }

    fn spawn_pair(&mut self, ctx: &mut SceneCtx<'_, Self>) {
        let spawn = Spawn::new(PARTICLE, Shape::Sphere, Color::CLOUD).scale(0.18);
        self.pair = ctx.spawn_pair(
            Vec3::ZERO,
            Vec3::X * ORBIT_RADIUS,
            spawn,
            None,
            Some(Color::WHITE.with_alpha(0.4)),
        );
    }
}

/// Orbit position of member `a` at time `t`. Member `b` sits opposite.
fn orbit(t: f32) -> Vec3 {
    let angle = t * ORBIT_RATE * TAU;
    Vec3::new(angle.cos(), 0.25 * (2.0 * angle).sin(), angle.sin()) * ORBIT_RADIUS
}

impl Vignette for Entanglement {
    type State = Link;
    type Action = Action;
    type Message = ();

    fn initial_state(&self) -> Link {
        Link::Entangled
    }

    fn init(&mut self, ctx: &mut SceneCtx<'_, Self>) -> VignetteResult<()> {
        ctx.add_static(
            "center",
            Shape::Cube,
            Color::WHITE.with_alpha(0.15),
            Transform::new().uniform_scale(0.05),
        );
        self.spawn_pair(ctx);
        ctx.register_control(ControlKind::button("Measure"), Action::Measure);
        ctx.register_control(ControlKind::button("Reset"), Action::Reset);
        Ok(())
    }

    fn on_action(&mut self, ctx: &mut SceneCtx<'_, Self>, action: Action, _value: ControlValue) {
        match action {
            Action::Measure => ctx.request(Link::Measured),
            Action::Reset => ctx.request(Link::Entangled),
        }
    }

    fn on_transition(&mut self, ctx: &mut SceneCtx<'_, Self>, change: &StateChange<Link>) {
        match change.to {
            Link::Measured => {
                let Some(pair) = self.pair else { return };
                self.measurement = ctx.measure(pair.a);
                if let Some(m) = self.measurement {
                    for (entity, outcome) in std::iter::once(m.first).chain(m.second) {
                        ctx.animate_to(
                            entity,
                            TweenTarget::Color(outcome.color()),
                            0.3,
                            Easing::EaseOut,
                            None,
                        );
                    }
                }
            }
            Link::Entangled => {
                if let Some(pair) = self.pair.take() {
                    ctx.retire(pair.a);
                }
                self.measurement = None;
                self.spawn_pair(ctx);
            }
        }
    }

    fn advance(&mut self, ctx: &mut SceneCtx<'_, Self>, tick: Tick) {
        let Some(pair) = self.pair else { return };
        let offset = orbit(tick.time);
        for (entity, position) in [(pair.a, offset), (pair.b, -offset)] {
            if let Some(t) = ctx.transform(entity) {
                ctx.set_transform(entity, t.position(position));
            }
        }
        if ctx.state() == Link::Entangled {
            let shimmer = 0.5 + 0.5 * (tick.time * 3.0).sin();
            let color = Color::CLOUD.lerp(Color::WHITE, shimmer * 0.4);
            ctx.set_color(pair.a, color);
            ctx.set_color(pair.b, color);
        }
    }

    fn on_dispose(&mut self) {
        self.pair = None;
        self.measurement = None;
    }
}
