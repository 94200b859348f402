//! Property tweens on scene graph nodes.
//!
//! A tween interpolates one channel of a node from its value at creation to
//! a target. Starting a new tween on the same node and channel replaces the
//! old one without firing its completion. Tweens whose node has been removed
//! are dropped silently on the next advance.

use glam::{Quat, Vec3};
use hecs::{Entity, World};

use crate::components::Appearance;
use crate::render::Color;
use crate::scene::Easing;
use crate::transform::Transform;

/// Value a tween animates toward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TweenTarget {
    /// Uniform scale.
    Scale(f32),
    Position(Vec3),
    Rotation(Quat),
    /// Alpha only; the RGB channels are left alone.
    Opacity(f32),
    Color(Color),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Channel {
    Scale,
    Position,
    Rotation,
    Color,
}

impl TweenTarget {
    fn channel(&self) -> Channel {
        match self {
            TweenTarget::Scale(_) => Channel::Scale,
            TweenTarget::Position(_) => Channel::Position,
            TweenTarget::Rotation(_) => Channel::Rotation,
            TweenTarget::Opacity(_) | TweenTarget::Color(_) => Channel::Color,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Start {
    Vec(Vec3),
    Rotation(Quat),
    Color(Color),
}

/// Handle for cancelling a tween.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(u64);

struct Tween<M> {
    id: TweenId,
    entity: Entity,
    start: Start,
    target: TweenTarget,
    elapsed: f32,
    duration: f32,
    easing: Easing,
    on_complete: Option<M>,
}

/// Active tweens of one scene. `M` is the completion message type.
pub struct Tweens<M> {
    active: Vec<Tween<M>>,
    next_id: u64,
}

impl<M> Default for Tweens<M> {
    fn default() -> Self {
        Self {
            active: Vec::new(),
            next_id: 0,
        }
    }
}

impl<M> Tweens<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Animate `entity` toward `target` over `duration` seconds.
    ///
    /// Returns `None` if the node does not exist or lacks the animated
    /// component. `on_complete` is returned from [`advance`](Self::advance)
    /// on the frame the tween finishes.
    pub fn animate_to(
        &mut self,
        world: &World,
        entity: Entity,
        target: TweenTarget,
        duration: f32,
        easing: Easing,
        on_complete: Option<M>,
    ) -> Option<TweenId> {
        let start = read_start(world, entity, target)?;
        let channel = target.channel();
        self.active
            .retain(|t| !(t.entity == entity && t.target.channel() == channel));

        let id = TweenId(self.next_id);
        self.next_id += 1;
        self.active.push(Tween {
            id,
            entity,
            start,
            target,
            elapsed: 0.0,
            duration: duration.max(0.0),
            easing,
            on_complete,
        });
        Some(id)
    }

    /// Advance every tween and return the completions that fired, in the
    /// order the tweens were started.
    pub fn advance(&mut self, world: &mut World, dt: f32) -> Vec<M> {
        let mut completed = Vec::new();
        let mut kept = Vec::with_capacity(self.active.len());
        for mut tween in self.active.drain(..) {
            if !world.contains(tween.entity) {
                tracing::trace!(entity = ?tween.entity, "tween dropped with its node");
                continue;
            }
            tween.elapsed += dt.max(0.0);
            let raw = if tween.duration > 0.0 {
                tween.elapsed / tween.duration
            } else {
                1.0
            };
            write(world, &tween, tween.easing.apply(raw));
            if raw >= 1.0 {
                if let Some(message) = tween.on_complete.take() {
                    completed.push(message);
                }
            } else {
                kept.push(tween);
            }
        }
        self.active = kept;
        completed
    }

    pub fn cancel(&mut self, id: TweenId) -> bool {
        let before = self.active.len();
        self.active.retain(|t| t.id != id);
        self.active.len() != before
    }

    pub fn cancel_entity(&mut self, entity: Entity) -> usize {
        let before = self.active.len();
        self.active.retain(|t| t.entity != entity);
        before - self.active.len()
    }

    /// Drop every tween without firing completions.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.active.len();
        self.active.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

fn read_start(world: &World, entity: Entity, target: TweenTarget) -> Option<Start> {
    match target {
        TweenTarget::Scale(_) => {
            let t = world.get::<&Transform>(entity).ok()?;
            Some(Start::Vec(t.scale))
        }
        TweenTarget::Position(_) => {
            let t = world.get::<&Transform>(entity).ok()?;
            Some(Start::Vec(t.position))
        }
        TweenTarget::Rotation(_) => {
            let t = world.get::<&Transform>(entity).ok()?;
            Some(Start::Rotation(t.rotation))
        }
        TweenTarget::Opacity(_) | TweenTarget::Color(_) => {
            let a = world.get::<&Appearance>(entity).ok()?;
            Some(Start::Color(a.color))
        }
    }
}

fn write<M>(world: &mut World, tween: &Tween<M>, t: f32) {
    match (tween.target, tween.start) {
        (TweenTarget::Scale(to), Start::Vec(from)) => {
            if let Ok(mut transform) = world.get::<&mut Transform>(tween.entity) {
                transform.scale = from.lerp(Vec3::splat(to), t);
            }
        }
        (TweenTarget::Position(to), Start::Vec(from)) => {
            if let Ok(mut transform) = world.get::<&mut Transform>(tween.entity) {
                transform.position = from.lerp(to, t);
            }
        }
        (TweenTarget::Rotation(to), Start::Rotation(from)) => {
            if let Ok(mut transform) = world.get::<&mut Transform>(tween.entity) {
                transform.rotation = from.slerp(to, t);
            }
        }
        (TweenTarget::Opacity(to), Start::Color(from)) => {
            if let Ok(mut appearance) = world.get::<&mut Appearance>(tween.entity) {
                appearance.color.a = from.a + (to - from.a) * t;
            }
        }
        (TweenTarget::Color(to), Start::Color(from)) => {
            if let Ok(mut appearance) = world.get::<&mut Appearance>(tween.entity) {
                appearance.color = from.lerp(to, t);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Shape;

    fn node(world: &mut World) -> Entity {
        world.spawn((Transform::new(), Appearance::new(Shape::Petal, Color::WHITE)))
    }

    #[test]
    fn reaches_target_and_fires_once() {
        let mut world = World::new();
        let e = node(&mut world);
        let mut tweens = Tweens::new();
        tweens.animate_to(&world, e, TweenTarget::Scale(3.0), 1.0, Easing::Linear, Some("grown"));

        assert!(tweens.advance(&mut world, 0.5).is_empty());
        let scale = world.get::<&Transform>(e).unwrap().scale;
        assert!((scale.x - 2.0).abs() < 1e-6);

        assert_eq!(tweens.advance(&mut world, 0.5), vec!["grown"]);
        assert!(tweens.is_empty());
        assert!(tweens.advance(&mut world, 0.5).is_empty());
    }

    #[test]
    fn same_channel_replaces() {
        let mut world = World::new();
        let e = node(&mut world);
        let mut tweens = Tweens::new();
        tweens.animate_to(&world, e, TweenTarget::Opacity(0.0), 1.0, Easing::Linear, Some(1));
        tweens.animate_to(&world, e, TweenTarget::Color(Color::GOLD), 1.0, Easing::Linear, Some(2));
        tweens.animate_to(&world, e, TweenTarget::Position(Vec3::Y), 1.0, Easing::Linear, Some(3));

        assert_eq!(tweens.len(), 2);
        assert_eq!(tweens.advance(&mut world, 1.0), vec![2, 3]);
    }

    #[test]
    fn removed_node_drops_tween_silently() {
        let mut world = World::new();
        let e = node(&mut world);
        let mut tweens = Tweens::new();
        tweens.animate_to(&world, e, TweenTarget::Scale(0.0), 1.0, Easing::EaseOut, Some(()));
        world.despawn(e).unwrap();

        assert!(tweens.advance(&mut world, 2.0).is_empty());
        assert!(tweens.is_empty());
    }

    #[test]
    fn missing_node_is_not_animated() {
        let mut world = World::new();
        let e = node(&mut world);
        world.despawn(e).unwrap();
        let mut tweens: Tweens<()> = Tweens::new();
        assert!(
            tweens
                .animate_to(&world, e, TweenTarget::Scale(1.0), 1.0, Easing::Linear, None)
                .is_none()
        );
    }

    #[test]
    fn cancel_all_swallows_completions() {
        let mut world = World::new();
        let e = node(&mut world);
        let mut tweens = Tweens::new();
        tweens.animate_to(&world, e, TweenTarget::Scale(2.0), 0.1, Easing::Linear, Some(()));
        assert_eq!(tweens.cancel_all(), 1);
        assert!(tweens.advance(&mut world, 1.0).is_empty());
    }
}
