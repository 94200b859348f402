//! Timed object pool.
//!
//! Owns the scene graph and every ephemeral object in it. Spawns above the
//! cap are refused rather than queued, and expired objects are removed in the
//! same tick that ages them past their lifespan.

use glam::{Quat, Vec3};
use hecs::Entity;

use crate::components::{Appearance, Motion, Role, Tag, TimedObject};
use crate::graph::{NodeDesc, SceneGraph};
use crate::pair::PairId;
use crate::render::{Color, Shape};
use crate::scene::Generation;
use crate::transform::Transform;

/// Connector thickness in world units.
pub(crate) const CONNECTOR_THICKNESS: f32 = 0.02;

/// What to spawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spawn {
    pub tag: &'static str,
    pub shape: Shape,
    pub color: Color,
    pub scale: f32,
    pub motion: Motion,
}

impl Spawn {
    pub fn new(tag: &'static str, shape: Shape, color: Color) -> Self {
        Self {
            tag,
            shape,
            color,
            scale: 1.0,
            motion: Motion::default(),
        }
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

/// An object removed by [`TimedPool::tick`] because its lifespan ran out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Expired {
    pub entity: Entity,
    pub tag: &'static str,
    /// Last position, for effects spawned where the object died.
    pub position: Vec3,
    pub pair: Option<PairId>,
}

/// Running totals for one pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub spawned: usize,
    pub refused: usize,
    pub expired: usize,
    pub retired: usize,
}

pub struct TimedPool {
    pub(crate) graph: SceneGraph,
    cap: Option<usize>,
    in_frame: bool,
    pub(crate) next_pair: u32,
    pub(crate) stats: PoolStats,
}

impl TimedPool {
    pub fn new(generation: Generation) -> Self {
        Self {
            graph: SceneGraph::new(generation),
            cap: None,
            in_frame: false,
            next_pair: 0,
            stats: PoolStats::default(),
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = Some(cap);
        self
    }

    /// Limit the number of live timed objects. Lowering the cap below the
    /// live count retires nothing; further spawns are refused until enough
    /// objects expire.
    pub fn set_cap(&mut self, cap: Option<usize>) {
        self.cap = cap;
    }

    pub fn cap(&self) -> Option<usize> {
        self.cap
    }

    /// Mark the start of a frame's transition step. Objects spawned until
    /// the next [`tick`](Self::tick) are not aged by it.
    pub(crate) fn begin_frame(&mut self) {
        self.in_frame = true;
    }

    /// Spawn a lone timed object. Returns `None` when the pool is full.
    pub fn spawn(
        &mut self,
        now: f32,
        origin: Vec3,
        spawn: Spawn,
        lifespan: Option<f32>,
    ) -> Option<Entity> {
        if !self.has_room(1) {
            self.refuse(spawn.tag);
            return None;
        }
        Some(self.insert(now, origin, spawn, lifespan, Role::Single))
    }

    /// Add a permanent decoration. Decorations do not count against the cap.
    pub fn add_static(&mut self, tag: &'static str, shape: Shape, color: Color, transform: Transform) -> Entity {
        self.graph
            .add(NodeDesc::decoration(tag, shape, color, transform))
    }

    pub(crate) fn has_room(&self, needed: usize) -> bool {
        self.cap
            .is_none_or(|cap| self.live_count() + needed <= cap)
    }

    pub(crate) fn refuse(&mut self, tag: &'static str) {
        self.stats.refused += 1;
        tracing::trace!(tag, cap = ?self.cap, "spawn refused at cap");
    }

    pub(crate) fn insert(
        &mut self,
        now: f32,
        origin: Vec3,
        spawn: Spawn,
        lifespan: Option<f32>,
        role: Role,
    ) -> Entity {
        let mut timed = TimedObject::new(now, origin, lifespan);
        timed.fresh = self.in_frame;
        let node = NodeDesc {
            transform: Transform::from_position(origin).uniform_scale(spawn.scale),
            appearance: Appearance::new(spawn.shape, spawn.color),
            role,
            tag: Tag(spawn.tag),
        };
        let entity = self.graph.add_with(node, (timed, spawn.motion));
        self.stats.spawned += 1;
        tracing::trace!(?entity, tag = spawn.tag, ?lifespan, "spawned");
        entity
    }

    /// Age every live object by `dt` and remove the ones that expired.
    ///
    /// Objects spawned since [`begin_frame`](Self::begin_frame) skip this
    /// tick, so a lifespan of zero expires on the following tick rather than
    /// at creation.
    pub fn tick(&mut self, dt: f32) -> Vec<Expired> {
        self.in_frame = false;
        let dt = dt.max(0.0);

        let mut due = Vec::new();
        for (entity, (timed, role, tag, transform)) in self
            .graph
            .world_mut()
            .query_mut::<(&mut TimedObject, &Role, &Tag, &Transform)>()
        {
            if timed.fresh {
                timed.fresh = false;
                continue;
            }
            timed.age += dt;
            if timed.is_expired() {
                due.push(Expired {
                    entity,
                    tag: tag.0,
                    position: transform.position,
                    pair: role.pair_link().map(|link| link.pair),
                });
            }
        }
        due.sort_by_key(|e| e.entity);

        let mut expired = Vec::with_capacity(due.len());
        for record in due {
            // The partner of an earlier record may already be gone with it.
            if self.graph.contains(record.entity) {
                self.retire(record.entity);
                self.stats.expired += 1;
                tracing::trace!(entity = ?record.entity, tag = record.tag, "expired");
                expired.push(record);
            } else if record.pair.is_some() {
                self.stats.expired += 1;
                expired.push(record);
            }
        }
        expired
    }

    /// Remove one object immediately. Retiring a pair member retires the
    /// whole pair. Returns `false` if the object was already gone.
    pub fn retire(&mut self, entity: Entity) -> bool {
        let Some(role) = self.graph.role(entity) else {
            return false;
        };
        match role {
            Role::Paired(link) => self.retire_pair_member(entity, link),
            Role::Single => {
                self.stats.retired += 1;
                self.graph.remove(entity)
            }
            Role::Static => self.graph.remove(entity),
            Role::Connector { pair } => {
                self.detach_connector(pair, entity);
                self.graph.remove(entity)
            }
        }
    }

    /// Retire every timed object. Decorations stay.
    pub fn retire_all(&mut self) -> usize {
        let timed: Vec<Entity> = self
            .graph
            .world()
            .query::<&TimedObject>()
            .iter()
            .map(|(e, _)| e)
            .collect();
        timed.into_iter().filter(|&e| self.retire(e)).count()
    }

    /// Retire every object carrying `tag`, decorations included.
    pub fn retire_tagged(&mut self, tag: &str) -> usize {
        let mut entities = self.graph.tagged(tag);
        entities.sort();
        entities.into_iter().filter(|&e| self.retire(e)).count()
    }

    pub fn count_tagged(&self, tag: &str) -> usize {
        self.graph.count_tagged(tag)
    }

    /// Live timed objects. Pair members count individually; decorations and
    /// connectors do not count.
    pub fn live_count(&self) -> usize {
        self.graph.world().query::<&TimedObject>().iter().count()
    }

    pub fn is_live(&self, entity: Entity) -> bool {
        self.graph.world().get::<&TimedObject>(entity).is_ok()
    }

    pub fn timed(&self, entity: Entity) -> Option<TimedObject> {
        self.graph.world().get::<&TimedObject>(entity).ok().map(|t| *t)
    }

    /// Apply the default motion formula: drift by velocity and spin about Y.
    pub fn integrate(&mut self, dt: f32) {
        for (_, (transform, motion)) in self
            .graph
            .world_mut()
            .query_mut::<(&mut Transform, &Motion)>()
        {
            transform.position += motion.velocity * dt;
            if motion.spin != 0.0 {
                transform.rotation = Quat::from_rotation_y(motion.spin * dt) * transform.rotation;
            }
        }
    }

    /// Stretch every connector between its pair's current positions.
    pub fn sync_connectors(&mut self) {
        let mut spans = Vec::new();
        for (entity, role) in self.graph.world().query::<&Role>().iter() {
            let Role::Paired(link) = role else { continue };
            let (Some(partner), Some(connector)) = (link.partner, link.connector) else {
                continue;
            };
            if entity < partner {
                spans.push((connector, entity, partner));
            }
        }
        for (connector, a, b) in spans {
            let (Some(ta), Some(tb)) = (self.graph.transform(a), self.graph.transform(b)) else {
                continue;
            };
            self.graph.set_transform(
                connector,
                Transform::segment(ta.position, tb.position, CONNECTOR_THICKNESS),
            );
        }
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Remove every remaining node, timed or not. Used by scene disposal.
    pub(crate) fn clear(&mut self) -> usize {
        self.retire_all() + self.graph.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> TimedPool {
        TimedPool::new(Generation::FIRST)
    }

    fn dot() -> Spawn {
        Spawn::new("dot", Shape::Sphere, Color::CLOUD).scale(0.1)
    }

    #[test]
    fn expires_when_age_reaches_lifespan() {
        let mut p = pool();
        let e = p.spawn(0.0, Vec3::ZERO, dot(), Some(1.0)).unwrap();

        assert!(p.tick(0.5).is_empty());
        assert!(p.is_live(e));

        let expired = p.tick(0.5);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].entity, e);
        assert!(!p.is_live(e));
        assert_eq!(p.graph().ledger().live_count(), 0);
    }

    #[test]
    fn zero_lifespan_spawned_in_frame_survives_one_tick() {
        let mut p = pool();
        p.begin_frame();
        let e = p.spawn(0.0, Vec3::ZERO, dot(), Some(0.0)).unwrap();

        assert!(p.tick(0.016).is_empty());
        assert!(p.is_live(e));
        assert_eq!(p.tick(0.016).len(), 1);
        assert!(!p.is_live(e));
    }

    #[test]
    fn cap_refuses_without_queueing() {
        let mut p = pool().with_cap(5);
        let spawned = (0..10)
            .filter_map(|_| p.spawn(0.0, Vec3::ZERO, dot(), None))
            .count();

        assert_eq!(spawned, 5);
        assert_eq!(p.stats().refused, 5);
        assert_eq!(p.live_count(), 5);
    }

    #[test]
    fn decorations_do_not_count_against_cap() {
        let mut p = pool().with_cap(1);
        p.add_static("stem", Shape::Cube, Color::GOLD, Transform::new());
        assert!(p.spawn(0.0, Vec3::ZERO, dot(), None).is_some());
        assert_eq!(p.live_count(), 1);
    }

    #[test]
    fn retire_all_keeps_decorations() {
        let mut p = pool();
        p.add_static("stem", Shape::Cube, Color::GOLD, Transform::new());
        for _ in 0..3 {
            p.spawn(0.0, Vec3::ZERO, dot(), None);
        }
        assert_eq!(p.retire_all(), 3);
        assert_eq!(p.live_count(), 0);
        assert_eq!(p.count_tagged("stem"), 1);
    }

    #[test]
    fn retire_twice_is_harmless() {
        let mut p = pool();
        let e = p.spawn(0.0, Vec3::ZERO, dot(), None).unwrap();
        assert!(p.retire(e));
        assert!(!p.retire(e));
        assert_eq!(p.graph().ledger().rejected_releases(), 0);
    }

    #[test]
    fn integrate_moves_by_velocity() {
        let mut p = pool();
        let e = p
            .spawn(0.0, Vec3::ZERO, dot().motion(Motion::drifting(Vec3::X)), None)
            .unwrap();
        p.integrate(0.5);
        let t = p.graph().transform(e).unwrap();
        assert!((t.position - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
    }
}
