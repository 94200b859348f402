//! Correlated object pairs.
//!
//! Both members of a pair are created in one call and retired in one call.
//! Each member's [`Role::Paired`] link names its partner and the connector
//! drawn between them. Measuring either member fixes both outcomes at once.

use glam::Vec3;
use hecs::Entity;
use rand::Rng;

use crate::components::{Appearance, Role, Tag};
use crate::graph::NodeDesc;
use crate::pool::{CONNECTOR_THICKNESS, Spawn, TimedPool};
use crate::render::{Color, Shape};
use crate::transform::Transform;

/// Identifier shared by the two members of a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairId(pub(crate) u32);

/// Result of measuring a pair member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    Up,
    Down,
}

impl Outcome {
    /// The outcome the partner of a member with this outcome resolves to.
    pub fn complement(self) -> Self {
        match self {
            Outcome::Up => Outcome::Down,
            Outcome::Down => Outcome::Up,
        }
    }

    pub fn color(self) -> Color {
        match self {
            Outcome::Up => Color::UP,
            Outcome::Down => Color::DOWN,
        }
    }
}

/// Per-member pair state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairLink {
    pub pair: PairId,
    /// Nulled before the partner is removed.
    pub partner: Option<Entity>,
    pub connector: Option<Entity>,
    /// Set once by measurement, never changed afterwards.
    pub outcome: Option<Outcome>,
}

/// The entities created by [`TimedPool::spawn_pair`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairHandle {
    pub pair: PairId,
    pub a: Entity,
    pub b: Entity,
    pub connector: Option<Entity>,
}

/// Outcomes of a measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    pub pair: PairId,
    /// The measured member.
    pub first: (Entity, Outcome),
    /// Its partner, `None` only if the partner is already gone.
    pub second: Option<(Entity, Outcome)>,
    /// `false` when the pair had already been measured.
    pub newly_resolved: bool,
}

impl TimedPool {
    /// Spawn two members with mirrored motion, and optionally a connector
    /// between them.
    ///
    /// Both members exist or neither does: the pair is refused unless the
    /// cap leaves room for two. `a` spawns at `center + offset` and `b` at
    /// `center - offset`.
    pub fn spawn_pair(
        &mut self,
        now: f32,
        center: Vec3,
        offset: Vec3,
        spawn: Spawn,
        lifespan: Option<f32>,
        connector: Option<Color>,
    ) -> Option<PairHandle> {
        if !self.has_room(2) {
            self.refuse(spawn.tag);
            return None;
        }

        let pair = PairId(self.next_pair);
        self.next_pair = self.next_pair.wrapping_add(1);

        let unlinked = Role::Paired(PairLink {
            pair,
            partner: None,
            connector: None,
            outcome: None,
        });
        let a = self.insert(now, center + offset, spawn, lifespan, unlinked);
        let mirrored = spawn.motion(spawn.motion.mirrored());
        let b = self.insert(now, center - offset, mirrored, lifespan, unlinked);

        let connector = connector.map(|color| {
            self.graph.add(NodeDesc {
                transform: Transform::segment(center + offset, center - offset, CONNECTOR_THICKNESS),
                appearance: Appearance::new(Shape::Segment, color),
                role: Role::Connector { pair },
                tag: Tag(spawn.tag),
            })
        });

        self.set_link(a, |link| {
            link.partner = Some(b);
            link.connector = connector;
        });
        self.set_link(b, |link| {
            link.partner = Some(a);
            link.connector = connector;
        });

        tracing::trace!(?pair, ?a, ?b, "pair spawned");
        Some(PairHandle {
            pair,
            a,
            b,
            connector,
        })
    }

    /// Resolve the pair `entity` belongs to.
    ///
    /// The first measurement draws the outcome for `entity` and gives the
    /// partner the complement in the same call. Later measurements of
    /// either member return the stored outcomes.
    pub fn measure(&mut self, entity: Entity, rng: &mut impl Rng) -> Option<Measurement> {
        let link = *self.graph.role(entity)?.pair_link()?;

        if let Some(outcome) = link.outcome {
            let second = link
                .partner
                .and_then(|p| self.outcome(p).map(|o| (p, o)));
            return Some(Measurement {
                pair: link.pair,
                first: (entity, outcome),
                second,
                newly_resolved: false,
            });
        }

        let outcome = if rng.gen_bool(0.5) {
            Outcome::Up
        } else {
            Outcome::Down
        };
        self.set_link(entity, |l| l.outcome = Some(outcome));
        let second = link.partner.map(|partner| {
            let complement = outcome.complement();
            self.set_link(partner, |l| l.outcome = Some(complement));
            (partner, complement)
        });

        tracing::debug!(pair = ?link.pair, ?outcome, "pair measured");
        Some(Measurement {
            pair: link.pair,
            first: (entity, outcome),
            second,
            newly_resolved: true,
        })
    }

    /// Stored outcome of a pair member, `None` until measured.
    pub fn outcome(&self, entity: Entity) -> Option<Outcome> {
        self.graph.role(entity)?.pair_link()?.outcome
    }

    /// Live partner of a pair member.
    pub fn partner(&self, entity: Entity) -> Option<Entity> {
        self.graph.role(entity)?.pair_link()?.partner
    }

    /// Every live pair member, paired with its link.
    pub fn pair_members(&self) -> Vec<(Entity, PairLink)> {
        let mut members: Vec<(Entity, PairLink)> = self
            .graph
            .world()
            .query::<&Role>()
            .iter()
            .filter_map(|(e, role)| role.pair_link().map(|l| (e, *l)))
            .collect();
        members.sort_by_key(|(e, _)| *e);
        members
    }

    /// Retire a pair as one step: unlink the partner, drop the connector,
    /// then remove both members.
    pub(crate) fn retire_pair_member(&mut self, entity: Entity, link: PairLink) -> bool {
        if let Some(partner) = link.partner {
            self.set_link(partner, |l| {
                l.partner = None;
                l.connector = None;
            });
        }
        if let Some(connector) = link.connector {
            self.graph.remove(connector);
        }
        let removed = self.graph.remove(entity);
        if let Some(partner) = link.partner {
            self.graph.remove(partner);
        }
        self.stats.retired += 1;
        tracing::trace!(pair = ?link.pair, "pair retired");
        removed
    }

    /// Forget a connector that is being removed on its own.
    pub(crate) fn detach_connector(&mut self, pair: PairId, connector: Entity) {
        for (entity, link) in self.pair_members() {
            if link.pair == pair && link.connector == Some(connector) {
                self.set_link(entity, |l| l.connector = None);
            }
        }
    }

    fn set_link(&mut self, entity: Entity, edit: impl FnOnce(&mut PairLink)) {
        if let Ok(mut role) = self.graph.world_mut().get::<&mut Role>(entity) {
            if let Role::Paired(link) = &mut *role {
                edit(link);
            }
        }
    }
}
