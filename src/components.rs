//! ECS components attached to scene graph nodes.
//!
//! Every node carries a [`Transform`](crate::Transform), an [`Appearance`],
//! its [`NodeResources`] and a [`Role`]. Timed objects additionally carry a
//! [`TimedObject`] and a [`Motion`].

use glam::Vec3;

use crate::pair::PairLink;
use crate::render::{Color, Shape};
use crate::resources::ResourceId;

/// How a node is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Appearance {
    pub shape: Shape,
    pub color: Color,
    pub visible: bool,
}

impl Appearance {
    pub fn new(shape: Shape, color: Color) -> Self {
        Self {
            shape,
            color,
            visible: true,
        }
    }
}

/// GPU resources owned by one node. Removed from the node when released, so
/// a node's resources can only be released once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeResources {
    pub geometry: ResourceId,
    pub material: ResourceId,
}

/// Free-form label vignettes use to find and retire groups of nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tag(pub &'static str);

/// What part a node plays in the scene. Matched exhaustively wherever a
/// node is disposed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Role {
    /// Permanent decoration that lives until the scene is disposed.
    Static,
    /// A lone timed object.
    Single,
    /// One member of a correlated pair.
    Paired(PairLink),
    /// Visual link drawn between the two members of a pair.
    Connector { pair: crate::pair::PairId },
}

impl Role {
    pub fn is_timed(&self) -> bool {
        matches!(self, Role::Single | Role::Paired(_))
    }

    pub fn pair_link(&self) -> Option<&PairLink> {
        match self {
            Role::Paired(link) => Some(link),
            _ => None,
        }
    }
}

/// Birth, age and expiry of an ephemeral object.
///
/// A disposed object has no `TimedObject` any more: it is despawned from the
/// world, and every later lookup through its entity fails.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedObject {
    /// Scene time at spawn.
    pub birth_time: f32,
    pub age: f32,
    /// `None` lives until retired.
    pub lifespan: Option<f32>,
    pub origin: Vec3,
    /// Spawned during the current frame's transition step; skipped by the
    /// next expiry pass so it is drawn at least once.
    pub(crate) fresh: bool,
}

impl TimedObject {
    pub fn new(birth_time: f32, origin: Vec3, lifespan: Option<f32>) -> Self {
        Self {
            birth_time,
            age: 0.0,
            lifespan: lifespan.map(|l| l.max(0.0)),
            origin,
            fresh: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.lifespan.is_some_and(|l| self.age >= l)
    }

    /// Fraction of the lifespan used, `0.0` for immortal objects.
    pub fn progress(&self) -> f32 {
        match self.lifespan {
            Some(l) if l > 0.0 => (self.age / l).clamp(0.0, 1.0),
            Some(_) => 1.0,
            None => 0.0,
        }
    }

    /// Alpha multiplier that fades the object over the last quarter second.
    pub fn fade(&self) -> f32 {
        match self.lifespan {
            Some(l) => {
                let window = l.min(0.25);
                if window <= 0.0 {
                    1.0
                } else {
                    ((l - self.age) / window).clamp(0.0, 1.0)
                }
            }
            None => 1.0,
        }
    }
}

/// Parameters of the default motion formula.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    /// Units per second.
    pub velocity: Vec3,
    /// Radians per second around the local Y axis.
    pub spin: f32,
    /// Free phase offset for vignette-specific formulas.
    pub phase: f32,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            spin: 0.0,
            phase: 0.0,
        }
    }
}

impl Motion {
    pub fn drifting(velocity: Vec3) -> Self {
        Self {
            velocity,
            ..Default::default()
        }
    }

    pub fn spin(mut self, spin: f32) -> Self {
        self.spin = spin;
        self
    }

    pub fn phase(mut self, phase: f32) -> Self {
        self.phase = phase;
        self
    }

    /// The same motion mirrored through the origin, for the second member of
    /// a pair.
    pub fn mirrored(self) -> Self {
        Self {
            velocity: -self.velocity,
            spin: -self.spin,
            phase: self.phase + std::f32::consts::PI,
        }
    }
}
