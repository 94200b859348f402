//! Scene identity and the two lifecycle traits.
//!
//! [`Scene`] is the object-safe contract the host drives. [`Vignette`] is what
//! a verse author implements; [`SceneController`](super::SceneController)
//! turns any vignette into a scene and enforces the lifecycle rules so the
//! vignette does not have to.

use crate::app::AppContext;
use crate::clock::Tick;
use crate::controls::{ControlId, ControlValue};
use crate::error::VignetteResult;
use crate::pool::Expired;
use crate::render::InstanceRaw;
use crate::state::{PhaseCycle, SceneState, StateChange};

use super::context::SceneCtx;

/// Unique identifier for a scene.
///
/// Scene IDs are strings that name a verse in the [`SceneHost`](super::SceneHost)
/// navigation order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(pub(crate) String);

impl SceneId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SceneId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SceneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identity of one initialised scene instance.
///
/// Every `init` receives a fresh generation from the [`AppContext`]. Resource
/// ids, control tokens and deferred callbacks all record the generation that
/// created them and are ignored once it is no longer current.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u32);

impl Generation {
    pub const FIRST: Generation = Generation(1);

    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1).max(1))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Snapshot of a scene's bookkeeping, for hosts, logs and tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneStats {
    /// `Debug` rendering of the current state.
    pub state: String,
    /// Live timed objects (pair members count individually).
    pub live_objects: usize,
    /// All nodes in the graph, timed or static.
    pub nodes: usize,
    pub resources_live: usize,
    pub resources_allocated: usize,
    pub resources_released: usize,
    pub pending_timers: usize,
    pub active_tweens: usize,
    pub controls: usize,
    pub transitions: u64,
    pub spawn_refusals: usize,
}

/// What a `dispose` call tore down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisposeReport {
    /// `false` when the call was a no-op on an inactive scene.
    pub performed: bool,
    pub timers_cancelled: usize,
    pub tweens_cancelled: usize,
    pub listeners_released: usize,
    pub nodes_removed: usize,
    /// Resources allocated over the scene's whole lifetime.
    pub allocated: usize,
    /// Resources released over the scene's whole lifetime.
    pub released: usize,
}

impl DisposeReport {
    /// Every allocation was matched by exactly one release.
    pub fn is_balanced(&self) -> bool {
        self.allocated == self.released
    }
}

/// Object-safe scene lifecycle driven by the host.
pub trait Scene {
    fn id(&self) -> &SceneId;

    /// Generation of the live instance, `None` before init and after dispose.
    fn generation(&self) -> Option<Generation>;

    /// Build the object graph and register controls.
    fn init(&mut self, app: &mut AppContext) -> VignetteResult<()>;

    /// Advance one frame by `dt` seconds.
    fn update(&mut self, app: &mut AppContext, dt: f32);

    /// Queue a control event; it is applied at the start of the next update.
    fn control(&mut self, id: ControlId, value: ControlValue);

    /// Release everything `init` and later frames created. Idempotent.
    fn dispose(&mut self, app: &mut AppContext) -> DisposeReport;

    fn is_disposed(&self) -> bool;

    /// Append this frame's drawable instances to `out`.
    fn instances(&self, out: &mut Vec<InstanceRaw>);

    /// Tick of the last completed update.
    fn last_tick(&self) -> Option<Tick>;

    fn stats(&self) -> SceneStats;
}

/// Behaviour of one verse.
///
/// Hooks run inside [`SceneController::update`](super::SceneController) in a
/// fixed order: control actions, elapsed-phase transitions and deferred
/// messages first, then expiry, then [`advance`](Vignette::advance). State
/// changes requested through [`SceneCtx::request`] are applied between hooks
/// and reported back through [`on_transition`](Vignette::on_transition).
pub trait Vignette: Sized + 'static {
    type State: SceneState;
    /// Control actions, bound to widgets in `init`.
    type Action: Copy + std::fmt::Debug + 'static;
    /// Payload of deferred callbacks and tween completions.
    type Message: std::fmt::Debug + 'static;

    fn initial_state(&self) -> Self::State;

    /// Timed phase loop, for vignettes that advance on their own.
    fn phase_cycle(&self, _ctx: &SceneCtx<'_, Self>) -> Option<PhaseCycle<Self::State>> {
        None
    }

    fn init(&mut self, ctx: &mut SceneCtx<'_, Self>) -> VignetteResult<()>;

    fn on_action(&mut self, _ctx: &mut SceneCtx<'_, Self>, _action: Self::Action, _value: ControlValue) {}

    fn on_transition(&mut self, _ctx: &mut SceneCtx<'_, Self>, _change: &StateChange<Self::State>) {}

    fn on_message(&mut self, _ctx: &mut SceneCtx<'_, Self>, _message: Self::Message) {}

    fn on_expired(&mut self, _ctx: &mut SceneCtx<'_, Self>, _expired: &[Expired]) {}

    /// Continuous motion for this frame.
    fn advance(&mut self, _ctx: &mut SceneCtx<'_, Self>, _tick: Tick) {}

    /// Forget any entity handles. The controller has already released them.
    fn on_dispose(&mut self) {}
}
