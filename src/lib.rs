//! # Vignette
//!
//! **A frame-driven lifecycle engine for short, looping physics vignettes.**
//!
//! Each verse is a [`Vignette`]: a small state machine that spawns timed
//! objects, pairs them, tweens them and reacts to a handful of buttons and
//! sliders. The engine owns everything the vignette creates, so disposing a
//! scene always releases every resource, listener and pending callback it
//! ever made.
//!
//! ## Quick Start
//!
//! ```
//! use vignette::*;
//!
//! let config = AppConfig::default().fade(0.0);
//! let mut app = AppContext::new(HeadlessSurface::new(), config);
//! let mut host = SceneHost::new();
//! vignettes::register_builtin(&mut host);
//!
//! host.load_scene(&mut app, "entanglement").unwrap();
//! host.press(&mut app, "Measure");
//! host.frame(&mut app, 1.0 / 60.0);
//!
//! host.shutdown(&mut app);
//! ```
//!
//! ## Philosophy
//!
//! - **Explicit context**: no globals. The [`AppContext`] is handed to every lifecycle call.
//! - **One clock**: scene time advances once per tick and nothing reads the wall clock.
//! - **Generations**: every handle remembers the scene instance that made it.
//! - **Symmetric teardown**: whatever `init` registers, `dispose` releases.

mod app;
mod clock;
mod components;
mod config;
mod controls;
mod error;
mod graph;
mod pair;
mod pool;
mod render;
mod resources;
pub mod scene;
mod schedule;
mod state;
mod transform;
mod tween;
pub mod vignettes;

pub use app::AppContext;
pub use clock::{SceneClock, Tick};
pub use components::{Appearance, Motion, NodeResources, Role, Tag, TimedObject};
pub use config::{AppConfig, LifespanRange, LotusPhases, VignetteConfig};
pub use controls::{ControlId, ControlInfo, ControlKind, ControlPanel, ControlToken, ControlValue};
pub use error::{VignetteError, VignetteResult};
pub use graph::{NodeDesc, SceneGraph};
pub use pair::{Measurement, Outcome, PairHandle, PairId, PairLink};
pub use pool::{Expired, PoolStats, Spawn, TimedPool};
pub use render::{
    Color, FramePacket, HeadlessSurface, InstanceRaw, Overlay, RenderSurface, ResourceCommand,
    ResourceKind, Shape, SurfaceStats,
};
pub use resources::{ResourceId, ResourceLedger};
pub use scene::{
    ActiveTransition, DisposeReport, Easing, Generation, Lifecycle, Scene, SceneController,
    SceneCtx, SceneHost, SceneId, SceneStats, Transition, TransitionKind, TransitionPhase,
    Vignette,
};
pub use schedule::{Scheduler, TimerId};
pub use state::{PhaseCycle, SceneState, StateChange, StateMachine, Trigger};
pub use transform::Transform;
pub use tween::{TweenId, TweenTarget, Tweens};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec3};

pub use hecs::Entity;
