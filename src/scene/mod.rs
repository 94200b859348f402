//! Scene lifecycle for verse vignettes.
//!
//! This module provides the per-scene lifecycle: identity, the state-driven
//! [`Vignette`] contract, the [`SceneController`] that enforces init, update
//! and dispose ordering, and the [`SceneHost`] that navigates between verses.
//!
//! # Overview
//!
//! A vignette is a self-contained unit of content. Each one has:
//! - Its own object graph, built in `init` and released in `dispose`
//! - Its own state machine, driven by controls, timers and elapsed phases
//! - Its own frame logic (`advance`)
//! - Its own controls, registered through a token registry
//!
//! # Example
//!
//! ```
//! use vignette::{
//!     AppConfig, AppContext, ControlKind, HeadlessSurface, SceneCtx, SceneHost, SceneState,
//!     Vignette, VignetteResult,
//! };
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq)]
//! enum Lamp {
//!     Off,
//!     On,
//! }
//!
//! impl SceneState for Lamp {}
//!
//! struct Switch;
//!
//! impl Vignette for Switch {
//!     type State = Lamp;
//!     type Action = ();
//!     type Message = ();
//!
//!     fn initial_state(&self) -> Lamp {
//!         Lamp::Off
//!     }
//!
//!     fn init(&mut self, ctx: &mut SceneCtx<'_, Self>) -> VignetteResult<()> {
//!         ctx.register_control(ControlKind::button("Toggle"), ());
//!         Ok(())
//!     }
//!
//!     fn on_action(&mut self, ctx: &mut SceneCtx<'_, Self>, _: (), _: vignette::ControlValue) {
//!         let next = if ctx.state() == Lamp::Off { Lamp::On } else { Lamp::Off };
//!         ctx.request(next);
//!     }
//! }
//!
//! let mut app = AppContext::new(HeadlessSurface::new(), AppConfig::default());
//! let mut host = SceneHost::new();
//! host.register_vignette("lamp", |_| Switch);
//! host.load_scene(&mut app, "lamp").unwrap();
//! host.press(&mut app, "Toggle");
//! host.frame(&mut app, 0.016);
//! assert_eq!(host.active().unwrap().stats().state, "On");
//! host.shutdown(&mut app);
//! ```

mod context;
mod controller;
mod manager;
pub mod scene;
mod transition;

pub use context::SceneCtx;
pub use controller::{Lifecycle, SceneController};
pub use manager::SceneHost;
pub use scene::{DisposeReport, Generation, Scene, SceneId, SceneStats, Vignette};
pub use transition::{ActiveTransition, Easing, Transition, TransitionKind, TransitionPhase};
