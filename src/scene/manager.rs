//! Scene host for registering verses and switching between them.

use std::collections::HashMap;

use super::controller::SceneController;
use super::scene::{Scene, SceneId, Vignette};
use super::transition::{ActiveTransition, Transition};
use crate::app::AppContext;
use crate::config::AppConfig;
use crate::controls::{ControlId, ControlValue};
use crate::error::{VignetteError, VignetteResult};
use crate::render::{FramePacket, InstanceRaw};

type SceneFactory = Box<dyn Fn(&AppConfig) -> Box<dyn Scene>>;

/// Owns the verse list and the single live scene.
///
/// The host is responsible for:
/// - Storing a factory per registered verse, in navigation order
/// - Disposing the outgoing scene before the incoming one initialises
/// - Running navigation transitions
/// - Routing control events to the scene that registered them
/// - Handing each frame to the render surface
///
/// At most one scene is live at any time. An initialization failure leaves
/// no scene live and shows a fallback message instead; navigation keeps
/// working.
///
/// # Example
///
/// ```
/// use vignette::{AppConfig, AppContext, HeadlessSurface, SceneHost};
///
/// let mut app = AppContext::new(HeadlessSurface::new(), AppConfig::default());
/// let mut host = SceneHost::new();
/// vignette::vignettes::register_builtin(&mut host);
///
/// host.load_scene(&mut app, "superposition").unwrap();
/// host.frame(&mut app, 1.0 / 60.0);
/// host.next(&app);
/// host.frame(&mut app, 1.0 / 60.0);
/// assert_eq!(host.active_scene().map(|id| id.as_str()), Some("entanglement"));
/// host.shutdown(&mut app);
/// ```
#[derive(Default)]
pub struct SceneHost {
    factories: HashMap<SceneId, SceneFactory>,

    /// Navigation order.
    order: Vec<SceneId>,

    active: Option<Box<dyn Scene>>,

    /// Active transition state (if any).
    transition: Option<ActiveTransition>,

    /// Queued scene switch (processed at start of next update).
    pending_switch: Option<(SceneId, Transition)>,

    /// Shown instead of a scene after an initialization failure.
    fallback: Option<String>,

    /// Reused instance buffer.
    instances: Vec<InstanceRaw>,
}

impl SceneHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scene factory. Registration order is navigation order;
    /// registering an existing id replaces its factory in place.
    pub fn register(
        &mut self,
        id: impl Into<SceneId>,
        factory: impl Fn(&AppConfig) -> Box<dyn Scene> + 'static,
    ) {
        let id = id.into();
        if !self.order.contains(&id) {
            self.order.push(id.clone());
        }
        self.factories.insert(id, Box::new(factory));
    }

    /// Register a vignette, wrapped in its lifecycle controller.
    pub fn register_vignette<V: Vignette>(
        &mut self,
        id: impl Into<SceneId>,
        make: impl Fn(&AppConfig) -> V + 'static,
    ) {
        let id = id.into();
        let scene_id = id.clone();
        self.register(id, move |config| {
            Box::new(SceneController::new(scene_id.clone(), make(config)))
        });
    }

    /// Registered verses in navigation order.
    pub fn verses(&self) -> &[SceneId] {
        &self.order
    }

    pub fn active_scene(&self) -> Option<&SceneId> {
        self.active.as_ref().map(|s| s.id())
    }

    pub fn active(&self) -> Option<&dyn Scene> {
        self.active.as_deref()
    }

    pub fn fallback(&self) -> Option<&str> {
        self.fallback.as_deref()
    }

    /// Check if a transition is currently in progress.
    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some() || self.pending_switch.is_some()
    }

    /// Dispose the current scene and initialise `id` immediately.
    ///
    /// Any transition in flight is abandoned. An init error is returned and
    /// also recorded as the fallback message.
    #[tracing::instrument(skip(self, app, id), fields(target = tracing::field::Empty))]
    pub fn load_scene(&mut self, app: &mut AppContext, id: impl Into<SceneId>) -> VignetteResult<()> {
        let id = id.into();
        tracing::Span::current().record("target", id.as_str());
        if !self.factories.contains_key(&id) {
            return Err(VignetteError::unknown_scene(id.as_str()));
        }
        self.transition = None;
        self.pending_switch = None;
        self.swap(app, &id)
    }

    /// Request a scene switch (instant).
    pub fn switch_to(&mut self, id: impl Into<SceneId>) -> VignetteResult<()> {
        self.switch_to_with(id, Transition::instant())
    }

    /// Request a scene switch with a transition effect.
    ///
    /// The switch is queued and processed at the start of the next update.
    pub fn switch_to_with(&mut self, id: impl Into<SceneId>, transition: Transition) -> VignetteResult<()> {
        let id = id.into();
        if !self.factories.contains_key(&id) {
            tracing::warn!(scene = %id, "switch to unknown scene");
            return Err(VignetteError::unknown_scene(id.as_str()));
        }
        self.pending_switch = Some((id, transition));
        Ok(())
    }

    /// Queue a switch to the next verse, wrapping at the end.
    pub fn next(&mut self, app: &AppContext) {
        self.step(app, 1);
    }

    /// Queue a switch to the previous verse, wrapping at the start.
    pub fn previous(&mut self, app: &AppContext) {
        self.step(app, -1);
    }

    fn step(&mut self, app: &AppContext, delta: isize) {
        if self.order.is_empty() {
            return;
        }
        let len = self.order.len() as isize;
        let target = match app.current_verse() {
            Some(current) => (current as isize + delta).rem_euclid(len),
            None => 0,
        } as usize;
        let transition = Transition::from_fade_duration(app.config.fade_duration);
        let id = self.order[target].clone();
        tracing::info!(verse = target, scene = %id, "navigating");
        self.pending_switch = Some((id, transition));
    }

    /// Route a control event to the live scene.
    ///
    /// Events for controls that do not exist, or that belong to a scene
    /// instance that is no longer live, are dropped. Returns whether the
    /// event was delivered.
    pub fn trigger(&mut self, app: &mut AppContext, id: ControlId, value: ControlValue) -> bool {
        let Some(scene) = self.active.as_mut() else {
            return false;
        };
        match app.controls.resolve(id, value) {
            Some((owner, value)) if Some(owner) == scene.generation() => {
                scene.control(id, value);
                true
            }
            _ => {
                tracing::trace!(?id, "control event for a stale or unknown control");
                false
            }
        }
    }

    /// Trigger the live scene's control labelled `label`.
    pub fn press(&mut self, app: &mut AppContext, label: &str) -> bool {
        self.set_control(app, label, ControlValue::Pressed)
    }

    /// Move the live scene's slider labelled `label`.
    pub fn set_slider(&mut self, app: &mut AppContext, label: &str, value: f32) -> bool {
        self.set_control(app, label, ControlValue::Value(value))
    }

    fn set_control(&mut self, app: &mut AppContext, label: &str, value: ControlValue) -> bool {
        let Some(generation) = self.active.as_ref().and_then(|s| s.generation()) else {
            return false;
        };
        let id = app
            .controls
            .controls()
            .iter()
            .find(|c| c.owner == generation && c.kind.label() == label)
            .map(|c| c.id);
        match id {
            Some(id) => self.trigger(app, id, value),
            None => false,
        }
    }

    /// Process pending switches, advance the transition, then update the
    /// live scene.
    pub fn update(&mut self, app: &mut AppContext, dt: f32) {
        if let Some((target, transition)) = self.pending_switch.take() {
            self.transition = Some(ActiveTransition::new(transition, target));
        }

        if let Some(active) = self.transition.as_mut() {
            let mut completed = active.advance(dt);
            if active.is_midpoint() {
                let target = active.target.clone();
                completed = active.finish_midpoint();
                if let Err(err) = self.swap(app, &target) {
                    tracing::warn!(scene = %target, %err, "showing fallback");
                }
            }
            if completed {
                self.transition = None;
            }
        }

        if let Some(scene) = self.active.as_mut() {
            scene.update(app, dt);
        }
    }

    /// Hand the current frame to the render surface.
    pub fn render(&mut self, app: &mut AppContext) {
        self.instances.clear();
        if let Some(scene) = &self.active {
            scene.instances(&mut self.instances);
        }
        let frame = FramePacket {
            scene: self.active.as_ref().map(|s| s.id()),
            tick: self.active.as_ref().and_then(|s| s.last_tick()),
            instances: &self.instances,
            overlay: self.transition.as_ref().and_then(|t| t.overlay()),
            fallback: self.fallback.as_deref(),
        };
        app.surface.render_frame(&frame);
    }

    /// Update then render.
    pub fn frame(&mut self, app: &mut AppContext, dt: f32) {
        self.update(app, dt);
        self.render(app);
    }

    /// Dispose the live scene and forget any pending navigation.
    pub fn shutdown(&mut self, app: &mut AppContext) {
        self.pending_switch = None;
        self.transition = None;
        if let Some(mut scene) = self.active.take() {
            scene.dispose(app);
        }
    }

    /// Dispose the outgoing scene, then build and initialise `target`.
    fn swap(&mut self, app: &mut AppContext, target: &SceneId) -> VignetteResult<()> {
        if let Some(mut outgoing) = self.active.take() {
            outgoing.dispose(app);
        }
        self.fallback = None;
        app.set_verse(self.order.iter().position(|id| id == target));

        let factory = self
            .factories
            .get(target)
            .ok_or_else(|| VignetteError::unknown_scene(target.as_str()))?;
        let mut scene = factory(&app.config);
        match scene.init(app) {
            Ok(()) => {
                self.active = Some(scene);
                Ok(())
            }
            Err(err) => {
                self.fallback = Some(format!("{target} could not be shown: {err}"));
                tracing::info!(scene = %target, %err, "scene init failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessSurface;
    use crate::scene::SceneCtx;
    use crate::state::SceneState;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Still {
        Only,
    }

    impl SceneState for Still {}

    struct Empty;

    impl Vignette for Empty {
        type State = Still;
        type Action = ();
        type Message = ();

        fn initial_state(&self) -> Still {
            Still::Only
        }

        fn init(&mut self, ctx: &mut SceneCtx<'_, Self>) -> VignetteResult<()> {
            ctx.add_static(
                "backdrop",
                crate::render::Shape::Ring,
                crate::render::Color::WHITE,
                crate::transform::Transform::new(),
            );
            Ok(())
        }
    }

    fn host() -> SceneHost {
        let mut host = SceneHost::new();
        host.register_vignette("one", |_| Empty);
        host.register_vignette("two", |_| Empty);
        host.register_vignette("three", |_| Empty);
        host
    }

    #[test]
    fn unknown_scene_is_an_error() {
        let mut app = AppContext::new(HeadlessSurface::new(), AppConfig::default());
        let mut host = host();
        let err = host.load_scene(&mut app, "nowhere").unwrap_err();
        assert!(matches!(err, VignetteError::UnknownScene(_)));
        assert!(host.switch_to("nowhere").is_err());
    }

    #[test]
    fn navigation_wraps_both_ways() {
        let mut app = AppContext::new(HeadlessSurface::new(), AppConfig::default());
        let mut host = host();
        host.load_scene(&mut app, "three").unwrap();

        host.next(&app);
        host.update(&mut app, 0.016);
        assert_eq!(host.active_scene().unwrap().as_str(), "one");

        host.previous(&app);
        host.update(&mut app, 0.016);
        assert_eq!(host.active_scene().unwrap().as_str(), "three");
        host.shutdown(&mut app);
    }

    #[test]
    fn fade_swaps_at_midpoint() {
        let surface = HeadlessSurface::new();
        let stats = surface.stats();
        let mut app = AppContext::new(surface, AppConfig::default().fade(1.0));
        let mut host = host();
        host.load_scene(&mut app, "one").unwrap();

        host.next(&app);
        host.frame(&mut app, 0.25);
        assert_eq!(host.active_scene().unwrap().as_str(), "one");
        assert!(stats.borrow().last_overlay.is_some());

        host.frame(&mut app, 0.3);
        assert_eq!(host.active_scene().unwrap().as_str(), "two");
        assert!(host.is_transitioning());

        host.frame(&mut app, 0.6);
        assert!(!host.is_transitioning());
        host.frame(&mut app, 0.1);
        assert!(stats.borrow().last_overlay.is_none());
        host.shutdown(&mut app);
        assert_eq!(stats.borrow().live.len(), 0);
    }

    #[test]
    fn init_failure_shows_fallback_and_navigation_recovers() {
        let surface = HeadlessSurface::unavailable("no adapter");
        let stats = surface.stats();
        let mut app = AppContext::new(surface, AppConfig::default());
        let mut host = host();

        assert!(host.load_scene(&mut app, "one").is_err());
        assert!(host.active().is_none());
        host.render(&mut app);
        assert!(stats.borrow().last_fallback.is_some());

        host.next(&app);
        host.update(&mut app, 0.016);
        assert!(host.fallback().unwrap().contains("two"));
    }
}
