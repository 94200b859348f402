use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vignette::vignettes::{self, Entanglement, Superposition};
use vignette::*;

fn config() -> AppConfig {
    let mut config = AppConfig::default().seed(11);
    config.max_dt = 1.0;
    config
}

fn headless(config: AppConfig) -> (AppContext, Rc<RefCell<SurfaceStats>>) {
    let surface = HeadlessSurface::new();
    let stats = surface.stats();
    (AppContext::new(surface, config), stats)
}

fn press<V: Vignette>(app: &AppContext, scene: &mut SceneController<V>, label: &str) {
    let generation = scene.generation().unwrap();
    let id = app
        .controls
        .controls()
        .iter()
        .find(|c| c.owner == generation && c.kind.label() == label)
        .map(|c| c.id)
        .unwrap();
    scene.control(id, ControlValue::Pressed);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Idle {
    Running,
}

impl SceneState for Idle {}

#[derive(Clone, Copy, Debug)]
enum PairAction {
    Burst,
    Cut,
}

/// Spawns one connected pair at init; `Burst` tries ten singles at once and
/// `Cut` retires the first member of the pair.
struct Pairs {
    lifespan: Option<f32>,
    cap: Option<usize>,
    pair: Option<PairHandle>,
    burst: Vec<Option<Entity>>,
}

impl Pairs {
    fn new(lifespan: Option<f32>, cap: Option<usize>) -> Self {
        Self {
            lifespan,
            cap,
            pair: None,
            burst: Vec::new(),
        }
    }
}

impl Vignette for Pairs {
    type State = Idle;
    type Action = PairAction;
    type Message = ();

    fn initial_state(&self) -> Idle {
        Idle::Running
    }

    fn init(&mut self, ctx: &mut SceneCtx<'_, Self>) -> VignetteResult<()> {
        ctx.set_cap(self.cap);
        let spawn = Spawn::new("member", Shape::Sphere, Color::CLOUD);
        self.pair = ctx.spawn_pair(Vec3::ZERO, Vec3::X, spawn, self.lifespan, Some(Color::WHITE));
        ctx.register_control(ControlKind::button("Burst"), PairAction::Burst);
        ctx.register_control(ControlKind::button("Cut"), PairAction::Cut);
        Ok(())
    }

    fn on_action(&mut self, ctx: &mut SceneCtx<'_, Self>, action: PairAction, _value: ControlValue) {
        match action {
            PairAction::Burst => {
                self.burst = (0..10)
                    .map(|i| {
                        let spawn = Spawn::new("burst", Shape::Cube, Color::UP);
                        ctx.spawn(Vec3::Y * i as f32, spawn, None)
                    })
                    .collect();
            }
            PairAction::Cut => {
                if let Some(pair) = self.pair {
                    ctx.retire(pair.a);
                }
            }
        }
    }
}

#[test]
fn pair_members_expire_together_with_their_connector() {
    let (mut app, _) = headless(config());
    let mut scene = SceneController::new("pairs", Pairs::new(Some(1.0), None));
    scene.init(&mut app).unwrap();
    let pair = scene.vignette().pair.unwrap();
    let connector = pair.connector.unwrap();

    scene.update(&mut app, 0.5);
    let pool = scene.pool().unwrap();
    assert!(pool.is_live(pair.a) && pool.is_live(pair.b));
    assert!(pool.graph().contains(connector));

    scene.update(&mut app, 0.6);
    let pool = scene.pool().unwrap();
    assert!(!pool.graph().contains(pair.a));
    assert!(!pool.graph().contains(pair.b));
    assert!(!pool.graph().contains(connector));
    assert_eq!(pool.live_count(), 0);
    assert!(scene.dispose(&mut app).is_balanced());
}

#[test]
fn spawns_past_the_cap_are_refused_without_panicking() {
    let (mut app, _) = headless(config());
    let mut scene = SceneController::new("pairs", Pairs::new(None, Some(7)));
    scene.init(&mut app).unwrap();
    assert_eq!(scene.pool().unwrap().live_count(), 2);

    press(&app, &mut scene, "Burst");
    scene.update(&mut app, 0.1);

    let burst = &scene.vignette().burst;
    assert_eq!(burst.iter().filter(|e| e.is_some()).count(), 5);
    assert!(burst[5..].iter().all(Option::is_none));
    let stats = scene.stats();
    assert_eq!(stats.live_objects, 7);
    assert_eq!(stats.spawn_refusals, 5);
    scene.dispose(&mut app);
}

#[test]
fn retiring_one_member_takes_partner_and_connector_in_the_same_update() {
    let (mut app, _) = headless(config());
    let mut scene = SceneController::new("pairs", Pairs::new(None, None));
    scene.init(&mut app).unwrap();
    let pair = scene.vignette().pair.unwrap();

    press(&app, &mut scene, "Cut");
    scene.update(&mut app, 0.1);

    let graph = scene.pool().unwrap().graph();
    assert!(!graph.contains(pair.a));
    assert!(!graph.contains(pair.b));
    assert!(!graph.contains(pair.connector.unwrap()));
    assert!(scene.dispose(&mut app).is_balanced());
}

#[test]
fn entangled_measurement_is_complementary_and_permanent() {
    let (mut app, _) = headless(config());
    let mut scene = SceneController::new("entanglement", Entanglement::new(&app.config));
    scene.init(&mut app).unwrap();

    press(&app, &mut scene, "Measure");
    scene.update(&mut app, 1.0 / 60.0);
    let pair = scene.vignette().pair().unwrap();
    let a = scene.pool().unwrap().outcome(pair.a).unwrap();
    let b = scene.pool().unwrap().outcome(pair.b).unwrap();
    assert_eq!(b, a.complement());

    for _ in 0..30 {
        press(&app, &mut scene, "Measure");
        scene.update(&mut app, 1.0 / 60.0);
    }
    assert_eq!(scene.pool().unwrap().outcome(pair.a), Some(a));
    assert_eq!(scene.pool().unwrap().outcome(pair.b), Some(b));
    scene.dispose(&mut app);
}

#[test]
fn second_dispose_does_nothing() {
    let (mut app, stats) = headless(config());
    let mut scene = SceneController::new("pairs", Pairs::new(Some(3.0), None));
    scene.init(&mut app).unwrap();
    scene.update(&mut app, 0.1);

    let first = scene.dispose(&mut app);
    assert!(first.performed);
    assert!(first.is_balanced());
    assert_eq!(first.listeners_released, 2);
    let releases = stats.borrow().releases;

    let second = scene.dispose(&mut app);
    assert_eq!(second, DisposeReport::default());
    assert_eq!(stats.borrow().releases, releases);
    assert_eq!(scene.lifecycle(), Lifecycle::Disposed);
    assert!(app.controls.is_empty());
}

#[test]
fn lotus_loops_on_schedule_through_the_host() {
    let (mut app, _) = headless(config());
    let mut host = SceneHost::new();
    vignettes::register_builtin(&mut host);
    host.load_scene(&mut app, "lotus").unwrap();
    let initial = host.active().unwrap().stats();
    assert_eq!(initial.state, "Closed");

    let mut changes = Vec::new();
    let mut last = initial.state.clone();
    for _ in 0..(14.0 / 0.25) as usize {
        host.frame(&mut app, 0.25);
        let scene = host.active().unwrap();
        let stats = scene.stats();
        if stats.state != last {
            changes.push((scene.last_tick().unwrap().time, stats.state.clone()));
            last = stats.state;
        }
    }
    let expected: Vec<(f32, String)> = [
        (2.0, "Opening"),
        (6.0, "Open"),
        (9.0, "Emanating"),
        (14.0, "Closed"),
    ]
    .into_iter()
    .map(|(t, s)| (t, s.to_string()))
    .collect();
    assert_eq!(changes, expected);

    let closed = host.active().unwrap().stats();
    assert_eq!(closed.nodes, initial.nodes);
    assert_eq!(closed.live_objects, initial.live_objects);
    assert_eq!(closed.resources_live, initial.resources_live);
    host.shutdown(&mut app);
}

#[test]
fn touring_every_verse_leaks_nothing() {
    let (mut app, stats) = headless(config().fade(0.3));
    let mut host = SceneHost::new();
    vignettes::register_builtin(&mut host);
    let verses = host.verses().len();
    assert_eq!(verses, 4);

    for _ in 0..verses {
        host.next(&app);
        while host.is_transitioning() {
            host.frame(&mut app, 1.0 / 30.0);
        }
        for frame in 0..120 {
            if frame == 30 {
                for label in ["Measure", "Decay"] {
                    host.press(&mut app, label);
                }
                host.set_slider(&mut app, "Half-life", 1.0);
            }
            host.frame(&mut app, 1.0 / 30.0);
        }
        let live = app.controls.len();
        let owner = host.active().unwrap().generation().unwrap();
        assert_eq!(app.controls.owned_by(owner), live);
    }
    assert_eq!(app.current_verse(), Some(3));

    host.shutdown(&mut app);
    let stats = stats.borrow();
    assert!(stats.live.is_empty());
    assert_eq!(stats.bad_releases, 0);
    assert_eq!(stats.uploads, stats.releases);
    assert!(app.controls.is_empty());
}

#[test]
fn fade_swaps_scenes_at_the_midpoint() {
    let (mut app, stats) = headless(config().fade(0.5));
    let mut host = SceneHost::new();
    vignettes::register_builtin(&mut host);
    host.load_scene(&mut app, "superposition").unwrap();

    host.next(&app);
    host.frame(&mut app, 0.1);
    assert_eq!(host.active_scene().unwrap().as_str(), "superposition");
    assert!(stats.borrow().last_overlay.is_some());

    let mut swapped_at = None;
    for frame in 0..10 {
        host.frame(&mut app, 0.1);
        if swapped_at.is_none() && host.active_scene().unwrap().as_str() == "entanglement" {
            swapped_at = Some(frame);
        }
    }
    assert!(swapped_at.is_some());
    assert!(!host.is_transitioning());
    assert_eq!(stats.borrow().attach_count, 2);
    assert!(stats.borrow().last_overlay.is_none());
}

#[derive(Clone, Copy, Debug)]
enum Late {
    Timer,
    Tween,
}

/// Arms a timer and a tween completion that land well after the scene is
/// replaced.
struct Echo {
    heard: Rc<Cell<usize>>,
}

impl Vignette for Echo {
    type State = Idle;
    type Action = ();
    type Message = Late;

    fn initial_state(&self) -> Idle {
        Idle::Running
    }

    fn init(&mut self, ctx: &mut SceneCtx<'_, Self>) -> VignetteResult<()> {
        ctx.after(1.0, Late::Timer);
        let node = ctx.add_static("node", Shape::Cube, Color::WHITE, Transform::new());
        ctx.animate_to(node, TweenTarget::Scale(2.0), 1.0, Easing::Linear, Some(Late::Tween));
        Ok(())
    }

    fn on_message(&mut self, _ctx: &mut SceneCtx<'_, Self>, _message: Late) {
        self.heard.set(self.heard.get() + 1);
    }
}

#[test]
fn callbacks_of_a_replaced_scene_never_fire() {
    let heard = Rc::new(Cell::new(0));
    let (mut app, _) = headless(config());
    let mut host = SceneHost::new();
    let counter = Rc::clone(&heard);
    host.register_vignette("echo", move |_| Echo {
        heard: Rc::clone(&counter),
    });
    vignettes::register_builtin(&mut host);

    host.load_scene(&mut app, "echo").unwrap();
    for _ in 0..5 {
        host.frame(&mut app, 0.1);
    }
    assert_eq!(host.active().unwrap().stats().pending_timers, 1);
    assert_eq!(host.active().unwrap().stats().active_tweens, 1);

    host.load_scene(&mut app, "lotus").unwrap();
    for _ in 0..30 {
        host.frame(&mut app, 0.1);
    }
    assert_eq!(heard.get(), 0);

    host.load_scene(&mut app, "echo").unwrap();
    for _ in 0..12 {
        host.frame(&mut app, 0.1);
    }
    assert_eq!(heard.get(), 2);
    host.shutdown(&mut app);
}

#[test]
fn control_events_for_a_replaced_scene_are_dropped() {
    let (mut app, _) = headless(config());
    let mut host = SceneHost::new();
    vignettes::register_builtin(&mut host);

    host.load_scene(&mut app, "entanglement").unwrap();
    let stale = app.controls.find("Reset").unwrap().id;

    host.load_scene(&mut app, "superposition").unwrap();
    assert!(!host.trigger(&mut app, stale, ControlValue::Pressed));
    host.frame(&mut app, 0.1);
    let stats = host.active().unwrap().stats();
    assert_eq!(stats.state, "Superposition");
    assert_eq!(stats.transitions, 0);

    assert!(host.press(&mut app, "Measure"));
    host.frame(&mut app, 0.1);
    assert_eq!(host.active().unwrap().stats().state, "Collapsed");
    host.shutdown(&mut app);
}

#[test]
fn repeated_measure_is_idempotent_through_the_host() {
    let (mut app, _) = headless(config());
    let mut host = SceneHost::new();
    host.register_vignette("superposition", Superposition::new);
    host.load_scene(&mut app, "superposition").unwrap();

    for _ in 0..4 {
        host.press(&mut app, "Measure");
        host.frame(&mut app, 0.1);
    }
    let stats = host.active().unwrap().stats();
    assert_eq!(stats.state, "Collapsed");
    assert_eq!(stats.transitions, 1);
    host.shutdown(&mut app);
}

#[test]
fn unavailable_surface_shows_a_fallback_and_navigation_survives() {
    let surface = HeadlessSurface::unavailable("GPU lost");
    let stats = surface.stats();
    let mut app = AppContext::new(surface, config());
    let mut host = SceneHost::new();
    vignettes::register_builtin(&mut host);

    let err = host.load_scene(&mut app, "superposition").unwrap_err();
    assert!(err.is_init_failure());
    assert!(host.active().is_none());
    let message = host.fallback().unwrap().to_string();
    assert!(message.contains("superposition"));
    assert!(message.contains("GPU lost"));

    host.frame(&mut app, 0.1);
    assert_eq!(stats.borrow().last_fallback.as_deref(), Some(message.as_str()));

    host.next(&app);
    host.frame(&mut app, 0.1);
    assert!(host.active().is_none());
    assert_eq!(app.current_verse(), Some(1));
    assert!(host.fallback().unwrap().contains("entanglement"));
    assert!(app.controls.is_empty());
    assert!(stats.borrow().live.is_empty());
}

#[test]
fn unknown_scene_is_an_error_not_a_fallback() {
    let (mut app, _) = headless(config());
    let mut host = SceneHost::new();
    vignettes::register_builtin(&mut host);
    host.load_scene(&mut app, "lotus").unwrap();

    let err = host.load_scene(&mut app, "nowhere").unwrap_err();
    assert!(matches!(err, VignetteError::UnknownScene(_)));
    assert!(!err.is_init_failure());
    assert_eq!(host.active_scene().unwrap().as_str(), "lotus");
    assert!(host.switch_to("nowhere").is_err());
    host.shutdown(&mut app);
}
