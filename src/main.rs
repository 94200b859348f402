use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing::Level;

use vignette::{AppConfig, AppContext, HeadlessSurface, SceneHost, vignettes};

/// Walk every built-in verse headlessly, press its controls, and check that
/// each scene releases everything it allocated.
#[derive(Parser, Debug)]
#[command(name = "vignette", version)]
struct Cli {
    /// JSON configuration file. Missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Frames to run on each verse.
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Override the fade-to-black duration between verses, in seconds.
    #[arg(long)]
    fade: Option<f32>,

    /// Run against a surface that refuses to attach, to see the fallback path.
    #[arg(long, default_value_t = false)]
    no_surface: bool,

    /// Log more (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(fade) = cli.fade {
        config.fade_duration = fade;
    }
    config.validate().context("invalid configuration")?;

    let surface = if cli.no_surface {
        HeadlessSurface::unavailable("no display attached")
    } else {
        HeadlessSurface::new()
    };
    let surface_stats = surface.stats();
    let dt = config.fixed_dt;
    let mut app = AppContext::new(surface, config);
    let mut host = SceneHost::new();
    vignettes::register_builtin(&mut host);

    let verses = host.verses().to_vec();
    for (index, verse) in verses.iter().enumerate() {
        if index == 0 {
            if let Err(err) = host.load_scene(&mut app, verse.clone()) {
                if !err.is_init_failure() {
                    return Err(err).context("load first verse");
                }
            }
        } else {
            host.next(&app);
            while host.is_transitioning() {
                host.frame(&mut app, dt);
            }
        }

        if let Some(message) = host.fallback() {
            tracing::warn!(verse = %verse, reason = message, "verse unavailable");
            continue;
        }

        let labels: Vec<String> = host
            .active()
            .and_then(|scene| scene.generation())
            .map(|generation| {
                app.controls
                    .controls()
                    .iter()
                    .filter(|c| c.owner == generation)
                    .map(|c| c.kind.label().to_string())
                    .collect()
            })
            .unwrap_or_default();

        for frame in 0..cli.frames {
            if frame == cli.frames / 2 {
                for label in &labels {
                    host.press(&mut app, label);
                }
            }
            host.frame(&mut app, dt);
        }

        if let Some(scene) = host.active() {
            let stats = scene.stats();
            tracing::info!(
                verse = %verse,
                state = %stats.state,
                live = stats.live_objects,
                nodes = stats.nodes,
                resources = stats.resources_live,
                refused = stats.spawn_refusals,
                transitions = stats.transitions,
                "verse finished"
            );
        }
    }

    host.shutdown(&mut app);

    let stats = surface_stats.borrow();
    tracing::info!(
        frames = stats.frames,
        uploads = stats.uploads,
        releases = stats.releases,
        "tour complete"
    );
    if !stats.live.is_empty() || stats.bad_releases > 0 {
        anyhow::bail!(
            "resource leak: {} still live, {} bad releases",
            stats.live.len(),
            stats.bad_releases
        );
    }
    Ok(())
}
