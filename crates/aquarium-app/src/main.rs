use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use aquarium_app::{AppSettings, JsonHiscoreFile, RunOptions, SceneSnapshot, run};
use aquarium_core::{HiscoreStore, NullHiscore, World};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "aquarium",
    version,
    about = "Run the aquarium boid simulation without a renderer"
)]
struct Cli {
    /// JSON settings file with optional `config` and `catalog` sections.
    #[arg(long, env = "AQUARIUM_SETTINGS")]
    config: Option<PathBuf>,

    /// Number of 20 ms frames to run.
    #[arg(long, env = "AQUARIUM_FRAMES", default_value_t = 3000)]
    frames: u64,

    /// Seed for a reproducible tank.
    #[arg(long, env = "AQUARIUM_SEED")]
    seed: Option<u64>,

    /// Tank width in pixels.
    #[arg(long)]
    width: Option<f32>,

    /// Tank height in pixels.
    #[arg(long)]
    height: Option<f32>,

    /// Pace frames against the wall clock.
    #[arg(long)]
    realtime: bool,

    /// Drop a food pellet every N frames (0 disables).
    #[arg(long, default_value_t = 0)]
    feed_every: u64,

    /// File holding the persisted hi-score.
    #[arg(long, env = "AQUARIUM_HISCORE")]
    hiscore: Option<PathBuf>,

    /// Write the final scene as JSON to this path.
    #[arg(long)]
    dump: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut world = bootstrap_world(&cli)?;
    info!(
        width = world.config().width,
        height = world.config().height,
        queued = world.pending().len(),
        hiscore = world.hiscore(),
        "Starting aquarium simulation"
    );

    let stats = run(
        &mut world,
        &RunOptions {
            frames: cli.frames,
            realtime: cli.realtime,
            feed_every: cli.feed_every,
        },
    );
    world.flush_hiscore();

    match &stats.last {
        Some(summary) => info!(
            frames = stats.frames,
            tick = summary.tick.0,
            fish = summary.fish_count,
            score = summary.score,
            hiscore = summary.hiscore,
            "Simulation finished"
        ),
        None => warn!(frames = stats.frames, "Simulation finished without stepping"),
    }

    if let Some(path) = &cli.dump {
        let scene = SceneSnapshot::capture(&world);
        let json = serde_json::to_string_pretty(&scene).context("failed to serialize scene")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write scene to {}", path.display()))?;
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn bootstrap_world(cli: &Cli) -> Result<World> {
    let mut settings = match &cli.config {
        Some(path) => AppSettings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => AppSettings::default(),
    };
    if let Some(seed) = cli.seed {
        settings.config.rng_seed = Some(seed);
    }
    if let Some(width) = cli.width {
        settings.config.width = width;
    }
    if let Some(height) = cli.height {
        settings.config.height = height;
    }

    let store: Box<dyn HiscoreStore> = match &cli.hiscore {
        Some(path) => Box::new(JsonHiscoreFile::open(path)),
        None => Box::new(NullHiscore),
    };
    let mut world = World::with_hiscore_store(settings.config, settings.catalog, store)
        .context("invalid aquarium settings")?;
    world.populate();
    Ok(world)
}
