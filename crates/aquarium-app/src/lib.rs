//! Shared application plumbing for the headless aquarium host.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use aquarium_core::{
    AquariumConfig, Catalog, CatalogError, FrameClock, FrameScheduler, TickSummary, World,
    WorldError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub mod hiscore;
pub mod scene;

pub use hiscore::JsonHiscoreFile;
pub use scene::{EntityView, SceneSnapshot};

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Contents of a settings file. Both sections are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppSettings {
    #[serde(default)]
    pub config: AquariumConfig,
    #[serde(default)]
    pub catalog: Catalog,
}

impl AppSettings {
    /// Read and validate a JSON settings file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.config.validate()?;
        self.catalog.validate()?;
        Ok(())
    }
}

/// Knobs for a headless run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub frames: u64,
    /// Pace frames against the wall clock instead of running flat out.
    pub realtime: bool,
    /// Drop a food pellet every this many frames; 0 disables feeding.
    pub feed_every: u64,
}

/// Outcome of [`run`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub frames: u64,
    pub ticks: u64,
    pub food_dropped: usize,
    pub last: Option<TickSummary>,
}

/// Drive `world` through `options.frames` frames using its configured cadence.
pub fn run(world: &mut World, options: &RunOptions) -> RunStats {
    let mut scheduler = FrameScheduler::from_cadence(&world.config().cadence);
    let mut clock = FrameClock::new(Instant::now());
    let mut stats = RunStats::default();

    while stats.frames < options.frames {
        if options.realtime {
            let now = Instant::now();
            if !clock.poll(now) {
                thread::sleep(clock.until_next(now));
                continue;
            }
        }
        if options.feed_every > 0 && stats.frames.is_multiple_of(options.feed_every) {
            drop_food(world);
            stats.food_dropped += 1;
        }
        let report = scheduler.run_frame(world);
        if let Some(summary) = report.tick {
            stats.ticks += 1;
            if summary.tick.0.is_multiple_of(100) {
                info!(
                    tick = summary.tick.0,
                    fish = summary.fish_count,
                    score = summary.score,
                    hiscore = summary.hiscore,
                    "tank status"
                );
            }
            stats.last = Some(summary);
        }
        stats.frames += 1;
    }
    stats
}

/// Drop a pellet near the surface at a random x, as a pointer press would.
fn drop_food(world: &mut World) {
    let half_w = world.config().width * 0.5;
    let y = -world.config().height * 0.4;
    let x = aquarium_core::uniform(world.rng(), -half_w, half_w);
    world.start_food_drag(x, y);
    world.end_food_drag();
    debug!(x, y, "food dropped");
}
