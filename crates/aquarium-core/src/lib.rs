//! Boid simulation core for the aquarium.
//!
//! A [`World`] owns every entity in the tank. Each [`World::step`] prunes the dead, admits
//! entities queued since the previous step, rebuilds the pairwise distance cache and lets every
//! fish think against the neighbors it perceives. Motion is integrated separately by
//! [`World::render`], and a [`FrameScheduler`] drives both at their own cadence.

mod arena;
mod catalog;
mod config;
mod entity;
mod fish;
mod scheduler;
mod vector;
mod world;

use serde::{Deserialize, Serialize};

pub use arena::EntityArena;
pub use catalog::{
    BubbleType, ButtonSpec, Catalog, CatalogError, FeatureType, FishType, ValueRange, sample,
    uniform,
};
pub use config::{AquariumConfig, CadenceConfig, WorldError};
pub use entity::{ButtonAction, Entity, EntityId, EntityKind, EntityTag};
pub use fish::{Fish, Mating, Meal, Neighbor, Offspring, Sex, ThinkContext, ThinkOutcome};
pub use scheduler::{FRAME_PERIOD, FrameClock, FrameReport, FrameScheduler, Subsystem, Ticker};
pub use vector::{DEGENERATE_LENGTH, Vector2};
pub use world::World;

/// Simulation clock (steps processed since the world was created).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Aggregate metrics for one step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickSummary {
    pub tick: Tick,
    pub entity_count: usize,
    pub fish_count: usize,
    /// Fish admitted from the queue this step.
    pub births: usize,
    /// Fish pruned this step.
    pub deaths: usize,
    pub score: f32,
    pub hiscore: f32,
}

/// Sink for the single persisted scalar: the hi-score.
pub trait HiscoreStore: Send {
    /// Previously recorded hi-score, if any.
    fn load(&self) -> Option<f32>;
    fn record(&mut self, hiscore: f32);
}

/// Store that remembers nothing.
#[derive(Debug, Default)]
pub struct NullHiscore;

impl HiscoreStore for NullHiscore {
    fn load(&self) -> Option<f32> {
        None
    }

    fn record(&mut self, _hiscore: f32) {}
}
