use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogError, ValueRange};

/// Errors that can occur when constructing a world.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Frame intervals for each scheduled subsystem. An interval of 0 disables the subsystem.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CadenceConfig {
    pub render: u64,
    pub step: u64,
    pub bubbles: u64,
    pub autobuy: u64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            render: 2,
            step: 10,
            bubbles: 30,
            autobuy: 0,
        }
    }
}

/// Static configuration for an aquarium world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AquariumConfig {
    /// Tank width in viewport pixels. The tank is centred on the origin.
    pub width: f32,
    /// Tank height in viewport pixels.
    pub height: f32,
    /// Optional RNG seed for reproducible worlds.
    pub rng_seed: Option<u64>,
    /// Fish queued by `populate` and the autobuy floor.
    pub initial_fishes: usize,
    /// Breeding is suppressed once this many fish exist.
    pub max_fishes: usize,
    /// Target bubble population maintained by `check_bubbles`.
    pub max_bubbles: usize,
    /// Decorative features laid out by `populate`.
    pub feature_count: usize,
    /// Discrete growth steps between birth and `max_age`.
    pub age_stages: u32,
    /// Fraction of `max_size` a fish has at growth stage 0.
    pub min_size_fraction: f32,
    /// Perception radius as a multiple of fish size.
    pub fov_factor: f32,
    /// Half-angle (radians) of the blind cone behind each fish.
    pub fov_rear_half_angle: f32,
    /// Fraction of a tick applied per motion integration.
    pub update_timestep: f32,
    /// Food size a fish consumes per bite.
    pub food_bite: f32,
    /// Energy gained per unit of food eaten.
    pub food_energy_per_unit: f32,
    pub food_size: ValueRange,
    pub food_speed: ValueRange,
    /// Maximum number of recent tick summaries retained in-memory.
    pub history_capacity: usize,
    /// Draw perception overlays (consumed by renderers).
    pub show_info: bool,
    pub cadence: CadenceConfig,
}

impl Default for AquariumConfig {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 480.0,
            rng_seed: None,
            initial_fishes: 5,
            max_fishes: 20,
            max_bubbles: 10,
            feature_count: 10,
            age_stages: 10,
            min_size_fraction: 0.5,
            fov_factor: 5.0,
            fov_rear_half_angle: 0.4,
            update_timestep: 0.1,
            food_bite: 2.0,
            food_energy_per_unit: 50.0,
            food_size: [20.0, 30.0],
            food_speed: [2.0, 4.0],
            history_capacity: 256,
            show_info: false,
            cadence: CadenceConfig::default(),
        }
    }
}

impl AquariumConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), WorldError> {
        if !(self.width > 0.0 && self.width.is_finite())
            || !(self.height > 0.0 && self.height.is_finite())
        {
            return Err(WorldError::InvalidConfig(
                "tank dimensions must be positive and finite",
            ));
        }
        if self.age_stages == 0 {
            return Err(WorldError::InvalidConfig("age_stages must be non-zero"));
        }
        if !(self.min_size_fraction > 0.0 && self.min_size_fraction <= 1.0) {
            return Err(WorldError::InvalidConfig(
                "min_size_fraction must be in (0, 1]",
            ));
        }
        if !(self.fov_factor > 0.0) {
            return Err(WorldError::InvalidConfig("fov_factor must be positive"));
        }
        if !(0.0..=std::f32::consts::PI).contains(&self.fov_rear_half_angle) {
            return Err(WorldError::InvalidConfig(
                "fov_rear_half_angle must be within [0, pi]",
            ));
        }
        if !(self.update_timestep >= 0.0) {
            return Err(WorldError::InvalidConfig(
                "update_timestep must be non-negative",
            ));
        }
        if !(self.food_bite >= 0.0) || !(self.food_energy_per_unit >= 0.0) {
            return Err(WorldError::InvalidConfig(
                "food bite and energy yield must be non-negative",
            ));
        }
        for [min, max] in [self.food_size, self.food_speed] {
            if !(min >= 0.0) || !(max >= min) || !max.is_finite() {
                return Err(WorldError::InvalidConfig(
                    "food ranges must be finite, non-negative and ordered",
                ));
            }
        }
        if self.food_size[0] <= 0.0 {
            return Err(WorldError::InvalidConfig("food size must be positive"));
        }
        if self.history_capacity == 0 {
            return Err(WorldError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        Ok(())
    }

    /// Returns the configured RNG seed, generating one from entropy if absent.
    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }

    /// Distance from the tank centre beyond which fish turn back.
    #[must_use]
    pub fn containment_radius(&self) -> f32 {
        self.width.min(self.height) * 0.5 * 0.9
    }
}
