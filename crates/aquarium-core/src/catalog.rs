//! Declarative parameter tables sampled when fish, features and bubbles are spawned.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::ButtonAction;

/// Inclusive `[min, max]` pair sampled uniformly at spawn time.
pub type ValueRange = [f32; 2];

/// Sample `range` uniformly; a degenerate range yields its lower bound.
pub fn sample(range: ValueRange, rng: &mut dyn RngCore) -> f32 {
    uniform(rng, range[0], range[1])
}

/// Uniform float in `[a, b)`, or `a` when the interval is empty.
pub fn uniform(rng: &mut dyn RngCore, a: f32, b: f32) -> f32 {
    if b > a { rng.random_range(a..b) } else { a }
}

/// Errors raised while loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog defines no {kind} types")]
    MissingTypes { kind: &'static str },
    #[error("{kind} type '{name}' has invalid {field} range [{min}, {max}]")]
    InvalidRange {
        kind: &'static str,
        name: String,
        field: &'static str,
        min: f32,
        max: f32,
    },
    #[error("feature type '{name}' has invalid probability weight {weight}")]
    InvalidWeight { name: String, weight: f32 },
    #[error("button '{name}' must have a positive size inside the unit square")]
    InvalidButton { name: String },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parameter ranges for one fish species. The index in [`Catalog::fish`] is the species bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FishType {
    pub resource_id: String,
    pub size: ValueRange,
    pub max_age: ValueRange,
    pub energy: ValueRange,
    pub avg_speed: ValueRange,
    pub breed_time: ValueRange,
}

/// Decorative feature placed along the tank floor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureType {
    pub resource_id: String,
    /// Relative roulette weight used by feature layout.
    pub probability: f32,
    pub size: ValueRange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BubbleType {
    pub resource_id: String,
    pub size: ValueRange,
    pub speed: ValueRange,
}

/// UI hot-zone in normalized `[0, 1]` tank coordinates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ButtonSpec {
    pub resource_id: String,
    pub position: [f32; 2],
    pub size: f32,
    pub action: ButtonAction,
}

/// Complete set of spawnable types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub fish: Vec<FishType>,
    #[serde(default)]
    pub features: Vec<FeatureType>,
    pub bubbles: Vec<BubbleType>,
    #[serde(default)]
    pub buttons: Vec<ButtonSpec>,
}

fn check_range(
    kind: &'static str,
    name: &str,
    field: &'static str,
    range: ValueRange,
    positive: bool,
) -> Result<(), CatalogError> {
    let [min, max] = range;
    let lower_ok = if positive { min > 0.0 } else { min >= 0.0 };
    if !min.is_finite() || !max.is_finite() || !lower_ok || min > max {
        return Err(CatalogError::InvalidRange {
            kind,
            name: name.to_string(),
            field,
            min,
            max,
        });
    }
    Ok(())
}

impl Catalog {
    /// Parse a JSON catalog and validate it.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Ensure every entry carries usable ranges.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.fish.is_empty() {
            return Err(CatalogError::MissingTypes { kind: "fish" });
        }
        if self.bubbles.is_empty() {
            return Err(CatalogError::MissingTypes { kind: "bubble" });
        }
        for fish in &self.fish {
            let name = fish.resource_id.as_str();
            check_range("fish", name, "size", fish.size, true)?;
            check_range("fish", name, "max_age", fish.max_age, true)?;
            check_range("fish", name, "energy", fish.energy, false)?;
            check_range("fish", name, "avg_speed", fish.avg_speed, false)?;
            check_range("fish", name, "breed_time", fish.breed_time, false)?;
        }
        for feature in &self.features {
            check_range("feature", &feature.resource_id, "size", feature.size, true)?;
            if !feature.probability.is_finite() || feature.probability < 0.0 {
                return Err(CatalogError::InvalidWeight {
                    name: feature.resource_id.clone(),
                    weight: feature.probability,
                });
            }
        }
        for bubble in &self.bubbles {
            check_range("bubble", &bubble.resource_id, "size", bubble.size, true)?;
            check_range("bubble", &bubble.resource_id, "speed", bubble.speed, false)?;
        }
        for button in &self.buttons {
            let inside = button
                .position
                .iter()
                .all(|coord| (0.0..=1.0).contains(coord));
            if !inside || !(button.size > 0.0 && button.size <= 1.0) {
                return Err(CatalogError::InvalidButton {
                    name: button.resource_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Fish type for a species value; out-of-range values clamp to the first/last entry.
    #[must_use]
    pub fn fish_type_for(&self, value: f32) -> Option<&FishType> {
        let last = self.fish.len().checked_sub(1)?;
        let bucket = if value.is_finite() && value > 0.0 {
            (value.floor() as usize).min(last)
        } else {
            0
        };
        self.fish.get(bucket)
    }

    /// Roulette-wheel pick over feature probability weights.
    pub fn pick_feature(&self, rng: &mut dyn RngCore) -> Option<&FeatureType> {
        let total: f32 = self.features.iter().map(|f| f.probability).sum();
        if total <= 0.0 {
            return self.features.first();
        }
        let roll = uniform(rng, 0.0, total);
        let mut current = 0.0;
        for feature in &self.features {
            current += feature.probability;
            if roll < current {
                return Some(feature);
            }
        }
        self.features.last()
    }

    /// Uniformly pick a bubble type.
    pub fn pick_bubble(&self, rng: &mut dyn RngCore) -> Option<&BubbleType> {
        if self.bubbles.is_empty() {
            return None;
        }
        self.bubbles.get(rng.random_range(0..self.bubbles.len()))
    }
}

fn fish(
    resource_id: &str,
    size: ValueRange,
    max_age: ValueRange,
    energy: ValueRange,
    avg_speed: ValueRange,
) -> FishType {
    FishType {
        resource_id: resource_id.to_string(),
        size,
        max_age,
        energy,
        avg_speed,
        breed_time: [10.0, 30.0],
    }
}

fn feature(resource_id: &str, probability: f32, size: ValueRange) -> FeatureType {
    FeatureType {
        resource_id: resource_id.to_string(),
        probability,
        size,
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let short_life = [180.0, 360.0];
        let long_life = [180.0, 600.0];
        Self {
            fish: vec![
                fish("fish1", [30.0, 40.0], long_life, [50.0, 100.0], [10.0, 20.0]),
                fish("pinkfish", [30.0, 40.0], long_life, [100.0, 100.0], [10.0, 30.0]),
                fish("fish2", [30.0, 45.0], long_life, [100.0, 100.0], [10.0, 30.0]),
                fish("fish4", [35.0, 50.0], long_life, [100.0, 100.0], [10.0, 30.0]),
                fish("fish3", [30.0, 45.0], long_life, [100.0, 100.0], [20.0, 30.0]),
                fish("seahorse", [25.0, 35.0], short_life, [100.0, 100.0], [10.0, 20.0]),
                fish("jaguarshark", [50.0, 70.0], short_life, [100.0, 100.0], [20.0, 30.0]),
            ],
            features: vec![
                feature("castle", 0.1, [60.0, 80.0]),
                feature("seaweed1", 0.5, [30.0, 60.0]),
                feature("seaweed2", 0.5, [30.0, 60.0]),
                feature("seaweed3", 0.5, [30.0, 60.0]),
                feature("skull", 0.1, [20.0, 30.0]),
                feature("treasure", 0.1, [30.0, 40.0]),
                feature("sand1", 1.0, [40.0, 60.0]),
                feature("sand2", 1.0, [40.0, 60.0]),
                feature("sand3", 1.0, [40.0, 60.0]),
            ],
            bubbles: vec![
                BubbleType {
                    resource_id: "bubble".to_string(),
                    size: [4.0, 10.0],
                    speed: [10.0, 30.0],
                },
                BubbleType {
                    resource_id: "bubble_large".to_string(),
                    size: [10.0, 16.0],
                    speed: [15.0, 35.0],
                },
            ],
            buttons: vec![ButtonSpec {
                resource_id: "button_food".to_string(),
                position: [0.85, 0.05],
                size: 0.1,
                action: ButtonAction::StartFoodDrag,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn default_catalog_is_valid() {
        let catalog = Catalog::default();
        catalog.validate().expect("default catalog");
        assert_eq!(catalog.fish.len(), 7);
        assert_eq!(catalog.fish[0].resource_id, "fish1");
    }

    #[test]
    fn missing_range_field_is_a_load_error() {
        let json = r#"{
            "fish": [{
                "resource_id": "fish1",
                "size": [30, 40],
                "max_age": [180, 600],
                "energy": [50, 100],
                "breed_time": [10, 30]
            }],
            "bubbles": [{ "resource_id": "bubble", "size": [4, 10], "speed": [10, 30] }]
        }"#;
        let err = Catalog::from_json(json).expect_err("avg_speed is required");
        assert!(matches!(err, CatalogError::Parse(_)));
        assert!(err.to_string().contains("avg_speed"));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut catalog = Catalog::default();
        catalog.bubbles[0].speed = [30.0, 10.0];
        match catalog.validate() {
            Err(CatalogError::InvalidRange { kind, field, .. }) => {
                assert_eq!(kind, "bubble");
                assert_eq!(field, "speed");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn empty_fish_table_is_rejected() {
        let catalog = Catalog {
            fish: Vec::new(),
            ..Catalog::default()
        };
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::MissingTypes { kind: "fish" })
        ));
    }

    #[test]
    fn fish_type_lookup_clamps_species_value() {
        let catalog = Catalog::default();
        assert_eq!(catalog.fish_type_for(0.3).unwrap().resource_id, "fish1");
        assert_eq!(catalog.fish_type_for(1.7).unwrap().resource_id, "pinkfish");
        assert_eq!(catalog.fish_type_for(42.0).unwrap().resource_id, "jaguarshark");
        assert_eq!(catalog.fish_type_for(-2.0).unwrap().resource_id, "fish1");
        assert_eq!(catalog.fish_type_for(f32::NAN).unwrap().resource_id, "fish1");
    }

    #[test]
    fn sampling_stays_inside_range() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..200 {
            let value = sample([2.0, 4.0], &mut rng);
            assert!((2.0..4.0).contains(&value));
        }
        assert_eq!(sample([100.0, 100.0], &mut rng), 100.0);
    }

    #[test]
    fn feature_roulette_respects_zero_weights() {
        let catalog = Catalog {
            features: vec![
                feature("never", 0.0, [1.0, 2.0]),
                feature("always", 1.0, [1.0, 2.0]),
            ],
            ..Catalog::default()
        };
        let mut rng = SmallRng::seed_from_u64(99);
        for _ in 0..100 {
            let picked = catalog.pick_feature(&mut rng).expect("feature");
            assert_eq!(picked.resource_id, "always");
        }
    }
}
