//! Boid state, perception and the per-tick decision engine.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::arena::EntityArena;
use crate::catalog::{FishType, sample};
use crate::config::AquariumConfig;
use crate::entity::{Entity, EntityId, EntityKind};
use crate::vector::{DEGENERATE_LENGTH, Vector2};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Sex {
    Male,
    Female,
}

/// Fish-only state carried by [`EntityKind::Fish`].
#[derive(Debug, Clone, PartialEq)]
pub struct Fish {
    /// Species value; `floor(value)` is the species bucket.
    pub value: f32,
    pub max_age: f32,
    /// Ticks since creation.
    pub age: u32,
    pub age_stage: u32,
    pub max_size: f32,
    pub average_speed: f32,
    pub energy: f32,
    pub breed_time: f32,
    /// Ticks left before the fish may court again.
    pub breed_cooldown: f32,
    pub acceleration: f32,
    /// Ticks until the next exploration impulse.
    pub randomize_step: u32,
    pub fov_radius: f32,
    pub sex: Sex,
    pub courting_partner: Option<EntityId>,
    pub food_target: Option<EntityId>,
    // Last flocking contributions, kept for perception overlays.
    pub separation: Vector2,
    pub cohesion: Vector2,
    pub alignment: Vector2,
}

impl Fish {
    /// Roll a newborn fish of species `value` from its catalog entry.
    ///
    /// Returns the fish together with its starting body size.
    pub fn from_type(
        value: f32,
        fish_type: &FishType,
        config: &AquariumConfig,
        rng: &mut dyn RngCore,
    ) -> (Self, f32) {
        let max_size = sample(fish_type.size, rng);
        let size = max_size * config.min_size_fraction;
        let breed_time = sample(fish_type.breed_time, rng);
        let fish = Self {
            value,
            max_age: sample(fish_type.max_age, rng),
            age: 0,
            age_stage: 0,
            max_size,
            average_speed: sample(fish_type.avg_speed, rng),
            energy: sample(fish_type.energy, rng),
            breed_time,
            breed_cooldown: breed_time,
            acceleration: 0.0,
            randomize_step: 0,
            fov_radius: size * config.fov_factor,
            sex: if rng.random::<f32>() > 0.5 {
                Sex::Female
            } else {
                Sex::Male
            },
            courting_partner: None,
            food_target: None,
            separation: Vector2::ZERO,
            cohesion: Vector2::ZERO,
            alignment: Vector2::ZERO,
        };
        (fish, size)
    }

    #[must_use]
    pub fn species(&self) -> i64 {
        self.value.floor() as i64
    }

    #[must_use]
    pub fn same_species(&self, other: &Self) -> bool {
        self.value.floor() == other.value.floor()
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        (self.age as f32) < self.max_age
    }

    /// Body size for the current growth stage.
    #[must_use]
    pub fn stage_size(&self, config: &AquariumConfig) -> f32 {
        let progress = self.age_stage as f32 / config.age_stages as f32;
        self.max_size * (config.min_size_fraction + progress * (1.0 - config.min_size_fraction))
    }
}

/// A perceived entity and its distance from the perceiving fish.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: EntityId,
    pub distance: f32,
}

/// Read-only world view handed to [`Entity::think`].
#[derive(Debug, Clone, Copy)]
pub struct ThinkContext<'a> {
    pub config: &'a AquariumConfig,
    pub entities: &'a EntityArena,
    /// Live fish plus fish already queued for admission.
    pub fish_population: usize,
}

/// Food taken during a think call; the world removes it from the pellet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Meal {
    pub food: EntityId,
    pub amount: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offspring {
    pub position: Vector2,
    pub value: f32,
}

/// A completed courtship. `offspring` is `None` when the population cap suppressed the birth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mating {
    pub partner: EntityId,
    pub offspring: Option<Offspring>,
}

/// Side effects of a think call that touch entities other than the thinker.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThinkOutcome {
    pub meal: Option<Meal>,
    pub mating: Option<Mating>,
}

impl Entity {
    /// Field-of-view test: within the perception radius and outside the blind cone behind.
    ///
    /// Always false for entities that are not fish.
    #[must_use]
    pub fn perceives(&self, other: &Entity, distance: f32, config: &AquariumConfig) -> bool {
        let Some(fish) = self.as_fish() else {
            return false;
        };
        if distance > fish.fov_radius {
            return false;
        }
        let backward = self.direction.scaled(-1.0);
        let towards = Vector2::difference(self.position, other.position);
        Vector2::angle_between(backward, towards) > config.fov_rear_half_angle
    }

    /// Run one tick of fish behaviour against already-perceived `neighbors`.
    ///
    /// Only the thinker is mutated; effects on the eaten pellet or the mating partner are
    /// returned for the world to apply. Non-fish entities do nothing.
    pub fn think(
        &mut self,
        me: EntityId,
        neighbors: &[Neighbor],
        ctx: &ThinkContext<'_>,
        rng: &mut dyn RngCore,
    ) -> ThinkOutcome {
        let Entity {
            position,
            size,
            direction: heading,
            speed,
            kind,
            ..
        } = self;
        let EntityKind::Fish(fish) = kind else {
            return ThinkOutcome::default();
        };
        let config = ctx.config;
        let position = *position;
        let mut outcome = ThinkOutcome::default();

        let mut separation = Vector2::ZERO;
        let mut cohesion = Vector2::ZERO;
        let mut alignment = Vector2::ZERO;
        let mut visible = 0usize;
        let mut pursuer: Option<(EntityId, Vector2)> = None;
        let mut nearest_food: Option<(EntityId, f32)> = None;

        for neighbor in neighbors {
            let Some(other) = ctx.entities.get(neighbor.id) else {
                continue;
            };
            let dist = neighbor.distance;
            match &other.kind {
                EntityKind::Fish(other_fish) => {
                    if other_fish.courting_partner == Some(me) {
                        if pursuer.is_none() {
                            pursuer = Some((neighbor.id, other.position));
                        }
                    } else if fish.breed_cooldown <= 0.0
                        && fish.energy > 0.0
                        && fish.courting_partner.is_none()
                        && other_fish.sex != fish.sex
                    {
                        fish.courting_partner = Some(neighbor.id);
                        trace!(?me, partner = ?neighbor.id, "courtship started");
                    }

                    if !fish.same_species(other_fish) {
                        continue;
                    }
                    visible += 1;

                    if dist < DEGENERATE_LENGTH {
                        separation.add(Vector2::new(rng.random::<f32>(), rng.random::<f32>()));
                    } else {
                        separation.add(
                            Vector2::difference(other.position, position)
                                .scaled(1.0 / dist - 1.0 / fish.fov_radius),
                        );
                    }
                    cohesion.add(
                        Vector2::difference(position, other.position).scaled(1.0 / fish.fov_radius),
                    );
                    alignment.add(other.direction);
                }
                EntityKind::Food => {
                    if nearest_food.is_none_or(|(_, best)| dist < best) {
                        nearest_food = Some((neighbor.id, dist));
                    }
                }
                _ => {}
            }
        }
        if let Some((food, _)) = nearest_food {
            fish.food_target = Some(food);
        }

        let mut direction = if visible > 0 {
            let mut flock = separation;
            flock.add(cohesion).add(alignment).scale(1.0 / (3 * visible) as f32);
            flock
        } else {
            *heading
        };

        if fish.randomize_step > 0 {
            fish.randomize_step -= 1;
        } else {
            fish.randomize_step = 10 + rng.random_range(0..10);
            let explore = Vector2::new(
                (0.5 - rng.random::<f32>()) * 2.0,
                (0.5 - rng.random::<f32>()) * 2.0,
            );
            direction.blend(0.2, explore, 0.8);
            fish.acceleration += (0.5 - rng.random::<f32>()) * 0.5;
        }

        if let Some(target_id) = fish.food_target {
            match ctx.entities.get(target_id) {
                Some(target) if matches!(target.kind, EntityKind::Food) => {
                    let food_dir = Vector2::difference(position, target.position);
                    direction.blend(0.4, food_dir, 0.6);
                    fish.acceleration = 1.0;
                    if food_dir.length() < *size {
                        let amount = target.size.min(config.food_bite).max(0.0);
                        fish.energy += amount * config.food_energy_per_unit;
                        fish.food_target = None;
                        outcome.meal = Some(Meal {
                            food: target_id,
                            amount,
                        });
                        trace!(?me, food = ?target_id, amount, "meal");
                    } else if !target.is_alive(config) {
                        fish.food_target = None;
                    }
                }
                _ => {
                    trace!(?me, food = ?target_id, "food target lost");
                    fish.food_target = None;
                }
            }
        }

        if let Some((pursuer_id, pursuer_position)) = pursuer {
            if fish.courting_partner != Some(pursuer_id) {
                let flee_dir = Vector2::difference(pursuer_position, position);
                direction.blend(0.1, flee_dir, 0.9);
                fish.acceleration = 1.0;
            }
        }

        if let Some(partner_id) = fish.courting_partner {
            match ctx.entities.get(partner_id).and_then(|partner| {
                partner
                    .as_fish()
                    .map(|partner_fish| (partner.position, partner_fish.value))
            }) {
                Some((partner_position, partner_value)) => {
                    let chase_dir = Vector2::difference(position, partner_position);
                    direction.blend(0.1, chase_dir, 0.9);
                    fish.acceleration = 1.0;
                    if fish.energy <= 0.0 {
                        fish.courting_partner = None;
                    } else if chase_dir.length() < *size {
                        fish.breed_cooldown = fish.breed_time;
                        let offspring = (ctx.fish_population < config.max_fishes).then(|| {
                            let mut midpoint = position;
                            midpoint.add(partner_position).scale(0.5);
                            Offspring {
                                position: midpoint,
                                value: fish.value + partner_value,
                            }
                        });
                        outcome.mating = Some(Mating {
                            partner: partner_id,
                            offspring,
                        });
                        fish.courting_partner = None;
                    }
                }
                None => {
                    trace!(?me, partner = ?partner_id, "courting partner lost");
                    fish.courting_partner = None;
                }
            }
        }

        if position.length() > config.containment_radius() {
            direction = position.scaled(-1.0);
        }

        fish.acceleration *= 0.9;
        *speed = 0.5 * *speed + fish.average_speed * (1.0 + fish.acceleration * 0.5) * 0.5;
        fish.energy = (fish.energy - *speed / 10.0).max(0.0);
        if fish.energy == 0.0 {
            *speed = speed.min(fish.average_speed);
        }

        direction.normalize();
        heading.x = 0.75 * heading.x + 0.25 * direction.x;
        heading.y = 0.75 * heading.y + 0.225 * direction.y;

        fish.age = fish.age.saturating_add(1);
        let stage = (fish.age as f32 / fish.max_age * config.age_stages as f32).ceil();
        if stage > fish.age_stage as f32 && fish.age_stage < config.age_stages {
            fish.age_stage += 1;
            *size = fish.stage_size(config);
            fish.fov_radius = *size * config.fov_factor;
        }

        fish.breed_cooldown = (fish.breed_cooldown - 1.0).max(0.0);

        fish.separation = separation;
        fish.cohesion = cohesion;
        fish.alignment = alignment;
        outcome
    }
}
