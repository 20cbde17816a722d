use std::collections::VecDeque;
use std::fmt;
use std::f32::consts::TAU;

use aquarium_index::{DistanceCache, NeighborhoodIndex};
use rand::{Rng, rngs::SmallRng};
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::arena::EntityArena;
use crate::catalog::{Catalog, sample, uniform};
use crate::config::{AquariumConfig, WorldError};
use crate::entity::{ButtonAction, Entity, EntityId, EntityTag};
use crate::fish::{Fish, Neighbor, ThinkContext, ThinkOutcome};
use crate::vector::Vector2;
use crate::{HiscoreStore, NullHiscore, Tick, TickSummary};

/// Food pellet currently following the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FoodDrag {
    /// Still waiting in the admission queue at this index.
    Pending(usize),
    Live(EntityId),
}

/// The tank: live entities, the admission queue, and the per-tick distance cache.
pub struct World {
    config: AquariumConfig,
    catalog: Catalog,
    tick: Tick,
    rng: SmallRng,
    entities: EntityArena,
    pending: Vec<Entity>,
    distances: DistanceCache,
    score: f32,
    hiscore: f32,
    food_drag: Option<FoodDrag>,
    hiscore_store: Box<dyn HiscoreStore>,
    last_births: usize,
    last_deaths: usize,
    history: VecDeque<TickSummary>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("tick", &self.tick)
            .field("entity_count", &self.entities.len())
            .field("pending", &self.pending.len())
            .field("score", &self.score)
            .field("hiscore", &self.hiscore)
            .finish()
    }
}

impl World {
    /// Instantiate an empty tank.
    pub fn new(config: AquariumConfig, catalog: Catalog) -> Result<Self, WorldError> {
        Self::with_hiscore_store(config, catalog, Box::new(NullHiscore))
    }

    /// Instantiate an empty tank whose hi-score is seeded from and flushed to `store`.
    pub fn with_hiscore_store(
        config: AquariumConfig,
        catalog: Catalog,
        store: Box<dyn HiscoreStore>,
    ) -> Result<Self, WorldError> {
        config.validate()?;
        catalog.validate()?;
        let rng = config.seeded_rng();
        let hiscore = store
            .load()
            .filter(|value| value.is_finite())
            .unwrap_or(0.0);
        let history_capacity = config.history_capacity;
        Ok(Self {
            config,
            catalog,
            tick: Tick::zero(),
            rng,
            entities: EntityArena::new(),
            pending: Vec::new(),
            distances: DistanceCache::new(),
            score: 0.0,
            hiscore,
            food_drag: None,
            hiscore_store: store,
            last_births: 0,
            last_deaths: 0,
            history: VecDeque::with_capacity(history_capacity),
        })
    }

    fn stage_death_cleanup(&mut self) {
        let mut dead: Vec<(usize, EntityId)> = self
            .entities
            .iter()
            .enumerate()
            .filter(|(_, (id, entity))| {
                if !entity.position.is_finite() {
                    warn!(?id, tag = ?entity.tag(), "dropping entity with non-finite position");
                    return true;
                }
                !entity.is_alive(&self.config)
            })
            .map(|(idx, (id, _))| (idx, id))
            .collect();
        if dead.is_empty() {
            return;
        }
        dead.sort_by_key(|(idx, _)| *idx);
        for (_, id) in dead.into_iter().rev() {
            if let Some(entity) = self.entities.remove(id) {
                if entity.tag() == EntityTag::Fish {
                    self.last_deaths += 1;
                }
            }
        }
        if let Some(FoodDrag::Live(id)) = self.food_drag {
            if !self.entities.contains(id) {
                self.food_drag = None;
            }
        }
    }

    fn stage_admit(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let drag_index = match self.food_drag {
            Some(FoodDrag::Pending(index)) => Some(index),
            _ => None,
        };
        for (index, entity) in std::mem::take(&mut self.pending).into_iter().enumerate() {
            if entity.tag() == EntityTag::Fish {
                self.last_births += 1;
            }
            let id = self.entities.insert(entity);
            if drag_index == Some(index) {
                self.food_drag = Some(FoodDrag::Live(id));
            }
        }
    }

    /// Rebuild pairwise distances. Returns false when thinking must be skipped this tick.
    fn stage_distances(&mut self) -> bool {
        if self.entities.is_empty() {
            self.distances.clear();
            return false;
        }
        match self.distances.rebuild(&self.entities.positions()) {
            Ok(()) => true,
            Err(err) => {
                warn!(tick = self.tick.next().0, error = %err, "distance rebuild failed; skipping think");
                false
            }
        }
    }

    fn gather_perception(&self) -> Vec<(usize, Vec<Neighbor>)> {
        let config = &self.config;
        let entities = &self.entities;
        let distances = &self.distances;
        (0..entities.len())
            .into_par_iter()
            .filter_map(|idx| {
                let body = entities.entities().get(idx)?;
                let radius = body.as_fish()?.fov_radius;
                let mut neighbors = Vec::new();
                distances.neighbors_within(idx, radius, &mut |other, distance| {
                    let (Some(other_body), Some(id)) =
                        (entities.entities().get(other), entities.handle_at(other))
                    else {
                        return;
                    };
                    if body.perceives(other_body, distance.0, config) {
                        neighbors.push(Neighbor {
                            id,
                            distance: distance.0,
                        });
                    }
                });
                Some((idx, neighbors))
            })
            .collect()
    }

    fn stage_think(&mut self) {
        let perceived = self.gather_perception();
        let live_fish = self.entities.count(EntityTag::Fish);
        for (idx, neighbors) in perceived {
            let Some(id) = self.entities.handle_at(idx) else {
                continue;
            };
            let Some(mut body) = self.entities.get(id).cloned() else {
                continue;
            };
            let fish_population = live_fish + self.pending_fish();
            let ctx = ThinkContext {
                config: &self.config,
                entities: &self.entities,
                fish_population,
            };
            let outcome = body.think(id, &neighbors, &ctx, &mut self.rng);
            if let Some(slot) = self.entities.get_mut(id) {
                *slot = body;
            }
            self.apply_outcome(id, outcome);
        }
    }

    fn apply_outcome(&mut self, id: EntityId, outcome: ThinkOutcome) {
        if let Some(meal) = outcome.meal {
            if let Some(food) = self.entities.get_mut(meal.food) {
                food.eat(meal.amount);
            }
        }
        let Some(mating) = outcome.mating else {
            return;
        };
        if let Some(partner) = self
            .entities
            .get_mut(mating.partner)
            .and_then(Entity::as_fish_mut)
        {
            partner.breed_cooldown = partner.breed_time;
            if partner.courting_partner == Some(id) {
                partner.courting_partner = None;
            }
        }
        match mating.offspring {
            Some(offspring) => {
                let Vector2 { x, y } = offspring.position;
                if let Some(child) = self.create_fish(x, y, offspring.value) {
                    trace!(parent = ?id, partner = ?mating.partner, value = offspring.value, "offspring queued");
                    self.add_entity(child);
                }
            }
            None => trace!(parent = ?id, "breeding suppressed by population cap"),
        }
    }

    fn stage_score(&mut self) {
        self.score = self
            .entities
            .entities()
            .iter()
            .filter_map(Entity::as_fish)
            .map(|fish| fish.value)
            .sum();
        if self.score > self.hiscore {
            self.hiscore = self.score;
        }
    }

    fn stage_history(&mut self, next_tick: Tick) -> TickSummary {
        let summary = TickSummary {
            tick: next_tick,
            entity_count: self.entities.len(),
            fish_count: self.count_fishes(),
            births: self.last_births,
            deaths: self.last_deaths,
            score: self.score,
            hiscore: self.hiscore,
        };
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary.clone());
        self.last_births = 0;
        self.last_deaths = 0;
        summary
    }

    /// Execute one simulation tick.
    ///
    /// Dead entities are pruned, queued entities admitted, distances rebuilt, then every fish
    /// thinks in dense order against the neighbors it perceives.
    pub fn step(&mut self) -> TickSummary {
        let next_tick = self.tick.next();

        self.stage_death_cleanup();
        self.stage_admit();
        if self.stage_distances() {
            self.stage_think();
        }
        self.stage_score();
        let summary = self.stage_history(next_tick);
        self.tick = next_tick;

        debug!(
            tick = summary.tick.0,
            entities = summary.entity_count,
            fish = summary.fish_count,
            births = summary.births,
            deaths = summary.deaths,
            score = summary.score,
            "tick complete"
        );
        summary
    }

    /// Top the bubble population back up to `max_bubbles`, returning how many were queued.
    ///
    /// Bubbles start anywhere in the tank when none exist yet, otherwise at the floor.
    pub fn check_bubbles(&mut self) -> usize {
        let mut bubbles = self.entities.count(EntityTag::Bubble)
            + self
                .pending
                .iter()
                .filter(|e| e.tag() == EntityTag::Bubble)
                .count();
        let random_y = bubbles == 0;
        let half_w = self.config.width * 0.5;
        let half_h = self.config.height * 0.5;
        let mut spawned = 0;
        while bubbles < self.config.max_bubbles {
            let Some(bubble_type) = self.catalog.pick_bubble(&mut self.rng) else {
                break;
            };
            let x = uniform(&mut self.rng, -half_w, half_w);
            let y = if random_y {
                uniform(&mut self.rng, -half_h, half_h)
            } else {
                half_h
            };
            let size = sample(bubble_type.size, &mut self.rng);
            let speed = sample(bubble_type.speed, &mut self.rng);
            let bubble = Entity::bubble(
                Vector2::new(x, y),
                size,
                speed,
                bubble_type.resource_id.clone(),
            );
            self.pending.push(bubble);
            bubbles += 1;
            spawned += 1;
        }
        spawned
    }

    /// Integrate every live entity along its heading.
    pub fn render(&mut self) {
        let timestep = self.config.update_timestep;
        for entity in self.entities.iter_mut() {
            entity.integrate(timestep);
        }
    }

    /// Queue an entity; it becomes visible at the next step.
    pub fn add_entity(&mut self, entity: Entity) {
        self.pending.push(entity);
    }

    #[must_use]
    pub fn count_fishes(&self) -> usize {
        self.entities.count(EntityTag::Fish)
    }

    fn pending_fish(&self) -> usize {
        self.pending
            .iter()
            .filter(|e| e.tag() == EntityTag::Fish)
            .count()
    }

    /// Build a fish of species `value` from the matching catalog entry.
    ///
    /// Returns `None` only if the catalog has no fish types, which construction rejects.
    pub fn create_fish(&mut self, x: f32, y: f32, value: f32) -> Option<Entity> {
        let fish_type = self.catalog.fish_type_for(value)?;
        let (fish, size) = Fish::from_type(value, fish_type, &self.config, &mut self.rng);
        let angle = self.rng.random_range(0.0..TAU);
        Some(Entity::fish(
            Vector2::new(x, y),
            Vector2::new(angle.cos(), angle.sin()),
            fish_type.resource_id.clone(),
            size,
            fish,
        ))
    }

    /// A fish of random species somewhere in the tank.
    pub fn create_default_fish(&mut self) -> Option<Entity> {
        let half_w = self.config.width * 0.5;
        let half_h = self.config.height * 0.5;
        let x = uniform(&mut self.rng, -half_w, half_w);
        let y = uniform(&mut self.rng, -half_h, half_h);
        let value = self.rng.random::<f32>();
        self.create_fish(x, y, value)
    }

    /// Queue `count` features spread along the tank floor.
    pub fn rebuild_features(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let width = self.config.width;
        let floor = self.config.height * 0.5;
        let slot = 1.0 / count as f32;
        for i in 0..count {
            let Some(feature_type) = self.catalog.pick_feature(&mut self.rng) else {
                return;
            };
            let jitter = slot * 0.5 * self.rng.random::<f32>();
            let x = (i as f32 * slot + jitter) * width - width * 0.5;
            let size = sample(feature_type.size, &mut self.rng);
            let feature = Entity::feature(
                Vector2::new(x, floor),
                size,
                feature_type.resource_id.clone(),
            );
            self.pending.push(feature);
        }
    }

    /// Queue a default fish when the population has fallen below `initial_fishes`.
    pub fn autobuy(&mut self) -> bool {
        if self.count_fishes() + self.pending_fish() >= self.config.initial_fishes {
            return false;
        }
        match self.create_default_fish() {
            Some(fish) => {
                debug!("autobuy queued a fish");
                self.add_entity(fish);
                true
            }
            None => false,
        }
    }

    /// Queue the initial scene: features, bubbles, buttons and starter fish.
    pub fn populate(&mut self) {
        self.rebuild_features(self.config.feature_count);
        self.check_bubbles();
        let buttons: Vec<Entity> = self.catalog.buttons.iter().map(Entity::button).collect();
        self.pending.extend(buttons);
        for _ in 0..self.config.initial_fishes {
            if let Some(fish) = self.create_default_fish() {
                self.add_entity(fish);
            }
        }
        debug!(queued = self.pending.len(), "tank populated");
    }

    /// Dispatch a pointer press.
    ///
    /// `rel` is the press in normalized viewport coordinates, used to hit-test buttons.
    /// `point` is the same press in tank coordinates, handed to the triggered action.
    pub fn press(&mut self, rel: Vector2, point: Vector2) -> Vec<ButtonAction> {
        let actions: Vec<ButtonAction> = self
            .entities
            .entities()
            .iter()
            .filter_map(|entity| entity.button_hit(rel))
            .collect();
        for action in &actions {
            match action {
                ButtonAction::StartFoodDrag => self.start_food_drag(point.x, point.y),
                ButtonAction::AddFish => {
                    if let Some(fish) = self.create_default_fish() {
                        self.add_entity(fish);
                    }
                }
            }
        }
        actions
    }

    /// Drop a food pellet at `(x, y)` and start following the pointer with it.
    pub fn start_food_drag(&mut self, x: f32, y: f32) {
        let size = sample(self.config.food_size, &mut self.rng);
        let speed = sample(self.config.food_speed, &mut self.rng);
        self.food_drag = Some(FoodDrag::Pending(self.pending.len()));
        self.add_entity(Entity::food(Vector2::new(x, y), size, speed));
    }

    /// Move the dragged pellet. Returns false when nothing is being dragged.
    pub fn drag_food_to(&mut self, x: f32, y: f32) -> bool {
        let food = match self.food_drag {
            Some(FoodDrag::Pending(index)) => self.pending.get_mut(index),
            Some(FoodDrag::Live(id)) => self.entities.get_mut(id),
            None => None,
        };
        match food {
            Some(food) => {
                food.position = Vector2::new(x, y);
                true
            }
            None => {
                self.food_drag = None;
                false
            }
        }
    }

    pub fn end_food_drag(&mut self) {
        self.food_drag = None;
    }

    #[must_use]
    pub fn is_dragging_food(&self) -> bool {
        self.food_drag.is_some()
    }

    /// Hand the current hi-score to the store.
    pub fn flush_hiscore(&mut self) {
        self.hiscore_store.record(self.hiscore);
    }

    /// Distance between the entities at dense indices `a` and `b` as of the last step.
    #[must_use]
    pub fn get_distance(&self, a: usize, b: usize) -> Option<f32> {
        self.distances.get(a, b)
    }

    #[must_use]
    pub fn distances(&self) -> &DistanceCache {
        &self.distances
    }

    #[must_use]
    pub fn entities(&self) -> &EntityArena {
        &self.entities
    }

    /// Mutable entity access for hosts and tests that stage scenes directly.
    #[must_use]
    pub fn entities_mut(&mut self) -> &mut EntityArena {
        &mut self.entities
    }

    /// Entities queued for admission at the next step.
    #[must_use]
    pub fn pending(&self) -> &[Entity] {
        &self.pending
    }

    #[must_use]
    pub fn config(&self) -> &AquariumConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub const fn score(&self) -> f32 {
        self.score
    }

    #[must_use]
    pub const fn hiscore(&self) -> f32 {
        self.hiscore
    }

    /// Iterate over retained tick summaries.
    pub fn history(&self) -> impl Iterator<Item = &TickSummary> {
        self.history.iter()
    }

    /// Access the world RNG.
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> World {
        let config = AquariumConfig {
            rng_seed: Some(seed),
            ..AquariumConfig::default()
        };
        World::new(config, Catalog::default()).expect("world")
    }

    #[test]
    fn queued_entities_appear_on_next_step() {
        let mut world = seeded(1);
        world.add_entity(Entity::feature(Vector2::ZERO, 10.0, "castle"));
        assert_eq!(world.entities().len(), 0);
        assert_eq!(world.pending().len(), 1);
        world.step();
        assert_eq!(world.entities().len(), 1);
        assert!(world.pending().is_empty());
    }

    #[test]
    fn empty_world_steps_cleanly() {
        let mut world = seeded(2);
        let summary = world.step();
        assert_eq!(summary.tick, Tick(1));
        assert_eq!(summary.entity_count, 0);
        assert!(world.distances().is_empty());
        assert_eq!(world.score(), 0.0);
    }

    #[test]
    fn populate_queues_initial_scene() {
        let mut world = seeded(3);
        world.populate();
        world.step();
        let config = world.config().clone();
        assert_eq!(world.count_fishes(), config.initial_fishes);
        assert_eq!(world.entities().count(EntityTag::Feature), config.feature_count);
        assert_eq!(world.entities().count(EntityTag::Bubble), config.max_bubbles);
        assert_eq!(world.entities().count(EntityTag::Button), 1);
        for (_, feature) in world
            .entities()
            .iter()
            .filter(|(_, e)| e.tag() == EntityTag::Feature)
        {
            assert_eq!(feature.position.y, config.height * 0.5);
            assert!(feature.position.x.abs() <= config.width * 0.5);
        }
    }

    #[test]
    fn created_fish_keeps_exact_species_value() {
        let mut world = seeded(4);
        let fish = world.create_fish(1.0, 2.0, 3.25).expect("fish");
        assert_eq!(fish.resource_id, "fish4");
        let state = fish.as_fish().expect("fish");
        assert_eq!(state.value, 3.25);
        assert!((fish.direction.length() - 1.0).abs() < 1e-5);
        assert_eq!(fish.speed, state.average_speed);
        assert!((fish.size - state.max_size * 0.5).abs() < 1e-5);
    }

    #[test]
    fn autobuy_tops_up_to_initial_population() {
        let mut world = seeded(5);
        for _ in 0..10 {
            world.autobuy();
        }
        assert_eq!(world.pending().len(), world.config().initial_fishes);
        world.step();
        assert!(!world.autobuy());
    }

    #[test]
    fn food_drag_follows_pointer_through_admission() {
        let mut world = seeded(6);
        world.start_food_drag(10.0, -50.0);
        assert!(world.drag_food_to(12.0, -40.0));
        assert_eq!(world.pending()[0].position, Vector2::new(12.0, -40.0));
        world.step();
        assert!(world.drag_food_to(20.0, -30.0));
        let food = world
            .entities()
            .iter()
            .find(|(_, e)| e.tag() == EntityTag::Food)
            .map(|(_, e)| e.position);
        assert_eq!(food, Some(Vector2::new(20.0, -30.0)));
        world.end_food_drag();
        assert!(!world.drag_food_to(0.0, 0.0));
    }

    #[test]
    fn pressing_food_button_starts_a_drag() {
        let mut world = seeded(7);
        world.populate();
        world.step();
        let actions = world.press(Vector2::new(0.9, 0.1), Vector2::new(100.0, -200.0));
        assert_eq!(actions, vec![ButtonAction::StartFoodDrag]);
        assert!(world.is_dragging_food());
        assert!(world.press(Vector2::new(0.1, 0.9), Vector2::ZERO).is_empty());
    }

    #[test]
    fn history_is_bounded() {
        let config = AquariumConfig {
            rng_seed: Some(8),
            history_capacity: 3,
            ..AquariumConfig::default()
        };
        let mut world = World::new(config, Catalog::default()).expect("world");
        for _ in 0..5 {
            world.step();
        }
        let ticks: Vec<u64> = world.history().map(|s| s.tick.0).collect();
        assert_eq!(ticks, vec![3, 4, 5]);
    }

    #[derive(Debug, Default)]
    struct RecordingStore {
        stored: Option<f32>,
        recorded: std::sync::Arc<std::sync::Mutex<Vec<f32>>>,
    }

    impl HiscoreStore for RecordingStore {
        fn load(&self) -> Option<f32> {
            self.stored
        }

        fn record(&mut self, hiscore: f32) {
            self.recorded.lock().expect("lock").push(hiscore);
        }
    }

    #[test]
    fn hiscore_reaches_the_store_only_on_flush() {
        let recorded = std::sync::Arc::default();
        let store = RecordingStore {
            stored: Some(0.5),
            recorded: std::sync::Arc::clone(&recorded),
        };
        let config = AquariumConfig {
            rng_seed: Some(9),
            ..AquariumConfig::default()
        };
        let mut world =
            World::with_hiscore_store(config, Catalog::default(), Box::new(store)).expect("world");
        assert_eq!(world.hiscore(), 0.5);
        world.populate();
        for _ in 0..3 {
            world.step();
        }
        assert!(world.hiscore() > 0.5);
        assert!(recorded.lock().expect("lock").is_empty());

        world.flush_hiscore();
        assert_eq!(*recorded.lock().expect("lock"), vec![world.hiscore()]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AquariumConfig {
            height: -1.0,
            ..AquariumConfig::default()
        };
        assert!(matches!(
            World::new(config, Catalog::default()),
            Err(WorldError::InvalidConfig(_))
        ));
    }
}
