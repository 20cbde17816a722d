//! Entity variants living in the tank.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::catalog::ButtonSpec;
use crate::config::AquariumConfig;
use crate::fish::Fish;
use crate::vector::Vector2;

new_key_type! {
    /// Stable handle for entities backed by a generational slot map.
    pub struct EntityId;
}

/// World-owned callback bound to a button.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    /// Drop a food pellet at the pointer and follow it while dragging.
    StartFoodDrag,
    /// Buy a default fish.
    AddFish,
}

/// Fieldless discriminant used by renderers and population counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityTag {
    Feature,
    Food,
    Bubble,
    Button,
    Fish,
}

/// Variant-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Feature,
    Food,
    Bubble,
    Button(ButtonAction),
    Fish(Box<Fish>),
}

/// A drawable, movable object in the tank.
///
/// Tank coordinates are centred on the origin with `y` growing downwards. Buttons are the
/// exception: their `position` and `size` are normalized to the viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub position: Vector2,
    pub size: f32,
    pub direction: Vector2,
    pub speed: f32,
    /// Opaque asset key owned by the renderer.
    pub resource_id: String,
    pub kind: EntityKind,
}

impl Entity {
    fn still(
        position: Vector2,
        size: f32,
        resource_id: impl Into<String>,
        kind: EntityKind,
    ) -> Self {
        Self {
            position,
            size,
            direction: Vector2::ZERO,
            speed: 0.0,
            resource_id: resource_id.into(),
            kind,
        }
    }

    /// Static decoration.
    #[must_use]
    pub fn feature(position: Vector2, size: f32, resource_id: impl Into<String>) -> Self {
        Self::still(position, size, resource_id, EntityKind::Feature)
    }

    /// Food pellet sinking towards the floor.
    #[must_use]
    pub fn food(position: Vector2, size: f32, speed: f32) -> Self {
        Self {
            direction: Vector2::new(0.0, 1.0),
            speed,
            ..Self::still(position, size, "food", EntityKind::Food)
        }
    }

    /// Bubble rising towards the surface.
    #[must_use]
    pub fn bubble(
        position: Vector2,
        size: f32,
        speed: f32,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            direction: Vector2::new(0.0, -1.0),
            speed,
            ..Self::still(position, size, resource_id, EntityKind::Bubble)
        }
    }

    #[must_use]
    pub fn button(spec: &ButtonSpec) -> Self {
        let [x, y] = spec.position;
        Self::still(
            Vector2::new(x, y),
            spec.size,
            spec.resource_id.clone(),
            EntityKind::Button(spec.action),
        )
    }

    #[must_use]
    pub fn fish(
        position: Vector2,
        direction: Vector2,
        resource_id: impl Into<String>,
        size: f32,
        fish: Fish,
    ) -> Self {
        Self {
            position,
            size,
            direction,
            speed: fish.average_speed,
            resource_id: resource_id.into(),
            kind: EntityKind::Fish(Box::new(fish)),
        }
    }

    #[must_use]
    pub fn tag(&self) -> EntityTag {
        match self.kind {
            EntityKind::Feature => EntityTag::Feature,
            EntityKind::Food => EntityTag::Food,
            EntityKind::Bubble => EntityTag::Bubble,
            EntityKind::Button(_) => EntityTag::Button,
            EntityKind::Fish(_) => EntityTag::Fish,
        }
    }

    #[must_use]
    pub fn as_fish(&self) -> Option<&Fish> {
        match &self.kind {
            EntityKind::Fish(fish) => Some(fish),
            _ => None,
        }
    }

    pub fn as_fish_mut(&mut self) -> Option<&mut Fish> {
        match &mut self.kind {
            EntityKind::Fish(fish) => Some(fish),
            _ => None,
        }
    }

    /// Lifecycle predicate re-evaluated at the start of every step.
    #[must_use]
    pub fn is_alive(&self, config: &AquariumConfig) -> bool {
        match &self.kind {
            EntityKind::Feature | EntityKind::Button(_) => true,
            EntityKind::Food => self.size > 0.0 && self.position.y < config.height * 0.5 * 0.9,
            EntityKind::Bubble => self.position.y > -config.height * 0.6,
            EntityKind::Fish(fish) => fish.is_alive(),
        }
    }

    /// Take up to `requested` units off a food pellet, returning the amount removed.
    ///
    /// Non-food entities are inedible and always yield 0.
    pub fn eat(&mut self, requested: f32) -> f32 {
        if !matches!(self.kind, EntityKind::Food) {
            return 0.0;
        }
        let amount = self.size.min(requested).max(0.0);
        self.size -= amount;
        amount
    }

    /// Hit test against a button in normalized viewport coordinates.
    #[must_use]
    pub fn button_hit(&self, rel: Vector2) -> Option<ButtonAction> {
        let EntityKind::Button(action) = self.kind else {
            return None;
        };
        let inside = |value: f32, origin: f32| value >= origin && value <= origin + self.size;
        (inside(rel.x, self.position.x) && inside(rel.y, self.position.y)).then_some(action)
    }

    /// Advance along the heading by `speed * timestep`.
    pub fn integrate(&mut self, timestep: f32) {
        let step = self.direction.scaled(self.speed * timestep);
        self.position.add(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn food_dies_when_eaten_or_below_floor() {
        let config = AquariumConfig {
            height: 200.0,
            ..AquariumConfig::default()
        };
        let mut food = Entity::food(Vector2::ZERO, 3.0, 2.0);
        assert!(food.is_alive(&config));
        assert_eq!(food.eat(2.0), 2.0);
        assert_eq!(food.eat(2.0), 1.0);
        assert_eq!(food.size, 0.0);
        assert!(!food.is_alive(&config));

        let sunk = Entity::food(Vector2::new(0.0, 90.0), 25.0, 2.0);
        assert!(!sunk.is_alive(&config));
    }

    #[test]
    fn bubble_dies_past_the_surface() {
        let config = AquariumConfig {
            height: 100.0,
            ..AquariumConfig::default()
        };
        let mut bubble = Entity::bubble(Vector2::new(0.0, -59.0), 5.0, 10.0, "bubble");
        assert!(bubble.is_alive(&config));
        bubble.integrate(0.1);
        assert!((bubble.position.y + 60.0).abs() < 1e-5);
        assert!(!bubble.is_alive(&config));
    }

    #[test]
    fn only_food_is_edible() {
        let mut feature = Entity::feature(Vector2::ZERO, 40.0, "castle");
        assert_eq!(feature.eat(2.0), 0.0);
        assert_eq!(feature.size, 40.0);
    }

    #[test]
    fn button_hit_test_is_inclusive() {
        let button = Entity::button(&ButtonSpec {
            resource_id: "button_food".to_string(),
            position: [0.8, 0.1],
            size: 0.1,
            action: ButtonAction::StartFoodDrag,
        });
        assert_eq!(button.tag(), EntityTag::Button);
        assert_eq!(
            button.button_hit(Vector2::new(0.85, 0.15)),
            Some(ButtonAction::StartFoodDrag)
        );
        assert_eq!(
            button.button_hit(Vector2::new(0.8, 0.1)),
            Some(ButtonAction::StartFoodDrag)
        );
        assert_eq!(button.button_hit(Vector2::new(0.95, 0.15)), None);
        let feature = Entity::feature(Vector2::ZERO, 1.0, "castle");
        assert_eq!(feature.button_hit(Vector2::ZERO), None);
    }
}
