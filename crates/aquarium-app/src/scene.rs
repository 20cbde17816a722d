//! Renderer-facing view of the tank.

use aquarium_core::{EntityTag, Tick, World};
use serde::{Deserialize, Serialize};

/// What a renderer needs to draw one entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityView {
    pub tag: EntityTag,
    pub resource_id: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    /// Heading, used to mirror sprites that swim left.
    pub heading: (f32, f32),
    /// Perception radius, only set for fish when info overlays are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fov_radius: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneSnapshot {
    pub tick: Tick,
    pub width: f32,
    pub height: f32,
    pub score: f32,
    pub hiscore: f32,
    pub entities: Vec<EntityView>,
}

impl SceneSnapshot {
    #[must_use]
    pub fn capture(world: &World) -> Self {
        let show_info = world.config().show_info;
        let entities = world
            .entities()
            .entities()
            .iter()
            .map(|entity| EntityView {
                tag: entity.tag(),
                resource_id: entity.resource_id.clone(),
                x: entity.position.x,
                y: entity.position.y,
                size: entity.size,
                heading: entity.direction.into(),
                fov_radius: entity
                    .as_fish()
                    .filter(|_| show_info)
                    .map(|fish| fish.fov_radius),
            })
            .collect();
        Self {
            tick: world.tick(),
            width: world.config().width,
            height: world.config().height,
            score: world.score(),
            hiscore: world.hiscore(),
            entities,
        }
    }

    /// Entities of one kind, in draw order.
    pub fn of(&self, tag: EntityTag) -> impl Iterator<Item = &EntityView> + '_ {
        self.entities.iter().filter(move |view| view.tag == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquarium_core::{AquariumConfig, Catalog};

    #[test]
    fn capture_lists_live_entities_only() {
        let config = AquariumConfig {
            rng_seed: Some(3),
            show_info: true,
            ..AquariumConfig::default()
        };
        let mut world = World::new(config, Catalog::default()).expect("world");
        world.populate();
        let before = SceneSnapshot::capture(&world);
        assert!(before.entities.is_empty());

        world.step();
        let scene = SceneSnapshot::capture(&world);
        assert_eq!(scene.tick, Tick(1));
        assert_eq!(scene.entities.len(), world.entities().len());
        assert_eq!(scene.of(EntityTag::Fish).count(), world.count_fishes());
        assert!(scene.of(EntityTag::Fish).all(|view| view.fov_radius.is_some()));
        assert!(scene.of(EntityTag::Bubble).all(|view| view.fov_radius.is_none()));

        let json = serde_json::to_string(&scene).expect("serialize");
        let back: SceneSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, scene);
    }
}
