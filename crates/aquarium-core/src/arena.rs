//! Dense entity storage addressed by generational handles.

use slotmap::SlotMap;

use crate::entity::{Entity, EntityId, EntityTag};

/// Entities in stable insertion order, plus a slot map from handle to dense index.
///
/// Dense indices are what the distance cache is keyed by; handles are what fish hold on to.
/// A handle whose entity was removed simply stops resolving.
#[derive(Debug, Clone)]
pub struct EntityArena {
    slots: SlotMap<EntityId, usize>,
    handles: Vec<EntityId>,
    entities: Vec<Entity>,
}

impl Default for EntityArena {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityArena {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            handles: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// Create an arena with reserved capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SlotMap::with_capacity_and_key(capacity),
            handles: Vec::with_capacity(capacity),
            entities: Vec::with_capacity(capacity),
        }
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over handles in dense order.
    pub fn iter_handles(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.handles.iter().copied()
    }

    /// Iterate over `(handle, entity)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.handles.iter().copied().zip(self.entities.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.entities.iter_mut()
    }

    /// Entities in dense order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[must_use]
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    #[must_use]
    pub fn handle_at(&self, index: usize) -> Option<EntityId> {
        self.handles.get(index).copied()
    }

    /// Returns true if `id` refers to a live entity.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index_of(id).and_then(|index| self.entities.get(index))
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let index = self.index_of(id)?;
        self.entities.get_mut(index)
    }

    /// Append an entity and return its handle.
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let index = self.entities.len();
        self.entities.push(entity);
        let id = self.slots.insert(index);
        self.handles.push(id);
        id
    }

    /// Remove `id`, shifting later entities down so dense order is preserved.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.slots.remove(id)?;
        let removed = self.entities.remove(index);
        let removed_handle = self.handles.remove(index);
        debug_assert_eq!(removed_handle, id);
        for (shifted, handle) in self.handles.iter().enumerate().skip(index) {
            if let Some(slot) = self.slots.get_mut(*handle) {
                *slot = shifted;
            }
        }
        Some(removed)
    }

    /// Positions in dense order, ready for a distance index rebuild.
    #[must_use]
    pub fn positions(&self) -> Vec<(f32, f32)> {
        self.entities.iter().map(|e| e.position.into()).collect()
    }

    /// Number of entities carrying `tag`.
    #[must_use]
    pub fn count(&self, tag: EntityTag) -> usize {
        self.entities.iter().filter(|e| e.tag() == tag).count()
    }

    /// Clear all stored entities.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.handles.clear();
        self.entities.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Vector2;

    fn feature(x: f32) -> Entity {
        Entity::feature(Vector2::new(x, 0.0), 10.0, "sand1")
    }

    #[test]
    fn removal_preserves_order_and_handles() {
        let mut arena = EntityArena::with_capacity(4);
        let ids: Vec<_> = (0..4).map(|i| arena.insert(feature(i as f32))).collect();

        let removed = arena.remove(ids[1]).expect("present");
        assert_eq!(removed.position.x, 1.0);
        assert_eq!(arena.len(), 3);
        assert!(!arena.contains(ids[1]));
        assert!(arena.get(ids[1]).is_none());
        assert!(arena.remove(ids[1]).is_none());

        let xs: Vec<f32> = arena.entities().iter().map(|e| e.position.x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 3.0]);
        assert_eq!(arena.index_of(ids[3]), Some(2));
        assert_eq!(arena.handle_at(1), Some(ids[2]));
        assert_eq!(arena.get(ids[3]).map(|e| e.position.x), Some(3.0));
    }

    #[test]
    fn stale_handles_do_not_alias_new_entities() {
        let mut arena = EntityArena::new();
        let old = arena.insert(feature(0.0));
        arena.remove(old);
        let new = arena.insert(feature(5.0));
        assert_ne!(old, new);
        assert!(arena.get(old).is_none());
        assert_eq!(arena.positions(), vec![(5.0, 0.0)]);
    }

    #[test]
    fn counts_by_tag() {
        let mut arena = EntityArena::new();
        arena.insert(feature(0.0));
        arena.insert(Entity::food(Vector2::ZERO, 20.0, 2.0));
        arena.insert(Entity::food(Vector2::ZERO, 20.0, 2.0));
        assert_eq!(arena.count(EntityTag::Food), 2);
        assert_eq!(arena.count(EntityTag::Fish), 0);
        arena.clear();
        assert!(arena.is_empty());
    }
}
