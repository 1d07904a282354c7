use tracing::debug;

use super::entity::{Entity, EntityId};

/// Slot registry for entities.
///
/// Slot 0 is reserved and never live. A slot is free while its entity's
/// `id.index` is 0; its `id.generation` survives so the next spawn into that
/// slot can bump it, which permanently invalidates every older handle.
#[derive(Debug)]
pub struct EntityStore {
    slots: Vec<Entity>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self {
            slots: vec![Entity::default()],
        }
    }
}

impl EntityStore {
    /// Reuses the lowest free slot (bumping its generation) or appends a new one.
    /// The returned entity is zero-initialized apart from its id.
    pub fn spawn(&mut self) -> EntityId {
        let reusable = self
            .slots
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, slot)| slot.id.index == 0)
            .map(|(index, _)| index);

        match reusable {
            Some(index) => {
                let generation = self.slots[index].id.generation.wrapping_add(1).max(1);
                let id = EntityId {
                    generation,
                    index: index as u32,
                };
                self.slots[index] = Entity {
                    id,
                    ..Entity::default()
                };
                id
            }
            None => {
                let id = EntityId {
                    generation: 1,
                    index: self.slots.len() as u32,
                };
                self.slots.push(Entity {
                    id,
                    ..Entity::default()
                });
                id
            }
        }
    }

    fn slot_index(&self, id: EntityId) -> Option<usize> {
        let index = id.index as usize;
        if index == 0 || index >= self.slots.len() {
            return None;
        }
        let stored = self.slots[index].id;
        if stored.index == 0 || stored.generation != id.generation {
            return None;
        }
        Some(index)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.slot_index(id).is_some()
    }

    /// Resolves a handle, logging stale or out-of-range handles.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        match self.slot_index(id) {
            Some(index) => Some(&self.slots[index]),
            None => {
                debug!(entity = %id, "stale_entity_handle");
                None
            }
        }
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        match self.slot_index(id) {
            Some(index) => Some(&mut self.slots[index]),
            None => {
                debug!(entity = %id, "stale_entity_handle");
                None
            }
        }
    }

    /// Like [`get`](Self::get) but silent; for handles that are expected to go stale.
    pub fn peek(&self, id: EntityId) -> Option<&Entity> {
        self.slot_index(id).map(|index| &self.slots[index])
    }

    pub fn peek_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slot_index(id).map(move |index| &mut self.slots[index])
    }

    /// Frees the slot without running hooks. Returns false for stale handles.
    pub(crate) fn release(&mut self, id: EntityId) -> bool {
        let Some(index) = self.slot_index(id) else {
            return false;
        };
        let generation = self.slots[index].id.generation;
        self.slots[index] = Entity {
            id: EntityId {
                generation,
                index: 0,
            },
            ..Entity::default()
        };
        true
    }

    /// Live entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().skip(1).filter(|slot| slot.id.index != 0)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.slots
            .iter_mut()
            .skip(1)
            .filter(|slot| slot.id.index != 0)
    }

    /// Handles of all live entities in slot order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|entity| entity.id).collect()
    }

    pub fn live_count(&self) -> usize {
        self.iter().count()
    }

    /// Number of slots including the reserved null slot.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
