use tracing::{debug, trace, warn};

use crate::config::PhysicsConfig;
use crate::physics::{collision, motion, standing, EntityMoveResult};
use crate::world::{
    Contact, Entity, EntityFlags, EntityId, EntityStore, Rect, TileCoord, TileId, Tilemap, Vec2,
};

/// Upper bound on kill sweeps per frame; `on_kill` hooks may mark more entities.
const MAX_KILL_SWEEPS: usize = 8;
/// How many levels of stacked riders a moving platform carries.
const MAX_CARRY_DEPTH: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame_index: u64,
    /// Clamped delta the frame actually ran with.
    pub dt: f32,
    pub updated: usize,
    pub killed: usize,
}

/// Owns every entity and the active tilemap, and runs one frame at a time.
#[derive(Debug, Default)]
pub struct PhysicsWorld {
    pub(crate) entities: EntityStore,
    pub(crate) tilemap: Option<Tilemap>,
    pub(crate) config: PhysicsConfig,
    frame_dt: f32,
    frame_index: u64,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn set_tilemap(&mut self, tilemap: Tilemap) {
        self.tilemap = Some(tilemap);
    }

    pub fn clear_tilemap(&mut self) {
        self.tilemap = None;
    }

    pub fn tilemap(&self) -> Option<&Tilemap> {
        self.tilemap.as_ref()
    }

    pub fn tilemap_mut(&mut self) -> Option<&mut Tilemap> {
        self.tilemap.as_mut()
    }

    /// Tile at `coord`, or [`TileId::INVALID`] outside the map or with no map loaded.
    pub fn tile_at(&self, coord: TileCoord) -> TileId {
        self.tilemap
            .as_ref()
            .map_or(TileId::INVALID, |tilemap| tilemap.tile_at(coord))
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn frame_dt(&self) -> f32 {
        self.frame_dt
    }

    /// Sets the delta used by moves outside [`step`](Self::step), clamped the same way.
    pub fn set_frame_dt(&mut self, dt: f32) {
        self.frame_dt = self.config.clamp_dt(dt);
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn spawn(&mut self) -> EntityId {
        let id = self.entities.spawn();
        trace!(entity = %id, "entity_spawned");
        id
    }

    /// Spawns an entity from a template; the template's `id` is ignored.
    pub fn spawn_with(&mut self, template: Entity) -> EntityId {
        let id = self.entities.spawn();
        if let Some(entity) = self.entities.peek_mut(id) {
            *entity = Entity { id, ..template };
        }
        standing::refresh_foot_tiles(self, id);
        trace!(entity = %id, "entity_spawned");
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// Runs `on_kill`, detaches riders and frees the slot immediately.
    pub fn kill(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.peek_mut(id) else {
            warn!(entity = %id, "kill_stale_entity");
            return false;
        };
        // Taken so a hook that kills its own entity again cannot recurse.
        if let Some(behavior) = entity.behavior.take() {
            behavior.on_kill(self, id);
        }
        if !self.entities.release(id) {
            return false;
        }
        for rider in self.entities.iter_mut() {
            if rider.standing_entity_id == id {
                rider.standing_entity_id = EntityId::NULL;
            }
        }
        debug!(entity = %id, "entity_killed");
        true
    }

    /// Marks the entity for removal at the end of the current frame. It stops
    /// taking part in collision tests right away.
    pub fn kill_deferred(&mut self, id: EntityId) {
        match self.entities.peek_mut(id) {
            Some(entity) => entity.flags.insert(EntityFlags::MARKED_FOR_DEATH),
            None => warn!(entity = %id, "kill_deferred_stale_entity"),
        }
    }

    /// Kills every marked entity, repeating while `on_kill` hooks mark more.
    pub fn sweep_marked(&mut self) -> usize {
        let mut killed = 0;
        for _ in 0..MAX_KILL_SWEEPS {
            let marked: Vec<EntityId> = self
                .entities
                .iter()
                .filter(|entity| entity.flags.contains(EntityFlags::MARKED_FOR_DEATH))
                .map(|entity| entity.id)
                .collect();
            if marked.is_empty() {
                return killed;
            }
            killed += marked.into_iter().filter(|&id| self.kill(id)).count();
        }
        warn!(sweeps = MAX_KILL_SWEEPS, killed, "kill_sweep_limit_reached");
        killed
    }

    /// Runs one frame: every live entity updates once in slot order, then
    /// deferred kills are applied.
    pub fn step(&mut self, dt: f32) -> FrameStats {
        self.frame_dt = self.config.clamp_dt(dt);
        let mut updated = 0;
        for id in self.entities.ids() {
            let Some(entity) = self.entities.peek(id) else {
                continue;
            };
            if entity.flags.contains(EntityFlags::MARKED_FOR_DEATH) {
                continue;
            }
            match entity.behavior.clone() {
                Some(behavior) => behavior.on_update(self, id),
                None => {
                    self.move_entity_in_world(id);
                }
            }
            updated += 1;
        }

        let killed = self.sweep_marked();
        let stats = FrameStats {
            frame_index: self.frame_index,
            dt: self.frame_dt,
            updated,
            killed,
        };
        self.frame_index += 1;
        trace!(
            frame = stats.frame_index,
            dt = stats.dt,
            updated,
            killed,
            live = self.entities.live_count(),
            "frame_stepped"
        );
        stats
    }

    /// Integrates the entity over the current frame delta, sweeps it through
    /// the tilemap and nearby entities, and updates what it stands on.
    pub fn move_entity_in_world(&mut self, id: EntityId) -> EntityMoveResult {
        let Some(entity) = self.entities.get(id) else {
            return EntityMoveResult::NoMove;
        };
        if entity.flags.contains(EntityFlags::STATIC) {
            return EntityMoveResult::NoMove;
        }

        let friction = motion::active_friction(entity, &self.entities, self.tilemap.as_ref());
        let step = motion::integrate(entity, friction, &self.config, self.frame_dt);
        let start = entity.collider.pos;
        if let Some(entity) = self.entities.peek_mut(id) {
            entity.velocity = step.velocity;
        }

        let mut result = collision::resolve_move(self, id, step.delta, true);
        if standing::detect_take_off(self, id) {
            result = EntityMoveResult::BecameAirborne;
        }
        let result = standing::update(self, id, result);
        self.carry_riders(id, start, MAX_CARRY_DEPTH);
        result
    }

    /// Moves everything standing on `id` by the distance `id` actually moved.
    fn carry_riders(&mut self, id: EntityId, start: Vec2, depth: u32) {
        let Some(end) = self.entities.peek(id).map(|entity| entity.collider.pos) else {
            return;
        };
        let moved = end - start;
        if moved.is_zero() || depth == 0 {
            return;
        }
        let riders: Vec<(EntityId, Vec2)> = self
            .entities
            .iter()
            .filter(|entity| entity.standing_entity_id == id)
            .map(|entity| (entity.id, entity.collider.pos))
            .collect();
        for (rider, rider_start) in riders {
            collision::resolve_move(self, rider, moved, false);
            standing::refresh_foot_tiles(self, rider);
            self.carry_riders(rider, rider_start, depth - 1);
        }
    }

    /// Places the entity at `pos` without sweeping, then reports every
    /// entity it now overlaps to both sides with zero collision normals.
    pub fn teleport_entity_considering_colliders(&mut self, id: EntityId, pos: Vec2) {
        let Some(entity) = self.entities.peek_mut(id) else {
            warn!(entity = %id, "teleport_stale_entity");
            return;
        };
        entity.collider.pos = pos;
        entity.flags.remove(EntityFlags::ON_GROUND);
        let collider = entity.collider;
        let collidable = entity.is_collidable();
        standing::leave_standing_entity(self, id);
        standing::refresh_foot_tiles(self, id);
        if !collidable {
            return;
        }

        let overlapping: Vec<(EntityId, Vec2)> = self
            .entities
            .iter()
            .filter(|other| {
                other.id != id && other.is_collidable() && other.collider.intersects(&collider)
            })
            .map(|other| (other.id, other.collider.pos))
            .collect();
        for (other, other_pos) in overlapping {
            self.fire_collide(id, Contact::overlap(other, pos));
            self.fire_collide(other, Contact::overlap(id, other_pos));
        }
    }

    /// Live entities whose colliders strictly overlap `rect`.
    pub fn entities_overlapping(&self, rect: &Rect) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|entity| entity.collider.intersects(rect))
            .map(|entity| entity.id)
            .collect()
    }

    /// True when the collider overlaps a lethal tile, or rests on one.
    pub fn touches_lethal_tile(&self, id: EntityId) -> bool {
        let (Some(entity), Some(tilemap)) = (self.entities.peek(id), self.tilemap.as_ref()) else {
            return false;
        };
        let collider = entity.collider;
        let lethal = |coord: TileCoord| {
            tilemap
                .info_at(coord)
                .is_some_and(|info| info.is_lethal())
        };

        let min = TileCoord::from_world(collider.pos);
        let max_x = collider.right().ceil() as i32 - 1;
        let max_y = collider.bottom().ceil() as i32 - 1;
        for y in min.y..=max_y {
            for x in min.x..=max_x {
                if lethal(TileCoord::new(x, y)) {
                    return true;
                }
            }
        }

        entity.is_on_ground()
            && (lethal(entity.left_standing_tile) || lethal(entity.right_standing_tile))
    }

    pub(crate) fn fire_collide(&mut self, id: EntityId, contact: Contact) {
        let behavior = self.entities.peek(id).and_then(|entity| entity.behavior.clone());
        if let Some(behavior) = behavior {
            behavior.on_collide(self, id, &contact);
        }
    }

    pub(crate) fn fire_stand(&mut self, id: EntityId, other: EntityId, is_standing: bool) {
        let behavior = self.entities.peek(id).and_then(|entity| entity.behavior.clone());
        if let Some(behavior) = behavior {
            behavior.on_stand(self, id, other, is_standing);
        }
    }
}

impl Contact {
    fn overlap(other: EntityId, position: Vec2) -> Self {
        Contact {
            other,
            collider_normal: Vec2::ZERO,
            collision_normal: Vec2::ZERO,
            position,
        }
    }
}
