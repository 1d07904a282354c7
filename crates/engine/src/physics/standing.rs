use super::collision::EntityMoveResult;
use crate::config::COLLISION_EPSILON;
use crate::physics_world::PhysicsWorld;
use crate::world::{EntityFlags, EntityId, Rect, TileCoord, Vec2};

/// Tiles sampled just below the bottom-left and bottom-right corners.
pub fn foot_tiles(collider: &Rect, probe: f32) -> (TileCoord, TileCoord) {
    let y = collider.bottom() + probe;
    let inset = COLLISION_EPSILON.min(collider.w * 0.5);
    (
        TileCoord::from_world(Vec2::new(collider.left() + inset, y)),
        TileCoord::from_world(Vec2::new(collider.right() - inset, y)),
    )
}

/// `support` lies under `feet`: horizontal overlap and a top within `probe`
/// of the feet in either direction.
pub fn is_underfoot(feet: &Rect, support: &Rect, probe: f32) -> bool {
    let gap = support.top() - feet.bottom();
    feet.left() < support.right() && feet.right() > support.left() && gap.abs() <= probe
}

fn feet_on_tangible_tile(world: &PhysicsWorld, collider: &Rect) -> bool {
    let Some(tilemap) = world.tilemap.as_ref() else {
        return false;
    };
    let (left, right) = foot_tiles(collider, world.config.standing_probe_distance);
    tilemap.is_tangible_at(left) || tilemap.is_tangible_at(right)
}

/// Records `support` as the entity `id` stands on, firing the exit hook on
/// the previous support and the enter hook on the new one.
pub(crate) fn stand_on(world: &mut PhysicsWorld, id: EntityId, support: EntityId) {
    let Some(entity) = world.entities.peek_mut(id) else {
        return;
    };
    if entity.standing_entity_id == support {
        return;
    }
    let previous = std::mem::replace(&mut entity.standing_entity_id, support);
    if world.entities.is_alive(previous) {
        world.fire_stand(previous, id, false);
    }
    world.fire_stand(support, id, true);
}

/// Drops the entity's support without touching `ON_GROUND`.
pub(crate) fn leave_standing_entity(world: &mut PhysicsWorld, id: EntityId) {
    let Some(entity) = world.entities.peek_mut(id) else {
        return;
    };
    let previous = std::mem::take(&mut entity.standing_entity_id);
    if world.entities.is_alive(previous) {
        world.fire_stand(previous, id, false);
    }
}

/// Checks that the entity being stood on is still underfoot. Returns true
/// when losing it left the entity airborne.
pub(crate) fn verify_standing_entity(world: &mut PhysicsWorld, id: EntityId) -> bool {
    let Some(entity) = world.entities.peek(id) else {
        return false;
    };
    let support = entity.standing_entity_id;
    if support.is_null() {
        return false;
    }
    let collider = entity.collider;
    let probe = world.config.standing_probe_distance;
    let still_underfoot = world.entities.peek(support).is_some_and(|platform| {
        platform.is_collidable() && is_underfoot(&collider, &platform.collider, probe)
    });
    if still_underfoot {
        return false;
    }

    // Walking off a platform onto solid tiles keeps the entity grounded.
    let on_tiles = feet_on_tangible_tile(world, &collider);
    let mut became_airborne = false;
    if let Some(entity) = world.entities.peek_mut(id) {
        if !on_tiles && entity.is_on_ground() {
            entity.flags.remove(EntityFlags::ON_GROUND);
            became_airborne = true;
        }
    }
    leave_standing_entity(world, id);
    became_airborne
}

/// Upward velocity while grounded means the entity jumped this frame.
pub(crate) fn detect_take_off(world: &mut PhysicsWorld, id: EntityId) -> bool {
    let Some(entity) = world.entities.peek_mut(id) else {
        return false;
    };
    if !entity.is_on_ground() || entity.velocity.y >= 0.0 {
        return false;
    }
    entity.flags.remove(EntityFlags::ON_GROUND);
    leave_standing_entity(world, id);
    true
}

/// Refreshes the foot tiles and the grounded state after a move.
pub(crate) fn update(
    world: &mut PhysicsWorld,
    id: EntityId,
    result: EntityMoveResult,
) -> EntityMoveResult {
    let mut result = result;
    if verify_standing_entity(world, id) {
        result = EntityMoveResult::BecameAirborne;
    }

    let Some(entity) = world.entities.peek(id) else {
        return result;
    };
    let (left, right) = foot_tiles(&entity.collider, world.config.standing_probe_distance);
    let on_tiles = world
        .tilemap
        .as_ref()
        .is_some_and(|map| map.is_tangible_at(left) || map.is_tangible_at(right));

    let Some(entity) = world.entities.peek_mut(id) else {
        return result;
    };
    entity.left_standing_tile = left;
    entity.right_standing_tile = right;
    if entity.is_on_ground() && !on_tiles && entity.standing_entity_id.is_null() {
        entity.flags.remove(EntityFlags::ON_GROUND);
        result = EntityMoveResult::BecameAirborne;
    }
    result
}

/// Re-samples the foot tiles without changing any flags.
pub(crate) fn refresh_foot_tiles(world: &mut PhysicsWorld, id: EntityId) {
    let probe = world.config.standing_probe_distance;
    if let Some(entity) = world.entities.peek_mut(id) {
        let (left, right) = foot_tiles(&entity.collider, probe);
        entity.left_standing_tile = left;
        entity.right_standing_tile = right;
    }
}
