use crate::config::PhysicsConfig;
use crate::world::{Entity, EntityStore, Tilemap, Vec2};

/// Floor for the friction divisor in the traction term.
const TRACTION_EPSILON: f32 = 1e-4;

/// Candidate displacement and post-integration velocity for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub delta: Vec2,
    pub velocity: Vec2,
}

/// Highest friction underfoot: either foot tile or the entity being stood on.
pub fn active_friction(entity: &Entity, store: &EntityStore, tilemap: Option<&Tilemap>) -> f32 {
    let tile_friction = tilemap.map_or(0.0, |map| {
        map.friction_at(entity.left_standing_tile)
            .max(map.friction_at(entity.right_standing_tile))
    });
    let entity_friction = store
        .peek(entity.standing_entity_id)
        .map_or(0.0, |standing_on| standing_on.friction);
    tile_friction.max(entity_friction)
}

/// Forces the world applies on top of the entity's own acceleration.
///
/// On the ground the applied push loses `|a| / max(friction / 2, ε)` to poor
/// traction. The loss is capped at the push itself, so on surfaces with
/// friction of 2 or less a grounded entity cannot accelerate under its own
/// power; it keeps whatever speed it already has.
pub fn external_acceleration(entity: &Entity, friction: f32, config: &PhysicsConfig) -> Vec2 {
    let applied = entity.acceleration;
    let velocity = entity.velocity;
    let mut external = Vec2::ZERO;

    if entity.is_on_ground() {
        if applied.x != 0.0 {
            // Low friction eats into the applied push; it never reverses it.
            let magnitude = applied.x.abs();
            let loss = (magnitude / (friction * 0.5).max(TRACTION_EPSILON)).min(magnitude);
            external.x -= loss * applied.x.signum();
        } else if velocity.x != 0.0 {
            external.x -= friction * velocity.x.signum();
        }
    } else {
        if applied.x != 0.0 && velocity.x != 0.0 {
            external.x -= config.air_drag * velocity.x.signum();
        }
        external.y += entity.gravity;
    }

    external
}

pub fn integrate(entity: &Entity, friction: f32, config: &PhysicsConfig, dt: f32) -> Motion {
    let velocity = entity.velocity;
    let max = entity.max_velocity;
    let external = external_acceleration(entity, friction, config);

    let over_speed_x = max.x > 0.0 && velocity.x.abs() > max.x;
    let own_x = if over_speed_x { 0.0 } else { entity.acceleration.x };
    let accel = Vec2::new(own_x + external.x, entity.acceleration.y + external.y);

    let mut delta = accel * (0.5 * dt * dt) + velocity * dt;
    let mut next = velocity + accel * dt;

    // Only external forces act on x here, so a sign change means friction or
    // drag overshot zero. Stop exactly where the velocity reached zero rather
    // than taking the full-frame displacement, which would drift backwards.
    if own_x == 0.0 && velocity.x != 0.0 && next.x * velocity.x <= 0.0 {
        let stop_time = (velocity.x / -accel.x).clamp(0.0, dt);
        delta.x = 0.5 * velocity.x * stop_time;
        next.x = 0.0;
    }

    let still_over_speed = over_speed_x && next.x * velocity.x > 0.0;
    if max.x > 0.0 && !still_over_speed {
        next.x = next.x.clamp(-max.x, max.x);
    }
    if max.y > 0.0 {
        next.y = next.y.clamp(-max.y, max.y);
    }

    Motion {
        delta,
        velocity: next,
    }
}
