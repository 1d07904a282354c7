use tracing::debug;

use super::standing;
use crate::config::COLLISION_EPSILON;
use crate::physics_world::PhysicsWorld;
use crate::world::{Contact, EntityFlags, EntityId, Rect, TileCoord, Vec2};

/// Outcome of one `move_entity_in_world` call, for controllers to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityMoveResult {
    NoMove,
    NothingSpecial,
    HitWall,
    HitCeiling,
    HitGround,
    BecameAirborne,
}

/// Boundary of a target box, named from the target's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    /// Outward normal of this side (y grows downward, so `Top` points at -y).
    pub fn normal(self) -> Vec2 {
        match self {
            Side::Left => Vec2::new(-1.0, 0.0),
            Side::Right => Vec2::new(1.0, 0.0),
            Side::Top => Vec2::new(0.0, -1.0),
            Side::Bottom => Vec2::new(0.0, 1.0),
        }
    }
}

/// Test order matters: on equal `t` the first side listed wins.
pub const ALL_SIDES: [Side; 4] = [Side::Left, Side::Right, Side::Top, Side::Bottom];
pub const TOP_ONLY: [Side; 1] = [Side::Top];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Fraction of `delta` travelled before the boundary is crossed, in `[0, 1)`.
    pub t: f32,
    pub normal: Vec2,
}

/// Earliest crossing of one of `target`'s sides by a box of `half_extents`
/// whose center moves from `center` by `delta`.
///
/// The target is grown by the mover's half extents so the test reduces to a
/// point against four half-planes. A side only counts when the center starts
/// on its outer side, moves toward it, and crosses inside the span of the
/// perpendicular edges. Crossing exactly at a corner counts only if the path
/// also moves into the box along the other axis, so sliding along an edge is
/// not a hit. Starting inside the grown box yields no hit at all.
pub fn sweep_against(
    center: Vec2,
    half_extents: Vec2,
    delta: Vec2,
    target: &Rect,
    sides: &[Side],
) -> Option<SweepHit> {
    let grown = target.expanded(half_extents);
    let mut best: Option<SweepHit> = None;

    for &side in sides {
        let crossing = match side {
            Side::Left if delta.x > 0.0 && center.x <= grown.left() => {
                let t = (grown.left() - center.x) / delta.x;
                let y = center.y + delta.y * t;
                crosses_span(y, grown.top(), grown.bottom(), delta.y).then_some(t)
            }
            Side::Right if delta.x < 0.0 && center.x >= grown.right() => {
                let t = (grown.right() - center.x) / delta.x;
                let y = center.y + delta.y * t;
                crosses_span(y, grown.top(), grown.bottom(), delta.y).then_some(t)
            }
            Side::Top if delta.y > 0.0 && center.y <= grown.top() => {
                let t = (grown.top() - center.y) / delta.y;
                let x = center.x + delta.x * t;
                crosses_span(x, grown.left(), grown.right(), delta.x).then_some(t)
            }
            Side::Bottom if delta.y < 0.0 && center.y >= grown.bottom() => {
                let t = (grown.bottom() - center.y) / delta.y;
                let x = center.x + delta.x * t;
                crosses_span(x, grown.left(), grown.right(), delta.x).then_some(t)
            }
            _ => None,
        };

        let Some(t) = crossing else {
            continue;
        };
        if !(0.0..1.0).contains(&t) {
            continue;
        }
        if best.map_or(true, |current| t < current.t) {
            best = Some(SweepHit {
                t,
                normal: side.normal(),
            });
        }
    }

    best
}

/// How far a crossing may sit from a span endpoint and still be treated as on
/// it. Far below `COLLISION_EPSILON` so an entity resting flush never counts.
const CORNER_TOLERANCE: f32 = COLLISION_EPSILON * 0.01;

/// Whether a crossing at `at` on a side enters the box, given the path's
/// motion `along` that side.
fn crosses_span(at: f32, low: f32, high: f32, along: f32) -> bool {
    if (at - low).abs() <= CORNER_TOLERANCE {
        along > 0.0
    } else if (at - high).abs() <= CORNER_TOLERANCE {
        along < 0.0
    } else {
        at > low && at < high
    }
}

/// Zeroes displacement components too small to survive float error.
fn snap_small(delta: Vec2) -> Vec2 {
    let snap = |value: f32| {
        if value.abs() < COLLISION_EPSILON {
            0.0
        } else {
            value
        }
    };
    Vec2::new(snap(delta.x), snap(delta.y))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Blocker {
    Tile,
    Entity(EntityId),
}

#[derive(Debug, Clone, Copy)]
struct BestHit {
    hit: SweepHit,
    target: Rect,
    blocker: Blocker,
}

/// Entity-vs-entity approach test for the whole candidate displacement.
///
/// Fires `on_collide` on both sides of every contact that is entered this
/// frame and returns the tangible entities involved, capped at
/// `max_tangible_contacts`. Entities standing on the mover are skipped so a
/// platform never collides with its own riders.
pub(crate) fn approach_pass(world: &mut PhysicsWorld, id: EntityId, delta: Vec2) -> Vec<EntityId> {
    let Some(me) = world.entities.peek(id) else {
        return Vec::new();
    };
    if delta.is_zero() || !me.is_collidable() {
        return Vec::new();
    }
    let collider = me.collider;
    let center = collider.center();
    let half_extents = collider.half_extents();
    let capacity = world.config.max_tangible_contacts;

    let candidates: Vec<(EntityId, Rect, bool)> = world
        .entities
        .iter()
        .filter(|other| {
            other.id != id && other.is_collidable() && other.standing_entity_id != id
        })
        .map(|other| (other.id, other.collider, other.is_tangible()))
        .collect();

    let mut blockers = Vec::new();
    for (other, rect, tangible) in candidates {
        if collider.intersects(&rect) {
            continue;
        }
        let Some(hit) = sweep_against(center, half_extents, delta, &rect, &ALL_SIDES) else {
            continue;
        };

        world.fire_collide(
            id,
            Contact {
                other,
                collider_normal: hit.normal,
                collision_normal: hit.normal,
                position: collider.pos + delta * hit.t,
            },
        );
        let other_position = world
            .entities
            .peek(other)
            .map_or(rect.pos, |entity| entity.collider.pos);
        world.fire_collide(
            other,
            Contact {
                other: id,
                collider_normal: -hit.normal,
                collision_normal: -hit.normal,
                position: other_position,
            },
        );

        if tangible {
            if blockers.len() < capacity {
                blockers.push(other);
            } else {
                debug!(entity = %id, dropped = %other, capacity, "tangible_contacts_full");
            }
        }
    }

    blockers
}

fn earliest_hit(
    world: &PhysicsWorld,
    collider: Rect,
    remaining: Vec2,
    blockers: &[EntityId],
) -> Option<BestHit> {
    let center = collider.center();
    let half_extents = collider.half_extents();
    let mut best: Option<BestHit> = None;
    let mut consider = |hit: SweepHit, target: Rect, blocker: Blocker| {
        if best.map_or(true, |current| hit.t < current.hit.t) {
            best = Some(BestHit {
                hit,
                target,
                blocker,
            });
        }
    };

    if let Some(tilemap) = world.tilemap.as_ref() {
        let bounds = collider.swept_bounds(remaining);
        let min = TileCoord::from_world(bounds.pos);
        let max = TileCoord::from_world(Vec2::new(bounds.right(), bounds.bottom()));
        let x_end = max.x.min(tilemap.width() as i32 - 1);
        let y_end = max.y.min(tilemap.height() as i32 - 1);

        for y in min.y.max(0)..=y_end {
            for x in min.x.max(0)..=x_end {
                let coord = TileCoord::new(x, y);
                if !tilemap.is_tangible_at(coord) {
                    continue;
                }
                let target = coord.world_rect();
                let hit = sweep_against(center, half_extents, remaining, &target, &ALL_SIDES);
                if let Some(hit) = hit {
                    consider(hit, target, Blocker::Tile);
                }
            }
        }
    }

    for &other in blockers {
        let Some(entity) = world.entities.peek(other) else {
            continue;
        };
        if !entity.is_collidable() || !entity.is_tangible() {
            continue;
        }
        let sides: &[Side] = if entity.flags.contains(EntityFlags::TANGIBLE_ON_TOP) {
            &TOP_ONLY
        } else {
            &ALL_SIDES
        };
        if let Some(hit) = sweep_against(center, half_extents, remaining, &entity.collider, sides) {
            consider(hit, entity.collider, Blocker::Entity(other));
        }
    }

    best
}

/// Sweeps the entity through `delta`, sliding along whatever it hits, for at
/// most `max_sweep_iterations` partial moves.
///
/// `verify_standing` re-checks the entity being stood on before each partial
/// move; carrying a rider skips it because the platform has already moved.
pub(crate) fn resolve_move(
    world: &mut PhysicsWorld,
    id: EntityId,
    delta: Vec2,
    verify_standing: bool,
) -> EntityMoveResult {
    let blockers = approach_pass(world, id, delta);
    let mut result = EntityMoveResult::NothingSpecial;
    let mut contacted = false;
    let mut remaining = delta;

    for _ in 0..world.config.max_sweep_iterations {
        if remaining.is_zero() {
            break;
        }
        if verify_standing && standing::verify_standing_entity(world, id) {
            result = EntityMoveResult::BecameAirborne;
        }
        let Some(collider) = world.entities.peek(id).map(|entity| entity.collider) else {
            break;
        };

        let Some(best) = earliest_hit(world, collider, remaining, &blockers) else {
            if let Some(entity) = world.entities.peek_mut(id) {
                entity.collider.pos += snap_small(remaining);
            }
            break;
        };

        contacted = true;
        let SweepHit { t, normal } = best.hit;
        let step = snap_small(remaining * t);
        let mut pos = collider.pos;
        if normal.x != 0.0 {
            pos.x = if normal.x < 0.0 {
                best.target.left() - collider.w - COLLISION_EPSILON
            } else {
                best.target.right() + COLLISION_EPSILON
            };
            pos.y += step.y;
        } else {
            pos.y = if normal.y < 0.0 {
                best.target.top() - collider.h - COLLISION_EPSILON
            } else {
                best.target.bottom() + COLLISION_EPSILON
            };
            pos.x += step.x;
        }

        let Some(entity) = world.entities.peek_mut(id) else {
            break;
        };
        let was_on_ground = entity.is_on_ground();
        entity.collider.pos = pos;
        entity.velocity = entity.velocity.without_component(normal);
        remaining = (remaining * (1.0 - t)).without_component(normal);

        if normal.x != 0.0 {
            result = EntityMoveResult::HitWall;
        } else if normal.y > 0.0 {
            result = EntityMoveResult::HitCeiling;
        } else {
            entity.flags.insert(EntityFlags::ON_GROUND);
            if !was_on_ground {
                result = EntityMoveResult::HitGround;
            }
            match best.blocker {
                Blocker::Entity(other) => standing::stand_on(world, id, other),
                Blocker::Tile => standing::leave_standing_entity(world, id),
            }
        }
    }

    let at_rest = world
        .entities
        .peek(id)
        .map_or(true, |entity| entity.velocity.is_zero());
    if !contacted && at_rest && result == EntityMoveResult::NothingSpecial {
        return EntityMoveResult::NoMove;
    }
    result
}
