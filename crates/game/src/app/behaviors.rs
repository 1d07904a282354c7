use std::cell::Cell;

use engine::{
    Contact, EntityBehavior, EntityFlags, EntityId, EntityMoveResult, PhysicsWorld, UserData,
    Vec2,
};
use tracing::{debug, info};

/// Walks in one direction until it hits a wall, then turns around. Dies on
/// lethal tiles.
#[derive(Debug)]
pub(crate) struct Walker {
    accel: f32,
}

impl Walker {
    pub(crate) fn new(accel: f32) -> Self {
        Self { accel }
    }
}

impl EntityBehavior for Walker {
    fn on_update(&self, world: &mut PhysicsWorld, me: EntityId) {
        let Some(entity) = world.get_mut(me) else {
            return;
        };
        if entity.acceleration.x == 0.0 {
            entity.acceleration.x = self.accel;
        }

        let result = world.move_entity_in_world(me);
        if result == EntityMoveResult::HitWall {
            if let Some(entity) = world.get_mut(me) {
                entity.acceleration.x = -entity.acceleration.x;
                let facing_left = entity.acceleration.x < 0.0;
                entity.flags.set(EntityFlags::FLIP_H, facing_left);
                debug!(entity = %me, facing_left, "walker_turned");
            }
        }

        if world.touches_lethal_tile(me) {
            info!(entity = %me, "walker_hit_lethal_tile");
            world.kill_deferred(me);
        }
    }
}

/// Shuttles between its spawn point and `end` at a constant speed.
#[derive(Debug)]
pub(crate) struct MovingPlatform {
    start: Vec2,
    end: Vec2,
    speed: f32,
    outbound: Cell<bool>,
}

impl MovingPlatform {
    pub(crate) fn new(start: Vec2, end: Vec2, speed: f32) -> Self {
        Self {
            start,
            end,
            speed,
            outbound: Cell::new(true),
        }
    }
}

impl EntityBehavior for MovingPlatform {
    fn on_update(&self, world: &mut PhysicsWorld, me: EntityId) {
        let dt = world.frame_dt();
        let step = self.speed * dt;
        let Some(entity) = world.get_mut(me) else {
            return;
        };
        let target = if self.outbound.get() {
            self.end
        } else {
            self.start
        };
        let to_target = target - entity.collider.pos;
        let distance = to_target.length();
        if distance <= step {
            self.outbound.set(!self.outbound.get());
        }
        // Slow down on the last step so the platform lands on its endpoint.
        entity.velocity = if distance > 0.0 && dt > 0.0 {
            to_target * (self.speed.min(distance / dt) / distance)
        } else {
            Vec2::ZERO
        };
        world.move_entity_in_world(me);
    }

    fn on_stand(
        &self,
        _world: &mut PhysicsWorld,
        me: EntityId,
        other: EntityId,
        is_standing: bool,
    ) {
        debug!(platform = %me, rider = %other, is_standing, "platform_rider_changed");
    }
}

/// Stationary trap; anything that runs into it dies at the end of the frame.
#[derive(Debug)]
pub(crate) struct Hazard;

impl EntityBehavior for Hazard {
    fn on_update(&self, _world: &mut PhysicsWorld, _me: EntityId) {}

    fn on_collide(&self, world: &mut PhysicsWorld, me: EntityId, contact: &Contact) {
        info!(hazard = %me, victim = %contact.other, "hazard_touched");
        world.kill_deferred(contact.other);
        if let Some(hazard) = world.get_mut(me) {
            hazard.user_data = UserData::Entity(contact.other);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use engine::{Entity, Rect, TileCoord, TileFlags, TileId, TileInfo, TileSet, Tilemap};

    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn boxed_room() -> PhysicsWorld {
        let set = TileSet::new(vec![
            TileInfo::air(),
            TileInfo {
                name: "stone".to_string(),
                render_index: 1,
                flags: TileFlags::TANGIBLE,
                friction: 8.0,
            },
            TileInfo {
                name: "lava".to_string(),
                render_index: 2,
                flags: TileFlags::LETHAL,
                friction: 0.0,
            },
        ])
        .expect("tile set");
        let mut map = Tilemap::empty(12, 6, set);
        for x in 0..12 {
            map.set_tile(TileCoord::new(x, 5), TileId(1)).expect("floor");
        }
        for y in 0..5 {
            map.set_tile(TileCoord::new(0, y), TileId(1)).expect("wall");
            map.set_tile(TileCoord::new(11, y), TileId(1)).expect("wall");
        }
        let mut world = PhysicsWorld::default();
        world.set_tilemap(map);
        world
    }

    fn spawn_walker(world: &mut PhysicsWorld, x: f32, accel: f32) -> EntityId {
        let id = world.spawn_with(Entity {
            collider: Rect::new(x, 3.0, 0.8, 1.0),
            max_velocity: Vec2::new(3.0, 20.0),
            gravity: 30.0,
            flags: EntityFlags::TANGIBLE,
            ..Entity::default()
        });
        world
            .get_mut(id)
            .expect("live")
            .set_behavior(Rc::new(Walker::new(accel)));
        id
    }

    #[test]
    fn walker_turns_around_at_walls() {
        let mut world = boxed_room();
        let walker = spawn_walker(&mut world, 5.0, 10.0);

        let mut turned = false;
        for _ in 0..600 {
            world.step(DT);
            if world.get(walker).expect("live").acceleration.x < 0.0 {
                turned = true;
                break;
            }
        }
        assert!(turned);
        let entity = world.get(walker).expect("live");
        assert!(entity.flags.contains(EntityFlags::FLIP_H));
        assert!(entity.collider.right() < 11.0);
    }

    #[test]
    fn walker_dies_on_lethal_tiles() {
        let mut world = boxed_room();
        world
            .tilemap_mut()
            .expect("map")
            .set_tile(TileCoord::new(8, 4), TileId(2))
            .expect("lava");
        let walker = spawn_walker(&mut world, 5.0, 10.0);

        for _ in 0..600 {
            world.step(DT);
            if !world.is_alive(walker) {
                break;
            }
        }
        assert!(!world.is_alive(walker));
    }

    #[test]
    fn platform_shuttles_between_its_endpoints() {
        let mut world = PhysicsWorld::default();
        let start = Vec2::new(2.0, 6.0);
        let end = Vec2::new(2.0, 3.0);
        let platform = world.spawn_with(Entity {
            collider: Rect::new(start.x, start.y, 3.0, 0.5),
            flags: EntityFlags::TANGIBLE,
            ..Entity::default()
        });
        world
            .get_mut(platform)
            .expect("live")
            .set_behavior(Rc::new(MovingPlatform::new(start, end, 3.0)));

        let mut highest = start.y;
        for _ in 0..70 {
            world.step(DT);
            highest = highest.min(world.get(platform).expect("live").collider.pos.y);
        }
        assert!((highest - end.y).abs() < 1e-3);
        // The 3-unit trip takes one second at 3 units/s; by now it is heading back down.
        assert!(world.get(platform).expect("live").velocity.y > 0.0);
    }

    #[test]
    fn hazard_kills_what_touches_it() {
        let mut world = PhysicsWorld::default();
        let hazard = world.spawn_with(Entity {
            collider: Rect::new(4.0, 0.0, 1.0, 1.0),
            ..Entity::default()
        });
        world
            .get_mut(hazard)
            .expect("live")
            .set_behavior(Rc::new(Hazard));
        let runner = world.spawn_with(Entity {
            collider: Rect::new(0.0, 0.0, 1.0, 1.0),
            velocity: Vec2::new(10.0, 0.0),
            ..Entity::default()
        });

        for _ in 0..30 {
            world.step(DT);
        }
        assert!(!world.is_alive(runner));
        let hazard = world.get(hazard).expect("hazard survives");
        assert_eq!(hazard.user_data, UserData::Entity(runner));
    }
}
