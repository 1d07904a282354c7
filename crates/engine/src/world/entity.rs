use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::rc::Rc;

use super::geometry::{Rect, TileCoord, Vec2};
use crate::physics_world::PhysicsWorld;

/// Generation-indexed handle into the [`EntityStore`](super::EntityStore).
///
/// Index 0 is the permanent null slot. A handle resolves only while the slot it
/// names still carries the same generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub generation: u32,
    pub index: u32,
}

impl EntityId {
    pub const NULL: EntityId = EntityId {
        generation: 0,
        index: 0,
    };

    pub fn is_null(self) -> bool {
        self.index == 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EntityFlags(u16);

impl EntityFlags {
    pub const NONE: EntityFlags = EntityFlags(0);
    pub const ON_GROUND: EntityFlags = EntityFlags(1 << 0);
    pub const TANGIBLE: EntityFlags = EntityFlags(1 << 1);
    pub const TANGIBLE_ON_TOP: EntityFlags = EntityFlags(1 << 2);
    /// Skips entity-vs-entity tests. Tiles still block.
    pub const NO_COLLIDE: EntityFlags = EntityFlags(1 << 3);
    /// Never integrated or swept; may still be stood on and collided with.
    pub const STATIC: EntityFlags = EntityFlags(1 << 4);
    pub const BLOCKS_CAMERA_X: EntityFlags = EntityFlags(1 << 5);
    pub const BLOCKS_CAMERA_Y: EntityFlags = EntityFlags(1 << 6);
    pub const MARKED_FOR_DEATH: EntityFlags = EntityFlags(1 << 7);
    pub const INVISIBLE: EntityFlags = EntityFlags(1 << 8);
    pub const FLIP_H: EntityFlags = EntityFlags(1 << 9);

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// True when every bit of `other` is set.
    pub const fn contains(self, other: EntityFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when any bit of `other` is set.
    pub const fn intersects(self, other: EntityFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: EntityFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: EntityFlags) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: EntityFlags, enabled: bool) {
        if enabled {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl BitOr for EntityFlags {
    type Output = EntityFlags;

    fn bitor(self, rhs: EntityFlags) -> EntityFlags {
        EntityFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for EntityFlags {
    fn bitor_assign(&mut self, rhs: EntityFlags) {
        self.0 |= rhs.0;
    }
}

/// Per-entity payload owned by game code.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum UserData {
    #[default]
    None,
    Entity(EntityId),
    Cell(TileCoord),
    Int(i64),
}

/// One side of a collision, as seen by the entity receiving the hook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub other: EntityId,
    /// Outward normal of the side of `other` that was touched.
    pub collider_normal: Vec2,
    /// Equal to `collider_normal` for a swept contact, zero when the pair
    /// already overlapped (teleports).
    pub collision_normal: Vec2,
    /// Top-left of the receiving entity's collider at the moment of contact.
    pub position: Vec2,
}

impl Contact {
    pub fn is_overlap(&self) -> bool {
        self.collision_normal.is_zero()
    }
}

/// Behavior hooks attached to an entity archetype.
///
/// Hooks take `&self` so one archetype instance can be shared between entities
/// and so a hook may re-enter the world (spawning, moving other entities,
/// deferring kills). Mutable per-entity state belongs on the [`Entity`].
pub trait EntityBehavior: fmt::Debug {
    /// Runs once per frame. The default simply moves the entity.
    fn on_update(&self, world: &mut PhysicsWorld, me: EntityId) {
        world.move_entity_in_world(me);
    }

    fn on_collide(&self, _world: &mut PhysicsWorld, _me: EntityId, _contact: &Contact) {}

    /// `other` is the entity that started (`is_standing == true`) or stopped
    /// standing on `me`.
    fn on_stand(
        &self,
        _world: &mut PhysicsWorld,
        _me: EntityId,
        _other: EntityId,
        _is_standing: bool,
    ) {
    }

    fn on_kill(&self, _world: &mut PhysicsWorld, _me: EntityId) {}
}

#[derive(Debug, Clone, Default)]
pub struct Entity {
    pub id: EntityId,
    pub collider: Rect,
    pub velocity: Vec2,
    /// Acceleration applied by the controller or AI. External forces are derived
    /// each frame and never stored here.
    pub acceleration: Vec2,
    /// Per-axis speed clamp. A non-positive component disables the clamp on that axis.
    pub max_velocity: Vec2,
    pub gravity: f32,
    /// Friction other entities feel while standing on this one.
    pub friction: f32,
    pub flags: EntityFlags,
    pub standing_entity_id: EntityId,
    pub left_standing_tile: TileCoord,
    pub right_standing_tile: TileCoord,
    pub user_data: UserData,
    pub behavior: Option<Rc<dyn EntityBehavior>>,
}

impl Entity {
    pub fn is_on_ground(&self) -> bool {
        self.flags.contains(EntityFlags::ON_GROUND)
    }

    pub fn is_tangible(&self) -> bool {
        self.flags
            .intersects(EntityFlags::TANGIBLE | EntityFlags::TANGIBLE_ON_TOP)
    }

    /// Takes part in entity-vs-entity tests this frame.
    pub fn is_collidable(&self) -> bool {
        !self
            .flags
            .intersects(EntityFlags::NO_COLLIDE | EntityFlags::MARKED_FOR_DEATH)
    }

    pub fn set_behavior(&mut self, behavior: Rc<dyn EntityBehavior>) {
        self.behavior = Some(behavior);
    }
}
