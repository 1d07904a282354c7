mod camera;
mod config;
mod physics;
mod physics_world;
mod world;

pub use camera::Camera2D;
pub use config::{ConfigError, PhysicsConfig, COLLISION_EPSILON};
pub use physics::{
    active_friction, external_acceleration, foot_tiles, integrate, is_underfoot, sweep_against,
    EntityMoveResult, Motion, Side, SweepHit, ALL_SIDES, TOP_ONLY,
};
pub use physics_world::{FrameStats, PhysicsWorld};
pub use world::{
    Contact, Entity, EntityBehavior, EntityFlags, EntityId, EntityStore, Rect, TileCoord,
    TileFlag, TileFlags, TileId, TileInfo, TileSet, Tilemap, TilemapError, UserData, Vec2,
};
