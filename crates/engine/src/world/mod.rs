mod entity;
mod geometry;
mod store;
mod tilemap;

pub use entity::{Contact, Entity, EntityBehavior, EntityFlags, EntityId, UserData};
pub use geometry::{Rect, TileCoord, Vec2};
pub use store::EntityStore;
pub use tilemap::{TileFlag, TileFlags, TileId, TileInfo, TileSet, Tilemap, TilemapError};
