use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::TileCoord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u16);

impl TileId {
    pub const AIR: TileId = TileId(0);
    /// Returned for coordinates outside the map or when no map is loaded.
    pub const INVALID: TileId = TileId(u16::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileFlag {
    Tangible,
    Lethal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<TileFlag>", into = "Vec<TileFlag>")]
pub struct TileFlags(u8);

impl TileFlags {
    pub const NONE: TileFlags = TileFlags(0);
    pub const TANGIBLE: TileFlags = TileFlags(1 << 0);
    pub const LETHAL: TileFlags = TileFlags(1 << 1);

    pub const fn contains(self, other: TileFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: TileFlags) -> TileFlags {
        TileFlags(self.0 | other.0)
    }
}

impl From<Vec<TileFlag>> for TileFlags {
    fn from(flags: Vec<TileFlag>) -> Self {
        flags.into_iter().fold(TileFlags::NONE, |acc, flag| match flag {
            TileFlag::Tangible => acc.union(TileFlags::TANGIBLE),
            TileFlag::Lethal => acc.union(TileFlags::LETHAL),
        })
    }
}

impl From<TileFlags> for Vec<TileFlag> {
    fn from(flags: TileFlags) -> Self {
        let mut out = Vec::new();
        if flags.contains(TileFlags::TANGIBLE) {
            out.push(TileFlag::Tangible);
        }
        if flags.contains(TileFlags::LETHAL) {
            out.push(TileFlag::Lethal);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileInfo {
    pub name: String,
    /// Cell in the tileset atlas; only the renderer reads it.
    #[serde(default)]
    pub render_index: u16,
    #[serde(default)]
    pub flags: TileFlags,
    #[serde(default)]
    pub friction: f32,
}

impl TileInfo {
    pub fn air() -> Self {
        Self {
            name: "air".to_string(),
            render_index: 0,
            flags: TileFlags::NONE,
            friction: 0.0,
        }
    }

    pub fn is_tangible(&self) -> bool {
        self.flags.contains(TileFlags::TANGIBLE)
    }

    pub fn is_lethal(&self) -> bool {
        self.flags.contains(TileFlags::LETHAL)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("tile id {id} at ({x},{y}) is not in the tile set ({count} entries)")]
    UnknownTile { id: u16, x: i32, y: i32, count: usize },
    #[error("tile set entry 0 must be a non-tangible air tile, got '{name}'")]
    MissingAir { name: String },
    #[error("tile set is empty")]
    EmptyTileSet,
    #[error("tile coordinate ({x},{y}) is outside a {width}x{height} map")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    #[error("failed to parse tile set json at {path}: {message}")]
    Parse { path: String, message: String },
}

/// Physical properties per tile type. Entry 0 is always air.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSet {
    infos: Vec<TileInfo>,
}

impl TileSet {
    pub fn new(infos: Vec<TileInfo>) -> Result<Self, TilemapError> {
        let Some(first) = infos.first() else {
            return Err(TilemapError::EmptyTileSet);
        };
        if first.is_tangible() {
            return Err(TilemapError::MissingAir {
                name: first.name.clone(),
            });
        }
        Ok(Self { infos })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, TilemapError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let infos: Vec<TileInfo> = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|error| TilemapError::Parse {
                path: error.path().to_string(),
                message: error.into_inner().to_string(),
            })?;
        Self::new(infos)
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// # Panics
    /// When `id` is outside the table. Maps are validated on construction, so
    /// this only fires on corrupted data.
    pub fn info(&self, id: TileId) -> &TileInfo {
        let count = self.infos.len();
        self.infos.get(id.0 as usize).unwrap_or_else(|| {
            panic!("tile id {} out of range for tile set of {count} entries", id.0)
        })
    }
}

impl Default for TileSet {
    fn default() -> Self {
        Self {
            infos: vec![TileInfo::air()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    width: u32,
    height: u32,
    tiles: Vec<TileId>,
    tile_set: TileSet,
}

impl Tilemap {
    pub fn new(
        width: u32,
        height: u32,
        tiles: Vec<TileId>,
        tile_set: TileSet,
    ) -> Result<Self, TilemapError> {
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch { expected, actual });
        }
        if let Some(index) = tiles
            .iter()
            .position(|tile| tile.0 as usize >= tile_set.len())
        {
            return Err(TilemapError::UnknownTile {
                id: tiles[index].0,
                x: (index % width as usize) as i32,
                y: (index / width as usize) as i32,
                count: tile_set.len(),
            });
        }
        Ok(Self {
            width,
            height,
            tiles,
            tile_set,
        })
    }

    /// Map of air tiles.
    pub fn empty(width: u32, height: u32, tile_set: TileSet) -> Self {
        Self {
            width,
            height,
            tiles: vec![TileId::AIR; width as usize * height as usize],
            tile_set,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_set(&self) -> &TileSet {
        &self.tile_set
    }

    pub fn index_of(&self, coord: TileCoord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 {
            return None;
        }
        let (x, y) = (coord.x as u32, coord.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, coord: TileCoord) -> TileId {
        self.index_of(coord)
            .and_then(|index| self.tiles.get(index).copied())
            .unwrap_or(TileId::INVALID)
    }

    pub fn tile_info(&self, id: TileId) -> &TileInfo {
        self.tile_set.info(id)
    }

    /// Properties of the tile at `coord`; `None` outside the map.
    pub fn info_at(&self, coord: TileCoord) -> Option<&TileInfo> {
        let id = self.tile_at(coord);
        id.is_valid().then(|| self.tile_info(id))
    }

    pub fn is_tangible_at(&self, coord: TileCoord) -> bool {
        self.info_at(coord).is_some_and(TileInfo::is_tangible)
    }

    pub fn friction_at(&self, coord: TileCoord) -> f32 {
        self.info_at(coord).map_or(0.0, |info| info.friction)
    }

    pub fn set_tile(&mut self, coord: TileCoord, id: TileId) -> Result<(), TilemapError> {
        let Some(index) = self.index_of(coord) else {
            return Err(TilemapError::OutOfBounds {
                x: coord.x,
                y: coord.y,
                width: self.width,
                height: self.height,
            });
        };
        if id.0 as usize >= self.tile_set.len() {
            return Err(TilemapError::UnknownTile {
                id: id.0,
                x: coord.x,
                y: coord.y,
                count: self.tile_set.len(),
            });
        }
        self.tiles[index] = id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_set() -> TileSet {
        TileSet::new(vec![
            TileInfo::air(),
            TileInfo {
                name: "stone".to_string(),
                render_index: 1,
                flags: TileFlags::TANGIBLE,
                friction: 12.0,
            },
            TileInfo {
                name: "spikes".to_string(),
                render_index: 2,
                flags: TileFlags::TANGIBLE.union(TileFlags::LETHAL),
                friction: 12.0,
            },
        ])
        .expect("tile set")
    }

    #[test]
    fn tilemap_new_rejects_invalid_tile_count() {
        let err = Tilemap::new(2, 2, vec![TileId(0); 3], solid_set()).expect_err("err");
        assert_eq!(
            err,
            TilemapError::TileCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn tilemap_new_rejects_unknown_tile_ids() {
        let tiles = vec![TileId(0), TileId(1), TileId(0), TileId(9)];
        let err = Tilemap::new(2, 2, tiles, solid_set()).expect_err("err");
        assert_eq!(
            err,
            TilemapError::UnknownTile {
                id: 9,
                x: 1,
                y: 1,
                count: 3
            }
        );
    }

    #[test]
    fn tile_at_returns_sentinel_outside_bounds() {
        let tilemap = Tilemap::new(
            2,
            2,
            vec![TileId(0), TileId(1), TileId(2), TileId(1)],
            solid_set(),
        )
        .expect("tilemap");
        assert_eq!(tilemap.tile_at(TileCoord::new(1, 0)), TileId(1));
        assert_eq!(tilemap.tile_at(TileCoord::new(0, 1)), TileId(2));
        assert_eq!(tilemap.tile_at(TileCoord::new(2, 0)), TileId::INVALID);
        assert_eq!(tilemap.tile_at(TileCoord::new(0, -1)), TileId::INVALID);
        assert!(tilemap.info_at(TileCoord::new(-1, 0)).is_none());
        assert!(!tilemap.is_tangible_at(TileCoord::new(5, 5)));
        assert_eq!(tilemap.friction_at(TileCoord::new(5, 5)), 0.0);
    }

    #[test]
    fn tile_properties_are_looked_up_through_the_set() {
        let tilemap =
            Tilemap::new(2, 1, vec![TileId(0), TileId(2)], solid_set()).expect("tilemap");
        assert!(!tilemap.is_tangible_at(TileCoord::new(0, 0)));
        assert!(tilemap.is_tangible_at(TileCoord::new(1, 0)));
        let spikes = tilemap.info_at(TileCoord::new(1, 0)).expect("spikes");
        assert!(spikes.is_lethal());
        assert_eq!(tilemap.friction_at(TileCoord::new(1, 0)), 12.0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn tile_info_out_of_range_is_fatal() {
        let set = solid_set();
        let _ = set.info(TileId(3));
    }

    #[test]
    fn tile_set_requires_air_first() {
        let err = TileSet::new(vec![TileInfo {
            name: "stone".to_string(),
            render_index: 1,
            flags: TileFlags::TANGIBLE,
            friction: 1.0,
        }])
        .expect_err("err");
        assert_eq!(
            err,
            TilemapError::MissingAir {
                name: "stone".to_string()
            }
        );
        assert_eq!(TileSet::new(Vec::new()), Err(TilemapError::EmptyTileSet));
    }

    #[test]
    fn tile_set_parses_flag_names_from_json() {
        let set = TileSet::from_json_str(
            r#"[
                { "name": "air" },
                { "name": "ice", "render_index": 4, "flags": ["tangible"], "friction": 0.5 },
                { "name": "lava", "flags": ["lethal"] }
            ]"#,
        )
        .expect("tile set");
        assert_eq!(set.len(), 3);
        assert!(set.info(TileId(1)).is_tangible());
        assert_eq!(set.info(TileId(1)).friction, 0.5);
        assert!(set.info(TileId(2)).is_lethal());
        assert!(!set.info(TileId(2)).is_tangible());
    }

    #[test]
    fn tile_set_parse_error_reports_json_path() {
        let raw = r#"[{ "name": "air" }, { "name": "x", "flags": ["sticky"] }]"#;
        let err = TileSet::from_json_str(raw).expect_err("err");
        match err {
            TilemapError::Parse { path, .. } => assert!(path.starts_with("[1].flags"), "{path}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn set_tile_validates_bounds_and_ids() {
        let mut tilemap = Tilemap::empty(3, 3, solid_set());
        tilemap
            .set_tile(TileCoord::new(1, 2), TileId(1))
            .expect("set");
        assert!(tilemap.is_tangible_at(TileCoord::new(1, 2)));
        assert!(matches!(
            tilemap.set_tile(TileCoord::new(3, 0), TileId(1)),
            Err(TilemapError::OutOfBounds { .. })
        ));
        assert!(matches!(
            tilemap.set_tile(TileCoord::new(0, 0), TileId(7)),
            Err(TilemapError::UnknownTile { .. })
        ));
    }
}
