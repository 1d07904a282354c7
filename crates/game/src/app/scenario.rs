use std::collections::BTreeMap;
use std::rc::Rc;

use engine::{
    Camera2D, Entity, EntityBehavior, EntityFlags, EntityId, PhysicsConfig, PhysicsWorld, Rect,
    TileId, TileInfo, TileSet, Tilemap, Vec2,
};
use serde::Deserialize;

use super::behaviors::{Hazard, MovingPlatform, Walker};

pub(crate) const DEMO_SCENARIO: &str = include_str!("../../scenarios/demo.json");

const DEFAULT_DT: f32 = 1.0 / 60.0;

/// Headless level description: tile set, map rows, spawns and how long to run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default)]
    pub(crate) physics: PhysicsConfig,
    pub(crate) tiles: Vec<TileInfo>,
    /// Single-character keys mapping map rows to tile ids.
    pub(crate) legend: BTreeMap<String, TileId>,
    pub(crate) rows: Vec<String>,
    #[serde(default = "default_dt")]
    pub(crate) dt: f32,
    pub(crate) frames: u32,
    #[serde(default)]
    pub(crate) camera: Option<CameraSpec>,
    #[serde(default)]
    pub(crate) spawns: Vec<SpawnSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CameraSpec {
    pub(crate) viewport: Vec2,
    pub(crate) follow: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SpawnSpec {
    pub(crate) name: String,
    pub(crate) at: Vec2,
    pub(crate) size: Vec2,
    #[serde(default)]
    pub(crate) velocity: Vec2,
    #[serde(default)]
    pub(crate) max_velocity: Vec2,
    #[serde(default)]
    pub(crate) gravity: f32,
    #[serde(default)]
    pub(crate) friction: f32,
    #[serde(default)]
    pub(crate) flags: Vec<FlagName>,
    #[serde(default)]
    pub(crate) behavior: BehaviorSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FlagName {
    Tangible,
    TangibleOnTop,
    NoCollide,
    Static,
    BlocksCameraX,
    BlocksCameraY,
    Invisible,
}

impl FlagName {
    fn to_flags(self) -> EntityFlags {
        match self {
            FlagName::Tangible => EntityFlags::TANGIBLE,
            FlagName::TangibleOnTop => EntityFlags::TANGIBLE_ON_TOP,
            FlagName::NoCollide => EntityFlags::NO_COLLIDE,
            FlagName::Static => EntityFlags::STATIC,
            FlagName::BlocksCameraX => EntityFlags::BLOCKS_CAMERA_X,
            FlagName::BlocksCameraY => EntityFlags::BLOCKS_CAMERA_Y,
            FlagName::Invisible => EntityFlags::INVISIBLE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub(crate) enum BehaviorSpec {
    #[default]
    None,
    Walker {
        accel: f32,
    },
    Platform {
        to: Vec2,
        speed: f32,
    },
    Hazard,
}

/// A scenario turned into a live world, with spawn names kept for reporting.
#[derive(Debug)]
pub(crate) struct LoadedScenario {
    pub(crate) world: PhysicsWorld,
    pub(crate) named: Vec<(String, EntityId)>,
    pub(crate) camera: Option<Camera2D>,
    pub(crate) dt: f32,
    pub(crate) frames: u32,
}

impl LoadedScenario {
    pub(crate) fn id_of(&self, name: &str) -> Option<EntityId> {
        self.named
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, id)| *id)
    }
}

fn default_dt() -> f32 {
    DEFAULT_DT
}

impl Scenario {
    pub(crate) fn from_json_str(raw: &str) -> Result<Self, String> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let path = error.path().to_string();
            format!("parse scenario at {path}: {}", error.into_inner())
        })
    }

    pub(crate) fn build_tilemap(&self) -> Result<Tilemap, String> {
        let tile_set =
            TileSet::new(self.tiles.clone()).map_err(|error| format!("tile set: {error}"))?;

        let mut legend = BTreeMap::new();
        for (key, id) in &self.legend {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(symbol), None) => {
                    legend.insert(symbol, *id);
                }
                _ => return Err(format!("legend key {key:?} must be a single character")),
            }
        }

        let height = self.rows.len();
        let width = self.rows.first().map_or(0, |row| row.chars().count());
        let mut tiles = Vec::with_capacity(width * height);
        for (y, row) in self.rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(format!(
                    "row {y} has {} tiles, expected {width}",
                    row.chars().count()
                ));
            }
            for (x, symbol) in row.chars().enumerate() {
                let id = legend
                    .get(&symbol)
                    .copied()
                    .ok_or_else(|| format!("row {y} column {x}: no legend entry for {symbol:?}"))?;
                tiles.push(id);
            }
        }

        Tilemap::new(width as u32, height as u32, tiles, tile_set)
            .map_err(|error| format!("tilemap: {error}"))
    }

    pub(crate) fn build(&self) -> Result<LoadedScenario, String> {
        self.physics
            .validate()
            .map_err(|error| format!("physics: {error}"))?;
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(format!("dt must be a finite value > 0, got {}", self.dt));
        }

        let mut world = PhysicsWorld::new(self.physics.clone());
        world.set_tilemap(self.build_tilemap()?);

        let mut named = Vec::with_capacity(self.spawns.len());
        for spawn in &self.spawns {
            if named.iter().any(|(name, _)| name == &spawn.name) {
                return Err(format!("duplicate spawn name {:?}", spawn.name));
            }
            let id = world.spawn_with(spawn.to_entity());
            if let (Some(entity), Some(behavior)) = (world.get_mut(id), spawn.to_behavior()) {
                entity.set_behavior(behavior);
            }
            named.push((spawn.name.clone(), id));
        }

        let camera = match &self.camera {
            Some(spec) => {
                let follow = named
                    .iter()
                    .find(|(name, _)| name == &spec.follow)
                    .map(|(_, id)| *id)
                    .ok_or_else(|| format!("camera follows unknown spawn {:?}", spec.follow))?;
                Some(Camera2D::new(spec.viewport).following(follow))
            }
            None => None,
        };

        Ok(LoadedScenario {
            world,
            named,
            camera,
            dt: self.dt,
            frames: self.frames,
        })
    }
}

impl SpawnSpec {
    fn to_entity(&self) -> Entity {
        let flags = self
            .flags
            .iter()
            .fold(EntityFlags::NONE, |flags, name| flags | name.to_flags());
        Entity {
            collider: Rect::new(self.at.x, self.at.y, self.size.x, self.size.y),
            velocity: self.velocity,
            max_velocity: self.max_velocity,
            gravity: self.gravity,
            friction: self.friction,
            flags,
            ..Entity::default()
        }
    }

    fn to_behavior(&self) -> Option<Rc<dyn EntityBehavior>> {
        match self.behavior {
            BehaviorSpec::None => None,
            BehaviorSpec::Walker { accel } => Some(Rc::new(Walker::new(accel))),
            BehaviorSpec::Platform { to, speed } => {
                Some(Rc::new(MovingPlatform::new(self.at, to, speed)))
            }
            BehaviorSpec::Hazard => Some(Rc::new(Hazard)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#####"{
        "tiles": [
            { "name": "air" },
            { "name": "stone", "render_index": 1, "flags": ["tangible"], "friction": 8.0 }
        ],
        "legend": { ".": 0, "#": 1 },
        "rows": [
            "....",
            "....",
            "####"
        ],
        "frames": 10,
        "spawns": [
            { "name": "box", "at": { "x": 1.0, "y": 0.0 }, "size": { "x": 1.0, "y": 1.0 }, "gravity": 20.0 }
        ]
    }"#####;

    #[test]
    fn bundled_demo_parses_and_builds() {
        let scenario = Scenario::from_json_str(DEMO_SCENARIO).expect("demo parses");
        let loaded = scenario.build().expect("demo builds");
        let tilemap = loaded.world.tilemap().expect("tilemap");
        assert_eq!(tilemap.width(), 20);
        assert_eq!(tilemap.height(), 12);
        assert!(loaded.id_of("player").is_some());
        assert!(loaded.camera.is_some());
    }

    #[test]
    fn small_scenario_uses_defaults() {
        let scenario = Scenario::from_json_str(SMALL).expect("parses");
        assert_eq!(scenario.dt, DEFAULT_DT);
        assert_eq!(scenario.physics, PhysicsConfig::default());

        let loaded = scenario.build().expect("builds");
        let id = loaded.id_of("box").expect("box");
        let entity = loaded.world.get(id).expect("live");
        assert_eq!(entity.gravity, 20.0);
        assert!(entity.behavior.is_none());
        assert!(loaded
            .world
            .tilemap()
            .expect("tilemap")
            .is_tangible_at(engine::TileCoord::new(3, 2)));
    }

    #[test]
    fn spawn_flags_and_behaviors_are_applied() {
        let raw = SMALL.replace(
            r#""gravity": 20.0 }"#,
            r#""gravity": 20.0, "flags": ["tangible", "blocks_camera_x"], "behavior": { "kind": "walker", "accel": 5.0 } }"#,
        );
        let loaded = Scenario::from_json_str(&raw)
            .expect("parses")
            .build()
            .expect("builds");
        let entity = loaded
            .world
            .get(loaded.id_of("box").expect("box"))
            .expect("live");
        assert!(entity
            .flags
            .contains(EntityFlags::TANGIBLE | EntityFlags::BLOCKS_CAMERA_X));
        assert!(entity.behavior.is_some());
    }

    #[test]
    fn unknown_legend_symbol_is_reported_with_position() {
        let raw = SMALL.replace(r#####""####""#####, r#####""##x#""#####);
        let err = Scenario::from_json_str(&raw)
            .expect("parses")
            .build()
            .expect_err("unknown symbol");
        assert!(err.contains("row 2 column 2"), "{err}");
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let raw = SMALL.replace(r#####""####""#####, r#####""###""#####);
        let err = Scenario::from_json_str(&raw)
            .expect("parses")
            .build()
            .expect_err("ragged");
        assert!(err.contains("row 2 has 3 tiles"), "{err}");
    }

    #[test]
    fn parse_errors_name_the_json_path() {
        let raw = SMALL.replace(r#""frames": 10"#, r#""frames": "ten""#);
        let err = Scenario::from_json_str(&raw).expect_err("bad frames");
        assert!(err.contains("frames"), "{err}");
    }

    #[test]
    fn camera_must_follow_a_known_spawn() {
        let raw = SMALL.replace(
            r#""frames": 10,"#,
            r#""frames": 10, "camera": { "viewport": { "x": 4.0, "y": 3.0 }, "follow": "ghost" },"#,
        );
        let err = Scenario::from_json_str(&raw)
            .expect("parses")
            .build()
            .expect_err("unknown follow");
        assert!(err.contains("ghost"), "{err}");
    }
}
