use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gap left between a collider and whatever it was snapped against.
pub const COLLISION_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsConfig {
    /// Upper clamp for the frame delta, in seconds.
    pub max_frame_dt: f32,
    /// Drag opposing horizontal velocity while airborne and steering.
    pub air_drag: f32,
    /// How far below the feet ground is sampled.
    pub standing_probe_distance: f32,
    pub max_sweep_iterations: u32,
    pub max_tangible_contacts: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            max_frame_dt: 0.1,
            air_drag: 4.0,
            standing_probe_distance: 0.1,
            max_sweep_iterations: 4,
            max_tangible_contacts: 32,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read physics config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse physics config at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid physics config value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl PhysicsConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: PhysicsConfig = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|error| ConfigError::Parse {
                path: error.path().to_string(),
                message: error.into_inner().to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("max_frame_dt", self.max_frame_dt)?;
        non_negative("air_drag", self.air_drag)?;
        positive("standing_probe_distance", self.standing_probe_distance)?;
        if self.max_sweep_iterations == 0 {
            return Err(ConfigError::Invalid {
                field: "max_sweep_iterations",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Clamps a raw frame delta into `[0, max_frame_dt]`. Non-finite input becomes 0.
    pub fn clamp_dt(&self, dt: f32) -> f32 {
        if !dt.is_finite() {
            return 0.0;
        }
        dt.clamp(0.0, self.max_frame_dt)
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            message: format!("expected a finite value > 0, got {value}"),
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            message: format!("expected a finite value >= 0, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PhysicsConfig::default();
        config.validate().expect("valid");
        assert_eq!(config.max_frame_dt, 0.1);
        assert_eq!(config.max_sweep_iterations, 4);
        assert_eq!(config.max_tangible_contacts, 32);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = PhysicsConfig::from_json_str(r#"{ "air_drag": 1.5 }"#).expect("config");
        assert_eq!(config.air_drag, 1.5);
        assert_eq!(config.standing_probe_distance, 0.1);
    }

    #[test]
    fn unknown_fields_report_path() {
        let err = PhysicsConfig::from_json_str(r#"{ "gravity": 9.8 }"#).expect_err("err");
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn wrong_type_reports_field_path() {
        let err =
            PhysicsConfig::from_json_str(r#"{ "max_sweep_iterations": "four" }"#).expect_err("err");
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, "max_sweep_iterations"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = PhysicsConfig::from_json_str(r#"{ "max_frame_dt": 0.0 }"#).expect_err("err");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_frame_dt",
                ..
            }
        ));
        let err =
            PhysicsConfig::from_json_str(r#"{ "max_sweep_iterations": 0 }"#).expect_err("err");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_sweep_iterations",
                ..
            }
        ));
    }

    #[test]
    fn clamp_dt_bounds_stalls_and_garbage() {
        let config = PhysicsConfig::default();
        assert_eq!(config.clamp_dt(1.0 / 60.0), 1.0 / 60.0);
        assert_eq!(config.clamp_dt(2.5), 0.1);
        assert_eq!(config.clamp_dt(-1.0), 0.0);
        assert_eq!(config.clamp_dt(f32::NAN), 0.0);
    }

    #[test]
    fn load_reads_config_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "max_frame_dt": 0.05, "max_tangible_contacts": 8 }}"#).expect("write");

        let config = PhysicsConfig::load(file.path()).expect("load");
        assert_eq!(config.max_frame_dt, 0.05);
        assert_eq!(config.max_tangible_contacts, 8);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("physics.json");
        let err = PhysicsConfig::load(&missing).expect_err("err");
        match err {
            ConfigError::Read { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }
}
