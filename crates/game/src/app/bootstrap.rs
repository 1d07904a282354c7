use std::fs;
use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use super::scenario::{Scenario, DEMO_SCENARIO};

pub(crate) struct AppWiring {
    pub(crate) scenario: Scenario,
    pub(crate) source: String,
}

pub(crate) fn build_app() -> Result<AppWiring, String> {
    init_tracing();
    info!("=== Platformer Physics Startup ===");

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    load_scenario(path)
}

fn load_scenario(path: Option<PathBuf>) -> Result<AppWiring, String> {
    let Some(path) = path else {
        info!(source = "bundled_demo", "scenario_selected");
        return Ok(AppWiring {
            scenario: Scenario::from_json_str(DEMO_SCENARIO)?,
            source: "bundled demo".to_string(),
        });
    };

    let source = path.display().to_string();
    info!(source = %source, "scenario_selected");
    let raw = fs::read_to_string(&path).map_err(|error| format!("read {source}: {error}"))?;
    let scenario = Scenario::from_json_str(&raw).map_err(|error| format!("{source}: {error}"))?;
    Ok(AppWiring { scenario, source })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
