use std::process::ExitCode;

use engine::EntityFlags;
use tracing::{debug, error, info};

use super::bootstrap::AppWiring;
use super::scenario::LoadedScenario;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) frames: u64,
    pub(crate) updates: usize,
    pub(crate) killed: usize,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let mut loaded = match app.scenario.build() {
        Ok(loaded) => loaded,
        Err(err) => {
            error!(error = %err, source = %app.source, "scenario_build_failed");
            return ExitCode::FAILURE;
        }
    };

    let summary = run_frames(&mut loaded);
    info!(
        frames = summary.frames,
        updates = summary.updates,
        killed = summary.killed,
        live = loaded.world.entities().live_count(),
        "scenario_finished"
    );
    report_entities(&loaded);
    ExitCode::SUCCESS
}

pub(crate) fn run_frames(loaded: &mut LoadedScenario) -> RunSummary {
    let mut summary = RunSummary::default();
    for _ in 0..loaded.frames {
        let stats = loaded.world.step(loaded.dt);
        if let Some(camera) = loaded.camera.as_mut() {
            camera.update(&loaded.world);
        }
        summary.frames += 1;
        summary.updates += stats.updated;
        summary.killed += stats.killed;
        if stats.killed > 0 {
            debug!(frame = stats.frame_index, killed = stats.killed, "entities_removed");
        }
    }
    summary
}

fn report_entities(loaded: &LoadedScenario) {
    for (name, id) in &loaded.named {
        match loaded.world.entities().peek(*id) {
            Some(entity) => info!(
                name = %name,
                entity = %id,
                x = entity.collider.pos.x,
                y = entity.collider.pos.y,
                on_ground = entity.flags.contains(EntityFlags::ON_GROUND),
                standing_on = %entity.standing_entity_id,
                "entity_final_state"
            ),
            None => info!(name = %name, entity = %id, "entity_dead"),
        }
    }
    if let Some(camera) = loaded.camera {
        info!(x = camera.position.x, y = camera.position.y, "camera_final_position");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::scenario::{Scenario, DEMO_SCENARIO};

    #[test]
    fn demo_scenario_plays_out() {
        let mut loaded = Scenario::from_json_str(DEMO_SCENARIO)
            .expect("parses")
            .build()
            .expect("builds");
        let player = loaded.id_of("player").expect("player");
        let beetle = loaded.id_of("beetle").expect("beetle");
        let lift = loaded.id_of("lift").expect("lift");
        let crate_id = loaded.id_of("crate").expect("crate");

        let summary = run_frames(&mut loaded);

        assert_eq!(summary.frames, 600);
        assert_eq!(summary.killed, 2);
        // The player walks into the spikes; the beetle turns at the wall and meets the saw.
        assert!(!loaded.world.is_alive(player));
        assert!(!loaded.world.is_alive(beetle));

        let cargo = loaded.world.get(crate_id).expect("crate survives");
        assert_eq!(cargo.standing_entity_id, lift);
        assert!(cargo.flags.contains(EntityFlags::ON_GROUND));
    }

    #[test]
    fn camera_stays_inside_the_map() {
        let mut loaded = Scenario::from_json_str(DEMO_SCENARIO)
            .expect("parses")
            .build()
            .expect("builds");
        loaded.frames = 30;
        run_frames(&mut loaded);

        let camera = loaded.camera.expect("camera");
        assert!(camera.position.x >= 0.0 && camera.position.x <= 10.0);
        assert!(camera.position.y >= 0.0 && camera.position.y <= 6.0);
    }
}
