use bevy::app::AppExit;
use bevy::log::{error, info};
use bevy::prelude::*;

use crate::report::EvacuationReport;
use crate::simulation::Simulation;
use crate::video::FrameRecorder;

/// Progress of the headless run as seen by the bevy schedule.
#[derive(Resource, Default)]
pub struct RunState {
    pub finished: bool,
    pub failed: bool,
    pub report: Option<EvacuationReport>,
}

pub fn simulation_step_system(mut sim: ResMut<Simulation>, mut run: ResMut<RunState>) {
    if run.finished || sim.is_complete() {
        return;
    }

    if let Err(e) = sim.step() {
        error!("Simulation step {} failed: {}", sim.steps_taken(), e);
        run.failed = true;
    }
}

/// Frames are only captured when a `FrameRecorder` resource is present.
pub fn frame_capture_system(
    sim: Res<Simulation>,
    run: Res<RunState>,
    mut recorder: Option<ResMut<FrameRecorder>>,
) {
    if run.finished || !sim.is_changed() {
        return;
    }
    if let Some(ref mut recorder) = recorder {
        if let Err(e) = recorder.capture(&sim) {
            error!("Failed to capture frame at step {}: {}", sim.steps_taken(), e);
        }
    }
}

/// Writes the report and frames once the step budget is spent, then exits the app.
pub fn run_limit_system(
    sim: Res<Simulation>,
    mut run: ResMut<RunState>,
    recorder: Option<Res<FrameRecorder>>,
    mut exit: EventWriter<AppExit>,
) {
    if run.finished || !(sim.is_complete() || run.failed) {
        return;
    }
    run.finished = true;

    let report = EvacuationReport::from_simulation(&sim);
    info!("{}", report.summary_line());

    let output_dir = &sim.config().output_dir;
    if let Err(e) = report.write_json(output_dir) {
        error!("Failed to write evacuation report: {}", e);
    }
    if let Some(recorder) = recorder {
        if let Err(e) = recorder.save_png_sequence(std::path::Path::new(output_dir).join("frames")) {
            error!("Failed to save frames: {}", e);
        }
    }
    run.report = Some(report);

    if run.failed {
        exit.send(AppExit::error());
    } else {
        exit.send(AppExit::Success);
    }
}
