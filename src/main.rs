use bevy::log::{error, info, LogPlugin};
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use evacsim::{EvacuationPlugin, FrameRecorder, Scenario};

fn main() -> AppExit {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, LogPlugin::default()));

    let scenario = match std::env::args().nth(1) {
        Some(path) => match Scenario::from_path(&path) {
            Ok(scenario) => scenario,
            Err(e) => {
                error!("Failed to load scenario {}: {}", path, e);
                return AppExit::error();
            }
        },
        None => {
            info!("No scenario given, using the built-in district");
            Scenario::district()
        }
    };

    let mut rng = match scenario.config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let sim = match scenario.build_simulation(&mut rng) {
        Ok(sim) => sim,
        Err(e) => {
            error!("Failed to build simulation: {}", e);
            return AppExit::error();
        }
    };

    info!("Starting simulation for {} steps", sim.config().steps);
    if sim.config().record_frames {
        match FrameRecorder::for_simulation(&sim) {
            Ok(recorder) => {
                app.insert_resource(recorder);
            }
            Err(e) => {
                error!("Failed to set up frame recording: {}", e);
                return AppExit::error();
            }
        }
    }

    app.insert_resource(sim).add_plugins(EvacuationPlugin).run()
}
