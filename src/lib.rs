//! Pedestrian evacuation driven by an ant-colony pheromone field.
//!
//! Agents walk a grid toward shelters, following a pheromone field that diffuses and
//! decays each step and is biased by hospitals, shelters, road penalties and crowd
//! density. [`Simulation`] runs standalone; [`EvacuationPlugin`] runs it inside a
//! headless bevy app.

use bevy::prelude::*;

pub mod agent;
pub mod colors;
pub mod components;
pub mod config;
pub mod environment;
pub mod error;
pub mod pheromones;
pub mod report;
pub mod scenario;
pub mod simulation;
pub mod systems;
pub mod video;

pub use agent::{choose_heading, MoveOutcome, MoveWeights};
pub use components::{Agent, Cell, Heading};
pub use config::SimConfig;
pub use environment::Environment;
pub use error::{Result, SimError};
pub use pheromones::{FieldUpdate, PheromoneGrid};
pub use report::EvacuationReport;
pub use scenario::Scenario;
pub use simulation::Simulation;
pub use video::FrameRecorder;

use systems::*;

/// Steps an inserted [`Simulation`] once per update until its step budget is spent,
/// then writes the report and requests exit.
pub struct EvacuationPlugin;

impl Plugin for EvacuationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RunState>().add_systems(
            Update,
            (simulation_step_system, frame_capture_system, run_limit_system)
                .chain()
                .run_if(resource_exists::<Simulation>),
        );
    }
}
