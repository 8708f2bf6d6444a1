use std::fs;
use std::path::{Path, PathBuf};

use bevy::log::info;
use serde::Serialize;

use crate::error::Result;
use crate::simulation::Simulation;

/// End-of-run summary; a derived view over the simulation state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvacuationReport {
    pub total_agents: usize,
    pub evacuated: usize,
    pub evacuated_percent: f32,
    pub steps: usize,
    pub history: Vec<usize>,
    pub generated_at: String,
}

impl EvacuationReport {
    pub fn from_simulation(sim: &Simulation) -> Self {
        let total_agents = sim.agents().len();
        let evacuated = sim.evacuated_count();
        let evacuated_percent = if total_agents > 0 {
            100.0 * evacuated as f32 / total_agents as f32
        } else {
            0.0
        };

        Self {
            total_agents,
            evacuated,
            evacuated_percent,
            steps: sim.steps_taken(),
            history: sim.history().to_vec(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "FINAL: {}/{} evacuated ({:.1}%)",
            self.evacuated, self.total_agents, self.evacuated_percent
        )
    }

    /// Writes `report.json` into `dir`, creating it if needed.
    pub fn write_json(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join("report.json");
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("Evacuation report saved: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Agent, Cell, Heading};
    use crate::config::SimConfig;
    use crate::environment::Environment;

    fn finished_run() -> Simulation {
        let mut env = Environment::new(5, 5).unwrap();
        env.add_exit(Cell::new(4, 2), 0.0).unwrap();
        let agents = vec![
            Agent::new(Cell::new(3, 2), Heading::North),
            Agent::new(Cell::new(0, 0), Heading::North),
        ];
        let config = SimConfig { width: 5, height: 5, ..Default::default() };
        let mut sim = Simulation::with_agents(config, env, agents).unwrap();
        sim.run(2).unwrap();
        sim
    }

    #[test]
    fn report_counts_evacuees() {
        let report = EvacuationReport::from_simulation(&finished_run());
        assert_eq!(report.total_agents, 2);
        assert_eq!(report.evacuated, 1);
        assert_eq!(report.steps, 2);
        assert_eq!(report.history.len(), 2);
        assert_eq!(report.summary_line(), "FINAL: 1/2 evacuated (50.0%)");
    }

    #[test]
    fn report_is_written_as_json() {
        let dir = std::env::temp_dir().join(format!("evacsim-report-{}", std::process::id()));
        let report = EvacuationReport::from_simulation(&finished_run());

        let path = report.write_json(&dir).unwrap();

        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["evacuated"], 1);
        assert_eq!(written["total_agents"], 2);
        fs::remove_dir_all(&dir).unwrap();
    }
}
