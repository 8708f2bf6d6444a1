use std::fs;
use std::path::Path;

use bevy::log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{Agent, Cell, Heading};
use crate::config::SimConfig;
use crate::environment::Environment;
use crate::error::Result;
use crate::simulation::Simulation;

/// Shelter with a utility score; registered as an exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelterRecord {
    #[serde(default)]
    pub position: Option<Cell>,
    pub utility_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalRecord {
    #[serde(default)]
    pub position: Option<Cell>,
    pub icu_beds_available: f32,
    pub ventilators_available: f32,
    pub staff_on_duty: f32,
    pub oxygen_cylinders_available: f32,
}

impl HospitalRecord {
    pub fn capacity_score(&self) -> f32 {
        self.icu_beds_available + self.ventilators_available + self.staff_on_duty + self.oxygen_cylinders_available
    }
}

/// Transport point; always blocks movement, poor roads also carry a penalty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportRecord {
    #[serde(default)]
    pub position: Option<Cell>,
    pub road_condition: String,
}

impl TransportRecord {
    pub fn penalty(&self) -> f32 {
        if self.road_condition.eq_ignore_ascii_case("poor") {
            1.0
        } else {
            0.0
        }
    }
}

/// Warehouse stock treated as a crowd density zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityRecord {
    #[serde(default)]
    pub position: Option<Cell>,
    #[serde(default)]
    pub wheat_kg: f32,
    #[serde(default)]
    pub rice_kg: f32,
}

impl DensityRecord {
    pub fn density(&self) -> f32 {
        (self.wheat_kg + self.rice_kg) / 1000.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpawn {
    pub x: i32,
    pub y: i32,
    pub heading: Heading,
}

/// A full evacuation setup: parameters, feature records and optional fixed agents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub config: SimConfig,
    pub shelters: Vec<ShelterRecord>,
    pub hospitals: Vec<HospitalRecord>,
    pub transport: Vec<TransportRecord>,
    pub density_zones: Vec<DensityRecord>,
    pub agents: Vec<AgentSpawn>,
}

// Records without an explicit position are laid out along fixed diagonals.
fn shelter_layout(i: i32) -> Cell {
    Cell::new(10 + i * 3, 40 - i * 3)
}

fn hospital_layout(i: i32) -> Cell {
    Cell::new(5 + i * 5, 5 + i * 5)
}

fn transport_layout(i: i32) -> Cell {
    Cell::new(25 + i * 2, 25 + i * 2)
}

fn density_layout(i: i32) -> Cell {
    Cell::new(15 + i * 2, 15 + i * 2)
}

impl Scenario {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let scenario = Self::from_json_str(&json)?;
        info!(
            "Loaded scenario {}: {} shelters, {} hospitals, {} transport points, {} density zones",
            path.display(),
            scenario.shelters.len(),
            scenario.hospitals.len(),
            scenario.transport.len(),
            scenario.density_zones.len()
        );
        Ok(scenario)
    }

    /// Small city district used when no scenario file is given.
    pub fn district() -> Self {
        let shelter_scores = [8.5, 7.0, 9.2, 6.4, 7.8];
        let hospitals = [(12.0, 5.0, 40.0, 20.0), (6.0, 3.0, 25.0, 12.0), (20.0, 8.0, 60.0, 30.0)];
        let roads = ["Good", "Poor", "Fair", "Poor", "Good", "Poor"];

        Self {
            config: SimConfig::default(),
            shelters: shelter_scores
                .iter()
                .map(|&utility_score| ShelterRecord { position: None, utility_score })
                .collect(),
            hospitals: hospitals
                .iter()
                .map(|&(icu, vent, staff, oxygen)| HospitalRecord {
                    position: None,
                    icu_beds_available: icu,
                    ventilators_available: vent,
                    staff_on_duty: staff,
                    oxygen_cylinders_available: oxygen,
                })
                .collect(),
            transport: roads
                .iter()
                .map(|condition| TransportRecord {
                    position: None,
                    road_condition: condition.to_string(),
                })
                .collect(),
            density_zones: Vec::new(),
            agents: Vec::new(),
        }
    }

    pub fn build_environment(&self) -> Result<Environment> {
        let mut env = Environment::new(self.config.width, self.config.height)?;

        for (i, shelter) in self.shelters.iter().enumerate() {
            let cell = shelter.position.unwrap_or_else(|| shelter_layout(i as i32));
            env.add_exit(cell, shelter.utility_score)?;
        }
        for (i, road) in self.transport.iter().enumerate() {
            let cell = road.position.unwrap_or_else(|| transport_layout(i as i32));
            env.add_hazard(cell, road.penalty())?;
        }
        for (i, hospital) in self.hospitals.iter().enumerate() {
            let cell = hospital.position.unwrap_or_else(|| hospital_layout(i as i32));
            env.add_hospital(cell, hospital.capacity_score())?;
        }
        for (i, zone) in self.density_zones.iter().enumerate() {
            let cell = zone.position.unwrap_or_else(|| density_layout(i as i32));
            env.set_density(cell, zone.density())?;
        }

        Ok(env)
    }

    /// Fixed spawns when the scenario lists any, random placement otherwise.
    pub fn build_simulation<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Simulation> {
        let env = self.build_environment()?;
        if self.agents.is_empty() {
            Simulation::new(self.config.clone(), env, rng)
        } else {
            let agents = self
                .agents
                .iter()
                .map(|spawn| Agent::new(Cell::new(spawn.x, spawn.y), spawn.heading))
                .collect();
            Simulation::with_agents(self.config.clone(), env, agents)
        }
    }
}
