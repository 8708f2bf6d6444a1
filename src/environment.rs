use std::collections::{HashMap, HashSet};

use crate::components::Cell;
use crate::error::{Result, SimError};
use crate::pheromones::PheromoneGrid;

/// Static evacuation terrain: bounds, hazards, exits (shelters), hospitals and per-cell
/// scores. Populated before a simulation starts, read-only once it owns the grid.
#[derive(Debug, Clone)]
pub struct Environment {
    width: usize,
    height: usize,
    hazards: HashSet<Cell>,
    exits: Vec<Cell>,
    exit_set: HashSet<Cell>,
    hospitals: HashSet<Cell>,
    hospital_scores: HashMap<Cell, f32>,
    shelter_scores: HashMap<Cell, f32>,
    transport_penalties: HashMap<Cell, f32>,
    density: Vec<f32>,
}

impl Environment {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SimError::InvalidConfiguration(format!(
                "environment dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            hazards: HashSet::new(),
            exits: Vec::new(),
            exit_set: HashSet::new(),
            hospitals: HashSet::new(),
            hospital_scores: HashMap::new(),
            shelter_scores: HashMap::new(),
            transport_penalties: HashMap::new(),
            density: vec![0.0; width * height],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    fn check(&self, cell: Cell) -> Result<usize> {
        if self.in_bounds(cell) {
            Ok(cell.y as usize * self.width + cell.x as usize)
        } else {
            Err(SimError::InvalidCoordinate {
                x: cell.x,
                y: cell.y,
                width: self.width,
                height: self.height,
            })
        }
    }

    // Registration

    fn check_value(name: &str, value: f32) -> Result<()> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(SimError::InvalidConfiguration(format!("{name} must be finite, got {value}")))
        }
    }

    /// Registers a shelter: an exit cell carrying a utility score.
    pub fn add_exit(&mut self, cell: Cell, shelter_score: f32) -> Result<()> {
        self.check(cell)?;
        Self::check_value("shelter score", shelter_score)?;
        if self.exit_set.insert(cell) {
            self.exits.push(cell);
        }
        self.shelter_scores.insert(cell, shelter_score);
        Ok(())
    }

    /// Registers an impassable transport hazard and its road penalty.
    pub fn add_hazard(&mut self, cell: Cell, transport_penalty: f32) -> Result<()> {
        self.check(cell)?;
        Self::check_value("transport penalty", transport_penalty)?;
        self.hazards.insert(cell);
        self.transport_penalties.insert(cell, transport_penalty);
        Ok(())
    }

    pub fn add_hospital(&mut self, cell: Cell, score: f32) -> Result<()> {
        self.check(cell)?;
        Self::check_value("hospital score", score)?;
        self.hospitals.insert(cell);
        self.hospital_scores.insert(cell, score);
        Ok(())
    }

    /// Penalty on a passable cell (a poor road that is still walkable).
    pub fn set_transport_penalty(&mut self, cell: Cell, penalty: f32) -> Result<()> {
        self.check(cell)?;
        Self::check_value("transport penalty", penalty)?;
        self.transport_penalties.insert(cell, penalty);
        Ok(())
    }

    pub fn set_density(&mut self, cell: Cell, density: f32) -> Result<()> {
        let idx = self.check(cell)?;
        Self::check_value("density", density)?;
        self.density[idx] = density;
        Ok(())
    }

    // Queries

    pub fn passable(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && !self.hazards.contains(&cell)
    }

    pub fn is_exit(&self, cell: Cell) -> bool {
        self.exit_set.contains(&cell)
    }

    pub fn is_hospital(&self, cell: Cell) -> bool {
        self.hospitals.contains(&cell)
    }

    pub fn is_hazard(&self, cell: Cell) -> bool {
        self.hazards.contains(&cell)
    }

    pub fn hospital_score(&self, cell: Cell) -> f32 {
        self.hospital_scores.get(&cell).copied().unwrap_or(0.0)
    }

    pub fn shelter_score(&self, cell: Cell) -> f32 {
        self.shelter_scores.get(&cell).copied().unwrap_or(0.0)
    }

    pub fn transport_penalty(&self, cell: Cell) -> f32 {
        self.transport_penalties.get(&cell).copied().unwrap_or(0.0)
    }

    pub fn density(&self, cell: Cell) -> f32 {
        if self.in_bounds(cell) {
            self.density[cell.y as usize * self.width + cell.x as usize]
        } else {
            0.0
        }
    }

    /// Exits in registration order.
    pub fn exits(&self) -> &[Cell] {
        &self.exits
    }

    pub fn hazards(&self) -> impl Iterator<Item = &Cell> {
        self.hazards.iter()
    }

    pub fn hospitals(&self) -> impl Iterator<Item = &Cell> {
        self.hospitals.iter()
    }

    /// Cells registered both as hazard and exit. Movement treats the exit test first.
    pub fn hazard_exit_overlaps(&self) -> Vec<Cell> {
        let mut overlaps: Vec<Cell> = self
            .exits
            .iter()
            .copied()
            .filter(|cell| self.hazards.contains(cell))
            .collect();
        overlaps.sort();
        overlaps
    }

    /// Cells an agent may be spawned on.
    pub fn spawnable(&self, cell: Cell) -> bool {
        self.passable(cell) && !self.is_exit(cell)
    }

    /// Deposits the attraction beacon on every exit so agents can sense shelters.
    pub fn seed_shelter_pheromones(&self, field: &mut PheromoneGrid, amount: f32) -> Result<()> {
        for &exit in &self.exits {
            field.deposit(exit, amount)?;
        }
        Ok(())
    }
}
