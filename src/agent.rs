use crate::components::{Agent, Cell, Heading};
use crate::config::SimConfig;
use crate::environment::Environment;
use crate::error::Result;
use crate::pheromones::PheromoneGrid;

/// Static terrain weights applied on top of the pheromone value of a candidate cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveWeights {
    pub hospital: f32,
    pub shelter: f32,
    pub transport: f32,
}

impl Default for MoveWeights {
    fn default() -> Self {
        Self {
            hospital: 0.01,
            shelter: 0.01,
            transport: 0.5,
        }
    }
}

impl From<&SimConfig> for MoveWeights {
    fn from(config: &SimConfig) -> Self {
        Self {
            hospital: config.hospital_weight,
            shelter: config.shelter_weight,
            transport: config.transport_weight,
        }
    }
}

/// What a single move did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    /// Already evacuated; nothing happened.
    Inert,
    Moved(Cell),
    /// Target was impassable; the agent stayed put but turned.
    Blocked(Cell),
    Evacuated,
}

/// Attractiveness of a passable candidate cell.
pub fn cell_score(env: &Environment, field: &PheromoneGrid, cell: Cell, weights: &MoveWeights) -> f32 {
    let mut score = field.get(cell);
    score += env.hospital_score(cell) * weights.hospital;
    score += env.shelter_score(cell) * weights.shelter;
    score -= env.transport_penalty(cell) * weights.transport;
    score
}

/// Strictly-best passable neighbour in N, E, S, W order; ties keep the earlier
/// direction and a fully boxed-in agent keeps `current`.
pub fn choose_heading(
    env: &Environment,
    field: &PheromoneGrid,
    from: Cell,
    current: Heading,
    weights: &MoveWeights,
) -> Heading {
    let mut best = current;
    let mut best_score = f32::NEG_INFINITY;

    for heading in Heading::ALL {
        let candidate = from.step(heading);
        if !env.passable(candidate) {
            continue;
        }
        let score = cell_score(env, field, candidate, weights);
        if score > best_score {
            best_score = score;
            best = heading;
        }
    }

    best
}

impl Agent {
    /// Advances this agent by one step, depositing on the resulting cell unless it
    /// evacuated. Exits are tested before passability.
    pub fn step(
        &mut self,
        env: &Environment,
        field: &mut PheromoneGrid,
        weights: &MoveWeights,
        deposit_amount: f32,
    ) -> Result<MoveOutcome> {
        let (cell, heading) = match *self {
            Agent::Active { cell, heading } => (cell, heading),
            Agent::Evacuated { .. } => return Ok(MoveOutcome::Inert),
        };

        let heading = choose_heading(env, field, cell, heading, weights);
        let target = cell.step(heading);

        if env.is_exit(target) {
            *self = Agent::Evacuated { last_cell: cell };
            return Ok(MoveOutcome::Evacuated);
        }

        let (next, outcome) = if env.passable(target) {
            (target, MoveOutcome::Moved(target))
        } else {
            (cell, MoveOutcome::Blocked(cell))
        };

        *self = Agent::Active { cell: next, heading };
        field.deposit(next, deposit_amount)?;
        Ok(outcome)
    }
}
