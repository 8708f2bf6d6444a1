use bevy::log::{debug, info, warn};
use bevy::prelude::Resource;
use rand::Rng;

use crate::agent::{MoveOutcome, MoveWeights};
use crate::components::{Agent, Cell, Heading};
use crate::config::SimConfig;
use crate::environment::Environment;
use crate::error::{Result, SimError};
use crate::pheromones::{FieldUpdate, PheromoneGrid};

/// The evacuation run: owns the terrain, the pheromone field and the ordered agent list.
///
/// Agents only touch the field through the `&mut` handed to them while the simulation
/// walks the list, so agent `i` sees what agents `0..i` deposited earlier in the step.
#[derive(Resource, Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    env: Environment,
    field: PheromoneGrid,
    agents: Vec<Agent>,
    weights: MoveWeights,
    update: FieldUpdate,
    steps_taken: usize,
    history: Vec<usize>,
}

impl Simulation {
    /// Builds a run with `config.agent_count` agents on random passable, non-exit cells.
    pub fn new<R: Rng + ?Sized>(config: SimConfig, env: Environment, rng: &mut R) -> Result<Self> {
        check_dimensions(&config, &env)?;

        let candidates = (0..env.height() as i32)
            .flat_map(|y| (0..env.width() as i32).map(move |x| Cell::new(x, y)))
            .filter(|&cell| env.spawnable(cell))
            .count();
        if config.agent_count > 0 && candidates == 0 {
            return Err(SimError::InvalidConfiguration(
                "no passable non-exit cell to place agents on".to_string(),
            ));
        }

        let mut agents = Vec::with_capacity(config.agent_count);
        for _ in 0..config.agent_count {
            let cell = loop {
                let x = rng.gen_range(0..env.width() as i32);
                let y = rng.gen_range(0..env.height() as i32);
                let cell = Cell::new(x, y);
                if env.spawnable(cell) {
                    break cell;
                }
            };
            let heading = Heading::from_index(rng.gen_range(0..4));
            agents.push(Agent::new(cell, heading));
        }

        Self::assemble(config, env, agents)
    }

    /// Builds a run from explicit agents, e.g. a scenario with fixed start positions.
    pub fn with_agents(config: SimConfig, env: Environment, agents: Vec<Agent>) -> Result<Self> {
        check_dimensions(&config, &env)?;

        for agent in &agents {
            if let Agent::Active { cell, .. } = agent {
                if !env.in_bounds(*cell) {
                    return Err(SimError::InvalidCoordinate {
                        x: cell.x,
                        y: cell.y,
                        width: env.width(),
                        height: env.height(),
                    });
                }
                if !env.spawnable(*cell) {
                    return Err(SimError::InvalidConfiguration(format!(
                        "agent cannot start on hazard or exit cell ({}, {})",
                        cell.x, cell.y
                    )));
                }
            }
        }

        Self::assemble(config, env, agents)
    }

    fn assemble(config: SimConfig, env: Environment, agents: Vec<Agent>) -> Result<Self> {
        let overlaps = env.hazard_exit_overlaps();
        if !overlaps.is_empty() {
            warn!(
                "{} cell(s) are both hazard and exit; agents can still evacuate through them: {:?}",
                overlaps.len(),
                overlaps
            );
        }

        let mut field = PheromoneGrid::new(env.width(), env.height());
        env.seed_shelter_pheromones(&mut field, config.shelter_seed_amount)?;

        info!(
            "Simulation ready: {}x{} grid, {} agents, {} exits, {} hospitals, {} hazards",
            env.width(),
            env.height(),
            agents.len(),
            env.exits().len(),
            env.hospitals().count(),
            env.hazards().count()
        );

        Ok(Self {
            weights: MoveWeights::from(&config),
            update: FieldUpdate::from(&config),
            config,
            env,
            field,
            agents,
            steps_taken: 0,
            history: Vec::new(),
        })
    }

    /// Extra deposit before the run starts, e.g. a hand-placed guidance trail.
    pub fn deposit(&mut self, cell: Cell, amount: f32) -> Result<()> {
        self.field.deposit(cell, amount)
    }

    /// Phase A: every agent moves once, in list order, depositing as it goes.
    pub fn move_agents(&mut self) -> Result<usize> {
        let mut evacuated_now = 0;
        for agent in self.agents.iter_mut() {
            let outcome = agent.step(&self.env, &mut self.field, &self.weights, self.config.deposit_amount)?;
            if outcome == MoveOutcome::Evacuated {
                evacuated_now += 1;
            }
        }
        Ok(evacuated_now)
    }

    /// Phase B: one diffusion and decay pass over the whole field.
    pub fn relax_field(&mut self) {
        self.field.relax(&self.env, &self.update);
    }

    /// One discrete step: move all agents, then relax the field.
    pub fn step(&mut self) -> Result<()> {
        let evacuated_now = self.move_agents()?;
        self.relax_field();

        let evacuated = self.evacuated_count();
        self.history.push(evacuated);
        if evacuated_now > 0 {
            debug!("step {}: {} agent(s) reached an exit", self.steps_taken, evacuated_now);
        }
        if self.config.report_interval > 0 && self.steps_taken % self.config.report_interval == 0 {
            info!("Step {}: {} evacuated", self.steps_taken, evacuated);
        }
        self.steps_taken += 1;
        Ok(())
    }

    /// Runs `steps` steps. Full evacuation does not stop the run early.
    pub fn run(&mut self, steps: usize) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.steps_taken >= self.config.steps
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn field(&self) -> &PheromoneGrid {
        &self.field
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Evacuated count after each completed step.
    pub fn history(&self) -> &[usize] {
        &self.history
    }

    pub fn evacuated_count(&self) -> usize {
        self.agents.iter().filter(|agent| agent.is_evacuated()).count()
    }

    pub fn active_count(&self) -> usize {
        self.agents.len() - self.evacuated_count()
    }
}

fn check_dimensions(config: &SimConfig, env: &Environment) -> Result<()> {
    config.validate()?;
    if config.width != env.width() || config.height != env.height() {
        return Err(SimError::InvalidConfiguration(format!(
            "config grid {}x{} does not match environment {}x{}",
            config.width,
            config.height,
            env.width(),
            env.height()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config(width: usize, height: usize) -> SimConfig {
        SimConfig {
            width,
            height,
            agent_count: 0,
            ..Default::default()
        }
    }

    #[test]
    fn seeded_placement_is_reproducible() {
        let mut env = Environment::new(10, 10).unwrap();
        env.add_exit(Cell::new(9, 9), 1.0).unwrap();
        env.add_hazard(Cell::new(5, 5), 1.0).unwrap();
        let config = SimConfig { agent_count: 25, ..small_config(10, 10) };

        let a = Simulation::new(config.clone(), env.clone(), &mut StdRng::seed_from_u64(42)).unwrap();
        let b = Simulation::new(config, env, &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(a.agents(), b.agents());
        for agent in a.agents() {
            assert!(a.environment().spawnable(agent.cell()));
            assert!(!agent.is_evacuated());
        }
    }

    #[test]
    fn placement_fails_without_spawnable_cells() {
        let mut env = Environment::new(2, 1).unwrap();
        env.add_exit(Cell::new(0, 0), 0.0).unwrap();
        env.add_hazard(Cell::new(1, 0), 0.0).unwrap();
        let config = SimConfig { agent_count: 1, ..small_config(2, 1) };

        let err = Simulation::new(config, env, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfiguration(_)));
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let env = Environment::new(5, 5).unwrap();
        let err = Simulation::with_agents(small_config(6, 5), env, Vec::new()).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfiguration(_)));
    }

    #[test]
    fn explicit_agents_must_start_on_spawnable_cells() {
        let mut env = Environment::new(5, 5).unwrap();
        env.add_exit(Cell::new(4, 2), 0.0).unwrap();
        let on_exit = vec![Agent::new(Cell::new(4, 2), Heading::East)];
        assert!(Simulation::with_agents(small_config(5, 5), env.clone(), on_exit).is_err());

        let outside = vec![Agent::new(Cell::new(7, 2), Heading::East)];
        assert!(matches!(
            Simulation::with_agents(small_config(5, 5), env, outside),
            Err(SimError::InvalidCoordinate { x: 7, .. })
        ));
    }

    #[test]
    fn exits_are_seeded_before_the_first_step() {
        let mut env = Environment::new(5, 5).unwrap();
        env.add_exit(Cell::new(4, 2), 0.0).unwrap();
        let sim = Simulation::with_agents(small_config(5, 5), env, Vec::new()).unwrap();
        assert_eq!(sim.field().get(Cell::new(4, 2)), 50.0);
        assert_eq!(sim.field().total(), 50.0);
    }

    #[test]
    fn later_agents_see_earlier_deposits_in_the_same_step() {
        // Both agents start with nothing around them. The first walks North onto (2,1),
        // so the second, standing at (1,1), is drawn East onto that fresh deposit.
        let env = Environment::new(5, 5).unwrap();
        let agents = vec![
            Agent::new(Cell::new(2, 2), Heading::South),
            Agent::new(Cell::new(1, 1), Heading::South),
        ];
        let mut sim = Simulation::with_agents(small_config(5, 5), env, agents).unwrap();

        sim.move_agents().unwrap();

        assert_eq!(sim.agents()[0].cell(), Cell::new(2, 1));
        assert_eq!(sim.agents()[1], Agent::new(Cell::new(2, 1), Heading::East));
        assert_eq!(sim.field().get(Cell::new(2, 1)), 2.0);
    }

    #[test]
    fn run_records_history_without_stopping_early() {
        let mut env = Environment::new(5, 5).unwrap();
        env.add_exit(Cell::new(4, 2), 0.0).unwrap();
        let agents = vec![Agent::new(Cell::new(3, 2), Heading::East)];
        let mut sim = Simulation::with_agents(small_config(5, 5), env, agents).unwrap();

        sim.run(5).unwrap();

        assert_eq!(sim.steps_taken(), 5);
        assert_eq!(sim.history(), &[1, 1, 1, 1, 1]);
        assert_eq!(sim.evacuated_count(), 1);
        assert_eq!(sim.active_count(), 0);
    }
}
