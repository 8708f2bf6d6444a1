use bevy::app::AppExit;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use evacsim::systems::RunState;
use evacsim::{
    choose_heading, Agent, Cell, Environment, EvacuationPlugin, Heading, MoveOutcome, MoveWeights, PheromoneGrid,
    Scenario, SimConfig, Simulation,
};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

fn five_by_five_with_exit() -> (SimConfig, Environment) {
    let config = SimConfig {
        width: 5,
        height: 5,
        agent_count: 0,
        ..Default::default()
    };
    let mut env = Environment::new(5, 5).unwrap();
    env.add_exit(Cell::new(4, 2), 0.0).unwrap();
    (config, env)
}

fn crowded_run(seed: u64) -> Simulation {
    let mut env = Environment::new(20, 15).unwrap();
    env.add_exit(Cell::new(19, 7), 5.0).unwrap();
    env.add_exit(Cell::new(0, 0), 3.0).unwrap();
    for y in 3..12 {
        env.add_hazard(Cell::new(10, y), 1.0).unwrap();
    }
    env.add_hospital(Cell::new(5, 5), 40.0).unwrap();
    env.set_density(Cell::new(12, 7), 3.0).unwrap();
    let config = SimConfig {
        width: 20,
        height: 15,
        agent_count: 40,
        ..Default::default()
    };
    Simulation::new(config, env, &mut StdRng::seed_from_u64(seed)).unwrap()
}

#[test]
fn active_agents_stay_in_bounds_on_passable_cells() {
    let mut sim = crowded_run(7);
    for _ in 0..150 {
        sim.step().unwrap();
        for agent in sim.agents() {
            if let Agent::Active { cell, .. } = agent {
                assert!(cell.x >= 0 && cell.x < 20 && cell.y >= 0 && cell.y < 15);
                assert!(sim.environment().passable(*cell));
                assert!(!sim.environment().is_exit(*cell));
            }
        }
    }
}

#[test]
fn evacuation_is_monotonic() {
    let mut sim = crowded_run(11);
    let mut seen = vec![false; sim.agents().len()];
    for _ in 0..150 {
        sim.step().unwrap();
        for (i, agent) in sim.agents().iter().enumerate() {
            if seen[i] {
                assert!(agent.is_evacuated(), "agent {i} came back from an exit");
            }
            seen[i] = agent.is_evacuated();
        }
    }
    assert!(sim.history().windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*sim.history().last().unwrap(), sim.evacuated_count());
}

#[test]
fn same_seed_gives_the_same_run() {
    let mut a = crowded_run(99);
    let mut b = crowded_run(99);
    a.run(60).unwrap();
    b.run(60).unwrap();
    assert_eq!(a.agents(), b.agents());
    assert_eq!(a.field().values(), b.field().values());
}

#[test]
fn relaxation_keeps_every_border_cell() {
    let mut sim = crowded_run(3);
    sim.run(10).unwrap();
    let before = sim.field().values().to_vec();

    sim.relax_field();

    let after = sim.field().values();
    for y in 0..15usize {
        for x in 0..20usize {
            if x == 0 || y == 0 || x == 19 || y == 14 {
                assert_eq!(after[y * 20 + x], before[y * 20 + x], "border cell ({x}, {y})");
            }
        }
    }
}

#[test]
fn uniform_field_without_diffusion_only_decays() {
    let mut env = Environment::new(6, 5).unwrap();
    env.set_density(Cell::new(2, 2), 2.0).unwrap();
    env.set_density(Cell::new(4, 3), 10.0).unwrap();
    let mut field = PheromoneGrid::new(6, 5);
    field.fill(3.0);
    let decay = 0.02;

    field.diffuse_and_decay(&env, decay, 0.0);

    for y in 1..4 {
        for x in 1..5 {
            let cell = Cell::new(x, y);
            let density_factor = 1.0 + env.density(cell) * 0.05;
            assert!(approx(field.get(cell), 3.0 * (1.0 - decay * density_factor)), "cell ({x}, {y})");
        }
    }
}

#[test]
fn equal_scores_pick_the_earliest_direction() {
    let env = Environment::new(5, 5).unwrap();
    let mut field = PheromoneGrid::new(5, 5);
    let from = Cell::new(2, 2);
    let weights = MoveWeights::default();

    for heading in Heading::ALL {
        field.deposit(from.step(heading), 2.0).unwrap();
    }
    assert_eq!(choose_heading(&env, &field, from, Heading::West, &weights), Heading::North);

    field.deposit(Cell::new(2, 1), -2.0).unwrap();
    assert_eq!(choose_heading(&env, &field, from, Heading::West, &weights), Heading::East);

    field.deposit(Cell::new(3, 2), -2.0).unwrap();
    assert_eq!(choose_heading(&env, &field, from, Heading::North, &weights), Heading::South);
}

#[test]
fn evacuated_agents_do_nothing() {
    let (config, env) = five_by_five_with_exit();
    let agents = vec![Agent::Evacuated { last_cell: Cell::new(3, 2) }];
    let mut sim = Simulation::with_agents(config, env, agents).unwrap();
    let before = sim.field().values().to_vec();

    sim.move_agents().unwrap();

    assert_eq!(sim.field().values(), &before[..]);
    assert_eq!(sim.agents()[0], Agent::Evacuated { last_cell: Cell::new(3, 2) });

    let mut field = sim.field().clone();
    let mut agent = sim.agents()[0];
    let outcome = agent
        .step(sim.environment(), &mut field, &MoveWeights::default(), 1.0)
        .unwrap();
    assert_eq!(outcome, MoveOutcome::Inert);
    assert_eq!(field.values(), &before[..]);
}

#[test]
fn flat_neighbourhood_breaks_ties_north_first() {
    // The exit beacon at (4,2) has not diffused yet when the first move happens, so
    // every neighbour of (0,2) scores zero and the scan order decides.
    let (config, env) = five_by_five_with_exit();
    let agents = vec![Agent::new(Cell::new(0, 2), Heading::East)];
    let mut sim = Simulation::with_agents(config, env, agents).unwrap();
    assert_eq!(sim.field().get(Cell::new(4, 2)), 50.0);

    sim.step().unwrap();

    assert_eq!(sim.agents()[0], Agent::new(Cell::new(0, 1), Heading::North));
    assert_eq!(sim.field().get(Cell::new(0, 1)), 1.0);
}

#[test]
fn agent_follows_a_trail_to_the_exit() {
    let (config, env) = five_by_five_with_exit();
    let agents = vec![Agent::new(Cell::new(0, 2), Heading::East)];
    let mut sim = Simulation::with_agents(config, env, agents).unwrap();
    sim.deposit(Cell::new(3, 2), 40.0).unwrap();
    sim.deposit(Cell::new(2, 2), 30.0).unwrap();
    sim.deposit(Cell::new(1, 2), 20.0).unwrap();

    sim.move_agents().unwrap();
    assert_eq!(sim.agents()[0], Agent::new(Cell::new(1, 2), Heading::East));
    assert!(approx(sim.field().get(Cell::new(1, 2)), 21.0));
    sim.relax_field();

    sim.step().unwrap();
    assert_eq!(sim.agents()[0].cell(), Cell::new(2, 2));
    sim.step().unwrap();
    assert_eq!(sim.agents()[0].cell(), Cell::new(3, 2));
    assert!(!sim.agents()[0].is_evacuated());

    sim.step().unwrap();
    assert_eq!(sim.agents()[0], Agent::Evacuated { last_cell: Cell::new(3, 2) });

    // inert from here on
    let field = sim.field().values().to_vec();
    sim.move_agents().unwrap();
    assert_eq!(sim.field().values(), &field[..]);
}

#[test]
fn default_district_runs_end_to_end() {
    let scenario = Scenario::district();
    let mut sim = scenario.build_simulation(&mut StdRng::seed_from_u64(2024)).unwrap();
    sim.run(120).unwrap();

    assert_eq!(sim.history().len(), 120);
    assert_eq!(sim.agents().len(), 30);
    assert!(sim.field().values().iter().all(|v| v.is_finite() && *v >= 0.0));
}

#[test]
fn plugin_runs_the_step_budget_and_exits() {
    let (mut config, env) = five_by_five_with_exit();
    config.steps = 3;
    config.output_dir = std::env::temp_dir()
        .join(format!("evacsim-plugin-{}", std::process::id()))
        .to_string_lossy()
        .into_owned();
    let output_dir = config.output_dir.clone();
    let agents = vec![Agent::new(Cell::new(0, 0), Heading::South)];
    let sim = Simulation::with_agents(config, env, agents).unwrap();

    let mut app = App::new();
    app.add_event::<AppExit>()
        .insert_resource(sim)
        .add_plugins(EvacuationPlugin);

    for _ in 0..5 {
        app.update();
    }

    let sim = app.world().resource::<Simulation>();
    assert_eq!(sim.steps_taken(), 3);
    let run = app.world().resource::<RunState>();
    assert!(run.finished);
    assert!(!run.failed);
    assert_eq!(run.report.as_ref().map(|r| r.steps), Some(3));
    assert!(std::path::Path::new(&output_dir).join("report.json").exists());

    std::fs::remove_dir_all(&output_dir).unwrap();
}
