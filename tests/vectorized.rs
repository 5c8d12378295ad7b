//! Black-box coverage for the vectorized rollout engine and the
//! advantage-form environment, plus the scalar/vectorized equivalence
//! property from `spec.md` §8 scenario 6.

use pnpsc::SimConfig;
use pnpsc::gym::{EnvConfig, EnvStatus, Environment, StepMode};
use pnpsc::net::{NetDefinition, NetModel, PlaceDef, PlayerDef, TransitionDef};
use pnpsc::vec::{AdvantageEnvironment, VectorizedEngine};

fn example_net() -> NetDefinition {
    NetDefinition {
        players: vec![PlayerDef {
            name: "Attacker".into(),
        }],
        places: vec![
            PlaceDef {
                name: "aP1".into(),
                marking: 10,
                player_observable: "Attacker".into(),
                goal: None,
                description: None,
            },
            PlaceDef {
                name: "aP2".into(),
                marking: 0,
                player_observable: "".into(),
                goal: None,
                description: None,
            },
            PlaceDef {
                name: "aP3".into(),
                marking: 0,
                player_observable: "".into(),
                goal: None,
                description: None,
            },
            PlaceDef {
                name: "aP4".into(),
                marking: 0,
                player_observable: "".into(),
                goal: Some("Attacker".into()),
                description: None,
            },
            PlaceDef {
                name: "aP5".into(),
                marking: 0,
                player_observable: "".into(),
                goal: None,
                description: None,
            },
        ],
        transitions: vec![
            TransitionDef {
                name: "aT1".into(),
                rate: 10.0,
                input: "aP1".into(),
                output: "aP3".into(),
                inhibitor: "".into(),
                control_rate: "".into(),
                player_control: "Attacker".into(),
                fire_cost: None,
                description: None,
            },
            TransitionDef {
                name: "aT2".into(),
                rate: 5.0,
                input: "aP1".into(),
                output: "aP2,aP3".into(),
                inhibitor: "aP5".into(),
                control_rate: "".into(),
                player_control: "".into(),
                fire_cost: None,
                description: None,
            },
            TransitionDef {
                name: "aT3".into(),
                rate: 10.0,
                input: "aP3".into(),
                output: "aP4".into(),
                inhibitor: "".into(),
                control_rate: "aP3=20".into(),
                player_control: "".into(),
                fire_cost: None,
                description: None,
            },
            TransitionDef {
                name: "aT4".into(),
                rate: 2.0,
                input: "aP3".into(),
                output: "aP5".into(),
                inhibitor: "".into(),
                control_rate: "".into(),
                player_control: "".into(),
                fire_cost: None,
                description: None,
            },
        ],
    }
}

#[test]
fn vectorized_rollout_agrees_with_scalar_run_until_complete() {
    // spec.md §8 scenario 6: the vectorized engine's mean terminal reward
    // over K rows should land within statistical tolerance of the mean of
    // K independent scalar run_until_complete episodes, for a fixed net and
    // base rates.
    let net = NetModel::from_definition(&example_net()).unwrap();
    let engine = VectorizedEngine::from_net(&net);
    let attacker = net.player_id("Attacker").unwrap();
    let goal = net.goal_places(attacker).to_vec();
    let end = net.end_places(attacker).to_vec();

    const ROWS: usize = 2000;
    let vectorized_mean = engine.rollout_mean_reward(
        net.initial_marking(),
        &net.initial_rates(),
        &goal,
        &end,
        ROWS,
        123,
        None,
    );

    let scalar_total: f64 = (0..ROWS)
        .map(|seed| {
            let net = NetModel::from_definition(&example_net()).unwrap();
            let mut env = Environment::seeded(
                net,
                "Attacker",
                SimConfig::default(),
                EnvConfig::default(),
                1_000_000 + seed as u64,
            )
            .unwrap();
            env.reset();
            loop {
                let (_, reward, done) = env.step(None, StepMode::Full).unwrap();
                if done {
                    // Only the terminal goal bonus contributes to this net's
                    // reward since no action cost is ever charged here.
                    break reward.0.max(0.0);
                }
            }
        })
        .sum();
    let scalar_mean = scalar_total / ROWS as f64;

    assert!(
        (vectorized_mean - scalar_mean).abs() < 10.0,
        "vectorized mean {vectorized_mean} vs scalar mean {scalar_mean}"
    );
}

#[test]
fn advantage_environment_eventually_terminates_like_the_scalar_one() {
    let net = NetModel::from_definition(&example_net()).unwrap();
    let mut env = AdvantageEnvironment::new(net, "Attacker", EnvConfig::default(), 99)
        .unwrap()
        .with_rollout_rows(128);
    env.reset();

    let mut steps = 0;
    loop {
        let (_, _, done) = env.step(None, StepMode::Full).unwrap();
        steps += 1;
        assert!(steps <= 200, "episode failed to terminate");
        if done {
            break;
        }
    }
    assert_eq!(env.status(), EnvStatus::Done);
}
