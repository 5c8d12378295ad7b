//! Black-box end-to-end coverage for the scalar `Environment`, exercised
//! only through the public API, using the same net fixture as `spec.md` §8
//! (places `aP1..aP5`, transitions `aT1..aT4`, single player `Attacker`).

use pnpsc::SimConfig;
use pnpsc::gym::{EnvConfig, EnvStatus, Environment, L1Cost, StepMode};
use pnpsc::net::{NetDefinition, NetModel, PlaceDef, PlayerDef, TransitionDef};

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

fn build_env(seed: u64) -> Environment {
    let net = NetModel::from_definition(&example_net()).unwrap();
    Environment::seeded(
        net,
        "Attacker",
        SimConfig::default(),
        EnvConfig::default(),
        seed,
    )
    .unwrap()
}

#[test]
fn static_rollout_terminates_within_a_hundred_steps() {
    // spec.md §8 scenario 1.
    let mut env = build_env(42);
    env.reset();
    let mut steps = 0;
    loop {
        let (_, _, done) = env.step(None, StepMode::Full).unwrap();
        steps += 1;
        assert!(steps <= 100, "episode failed to terminate within 100 steps");
        if done {
            break;
        }
    }
    assert_eq!(env.status(), EnvStatus::Done);
}

#[test]
fn action_cost_accounting_matches_the_l1_contract() {
    // spec.md §8 scenario 5: applying [5] to Attacker charges a reward of -5
    // under the raw ||.||_1 cost variant (scale = 1).
    let mut env = build_env(1).with_cost_change(L1Cost::with_scale(1.0));
    env.reset();
    let (obs, reward, _) = env.step(Some(&[5.0]), StepMode::HoldSimulator).unwrap();
    assert_eq!(obs.controlled_rates(), &[5.0]);
    assert_eq!(reward.0, -5.0);
}

#[test]
fn run_until_complete_reports_a_single_terminal_reward() {
    let mut env = build_env(7);
    env.reset();
    let reward = env.run_until_complete().unwrap();
    assert!(reward.0.is_finite());
    assert_eq!(env.status(), EnvStatus::Done);
}
