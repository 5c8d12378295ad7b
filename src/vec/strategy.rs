use std::collections::HashMap;

use crate::agent::Agent;
use crate::error::PnpscResult;
use crate::gym::{EnvConfig, Environment, StepMode};
use crate::net::NetModel;
use crate::simulator::SimConfig;

/// Runs `num_runs` scalar episodes of `agent` playing `player` and averages
/// the final rate of every transition it ever changed
/// (`original_source/.../pnpsc_vec_env.py::_eval_strategy`). Baking a fixed
/// opponent's typical end-state rates into the primary player's rate vector
/// lets a vectorized rollout skip simulating the opponent's decision process
/// on every row.
pub fn estimate_opponent_strategy(
    net: &NetModel,
    player: &str,
    agent: &mut dyn Agent,
    sim_config: SimConfig,
    env_config: EnvConfig,
    num_runs: usize,
    seed: u64,
) -> PnpscResult<HashMap<String, f64>> {
    let mut end_rates: HashMap<String, Vec<f64>> = HashMap::new();

    for run in 0..num_runs {
        let mut env = Environment::seeded(
            net.clone(),
            player,
            sim_config,
            env_config,
            seed.wrapping_add(run as u64),
        )?;
        let start_rates = env.simulator().state().rates().to_vec();

        agent.reset();
        let mut obs = env.reset();
        loop {
            let action = agent.act(&obs);
            let (next_obs, _, done) = env.step(Some(&action), StepMode::Full)?;
            obs = next_obs;
            if done {
                break;
            }
        }

        let final_rates = env.simulator().state().rates();
        for (i, name) in env.simulator().net().transition_names().enumerate() {
            if (final_rates[i] - start_rates[i]).abs() > f64::EPSILON {
                end_rates
                    .entry(name.to_string())
                    .or_default()
                    .push(final_rates[i]);
            }
        }
    }

    Ok(end_rates
        .into_iter()
        .map(|(name, values)| {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            (name, mean)
        })
        .collect())
}
