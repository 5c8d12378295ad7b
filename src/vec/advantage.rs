use std::collections::HashMap;

use ndarray::Array1;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::error::{EnvError, PnpscResult};
use crate::gym::{CostChange, EnvConfig, EnvStatus, L1Cost, Observation, Reward, StepMode};
use crate::net::{NetModel, PlayerId};
use crate::vec::engine::VectorizedEngine;

/// Number of rollout rows used to estimate a mean-reward baseline
/// (`spec.md` §4.D). 10 000 matches the source's `_eval_strategy` default;
/// a full per-step baseline is cheaper at a smaller sample.
const DEFAULT_ROLLOUT_ROWS: usize = 256;

/// The advantage-form single-step environment of `spec.md` §4.D: reward is
/// the change in mean terminal reward (estimated by [`VectorizedEngine`])
/// caused by the step, minus the primary player's rate-change cost. Shares
/// [`Observation`]/[`Reward`]/[`EnvStatus`] with [`crate::gym::Environment`]
/// so callers can swap one for the other.
pub struct AdvantageEnvironment {
    net: NetModel,
    engine: VectorizedEngine,
    primary: PlayerId,
    marking: Array1<f64>,
    rates: Array1<f64>,
    config: EnvConfig,
    cost_change: Box<dyn CostChange>,
    rollout_rows: usize,
    seed: u64,
    calls: u64,
    last_mean_reward: Option<f64>,
    status: EnvStatus,
    /// Precomputed `(transition, rate)` pairs from
    /// [`crate::vec::estimate_opponent_strategy`], baked into `rates`
    /// instead of calling opponent agents inside the hot rollout loop
    /// (`spec.md` §4.D "Opponent strategy approximation").
    opponent_rates: Vec<(usize, f64)>,
}

impl AdvantageEnvironment {
    pub fn new(net: NetModel, primary: &str, config: EnvConfig, seed: u64) -> PnpscResult<Self> {
        let primary_id = net
            .player_id(primary)
            .ok_or_else(|| EnvError::UnknownPlayer(primary.to_string()))?;
        let engine = VectorizedEngine::from_net(&net);
        let marking = Array1::from_vec(net.initial_marking().to_vec());
        let rates = Array1::from_vec(net.initial_rates());
        Ok(Self {
            net,
            engine,
            primary: primary_id,
            marking,
            rates,
            config,
            cost_change: Box::new(L1Cost::default()),
            rollout_rows: DEFAULT_ROLLOUT_ROWS,
            seed,
            calls: 0,
            last_mean_reward: None,
            status: EnvStatus::Ready,
            opponent_rates: Vec::new(),
        })
    }

    pub fn with_cost_change(mut self, cost_change: impl CostChange + 'static) -> Self {
        self.cost_change = Box::new(cost_change);
        self
    }

    pub fn with_rollout_rows(mut self, rows: usize) -> Self {
        self.rollout_rows = rows;
        self
    }

    /// Bakes a precomputed opponent strategy (the output of
    /// [`crate::vec::estimate_opponent_strategy`]) into the rollout's rate
    /// vector. Unknown transition names are ignored. `spec.md` §4.D:
    /// "During rollouts these rates replace the opponent's entries in `r`."
    pub fn with_opponent_strategy(mut self, strategy: &HashMap<String, f64>) -> Self {
        self.opponent_rates = strategy
            .iter()
            .filter_map(|(name, &rate)| self.net.transition_index(name).map(|t| (t, rate)))
            .collect();
        self
    }

    pub fn status(&self) -> EnvStatus {
        self.status
    }

    fn rollout_seed(&mut self) -> u64 {
        self.calls += 1;
        self.seed.wrapping_add(self.calls)
    }

    fn mean_reward(&mut self) -> f64 {
        let goal = self.net.goal_places(self.primary).to_vec();
        let end = self.net.end_places(self.primary).to_vec();
        let seed = self.rollout_seed();
        let opponent_rates =
            (!self.opponent_rates.is_empty()).then_some(self.opponent_rates.as_slice());
        self.engine.rollout_mean_reward(
            self.marking.as_slice().expect("contiguous"),
            self.rates.as_slice().expect("contiguous"),
            &goal,
            &end,
            self.rollout_rows,
            seed,
            opponent_rates,
        )
    }

    pub fn observation(&self) -> Observation {
        let visible = self
            .net
            .visible_places(self.primary)
            .iter()
            .map(|&p| self.marking[p])
            .collect();
        let rates = self
            .net
            .controlled_rates(self.primary)
            .iter()
            .map(|&t| self.rates[t])
            .collect();
        Observation::new(visible, rates)
    }

    pub fn reset(&mut self) -> Observation {
        self.marking = Array1::from_vec(self.net.initial_marking().to_vec());
        self.rates = Array1::from_vec(self.net.initial_rates());
        self.last_mean_reward = None;
        self.status = EnvStatus::Running;
        self.observation()
    }

    fn apply_rates(&mut self, player: PlayerId, action: &[f64]) -> PnpscResult<f64> {
        let controlled: Vec<usize> = self.net.controlled_rates(player).to_vec();
        if action.len() != controlled.len() {
            return Err(EnvError::ActionLengthMismatch {
                player: self.net.player_name(player).to_string(),
                expected: controlled.len(),
                given: action.len(),
            }
            .into());
        }
        let clipped: Vec<f64> = action
            .iter()
            .map(|&r| r.clamp(0.0, self.config.max_rate))
            .collect();
        let old: Vec<f64> = controlled.iter().map(|&t| self.rates[t]).collect();
        let cost = self.cost_change.cost(&clipped, &old);
        for (&t, &r) in controlled.iter().zip(&clipped) {
            self.rates[t] = r;
        }
        Ok(cost)
    }

    /// Sequences exactly as `original_source/.../pnpsc_vec_env.py::step`:
    /// apply the primary player's action and charge its cost, optionally
    /// advance the engine by one firing — baking any precomputed opponent
    /// strategy into `rates` rather than calling an agent — then fold in the
    /// change to the mean-reward baseline (or, if this step ended the
    /// episode, subtract the outstanding baseline).
    pub fn step(
        &mut self,
        action: Option<&[f64]>,
        mode: StepMode,
    ) -> PnpscResult<(Observation, Reward, bool)> {
        if self.status != EnvStatus::Running {
            return Ok((self.observation(), Reward(0.0), true));
        }
        if self.last_mean_reward.is_none() {
            self.last_mean_reward = Some(self.mean_reward());
        }

        let mut reward = match action {
            Some(action) => -self.apply_rates(self.primary, action)?,
            None => 0.0,
        };

        let mut done = false;
        if mode == StepMode::Full {
            let mut rng = SmallRng::seed_from_u64(self.rollout_seed());
            let opponent_rates =
                (!self.opponent_rates.is_empty()).then_some(self.opponent_rates.as_slice());
            let outcome = self.engine.step_single(
                &mut self.marking,
                &mut self.rates,
                opponent_rates,
                &mut rng,
            );
            done = outcome.done;

            let goal_hit = self
                .net
                .goal_places(self.primary)
                .iter()
                .any(|&p| self.marking[p] > 0.0);
            let end_hit = self
                .net
                .end_places(self.primary)
                .iter()
                .any(|&p| self.marking[p] > 0.0);
            if goal_hit {
                reward += 100.0;
                done = true;
            }
            if end_hit {
                done = true;
            }
        }

        if done {
            reward -= self.last_mean_reward.unwrap_or(0.0);
            self.status = EnvStatus::Done;
        } else {
            let current = self.mean_reward();
            reward += current - self.last_mean_reward.unwrap_or(0.0);
            self.last_mean_reward = Some(current);
        }

        Ok((self.observation(), Reward(reward), done))
    }
}
