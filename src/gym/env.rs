use rand::rngs::SmallRng;
use tracing::debug;

use crate::agent::Agent;
use crate::error::{EnvError, PnpscResult};
use crate::gym::cost::{CostChange, L1Cost};
use crate::gym::observation::Observation;
use crate::net::{NetModel, PlayerId};
use crate::simulator::{SimConfig, Simulator};

/// Bounds used to build the observation/action space (`spec.md` §6):
/// visible markings lie in `[0, max_tokens]`, controlled rates in
/// `[0, max_rate]`.
#[derive(Debug, Clone, Copy)]
pub struct EnvConfig {
    pub max_tokens: f64,
    pub max_rate: f64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_tokens: 10.0,
            max_rate: 10.0,
        }
    }
}

/// Lifecycle status of the scalar environment. A PNPSC run is a single
/// episode to completion, simpler than a multi-episode market backtest:
/// `Ready` → `reset()` → `Running` → (`step()` …) → `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum EnvStatus {
    Ready,
    Running,
    Done,
}

impl EnvStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Whether `step` advances the simulator after applying the primary
/// player's action, or only records the rate change (`spec.md` §4.C
/// "A `step_sim=false` mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Full,
    HoldSimulator,
}

/// A reward: continuous cost deltas plus the `+100` goal bonus
/// (`spec.md` §4.C), hence `f64` rather than the integer-cents `Reward`
/// newtype a trading environment would use.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Reward(pub f64);

crate::impl_from_primitive!(Reward, f64);
crate::impl_add_sub_mul_div_primitive!(Reward, f64);

/// Gym-shaped adapter over a [`Simulator`] (`spec.md` §4.C). Other players'
/// turns are driven by registered [`Agent`]s, applied in registration order
/// before the simulator advances.
pub struct Environment<R = SmallRng> {
    sim: Simulator<R>,
    primary: PlayerId,
    other_players: Vec<(PlayerId, Box<dyn Agent>)>,
    cost_change: Box<dyn CostChange>,
    config: EnvConfig,
    last_cost: f64,
    status: EnvStatus,
}

impl Environment<SmallRng> {
    pub fn seeded(
        net: NetModel,
        primary: &str,
        sim_config: SimConfig,
        config: EnvConfig,
        seed: u64,
    ) -> PnpscResult<Self> {
        let primary = net
            .player_id(primary)
            .ok_or_else(|| EnvError::UnknownPlayer(primary.to_string()))?;
        let sim = Simulator::seeded(net, sim_config, seed);
        Ok(Self::from_simulator(sim, primary, config))
    }
}

impl<R: rand::Rng> Environment<R> {
    pub fn from_simulator(sim: Simulator<R>, primary: PlayerId, config: EnvConfig) -> Self {
        Self {
            sim,
            primary,
            other_players: Vec::new(),
            cost_change: Box::new(L1Cost::default()),
            config,
            last_cost: 0.0,
            status: EnvStatus::Ready,
        }
    }

    pub fn with_cost_change(mut self, cost_change: impl CostChange + 'static) -> Self {
        self.cost_change = Box::new(cost_change);
        self
    }

    pub fn add_other_player(
        &mut self,
        player: &str,
        agent: impl Agent + 'static,
    ) -> PnpscResult<()> {
        let id = self
            .sim
            .net()
            .player_id(player)
            .ok_or_else(|| EnvError::UnknownPlayer(player.to_string()))?;
        self.other_players.push((id, Box::new(agent)));
        Ok(())
    }

    pub fn status(&self) -> EnvStatus {
        self.status
    }

    pub fn simulator(&self) -> &Simulator<R> {
        &self.sim
    }

    /// The observation for an arbitrary player, built from their precomputed
    /// visible-place and controlled-rate index arrays.
    pub fn observation_for(&self, player: PlayerId) -> Observation {
        let net = self.sim.net();
        let state = self.sim.state();
        let visible = net
            .visible_places(player)
            .iter()
            .map(|&p| state.marking_at(p))
            .collect();
        let rates = net
            .controlled_rates(player)
            .iter()
            .map(|&t| state.rates()[t])
            .collect();
        Observation::new(visible, rates)
    }

    fn is_terminal_for(&self, player: PlayerId) -> bool {
        let net = self.sim.net();
        let state = self.sim.state();
        let goal_hit = net
            .goal_places(player)
            .iter()
            .any(|&p| state.marking_at(p) > 0.0);
        let end_hit = net
            .end_places(player)
            .iter()
            .any(|&p| state.marking_at(p) > 0.0);
        self.sim.state().is_done() || goal_hit || end_hit
    }

    fn goal_bonus(&self, player: PlayerId) -> f64 {
        let net = self.sim.net();
        let state = self.sim.state();
        if net
            .goal_places(player)
            .iter()
            .any(|&p| state.marking_at(p) > 0.0)
        {
            100.0
        } else {
            0.0
        }
    }

    /// Restores the initial marking/base rates/zero costs and returns the
    /// primary player's first observation.
    pub fn reset(&mut self) -> Observation {
        self.sim.reset();
        self.last_cost = 0.0;
        self.status = EnvStatus::Running;
        self.observation_for(self.primary)
    }

    fn clip_action(&self, action: &[f64]) -> Vec<f64> {
        action
            .iter()
            .map(|&r| r.clamp(0.0, self.config.max_rate))
            .collect()
    }

    fn apply_action(&mut self, player: PlayerId, action: &[f64]) -> PnpscResult<f64> {
        let net = self.sim.net();
        let controlled: Vec<usize> = net.controlled_rates(player).to_vec();
        if action.len() != controlled.len() {
            return Err(EnvError::ActionLengthMismatch {
                player: net.player_name(player).to_string(),
                expected: controlled.len(),
                given: action.len(),
            }
            .into());
        }
        let clipped = self.clip_action(action);
        let old_rates: Vec<f64> = controlled
            .iter()
            .map(|&t| self.sim.state().rates()[t])
            .collect();
        let cost = self.cost_change.cost(&clipped, &old_rates);

        let names: Vec<String> = controlled
            .iter()
            .map(|&t| net.transition_name(t).to_string())
            .collect();
        let changes: Vec<(&str, f64)> = names
            .iter()
            .map(String::as_str)
            .zip(clipped.iter().copied())
            .collect();
        self.sim.update_rates(&changes)?;
        self.sim.state.add_cost(player, cost);
        Ok(cost)
    }

    /// Runs the standard gym step sequencing (`spec.md` §4.C):
    /// 1. clip + apply the primary player's action and charge its cost;
    /// 2. let each other player act and apply their action;
    /// 3. advance the simulator by one firing (unless `mode` holds it);
    /// 4. build the primary player's observation/reward/done.
    pub fn step(
        &mut self,
        action: Option<&[f64]>,
        mode: StepMode,
    ) -> PnpscResult<(Observation, Reward, bool)> {
        if self.status != EnvStatus::Running {
            // spec.md §7 (iii): a step after done is a no-op.
            return Ok((self.observation_for(self.primary), Reward(0.0), true));
        }

        if let Some(action) = action {
            self.apply_action(self.primary, action)?;
        }

        if mode == StepMode::Full {
            for i in 0..self.other_players.len() {
                let (player, _) = self.other_players[i];
                let obs = self.observation_for(player);
                let action = self.other_players[i].1.act(&obs);
                self.apply_action(player, &action)?;
            }
            self.sim.step();
        }

        let cost_now = self.sim.player_cost(self.primary);
        let mut reward = -(cost_now - self.last_cost);
        self.last_cost = cost_now;

        let done = self.is_terminal_for(self.primary);
        if done {
            reward += self.goal_bonus(self.primary);
            self.status = EnvStatus::Done;
            debug!(status = %self.status, reward, "episode finished");
        }

        Ok((self.observation_for(self.primary), Reward(reward), done))
    }

    /// Steps with no action until `done`, summing reward (`spec.md` §4.C
    /// "Run-to-completion").
    pub fn run_until_complete(&mut self) -> PnpscResult<Reward> {
        let mut total = Reward(0.0);
        loop {
            let (_, reward, done) = self.step(None, StepMode::Full)?;
            total = total + reward;
            if done {
                break;
            }
        }
        Ok(total)
    }
}
