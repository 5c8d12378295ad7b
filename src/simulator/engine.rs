use ordered_float::OrderedFloat;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, trace};

use crate::error::{PnpscResult, SimError};
use crate::net::{NetModel, PlayerId, TransitionIdx};
use crate::simulator::config::SimConfig;
use crate::simulator::state::SimState;

/// Samples `Exp(rate)` (mean `1/rate`) via inverse-CDF sampling. Never called
/// with `rate <= 0`; the zero-rate case is handled by the `large_time`
/// sentinel in [`Simulator::step`] (`spec.md` §4.B).
fn sample_exponential(rng: &mut impl Rng, rate: f64) -> f64 {
    debug_assert!(rate > 0.0);
    let u: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    -u.ln() / rate
}

/// The discrete-event PNPSC simulator (`spec.md` §4.B): a single step
/// computes enabledness, composes control-rate modifiers, samples firing
/// times, fires the first-enabled transition, and updates marking/costs.
#[derive(Debug, Clone)]
pub struct Simulator<R = SmallRng> {
    net: NetModel,
    config: SimConfig,
    pub(crate) state: SimState,
    rng: R,
}

impl Simulator<SmallRng> {
    /// Builds a simulator seeded from entropy.
    pub fn new(net: NetModel, config: SimConfig) -> Self {
        Self::with_rng(net, config, SmallRng::from_os_rng())
    }

    /// Builds a simulator with a fixed seed, for reproducible runs
    /// (`spec.md` §7 "Round-trip / idempotence").
    pub fn seeded(net: NetModel, config: SimConfig, seed: u64) -> Self {
        Self::with_rng(net, config, SmallRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Simulator<R> {
    pub fn with_rng(net: NetModel, config: SimConfig, rng: R) -> Self {
        let marking = net.initial_marking().to_vec();
        let rates = net.initial_rates();
        let state = SimState::new(marking, rates, net.num_players());
        Self {
            net,
            config,
            state,
            rng,
        }
    }

    pub fn net(&self) -> &NetModel {
        &self.net
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Restores the initial marking and base rates, zeroes costs, resets the
    /// clock, and clears all pending firing times (`spec.md` §4.B).
    pub fn reset(&mut self) {
        self.state = SimState::new(
            self.net.initial_marking().to_vec(),
            self.net.initial_rates(),
            self.net.num_players(),
        );
    }

    /// Overwrites base rates for the named transitions.
    pub fn update_rates(&mut self, changes: &[(&str, f64)]) -> PnpscResult<()> {
        self.state.updated.clear();
        for (name, rate) in changes {
            let idx = self
                .net
                .transition_index(name)
                .ok_or_else(|| SimError::UnknownTransition(name.to_string()))?;
            self.state.rates[idx] = *rate;
            self.state.updated.push(name.to_string());
        }
        Ok(())
    }

    fn is_enabled(&self, t: TransitionIdx) -> bool {
        let info = self.net.transition(t);
        info.inputs.iter().all(|&p| self.state.marking[p] >= 1.0)
            && info
                .inhibitors
                .iter()
                .all(|&p| self.state.marking[p] == 0.0)
    }

    fn effective_rate(&self, t: TransitionIdx) -> f64 {
        let info = self.net.transition(t);
        let mut rate = self.state.rates[t];
        for m in &info.control_rates {
            if self.state.marking[m.place] >= 1.0 {
                rate += m.delta;
            }
        }
        rate
    }

    /// Advances the net by exactly one firing, or sets `done = true` if no
    /// transition is enabled. A step after `done` is a no-op (`spec.md` §7).
    #[tracing::instrument(skip(self), fields(t = self.state.clock))]
    pub fn step(&mut self) {
        if self.state.done {
            return;
        }

        let n = self.net.num_transitions();
        let enabled: Vec<bool> = (0..n).map(|i| self.is_enabled(i)).collect();
        if !enabled.iter().any(|&e| e) {
            self.state.done = true;
            debug!("no transition enabled, episode done");
            return;
        }

        for (i, &is_enabled) in enabled.iter().enumerate() {
            if !is_enabled {
                self.state.ft[i] = f64::INFINITY;
                continue;
            }

            // A control-rate modifier can drive the base rate below zero;
            // clamp to the same "no effective rate" floor the vectorized
            // engine uses (`VectorizedEngine::effective_rates`), rather than
            // feeding a negative rate to `sample_exponential`.
            let rate = self.effective_rate(i).max(0.0);
            if self.config.reset || self.state.ft[i].is_infinite() {
                self.state.ft[i] = if rate == 0.0 {
                    self.state.clock + self.config.large_time
                } else {
                    self.state.clock + sample_exponential(&mut self.rng, rate)
                };
            }

            if self.config.reset_control_rate {
                self.state.rates[i] = rate;
            }
        }

        let j = (0..n)
            .min_by_key(|&i| OrderedFloat(self.state.ft[i]))
            .expect("n > 0");

        self.state.clock = self.state.ft[j];
        self.state.fired = Some(j);
        self.state.ft[j] = f64::INFINITY;

        let info = self.net.transition(j);
        for &p in &info.inputs {
            self.state.marking[p] -= 1.0;
        }
        for &p in &info.outputs {
            self.state.marking[p] += 1.0;
        }

        trace!(
            fired = info.name.as_str(),
            clock = self.state.clock,
            "fired"
        );

        if self.config.use_fire_cost {
            if let (Some(owner), Some(cost)) = (info.owner, info.fire_cost) {
                self.state.add_cost(owner, cost);
            }
        }
    }

    pub fn player_cost(&self, player: PlayerId) -> f64 {
        self.state.cost(player)
    }

    /// Overwrites marking, per-player costs, and the `done` flag from an
    /// external authority (`spec.md` §4.A), as the remote environment
    /// variant would after polling a server-side net's `/status/`. Out of
    /// scope itself, but the operation is part of the Net model's public
    /// surface regardless.
    pub fn update_from_snapshot(
        &mut self,
        marking: &[(&str, f64)],
        costs: &[(&str, f64)],
        done: bool,
    ) -> PnpscResult<()> {
        for (name, value) in marking {
            let idx = self
                .net
                .place_index(name)
                .ok_or_else(|| SimError::UnknownPlace(name.to_string()))?;
            self.state.marking[idx] = *value;
        }
        for (name, value) in costs {
            let pid = self
                .net
                .player_id(name)
                .ok_or_else(|| SimError::UnknownPlayer(name.to_string()))?;
            self.state.costs[pid.0] = *value;
        }
        self.state.done = done;
        Ok(())
    }
}
