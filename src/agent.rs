//! Reference agents sufficient to exercise the `Environment` contract
//! end-to-end (`SPEC_FULL.md` §4.F). The DQN and CAPEC strategy-table agents
//! from `original_source/src/pnpsc_env/agents/` are deliberately not
//! reimplemented; only the data shape they'd need (`StrategyTable`) is.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::gym::Observation;

/// A player's controlled-rate decision for one step: one desired rate per
/// transition in `Observation::controlled_rates` order.
pub type Action = Vec<f64>;

pub trait Agent {
    /// Decide on new controlled rates given the current observation.
    fn act(&mut self, obs: &Observation) -> Action;

    /// Reset internal state at the end of an episode. Default is a no-op.
    fn reset(&mut self) {}
}

impl Agent for Box<dyn Agent> {
    fn act(&mut self, obs: &Observation) -> Action {
        (**self).act(obs)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Never changes rates (`original_source/.../agents/static_agent.py`).
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticAgent;

impl Agent for StaticAgent {
    fn act(&mut self, obs: &Observation) -> Action {
        obs.controlled_rates().to_vec()
    }
}

/// Draws each controlled rate uniformly from `[0, max_rate]`
/// (`original_source/.../agents/random_agent.py`).
#[derive(Debug)]
pub struct RandomAgent {
    max_rate: f64,
    rng: SmallRng,
}

impl RandomAgent {
    pub fn new(max_rate: f64, rng: SmallRng) -> Self {
        Self { max_rate, rng }
    }

    pub fn seeded(max_rate: f64, seed: u64) -> Self {
        Self::new(max_rate, SmallRng::seed_from_u64(seed))
    }
}

impl Agent for RandomAgent {
    fn act(&mut self, obs: &Observation) -> Action {
        obs.controlled_rates()
            .iter()
            .map(|_| self.rng.random::<f64>() * self.max_rate)
            .collect()
    }
}

/// A predicate over an observation, used to build data-driven strategy
/// tables (`spec.md` §9: "implement them as data ... rather than code").
pub type Predicate = fn(&Observation) -> bool;

/// One `(predicate, rate_overrides)` rule: when `predicate` matches, apply
/// `rate_overrides` (same order as `Observation::controlled_rates`) in full.
pub struct StrategyRule {
    pub predicate: Predicate,
    pub rate_overrides: Vec<f64>,
}

/// An ordered list of rules evaluated first-match-wins, falling back to
/// holding current rates if none match. This is the generalized shape the
/// CAPEC agents use in the original source, without any of their
/// attack-pattern-specific predicates.
#[derive(Default)]
pub struct StrategyTable {
    rules: Vec<StrategyRule>,
}

impl StrategyTable {
    pub fn new(rules: Vec<StrategyRule>) -> Self {
        Self { rules }
    }
}

impl Agent for StrategyTable {
    fn act(&mut self, obs: &Observation) -> Action {
        for rule in &self.rules {
            if (rule.predicate)(obs) {
                return rule.rate_overrides.clone();
            }
        }
        obs.controlled_rates().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_agent_holds_current_rates() {
        let obs = Observation::new(vec![1.0, 2.0], vec![5.0, 6.0]);
        let mut agent = StaticAgent;
        assert_eq!(agent.act(&obs), vec![5.0, 6.0]);
    }

    #[test]
    fn random_agent_stays_within_bounds() {
        let obs = Observation::new(vec![], vec![0.0, 0.0, 0.0]);
        let mut agent = RandomAgent::seeded(10.0, 1);
        let action = agent.act(&obs);
        assert_eq!(action.len(), 3);
        assert!(action.iter().all(|&r| (0.0..=10.0).contains(&r)));
    }

    #[test]
    fn strategy_table_falls_back_when_no_rule_matches() {
        let obs = Observation::new(vec![0.0], vec![3.0]);
        let mut table = StrategyTable::new(vec![StrategyRule {
            predicate: |obs| obs.visible_places()[0] > 0.0,
            rate_overrides: vec![9.0],
        }]);
        assert_eq!(table.act(&obs), vec![3.0]);
    }

    #[test]
    fn strategy_table_applies_first_matching_rule() {
        let obs = Observation::new(vec![1.0], vec![3.0]);
        let mut table = StrategyTable::new(vec![
            StrategyRule {
                predicate: |obs| obs.visible_places()[0] > 0.0,
                rate_overrides: vec![9.0],
            },
            StrategyRule {
                predicate: |_| true,
                rate_overrides: vec![1.0],
            },
        ]);
        assert_eq!(table.act(&obs), vec![9.0]);
    }
}
