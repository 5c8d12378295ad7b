use ndarray::{Array1, Array2, Axis};
use ordered_float::OrderedFloat;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::net::NetModel;

/// Samples `Exp(rate)` the same way [`crate::simulator::engine`] does; kept
/// private and duplicated rather than shared, since the two engines must be
/// able to diverge independently (`spec.md` §9 "parallel rollout engines
/// with different semantics").
fn sample_exponential(rng: &mut impl Rng, rate: f64) -> f64 {
    let u: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    -u.ln() / rate
}

/// The structural matrices of `spec.md` §4.D: `IN`/`OUT`/`INH` are
/// place-by-transition 0/1 incidence matrices, `CR` holds control-rate
/// deltas at the same shape, and `N_IN` is the input-arc count per
/// transition used to test full enabledness via a dot product.
#[derive(Debug, Clone)]
pub struct VectorizedEngine {
    in_mask: Array2<f64>,
    out_mask: Array2<f64>,
    inh_mask: Array2<f64>,
    cr: Array2<f64>,
    n_in: Array1<f64>,
}

/// Outcome of advancing one row by a single firing.
#[derive(Debug, Clone, Copy)]
pub struct StepOutcome {
    pub fired: Option<usize>,
    /// No transition had positive effective rate; the row is structurally done.
    pub done: bool,
}

impl VectorizedEngine {
    /// Builds the dense matrices from a [`NetModel`]'s canonical index order.
    pub fn from_net(net: &NetModel) -> Self {
        let p = net.num_places();
        let t = net.num_transitions();
        let mut in_mask = Array2::zeros((p, t));
        let mut out_mask = Array2::zeros((p, t));
        let mut inh_mask = Array2::zeros((p, t));
        let mut cr = Array2::zeros((p, t));

        for (j, info) in net.transitions().iter().enumerate() {
            for &i in &info.inputs {
                in_mask[[i, j]] = 1.0;
            }
            for &i in &info.outputs {
                out_mask[[i, j]] = 1.0;
            }
            for &i in &info.inhibitors {
                inh_mask[[i, j]] = 1.0;
            }
            for m in &info.control_rates {
                cr[[m.place, j]] = m.delta;
            }
        }

        let n_in = in_mask.sum_axis(Axis(0));

        Self {
            in_mask,
            out_mask,
            inh_mask,
            cr,
            n_in,
        }
    }

    pub fn num_places(&self) -> usize {
        self.in_mask.shape()[0]
    }

    pub fn num_transitions(&self) -> usize {
        self.in_mask.shape()[1]
    }

    fn effective_rates(&self, marking: &Array1<f64>, rates: &Array1<f64>) -> Array1<f64> {
        let clipped = marking.mapv(|m| m.clamp(0.0, 1.0));
        let input_sum = clipped.dot(&self.in_mask);
        let inhibited_sum = clipped.dot(&self.inh_mask);
        let cr_sum = clipped.dot(&self.cr);

        let t = self.num_transitions();
        let mut effective = Array1::zeros(t);
        for j in 0..t {
            let enabled = input_sum[j] >= self.n_in[j] && inhibited_sum[j] == 0.0;
            effective[j] = if enabled {
                (rates[j] + cr_sum[j]).max(0.0)
            } else {
                0.0
            };
        }
        effective
    }

    /// Advances `marking` by exactly one firing, mirroring
    /// [`crate::simulator::Simulator::step`] but expressed as matrix ops
    /// over the dense incidence matrices.
    ///
    /// `opponent_rates`, if given, is a set of `(transition, rate)` pairs
    /// that overwrite `rates` in place before the firing is computed —
    /// `spec.md` §4.D "Opponent strategy approximation": baking a
    /// precomputed opponent strategy into `r` so the hot loop never calls
    /// an opponent agent.
    pub fn step_single(
        &self,
        marking: &mut Array1<f64>,
        rates: &mut Array1<f64>,
        opponent_rates: Option<&[(usize, f64)]>,
        rng: &mut impl Rng,
    ) -> StepOutcome {
        if let Some(overrides) = opponent_rates {
            for &(t, rate) in overrides {
                rates[t] = rate;
            }
        }

        let effective = self.effective_rates(marking, rates);
        if effective.iter().all(|&r| r == 0.0) {
            return StepOutcome {
                fired: None,
                done: true,
            };
        }

        let t = self.num_transitions();
        let ft: Vec<f64> = (0..t)
            .map(|j| {
                if effective[j] > 0.0 {
                    sample_exponential(rng, effective[j])
                } else {
                    f64::INFINITY
                }
            })
            .collect();
        let j = (0..t).min_by_key(|&j| OrderedFloat(ft[j])).expect("t > 0");

        let in_col = self.in_mask.column(j);
        let out_col = self.out_mask.column(j);
        *marking -= &in_col;
        *marking += &out_col;

        StepOutcome {
            fired: Some(j),
            done: false,
        }
    }

    /// Runs `rows` independent rollouts from `(marking, rates)` to
    /// completion with no further player action, averaging the terminal
    /// reward (`spec.md` §4.D steps 1-9). Rows run in parallel via `rayon`,
    /// each seeded off `seed + row index` for reproducibility.
    ///
    /// `opponent_rates`, if given, replaces the named transitions' entries
    /// in `rates` once, before any row runs — the precomputed opponent
    /// strategy baked into `r` per `spec.md` §4.D, rather than calling an
    /// opponent agent inside this hot loop.
    #[allow(clippy::too_many_arguments)]
    pub fn rollout_mean_reward(
        &self,
        marking: &[f64],
        rates: &[f64],
        goal_places: &[usize],
        end_places: &[usize],
        rows: usize,
        seed: u64,
        opponent_rates: Option<&[(usize, f64)]>,
    ) -> f64 {
        let marking0 = Array1::from_vec(marking.to_vec());
        let mut rates0 = Array1::from_vec(rates.to_vec());
        if let Some(overrides) = opponent_rates {
            for &(t, rate) in overrides {
                rates0[t] = rate;
            }
        }

        let total: f64 = (0..rows)
            .into_par_iter()
            .map(|row| {
                let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(row as u64));
                let mut m = marking0.clone();
                let mut r = rates0.clone();
                loop {
                    let outcome = self.step_single(&mut m, &mut r, None, &mut rng);
                    if outcome.done {
                        return 0.0;
                    }
                    if goal_places.iter().any(|&p| m[p] > 0.0) {
                        return 100.0;
                    }
                    if end_places.iter().any(|&p| m[p] > 0.0) {
                        return 0.0;
                    }
                }
            })
            .sum();

        total / rows as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::NetModel;

    fn engine() -> (NetModel, VectorizedEngine) {
        let def = crate::net::tests::example_net();
        let net = NetModel::from_definition(&def).unwrap();
        let engine = VectorizedEngine::from_net(&net);
        (net, engine)
    }

    #[test]
    fn matrix_shapes_match_net_dimensions() {
        let (net, engine) = engine();
        assert_eq!(engine.num_places(), net.num_places());
        assert_eq!(engine.num_transitions(), net.num_transitions());
    }

    #[test]
    fn step_single_moves_exactly_one_token_per_arc() {
        let (net, engine) = engine();
        let mut marking = Array1::from_vec(net.initial_marking().to_vec());
        let mut rates = Array1::from_vec(net.initial_rates());
        rates[net.transition_index("aT1").unwrap()] = 0.0;
        rates[net.transition_index("aT2").unwrap()] = 10.0;
        rates[net.transition_index("aT3").unwrap()] = 0.0;
        rates[net.transition_index("aT4").unwrap()] = 0.0;

        let mut rng = SmallRng::seed_from_u64(42);
        let outcome = engine.step_single(&mut marking, &mut rates, None, &mut rng);

        assert_eq!(outcome.fired, net.transition_index("aT2"));
        assert_eq!(marking[net.place_index("aP1").unwrap()], 9.0);
        assert_eq!(marking[net.place_index("aP2").unwrap()], 1.0);
        assert_eq!(marking[net.place_index("aP3").unwrap()], 1.0);
    }

    #[test]
    fn step_single_applies_opponent_rate_overrides_before_firing() {
        // aT1 is rate 0 in the net fixture; overriding it to a large value
        // makes it the only transition with positive effective rate, so it
        // alone fires even though `rates` says otherwise going in.
        let (net, engine) = engine();
        let mut marking = Array1::from_vec(net.initial_marking().to_vec());
        let mut rates = Array1::from_vec(net.initial_rates());
        rates[net.transition_index("aT1").unwrap()] = 0.0;
        rates[net.transition_index("aT2").unwrap()] = 0.0;
        rates[net.transition_index("aT3").unwrap()] = 0.0;
        rates[net.transition_index("aT4").unwrap()] = 0.0;
        let overrides = [(net.transition_index("aT1").unwrap(), 50.0)];

        let mut rng = SmallRng::seed_from_u64(1);
        let outcome = engine.step_single(&mut marking, &mut rates, Some(&overrides), &mut rng);

        assert_eq!(outcome.fired, net.transition_index("aT1"));
        assert_eq!(rates[net.transition_index("aT1").unwrap()], 50.0);
    }

    #[test]
    fn rollout_mean_reward_usually_reaches_the_goal_place() {
        // Almost every rollout from the example net marks aP4 (Attacker's
        // goal, §8 scenario 1) before aP1 is drained, so the mean terminal
        // reward over a large sample is close to 100.
        let (net, engine) = engine();
        let goal = net.goal_places(net.player_id("Attacker").unwrap()).to_vec();
        let end = net.end_places(net.player_id("Attacker").unwrap()).to_vec();
        let mean = engine.rollout_mean_reward(
            net.initial_marking(),
            &net.initial_rates(),
            &goal,
            &end,
            500,
            7,
            None,
        );
        assert!(mean > 80.0, "mean reward was {mean}");
    }
}
