/// The rate-change cost contract (`spec.md` §4.C): a Lipschitz, symmetric
/// distance with `cost(x, x) = 0`. Implementations may swap in alternative
/// distances; the default matches the source's `c_change`.
pub trait CostChange: std::fmt::Debug {
    fn cost(&self, new_rates: &[f64], old_rates: &[f64]) -> f64;
}

/// `‖new − old‖₁ / scale`, the reference implementation's cost function
/// (`original_source/.../pnpsc_env.py::c_change`), generalized over the
/// divisor since `spec.md` §4.C calls the contract parameterizable.
/// `scale = 10.0` is the documented default; `spec.md` §8 scenario 5
/// exercises the raw `‖·‖₁` variant (`scale = 1.0`).
#[derive(Debug, Clone, Copy)]
pub struct L1Cost {
    pub scale: f64,
}

impl Default for L1Cost {
    fn default() -> Self {
        Self { scale: 10.0 }
    }
}

impl L1Cost {
    pub fn with_scale(scale: f64) -> Self {
        Self { scale }
    }
}

impl CostChange for L1Cost {
    fn cost(&self, new_rates: &[f64], old_rates: &[f64]) -> f64 {
        new_rates
            .iter()
            .zip(old_rates)
            .map(|(n, o)| (n - o).abs())
            .sum::<f64>()
            / self.scale
    }
}
