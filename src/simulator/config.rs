/// Per-simulator configuration toggles (`spec.md` §6). Deliberately a plain
/// struct the caller constructs and owns — never a process global — so that
/// multiple simulators/rollout engines with different semantics can coexist
/// (`spec.md` §9 "Global mutable flags").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Resample every enabled transition's firing time on every step
    /// (cloud-compatible default) instead of only when it has none pending.
    pub reset: bool,
    /// Charge a transition's `fire_cost` to its owner when it fires.
    pub use_fire_cost: bool,
    /// Persist the composed (base + control-rate) rate back into the base
    /// rate table after each step, instead of treating it as observational.
    pub reset_control_rate: bool,
    /// Sentinel future firing time used for an enabled transition whose
    /// effective rate is exactly zero, so it can still eventually fire.
    pub large_time: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            reset: true,
            use_fire_cost: false,
            reset_control_rate: false,
            large_time: 100.0,
        }
    }
}
