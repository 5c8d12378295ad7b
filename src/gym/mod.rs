//! The gym-style environment layer (`SPEC_FULL.md` §4.C): wraps a
//! [`crate::simulator::Simulator`] with observation/action/reward plumbing
//! and a per-player lifecycle, mirroring the shape a market-backtest
//! environment gives a trading strategy.

pub mod cost;
pub mod env;
pub mod observation;

pub use cost::{CostChange, L1Cost};
pub use env::{EnvConfig, EnvStatus, Environment, Reward, StepMode};
pub use observation::Observation;
