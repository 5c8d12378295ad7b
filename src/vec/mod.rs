//! The vectorized rollout engine (`SPEC_FULL.md` §4.D): a batched
//! Monte-Carlo estimator of expected terminal reward, plus an
//! advantage-form single-step environment and opponent strategy
//! approximation built on top of it.

pub mod advantage;
pub mod engine;
pub mod strategy;

pub use advantage::AdvantageEnvironment;
pub use engine::{StepOutcome, VectorizedEngine};
pub use strategy::estimate_opponent_strategy;
