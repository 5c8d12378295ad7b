//! PNPSC: a stochastic Petri net simulator and gym-style environment for
//! two-player penetration/security contest nets, plus a vectorized
//! Monte-Carlo rollout engine for estimating expected terminal reward.

pub mod agent;
pub mod error;
pub mod gym;
pub mod net;
pub mod simulator;
pub mod vec;

mod macros;

pub use error::{PnpscError, PnpscResult};
pub use net::{NetDefinition, NetModel};
pub use simulator::{SimConfig, Simulator};
