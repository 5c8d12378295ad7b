pub mod config;
pub mod engine;
pub mod state;

pub use config::SimConfig;
pub use engine::Simulator;
pub use state::SimState;
