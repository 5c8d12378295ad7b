pub mod definition;
pub mod model;

pub use definition::{NetDefinition, PlaceDef, PlayerDef, TransitionDef};
pub use model::{ControlRateModifier, NetModel, PlaceIdx, PlayerId, TransitionIdx, TransitionInfo};
