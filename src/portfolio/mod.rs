pub mod position;
pub mod state;

pub use position::PositionVector;
pub use state::SimulationState;
