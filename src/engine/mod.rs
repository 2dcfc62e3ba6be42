pub mod error;
pub mod limiter;
pub mod simulation;

pub use error::SimulationError;
pub use limiter::PositionLimiter;
pub use simulation::{
    OverlayTarget, PriceOverlay, SimulationConfig, SimulationEngine, SimulationResult,
};
