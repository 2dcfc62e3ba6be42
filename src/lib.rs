//a day-by-day trading strategy evaluator: simulation, walk-forward folds and robustness scenarios

pub mod config;
pub mod data;
pub mod engine;
pub mod evaluation;
pub mod metrics;
pub mod portfolio;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{EvalConfiguration, NoiseKind, StrategyConfig, StrategyType};
    pub use crate::data::{load_prices, save_pl_csv, PriceHistory, PriceMatrix};
    pub use crate::engine::{
        OverlayTarget, PositionLimiter, PriceOverlay, SimulationConfig, SimulationEngine,
        SimulationError, SimulationResult,
    };
    pub use crate::evaluation::{
        EvaluationError, EvaluationReport, ParameterSweep, RobustnessRunner, Scenario,
        ScenarioReport, SweepReport, WalkForward, WalkForwardReport,
    };
    pub use crate::metrics::{summarize, Stats};
    pub use crate::portfolio::{PositionVector, SimulationState};
    pub use crate::strategy::{
        ConfiguredStrategy, DecisionFunction, EmaTrendParams, EmaTrendStrategy, FlatStrategy,
        IndexMomentumParams, IndexMomentumStrategy, RebalanceThrottle,
    };
}
