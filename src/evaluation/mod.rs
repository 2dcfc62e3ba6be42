pub mod perturbation;
pub mod report;
pub mod sweep;
pub mod walk_forward;

use crate::data::MatrixError;
use crate::engine::SimulationError;
use thiserror::Error;

pub use perturbation::{RepeatOutcome, RobustnessRunner, Scenario, ScenarioReport};
pub use report::EvaluationReport;
pub use sweep::{ParameterSweep, SweepCell, SweepReport};
pub use walk_forward::{Fold, FoldOutcome, WalkForward, WalkForwardReport};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("No walk-forward fold fits in {n_days} days (train {train_days} + test {test_days})")]
    NoFolds {
        n_days: usize,
        train_days: usize,
        test_days: usize,
    },
    #[error("Invalid noise level {0}%: must be finite and non-negative")]
    InvalidNoise(f64),
    #[error("Invalid parameter sweep: {0}")]
    InvalidSweep(String),
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}
