use serde::Serialize;
use thiserror::Error;

//fatal conditions that abort a single simulation run
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum SimulationError {
    #[error("Invalid price data: instrument {instrument} on day {day} has price {price}")]
    InvalidPriceData {
        instrument: usize,
        day: usize,
        price: f64,
    },
    #[error("Invalid decision output on day {day}: {detail}")]
    InvalidDecisionOutput { day: usize, detail: String },
    #[error("Invalid test window: {test_days} test days over {n_days} available days (need 2..={n_days})")]
    InvalidWindow { test_days: usize, n_days: usize },
    #[error("Invalid simulation config: {detail}")]
    InvalidConfig { detail: String },
    #[error("Price overlay has {got} factors, expected {expected}")]
    InvalidOverlay { expected: usize, got: usize },
    #[error("Price overlay covers {overlay_inst} instruments x {overlay_days} days, matrix is {n_inst} x {n_days}")]
    OverlayMismatch {
        overlay_inst: usize,
        overlay_days: usize,
        n_inst: usize,
        n_days: usize,
    },
}
