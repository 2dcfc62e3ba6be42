pub mod summary;
pub mod timeseries;

pub use summary::{score, summarize, Stats, RISK_AVERSION, TRADING_DAYS_PER_YEAR};
pub use timeseries::{cumulative_pl, drawdown_curve, max_drawdown, percentile};
