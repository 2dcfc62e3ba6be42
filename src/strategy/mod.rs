pub mod configured;
pub mod ema_trend;
pub mod flat;
pub mod index_momentum;
pub mod throttle;

use crate::data::PriceHistory;

pub use configured::{ConfiguredState, ConfiguredStrategy};
pub use ema_trend::{EmaTrendParams, EmaTrendState, EmaTrendStrategy};
pub use flat::FlatStrategy;
pub use index_momentum::{IndexMomentumParams, IndexMomentumStrategy};
pub use throttle::{RebalanceThrottle, ThrottleState};

//a decision function maps the price history seen so far to one desired position per instrument
//
//any memory the function keeps between days lives in `State`, owned by the caller:
//every independent run starts from `initial_state()` and threads the returned state
//into the next call, so folds and scenarios never see each other's state
pub trait DecisionFunction: Sync {
    type State: Send;

    //state for the first day of a run
    fn initial_state(&self) -> Self::State;

    //returns the next state and the desired positions (whole share counts)
    fn decide(&self, state: Self::State, history: &PriceHistory<'_>) -> (Self::State, Vec<f64>);

    //returns the strategy name
    fn name(&self) -> &str;
}

//arithmetic mean, None for an empty slice
pub fn sma(prices: &[f64]) -> Option<f64> {
    if prices.is_empty() {
        return None;
    }
    Some(prices.iter().sum::<f64>() / prices.len() as f64)
}

//exponential moving average of the whole series with alpha = 2 / (span + 1), seeded with the first value
pub fn ema(series: &[f64], span: usize) -> Option<f64> {
    let (&first, rest) = series.split_first()?;
    let alpha = 2.0 / (span as f64 + 1.0);
    Some(
        rest.iter()
            .fold(first, |acc, &x| alpha * x + (1.0 - alpha) * acc),
    )
}

//simple returns p[t] / p[t-1] - 1
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

//population standard deviation, 0 for fewer than one value
pub fn population_std(values: &[f64]) -> f64 {
    match sma(values) {
        Some(mean) => {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            var.sqrt()
        }
        None => 0.0,
    }
}

//kaufman efficiency ratio of the last `window` points: |net move| / sum of |moves|
pub fn efficiency_ratio(series: &[f64], window: usize) -> Option<f64> {
    if window < 2 || series.len() < window {
        return None;
    }
    let tail = &series[series.len() - window..];
    let net = (tail[tail.len() - 1] - tail[0]).abs();
    let path: f64 = tail.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    Some(net / (path + 1e-12))
}

//equal-weight index (mean price across instruments) for every day of the history
pub fn mean_index(history: &PriceHistory<'_>) -> Vec<f64> {
    (0..history.n_days())
        .map(|day| {
            let column = history.column(day);
            column.iter().sum::<f64>() / column.len() as f64
        })
        .collect()
}

//geometric-mean index across instruments for every day of the history
pub fn geometric_index(history: &PriceHistory<'_>) -> Vec<f64> {
    (0..history.n_days())
        .map(|day| {
            let column = history.column(day);
            (column.iter().map(|p| p.ln()).sum::<f64>() / column.len() as f64).exp()
        })
        .collect()
}

//population std of each instrument's returns across the `window` prices ending before index `end_day`
//plus a 1e-8 floor so callers can divide by it
pub fn trailing_volatility(history: &PriceHistory<'_>, window: usize, end_day: usize) -> Vec<f64> {
    (0..history.n_inst())
        .map(|instrument| {
            let series = history.series(instrument);
            let start = end_day.saturating_sub(window);
            let slice = &series[start..end_day];
            population_std(&simple_returns(slice)) + 1e-8
        })
        .collect()
}

//whole shares that keep |shares * price| within `dollar_cap`
pub fn clip_to_dollar_cap(shares: f64, price: f64, dollar_cap: f64) -> f64 {
    let cap = (dollar_cap / price.max(1e-12)).floor();
    shares.clamp(-cap, cap)
}

//rounds a share count toward zero onto a lot grid
pub fn round_to_lot(shares: f64, lot_size: u32) -> f64 {
    let lot = lot_size.max(1) as f64;
    (shares.abs() / lot).floor() * lot * shares.signum()
}
