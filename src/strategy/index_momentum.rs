use crate::data::PriceHistory;
use crate::strategy::{mean_index, trailing_volatility, DecisionFunction};
use serde::{Deserialize, Serialize};

//index momentum parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexMomentumParams {
    pub lookback: usize,
    pub threshold: f64,
    pub target_dollar: f64,
    pub vol_window: usize,
    pub dollar_cap: f64,
}

impl Default for IndexMomentumParams {
    fn default() -> Self {
        IndexMomentumParams {
            lookback: 10,
            threshold: 0.002,
            target_dollar: 1500.0,
            vol_window: 10,
            dollar_cap: 10_000.0,
        }
    }
}

//equal-weight index momentum
//every instrument takes the direction of the index move over `lookback` days
//sized inversely to its own recent volatility
#[derive(Debug, Clone)]
pub struct IndexMomentumStrategy {
    params: IndexMomentumParams,
}

impl IndexMomentumStrategy {
    pub fn new(params: IndexMomentumParams) -> Self {
        IndexMomentumStrategy { params }
    }

    //same sizing as the default strategy with a different signal window and trigger
    pub fn with_signal(lookback: usize, threshold: f64) -> Self {
        Self::new(IndexMomentumParams {
            lookback,
            threshold,
            vol_window: lookback,
            ..IndexMomentumParams::default()
        })
    }

    pub fn params(&self) -> &IndexMomentumParams {
        &self.params
    }

    fn positions(&self, history: &PriceHistory<'_>) -> Vec<f64> {
        let p = &self.params;
        let n_inst = history.n_inst();
        let n_days = history.n_days();

        //need lookback + 1 days for the index move and vol_window + 1 for sizing
        if n_days <= p.lookback.max(p.vol_window) {
            return vec![0.0; n_inst];
        }

        let index = mean_index(history);
        let momentum = index[n_days - 1] / index[n_days - 1 - p.lookback] - 1.0;
        if momentum.abs() < p.threshold {
            return vec![0.0; n_inst];
        }
        //no move counts as down
        let direction = if momentum > 0.0 { 1.0 } else { -1.0 };

        let today = history.today();
        let vol = trailing_volatility(history, p.vol_window, n_days - 1);

        today
            .iter()
            .zip(vol)
            .map(|(&price, vol)| {
                let mut shares = (p.target_dollar / (price * vol)).floor();
                if shares * price > p.dollar_cap {
                    shares = (p.dollar_cap / price).floor();
                }
                direction * shares.max(1.0)
            })
            .collect()
    }
}

impl Default for IndexMomentumStrategy {
    fn default() -> Self {
        Self::new(IndexMomentumParams::default())
    }
}

impl DecisionFunction for IndexMomentumStrategy {
    type State = ();

    fn initial_state(&self) -> Self::State {}

    fn decide(&self, state: Self::State, history: &PriceHistory<'_>) -> (Self::State, Vec<f64>) {
        (state, self.positions(history))
    }

    fn name(&self) -> &str {
        "Index Momentum"
    }
}
