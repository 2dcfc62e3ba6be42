use crate::data::PriceHistory;
use crate::strategy::{
    clip_to_dollar_cap, efficiency_ratio, ema, geometric_index, population_std, round_to_lot,
    simple_returns, trailing_volatility, DecisionFunction,
};
use serde::{Deserialize, Serialize};

//ema trend parameters (balanced preset)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaTrendParams {
    pub span_fast: usize,
    pub span_slow: usize,
    pub vol_window: usize,
    pub index_vol_window: usize,
    pub base_target_dollar: f64,
    pub threshold_vol_mult: f64,
    pub size_scale_k: f64,
    pub lot_size: u32,
    pub no_trade_min_dollars: f64,
    pub er_window: usize,
    pub er_low: f64,
    pub er_high: f64,
    pub chop_size_mult: f64,
    pub chop_threshold_mult: f64,
    pub dollar_cap: f64,
}

impl Default for EmaTrendParams {
    fn default() -> Self {
        EmaTrendParams {
            span_fast: 7,
            span_slow: 10,
            vol_window: 5,
            index_vol_window: 20,
            base_target_dollar: 1500.0,
            threshold_vol_mult: 0.4,
            size_scale_k: 0.4,
            lot_size: 10,
            no_trade_min_dollars: 2000.0,
            er_window: 25,
            er_low: 0.26,
            er_high: 0.56,
            chop_size_mult: 0.30,
            chop_threshold_mult: 2.0,
            dollar_cap: 10_000.0,
        }
    }
}

//the target returned on the previous day, used by the no-trade band
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmaTrendState {
    pub last_target: Option<Vec<f64>>,
}

//geometric-index ema trend follower
//the trigger scales with index volatility and widens in choppy regimes (low efficiency ratio),
//where size is also cut; per-name sizing is inverse-volatility, lot-rounded and dollar-capped
#[derive(Debug, Clone, Default)]
pub struct EmaTrendStrategy {
    params: EmaTrendParams,
}

impl EmaTrendStrategy {
    pub fn new(params: EmaTrendParams) -> Self {
        EmaTrendStrategy { params }
    }

    pub fn params(&self) -> &EmaTrendParams {
        &self.params
    }

    fn min_history(&self) -> usize {
        let p = &self.params;
        p.span_slow
            .max(p.vol_window)
            .max(p.index_vol_window)
            .max(p.er_window)
            + 2
    }

    //0 in chop, 1 in a clean trend, linear in between
    fn trend_weight(&self, er: f64) -> f64 {
        let p = &self.params;
        if er <= p.er_low {
            0.0
        } else if er >= p.er_high {
            1.0
        } else {
            (er - p.er_low) / (p.er_high - p.er_low)
        }
    }

    //today's target before the no-trade band
    fn target(&self, history: &PriceHistory<'_>) -> Vec<f64> {
        let p = &self.params;
        let n_inst = history.n_inst();
        let n_days = history.n_days();

        if n_days < self.min_history() {
            return vec![0.0; n_inst];
        }

        let index = geometric_index(history);
        let returns = simple_returns(&index);
        let recent = &returns[returns.len().saturating_sub(p.index_vol_window)..];
        let index_vol = population_std(recent) + 1e-12;

        let er = efficiency_ratio(&index, p.er_window).unwrap_or(0.0);
        let w = self.trend_weight(er);
        let threshold_mult = p.threshold_vol_mult * p.chop_threshold_mult.powf(1.0 - w);
        let base_dollar = p.base_target_dollar * p.chop_size_mult.powf(1.0 - w);

        let span = if index_vol > 0.01 {
            p.span_slow
        } else {
            p.span_fast
        };
        let trend = match ema(&index, span) {
            Some(v) => v.max(1e-12),
            None => return vec![0.0; n_inst],
        };

        let deviation = index[n_days - 1] / trend - 1.0;
        let threshold = threshold_mult * index_vol;
        if deviation.abs() < threshold {
            return vec![0.0; n_inst];
        }
        let direction = deviation.signum();

        let scale = (1.0 + p.size_scale_k * (deviation.abs() / threshold.max(1e-12) - 1.0))
            .clamp(0.5, 2.5);

        let today = history.today();
        let vol = trailing_volatility(history, p.vol_window, n_days - 1);

        today
            .iter()
            .zip(vol)
            .map(|(&price, vol)| {
                let dollars = base_dollar * scale / vol;
                let shares = round_to_lot(dollars / price.max(1e-12), p.lot_size);
                let shares = clip_to_dollar_cap(shares, price, p.dollar_cap);
                direction * shares.max(1.0)
            })
            .collect()
    }
}

impl DecisionFunction for EmaTrendStrategy {
    type State = EmaTrendState;

    fn initial_state(&self) -> Self::State {
        EmaTrendState::default()
    }

    fn decide(&self, state: Self::State, history: &PriceHistory<'_>) -> (Self::State, Vec<f64>) {
        let mut target = self.target(history);

        //skip rebalances too small to be worth the commission
        if let Some(previous) = state.last_target.as_ref().filter(|t| t.len() == target.len()) {
            let today = history.today();
            let trading = target.iter().any(|&q| q != 0.0);
            if trading {
                for ((new, &old), price) in target.iter_mut().zip(previous).zip(today) {
                    if (*new - old).abs() * price < self.params.no_trade_min_dollars {
                        *new = old;
                    }
                }
            }
        }

        let next = EmaTrendState {
            last_target: Some(target.clone()),
        };
        (next, target)
    }

    fn name(&self) -> &str {
        "EMA Trend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PriceMatrix;

    fn trending(days: usize, step: f64) -> PriceMatrix {
        let rows = (0..3)
            .map(|i| {
                (0..days)
                    .map(|d| {
                        let wiggle = if (d + i) % 2 == 0 { 1.002 } else { 0.998 };
                        (20.0 + 10.0 * i as f64) * (1.0 + step).powi(d as i32) * wiggle
                    })
                    .collect()
            })
            .collect();
        PriceMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_flat_before_minimum_history() {
        let s = EmaTrendStrategy::default();
        let m = trending(20, 0.01);
        let (state, pos) = s.decide(s.initial_state(), &m.history(19));
        assert_eq!(pos, vec![0.0; 3]);
        assert_eq!(state.last_target, Some(vec![0.0; 3]));
    }

    #[test]
    fn test_goes_with_the_trend_within_cap() {
        let s = EmaTrendStrategy::default();
        let m = trending(60, 0.01);
        let h = m.history(59);
        let (_, pos) = s.decide(s.initial_state(), &h);
        for (q, p) in pos.iter().zip(h.today()) {
            assert!(*q >= 1.0);
            assert_eq!(q.fract(), 0.0);
            assert!(q * p <= 10_000.0);
        }
    }

    #[test]
    fn test_no_trade_band_keeps_previous_target() {
        let s = EmaTrendStrategy::new(EmaTrendParams {
            no_trade_min_dollars: 1e12,
            ..EmaTrendParams::default()
        });
        let m = trending(60, 0.01);
        let previous = vec![7.0, 8.0, 9.0];
        let state = EmaTrendState {
            last_target: Some(previous.clone()),
        };
        let (next, pos) = s.decide(state, &m.history(59));
        assert_eq!(pos, previous);
        assert_eq!(next.last_target, Some(previous));
    }
}
