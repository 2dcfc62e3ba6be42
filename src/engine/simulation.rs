use crate::data::PriceMatrix;
use crate::engine::error::SimulationError;
use crate::engine::limiter::PositionLimiter;
use crate::metrics::{summarize, Stats};
use crate::portfolio::{PositionVector, SimulationState};
use crate::strategy::DecisionFunction;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

//configuration for a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    //commission as a fraction of traded notional
    pub commission_rate: f64,

    //per-instrument dollar notional cap
    pub dollar_cap: f64,
}

impl SimulationConfig {
    //commission must be finite and non-negative, the cap finite and positive
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.commission_rate.is_finite() || self.commission_rate < 0.0 {
            return Err(SimulationError::InvalidConfig {
                detail: format!(
                    "commission rate {} must be finite and non-negative",
                    self.commission_rate
                ),
            });
        }
        if !self.dollar_cap.is_finite() || self.dollar_cap <= 0.0 {
            return Err(SimulationError::InvalidConfig {
                detail: format!("dollar cap {} must be finite and positive", self.dollar_cap),
            });
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            commission_rate: 0.0005,
            dollar_cap: 10_000.0,
        }
    }
}

//which price a noise overlay corrupts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayTarget {
    //only the decision function's view of today; limits and accounting use the true price
    DecisionView,
    //the execution price itself: limits, trades and marks all use the corrupted price
    Settlement,
}

//multiplicative per-instrument, per-day factors applied to each simulated day's price
#[derive(Debug, Clone, PartialEq)]
pub struct PriceOverlay {
    target: OverlayTarget,
    n_inst: usize,
    n_days: usize,
    factors: Vec<f64>,
}

impl PriceOverlay {
    //`factors` is row-major by instrument, `n_inst * n_days` long
    pub fn new(
        target: OverlayTarget,
        n_inst: usize,
        n_days: usize,
        factors: Vec<f64>,
    ) -> Result<Self, SimulationError> {
        if factors.len() != n_inst * n_days {
            return Err(SimulationError::InvalidOverlay {
                expected: n_inst * n_days,
                got: factors.len(),
            });
        }
        Ok(PriceOverlay {
            target,
            n_inst,
            n_days,
            factors,
        })
    }

    pub fn target(&self) -> OverlayTarget {
        self.target
    }

    pub fn factor(&self, instrument: usize, day: usize) -> f64 {
        self.factors[instrument * self.n_days + day]
    }

    fn apply(&self, day: usize, prices: &[f64]) -> Vec<f64> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| p * self.factor(i, day))
            .collect()
    }

    fn check_covers(&self, prices: &PriceMatrix) -> Result<(), SimulationError> {
        if self.n_inst != prices.n_inst() || self.n_days < prices.n_days() {
            return Err(SimulationError::OverlayMismatch {
                overlay_inst: self.n_inst,
                overlay_days: self.n_days,
                n_inst: prices.n_inst(),
                n_days: prices.n_days(),
            });
        }
        Ok(())
    }
}

//outcome of one simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    //first simulated day (index into the matrix)
    pub start_day: usize,

    //p/l of every simulated day after the first, test_days - 1 entries
    pub daily_pl: Vec<f64>,

    //position held at the close of each simulated day, test_days entries
    pub positions: Vec<PositionVector>,

    //portfolio value after the first day, the baseline the p/l series is measured from
    pub initial_value: f64,

    pub final_value: f64,
    pub final_cash: f64,
    pub traded_volume: f64,
    pub commission_paid: f64,
}

impl SimulationResult {
    pub fn stats(&self) -> Stats {
        summarize(&self.daily_pl, self.traded_volume, self.final_value)
    }
}

//sequential day-by-day p/l simulator
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulationEngine {
    config: SimulationConfig,
    limiter: PositionLimiter,
}

impl SimulationEngine {
    pub fn new(config: SimulationConfig) -> Self {
        SimulationEngine {
            config,
            limiter: PositionLimiter::new(config.dollar_cap),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    //simulates the last `test_days` days of `prices`
    pub fn run<D: DecisionFunction>(
        &self,
        prices: &PriceMatrix,
        test_days: usize,
        decision: &D,
    ) -> Result<SimulationResult, SimulationError> {
        self.simulate(prices, test_days, decision, None)
    }

    //same as `run` with noise applied to each simulated day's price
    pub fn run_with_overlay<D: DecisionFunction>(
        &self,
        prices: &PriceMatrix,
        test_days: usize,
        decision: &D,
        overlay: &PriceOverlay,
    ) -> Result<SimulationResult, SimulationError> {
        overlay.check_covers(prices)?;
        self.simulate(prices, test_days, decision, Some(overlay))
    }

    fn simulate<D: DecisionFunction>(
        &self,
        prices: &PriceMatrix,
        test_days: usize,
        decision: &D,
        overlay: Option<&PriceOverlay>,
    ) -> Result<SimulationResult, SimulationError> {
        self.config.validate()?;

        let n_inst = prices.n_inst();
        let n_days = prices.n_days();

        if test_days < 2 || test_days > n_days {
            return Err(SimulationError::InvalidWindow { test_days, n_days });
        }

        let start_day = n_days - test_days;
        let last_day = n_days - 1;

        let mut state = SimulationState::new(n_inst);
        let mut decision_state = decision.initial_state();
        let mut daily_pl = Vec::with_capacity(test_days - 1);
        let mut positions = Vec::with_capacity(test_days);
        let mut initial_value = 0.0;

        for day in start_day..=last_day {
            let true_prices = prices.column(day);

            //decision_view: what the decision function is shown as today's price
            //exec_prices: what limits, trades and marks use
            let (decision_view, exec_prices) = match overlay {
                Some(o) if o.target() == OverlayTarget::DecisionView => {
                    (Some(o.apply(day, &true_prices)), true_prices)
                }
                Some(o) => (None, o.apply(day, &true_prices)),
                None => (None, true_prices),
            };

            check_prices(day, &exec_prices)?;

            //no trade on the final day, there is no later price to realize it against
            if day < last_day {
                let history = match decision_view.as_deref() {
                    Some(today) => prices.history(day).with_today(today),
                    None => prices.history(day),
                };

                let (next_state, raw) = decision.decide(decision_state, &history);
                decision_state = next_state;

                let raw = whole_shares(day, n_inst, &raw)?;
                let target = self.limiter.limit(&raw, &exec_prices, day)?;
                let traded = state.rebalance(target, &exec_prices, self.config.commission_rate);

                trace!(day, traded, cash = state.cash, "rebalanced");
            }

            let pl = state.mark(&exec_prices);
            if day > start_day {
                daily_pl.push(pl);
            } else {
                initial_value = state.last_value;
            }
            positions.push(state.held.clone());
        }

        debug!(
            strategy = decision.name(),
            n_days,
            test_days,
            final_value = state.last_value,
            traded_volume = state.traded_volume,
            "simulation finished"
        );

        Ok(SimulationResult {
            start_day,
            daily_pl,
            positions,
            initial_value,
            final_value: state.last_value,
            final_cash: state.cash,
            traded_volume: state.traded_volume,
            commission_paid: state.commission_paid,
        })
    }
}

fn check_prices(day: usize, prices: &[f64]) -> Result<(), SimulationError> {
    match prices
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p <= 0.0)
    {
        Some((instrument, &price)) => Err(SimulationError::InvalidPriceData {
            instrument,
            day,
            price,
        }),
        None => Ok(()),
    }
}

//validates decision output: right length, finite, whole numbers in i64 range
fn whole_shares(day: usize, n_inst: usize, raw: &[f64]) -> Result<Vec<i64>, SimulationError> {
    if raw.len() != n_inst {
        return Err(SimulationError::InvalidDecisionOutput {
            day,
            detail: format!("expected {} positions, got {}", n_inst, raw.len()),
        });
    }

    raw.iter()
        .enumerate()
        .map(|(instrument, &q)| {
            if !q.is_finite() {
                return Err(SimulationError::InvalidDecisionOutput {
                    day,
                    detail: format!("instrument {} position is not finite ({})", instrument, q),
                });
            }
            if q.fract() != 0.0 || q.abs() >= i64::MAX as f64 {
                return Err(SimulationError::InvalidDecisionOutput {
                    day,
                    detail: format!(
                        "instrument {} position {} is not a whole share count",
                        instrument, q
                    ),
                });
            }
            Ok(q as i64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PriceHistory;
    use crate::strategy::FlatStrategy;

    //always asks for the same positions
    struct Fixed(Vec<f64>);

    impl DecisionFunction for Fixed {
        type State = ();

        fn initial_state(&self) {}

        fn decide(&self, _: (), _: &PriceHistory<'_>) -> ((), Vec<f64>) {
            ((), self.0.clone())
        }

        fn name(&self) -> &str {
            "Fixed"
        }
    }

    fn constant(price: f64, days: usize) -> PriceMatrix {
        PriceMatrix::from_rows(vec![vec![price; days]]).unwrap()
    }

    #[test]
    fn test_pl_length_and_window_checks() {
        let engine = SimulationEngine::default();
        let m = constant(100.0, 10);

        let result = engine.run(&m, 10, &FlatStrategy).unwrap();
        assert_eq!(result.daily_pl.len(), 9);
        assert_eq!(result.positions.len(), 10);
        assert_eq!(result.start_day, 0);

        assert_eq!(
            engine.run(&m, 11, &FlatStrategy).unwrap_err(),
            SimulationError::InvalidWindow {
                test_days: 11,
                n_days: 10
            }
        );
        assert!(engine.run(&m, 1, &FlatStrategy).is_err());
    }

    #[test]
    fn test_long_position_earns_price_move() {
        let engine = SimulationEngine::new(SimulationConfig {
            commission_rate: 0.0,
            dollar_cap: 10_000.0,
        });
        let m = PriceMatrix::from_rows(vec![vec![100.0, 100.0, 110.0, 105.0]]).unwrap();
        let result = engine.run(&m, 4, &Fixed(vec![10.0])).unwrap();

        assert_eq!(result.daily_pl, vec![0.0, 100.0, -50.0]);
        assert_eq!(result.final_value, 50.0);
        assert_eq!(result.traded_volume, 1000.0);
    }

    #[test]
    fn test_rejects_bad_decision_output() {
        let engine = SimulationEngine::default();
        let m = PriceMatrix::from_rows(vec![vec![10.0; 5], vec![20.0; 5]]).unwrap();

        let err = engine.run(&m, 3, &Fixed(vec![1.0])).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidDecisionOutput { day: 2, .. }));

        let err = engine.run(&m, 3, &Fixed(vec![1.0, f64::NAN])).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidDecisionOutput { .. }));

        let err = engine.run(&m, 3, &Fixed(vec![1.5, 0.0])).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidDecisionOutput { .. }));
    }

    #[test]
    fn test_decision_view_noise_leaves_accounting_alone() {
        let engine = SimulationEngine::new(SimulationConfig {
            commission_rate: 0.0,
            dollar_cap: 1e9,
        });
        let m = PriceMatrix::from_rows(vec![vec![100.0, 100.0, 110.0, 120.0]]).unwrap();
        let overlay = PriceOverlay::new(OverlayTarget::DecisionView, 1, 4, vec![2.0; 4]).unwrap();

        let clean = engine.run(&m, 4, &Fixed(vec![1.0])).unwrap();
        let noisy = engine.run_with_overlay(&m, 4, &Fixed(vec![1.0]), &overlay).unwrap();
        assert_eq!(clean.daily_pl, noisy.daily_pl);
        assert_eq!(clean.traded_volume, noisy.traded_volume);
    }

    #[test]
    fn test_settlement_noise_moves_accounting_price() {
        let engine = SimulationEngine::new(SimulationConfig {
            commission_rate: 0.0,
            dollar_cap: 1e9,
        });
        let m = constant(100.0, 3);
        let overlay =
            PriceOverlay::new(OverlayTarget::Settlement, 1, 3, vec![1.0, 1.1, 1.0]).unwrap();

        let result = engine.run_with_overlay(&m, 3, &Fixed(vec![1.0]), &overlay).unwrap();
        //bought 1 at 100, marked at 110, rebalance is a no-op, marked at 100
        assert!((result.daily_pl[0] - 10.0).abs() < 1e-9);
        assert!((result.daily_pl[1] + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_settlement_noise_can_break_prices() {
        let engine = SimulationEngine::default();
        let m = constant(100.0, 3);
        let overlay =
            PriceOverlay::new(OverlayTarget::Settlement, 1, 3, vec![1.0, -0.5, 1.0]).unwrap();
        let err = engine.run_with_overlay(&m, 3, &FlatStrategy, &overlay).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidPriceData { instrument: 0, day: 1, .. }
        ));
    }

    #[test]
    fn test_rejects_bad_config() {
        let m = constant(100.0, 5);
        for config in [
            SimulationConfig {
                commission_rate: 0.0,
                dollar_cap: -1.0,
            },
            SimulationConfig {
                commission_rate: 0.0,
                dollar_cap: f64::NAN,
            },
            SimulationConfig {
                commission_rate: -0.001,
                dollar_cap: 10_000.0,
            },
        ] {
            let err = SimulationEngine::new(config)
                .run(&m, 3, &Fixed(vec![1.0]))
                .unwrap_err();
            assert!(matches!(err, SimulationError::InvalidConfig { .. }));
        }
    }

    #[test]
    fn test_overlay_factor_count_checked() {
        let err = PriceOverlay::new(OverlayTarget::Settlement, 2, 3, vec![1.0; 5]).unwrap_err();
        assert_eq!(
            err,
            SimulationError::InvalidOverlay {
                expected: 6,
                got: 5
            }
        );
    }

    #[test]
    fn test_overlay_must_cover_matrix() {
        let engine = SimulationEngine::default();
        let m = constant(100.0, 5);
        let overlay = PriceOverlay::new(OverlayTarget::DecisionView, 1, 3, vec![1.0; 3]).unwrap();
        assert!(matches!(
            engine.run_with_overlay(&m, 3, &FlatStrategy, &overlay),
            Err(SimulationError::OverlayMismatch { .. })
        ));
    }

    #[test]
    fn test_decision_view_noise_reaches_decision_function() {
        let engine = SimulationEngine::default();
        let m = constant(100.0, 4);
        let overlay =
            PriceOverlay::new(OverlayTarget::DecisionView, 1, 4, vec![1.0, 1.5, 2.0, 3.0])
                .unwrap();

        //the decision function only sees a corrupted today, so a strategy keyed on it
        //still settles at the true price
        struct Threshold;
        impl DecisionFunction for Threshold {
            type State = ();
            fn initial_state(&self) {}
            fn decide(&self, _: (), h: &PriceHistory<'_>) -> ((), Vec<f64>) {
                let today = h.today()[0];
                ((), vec![if today > 120.0 { 5.0 } else { 0.0 }])
            }
            fn name(&self) -> &str {
                "Threshold"
            }
        }

        let result = engine.run_with_overlay(&m, 4, &Threshold, &overlay).unwrap();
        assert_eq!(result.positions[0].as_slice(), &[0]);
        assert_eq!(result.positions[1].as_slice(), &[5]);
        assert_eq!(result.positions[2].as_slice(), &[5]);
        //traded 5 shares at the true price of 100
        assert_eq!(result.traded_volume, 500.0);
    }
}
