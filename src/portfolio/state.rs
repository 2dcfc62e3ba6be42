use crate::portfolio::position::PositionVector;

//mutable bookkeeping for a single simulation run
//a fresh state is built for every run, it is never shared across folds or scenarios
#[derive(Debug, Clone)]
pub struct SimulationState {
    //cash balance, starts at zero (trading is fully financed by cash)
    pub cash: f64,

    //position held after the most recent trade
    pub held: PositionVector,

    //total |delta| * price traded so far
    pub traded_volume: f64,

    //total commission charged so far
    pub commission_paid: f64,

    //cash + held . price from the previous mark
    pub last_value: f64,
}

impl SimulationState {
    //creates a flat, cash-neutral state
    pub fn new(n_inst: usize) -> Self {
        SimulationState {
            cash: 0.0,
            held: PositionVector::flat(n_inst),
            traded_volume: 0.0,
            commission_paid: 0.0,
            last_value: 0.0,
        }
    }

    //moves the held position to `target` at `prices`, charging commission on the traded notional
    //returns the traded notional
    pub fn rebalance(&mut self, target: PositionVector, prices: &[f64], commission_rate: f64) -> f64 {
        let delta = self.held.delta_to(&target);
        let traded = delta.gross_notional(prices);
        let commission = commission_rate * traded;

        self.traded_volume += traded;
        self.commission_paid += commission;
        self.cash -= delta.dot(prices) + commission;
        self.held = target;

        traded
    }

    //portfolio value at `prices`
    pub fn value(&self, prices: &[f64]) -> f64 {
        self.cash + self.held.dot(prices)
    }

    //marks the portfolio at `prices` and returns the change since the previous mark
    pub fn mark(&mut self, prices: &[f64]) -> f64 {
        let value = self.value(prices);
        let pl = value - self.last_value;
        self.last_value = value;
        pl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebalance_charges_commission_on_notional() {
        let mut state = SimulationState::new(1);
        let traded = state.rebalance(PositionVector::from(vec![10]), &[100.0], 0.0005);

        assert_eq!(traded, 1000.0);
        assert!((state.commission_paid - 0.5).abs() < 1e-12);
        assert!((state.cash - (-1000.0 - 0.5)).abs() < 1e-12);
        assert!((state.value(&[100.0]) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mark_reports_change_since_last_mark() {
        let mut state = SimulationState::new(1);
        state.rebalance(PositionVector::from(vec![-2]), &[50.0], 0.0);
        assert_eq!(state.mark(&[50.0]), 0.0);
        assert_eq!(state.mark(&[45.0]), 10.0);
        assert_eq!(state.last_value, 10.0);
    }
}
