use crate::data::PriceHistory;
use crate::strategy::DecisionFunction;

#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleState<S> {
    pub inner: S,
    pub calls: usize,
    pub last: Option<Vec<f64>>,
}

//only consults the wrapped strategy every `interval` days and repeats its last answer in between
#[derive(Debug, Clone)]
pub struct RebalanceThrottle<D> {
    inner: D,
    interval: usize,
    name: String,
}

impl<D: DecisionFunction> RebalanceThrottle<D> {
    //an interval of 0 or 1 rebalances every day
    pub fn new(inner: D, interval: usize) -> Self {
        let interval = interval.max(1);
        let name = if interval == 1 {
            inner.name().to_string()
        } else {
            format!("{} (every {} days)", inner.name(), interval)
        };
        RebalanceThrottle {
            inner,
            interval,
            name,
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn interval(&self) -> usize {
        self.interval
    }
}

impl<D: DecisionFunction> DecisionFunction for RebalanceThrottle<D> {
    type State = ThrottleState<D::State>;

    fn initial_state(&self) -> Self::State {
        ThrottleState {
            inner: self.inner.initial_state(),
            calls: 0,
            last: None,
        }
    }

    fn decide(&self, state: Self::State, history: &PriceHistory<'_>) -> (Self::State, Vec<f64>) {
        let ThrottleState { inner, calls, last } = state;

        let holding = last.filter(|l| calls % self.interval != 0 && l.len() == history.n_inst());
        if let Some(last) = holding {
            let next = ThrottleState {
                inner,
                calls: calls + 1,
                last: Some(last.clone()),
            };
            return (next, last);
        }

        let (inner, positions) = self.inner.decide(inner, history);
        let next = ThrottleState {
            inner,
            calls: calls + 1,
            last: Some(positions.clone()),
        };
        (next, positions)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PriceMatrix;

    //returns the number of days it has been asked about so far
    struct Counter;

    impl DecisionFunction for Counter {
        type State = usize;

        fn initial_state(&self) -> usize {
            0
        }

        fn decide(&self, state: usize, history: &PriceHistory<'_>) -> (usize, Vec<f64>) {
            (state + 1, vec![(state + 1) as f64; history.n_inst()])
        }

        fn name(&self) -> &str {
            "Counter"
        }
    }

    #[test]
    fn test_repeats_last_answer_between_rebalances() {
        let m = PriceMatrix::from_rows(vec![vec![10.0; 8]]).unwrap();
        let throttle = RebalanceThrottle::new(Counter, 3);
        assert_eq!(throttle.name(), "Counter (every 3 days)");

        let mut state = throttle.initial_state();
        let mut seen = Vec::new();
        for day in 0..7 {
            let (next, pos) = throttle.decide(state, &m.history(day));
            state = next;
            seen.push(pos[0]);
        }
        assert_eq!(seen, vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0]);
        assert_eq!(state.inner, 3);
    }

    #[test]
    fn test_interval_one_is_passthrough() {
        let m = PriceMatrix::from_rows(vec![vec![10.0; 4]]).unwrap();
        let throttle = RebalanceThrottle::new(Counter, 0);
        assert_eq!(throttle.interval(), 1);
        assert_eq!(throttle.name(), "Counter");

        let mut state = throttle.initial_state();
        let mut seen = Vec::new();
        for day in 0..4 {
            let (next, pos) = throttle.decide(state, &m.history(day));
            state = next;
            seen.push(pos[0]);
        }
        assert_eq!(seen, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
