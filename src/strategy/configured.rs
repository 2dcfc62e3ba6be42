use crate::data::PriceHistory;
use crate::strategy::{
    DecisionFunction, EmaTrendState, EmaTrendStrategy, FlatStrategy, IndexMomentumStrategy,
};

//one of the built-in strategies, picked at runtime from configuration
#[derive(Debug, Clone)]
pub enum ConfiguredStrategy {
    Flat(FlatStrategy),
    IndexMomentum(IndexMomentumStrategy),
    EmaTrend(EmaTrendStrategy),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfiguredState {
    Stateless,
    EmaTrend(EmaTrendState),
}

impl DecisionFunction for ConfiguredStrategy {
    type State = ConfiguredState;

    fn initial_state(&self) -> Self::State {
        match self {
            ConfiguredStrategy::EmaTrend(s) => ConfiguredState::EmaTrend(s.initial_state()),
            _ => ConfiguredState::Stateless,
        }
    }

    fn decide(&self, state: Self::State, history: &PriceHistory<'_>) -> (Self::State, Vec<f64>) {
        match self {
            ConfiguredStrategy::Flat(s) => {
                let ((), positions) = s.decide((), history);
                (ConfiguredState::Stateless, positions)
            }
            ConfiguredStrategy::IndexMomentum(s) => {
                let ((), positions) = s.decide((), history);
                (ConfiguredState::Stateless, positions)
            }
            ConfiguredStrategy::EmaTrend(s) => {
                //a state from another variant means a fresh run
                let inner = match state {
                    ConfiguredState::EmaTrend(inner) => inner,
                    ConfiguredState::Stateless => s.initial_state(),
                };
                let (inner, positions) = s.decide(inner, history);
                (ConfiguredState::EmaTrend(inner), positions)
            }
        }
    }

    fn name(&self) -> &str {
        match self {
            ConfiguredStrategy::Flat(s) => s.name(),
            ConfiguredStrategy::IndexMomentum(s) => s.name(),
            ConfiguredStrategy::EmaTrend(s) => s.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PriceMatrix;

    #[test]
    fn test_state_follows_variant() {
        let ema = ConfiguredStrategy::EmaTrend(EmaTrendStrategy::default());
        assert!(matches!(ema.initial_state(), ConfiguredState::EmaTrend(_)));
        assert_eq!(ema.name(), "EMA Trend");

        let flat = ConfiguredStrategy::Flat(FlatStrategy);
        assert_eq!(flat.initial_state(), ConfiguredState::Stateless);

        let m = PriceMatrix::from_rows(vec![vec![10.0; 3], vec![20.0; 3]]).unwrap();
        let (state, pos) = ema.decide(ConfiguredState::Stateless, &m.history(2));
        assert_eq!(pos, vec![0.0, 0.0]);
        assert!(matches!(state, ConfiguredState::EmaTrend(_)));
    }
}
