use crate::data::PriceHistory;
use crate::strategy::DecisionFunction;

//never holds anything, the zero baseline every other strategy is measured against
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatStrategy;

impl DecisionFunction for FlatStrategy {
    type State = ();

    fn initial_state(&self) -> Self::State {}

    fn decide(&self, state: Self::State, history: &PriceHistory<'_>) -> (Self::State, Vec<f64>) {
        (state, vec![0.0; history.n_inst()])
    }

    fn name(&self) -> &str {
        "Flat"
    }
}
