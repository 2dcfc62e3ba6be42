pub mod eval_config;

pub use eval_config::{EvalConfiguration, NoiseKind, StrategyConfig, StrategyType};
