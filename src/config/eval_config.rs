use crate::engine::{SimulationConfig, SimulationEngine};
use crate::evaluation::{RobustnessRunner, Scenario, WalkForward};
use crate::strategy::{
    ConfiguredStrategy, EmaTrendParams, EmaTrendStrategy, FlatStrategy, IndexMomentumParams,
    IndexMomentumStrategy, RebalanceThrottle,
};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

//strategy type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    Flat,
    IndexMomentum,
    EmaTrend,
}

impl StrategyType {
    //parse strategy type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flat" | "none" => Some(StrategyType::Flat),
            "momentum" | "index_momentum" => Some(StrategyType::IndexMomentum),
            "ema" | "ema_trend" => Some(StrategyType::EmaTrend),
            _ => None,
        }
    }
}

//which noise scenario the evaluation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    Decision,
    Settlement,
    Return,
}

impl NoiseKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "decision" => Some(NoiseKind::Decision),
            "settlement" => Some(NoiseKind::Settlement),
            "return" | "returns" => Some(NoiseKind::Return),
            _ => None,
        }
    }

    pub fn scenario(&self, noise_pct: f64) -> Scenario {
        match self {
            NoiseKind::Decision => Scenario::DecisionNoise { noise_pct },
            NoiseKind::Settlement => Scenario::SettlementNoise { noise_pct },
            NoiseKind::Return => Scenario::ReturnNoise { noise_pct },
        }
    }
}

//strategy selection plus the parameters of every built-in strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub strategy_type: StrategyType,

    //only ask the strategy every n days, 1 rebalances daily
    pub rebalance_every: usize,

    pub index_momentum: IndexMomentumParams,
    pub ema_trend: EmaTrendParams,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            strategy_type: StrategyType::IndexMomentum,
            rebalance_every: 1,
            index_momentum: IndexMomentumParams::default(),
            ema_trend: EmaTrendParams::default(),
        }
    }
}

impl StrategyConfig {
    pub fn build(&self) -> RebalanceThrottle<ConfiguredStrategy> {
        let strategy = match self.strategy_type {
            StrategyType::Flat => ConfiguredStrategy::Flat(FlatStrategy),
            StrategyType::IndexMomentum => ConfiguredStrategy::IndexMomentum(
                IndexMomentumStrategy::new(self.index_momentum.clone()),
            ),
            StrategyType::EmaTrend => {
                ConfiguredStrategy::EmaTrend(EmaTrendStrategy::new(self.ema_trend.clone()))
            }
        };
        RebalanceThrottle::new(strategy, self.rebalance_every)
    }
}

//complete evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfiguration {
    //data
    pub data_path: PathBuf,

    //simulation
    pub commission_rate: f64,
    pub dollar_cap: f64,
    pub test_days: usize,

    //walk-forward
    pub train_days: usize,
    pub fold_test_days: usize,
    pub decay_lambda: f64,

    //robustness
    pub noise_kinds: Vec<NoiseKind>,
    pub noise_pct: f64,
    pub noise_repeats: usize,
    pub shuffle_repeats: usize,
    pub seed: u64,

    pub parallel: bool,

    //strategy
    pub strategy: StrategyConfig,

    //optional output paths
    pub output_report_json: Option<PathBuf>,
    pub output_pl_csv: Option<PathBuf>,
}

impl Default for EvalConfiguration {
    fn default() -> Self {
        EvalConfiguration {
            data_path: PathBuf::from("prices.txt"),
            commission_rate: 0.0005,
            dollar_cap: 10_000.0,
            test_days: 1500,
            train_days: 250,
            fold_test_days: 50,
            decay_lambda: 0.0,
            noise_kinds: vec![NoiseKind::Decision],
            noise_pct: 2.0,
            noise_repeats: 10,
            shuffle_repeats: 20,
            seed: 42,
            parallel: true,
            strategy: StrategyConfig::default(),
            output_report_json: None,
            output_pl_csv: None,
        }
    }
}

impl EvalConfiguration {
    //load configuration from a JSON file, missing fields take their defaults
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config from {:?}", path))?;
        let config: EvalConfiguration = serde_json::from_str(&contents)
            .context(format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).context(format!("Failed to write config to {:?}", path))?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.commission_rate.is_finite() || self.commission_rate < 0.0 {
            bail!("commission_rate must be finite and non-negative, got {}", self.commission_rate);
        }
        if !self.dollar_cap.is_finite() || self.dollar_cap <= 0.0 {
            bail!("dollar_cap must be positive, got {}", self.dollar_cap);
        }
        if self.test_days < 2 {
            bail!("test_days must be at least 2, got {}", self.test_days);
        }
        if self.train_days == 0 || self.fold_test_days < 2 {
            bail!(
                "walk-forward needs train_days > 0 and fold_test_days >= 2, got {} / {}",
                self.train_days,
                self.fold_test_days
            );
        }
        if !self.decay_lambda.is_finite() {
            bail!("decay_lambda must be finite");
        }
        if !self.noise_pct.is_finite() || self.noise_pct < 0.0 {
            bail!("noise_pct must be finite and non-negative, got {}", self.noise_pct);
        }
        if self.noise_repeats == 0 || self.shuffle_repeats == 0 {
            bail!("noise_repeats and shuffle_repeats must be positive");
        }
        Ok(())
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            commission_rate: self.commission_rate,
            dollar_cap: self.dollar_cap,
        }
    }

    pub fn engine(&self) -> SimulationEngine {
        SimulationEngine::new(self.simulation_config())
    }

    pub fn walk_forward(&self) -> WalkForward {
        WalkForward {
            train_days: self.train_days,
            test_days: self.fold_test_days,
            decay_lambda: self.decay_lambda,
            parallel: self.parallel,
        }
    }

    pub fn robustness_runner(&self) -> RobustnessRunner {
        RobustnessRunner::new(self.walk_forward(), self.seed)
    }

    pub fn noise_scenarios(&self) -> Vec<Scenario> {
        self.noise_kinds
            .iter()
            .map(|k| k.scenario(self.noise_pct))
            .collect()
    }
}
