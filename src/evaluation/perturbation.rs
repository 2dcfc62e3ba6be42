use crate::data::{MatrixError, PriceMatrix};
use crate::engine::{OverlayTarget, PriceOverlay, SimulationEngine};
use crate::evaluation::walk_forward::{WalkForward, WalkForwardReport};
use crate::evaluation::EvaluationError;
use crate::strategy::DecisionFunction;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

//how an alternate price path is derived from the base matrix
//noise levels are percent standard deviations (2.0 means N(0, 0.02))
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scenario {
    //corrupts only the price the decision function sees for today
    DecisionNoise { noise_pct: f64 },
    //corrupts the price trades settle and positions mark at
    SettlementNoise { noise_pct: f64 },
    //rebuilds the whole path with every daily return scaled by (1 + noise)
    ReturnNoise { noise_pct: f64 },
    //circularly shifts each instrument's series by its own random offset
    TimeShuffle,
}

impl Scenario {
    pub fn noise_pct(&self) -> Option<f64> {
        match *self {
            Scenario::DecisionNoise { noise_pct }
            | Scenario::SettlementNoise { noise_pct }
            | Scenario::ReturnNoise { noise_pct } => Some(noise_pct),
            Scenario::TimeShuffle => None,
        }
    }

    pub fn parse(kind: &str, noise_pct: f64) -> Option<Self> {
        match kind.to_lowercase().as_str() {
            "decision" | "decision_noise" => Some(Scenario::DecisionNoise { noise_pct }),
            "settlement" | "settlement_noise" => Some(Scenario::SettlementNoise { noise_pct }),
            "return" | "returns" | "return_noise" => Some(Scenario::ReturnNoise { noise_pct }),
            "shuffle" | "time_shuffle" => Some(Scenario::TimeShuffle),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), EvaluationError> {
        match self.noise_pct() {
            Some(pct) if !pct.is_finite() || pct < 0.0 => Err(EvaluationError::InvalidNoise(pct)),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::DecisionNoise { noise_pct } => write!(f, "decision noise ±{}%", noise_pct),
            Scenario::SettlementNoise { noise_pct } => {
                write!(f, "settlement noise ±{}%", noise_pct)
            }
            Scenario::ReturnNoise { noise_pct } => write!(f, "return noise ±{}%", noise_pct),
            Scenario::TimeShuffle => write!(f, "time shuffle"),
        }
    }
}

//one repeat of a scenario, score is the walk-forward simple mean
#[derive(Debug, Clone, Serialize)]
pub struct RepeatOutcome {
    pub repeat: usize,
    pub seed: u64,
    pub score: Option<f64>,
    pub folds_failed: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub repeats: Vec<RepeatOutcome>,

    //mean over repeats that produced a score
    pub mean_score: Option<f64>,
    pub n_failed: usize,
}

impl ScenarioReport {
    fn from_repeats(scenario: Scenario, repeats: Vec<RepeatOutcome>) -> Self {
        let scores: Vec<f64> = repeats.iter().filter_map(|r| r.score).collect();
        let mean_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };
        ScenarioReport {
            scenario,
            n_failed: repeats.len() - scores.len(),
            repeats,
            mean_score,
        }
    }
}

//re-runs the walk-forward over perturbed copies of the price matrix
#[derive(Debug, Clone, Copy)]
pub struct RobustnessRunner {
    walk_forward: WalkForward,
    seed: u64,
    parallel: bool,
}

impl RobustnessRunner {
    pub fn new(walk_forward: WalkForward, seed: u64) -> Self {
        RobustnessRunner {
            walk_forward,
            seed,
            parallel: walk_forward.parallel,
        }
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self.walk_forward.parallel = false;
        self
    }

    pub fn walk_forward(&self) -> &WalkForward {
        &self.walk_forward
    }

    //seed of repeat r; fixed per repeat so scheduling never changes the draws
    pub fn repeat_seed(&self, repeat: usize) -> u64 {
        self.seed.wrapping_add(repeat as u64)
    }

    pub fn run<D: DecisionFunction>(
        &self,
        engine: &SimulationEngine,
        prices: &PriceMatrix,
        decision: &D,
        scenario: Scenario,
        repeats: usize,
    ) -> Result<ScenarioReport, EvaluationError> {
        scenario.validate()?;

        //fail fast on windows no repeat could evaluate
        self.walk_forward.checked_folds(prices.n_days())?;

        let per_repeat = |repeat: usize| self.run_repeat(engine, prices, decision, scenario, repeat);
        let outcomes: Vec<RepeatOutcome> = if self.parallel {
            (0..repeats).into_par_iter().map(per_repeat).collect()
        } else {
            (0..repeats).map(per_repeat).collect()
        };

        let report = ScenarioReport::from_repeats(scenario, outcomes);
        info!(
            scenario = %scenario,
            repeats,
            failed = report.n_failed,
            mean_score = report.mean_score,
            "scenario finished"
        );
        Ok(report)
    }

    fn run_repeat<D: DecisionFunction>(
        &self,
        engine: &SimulationEngine,
        prices: &PriceMatrix,
        decision: &D,
        scenario: Scenario,
        repeat: usize,
    ) -> RepeatOutcome {
        let seed = self.repeat_seed(repeat);
        let mut rng = StdRng::seed_from_u64(seed);
        debug!(scenario = %scenario, repeat, seed, "repeat started");

        let result = self.evaluate(engine, prices, decision, scenario, &mut rng);
        let outcome = match result {
            Ok(report) => RepeatOutcome {
                repeat,
                seed,
                score: report.simple_mean,
                folds_failed: report.n_failed(),
                error: match report.simple_mean {
                    Some(_) => None,
                    None => Some("every fold failed".to_string()),
                },
            },
            Err(e) => RepeatOutcome {
                repeat,
                seed,
                score: None,
                folds_failed: 0,
                error: Some(e.to_string()),
            },
        };

        if let Some(error) = &outcome.error {
            warn!(scenario = %scenario, repeat, error = %error, "repeat failed");
        }
        outcome
    }

    fn evaluate<D: DecisionFunction>(
        &self,
        engine: &SimulationEngine,
        prices: &PriceMatrix,
        decision: &D,
        scenario: Scenario,
        rng: &mut StdRng,
    ) -> Result<WalkForwardReport, EvaluationError> {
        let wf = &self.walk_forward;
        match scenario {
            Scenario::DecisionNoise { noise_pct } => {
                let overlay = noise_overlay(prices, OverlayTarget::DecisionView, noise_pct, rng)?;
                wf.run_with_overlay(engine, prices, decision, &overlay)
            }
            Scenario::SettlementNoise { noise_pct } => {
                let overlay = noise_overlay(prices, OverlayTarget::Settlement, noise_pct, rng)?;
                wf.run_with_overlay(engine, prices, decision, &overlay)
            }
            Scenario::ReturnNoise { noise_pct } => {
                let noisy = noisy_returns(prices, noise_pct, rng)?;
                wf.run(engine, &noisy, decision)
            }
            Scenario::TimeShuffle => {
                let shuffled = time_shuffled(prices, rng)?;
                wf.run(engine, &shuffled, decision)
            }
        }
    }
}

fn gaussian(noise_pct: f64) -> Result<Normal<f64>, EvaluationError> {
    Normal::new(0.0, noise_pct / 100.0).map_err(|_| EvaluationError::InvalidNoise(noise_pct))
}

//independent 1 + N(0, noise) factors for every instrument and day
pub fn noise_overlay(
    prices: &PriceMatrix,
    target: OverlayTarget,
    noise_pct: f64,
    rng: &mut StdRng,
) -> Result<PriceOverlay, EvaluationError> {
    let normal = gaussian(noise_pct)?;
    let (n_inst, n_days) = (prices.n_inst(), prices.n_days());
    let factors = (0..n_inst * n_days)
        .map(|_| 1.0 + normal.sample(rng))
        .collect();
    Ok(PriceOverlay::new(target, n_inst, n_days, factors)?)
}

//day 0 is kept; day t becomes p[t-1] * (1 + r_t * (1 + e)) with r_t the true return
//each step is anchored on the true previous price so noise does not compound
pub fn noisy_returns(
    prices: &PriceMatrix,
    noise_pct: f64,
    rng: &mut StdRng,
) -> Result<PriceMatrix, EvaluationError> {
    let normal = gaussian(noise_pct)?;
    let noisy = prices.map_series(|_, series| {
        let mut out = Vec::with_capacity(series.len());
        out.extend(series.first().copied());
        for w in series.windows(2) {
            let ret = w[1] / w[0] - 1.0;
            out.push(w[0] * (1.0 + ret * (1.0 + normal.sample(rng))));
        }
        out
    })?;
    Ok(noisy)
}

//rotates each instrument's series right by an offset drawn uniformly from [0, n_days)
pub fn time_shuffled(prices: &PriceMatrix, rng: &mut StdRng) -> Result<PriceMatrix, MatrixError> {
    let n_days = prices.n_days();
    prices.map_series(|_, series| {
        let mut shifted = series.to_vec();
        shifted.rotate_right(rng.gen_range(0..n_days));
        shifted
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulationError;
    use crate::strategy::{FlatStrategy, IndexMomentumStrategy};

    fn wavy(n_inst: usize, days: usize) -> PriceMatrix {
        let rows = (0..n_inst)
            .map(|i| {
                (0..days)
                    .map(|d| 50.0 + 10.0 * i as f64 + 5.0 * ((d + 3 * i) as f64 * 0.2).sin())
                    .collect()
            })
            .collect();
        PriceMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_shuffle_is_a_rotation_and_leaves_base_untouched() {
        let base = wavy(3, 40);
        let before = base.clone();
        let mut rng = StdRng::seed_from_u64(42);
        let shuffled = time_shuffled(&base, &mut rng).unwrap();
        assert_eq!(base, before);

        for i in 0..3 {
            let s = shuffled.series(i);
            let orig = base.series(i);
            let offset = (0..40).find(|&k| {
                let mut r = orig.to_vec();
                r.rotate_right(k);
                r == s
            });
            assert!(offset.is_some());
        }
    }

    #[test]
    fn test_noise_overlay_is_seeded() {
        let base = wavy(2, 10);
        let a = noise_overlay(&base, OverlayTarget::Settlement, 2.0, &mut StdRng::seed_from_u64(7))
            .unwrap();
        let b = noise_overlay(&base, OverlayTarget::Settlement, 2.0, &mut StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(a, b);
        for d in 0..10 {
            assert!((a.factor(0, d) - 1.0).abs() < 0.2);
        }
    }

    #[test]
    fn test_zero_noise_returns_keep_the_path() {
        let base = wavy(2, 30);
        let noisy = noisy_returns(&base, 0.0, &mut StdRng::seed_from_u64(1)).unwrap();
        for i in 0..2 {
            for (a, b) in base.series(i).iter().zip(noisy.series(i)) {
                assert!((a - b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_negative_noise_rejected() {
        let runner = RobustnessRunner::new(WalkForward::new(10, 5, 0.0), 42);
        let err = runner
            .run(
                &SimulationEngine::default(),
                &wavy(1, 30),
                &FlatStrategy,
                Scenario::DecisionNoise { noise_pct: -1.0 },
                3,
            )
            .unwrap_err();
        assert_eq!(err, EvaluationError::InvalidNoise(-1.0));
    }

    #[test]
    fn test_short_fold_window_rejected_up_front() {
        let runner = RobustnessRunner::new(WalkForward::new(10, 1, 0.0), 42);
        let err = runner
            .run(
                &SimulationEngine::default(),
                &wavy(1, 30),
                &FlatStrategy,
                Scenario::TimeShuffle,
                3,
            )
            .unwrap_err();
        assert_eq!(
            err,
            EvaluationError::Simulation(SimulationError::InvalidWindow {
                test_days: 1,
                n_days: 30
            })
        );
    }

    #[test]
    fn test_repeats_are_deterministic_across_scheduling() {
        let engine = SimulationEngine::default();
        let prices = wavy(4, 120);
        let decision = IndexMomentumStrategy::with_signal(5, 0.001);
        let runner = RobustnessRunner::new(WalkForward::new(40, 20, 0.0), 42);

        for scenario in [
            Scenario::DecisionNoise { noise_pct: 2.0 },
            Scenario::SettlementNoise { noise_pct: 2.0 },
            Scenario::ReturnNoise { noise_pct: 2.0 },
            Scenario::TimeShuffle,
        ] {
            let parallel = runner.run(&engine, &prices, &decision, scenario, 4).unwrap();
            let sequential = runner
                .sequential()
                .run(&engine, &prices, &decision, scenario, 4)
                .unwrap();
            let p: Vec<_> = parallel.repeats.iter().map(|r| r.score).collect();
            let s: Vec<_> = sequential.repeats.iter().map(|r| r.score).collect();
            assert_eq!(p, s);
            assert_eq!(parallel.repeats.len(), 4);
            assert_eq!(parallel.repeats[3].seed, 45);
        }
    }

    #[test]
    fn test_flat_strategy_is_immune_to_noise() {
        let runner = RobustnessRunner::new(WalkForward::new(10, 5, 0.0), 3).sequential();
        let report = runner
            .run(
                &SimulationEngine::default(),
                &wavy(2, 40),
                &FlatStrategy,
                Scenario::SettlementNoise { noise_pct: 5.0 },
                3,
            )
            .unwrap();
        assert_eq!(report.mean_score, Some(0.0));
        assert_eq!(report.n_failed, 0);
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            Scenario::parse("shuffle", 2.0),
            Some(Scenario::TimeShuffle)
        );
        assert_eq!(
            Scenario::parse("settlement", 1.5),
            Some(Scenario::SettlementNoise { noise_pct: 1.5 })
        );
        assert_eq!(Scenario::parse("bogus", 1.0), None);
    }
}
