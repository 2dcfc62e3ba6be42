use crate::data::PriceMatrix;
use crate::engine::{PriceOverlay, SimulationEngine, SimulationError};
use crate::evaluation::EvaluationError;
use crate::metrics::Stats;
use crate::strategy::DecisionFunction;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

//one walk-forward slice: train days of history followed by test days that are simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub index: usize,
    pub window_start: usize,
    pub train_days: usize,
    pub test_days: usize,
}

impl Fold {
    //exclusive end of the slice; the fold sees prices[:, 0..end]
    pub fn end(&self) -> usize {
        self.window_start + self.train_days + self.test_days
    }
}

//result of one fold, failed folds keep their error instead of stats
#[derive(Debug, Clone, Serialize)]
pub struct FoldOutcome {
    pub fold: Fold,
    pub stats: Option<Stats>,
    pub error: Option<SimulationError>,
}

impl FoldOutcome {
    pub fn score(&self) -> Option<f64> {
        self.stats.map(|s| s.score)
    }

    pub fn is_ok(&self) -> bool {
        self.stats.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WalkForwardReport {
    pub train_days: usize,
    pub test_days: usize,
    pub decay_lambda: f64,
    pub folds: Vec<FoldOutcome>,

    //means over successful folds, None when every fold failed
    pub simple_mean: Option<f64>,
    pub decay_weighted_mean: Option<f64>,
    pub time_weighted_mean: Option<f64>,
}

impl WalkForwardReport {
    fn from_outcomes(wf: &WalkForward, folds: Vec<FoldOutcome>) -> Self {
        let scored: Vec<(usize, f64)> = folds
            .iter()
            .filter_map(|o| o.score().map(|s| (o.fold.index, s)))
            .collect();

        let lambda = wf.decay_lambda;
        WalkForwardReport {
            train_days: wf.train_days,
            test_days: wf.test_days,
            decay_lambda: lambda,
            simple_mean: weighted_mean(&scored, |_| 1.0),
            decay_weighted_mean: weighted_mean(&scored, decay_weight(&scored, lambda)),
            time_weighted_mean: weighted_mean(&scored, |k| (k + 1) as f64),
            folds,
        }
    }

    pub fn scores(&self) -> Vec<Option<f64>> {
        self.folds.iter().map(FoldOutcome::score).collect()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FoldOutcome> {
        self.folds.iter().filter(|o| !o.is_ok())
    }

    pub fn n_failed(&self) -> usize {
        self.failed().count()
    }

    //prints per-fold scores and the combined means
    pub fn pretty_print_table(&self) {
        use prettytable::{Cell, Row, Table};

        let mut table = Table::new();
        table.add_row(Row::new(vec![
            Cell::new("Fold"),
            Cell::new("Days"),
            Cell::new("Mean P/L"),
            Cell::new("StdDev"),
            Cell::new("Score"),
        ]));

        for outcome in &self.folds {
            let fold = &outcome.fold;
            let days = format!("{}..{}", fold.end() - fold.test_days, fold.end());
            match (&outcome.stats, &outcome.error) {
                (Some(stats), _) => table.add_row(Row::new(vec![
                    Cell::new(&fold.index.to_string()),
                    Cell::new(&days),
                    Cell::new(&format!("{:.2}", stats.mean_pl)),
                    Cell::new(&format!("{:.2}", stats.std_pl)),
                    Cell::new(&format!("{:.2}", stats.score)),
                ])),
                (None, error) => table.add_row(Row::new(vec![
                    Cell::new(&fold.index.to_string()),
                    Cell::new(&days),
                    Cell::new("failed"),
                    Cell::new(""),
                    Cell::new(&error.as_ref().map(|e| e.to_string()).unwrap_or_default()),
                ])),
            };
        }
        table.printstd();

        let show = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v));
        println!("Simple mean score:        {}", show(self.simple_mean));
        println!(
            "Decay-weighted mean (λ={}): {}",
            self.decay_lambda,
            show(self.decay_weighted_mean)
        );
        println!("Time-weighted mean score: {}", show(self.time_weighted_mean));
    }
}

//exp(lambda * k) rescaled by the heaviest fold's weight so no weight overflows
fn decay_weight(scored: &[(usize, f64)], lambda: f64) -> impl Fn(usize) -> f64 {
    let indices = scored.iter().map(|&(k, _)| k);
    let heaviest = if lambda >= 0.0 {
        indices.max()
    } else {
        indices.min()
    }
    .unwrap_or(0);
    move |k| (lambda * (k as f64 - heaviest as f64)).exp()
}

//weights are keyed by fold index so gaps from failed folds don't shift them
fn weighted_mean(scored: &[(usize, f64)], weight: impl Fn(usize) -> f64) -> Option<f64> {
    if scored.is_empty() {
        return None;
    }
    let (num, den) = scored
        .iter()
        .fold((0.0, 0.0), |(num, den), &(k, score)| {
            let w = weight(k);
            (num + w * score, den + w)
        });
    if den > 0.0 {
        Some(num / den)
    } else {
        None
    }
}

//expanding-window walk-forward evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkForward {
    pub train_days: usize,
    pub test_days: usize,

    //weight of fold k is exp(decay_lambda * k); positive values favour recent folds
    pub decay_lambda: f64,

    pub parallel: bool,
}

impl Default for WalkForward {
    fn default() -> Self {
        WalkForward {
            train_days: 250,
            test_days: 50,
            decay_lambda: 0.0,
            parallel: true,
        }
    }
}

impl WalkForward {
    pub fn new(train_days: usize, test_days: usize, decay_lambda: f64) -> Self {
        WalkForward {
            train_days,
            test_days,
            decay_lambda,
            parallel: true,
        }
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    //folds in increasing window_start order, start advancing by test_days
    pub fn folds(&self, n_days: usize) -> Vec<Fold> {
        if self.test_days == 0 {
            return Vec::new();
        }
        (0..)
            .map(|k| k * self.test_days)
            .take_while(|start| start + self.train_days + self.test_days <= n_days)
            .enumerate()
            .map(|(index, window_start)| Fold {
                index,
                window_start,
                train_days: self.train_days,
                test_days: self.test_days,
            })
            .collect()
    }

    //folds over n_days, or the reason no fold could be simulated
    pub fn checked_folds(&self, n_days: usize) -> Result<Vec<Fold>, EvaluationError> {
        if self.test_days < 2 {
            return Err(SimulationError::InvalidWindow {
                test_days: self.test_days,
                n_days,
            }
            .into());
        }
        let folds = self.folds(n_days);
        if folds.is_empty() {
            return Err(EvaluationError::NoFolds {
                n_days,
                train_days: self.train_days,
                test_days: self.test_days,
            });
        }
        Ok(folds)
    }

    pub fn run<D: DecisionFunction>(
        &self,
        engine: &SimulationEngine,
        prices: &PriceMatrix,
        decision: &D,
    ) -> Result<WalkForwardReport, EvaluationError> {
        self.evaluate(engine, prices, decision, None)
    }

    //walk-forward where every fold's simulated days go through `overlay`
    //the overlay is indexed by absolute day so it must cover the full matrix
    pub fn run_with_overlay<D: DecisionFunction>(
        &self,
        engine: &SimulationEngine,
        prices: &PriceMatrix,
        decision: &D,
        overlay: &PriceOverlay,
    ) -> Result<WalkForwardReport, EvaluationError> {
        self.evaluate(engine, prices, decision, Some(overlay))
    }

    fn evaluate<D: DecisionFunction>(
        &self,
        engine: &SimulationEngine,
        prices: &PriceMatrix,
        decision: &D,
        overlay: Option<&PriceOverlay>,
    ) -> Result<WalkForwardReport, EvaluationError> {
        let folds = self.checked_folds(prices.n_days())?;
        let per_fold = |fold: &Fold| run_fold(engine, prices, decision, overlay, *fold);
        let outcomes: Vec<FoldOutcome> = if self.parallel {
            folds.par_iter().map(per_fold).collect()
        } else {
            folds.iter().map(per_fold).collect()
        };

        let report = WalkForwardReport::from_outcomes(self, outcomes);
        info!(
            strategy = decision.name(),
            folds = report.folds.len(),
            failed = report.n_failed(),
            simple_mean = report.simple_mean,
            "walk-forward finished"
        );
        Ok(report)
    }
}

fn run_fold<D: DecisionFunction>(
    engine: &SimulationEngine,
    prices: &PriceMatrix,
    decision: &D,
    overlay: Option<&PriceOverlay>,
    fold: Fold,
) -> FoldOutcome {
    debug!(fold = fold.index, end = fold.end(), "fold started");

    let slice = prices.truncated(fold.end());
    let result = match overlay {
        Some(o) => engine.run_with_overlay(&slice, fold.test_days, decision, o),
        None => engine.run(&slice, fold.test_days, decision),
    };

    match result {
        Ok(result) => {
            let stats = result.stats();
            debug!(fold = fold.index, score = stats.score, "fold finished");
            FoldOutcome {
                fold,
                stats: Some(stats),
                error: None,
            }
        }
        Err(e) => {
            warn!(fold = fold.index, error = %e, "fold failed");
            FoldOutcome {
                fold,
                stats: None,
                error: Some(e),
            }
        }
    }
}
