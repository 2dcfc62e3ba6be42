use crate::data::PriceMatrix;
use crate::engine::{SimulationEngine, SimulationError};
use crate::evaluation::EvaluationError;
use crate::strategy::IndexMomentumStrategy;
use prettytable::{Cell, Row, Table};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

//one grid point and its single-window score
#[derive(Debug, Clone, Serialize)]
pub struct SweepCell {
    pub lookback: usize,
    pub threshold: f64,
    pub score: Option<f64>,
    pub error: Option<SimulationError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub lookbacks: Vec<usize>,
    pub thresholds: Vec<f64>,
    pub test_days: usize,

    //row-major by lookback
    pub cells: Vec<SweepCell>,
}

impl SweepReport {
    pub fn cell(&self, lookback_idx: usize, threshold_idx: usize) -> &SweepCell {
        &self.cells[lookback_idx * self.thresholds.len() + threshold_idx]
    }

    //highest scoring cell, ties go to the first in grid order
    pub fn best(&self) -> Option<&SweepCell> {
        self.cells
            .iter()
            .filter(|c| c.score.is_some())
            .fold(None, |best: Option<&SweepCell>, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(c),
            })
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();

        let mut header = vec![Cell::new("Lookback \\ Threshold")];
        header.extend(self.thresholds.iter().map(|t| Cell::new(&format!("{:.4}", t))));
        table.add_row(Row::new(header));

        for (li, lookback) in self.lookbacks.iter().enumerate() {
            let mut row = vec![Cell::new(&lookback.to_string())];
            for ti in 0..self.thresholds.len() {
                let text = match self.cell(li, ti).score {
                    Some(score) => format!("{:.2}", score),
                    None => "failed".to_string(),
                };
                row.push(Cell::new(&text));
            }
            table.add_row(Row::new(row));
        }

        table
    }

    pub fn pretty_print_table(&self) {
        self.to_table().printstd();
        if let Some(best) = self.best() {
            println!(
                "Best: lookback={} threshold={} score={:.2}",
                best.lookback,
                best.threshold,
                best.score.unwrap_or_default()
            );
        }
    }
}

//grid search over the index momentum signal window and trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSweep {
    pub lookbacks: Vec<usize>,
    pub thresholds: Vec<f64>,
    pub test_days: usize,
    pub parallel: bool,
}

impl Default for ParameterSweep {
    fn default() -> Self {
        ParameterSweep {
            lookbacks: vec![5, 10, 20, 40],
            thresholds: vec![0.0, 0.001, 0.002, 0.005],
            test_days: 1500,
            parallel: true,
        }
    }
}

impl ParameterSweep {
    fn validate(&self) -> Result<(), EvaluationError> {
        if self.lookbacks.is_empty() || self.thresholds.is_empty() {
            return Err(EvaluationError::InvalidSweep(
                "lookbacks and thresholds must not be empty".to_string(),
            ));
        }
        if self.lookbacks.contains(&0) {
            return Err(EvaluationError::InvalidSweep(
                "lookbacks must be positive".to_string(),
            ));
        }
        if let Some(t) = self.thresholds.iter().find(|t| !t.is_finite() || **t < 0.0) {
            return Err(EvaluationError::InvalidSweep(format!(
                "threshold {} must be finite and non-negative",
                t
            )));
        }
        Ok(())
    }

    pub fn run(
        &self,
        engine: &SimulationEngine,
        prices: &PriceMatrix,
    ) -> Result<SweepReport, EvaluationError> {
        self.validate()?;
        if self.test_days < 2 || self.test_days > prices.n_days() {
            return Err(SimulationError::InvalidWindow {
                test_days: self.test_days,
                n_days: prices.n_days(),
            }
            .into());
        }

        let grid: Vec<(usize, f64)> = self
            .lookbacks
            .iter()
            .flat_map(|&l| self.thresholds.iter().map(move |&t| (l, t)))
            .collect();

        let score_cell = |&(lookback, threshold): &(usize, f64)| {
            let decision = IndexMomentumStrategy::with_signal(lookback, threshold);
            match engine.run(prices, self.test_days, &decision) {
                Ok(result) => SweepCell {
                    lookback,
                    threshold,
                    score: Some(result.stats().score),
                    error: None,
                },
                Err(e) => {
                    warn!(lookback, threshold, error = %e, "sweep cell failed");
                    SweepCell {
                        lookback,
                        threshold,
                        score: None,
                        error: Some(e),
                    }
                }
            }
        };

        let cells: Vec<SweepCell> = if self.parallel {
            grid.par_iter().map(score_cell).collect()
        } else {
            grid.iter().map(score_cell).collect()
        };

        let report = SweepReport {
            lookbacks: self.lookbacks.clone(),
            thresholds: self.thresholds.clone(),
            test_days: self.test_days,
            cells,
        };
        if let Some(best) = report.best() {
            info!(
                lookback = best.lookback,
                threshold = best.threshold,
                score = best.score,
                "sweep finished"
            );
        }
        Ok(report)
    }
}
