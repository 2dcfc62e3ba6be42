use crate::evaluation::perturbation::ScenarioReport;
use crate::evaluation::walk_forward::WalkForwardReport;
use crate::metrics::Stats;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use prettytable::{Cell, Row, Table};
use serde::Serialize;
use std::path::Path;

//everything one evaluation produced for a strategy
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    pub strategy: String,
    pub n_inst: usize,
    pub n_days: usize,
    pub backtest: Option<Stats>,
    pub walk_forward: Option<WalkForwardReport>,

    //keyed by scenario label, in run order
    pub scenarios: IndexMap<String, ScenarioReport>,
}

impl EvaluationReport {
    pub fn new(strategy: impl Into<String>, n_inst: usize, n_days: usize) -> Self {
        EvaluationReport {
            generated_at: Utc::now(),
            strategy: strategy.into(),
            n_inst,
            n_days,
            backtest: None,
            walk_forward: None,
            scenarios: IndexMap::new(),
        }
    }

    pub fn add_scenario(&mut self, report: ScenarioReport) {
        self.scenarios.insert(report.scenario.to_string(), report);
    }

    //one line per headline number
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(Row::new(vec![Cell::new("Evaluation"), Cell::new("Score")]));

        let show = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:+.2}", v));

        if let Some(stats) = &self.backtest {
            table.add_row(Row::new(vec![
                Cell::new(&format!("Backtest ({} days)", stats.num_days + 1)),
                Cell::new(&show(Some(stats.score))),
            ]));
        }

        if let Some(wf) = &self.walk_forward {
            let folds = format!("{} folds, {} failed", wf.folds.len(), wf.n_failed());
            table.add_row(Row::new(vec![
                Cell::new(&format!("Walk-forward mean ({})", folds)),
                Cell::new(&show(wf.simple_mean)),
            ]));
            table.add_row(Row::new(vec![
                Cell::new(&format!("Decay-weighted mean (λ={})", wf.decay_lambda)),
                Cell::new(&show(wf.decay_weighted_mean)),
            ]));
            table.add_row(Row::new(vec![
                Cell::new("Time-weighted mean"),
                Cell::new(&show(wf.time_weighted_mean)),
            ]));
        }

        for (label, scenario) in &self.scenarios {
            let name = format!(
                "{} ({} repeats, {} failed)",
                label,
                scenario.repeats.len(),
                scenario.n_failed
            );
            table.add_row(Row::new(vec![
                Cell::new(&name),
                Cell::new(&show(scenario.mean_score)),
            ]));
        }

        table
    }

    pub fn pretty_print(&self) {
        println!(
            "Strategy: {} ({} instruments × {} days)",
            self.strategy, self.n_inst, self.n_days
        );
        println!("Generated: {}\n", self.generated_at.to_rfc3339());
        self.summary_table().printstd();
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json).context(format!("Failed to write report to {:?}", path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::perturbation::{RepeatOutcome, Scenario};
    use crate::metrics::summarize;

    fn scenario(s: Scenario, score: Option<f64>) -> ScenarioReport {
        ScenarioReport {
            scenario: s,
            repeats: vec![RepeatOutcome {
                repeat: 0,
                seed: 42,
                score,
                folds_failed: 0,
                error: None,
            }],
            mean_score: score,
            n_failed: 0,
        }
    }

    #[test]
    fn test_scenarios_keep_insertion_order() {
        let mut report = EvaluationReport::new("Flat", 2, 100);
        report.add_scenario(scenario(Scenario::TimeShuffle, Some(1.0)));
        report.add_scenario(scenario(Scenario::DecisionNoise { noise_pct: 2.0 }, Some(2.0)));
        let labels: Vec<_> = report.scenarios.keys().cloned().collect();
        assert_eq!(labels, vec!["time shuffle", "decision noise ±2%"]);
    }

    #[test]
    fn test_json_round_trip_to_disk() {
        let mut report = EvaluationReport::new("Flat", 1, 10);
        report.backtest = Some(summarize(&[1.0, -1.0], 10.0, 0.0));
        report.add_scenario(scenario(Scenario::TimeShuffle, None));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.to_json_file(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["strategy"], "Flat");
        assert_eq!(value["backtest"]["num_days"], 2);
        assert_eq!(value["scenarios"]["time shuffle"]["scenario"]["kind"], "time_shuffle");
        assert!(value["scenarios"]["time shuffle"]["mean_score"].is_null());
        assert_eq!(report.summary_table().len(), 3);
    }
}
