use crate::metrics::timeseries::{max_drawdown, percentile};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

//trading days per year used to annualize the daily sharpe ratio
pub const TRADING_DAYS_PER_YEAR: f64 = 249.0;

//risk aversion applied to daily p/l volatility in the score
pub const RISK_AVERSION: f64 = 0.1;

//summary statistics of a daily p/l series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub num_days: usize,
    pub mean_pl: f64,
    pub std_pl: f64,
    pub sharpe_ratio: f64,
    pub traded_volume: f64,
    pub final_value: f64,
    pub return_on_volume: f64,
    pub score: f64,
    pub max_drawdown: f64,
    pub tail_risk_5pct: f64,
}

//reduces a daily p/l series to the evaluation statistics
//an empty series summarizes to zeros
pub fn summarize(daily_pl: &[f64], traded_volume: f64, final_value: f64) -> Stats {
    let return_on_volume = if traded_volume > 0.0 {
        final_value / traded_volume
    } else {
        0.0
    };

    if daily_pl.is_empty() {
        return Stats {
            num_days: 0,
            mean_pl: 0.0,
            std_pl: 0.0,
            sharpe_ratio: 0.0,
            traded_volume,
            final_value,
            return_on_volume,
            score: 0.0,
            max_drawdown: 0.0,
            tail_risk_5pct: 0.0,
        };
    }

    let mean = daily_pl.mean();
    //population std (denominator n)
    let sigma = daily_pl.population_std_dev();

    let sharpe = if sigma > 0.0 {
        TRADING_DAYS_PER_YEAR.sqrt() * mean / sigma
    } else {
        0.0
    };

    Stats {
        num_days: daily_pl.len(),
        mean_pl: mean,
        std_pl: sigma,
        sharpe_ratio: sharpe,
        traded_volume,
        final_value,
        return_on_volume,
        score: score(mean, sigma),
        max_drawdown: max_drawdown(daily_pl),
        tail_risk_5pct: percentile(daily_pl, 5.0).unwrap_or(0.0),
    }
}

//mean p/l penalized by its volatility
pub fn score(mean: f64, sigma: f64) -> f64 {
    mean - RISK_AVERSION * sigma
}

impl Stats {
    //prints stats in a formatted table
    pub fn pretty_print_table(&self) {
        self.to_table().printstd();
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();

        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));

        let rows = [
            ("Days", format!("{}", self.num_days)),
            ("Mean P/L", format!("{:.1}", self.mean_pl)),
            ("Return on Volume", format!("{:.5}", self.return_on_volume)),
            ("StdDev P/L", format!("{:.2}", self.std_pl)),
            ("Annualized Sharpe", format!("{:.2}", self.sharpe_ratio)),
            ("Traded Volume", format!("${:.0}", self.traded_volume)),
            ("Final Value", format!("${:.2}", self.final_value)),
            ("Max Drawdown", format!("${:.2}", self.max_drawdown)),
            ("5% Tail P/L", format!("${:.2}", self.tail_risk_5pct)),
            ("Score", format!("{:.2}", self.score)),
        ];

        for (name, value) in rows {
            table.add_row(Row::new(vec![Cell::new(name), Cell::new(&value)]));
        }

        table
    }
}
