use algoeval::prelude::*;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "algoeval")]
#[command(about = "Evaluates daily position strategies: backtest, walk-forward and robustness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

//options shared by every evaluation command, each overrides the config file
#[derive(Args)]
struct CommonArgs {
    //json configuration file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    //price table: one row per day, one column per instrument
    #[arg(long)]
    data: Option<PathBuf>,

    //strategy type (flat, momentum, ema)
    #[arg(long)]
    strategy: Option<String>,

    //only rebalance every n days
    #[arg(long)]
    rebalance_every: Option<usize>,

    //commission as a fraction of traded notional
    #[arg(long)]
    commission: Option<f64>,

    //per-instrument dollar position cap
    #[arg(long)]
    dollar_cap: Option<f64>,

    //random seed for perturbations
    #[arg(long)]
    seed: Option<u64>,

    //run folds and repeats on one thread
    #[arg(long)]
    sequential: bool,
}

#[derive(Args)]
struct WalkForwardArgs {
    //training days before the first test window
    #[arg(long)]
    train_days: Option<usize>,

    //days simulated per fold
    #[arg(long)]
    fold_test_days: Option<usize>,

    //fold k gets weight exp(lambda * k)
    #[arg(long)]
    decay_lambda: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    //simulate the last test_days days once
    Backtest {
        #[command(flatten)]
        common: CommonArgs,

        //number of days to simulate
        #[arg(long)]
        test_days: Option<usize>,

        //output path for the daily p/l csv
        #[arg(long)]
        output_pl_csv: Option<PathBuf>,
    },

    //expanding-window walk-forward evaluation
    WalkForward {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        walk_forward: WalkForwardArgs,
    },

    //walk-forward over perturbed price paths
    Robustness {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        walk_forward: WalkForwardArgs,

        //scenario (decision, settlement, return, shuffle)
        #[arg(long, default_value = "decision")]
        scenario: String,

        //noise standard deviation in percent
        #[arg(long)]
        noise_pct: Option<f64>,

        //number of repeats (defaults to the configured noise or shuffle repeats)
        #[arg(long)]
        repeats: Option<usize>,
    },

    //backtest, walk-forward, noise and shuffle scenarios in one report
    Evaluate {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        walk_forward: WalkForwardArgs,

        //output path for the json report
        #[arg(long)]
        output_json: Option<PathBuf>,
    },

    //grid search of the momentum lookback and threshold
    Sweep {
        #[command(flatten)]
        common: CommonArgs,

        //comma separated lookbacks
        #[arg(long, value_delimiter = ',', default_value = "5,10,20,40")]
        lookbacks: Vec<usize>,

        //comma separated thresholds
        #[arg(long, value_delimiter = ',', default_value = "0,0.001,0.002,0.005")]
        thresholds: Vec<f64>,

        //number of days to simulate per cell
        #[arg(long)]
        test_days: Option<usize>,
    },

    //write the default configuration to a json file
    InitConfig {
        #[arg(long, default_value = "algoeval.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            common,
            test_days,
            output_pl_csv,
        } => {
            let config = load_config(&common, None, |config| {
                if let Some(days) = test_days {
                    config.test_days = days;
                }
                if output_pl_csv.is_some() {
                    config.output_pl_csv = output_pl_csv;
                }
            })?;
            run_backtest(&config)?;
        }
        Commands::WalkForward {
            common,
            walk_forward,
        } => {
            let config = load_config(&common, Some(&walk_forward), |_| {})?;
            run_walk_forward(&config)?;
        }
        Commands::Robustness {
            common,
            walk_forward,
            scenario,
            noise_pct,
            repeats,
        } => {
            let shuffle = Scenario::parse(&scenario, 0.0) == Some(Scenario::TimeShuffle);
            let config = load_config(&common, Some(&walk_forward), |config| {
                if let Some(pct) = noise_pct {
                    config.noise_pct = pct;
                }
                match (repeats, shuffle) {
                    (Some(n), true) => config.shuffle_repeats = n,
                    (Some(n), false) => config.noise_repeats = n,
                    (None, _) => {}
                }
            })?;
            let scenario = Scenario::parse(&scenario, config.noise_pct)
                .ok_or_else(|| anyhow::anyhow!("Unknown scenario: {}", scenario))?;
            run_robustness(&config, scenario)?;
        }
        Commands::Evaluate {
            common,
            walk_forward,
            output_json,
        } => {
            let config = load_config(&common, Some(&walk_forward), |config| {
                if output_json.is_some() {
                    config.output_report_json = output_json;
                }
            })?;
            run_evaluate(&config)?;
        }
        Commands::Sweep {
            common,
            lookbacks,
            thresholds,
            test_days,
        } => {
            let config = load_config(&common, None, |config| {
                if let Some(days) = test_days {
                    config.test_days = days;
                }
            })?;
            let sweep = ParameterSweep {
                lookbacks,
                thresholds,
                test_days: config.test_days,
                parallel: config.parallel,
            };
            run_sweep(&config, &sweep)?;
        }
        Commands::InitConfig { output } => {
            EvalConfiguration::default().to_json_file(&output)?;
            println!("Default configuration written to {:?}", output);
        }
    }

    Ok(())
}

//file (or defaults), then shared flags, walk-forward flags and command flags; validated last
fn load_config(
    common: &CommonArgs,
    walk_forward: Option<&WalkForwardArgs>,
    command_overrides: impl FnOnce(&mut EvalConfiguration),
) -> Result<EvalConfiguration> {
    let mut config = match &common.config {
        Some(path) => EvalConfiguration::from_json_file(path)?,
        None => EvalConfiguration::default(),
    };

    if let Some(data) = &common.data {
        config.data_path = data.clone();
    }
    if let Some(name) = &common.strategy {
        config.strategy.strategy_type = StrategyType::parse(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown strategy: {}", name))?;
    }
    if let Some(every) = common.rebalance_every {
        config.strategy.rebalance_every = every;
    }
    if let Some(rate) = common.commission {
        config.commission_rate = rate;
    }
    if let Some(cap) = common.dollar_cap {
        config.dollar_cap = cap;
    }
    if let Some(seed) = common.seed {
        config.seed = seed;
    }
    if common.sequential {
        config.parallel = false;
    }
    if let Some(args) = walk_forward {
        apply_walk_forward(&mut config, args);
    }
    command_overrides(&mut config);

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn apply_walk_forward(config: &mut EvalConfiguration, args: &WalkForwardArgs) {
    if let Some(days) = args.train_days {
        config.train_days = days;
    }
    if let Some(days) = args.fold_test_days {
        config.fold_test_days = days;
    }
    if let Some(lambda) = args.decay_lambda {
        config.decay_lambda = lambda;
    }
}

fn load_data(config: &EvalConfiguration) -> Result<PriceMatrix> {
    println!("Loading data from {:?}...", config.data_path);
    let prices = load_prices(&config.data_path)
        .context(format!("Failed to load data from {:?}", config.data_path))?;
    println!(
        "Loaded {} instruments × {} days\n",
        prices.n_inst(),
        prices.n_days()
    );
    Ok(prices)
}

fn print_header(title: &str) {
    println!("{}", title);
    println!("{}\n", "=".repeat(title.chars().count()));
}

fn run_backtest(config: &EvalConfiguration) -> Result<()> {
    let prices = load_data(config)?;
    let strategy = config.strategy.build();
    println!("Strategy: {}", strategy.name());
    println!(
        "Commission: {:.4}% of traded notional, cap ${:.0} per instrument\n",
        config.commission_rate * 100.0,
        config.dollar_cap
    );

    let result = config
        .engine()
        .run(&prices, config.test_days, &strategy)
        .context("Backtest failed")?;

    print_header("Backtest Results");
    result.stats().pretty_print_table();
    println!("Commission paid: ${:.2}", result.commission_paid);

    if let Some(path) = &config.output_pl_csv {
        save_pl_csv(&result.daily_pl, path)?;
        println!("\nDaily P/L saved to {:?}", path);
    }

    Ok(())
}

fn run_walk_forward(config: &EvalConfiguration) -> Result<()> {
    let prices = load_data(config)?;
    let strategy = config.strategy.build();
    println!(
        "Strategy: {} (train {} / test {} days)\n",
        strategy.name(),
        config.train_days,
        config.fold_test_days
    );

    let report = config
        .walk_forward()
        .run(&config.engine(), &prices, &strategy)?;

    print_header("Walk-forward Results");
    report.pretty_print_table();
    Ok(())
}

fn run_robustness(config: &EvalConfiguration, scenario: Scenario) -> Result<()> {
    let prices = load_data(config)?;
    let strategy = config.strategy.build();
    let repeats = match scenario {
        Scenario::TimeShuffle => config.shuffle_repeats,
        _ => config.noise_repeats,
    };
    println!(
        "Strategy: {}, scenario: {} ({} repeats, seed {})\n",
        strategy.name(),
        scenario,
        repeats,
        config.seed
    );

    let report = config.robustness_runner().run(
        &config.engine(),
        &prices,
        &strategy,
        scenario,
        repeats,
    )?;

    print_header("Robustness Results");
    for repeat in &report.repeats {
        match (repeat.score, &repeat.error) {
            (Some(score), _) => println!(
                "Repeat {:>3} (seed {}): {:+.2}",
                repeat.repeat, repeat.seed, score
            ),
            (None, error) => println!(
                "Repeat {:>3} (seed {}): failed ({})",
                repeat.repeat,
                repeat.seed,
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    match report.mean_score {
        Some(mean) => println!("\nMean score: {:+.2}", mean),
        None => println!("\nMean score: n/a (every repeat failed)"),
    }
    Ok(())
}

fn run_evaluate(config: &EvalConfiguration) -> Result<()> {
    let prices = load_data(config)?;
    let strategy = config.strategy.build();
    let engine = config.engine();

    let mut report = EvaluationReport::new(strategy.name(), prices.n_inst(), prices.n_days());

    //a window longer than the data is reported, not fatal
    match engine.run(&prices, config.test_days, &strategy) {
        Ok(result) => report.backtest = Some(result.stats()),
        Err(e) => println!("Backtest skipped: {}", e),
    }

    report.walk_forward = Some(config.walk_forward().run(&engine, &prices, &strategy)?);

    let runner = config.robustness_runner();
    for scenario in config.noise_scenarios() {
        let scenario_report =
            runner.run(&engine, &prices, &strategy, scenario, config.noise_repeats)?;
        report.add_scenario(scenario_report);
    }
    let shuffle = runner.run(
        &engine,
        &prices,
        &strategy,
        Scenario::TimeShuffle,
        config.shuffle_repeats,
    )?;
    report.add_scenario(shuffle);

    print_header("Evaluation Results");
    report.pretty_print();

    if let Some(path) = &config.output_report_json {
        report.to_json_file(path)?;
        println!("\nReport saved to {:?}", path);
    }

    Ok(())
}

fn run_sweep(config: &EvalConfiguration, sweep: &ParameterSweep) -> Result<()> {
    let prices = load_data(config)?;
    println!(
        "Sweeping index momentum: {} lookbacks × {} thresholds over {} days\n",
        sweep.lookbacks.len(),
        sweep.thresholds.len(),
        sweep.test_days
    );

    let report = sweep.run(&config.engine(), &prices)?;

    print_header("Sweep Results");
    report.pretty_print_table();
    Ok(())
}
