use algoeval::prelude::*;

fn prices() -> PriceMatrix {
    let rows = (0..5)
        .map(|i| {
            (0..160)
                .map(|d| {
                    let t = d as f64;
                    (30.0 + 12.0 * i as f64) * (1.0 + 0.002 * t) * (1.0 + 0.04 * (t * 0.3 + i as f64).sin())
                })
                .collect()
        })
        .collect();
    PriceMatrix::from_rows(rows).unwrap()
}

#[test]
fn scenario_identical_runs_are_bit_identical() {
    let prices = prices();
    let engine = SimulationEngine::default();
    let strategy = EmaTrendStrategy::default();

    let a = engine.run(&prices, 120, &strategy).unwrap();
    let b = engine.run(&prices, 120, &strategy).unwrap();
    assert_eq!(a.daily_pl, b.daily_pl);
    assert_eq!(a.positions, b.positions);
}

#[test]
fn scenario_same_seed_same_scenario_scores() {
    let prices = prices();
    let engine = SimulationEngine::default();
    let strategy = IndexMomentumStrategy::with_signal(5, 0.001);
    let wf = WalkForward::new(60, 20, 0.0);

    for scenario in [
        Scenario::DecisionNoise { noise_pct: 2.0 },
        Scenario::SettlementNoise { noise_pct: 2.0 },
        Scenario::ReturnNoise { noise_pct: 2.0 },
        Scenario::TimeShuffle,
    ] {
        let first = RobustnessRunner::new(wf, 42)
            .run(&engine, &prices, &strategy, scenario, 3)
            .unwrap();
        let second = RobustnessRunner::new(wf, 42)
            .run(&engine, &prices, &strategy, scenario, 3)
            .unwrap();

        let a: Vec<_> = first.repeats.iter().map(|r| r.score).collect();
        let b: Vec<_> = second.repeats.iter().map(|r| r.score).collect();
        assert_eq!(a, b, "{}", scenario);
        assert_eq!(first.mean_score, second.mean_score);
        assert_eq!(first.n_failed, 0);
    }
}

#[test]
fn scenario_base_matrix_untouched_by_scenarios() {
    let prices = prices();
    let before = prices.clone();
    let runner = RobustnessRunner::new(WalkForward::new(60, 20, 0.0), 7);
    runner
        .run(
            &SimulationEngine::default(),
            &prices,
            &FlatStrategy,
            Scenario::TimeShuffle,
            5,
        )
        .unwrap();
    assert_eq!(prices, before);
}
