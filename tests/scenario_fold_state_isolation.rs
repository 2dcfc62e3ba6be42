use algoeval::prelude::*;

fn prices() -> PriceMatrix {
    let rows = (0..3)
        .map(|i| {
            (0..240)
                .map(|d| {
                    let t = d as f64;
                    (25.0 + 10.0 * i as f64) * (1.0 + 0.1 * (t * 0.07 + 2.0 * i as f64).sin())
                })
                .collect()
        })
        .collect();
    PriceMatrix::from_rows(rows).unwrap()
}

#[test]
fn scenario_stateful_strategy_gets_fresh_state_per_fold() {
    let prices = prices();
    let engine = SimulationEngine::default();
    //throttle and ema trend both carry state across days
    let strategy = RebalanceThrottle::new(EmaTrendStrategy::default(), 3);
    let wf = WalkForward::new(80, 40, 0.2);

    let report = wf.run(&engine, &prices, &strategy).unwrap();
    for outcome in &report.folds {
        let slice = prices.truncated(outcome.fold.end());
        let alone = engine
            .run(&slice, outcome.fold.test_days, &strategy)
            .unwrap()
            .stats();
        assert_eq!(outcome.stats, Some(alone));
    }
}
