//running sum of a p/l series
pub fn cumulative_pl(daily_pl: &[f64]) -> Vec<f64> {
    daily_pl
        .iter()
        .scan(0.0, |total, pl| {
            *total += pl;
            Some(*total)
        })
        .collect()
}

//cumulative p/l minus its running peak, one non-positive value per day
//the running peak starts at the first cumulative value
pub fn drawdown_curve(daily_pl: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    cumulative_pl(daily_pl)
        .into_iter()
        .map(|equity| {
            peak = peak.max(equity);
            equity - peak
        })
        .collect()
}

//deepest drawdown (<= 0), 0 for an empty series
pub fn max_drawdown(daily_pl: &[f64]) -> f64 {
    drawdown_curve(daily_pl).into_iter().fold(0.0, f64::min)
}

//percentile with linear interpolation between order statistics
//rank = p / 100 * (n - 1); None for an empty series
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * weight)
}
