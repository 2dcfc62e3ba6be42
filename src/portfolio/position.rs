use serde::{Deserialize, Serialize};
use std::ops::Index;

//signed integer share counts, one per instrument (negative = short)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionVector(Vec<i64>);

impl PositionVector {
    //creates a flat position for `n_inst` instruments
    pub fn flat(n_inst: usize) -> Self {
        PositionVector(vec![0; n_inst])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    //returns true if every instrument is flat
    pub fn is_flat(&self) -> bool {
        self.0.iter().all(|&q| q == 0)
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &i64> {
        self.0.iter()
    }

    //shares to trade to move from `self` to `target`
    pub fn delta_to(&self, target: &PositionVector) -> PositionVector {
        PositionVector(
            target
                .0
                .iter()
                .zip(self.0.iter())
                .map(|(new, old)| new - old)
                .collect(),
        )
    }

    //sum of position * price (signed market value)
    pub fn dot(&self, prices: &[f64]) -> f64 {
        self.0
            .iter()
            .zip(prices)
            .map(|(&q, &p)| q as f64 * p)
            .sum()
    }

    //sum of |position| * price (gross dollar exposure, or traded notional for a delta)
    pub fn gross_notional(&self, prices: &[f64]) -> f64 {
        self.0
            .iter()
            .zip(prices)
            .map(|(&q, &p)| q.unsigned_abs() as f64 * p)
            .sum()
    }
}

impl From<Vec<i64>> for PositionVector {
    fn from(shares: Vec<i64>) -> Self {
        PositionVector(shares)
    }
}

impl Index<usize> for PositionVector {
    type Output = i64;

    fn index(&self, instrument: usize) -> &i64 {
        &self.0[instrument]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_and_notional() {
        let held = PositionVector::from(vec![10, -5]);
        let target = PositionVector::from(vec![4, 5]);
        let delta = held.delta_to(&target);
        assert_eq!(delta.as_slice(), &[-6, 10]);

        let prices = [100.0, 50.0];
        assert_eq!(delta.dot(&prices), -600.0 + 500.0);
        assert_eq!(delta.gross_notional(&prices), 600.0 + 500.0);
    }

    #[test]
    fn test_flat() {
        let p = PositionVector::flat(3);
        assert!(p.is_flat());
        assert_eq!(p.len(), 3);
        assert!(!PositionVector::from(vec![0, 1]).is_flat());
    }
}
