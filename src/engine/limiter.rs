use crate::engine::error::SimulationError;
use crate::portfolio::PositionVector;

//caps every instrument's position at a fixed dollar notional
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionLimiter {
    pub dollar_cap: f64,
}

impl PositionLimiter {
    pub fn new(dollar_cap: f64) -> Self {
        PositionLimiter { dollar_cap }
    }

    //largest share count allowed at `price`
    pub fn cap_shares(&self, price: f64) -> i64 {
        (self.dollar_cap / price).floor() as i64
    }

    //clips raw positions to +/- floor(cap / price) per instrument
    //`day` is only used to report a bad price
    pub fn limit(
        &self,
        raw: &[i64],
        prices: &[f64],
        day: usize,
    ) -> Result<PositionVector, SimulationError> {
        if !self.dollar_cap.is_finite() || self.dollar_cap <= 0.0 {
            return Err(SimulationError::InvalidConfig {
                detail: format!("dollar cap {} must be finite and positive", self.dollar_cap),
            });
        }
        raw.iter()
            .zip(prices)
            .enumerate()
            .map(|(instrument, (&wanted, &price))| {
                if !price.is_finite() || price <= 0.0 {
                    return Err(SimulationError::InvalidPriceData {
                        instrument,
                        day,
                        price,
                    });
                }
                let cap = self.cap_shares(price);
                Ok(wanted.clamp(-cap, cap))
            })
            .collect::<Result<Vec<i64>, _>>()
            .map(PositionVector::from)
    }
}

impl Default for PositionLimiter {
    fn default() -> Self {
        PositionLimiter::new(10_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clips_to_floor_of_cap_over_price() {
        let limiter = PositionLimiter::default();
        let limited = limiter.limit(&[1000, -1000, 7], &[100.0, 30.0, 100.0], 0).unwrap();
        assert_eq!(limited.as_slice(), &[100, -333, 7]);
    }

    #[test]
    fn test_price_above_cap_forces_flat() {
        let limiter = PositionLimiter::new(10_000.0);
        let limited = limiter.limit(&[5, -5], &[20_000.0, 10_000.01], 3).unwrap();
        assert!(limited.is_flat());
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let limiter = PositionLimiter::default();
        let err = limiter.limit(&[1, 1], &[10.0, 0.0], 4).unwrap_err();
        assert_eq!(
            err,
            SimulationError::InvalidPriceData {
                instrument: 1,
                day: 4,
                price: 0.0
            }
        );
    }

    #[test]
    fn test_rejects_unusable_cap() {
        for cap in [-1.0, 0.0, f64::NAN] {
            let err = PositionLimiter::new(cap).limit(&[1], &[100.0], 0).unwrap_err();
            assert!(matches!(err, SimulationError::InvalidConfig { .. }));
        }
    }
}
