use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("Price matrix is empty")]
    Empty,
    #[error("Ragged price rows: instrument {instrument} has {got} days, expected {expected}")]
    Ragged {
        instrument: usize,
        expected: usize,
        got: usize,
    },
    #[error("Ragged price rows: day {day} has {got} prices, expected {expected}")]
    RaggedDay {
        day: usize,
        expected: usize,
        got: usize,
    },
    #[error("Price matrix shape {n_inst} x {n_days} needs {expected} prices, got {got}")]
    Shape {
        n_inst: usize,
        n_days: usize,
        expected: usize,
        got: usize,
    },
    #[error("Invalid price {price} for instrument {instrument} on day {day}: prices must be finite and positive")]
    InvalidPrice {
        instrument: usize,
        day: usize,
        price: f64,
    },
}

//immutable instruments x days price grid
//stored row-major by instrument so each series is a contiguous slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceMatrix")]
pub struct PriceMatrix {
    n_inst: usize,
    n_days: usize,
    data: Vec<f64>,
}

//serialized form, only turned into a matrix through the same checks as the constructors
#[derive(Deserialize)]
struct RawPriceMatrix {
    n_inst: usize,
    n_days: usize,
    data: Vec<f64>,
}

impl TryFrom<RawPriceMatrix> for PriceMatrix {
    type Error = MatrixError;

    fn try_from(raw: RawPriceMatrix) -> Result<Self, Self::Error> {
        if raw.n_inst == 0 || raw.n_days == 0 {
            return Err(MatrixError::Empty);
        }
        let expected = raw.n_inst.checked_mul(raw.n_days).unwrap_or(usize::MAX);
        if raw.data.len() != expected {
            return Err(MatrixError::Shape {
                n_inst: raw.n_inst,
                n_days: raw.n_days,
                expected,
                got: raw.data.len(),
            });
        }
        Self::from_flat(raw.n_inst, raw.n_days, raw.data)
    }
}

impl PriceMatrix {
    //builds a matrix from one series per instrument, validating every price
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, MatrixError> {
        let n_inst = rows.len();
        let n_days = rows.first().map(|r| r.len()).unwrap_or(0);

        if n_inst == 0 || n_days == 0 {
            return Err(MatrixError::Empty);
        }

        let mut data = Vec::with_capacity(n_inst * n_days);
        for (instrument, row) in rows.into_iter().enumerate() {
            if row.len() != n_days {
                return Err(MatrixError::Ragged {
                    instrument,
                    expected: n_days,
                    got: row.len(),
                });
            }
            data.extend(row);
        }

        Self::from_flat(n_inst, n_days, data)
    }

    //builds a matrix from one row per day (the on-disk orientation), transposing it
    pub fn from_day_rows(days: Vec<Vec<f64>>) -> Result<Self, MatrixError> {
        let n_days = days.len();
        let n_inst = days.first().map(|d| d.len()).unwrap_or(0);

        if n_inst == 0 || n_days == 0 {
            return Err(MatrixError::Empty);
        }

        let mut data = vec![0.0; n_inst * n_days];
        for (day, row) in days.iter().enumerate() {
            if row.len() != n_inst {
                return Err(MatrixError::RaggedDay {
                    day,
                    expected: n_inst,
                    got: row.len(),
                });
            }
            for (instrument, &price) in row.iter().enumerate() {
                data[instrument * n_days + day] = price;
            }
        }

        Self::from_flat(n_inst, n_days, data)
    }

    fn from_flat(n_inst: usize, n_days: usize, data: Vec<f64>) -> Result<Self, MatrixError> {
        for (idx, &price) in data.iter().enumerate() {
            if !price.is_finite() || price <= 0.0 {
                return Err(MatrixError::InvalidPrice {
                    instrument: idx / n_days,
                    day: idx % n_days,
                    price,
                });
            }
        }

        Ok(PriceMatrix {
            n_inst,
            n_days,
            data,
        })
    }

    pub fn n_inst(&self) -> usize {
        self.n_inst
    }

    pub fn n_days(&self) -> usize {
        self.n_days
    }

    pub fn price(&self, instrument: usize, day: usize) -> f64 {
        self.data[instrument * self.n_days + day]
    }

    //full price series of one instrument
    pub fn series(&self, instrument: usize) -> &[f64] {
        let start = instrument * self.n_days;
        &self.data[start..start + self.n_days]
    }

    //prices of every instrument on one day
    pub fn column(&self, day: usize) -> Vec<f64> {
        (0..self.n_inst).map(|i| self.price(i, day)).collect()
    }

    //copy of the first `days` days (expanding-window folds)
    pub fn truncated(&self, days: usize) -> PriceMatrix {
        let days = days.min(self.n_days);
        let mut data = Vec::with_capacity(self.n_inst * days);
        for instrument in 0..self.n_inst {
            data.extend_from_slice(&self.series(instrument)[..days]);
        }
        PriceMatrix {
            n_inst: self.n_inst,
            n_days: days,
            data,
        }
    }

    //builds a new matrix by transforming each series, revalidating the result
    pub fn map_series<F>(&self, mut f: F) -> Result<PriceMatrix, MatrixError>
    where
        F: FnMut(usize, &[f64]) -> Vec<f64>,
    {
        let rows = (0..self.n_inst)
            .map(|i| f(i, self.series(i)))
            .collect::<Vec<_>>();
        PriceMatrix::from_rows(rows)
    }

    //history up to and including `day`
    pub fn history(&self, day: usize) -> PriceHistory<'_> {
        PriceHistory {
            matrix: self,
            days: (day + 1).min(self.n_days),
            today_override: None,
        }
    }
}

//read-only view of the first `days` columns of a matrix, as handed to a decision function
//the last column can be replaced to show the decision function a corrupted "today"
#[derive(Debug, Clone, Copy)]
pub struct PriceHistory<'a> {
    matrix: &'a PriceMatrix,
    days: usize,
    today_override: Option<&'a [f64]>,
}

impl<'a> PriceHistory<'a> {
    pub fn with_today(self, today: &'a [f64]) -> Self {
        PriceHistory {
            today_override: Some(today),
            ..self
        }
    }

    pub fn n_inst(&self) -> usize {
        self.matrix.n_inst()
    }

    pub fn n_days(&self) -> usize {
        self.days
    }

    pub fn price(&self, instrument: usize, day: usize) -> f64 {
        match self.today_override {
            Some(today) if day + 1 == self.days => today[instrument],
            _ => self.matrix.price(instrument, day),
        }
    }

    //prices on the last day of the view
    pub fn today(&self) -> Vec<f64> {
        match self.today_override {
            Some(today) => today.to_vec(),
            None => self.matrix.column(self.days - 1),
        }
    }

    //one instrument's series as seen through the view
    pub fn series(&self, instrument: usize) -> Vec<f64> {
        let mut series = self.matrix.series(instrument)[..self.days].to_vec();
        if let (Some(today), Some(last)) = (self.today_override, series.last_mut()) {
            *last = today[instrument];
        }
        series
    }

    //prices of every instrument on one day of the view
    pub fn column(&self, day: usize) -> Vec<f64> {
        (0..self.n_inst()).map(|i| self.price(i, day)).collect()
    }
}
