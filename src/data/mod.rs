pub mod loader;
pub mod matrix;

pub use loader::{load_prices, parse_price_table, save_pl_csv};
pub use matrix::{MatrixError, PriceHistory, PriceMatrix};
