use crate::data::matrix::PriceMatrix;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::path::Path;
use tracing::info;

//loads a header-less price table (one row per day, one column per instrument)
//columns may be separated by commas or by runs of whitespace
//the result is transposed to instruments x days
pub fn load_prices<P: AsRef<Path>>(path: P) -> Result<PriceMatrix> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .context(format!("Failed to open price file: {:?}", path))?;

    let days = parse_price_table(&contents)
        .context(format!("Failed to parse price file: {:?}", path))?;

    let matrix = PriceMatrix::from_day_rows(days)
        .context(format!("Invalid price data in {:?}", path))?;

    info!(
        instruments = matrix.n_inst(),
        days = matrix.n_days(),
        "loaded price matrix"
    );

    Ok(matrix)
}

//parses table text into day rows
pub fn parse_price_table(contents: &str) -> Result<Vec<Vec<f64>>> {
    let comma_separated = contents
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.contains(','))
        .unwrap_or(false);

    if comma_separated {
        parse_comma_separated(contents)
    } else {
        parse_whitespace_separated(contents)
    }
}

fn parse_comma_separated(contents: &str) -> Result<Vec<Vec<f64>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let mut days = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read CSV record at line {}", index + 1))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let row = record
            .iter()
            .map(|field| {
                field.parse::<f64>().context(format!(
                    "Failed to parse price '{}' at line {}",
                    field,
                    index + 1
                ))
            })
            .collect::<Result<Vec<f64>>>()?;
        days.push(row);
    }

    Ok(days)
}

fn parse_whitespace_separated(contents: &str) -> Result<Vec<Vec<f64>>> {
    let mut days = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let row = line
            .split_whitespace()
            .map(|field| {
                field.parse::<f64>().context(format!(
                    "Failed to parse price '{}' at line {}",
                    field,
                    index + 1
                ))
            })
            .collect::<Result<Vec<f64>>>()?;
        days.push(row);
    }

    Ok(days)
}

//writes a daily p/l series as `day,pl,cumulative_pl`
pub fn save_pl_csv<P: AsRef<Path>>(daily_pl: &[f64], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .context(format!("Failed to create P/L file: {:?}", path))?;

    writer.write_record(["day", "pl", "cumulative_pl"])?;

    let mut cumulative = 0.0;
    for (day, pl) in daily_pl.iter().enumerate() {
        cumulative += pl;
        writer.write_record(&[
            (day + 1).to_string(),
            pl.to_string(),
            cumulative.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
