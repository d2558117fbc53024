//! CSV ingestion.
//!
//! Price files are long-format OHLCV tables, one row per ticker and day:
//!
//! ```text
//! date,open,high,low,close,volume,Name
//! 2013-02-08,15.07,15.12,14.63,14.75,8407500,AAL
//! ```
//!
//! Factor files are wide tables with a date column followed by one column per
//! factor, dated `YYYY-MM-DD` or `YYYYMMDD`:
//!
//! ```text
//! date,Mkt-RF,SMB,HML
//! 20130208,0.58,-0.12,0.03
//! ```
//!
//! Malformed rows are rejected with their line number before anything reaches
//! the store.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tempest::data::{DataError, PricePoint, ReturnMethod, ReturnSeries, Ticker, TimeSeriesStore};
use tracing::{debug, info};

/// Error type for ingestion.
#[derive(Debug, thiserror::Error)]
pub(crate) enum IngestError {
    /// File could not be opened.
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    /// Row does not parse against the expected columns.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Row parsed but carries an unusable value.
    #[error("Line {line}: {reason}")]
    Row { line: u64, reason: String },
    /// File layout is unusable.
    #[error("Invalid file layout: {0}")]
    Layout(String),
    /// Store rejected the data.
    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
    #[serde(rename = "Name", alias = "name", alias = "ticker")]
    name: String,
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input)
}

/// Parse long-format OHLCV rows and group them by ticker.
pub(crate) fn read_prices<R: Read>(input: R) -> Result<BTreeMap<Ticker, Vec<PricePoint>>> {
    let mut grouped: BTreeMap<Ticker, Vec<PricePoint>> = BTreeMap::new();

    for row in reader(input).deserialize::<PriceRow>() {
        let row = row?;
        let volume = u64::try_from(row.volume).map_err(|_| DataError::InvalidPrice {
            ticker: row.name.clone(),
            date: row.date,
            reason: format!("negative volume {}", row.volume),
        })?;
        grouped
            .entry(Ticker::new(row.name))
            .or_default()
            .push(PricePoint::new(
                row.date, row.open, row.high, row.low, row.close, volume,
            ));
    }

    Ok(grouped)
}

/// Load every ticker of a price file into `store`, returning the tickers
/// loaded.
pub(crate) fn load_prices(path: &Path, store: &mut TimeSeriesStore) -> Result<Vec<Ticker>> {
    let grouped = read_prices(open(path)?)?;
    let mut loaded = Vec::with_capacity(grouped.len());

    for (ticker, points) in grouped {
        debug!(%ticker, points = points.len(), "loading ticker");
        store.load(ticker.clone(), points)?;
        loaded.push(ticker);
    }

    info!(path = %path.display(), tickers = loaded.len(), "loaded price file");
    Ok(loaded)
}

fn parse_factor_date(field: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(field, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(field, "%Y%m%d"))
        .ok()
}

/// Parse a wide factor table into one simple-return series per factor.
///
/// With `percent`, values are divided by 100.
pub(crate) fn read_factors<R: Read>(
    input: R,
    percent: bool,
) -> Result<BTreeMap<String, ReturnSeries>> {
    let mut csv = reader(input);
    let names: Vec<String> = csv.headers()?.iter().skip(1).map(str::to_string).collect();
    if names.is_empty() {
        return Err(IngestError::Layout(
            "factor file needs a date column and at least one factor column".to_string(),
        ));
    }

    let scale = if percent { 0.01 } else { 1.0 };
    let mut dates = Vec::new();
    let mut columns = vec![Vec::new(); names.len()];

    for record in csv.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());

        let raw_date = record.get(0).unwrap_or_default();
        let date = parse_factor_date(raw_date).ok_or_else(|| IngestError::Row {
            line,
            reason: format!("unrecognized date {raw_date:?}"),
        })?;
        dates.push(date);

        let fields = record.iter().skip(1);
        for ((name, column), field) in names.iter().zip(&mut columns).zip(fields) {
            let value: f64 = field.parse().map_err(|_| IngestError::Row {
                line,
                reason: format!("{name} value {field:?} is not a number"),
            })?;
            column.push(value * scale);
        }
    }

    names
        .into_iter()
        .zip(columns)
        .map(|(name, values)| {
            let series =
                ReturnSeries::new(name.clone(), ReturnMethod::Simple, dates.clone(), values)?;
            Ok((name, series))
        })
        .collect()
}

/// Read a factor file from disk.
pub(crate) fn load_factors(path: &Path, percent: bool) -> Result<BTreeMap<String, ReturnSeries>> {
    let factors = read_factors(open(path)?, percent)?;
    info!(path = %path.display(), factors = factors.len(), "loaded factor file");
    Ok(factors)
}
