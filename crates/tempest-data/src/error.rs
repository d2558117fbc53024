//! Error types for data operations.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading or reading price history.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// Two points of the same series share a date
    #[error("Duplicate date {date} in series for {ticker}")]
    DuplicateDate {
        /// Ticker whose series was being loaded
        ticker: String,
        /// The repeated date
        date: NaiveDate,
    },

    /// A price point violates the OHLC invariants
    #[error("Invalid price for {ticker} on {date}: {reason}")]
    InvalidPrice {
        /// Ticker whose series was being loaded
        ticker: String,
        /// Date of the offending point
        date: NaiveDate,
        /// Which invariant failed, with the offending values
        reason: String,
    },

    /// A return series was built from inconsistent columns
    #[error("Malformed return series {name}: {reason}")]
    MalformedReturns {
        /// Name of the series being built
        name: String,
        /// What was inconsistent
        reason: String,
    },

    /// The store holds no series for the ticker
    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),
}
