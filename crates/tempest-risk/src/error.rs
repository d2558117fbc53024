//! Risk computation errors

use chrono::NaiveDate;
use tempest_data::DataError;
use thiserror::Error;

/// Errors raised by return, portfolio, metric and stress computations.
///
/// Every variant is a local validation failure; nothing is retried and no
/// input is silently coerced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    /// Too few observations for the computation
    #[error("Insufficient data in {series}: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Series being processed
        series: String,
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Series that must share dates do not
    #[error("Series {series} is not aligned with {reference}")]
    DateMisalignment {
        /// Offending series
        series: String,
        /// Series it was compared against
        reference: String,
    },

    /// Weights map is empty
    #[error("Portfolio has no weights")]
    EmptyPortfolio,

    /// All weights are zero
    #[error("Portfolio gross exposure is zero")]
    ZeroGrossExposure,

    /// A weighted ticker has no return series
    #[error("No return series for weighted ticker {0}")]
    MissingSeries(String),

    /// Aggregated series mix simple and log returns
    #[error("Series {series} uses a different return method than {reference}")]
    MixedReturnMethods {
        /// Offending series
        series: String,
        /// Series it was compared against
        reference: String,
    },

    /// Confidence level outside the open interval (0, 1)
    #[error("Invalid confidence level {0}: must lie strictly between 0 and 1")]
    InvalidConfidence(f64),

    /// Historical window selects no observations
    #[error("No observations of {series} between {start} and {end}")]
    EmptyWindow {
        /// Baseline series
        series: String,
        /// Window start
        start: NaiveDate,
        /// Window end
        end: NaiveDate,
    },

    /// A return is NaN or infinite
    #[error("Non-finite return in {series} on {date}")]
    NonFiniteReturn {
        /// Series being processed
        series: String,
        /// Date of the offending return
        date: NaiveDate,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Underlying data error
    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

/// Result type for risk computations
pub type Result<T> = std::result::Result<T, RiskError>;
