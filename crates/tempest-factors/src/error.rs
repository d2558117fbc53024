//! Factor fitting errors

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while fitting a factor model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactorError {
    /// A factor series does not carry the asset's dates
    #[error("Factor series {series} is not aligned with the asset series")]
    DateMisalignment {
        /// Offending factor
        series: String,
    },

    /// Fewer observations than regression coefficients
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Intercept plus one per factor
        required: usize,
        /// Observations supplied
        actual: usize,
    },

    /// Factor map is empty
    #[error("No factors supplied")]
    NoFactors,

    /// Design matrix is rank deficient
    #[error("Singular design matrix: factors are collinear or constant")]
    SingularDesign,

    /// A return is NaN or infinite
    #[error("Non-finite value in {series} on {date}")]
    NonFiniteReturn {
        /// Series being fitted
        series: String,
        /// Date of the offending value
        date: NaiveDate,
    },
}

/// Result type for factor fitting
pub type Result<T> = std::result::Result<T, FactorError>;
