//! Unified error type

use tempest_data::DataError;
use tempest_factors::FactorError;
use tempest_risk::RiskError;
use thiserror::Error;

/// Errors surfaced by the [`Engine`](crate::Engine) pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Storage or series validation error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Return, portfolio, metric or stress error
    #[error("Risk error: {0}")]
    Risk(#[from] RiskError),

    /// Factor fitting error
    #[error("Factor error: {0}")]
    Factor(#[from] FactorError),

    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is not valid JSON for [`EngineConfig`](crate::EngineConfig)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for the engine pipeline
pub type Result<T> = std::result::Result<T, Error>;
