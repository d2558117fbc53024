//! Engine configuration
//!
//! Every field has a default, so a configuration file only needs the values
//! it overrides:
//!
//! ```json
//! {
//!   "return_method": "log",
//!   "confidence": 0.99,
//!   "metrics": { "quantile_method": "lower" },
//!   "monte_carlo": { "distribution": "bootstrap", "paths": 5000, "seed": 42 }
//! }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tempest_data::ReturnMethod;
use tempest_factors::FitterConfig;
use tempest_risk::metrics::TRADING_DAYS_PER_YEAR;
use tempest_risk::{MetricConfig, MonteCarloSpec, RiskMetric, RunnerConfig};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Return convention for price series (default: simple)
    pub return_method: ReturnMethod,

    /// Confidence level for VaR and CVaR (default: 0.95)
    pub confidence: f64,

    /// Periods per year for volatility (default: 252)
    pub annualization: u32,

    /// Metric engine settings
    pub metrics: MetricConfig,

    /// Stress runner settings
    pub runner: RunnerConfig,

    /// Monte Carlo scenario used when none is given explicitly
    pub monte_carlo: MonteCarloSpec,

    /// Factor fitter settings
    pub fitter: FitterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            return_method: ReturnMethod::Simple,
            confidence: 0.95,
            annualization: TRADING_DAYS_PER_YEAR,
            metrics: MetricConfig::default(),
            runner: RunnerConfig::default(),
            monte_carlo: MonteCarloSpec::default(),
            fitter: FitterConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration and validate it.
    ///
    /// # Errors
    /// * [`Error::Json`] for malformed JSON or unknown enum values
    /// * [`Error::Config`] for out-of-range values
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    ///
    /// # Errors
    /// * [`Error::Io`] if the file cannot be read
    /// * Any error from [`from_json_str`](Self::from_json_str)
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// * [`Error::Config`] naming the first offending field
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(Error::Config(format!(
                "confidence must lie strictly between 0 and 1, got {}",
                self.confidence
            )));
        }
        if self.annualization == 0 {
            return Err(Error::Config("annualization must be positive".to_string()));
        }
        if !(self.fitter.singular_tolerance > 0.0 && self.fitter.singular_tolerance.is_finite()) {
            return Err(Error::Config(format!(
                "fitter.singular_tolerance must be positive, got {}",
                self.fitter.singular_tolerance
            )));
        }
        Ok(())
    }

    /// Metrics reported for a single series: VaR, CVaR, volatility and
    /// maximum drawdown.
    pub const fn report_metrics(&self) -> [RiskMetric; 4] {
        [
            RiskMetric::ValueAtRisk {
                confidence: self.confidence,
            },
            RiskMetric::ConditionalVar {
                confidence: self.confidence,
            },
            RiskMetric::Volatility {
                annualization: self.annualization,
            },
            RiskMetric::MaxDrawdown,
        ]
    }
}
