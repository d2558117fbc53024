//! Risk metrics over a return series
//!
//! - Historical VaR: the `(1 - c)` quantile of the empirical return
//!   distribution (lower tail), interpolated between order statistics.
//! - CVaR (expected shortfall): mean of the returns at or below VaR.
//! - Volatility: sample standard deviation scaled by `sqrt(periods per year)`.
//! - Maximum drawdown: deepest peak-to-trough fall of the cumulative index
//!   built from 1.0.
//!
//! VaR and CVaR are reported in return units, so a 95% VaR of `-0.02` means
//! a 2% loss. Every metric is a pure function of its input series.

use crate::error::{Result, RiskError};
use crate::report::RiskReport;
use serde::{Deserialize, Serialize};
use tempest_data::{ReturnMethod, ReturnSeries};

/// Fewest observations accepted for tail quantiles
pub const MIN_TAIL_OBSERVATIONS: usize = 20;

/// Default annualization factor for daily returns
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Interpolation between order statistics for non-integer quantile ranks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantileMethod {
    /// Linear interpolation between the two neighbouring order statistics
    #[default]
    Linear,
    /// Lower neighbour
    Lower,
    /// Higher neighbour
    Higher,
    /// Closest neighbour, ties going to the higher one
    Nearest,
    /// Average of both neighbours
    Midpoint,
}

impl QuantileMethod {
    /// Short label used in report methods
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Lower => "lower",
            Self::Higher => "higher",
            Self::Nearest => "nearest",
            Self::Midpoint => "midpoint",
        }
    }
}

/// Quantile `p` of an ascending sample.
///
/// Uses rank `h = (n - 1) * p` over zero-based order statistics.
///
/// # Returns
/// * `None` if the sample is empty
pub fn quantile(sorted: &[f64], p: f64, method: QuantileMethod) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let h = last as f64 * p;
    let lo = (h.floor() as usize).min(last);
    let hi = (h.ceil() as usize).min(last);
    let frac = h - lo as f64;

    Some(match method {
        QuantileMethod::Linear => sorted[lo] + frac * (sorted[hi] - sorted[lo]),
        QuantileMethod::Lower => sorted[lo],
        QuantileMethod::Higher => sorted[hi],
        QuantileMethod::Nearest => {
            if frac < 0.5 {
                sorted[lo]
            } else {
                sorted[hi]
            }
        }
        QuantileMethod::Midpoint => 0.5 * (sorted[lo] + sorted[hi]),
    })
}

/// Metric engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    /// Order-statistic interpolation for VaR (default: linear)
    pub quantile_method: QuantileMethod,

    /// Minimum observations for VaR / CVaR (default: 20, cannot be lower)
    pub min_tail_observations: usize,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            quantile_method: QuantileMethod::Linear,
            min_tail_observations: MIN_TAIL_OBSERVATIONS,
        }
    }
}

/// Metric selection for scoring and reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum RiskMetric {
    /// Historical value at risk
    ValueAtRisk {
        /// Confidence level in (0, 1)
        confidence: f64,
    },
    /// Conditional value at risk (expected shortfall)
    ConditionalVar {
        /// Confidence level in (0, 1)
        confidence: f64,
    },
    /// Annualized volatility
    Volatility {
        /// Periods per year
        annualization: u32,
    },
    /// Maximum drawdown
    MaxDrawdown,
}

impl RiskMetric {
    /// Metric name used in reports
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ValueAtRisk { .. } => "value_at_risk",
            Self::ConditionalVar { .. } => "conditional_var",
            Self::Volatility { .. } => "volatility",
            Self::MaxDrawdown => "max_drawdown",
        }
    }

    /// Confidence level, for tail metrics
    pub const fn confidence(&self) -> Option<f64> {
        match self {
            Self::ValueAtRisk { confidence } | Self::ConditionalVar { confidence } => {
                Some(*confidence)
            }
            Self::Volatility { .. } | Self::MaxDrawdown => None,
        }
    }

    /// Whether `candidate` is a worse outcome than `incumbent`.
    ///
    /// Lower is worse for VaR, CVaR and drawdown; higher is worse for
    /// volatility.
    pub fn is_worse(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Volatility { .. } => candidate > incumbent,
            _ => candidate < incumbent,
        }
    }
}

/// Historical risk metric engine
#[derive(Debug, Clone, Default)]
pub struct RiskMetricEngine {
    config: MetricConfig,
}

impl RiskMetricEngine {
    /// Create an engine with the given configuration.
    ///
    /// # Errors
    /// * [`RiskError::InvalidParameter`] if `min_tail_observations` is below
    ///   [`MIN_TAIL_OBSERVATIONS`]
    pub fn new(config: MetricConfig) -> Result<Self> {
        if config.min_tail_observations < MIN_TAIL_OBSERVATIONS {
            return Err(RiskError::InvalidParameter(format!(
                "min_tail_observations {} is below {MIN_TAIL_OBSERVATIONS}",
                config.min_tail_observations
            )));
        }
        Ok(Self { config })
    }

    /// Engine configuration
    pub const fn config(&self) -> &MetricConfig {
        &self.config
    }

    /// Historical value at risk at `confidence`.
    ///
    /// # Errors
    /// * [`RiskError::InvalidConfidence`] unless `0 < confidence < 1`
    /// * [`RiskError::InsufficientData`] below the minimum tail sample
    /// * [`RiskError::NonFiniteReturn`] if any return is NaN or infinite
    pub fn value_at_risk(&self, series: &ReturnSeries, confidence: f64) -> Result<f64> {
        let sorted = self.tail_sample(series, confidence)?;
        Ok(self.var_of_sorted(&sorted, confidence))
    }

    /// Conditional value at risk: mean of returns at or below VaR.
    ///
    /// Never greater than [`value_at_risk`](Self::value_at_risk) for the
    /// same inputs.
    ///
    /// # Errors
    /// Same as [`value_at_risk`](Self::value_at_risk).
    pub fn conditional_var(&self, series: &ReturnSeries, confidence: f64) -> Result<f64> {
        let sorted = self.tail_sample(series, confidence)?;
        let var = self.var_of_sorted(&sorted, confidence);

        let tail: Vec<f64> = sorted.iter().copied().take_while(|&r| r <= var).collect();
        let mean = tail.iter().sum::<f64>() / tail.len() as f64;

        // rounding in the mean can land a hair above the threshold
        Ok(mean.min(var))
    }

    /// Sample standard deviation scaled by `sqrt(annualization)`.
    ///
    /// # Errors
    /// * [`RiskError::InvalidParameter`] if `annualization` is zero
    /// * [`RiskError::InsufficientData`] with fewer than 2 observations
    /// * [`RiskError::NonFiniteReturn`] if any return is NaN or infinite
    pub fn volatility(&self, series: &ReturnSeries, annualization: u32) -> Result<f64> {
        if annualization == 0 {
            return Err(RiskError::InvalidParameter(
                "annualization factor must be positive".to_string(),
            ));
        }
        require_observations(series, 2)?;
        require_finite(series)?;

        Ok(series.view().std(1.0) * f64::from(annualization).sqrt())
    }

    /// Deepest peak-to-trough decline of the cumulative index.
    ///
    /// The index starts at 1.0 and compounds `(1 + r)` for simple returns or
    /// `exp(r)` for log returns. The result is `<= 0`, and exactly zero when
    /// the index never falls.
    ///
    /// # Errors
    /// * [`RiskError::InsufficientData`] for an empty series
    /// * [`RiskError::NonFiniteReturn`] if any return is NaN or infinite
    pub fn max_drawdown(&self, series: &ReturnSeries) -> Result<f64> {
        require_observations(series, 1)?;
        require_finite(series)?;

        let mut peak = 1.0_f64;
        let mut level = 1.0_f64;
        let mut log_level = 0.0_f64;
        let mut drawdown = 0.0_f64;

        for &r in series.values() {
            level = match series.method() {
                ReturnMethod::Simple => level * (1.0 + r),
                ReturnMethod::Log => {
                    log_level += r;
                    log_level.exp()
                }
            };

            if level >= peak {
                peak = level;
            } else {
                drawdown = drawdown.min(level / peak - 1.0);
            }
        }

        Ok(drawdown)
    }

    /// Evaluate a selected metric and wrap it in a [`RiskReport`].
    ///
    /// # Errors
    /// Whatever the selected metric raises.
    pub fn evaluate(&self, series: &ReturnSeries, metric: &RiskMetric) -> Result<RiskReport> {
        let (value, method) = match *metric {
            RiskMetric::ValueAtRisk { confidence } => (
                self.value_at_risk(series, confidence)?,
                format!("historical/{}", self.config.quantile_method.as_str()),
            ),
            RiskMetric::ConditionalVar { confidence } => (
                self.conditional_var(series, confidence)?,
                format!("historical/{}", self.config.quantile_method.as_str()),
            ),
            RiskMetric::Volatility { annualization } => (
                self.volatility(series, annualization)?,
                format!("sample-stddev/x-sqrt-{annualization}"),
            ),
            RiskMetric::MaxDrawdown => (
                self.max_drawdown(series)?,
                match series.method() {
                    ReturnMethod::Simple => "peak-to-trough/compounded".to_string(),
                    ReturnMethod::Log => "peak-to-trough/log-cumulative".to_string(),
                },
            ),
        };

        Ok(RiskReport {
            metric: metric.name().to_string(),
            value,
            confidence: metric.confidence(),
            method,
            series: series.name().to_string(),
            observations: series.len(),
        })
    }

    fn tail_sample(&self, series: &ReturnSeries, confidence: f64) -> Result<Vec<f64>> {
        // NaN fails both comparisons
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(RiskError::InvalidConfidence(confidence));
        }
        require_observations(series, self.config.min_tail_observations)?;
        require_finite(series)?;

        let mut sorted = series.values().to_vec();
        sorted.sort_by(f64::total_cmp);
        Ok(sorted)
    }

    fn var_of_sorted(&self, sorted: &[f64], confidence: f64) -> f64 {
        // tail_sample guarantees a non-empty sample
        quantile(sorted, 1.0 - confidence, self.config.quantile_method).unwrap_or(f64::NAN)
    }
}

fn require_observations(series: &ReturnSeries, required: usize) -> Result<()> {
    if series.len() < required {
        return Err(RiskError::InsufficientData {
            series: series.name().to_string(),
            required,
            actual: series.len(),
        });
    }
    Ok(())
}

fn require_finite(series: &ReturnSeries) -> Result<()> {
    match series.iter().find(|(_, r)| !r.is_finite()) {
        Some((date, _)) => Err(RiskError::NonFiniteReturn {
            series: series.name().to_string(),
            date,
        }),
        None => Ok(()),
    }
}
