//! Risk report values handed to reporting collaborators.

use serde::{Deserialize, Serialize};

/// Result of one metric computation over one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Metric name (e.g. `value_at_risk`)
    pub metric: String,

    /// Metric value, in return units
    pub value: f64,

    /// Confidence level for tail metrics
    pub confidence: Option<f64>,

    /// How the value was computed (e.g. `historical/linear`)
    pub method: String,

    /// Identity of the input series
    pub series: String,

    /// Number of observations used
    pub observations: usize,
}
