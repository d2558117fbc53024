#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tempest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod metrics;
pub mod portfolio;
pub mod report;
pub mod returns;
pub mod stress;

// Re-export main types
pub use error::RiskError;
pub use metrics::{MetricConfig, QuantileMethod, RiskMetric, RiskMetricEngine};
pub use portfolio::{PortfolioWeights, aggregate};
pub use report::RiskReport;
pub use returns::{ReturnCalculator, compute_returns};
pub use stress::{
    AggregateStats, Distribution, FailurePolicy, HistoricalWindow, MonteCarloSpec, RunnerConfig,
    ScenarioScores, StressScenario, StressScenarioRunner,
};
