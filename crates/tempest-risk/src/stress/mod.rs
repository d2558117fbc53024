//! Stress scenarios
//!
//! Two kinds of scenario are supported:
//!
//! - **Historical replay**: a named date window of the baseline series,
//!   replayed verbatim (e.g. the March 2020 drawdown).
//! - **Monte Carlo**: synthetic paths drawn i.i.d. from a distribution fitted
//!   to the baseline, either a normal with the baseline's mean and standard
//!   deviation or an empirical bootstrap.
//!
//! Replayed or simulated paths are scored with the [`RiskMetricEngine`],
//! one report per path plus aggregate statistics over the path set.

pub mod monte_carlo;
pub mod scoring;

pub use monte_carlo::{Distribution, MonteCarloSpec, path_seed};
pub use scoring::{AggregateStats, FailurePolicy, ScenarioScores};

use crate::error::{Result, RiskError};
use crate::metrics::{RiskMetric, RiskMetricEngine};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempest_data::ReturnSeries;
use tracing::info;

/// Named historical window `[start, end]`, inclusive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalWindow {
    /// Window name (e.g. `covid-crash`)
    pub name: String,
    /// First date of the window
    pub start: NaiveDate,
    /// Last date of the window
    pub end: NaiveDate,
}

impl HistoricalWindow {
    /// Create a window
    pub fn new(name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }
}

/// Stress scenario definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StressScenario {
    /// Replay a historical window verbatim
    Historical(HistoricalWindow),
    /// Simulate synthetic paths
    MonteCarlo(MonteCarloSpec),
}

/// Stress runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Path count from which generation and scoring run on the rayon pool
    /// (default: 64)
    pub parallel_threshold: usize,

    /// How per-path scoring failures are handled (default: isolate)
    pub failure_policy: FailurePolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 64,
            failure_policy: FailurePolicy::Isolate,
        }
    }
}

/// Runs stress scenarios against a baseline return series
#[derive(Debug, Clone, Default)]
pub struct StressScenarioRunner {
    engine: RiskMetricEngine,
    config: RunnerConfig,
}

impl StressScenarioRunner {
    /// Create a runner scoring with `engine`
    pub const fn new(engine: RiskMetricEngine, config: RunnerConfig) -> Self {
        Self { engine, config }
    }

    /// Metric engine used for scoring
    pub const fn engine(&self) -> &RiskMetricEngine {
        &self.engine
    }

    /// Runner configuration
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Extract the part of `baseline` inside the window.
    ///
    /// # Errors
    /// * [`RiskError::EmptyWindow`] if no observation falls in the window
    pub fn replay(
        &self,
        baseline: &ReturnSeries,
        window: &HistoricalWindow,
    ) -> Result<ReturnSeries> {
        let replayed = baseline
            .window(window.start, window.end)
            .with_name(format!("{}@{}", baseline.name(), window.name));

        if replayed.is_empty() {
            return Err(RiskError::EmptyWindow {
                series: baseline.name().to_string(),
                start: window.start,
                end: window.end,
            });
        }
        Ok(replayed)
    }

    /// Generate synthetic paths from `baseline`.
    ///
    /// Paths are returned in index order. With a seed the whole path set is
    /// reproducible bit for bit, whatever the thread scheduling.
    ///
    /// # Errors
    /// * [`RiskError::InvalidParameter`] for zero paths or zero path length
    /// * [`RiskError::InsufficientData`] if the baseline cannot be fitted
    /// * [`RiskError::NonFiniteReturn`] if the baseline holds NaN or infinity
    pub fn simulate(
        &self,
        baseline: &ReturnSeries,
        spec: &MonteCarloSpec,
    ) -> Result<Vec<ReturnSeries>> {
        monte_carlo::simulate(baseline, spec, self.config.parallel_threshold)
    }

    /// Score every path with `metric` under the configured failure policy.
    ///
    /// # Errors
    /// * The lowest-index path failure, under [`FailurePolicy::AllOrNothing`]
    pub fn score_scenarios(
        &self,
        paths: &[ReturnSeries],
        metric: &RiskMetric,
    ) -> Result<ScenarioScores> {
        self.score_scenarios_with(paths, metric, self.config.failure_policy)
    }

    /// Score every path with `metric` under an explicit failure policy.
    ///
    /// # Errors
    /// * The lowest-index path failure, under [`FailurePolicy::AllOrNothing`]
    pub fn score_scenarios_with(
        &self,
        paths: &[ReturnSeries],
        metric: &RiskMetric,
        policy: FailurePolicy,
    ) -> Result<ScenarioScores> {
        scoring::score(
            &self.engine,
            paths,
            metric,
            policy,
            self.config.parallel_threshold,
        )
    }

    /// Replay or simulate `scenario` and score the resulting paths.
    ///
    /// # Errors
    /// Any error from [`replay`](Self::replay), [`simulate`](Self::simulate)
    /// or [`score_scenarios`](Self::score_scenarios).
    pub fn run(
        &self,
        baseline: &ReturnSeries,
        scenario: &StressScenario,
        metric: &RiskMetric,
    ) -> Result<ScenarioScores> {
        let paths = match scenario {
            StressScenario::Historical(window) => {
                info!(
                    baseline = baseline.name(),
                    window = %window.name,
                    start = %window.start,
                    end = %window.end,
                    "replaying historical window"
                );
                vec![self.replay(baseline, window)?]
            }
            StressScenario::MonteCarlo(spec) => self.simulate(baseline, spec)?,
        };
        self.score_scenarios(&paths, metric)
    }
}
