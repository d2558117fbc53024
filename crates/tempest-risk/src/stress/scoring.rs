//! Batch scoring of scenario paths

use crate::error::{Result, RiskError};
use crate::metrics::{RiskMetric, RiskMetricEngine};
use crate::report::RiskReport;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tempest_data::ReturnSeries;
use tracing::{debug, warn};

/// Handling of per-path scoring failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep failures as `Err` outcomes and summarize the rest
    #[default]
    Isolate,
    /// Fail the whole batch on the first failing path
    AllOrNothing,
}

/// Summary over the successfully scored paths
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    /// Paths scored
    pub paths: usize,
    /// Paths with a metric value
    pub succeeded: usize,
    /// Paths whose metric failed
    pub failed: usize,
    /// Mean metric value
    pub mean: f64,
    /// Worst value under the metric's orientation
    pub worst: f64,
    /// Best value under the metric's orientation
    pub best: f64,
    /// Name of the path holding the worst value
    pub worst_series: String,
}

/// Per-path outcomes of a scoring run, in path order
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioScores {
    /// Metric the paths were scored with
    pub metric: RiskMetric,
    /// One outcome per input path
    pub outcomes: Vec<Result<RiskReport>>,
    /// Aggregate over successful outcomes; `None` when none succeeded
    pub summary: Option<AggregateStats>,
}

impl ScenarioScores {
    /// Successful reports, in path order
    pub fn reports(&self) -> impl Iterator<Item = &RiskReport> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    /// `(path index, error)` for every failed path
    pub fn failures(&self) -> impl Iterator<Item = (usize, &RiskError)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.as_ref().err().map(|e| (i, e)))
    }
}

pub(crate) fn score(
    engine: &RiskMetricEngine,
    paths: &[ReturnSeries],
    metric: &RiskMetric,
    policy: FailurePolicy,
    parallel_threshold: usize,
) -> Result<ScenarioScores> {
    let evaluate = |path: &ReturnSeries| engine.evaluate(path, metric);
    let outcomes: Vec<Result<RiskReport>> = if paths.len() >= parallel_threshold {
        paths.par_iter().map(evaluate).collect()
    } else {
        paths.iter().map(evaluate).collect()
    };

    match policy {
        FailurePolicy::AllOrNothing => {
            if let Some(err) = outcomes.iter().find_map(|o| o.as_ref().err()) {
                return Err(err.clone());
            }
        }
        FailurePolicy::Isolate => {
            for (path, outcome) in paths.iter().zip(&outcomes) {
                if let Err(err) = outcome {
                    warn!(path = path.name(), error = %err, "path failed to score");
                }
            }
        }
    }

    let summary = summarize(paths, &outcomes, metric);
    debug!(
        metric = metric.name(),
        paths = paths.len(),
        succeeded = summary.as_ref().map_or(0, |s| s.succeeded),
        "scored scenario paths"
    );

    Ok(ScenarioScores {
        metric: *metric,
        outcomes,
        summary,
    })
}

fn summarize(
    paths: &[ReturnSeries],
    outcomes: &[Result<RiskReport>],
    metric: &RiskMetric,
) -> Option<AggregateStats> {
    let mut scored = paths
        .iter()
        .zip(outcomes)
        .filter_map(|(path, o)| o.as_ref().ok().map(|r| (path.name(), r.value)));

    let (first_name, first_value) = scored.next()?;
    let mut stats = AggregateStats {
        paths: outcomes.len(),
        succeeded: 1,
        failed: 0,
        mean: 0.0,
        worst: first_value,
        best: first_value,
        worst_series: first_name.to_string(),
    };
    let mut total = first_value;

    for (name, value) in scored {
        stats.succeeded += 1;
        total += value;
        if metric.is_worse(value, stats.worst) {
            stats.worst = value;
            stats.worst_series = name.to_string();
        }
        if metric.is_worse(stats.best, value) {
            stats.best = value;
        }
    }

    stats.failed = stats.paths - stats.succeeded;
    stats.mean = total / stats.succeeded as f64;
    Some(stats)
}
