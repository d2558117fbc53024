//! JSON reporting.

use serde::Serialize;
use std::io::{self, Write};
use tempest::risk::{AggregateStats, RiskMetric, RiskReport, ScenarioScores, StressScenario};

/// One failed path of a scenario run.
#[derive(Debug, Serialize)]
pub(crate) struct PathFailure {
    index: usize,
    error: String,
}

/// Serializable view of a scored scenario.
#[derive(Debug, Serialize)]
pub(crate) struct ScenarioOutput<'a> {
    scenario: &'a StressScenario,
    metric: RiskMetric,
    summary: Option<&'a AggregateStats>,
    reports: Vec<&'a RiskReport>,
    failures: Vec<PathFailure>,
}

impl<'a> ScenarioOutput<'a> {
    pub(crate) fn new(scenario: &'a StressScenario, scores: &'a ScenarioScores) -> Self {
        Self {
            scenario,
            metric: scores.metric,
            summary: scores.summary.as_ref(),
            reports: scores.reports().collect(),
            failures: scores
                .failures()
                .map(|(index, error)| PathFailure {
                    index,
                    error: error.to_string(),
                })
                .collect(),
        }
    }
}

/// Pretty-print `value` as JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)
}
