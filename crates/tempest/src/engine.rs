//! End-to-end pipeline over a caller-owned [`TimeSeriesStore`]
//!
//! The engine borrows the store, so loading happens before any computation
//! and every read afterwards shares the same immutable data.

use crate::config::EngineConfig;
use crate::error::Result;
use std::collections::BTreeMap;
use tempest_data::{DateRange, ReturnSeries, TimeSeriesStore, common_dates};
use tempest_factors::{FactorFit, FactorModelFitter};
use tempest_risk::{
    HistoricalWindow, MonteCarloSpec, PortfolioWeights, ReturnCalculator, RiskMetric,
    RiskMetricEngine, RiskReport, ScenarioScores, StressScenario, StressScenarioRunner,
    aggregate,
};
use tracing::{debug, info};

/// Risk pipeline bound to one store and one configuration
#[derive(Debug)]
pub struct Engine<'a> {
    store: &'a TimeSeriesStore,
    config: EngineConfig,
    calculator: ReturnCalculator,
    runner: StressScenarioRunner,
    fitter: FactorModelFitter,
}

impl<'a> Engine<'a> {
    /// Create an engine over `store`.
    ///
    /// # Errors
    /// * [`Error::Config`](crate::Error::Config) for out-of-range settings
    /// * [`Error::Risk`](crate::Error::Risk) if the metric settings are rejected
    pub fn new(store: &'a TimeSeriesStore, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let metrics = RiskMetricEngine::new(config.metrics.clone())?;
        Ok(Self {
            store,
            calculator: ReturnCalculator::new(config.return_method),
            runner: StressScenarioRunner::new(metrics, config.runner.clone()),
            fitter: FactorModelFitter::new(config.fitter.clone()),
            config,
        })
    }

    /// Engine over `store` with the default configuration
    pub fn with_defaults(store: &'a TimeSeriesStore) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
            calculator: ReturnCalculator::default(),
            runner: StressScenarioRunner::default(),
            fitter: FactorModelFitter::default(),
        }
    }

    /// Underlying store
    pub const fn store(&self) -> &'a TimeSeriesStore {
        self.store
    }

    /// Active configuration
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Return series of one ticker over an optional date range.
    ///
    /// # Errors
    /// * Unknown ticker or fewer than two prices in range
    pub fn ticker_returns(&self, ticker: &str, range: Option<&DateRange>) -> Result<ReturnSeries> {
        let view = self.store.get(ticker, range)?;
        Ok(self.calculator.compute(&view)?)
    }

    /// Portfolio return series over the dates every weighted ticker trades.
    ///
    /// Tickers with zero weight need not be loaded.
    ///
    /// # Errors
    /// * Unknown ticker, empty or zero-exposure weights, too few common dates
    pub fn portfolio_returns(
        &self,
        weights: &PortfolioWeights,
        range: Option<&DateRange>,
    ) -> Result<ReturnSeries> {
        let tickers: Vec<&str> = weights
            .iter()
            .filter(|(_, w)| *w != 0.0)
            .map(|(t, _)| t.as_str())
            .collect();
        let aligned = self.store.aligned(tickers, range)?;
        let returns = self.calculator.compute_all(&aligned)?;
        let portfolio = aggregate(&returns, weights)?;

        debug!(
            tickers = aligned.len(),
            observations = portfolio.len(),
            "built portfolio returns"
        );
        Ok(portfolio)
    }

    /// Evaluate one metric.
    ///
    /// # Errors
    /// Whatever the metric raises for this series.
    pub fn evaluate(&self, series: &ReturnSeries, metric: &RiskMetric) -> Result<RiskReport> {
        Ok(self.runner.engine().evaluate(series, metric)?)
    }

    /// VaR, CVaR, volatility and maximum drawdown of a series.
    ///
    /// # Errors
    /// The first metric failure; no partial report is returned.
    pub fn report(&self, series: &ReturnSeries) -> Result<Vec<RiskReport>> {
        info!(
            series = series.name(),
            observations = series.len(),
            "computing risk report"
        );
        self.config
            .report_metrics()
            .iter()
            .map(|metric| self.evaluate(series, metric))
            .collect()
    }

    /// Replay a historical window of `series` and score it.
    ///
    /// # Errors
    /// * Empty window, or the metric failing on the replayed window
    pub fn replay(
        &self,
        series: &ReturnSeries,
        window: &HistoricalWindow,
        metric: &RiskMetric,
    ) -> Result<ScenarioScores> {
        self.stress(series, &StressScenario::Historical(window.clone()), metric)
    }

    /// Simulate Monte Carlo paths from `series` and score them.
    ///
    /// `spec` falls back to the configured Monte Carlo scenario.
    ///
    /// # Errors
    /// * Invalid scenario parameters, or a path failure under all-or-nothing
    ///   scoring
    pub fn simulate(
        &self,
        series: &ReturnSeries,
        spec: Option<&MonteCarloSpec>,
        metric: &RiskMetric,
    ) -> Result<ScenarioScores> {
        let spec = spec.unwrap_or(&self.config.monte_carlo);
        self.stress(series, &StressScenario::MonteCarlo(spec.clone()), metric)
    }

    /// Run any stress scenario against `series`.
    ///
    /// # Errors
    /// Whatever replay, simulation or scoring raises.
    pub fn stress(
        &self,
        series: &ReturnSeries,
        scenario: &StressScenario,
        metric: &RiskMetric,
    ) -> Result<ScenarioScores> {
        Ok(self.runner.run(series, scenario, metric)?)
    }

    /// Fit `asset` on factor series that already share its dates.
    ///
    /// # Errors
    /// Any [`FactorError`](tempest_factors::FactorError).
    pub fn fit_factors(
        &self,
        asset: &ReturnSeries,
        factors: &BTreeMap<String, ReturnSeries>,
    ) -> Result<FactorFit> {
        Ok(self.fitter.fit(asset, factors)?)
    }

    /// Restrict `asset` and every factor to their common dates, then fit.
    ///
    /// # Errors
    /// Any [`FactorError`](tempest_factors::FactorError), typically
    /// insufficient data when the calendars barely overlap.
    pub fn fit_factors_aligned(
        &self,
        asset: &ReturnSeries,
        factors: &BTreeMap<String, ReturnSeries>,
    ) -> Result<FactorFit> {
        let dates = common_dates(std::iter::once(asset).chain(factors.values()));
        debug!(
            asset = asset.name(),
            factors = factors.len(),
            common_dates = dates.len(),
            "aligning factor series"
        );

        let asset = asset.restrict_to(&dates);
        let factors = factors
            .iter()
            .map(|(name, series)| (name.clone(), series.restrict_to(&dates)))
            .collect();
        self.fit_factors(&asset, &factors)
    }
}
