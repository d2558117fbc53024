//! Portfolio aggregation
//!
//! Combines per-ticker return series into a single portfolio series:
//!
//! r_p(t) = Σ w_i * r_i(t) / Σ |w_i|
//!
//! Normalizing by gross exposure keeps proportional exposure while letting
//! weights carry leverage or short positions. Inputs must already share one
//! date vector; see [`TimeSeriesStore::aligned`](tempest_data::TimeSeriesStore::aligned).

use crate::error::{Result, RiskError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tempest_data::{ReturnSeries, Ticker};
use tracing::debug;

/// Name given to aggregated portfolio series
pub const PORTFOLIO_SERIES_NAME: &str = "portfolio";

/// Portfolio weights by ticker.
///
/// Weights need not sum to one and may be negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioWeights {
    weights: BTreeMap<Ticker, f64>,
}

impl PortfolioWeights {
    /// Create an empty weight map
    pub const fn new() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    /// Equal weights of `1 / n` over the given tickers
    pub fn equal<T, I>(tickers: I) -> Self
    where
        T: Into<Ticker>,
        I: IntoIterator<Item = T>,
    {
        let tickers: Vec<Ticker> = tickers.into_iter().map(Into::into).collect();
        let weight = 1.0 / tickers.len() as f64;
        tickers.into_iter().map(|t| (t, weight)).collect()
    }

    /// Set a ticker's weight, returning the previous one
    pub fn insert(&mut self, ticker: impl Into<Ticker>, weight: f64) -> Option<f64> {
        self.weights.insert(ticker.into(), weight)
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, ticker: impl Into<Ticker>, weight: f64) -> Self {
        self.insert(ticker, weight);
        self
    }

    /// Weight of a ticker
    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.weights.get(ticker).copied()
    }

    /// Number of weighted tickers
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether no ticker is weighted
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Iterate over `(ticker, weight)` in ticker order
    pub fn iter(&self) -> impl Iterator<Item = (&Ticker, f64)> {
        self.weights.iter().map(|(t, w)| (t, *w))
    }

    /// Weighted tickers in order
    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.weights.keys()
    }

    /// Σ |w_i|
    pub fn gross_exposure(&self) -> f64 {
        self.weights.values().map(|w| w.abs()).sum()
    }

    /// Σ w_i
    pub fn net_exposure(&self) -> f64 {
        self.weights.values().sum()
    }
}

impl<T: Into<Ticker>> FromIterator<(T, f64)> for PortfolioWeights {
    fn from_iter<I: IntoIterator<Item = (T, f64)>>(iter: I) -> Self {
        Self {
            weights: iter.into_iter().map(|(t, w)| (t.into(), w)).collect(),
        }
    }
}

/// Aggregate ticker return series into a portfolio return series.
///
/// Tickers with zero weight do not need a series; series without a weight
/// are ignored.
///
/// # Errors
/// * [`RiskError::EmptyPortfolio`] if `weights` is empty
/// * [`RiskError::InvalidParameter`] if a weight is not finite
/// * [`RiskError::ZeroGrossExposure`] if every weight is zero
/// * [`RiskError::MissingSeries`] if a weighted ticker has no series
/// * [`RiskError::DateMisalignment`] if the weighted series differ in dates
/// * [`RiskError::MixedReturnMethods`] if they mix simple and log returns
pub fn aggregate(
    series: &BTreeMap<Ticker, ReturnSeries>,
    weights: &PortfolioWeights,
) -> Result<ReturnSeries> {
    if weights.is_empty() {
        return Err(RiskError::EmptyPortfolio);
    }
    if let Some((ticker, weight)) = weights.iter().find(|(_, w)| !w.is_finite()) {
        return Err(RiskError::InvalidParameter(format!(
            "weight for {ticker} is {weight}"
        )));
    }

    let gross = weights.gross_exposure();
    if gross == 0.0 {
        return Err(RiskError::ZeroGrossExposure);
    }

    let members = weights
        .iter()
        .filter(|(_, w)| *w != 0.0)
        .map(|(ticker, w)| {
            series
                .get(ticker)
                .map(|s| (w, s))
                .ok_or_else(|| RiskError::MissingSeries(ticker.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    // gross > 0 guarantees at least one member
    let reference = members[0].1;
    for (_, s) in &members[1..] {
        if s.dates() != reference.dates() {
            return Err(RiskError::DateMisalignment {
                series: s.name().to_string(),
                reference: reference.name().to_string(),
            });
        }
        if s.method() != reference.method() {
            return Err(RiskError::MixedReturnMethods {
                series: s.name().to_string(),
                reference: reference.name().to_string(),
            });
        }
    }

    debug!(
        members = members.len(),
        observations = reference.len(),
        gross_exposure = gross,
        "aggregating portfolio returns"
    );

    let values = (0..reference.len())
        .map(|t| {
            members
                .iter()
                .map(|(w, s)| w * s.values()[t])
                .sum::<f64>()
                / gross
        })
        .collect();

    Ok(ReturnSeries::new(
        PORTFOLIO_SERIES_NAME,
        reference.method(),
        reference.dates().to_vec(),
        values,
    )?)
}
