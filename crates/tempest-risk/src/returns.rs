//! Return calculation
//!
//! Derives period returns from closing prices:
//!
//! - simple: `r_t = (c_t - c_{t-1}) / c_{t-1}`
//! - log: `r_t = ln(c_t / c_{t-1})`
//!
//! Each return is dated with the later of its two prices, so a series of
//! `n` prices yields `n - 1` returns. Prices are strictly positive by
//! construction of [`TickerSeries`], so neither formula can divide by zero.

use crate::error::{Result, RiskError};
use std::collections::BTreeMap;
use tempest_data::{ReturnMethod, ReturnSeries, SeriesView, Ticker, TickerSeries};
use tracing::debug;

/// Compute returns over a price window.
///
/// # Errors
/// * [`RiskError::InsufficientData`] if the window has fewer than 2 prices
pub fn compute_returns(view: &SeriesView<'_>, method: ReturnMethod) -> Result<ReturnSeries> {
    let closes = view.closes();
    if closes.len() < 2 {
        return Err(RiskError::InsufficientData {
            series: view.ticker().to_string(),
            required: 2,
            actual: closes.len(),
        });
    }

    let values = closes
        .windows(2)
        .map(|pair| match method {
            ReturnMethod::Simple => (pair[1] - pair[0]) / pair[0],
            ReturnMethod::Log => (pair[1] / pair[0]).ln(),
        })
        .collect();

    Ok(ReturnSeries::new(
        view.ticker().as_str(),
        method,
        view.dates()[1..].to_vec(),
        values,
    )?)
}

/// Growth factor of one unit invested over the whole series.
///
/// Simple returns compound as `Π(1 + r)`, log returns as `exp(Σ r)`.
/// An empty series has growth 1.
pub fn compound(series: &ReturnSeries) -> f64 {
    match series.method() {
        ReturnMethod::Simple => series.values().iter().map(|r| 1.0 + r).product(),
        ReturnMethod::Log => series.values().iter().sum::<f64>().exp(),
    }
}

/// Return calculator bound to one return convention
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnCalculator {
    method: ReturnMethod,
}

impl ReturnCalculator {
    /// Create a calculator for the given convention
    pub const fn new(method: ReturnMethod) -> Self {
        Self { method }
    }

    /// Return convention in use
    pub const fn method(&self) -> ReturnMethod {
        self.method
    }

    /// Compute returns over a price window.
    ///
    /// # Errors
    /// * [`RiskError::InsufficientData`] if the window has fewer than 2 prices
    pub fn compute(&self, view: &SeriesView<'_>) -> Result<ReturnSeries> {
        compute_returns(view, self.method)
    }

    /// Compute returns for every series of an aligned set.
    ///
    /// Aligned price series yield return series sharing the same dates,
    /// ready for [`aggregate`](crate::portfolio::aggregate).
    ///
    /// # Errors
    /// * [`RiskError::InsufficientData`] if any series has fewer than 2 prices
    pub fn compute_all(
        &self,
        series: &BTreeMap<Ticker, TickerSeries>,
    ) -> Result<BTreeMap<Ticker, ReturnSeries>> {
        debug!(tickers = series.len(), method = ?self.method, "computing returns");
        series
            .iter()
            .map(|(ticker, s)| Ok((ticker.clone(), self.compute(&s.view())?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rstest::rstest;
    use tempest_data::PricePoint;

    fn series(closes: &[f64]) -> TickerSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = closes
            .iter()
            .zip(start.iter_days())
            .map(|(&c, d)| PricePoint::new(d, c, c, c, c, 100))
            .collect();
        TickerSeries::try_new("TEST", points).unwrap()
    }

    #[rstest]
    #[case(ReturnMethod::Simple)]
    #[case(ReturnMethod::Log)]
    fn test_constant_prices_give_zero_returns(#[case] method: ReturnMethod) {
        let s = series(&[42.0; 12]);
        let returns = compute_returns(&s.view(), method).unwrap();

        assert_eq!(returns.len(), 11);
        assert!(returns.values().iter().all(|&r| r == 0.0));
    }

    #[test]
    fn test_simple_returns() {
        let s = series(&[100.0, 110.0, 99.0]);
        let returns = compute_returns(&s.view(), ReturnMethod::Simple).unwrap();

        assert_relative_eq!(returns.values()[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(returns.values()[1], -0.10, epsilon = 1e-12);
        assert_eq!(returns.dates(), &s.dates()[1..]);
        assert_eq!(returns.name(), "TEST");
    }

    #[test]
    fn test_log_returns_reconstruct_price_ratio() {
        let closes = [100.0, 103.5, 97.2, 101.1, 120.4, 88.8, 91.0];
        let s = series(&closes);
        let returns = compute_returns(&s.view(), ReturnMethod::Log).unwrap();

        let ratio = closes[closes.len() - 1] / closes[0];
        assert_relative_eq!(compound(&returns), ratio, max_relative = 1e-12);
    }

    #[test]
    fn test_simple_compounding_reconstructs_price_ratio() {
        let closes = [50.0, 55.0, 40.0, 60.0];
        let s = series(&closes);
        let returns = compute_returns(&s.view(), ReturnMethod::Simple).unwrap();
        assert_relative_eq!(compound(&returns), 60.0 / 50.0, max_relative = 1e-12);
    }

    #[rstest]
    #[case(&[])]
    #[case(&[10.0])]
    fn test_insufficient_prices(#[case] closes: &[f64]) {
        let s = series(closes);
        let err = compute_returns(&s.view(), ReturnMethod::Simple).unwrap_err();
        assert!(matches!(
            err,
            RiskError::InsufficientData { required: 2, actual, .. } if actual == closes.len()
        ));
    }

    #[test]
    fn test_compute_all() {
        let mut set = BTreeMap::new();
        set.insert(Ticker::new("A"), series(&[1.0, 2.0]));
        set.insert(Ticker::new("B"), series(&[2.0, 1.0]));

        let all = ReturnCalculator::new(ReturnMethod::Simple)
            .compute_all(&set)
            .unwrap();
        assert_eq!(all["A"].values(), &[1.0]);
        assert_eq!(all["B"].values(), &[-0.5]);
    }
}
