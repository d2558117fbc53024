//! Dated return series.
//!
//! [`ReturnSeries`] is the common currency between every downstream
//! component: the return calculator produces one per ticker, the portfolio
//! aggregator folds several into one, and the metric, stress and factor
//! components consume them read-only.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How period returns are measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnMethod {
    /// `(p_t - p_{t-1}) / p_{t-1}`
    #[default]
    Simple,
    /// `ln(p_t / p_{t-1})`
    Log,
}

/// Named, date-ordered sequence of period returns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    name: String,
    method: ReturnMethod,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Create a return series.
    ///
    /// # Errors
    /// * [`DataError::MalformedReturns`] if `dates` and `values` differ in
    ///   length or the dates are not strictly ascending
    pub fn new(
        name: impl Into<String>,
        method: ReturnMethod,
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let name = name.into();
        if dates.len() != values.len() {
            return Err(DataError::MalformedReturns {
                name,
                reason: format!("{} dates but {} values", dates.len(), values.len()),
            });
        }
        if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(DataError::MalformedReturns {
                name,
                reason: format!("date {} does not follow {}", pair[1], pair[0]),
            });
        }

        Ok(Self {
            name,
            method,
            dates,
            values,
        })
    }

    /// Identity of the series (ticker, `portfolio`, scenario path, ...)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return convention of the values
    pub const fn method(&self) -> ReturnMethod {
        self.method
    }

    /// Dates, ascending
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Returns aligned with [`dates`](Self::dates)
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns as an ndarray view
    pub fn view(&self) -> ArrayView1<'_, f64> {
        ArrayView1::from(self.values.as_slice())
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First date, if any
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    /// Last date, if any
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Iterate over `(date, return)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Same series under a different name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Copy keeping only observations dated in `dates`
    pub fn restrict_to(&self, dates: &BTreeSet<NaiveDate>) -> Self {
        self.filtered(|d| dates.contains(&d))
    }

    /// Copy keeping only observations inside `[start, end]`
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Self {
        self.filtered(|d| d >= start && d <= end)
    }

    fn filtered(&self, keep: impl Fn(NaiveDate) -> bool) -> Self {
        let (dates, values) = self.iter().filter(|(d, _)| keep(*d)).unzip();
        Self {
            name: self.name.clone(),
            method: self.method,
            dates,
            values,
        }
    }
}

/// Dates shared by every series.
///
/// Use with [`ReturnSeries::restrict_to`] to align externally sourced series
/// (factor returns, other tickers) before combining them date by date.
pub fn common_dates<'a, I>(series: I) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = &'a ReturnSeries>,
{
    let mut common: Option<BTreeSet<NaiveDate>> = None;
    for s in series {
        common = Some(match common {
            None => s.dates.iter().copied().collect(),
            Some(acc) => s.dates.iter().copied().filter(|d| acc.contains(d)).collect(),
        });
    }
    common.unwrap_or_default()
}
