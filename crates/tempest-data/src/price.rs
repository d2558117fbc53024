//! Price history types.
//!
//! A [`TickerSeries`] holds one ticker's daily OHLCV history in columnar form,
//! sorted by date with unique dates. Series are validated once when they are
//! built and never mutated afterwards; [`SeriesView`] gives cheap borrowed
//! windows over a date range.

use crate::error::{DataError, Result};
use crate::store::DateRange;
use chrono::NaiveDate;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;

/// Ticker symbol identifying one price series
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Create a ticker from any string-like symbol
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// The symbol as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Ticker {
    fn from(symbol: &str) -> Self {
        Self(symbol.to_string())
    }
}

impl Borrow<str> for Ticker {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One daily OHLCV observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl PricePoint {
    /// Create a price point. Invariants are checked when the point is loaded
    /// into a [`TickerSeries`], not here.
    pub const fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Trading date
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Opening price
    pub const fn open(&self) -> f64 {
        self.open
    }

    /// Session high
    pub const fn high(&self) -> f64 {
        self.high
    }

    /// Session low
    pub const fn low(&self) -> f64 {
        self.low
    }

    /// Closing price
    pub const fn close(&self) -> f64 {
        self.close
    }

    /// Traded volume
    pub const fn volume(&self) -> u64 {
        self.volume
    }

    /// Check the OHLC invariants.
    ///
    /// Every price must be finite and strictly positive, `high >= low`, and
    /// both open and close must lie within `[low, high]`.
    ///
    /// # Returns
    /// * `Err(reason)` describing the first violated invariant
    pub fn check(&self) -> std::result::Result<(), String> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, value) in prices {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} price {value} is not strictly positive"));
            }
        }

        if self.high < self.low {
            return Err(format!("high {} is below low {}", self.high, self.low));
        }
        if self.open < self.low || self.open > self.high {
            return Err(format!(
                "open {} outside [{}, {}]",
                self.open, self.low, self.high
            ));
        }
        if self.close < self.low || self.close > self.high {
            return Err(format!(
                "close {} outside [{}, {}]",
                self.close, self.low, self.high
            ));
        }

        Ok(())
    }
}

/// Validated, date-ordered OHLCV history for one ticker
#[derive(Debug, Clone, PartialEq)]
pub struct TickerSeries {
    ticker: Ticker,
    dates: Vec<NaiveDate>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<u64>,
}

impl TickerSeries {
    /// Build a series from unordered points.
    ///
    /// Points are sorted by date, then every point is validated.
    ///
    /// # Errors
    /// * [`DataError::DuplicateDate`] if two points share a date
    /// * [`DataError::InvalidPrice`] if a point violates the OHLC invariants
    pub fn try_new(ticker: impl Into<Ticker>, mut points: Vec<PricePoint>) -> Result<Self> {
        let ticker = ticker.into();
        points.sort_by_key(PricePoint::date);

        for pair in points.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(DataError::DuplicateDate {
                    ticker: ticker.to_string(),
                    date: pair[0].date,
                });
            }
        }

        for point in &points {
            point.check().map_err(|reason| DataError::InvalidPrice {
                ticker: ticker.to_string(),
                date: point.date,
                reason,
            })?;
        }

        Ok(Self::from_sorted(ticker, &points))
    }

    fn from_sorted(ticker: Ticker, points: &[PricePoint]) -> Self {
        Self {
            ticker,
            dates: points.iter().map(|p| p.date).collect(),
            open: points.iter().map(|p| p.open).collect(),
            high: points.iter().map(|p| p.high).collect(),
            low: points.iter().map(|p| p.low).collect(),
            close: points.iter().map(|p| p.close).collect(),
            volume: points.iter().map(|p| p.volume).collect(),
        }
    }

    /// Ticker this series belongs to
    pub const fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the series holds no observations
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Observation dates, ascending
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Closing prices aligned with [`dates`](Self::dates)
    pub fn closes(&self) -> &[f64] {
        &self.close
    }

    /// Borrow the whole series
    pub fn view(&self) -> SeriesView<'_> {
        SeriesView {
            series: self,
            start: 0,
            end: self.len(),
        }
    }

    /// Borrow the observations falling inside `range` (inclusive)
    pub fn view_range(&self, range: &DateRange) -> SeriesView<'_> {
        let start = range
            .start()
            .map_or(0, |s| self.dates.partition_point(|d| *d < s));
        let end = range
            .end()
            .map_or(self.len(), |e| self.dates.partition_point(|d| *d <= e));

        SeriesView {
            series: self,
            start,
            end: end.max(start),
        }
    }

    /// Copy of the series keeping only the given dates
    pub fn restrict_to(&self, dates: &BTreeSet<NaiveDate>) -> Self {
        let points: Vec<PricePoint> = self
            .view()
            .iter()
            .filter(|p| dates.contains(&p.date))
            .collect();
        Self::from_sorted(self.ticker.clone(), &points)
    }

    fn point(&self, index: usize) -> PricePoint {
        PricePoint {
            date: self.dates[index],
            open: self.open[index],
            high: self.high[index],
            low: self.low[index],
            close: self.close[index],
            volume: self.volume[index],
        }
    }
}

/// Borrowed, contiguous date window over a [`TickerSeries`]
#[derive(Debug, Clone, Copy)]
pub struct SeriesView<'a> {
    series: &'a TickerSeries,
    start: usize,
    end: usize,
}

impl<'a> SeriesView<'a> {
    /// Ticker of the underlying series
    pub const fn ticker(&self) -> &'a Ticker {
        &self.series.ticker
    }

    /// Number of observations in the window
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the window is empty
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Dates in the window
    pub fn dates(&self) -> &'a [NaiveDate] {
        &self.series.dates[self.start..self.end]
    }

    /// Opening prices in the window
    pub fn opens(&self) -> &'a [f64] {
        &self.series.open[self.start..self.end]
    }

    /// Highs in the window
    pub fn highs(&self) -> &'a [f64] {
        &self.series.high[self.start..self.end]
    }

    /// Lows in the window
    pub fn lows(&self) -> &'a [f64] {
        &self.series.low[self.start..self.end]
    }

    /// Closing prices in the window
    pub fn closes(&self) -> &'a [f64] {
        &self.series.close[self.start..self.end]
    }

    /// Volumes in the window
    pub fn volumes(&self) -> &'a [u64] {
        &self.series.volume[self.start..self.end]
    }

    /// First date in the window
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates().first().copied()
    }

    /// Last date in the window
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates().last().copied()
    }

    /// Iterate over the window as price points
    pub fn iter(&self) -> impl Iterator<Item = PricePoint> + use<'a> {
        let series = self.series;
        (self.start..self.end).map(move |i| series.point(i))
    }

    /// Copy the window into an owned series
    pub fn to_series(&self) -> TickerSeries {
        let points: Vec<PricePoint> = self.iter().collect();
        TickerSeries::from_sorted(self.series.ticker.clone(), &points)
    }
}
