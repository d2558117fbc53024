//! In-memory time series store.
//!
//! The store is owned by the caller and passed by reference to every
//! computation. Loading happens in a single phase before any reads; once
//! loaded, series are immutable and the store can be shared across threads.

use crate::error::{DataError, Result};
use crate::price::{PricePoint, SeriesView, Ticker, TickerSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Inclusive date range with optional open ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRange {
    /// Unbounded range
    pub const fn all() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Range covering `[start, end]`
    pub const fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Range starting at `start` with no upper bound
    pub const fn starting(start: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Range ending at `end` with no lower bound
    pub const fn until(end: NaiveDate) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Lower bound, if any
    pub const fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    /// Upper bound, if any
    pub const fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// Whether `date` falls inside the range
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

/// Caller-owned collection of ticker series
#[derive(Debug, Default)]
pub struct TimeSeriesStore {
    series: BTreeMap<Ticker, TickerSeries>,
}

impl TimeSeriesStore {
    /// Create an empty store
    pub const fn new() -> Self {
        Self {
            series: BTreeMap::new(),
        }
    }

    /// Load a ticker's price history, replacing any previous series.
    ///
    /// A failed load leaves the store unchanged.
    ///
    /// # Errors
    /// * [`DataError::DuplicateDate`] if two points share a date
    /// * [`DataError::InvalidPrice`] if a point violates the OHLC invariants
    pub fn load(&mut self, ticker: impl Into<Ticker>, points: Vec<PricePoint>) -> Result<()> {
        let series = TickerSeries::try_new(ticker, points)?;
        debug!(
            ticker = %series.ticker(),
            points = series.len(),
            "loaded price series"
        );
        self.series.insert(series.ticker().clone(), series);
        Ok(())
    }

    /// Drop a ticker's series, returning it if it was loaded
    pub fn unload(&mut self, ticker: &str) -> Option<TickerSeries> {
        self.series.remove(ticker)
    }

    /// Borrow a ticker's series, optionally restricted to a date range.
    ///
    /// # Errors
    /// * [`DataError::UnknownTicker`] if the ticker was never loaded
    pub fn get(&self, ticker: &str, range: Option<&DateRange>) -> Result<SeriesView<'_>> {
        let series = self.series(ticker)?;
        Ok(range.map_or_else(|| series.view(), |r| series.view_range(r)))
    }

    /// Borrow a ticker's full series.
    ///
    /// # Errors
    /// * [`DataError::UnknownTicker`] if the ticker was never loaded
    pub fn series(&self, ticker: &str) -> Result<&TickerSeries> {
        self.series
            .get(ticker)
            .ok_or_else(|| DataError::UnknownTicker(ticker.to_string()))
    }

    /// Dates present in every requested ticker's series.
    ///
    /// Tickers trade on different calendars (IPOs, delistings, halts), so this
    /// intersection must be taken before combining series date by date.
    /// An empty ticker set yields an empty date set.
    ///
    /// # Errors
    /// * [`DataError::UnknownTicker`] if any ticker was never loaded
    pub fn align_dates<'t, I>(&self, tickers: I) -> Result<BTreeSet<NaiveDate>>
    where
        I: IntoIterator<Item = &'t str>,
    {
        let mut common: Option<BTreeSet<NaiveDate>> = None;

        for ticker in tickers {
            let dates = self.series(ticker)?.dates();
            common = Some(match common {
                None => dates.iter().copied().collect(),
                Some(acc) => dates.iter().copied().filter(|d| acc.contains(d)).collect(),
            });
        }

        Ok(common.unwrap_or_default())
    }

    /// Series for each ticker restricted to the dates they all share and to
    /// the optional range.
    ///
    /// # Errors
    /// * [`DataError::UnknownTicker`] if any ticker was never loaded
    pub fn aligned<'t, I>(
        &self,
        tickers: I,
        range: Option<&DateRange>,
    ) -> Result<BTreeMap<Ticker, TickerSeries>>
    where
        I: IntoIterator<Item = &'t str>,
    {
        let tickers: Vec<&str> = tickers.into_iter().collect();
        let mut dates = self.align_dates(tickers.iter().copied())?;
        if let Some(range) = range {
            dates.retain(|d| range.contains(*d));
        }

        debug!(
            tickers = tickers.len(),
            common_dates = dates.len(),
            "aligned ticker calendars"
        );

        tickers
            .into_iter()
            .map(|t| {
                let series = self.series(t)?;
                Ok((series.ticker().clone(), series.restrict_to(&dates)))
            })
            .collect()
    }

    /// Whether the ticker is loaded
    pub fn contains(&self, ticker: &str) -> bool {
        self.series.contains_key(ticker)
    }

    /// Loaded tickers in ascending order
    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.series.keys()
    }

    /// Number of loaded tickers
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether no ticker is loaded
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
