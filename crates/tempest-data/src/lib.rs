#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tempest/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod price;
pub mod returns;
pub mod store;

pub use error::{DataError, Result};
pub use price::{PricePoint, SeriesView, Ticker, TickerSeries};
pub use returns::{ReturnMethod, ReturnSeries, common_dates};
pub use store::{DateRange, TimeSeriesStore};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
