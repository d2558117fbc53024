//! Equal-weight AAPL/MSFT portfolio over ten trading days, checked against
//! returns worked out by hand.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tempest_data::{PricePoint, ReturnMethod, ReturnSeries, Ticker, TimeSeriesStore};
use tempest_risk::{
    PortfolioWeights, ReturnCalculator, RiskError, RiskMetric, RiskMetricEngine, aggregate,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn points(rows: &[(u32, f64)]) -> Vec<PricePoint> {
    rows.iter()
        .map(|&(d, close)| PricePoint::new(day(d), close, close, close, close, 1_000_000))
        .collect()
}

const TRADING_DAYS: [u32; 10] = [2, 3, 4, 5, 8, 9, 10, 11, 12, 16];
const AAPL: [f64; 10] = [100.0, 102.0, 101.0, 103.0, 106.0, 104.0, 105.0, 108.0, 107.0, 110.0];
const MSFT: [f64; 10] = [200.0, 198.0, 202.0, 204.0, 200.0, 206.0, 210.0, 208.0, 212.0, 214.0];

fn store() -> TimeSeriesStore {
    let mut store = TimeSeriesStore::new();

    // AAPL also trades on the 15th, which MSFT lacks; rows arrive unsorted
    let mut aapl: Vec<(u32, f64)> = TRADING_DAYS.iter().copied().zip(AAPL).collect();
    aapl.push((15, 109.0));
    aapl.reverse();
    store.load("AAPL", points(&aapl)).unwrap();

    let msft: Vec<(u32, f64)> = TRADING_DAYS.iter().copied().zip(MSFT).collect();
    store.load("MSFT", points(&msft)).unwrap();
    store
}

#[test]
fn test_equal_weight_portfolio_matches_hand_computed_series() {
    let store = store();
    let aligned = store.aligned(["AAPL", "MSFT"], None).unwrap();
    assert!(aligned.values().all(|s| s.len() == 10));

    let returns = ReturnCalculator::new(ReturnMethod::Simple)
        .compute_all(&aligned)
        .unwrap();
    let weights = PortfolioWeights::equal(["AAPL", "MSFT"]);
    let portfolio = aggregate(&returns, &weights).unwrap();

    let expected = [
        (2.0 / 100.0 - 2.0 / 200.0) / 2.0,
        (-1.0 / 102.0 + 4.0 / 198.0) / 2.0,
        (2.0 / 101.0 + 2.0 / 202.0) / 2.0,
        (3.0 / 103.0 - 4.0 / 204.0) / 2.0,
        (-2.0 / 106.0 + 6.0 / 200.0) / 2.0,
        (1.0 / 104.0 + 4.0 / 206.0) / 2.0,
        (3.0 / 105.0 - 2.0 / 210.0) / 2.0,
        (-1.0 / 108.0 + 4.0 / 208.0) / 2.0,
        (3.0 / 107.0 + 2.0 / 212.0) / 2.0,
    ];

    assert_eq!(portfolio.len(), expected.len());
    assert_eq!(portfolio.dates(), &TRADING_DAYS.map(day)[1..]);
    for (actual, expected) in portfolio.values().iter().zip(expected) {
        assert_relative_eq!(*actual, expected, epsilon = 1e-12);
    }

    // first return: AAPL +2%, MSFT -1%
    assert_relative_eq!(portfolio.values()[0], 0.005, epsilon = 1e-12);
}

#[test]
fn test_log_returns_telescope_to_price_ratio() {
    let store = store();
    let view = store.get("MSFT", None).unwrap();
    let returns = ReturnCalculator::new(ReturnMethod::Log)
        .compute(&view)
        .unwrap();
    let total: f64 = returns.values().iter().sum();
    assert_relative_eq!(total.exp(), 214.0 / 200.0, epsilon = 1e-12);
}

#[test]
fn test_unaligned_returns_are_rejected() {
    let store = store();
    let calculator = ReturnCalculator::new(ReturnMethod::Simple);
    let mut returns: BTreeMap<Ticker, ReturnSeries> = BTreeMap::new();
    for ticker in ["AAPL", "MSFT"] {
        let view = store.get(ticker, None).unwrap();
        returns.insert(ticker.into(), calculator.compute(&view).unwrap());
    }

    assert!(matches!(
        aggregate(&returns, &PortfolioWeights::equal(["AAPL", "MSFT"])),
        Err(RiskError::DateMisalignment { .. })
    ));
}

#[test]
fn test_empty_weights_and_bad_confidence() {
    let store = store();
    let aligned = store.aligned(["AAPL", "MSFT"], None).unwrap();
    let returns = ReturnCalculator::default().compute_all(&aligned).unwrap();

    assert_eq!(
        aggregate(&returns, &PortfolioWeights::new()),
        Err(RiskError::EmptyPortfolio)
    );

    let portfolio = aggregate(&returns, &PortfolioWeights::equal(["AAPL", "MSFT"])).unwrap();
    let engine = RiskMetricEngine::default();
    assert_eq!(
        engine.value_at_risk(&portfolio, 1.5),
        Err(RiskError::InvalidConfidence(1.5))
    );
    // nine observations are too few for a tail estimate
    assert!(matches!(
        engine.evaluate(&portfolio, &RiskMetric::ValueAtRisk { confidence: 0.95 }),
        Err(RiskError::InsufficientData { actual: 9, .. })
    ));
    // every portfolio return is positive
    assert_eq!(engine.max_drawdown(&portfolio).unwrap(), 0.0);
}
