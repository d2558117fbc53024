//! Store to reports through the engine pipeline.

use approx::assert_relative_eq;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::BTreeMap;
use tempest::data::{DateRange, PricePoint, ReturnMethod, ReturnSeries, TimeSeriesStore};
use tempest::risk::{
    Distribution, HistoricalWindow, MonteCarloSpec, PortfolioWeights, RiskError, RiskMetric,
};
use tempest::{Engine, EngineConfig, Error};

fn trading_days(n: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(n);
    let mut current = NaiveDate::from_ymd_opt(2019, 1, 2).unwrap();
    while days.len() < n {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(current);
        }
        current = current.checked_add_days(Days::new(1)).unwrap();
    }
    days
}

fn prices(dates: &[NaiveDate], start: f64, amplitude: f64, speed: f64) -> Vec<PricePoint> {
    dates
        .iter()
        .enumerate()
        .map(|(i, &date)| {
            let close = start * (1.0 + amplitude * (i as f64 * speed).sin() + 0.0005 * i as f64);
            PricePoint::new(date, close, close * 1.02, close * 0.98, close, 5_000)
        })
        .collect()
}

fn store() -> TimeSeriesStore {
    let dates = trading_days(300);
    let mut store = TimeSeriesStore::new();
    store.load("AAA", prices(&dates, 50.0, 0.10, 0.05)).unwrap();
    store.load("BBB", prices(&dates, 120.0, 0.06, 0.11)).unwrap();
    // CCC listed later
    store.load("CCC", prices(&dates[100..], 30.0, 0.08, 0.07)).unwrap();
    store
}

#[test]
fn test_report_covers_all_metrics() {
    let store = store();
    let engine = Engine::with_defaults(&store);
    let weights = PortfolioWeights::new().with("AAA", 0.5).with("BBB", 0.5);
    let portfolio = engine.portfolio_returns(&weights, None).unwrap();
    assert_eq!(portfolio.len(), 299);

    let reports = engine.report(&portfolio).unwrap();
    let names: Vec<&str> = reports.iter().map(|r| r.metric.as_str()).collect();
    assert_eq!(
        names,
        ["value_at_risk", "conditional_var", "volatility", "max_drawdown"]
    );
    assert!(reports[1].value <= reports[0].value);
    assert!(reports[2].value > 0.0);
    assert!(reports[3].value <= 0.0);
    assert!(reports.iter().all(|r| r.series == "portfolio"));
}

#[test]
fn test_portfolio_uses_common_calendar() {
    let store = store();
    let engine = Engine::with_defaults(&store);
    let weights = PortfolioWeights::equal(["AAA", "CCC"]);
    let portfolio = engine.portfolio_returns(&weights, None).unwrap();
    // CCC has 200 prices
    assert_eq!(portfolio.len(), 199);

    let range = DateRange::starting(trading_days(300)[250]);
    let recent = engine.portfolio_returns(&weights, Some(&range)).unwrap();
    assert_eq!(recent.len(), 49);
}

#[test]
fn test_zero_weight_ticker_need_not_be_loaded() {
    let store = store();
    let engine = Engine::with_defaults(&store);
    let weights = PortfolioWeights::new().with("AAA", 1.0).with("ZZZ", 0.0);
    let portfolio = engine.portfolio_returns(&weights, None).unwrap();
    let aaa = engine.ticker_returns("AAA", None).unwrap();
    assert_eq!(portfolio.values(), aaa.values());
}

#[test]
fn test_pipeline_errors_are_unified() {
    let store = store();
    let engine = Engine::with_defaults(&store);

    assert!(matches!(
        engine.portfolio_returns(&PortfolioWeights::new(), None),
        Err(Error::Risk(RiskError::EmptyPortfolio))
    ));
    assert!(matches!(
        engine.portfolio_returns(&PortfolioWeights::new().with("NOPE", 1.0), None),
        Err(Error::Data(_))
    ));

    let aaa = engine.ticker_returns("AAA", None).unwrap();
    assert!(matches!(
        engine.evaluate(&aaa, &RiskMetric::ValueAtRisk { confidence: 1.5 }),
        Err(Error::Risk(RiskError::InvalidConfidence(_)))
    ));
}

#[test]
fn test_configured_engine() {
    let store = store();
    let config = EngineConfig::from_json_str(
        r#"{
            "return_method": "log",
            "confidence": 0.99,
            "monte_carlo": {
                "distribution": "bootstrap",
                "paths": 40,
                "path_length": 60,
                "seed": 9
            }
        }"#,
    )
    .unwrap();
    let engine = Engine::new(&store, config).unwrap();

    let aaa = engine.ticker_returns("AAA", None).unwrap();
    assert_eq!(aaa.method(), ReturnMethod::Log);

    let var = RiskMetric::ValueAtRisk { confidence: 0.99 };
    let first = engine.simulate(&aaa, None, &var).unwrap();
    let second = engine.simulate(&aaa, None, &var).unwrap();
    assert_eq!(first.outcomes.len(), 40);
    assert_eq!(first, second);

    let explicit = MonteCarloSpec {
        distribution: Distribution::Normal,
        paths: 5,
        path_length: 30,
        seed: Some(1),
    };
    let scores = engine.simulate(&aaa, Some(&explicit), &var).unwrap();
    assert_eq!(scores.outcomes.len(), 5);
}

#[test]
fn test_invalid_engine_config() {
    let store = store();
    let config = EngineConfig {
        confidence: 2.0,
        ..EngineConfig::default()
    };
    assert!(matches!(Engine::new(&store, config), Err(Error::Config(_))));
}

#[test]
fn test_replay_window() {
    let store = store();
    let engine = Engine::with_defaults(&store);
    let aaa = engine.ticker_returns("AAA", None).unwrap();
    let days = trading_days(300);

    let window = HistoricalWindow::new("spring", days[40], days[80]);
    let scores = engine
        .replay(&aaa, &window, &RiskMetric::MaxDrawdown)
        .unwrap();
    let report = scores.reports().next().unwrap();
    assert_eq!(report.series, "AAA@spring");
    assert_eq!(report.observations, 41);
}

#[test]
fn test_fit_recovers_portfolio_loadings() {
    let store = store();
    let engine = Engine::with_defaults(&store);
    let aaa = engine.ticker_returns("AAA", None).unwrap();
    let bbb = engine.ticker_returns("BBB", None).unwrap();

    // asset = 0.7 AAA + 0.3 BBB exactly
    let weights = PortfolioWeights::new().with("AAA", 0.7).with("BBB", 0.3);
    let portfolio = engine.portfolio_returns(&weights, None).unwrap();

    let factors = BTreeMap::from([
        ("aaa".to_string(), aaa.clone()),
        ("bbb".to_string(), bbb.clone()),
    ]);
    let fit = engine.fit_factors(&portfolio, &factors).unwrap();
    assert_relative_eq!(fit.beta("aaa").unwrap(), 0.7, epsilon = 1e-8);
    assert_relative_eq!(fit.beta("bbb").unwrap(), 0.3, epsilon = 1e-8);
    assert_relative_eq!(fit.intercept, 0.0, epsilon = 1e-10);

    // a factor on a shorter calendar must be aligned first
    let short = ReturnSeries::new(
        "short",
        ReturnMethod::Simple,
        aaa.dates()[50..].to_vec(),
        aaa.values()[50..].to_vec(),
    )
    .unwrap();
    let mixed = BTreeMap::from([("short".to_string(), short)]);
    assert!(matches!(
        engine.fit_factors(&bbb, &mixed),
        Err(Error::Factor(_))
    ));
    let fit = engine.fit_factors_aligned(&bbb, &mixed).unwrap();
    assert_eq!(fit.observations, aaa.len() - 50);
}
