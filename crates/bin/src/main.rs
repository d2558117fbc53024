//! Tempest CLI binary.
//!
//! Loads OHLCV history from CSV, builds a weighted portfolio and prints risk
//! reports, stress scenario results or factor fits as JSON.

mod ingest;
mod output;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use output::{ScenarioOutput, print_json};
use std::path::{Path, PathBuf};
use std::process;
use tempest::data::{DateRange, ReturnSeries, TimeSeriesStore};
use tempest::risk::{
    Distribution, HistoricalWindow, MonteCarloSpec, PortfolioWeights, RiskMetric, StressScenario,
};
use tempest::{Engine, EngineConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tempest")]
#[command(about = "Tempest: portfolio stress testing and risk metrics", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON engine configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log pipeline steps to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PortfolioArgs {
    /// OHLCV file with columns date,open,high,low,close,volume,Name
    #[arg(short, long)]
    data: PathBuf,

    /// Portfolio weight as TICKER=WEIGHT, repeatable (default: equal weights
    /// over every ticker in the file)
    #[arg(short, long = "weight", value_parser = parse_weight)]
    weights: Vec<(String, f64)>,

    /// First price date considered (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last price date considered (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MetricKind {
    /// Historical value at risk
    Var,
    /// Conditional value at risk
    Cvar,
    /// Annualized volatility
    Volatility,
    /// Maximum drawdown
    Drawdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DistributionKind {
    /// Normal fitted to the portfolio returns
    Normal,
    /// Resample observed portfolio returns
    Bootstrap,
}

#[derive(Subcommand)]
enum Commands {
    /// Report VaR, CVaR, volatility and maximum drawdown of the portfolio
    Metrics {
        #[command(flatten)]
        portfolio: PortfolioArgs,
    },

    /// Replay a historical window and score it
    Replay {
        #[command(flatten)]
        portfolio: PortfolioArgs,

        /// Window name
        #[arg(long, default_value = "window")]
        name: String,

        /// Window start (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Window end (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Metric to score
        #[arg(long, value_enum, default_value_t = MetricKind::Drawdown)]
        metric: MetricKind,
    },

    /// Simulate Monte Carlo paths from the portfolio and score them
    Simulate {
        #[command(flatten)]
        portfolio: PortfolioArgs,

        /// Number of paths (default: from config)
        #[arg(long)]
        paths: Option<usize>,

        /// Returns per path (default: from config)
        #[arg(long)]
        length: Option<usize>,

        /// Master seed for reproducible paths
        #[arg(long)]
        seed: Option<u64>,

        /// Distribution of synthetic returns (default: from config)
        #[arg(long, value_enum)]
        distribution: Option<DistributionKind>,

        /// Metric to score
        #[arg(long, value_enum, default_value_t = MetricKind::Var)]
        metric: MetricKind,
    },

    /// Regress portfolio returns on factor returns
    Fit {
        #[command(flatten)]
        portfolio: PortfolioArgs,

        /// Factor file with a date column and one column per factor
        #[arg(long)]
        factors: PathBuf,

        /// Factor values are in percent
        #[arg(long)]
        percent: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "reading configuration");
            EngineConfig::from_path(path)?
        }
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Metrics { portfolio } => {
            let store = load_store(&portfolio.data)?;
            let engine = Engine::new(&store, config)?;
            let returns = portfolio_returns(&engine, &portfolio)?;
            print_json(&engine.report(&returns)?)?;
        }
        Commands::Replay {
            portfolio,
            name,
            start,
            end,
            metric,
        } => {
            let store = load_store(&portfolio.data)?;
            let engine = Engine::new(&store, config)?;
            let returns = portfolio_returns(&engine, &portfolio)?;

            let scenario = StressScenario::Historical(HistoricalWindow::new(name, start, end));
            let metric = select_metric(metric, engine.config());
            let scores = engine.stress(&returns, &scenario, &metric)?;
            print_json(&ScenarioOutput::new(&scenario, &scores))?;
        }
        Commands::Simulate {
            portfolio,
            paths,
            length,
            seed,
            distribution,
            metric,
        } => {
            let store = load_store(&portfolio.data)?;
            let engine = Engine::new(&store, config)?;
            let returns = portfolio_returns(&engine, &portfolio)?;

            let spec = scenario_spec(
                &engine.config().monte_carlo,
                paths,
                length,
                seed,
                distribution,
            );
            let scenario = StressScenario::MonteCarlo(spec);
            let metric = select_metric(metric, engine.config());
            let scores = engine.stress(&returns, &scenario, &metric)?;
            print_json(&ScenarioOutput::new(&scenario, &scores))?;
        }
        Commands::Fit {
            portfolio,
            factors,
            percent,
        } => {
            let store = load_store(&portfolio.data)?;
            let engine = Engine::new(&store, config)?;
            let returns = portfolio_returns(&engine, &portfolio)?;

            let factors = ingest::load_factors(&factors, percent)?;
            print_json(&engine.fit_factors_aligned(&returns, &factors)?)?;
        }
    }

    Ok(())
}

fn load_store(path: &Path) -> Result<TimeSeriesStore, ingest::IngestError> {
    let mut store = TimeSeriesStore::new();
    ingest::load_prices(path, &mut store)?;
    Ok(store)
}

fn portfolio_returns(engine: &Engine<'_>, args: &PortfolioArgs) -> tempest::Result<ReturnSeries> {
    let weights = if args.weights.is_empty() {
        PortfolioWeights::equal(engine.store().tickers().cloned())
    } else {
        args.weights.iter().cloned().collect()
    };
    let range = date_range(args.from, args.to);
    engine.portfolio_returns(&weights, Some(&range))
}

const fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> DateRange {
    match (from, to) {
        (Some(start), Some(end)) => DateRange::between(start, end),
        (Some(start), None) => DateRange::starting(start),
        (None, Some(end)) => DateRange::until(end),
        (None, None) => DateRange::all(),
    }
}

fn parse_weight(arg: &str) -> Result<(String, f64), String> {
    let (ticker, weight) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected TICKER=WEIGHT, got {arg:?}"))?;
    let ticker = ticker.trim();
    if ticker.is_empty() {
        return Err(format!("missing ticker in {arg:?}"));
    }
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("weight for {ticker} is not a number: {weight:?}"))?;
    Ok((ticker.to_string(), weight))
}

const fn select_metric(kind: MetricKind, config: &EngineConfig) -> RiskMetric {
    match kind {
        MetricKind::Var => RiskMetric::ValueAtRisk {
            confidence: config.confidence,
        },
        MetricKind::Cvar => RiskMetric::ConditionalVar {
            confidence: config.confidence,
        },
        MetricKind::Volatility => RiskMetric::Volatility {
            annualization: config.annualization,
        },
        MetricKind::Drawdown => RiskMetric::MaxDrawdown,
    }
}

fn scenario_spec(
    base: &MonteCarloSpec,
    paths: Option<usize>,
    length: Option<usize>,
    seed: Option<u64>,
    distribution: Option<DistributionKind>,
) -> MonteCarloSpec {
    MonteCarloSpec {
        distribution: match distribution {
            Some(DistributionKind::Normal) => Distribution::Normal,
            Some(DistributionKind::Bootstrap) => Distribution::Bootstrap,
            None => base.distribution,
        },
        paths: paths.unwrap_or(base.paths),
        path_length: length.unwrap_or(base.path_length),
        seed: seed.or(base.seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case("AAPL=0.6", ("AAPL", 0.6))]
    #[case(" MSFT = -0.25 ", ("MSFT", -0.25))]
    #[case("BRK.B=1e-1", ("BRK.B", 0.1))]
    fn test_parse_weight(#[case] arg: &str, #[case] expected: (&str, f64)) {
        let (ticker, weight) = parse_weight(arg).unwrap();
        assert_eq!(ticker, expected.0);
        assert_eq!(weight, expected.1);
    }

    #[rstest]
    #[case("AAPL")]
    #[case("=0.5")]
    #[case("AAPL=half")]
    fn test_parse_weight_rejects(#[case] arg: &str) {
        assert!(parse_weight(arg).is_err());
    }

    #[test]
    fn test_simulate_args() {
        let cli = Cli::try_parse_from([
            "tempest",
            "simulate",
            "--data",
            "prices.csv",
            "-w",
            "AAPL=0.5",
            "-w",
            "MSFT=0.5",
            "--paths",
            "250",
            "--seed",
            "7",
            "--distribution",
            "bootstrap",
            "--metric",
            "cvar",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Commands::Simulate {
            portfolio,
            paths,
            seed,
            distribution,
            metric,
            ..
        } = cli.command
        else {
            panic!("expected simulate");
        };
        assert_eq!(portfolio.weights.len(), 2);
        assert_eq!(paths, Some(250));
        assert_eq!(seed, Some(7));
        assert_eq!(distribution, Some(DistributionKind::Bootstrap));
        assert_eq!(metric, MetricKind::Cvar);
    }

    #[test]
    fn test_scenario_spec_overrides_config() {
        let base = MonteCarloSpec {
            seed: Some(1),
            ..MonteCarloSpec::default()
        };
        let spec = scenario_spec(&base, Some(10), None, None, Some(DistributionKind::Bootstrap));
        assert_eq!(spec.paths, 10);
        assert_eq!(spec.path_length, 252);
        assert_eq!(spec.seed, Some(1));
        assert_eq!(spec.distribution, Distribution::Bootstrap);
    }

    #[test]
    fn test_select_metric_uses_config() {
        let config = EngineConfig {
            confidence: 0.975,
            ..EngineConfig::default()
        };
        assert_eq!(
            select_metric(MetricKind::Cvar, &config),
            RiskMetric::ConditionalVar { confidence: 0.975 }
        );
        assert_eq!(select_metric(MetricKind::Drawdown, &config), RiskMetric::MaxDrawdown);
    }

    #[test]
    fn test_date_range_bounds() {
        let day = NaiveDate::from_ymd_opt(2020, 3, 16).unwrap();
        assert_eq!(date_range(Some(day), None).start(), Some(day));
        assert_eq!(date_range(None, None).end(), None);
    }
}
