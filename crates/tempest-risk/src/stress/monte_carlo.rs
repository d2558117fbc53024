//! Monte Carlo path generation
//!
//! Every path owns its own `StdRng`, seeded from the master seed and the
//! path index through SplitMix64. Path `i` therefore depends only on
//! `(seed, i)`, which keeps the path set reproducible and index-stable when
//! paths are generated on the rayon pool.

use crate::error::{Result, RiskError};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution as _, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tempest_data::ReturnSeries;
use tracing::{debug, info};

/// Distribution synthetic returns are drawn from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// Normal with the baseline's mean and sample standard deviation
    #[default]
    Normal,
    /// Resample observed baseline returns with replacement
    Bootstrap,
}

/// Monte Carlo scenario specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloSpec {
    /// Distribution assumption (default: normal)
    pub distribution: Distribution,

    /// Number of paths (default: 1000)
    pub paths: usize,

    /// Returns per path (default: 252)
    pub path_length: usize,

    /// Master seed; `None` draws a fresh one, so runs are not reproducible
    pub seed: Option<u64>,
}

impl Default for MonteCarloSpec {
    fn default() -> Self {
        Self {
            distribution: Distribution::Normal,
            paths: 1000,
            path_length: 252,
            seed: None,
        }
    }
}

/// Seed of path `index` under master seed `master` (SplitMix64 finalizer).
pub const fn path_seed(master: u64, index: usize) -> u64 {
    let mut z = master
        .wrapping_add((index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

enum Sampler<'a> {
    Normal(Normal<f64>),
    Bootstrap(&'a [f64]),
}

impl<'a> Sampler<'a> {
    fn fit(baseline: &'a ReturnSeries, distribution: Distribution) -> Result<Self> {
        let required = match distribution {
            Distribution::Normal => 2,
            Distribution::Bootstrap => 1,
        };
        if baseline.len() < required {
            return Err(RiskError::InsufficientData {
                series: baseline.name().to_string(),
                required,
                actual: baseline.len(),
            });
        }
        if let Some((date, _)) = baseline.iter().find(|(_, r)| !r.is_finite()) {
            return Err(RiskError::NonFiniteReturn {
                series: baseline.name().to_string(),
                date,
            });
        }

        match distribution {
            Distribution::Normal => {
                let returns = baseline.view();
                let mean = returns.mean().unwrap_or(0.0);
                let std_dev = returns.std(1.0);
                debug!(mean, std_dev, "fitted normal to baseline");
                Normal::new(mean, std_dev)
                    .map(Sampler::Normal)
                    .map_err(|e| RiskError::InvalidParameter(e.to_string()))
            }
            Distribution::Bootstrap => Ok(Sampler::Bootstrap(baseline.values())),
        }
    }

    fn draw(&self, rng: &mut StdRng) -> f64 {
        match self {
            Self::Normal(normal) => normal.sample(rng),
            Self::Bootstrap(observed) => observed[rng.gen_range(0..observed.len())],
        }
    }
}

/// `count` consecutive weekdays after `after`
fn synthetic_dates(after: NaiveDate, count: usize) -> Result<Vec<NaiveDate>> {
    let mut dates = Vec::with_capacity(count);
    let mut current = after;
    while dates.len() < count {
        current = current
            .checked_add_days(Days::new(1))
            .ok_or_else(|| RiskError::InvalidParameter("path runs past the calendar".to_string()))?;
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(current);
        }
    }
    Ok(dates)
}

pub(crate) fn simulate(
    baseline: &ReturnSeries,
    spec: &MonteCarloSpec,
    parallel_threshold: usize,
) -> Result<Vec<ReturnSeries>> {
    if spec.paths == 0 || spec.path_length == 0 {
        return Err(RiskError::InvalidParameter(format!(
            "monte carlo needs at least one path of positive length, got {} x {}",
            spec.paths, spec.path_length
        )));
    }

    let sampler = Sampler::fit(baseline, spec.distribution)?;
    let anchor = baseline.last_date().ok_or_else(|| RiskError::InsufficientData {
        series: baseline.name().to_string(),
        required: 1,
        actual: 0,
    })?;
    let dates = synthetic_dates(anchor, spec.path_length)?;
    let master = spec.seed.unwrap_or_else(rand::random);

    info!(
        baseline = baseline.name(),
        paths = spec.paths,
        path_length = spec.path_length,
        distribution = ?spec.distribution,
        seed = master,
        reproducible = spec.seed.is_some(),
        "simulating monte carlo paths"
    );

    let generate = |index: usize| -> Result<ReturnSeries> {
        let mut rng = StdRng::seed_from_u64(path_seed(master, index));
        let values = (0..spec.path_length).map(|_| sampler.draw(&mut rng)).collect();
        Ok(ReturnSeries::new(
            format!("{}#mc{index}", baseline.name()),
            baseline.method(),
            dates.clone(),
            values,
        )?)
    };

    if spec.paths >= parallel_threshold {
        (0..spec.paths).into_par_iter().map(generate).collect()
    } else {
        (0..spec.paths).map(generate).collect()
    }
}
