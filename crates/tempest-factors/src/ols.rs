//! Ordinary least squares factor regression
//!
//! The asset series `y` (n observations) is regressed on an intercept plus k
//! factor series:
//!
//! β = (XᵀX)⁻¹ Xᵀy,  X = [1 | f_1 | ... | f_k]  (n x (k + 1))
//!
//! XᵀX is inverted by Gauss-Jordan elimination with partial pivoting after
//! scaling it to unit diagonal, so the singularity tolerance does not depend
//! on the magnitude of the factor returns.

use crate::error::{FactorError, Result};
use ndarray::{Array1, Array2, Axis, Slice};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tempest_data::ReturnSeries;
use tracing::debug;

/// Factor fitter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitterConfig {
    /// Smallest pivot of the unit-diagonal normal matrix accepted before the
    /// design is declared singular (default: 1e-10)
    pub singular_tolerance: f64,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            singular_tolerance: 1e-10,
        }
    }
}

/// Coefficient standard errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardErrors {
    /// Standard error of the intercept
    pub intercept: f64,
    /// Standard error per factor
    pub coefficients: BTreeMap<String, f64>,
}

/// Fitted factor model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorFit {
    /// Name of the fitted series
    pub series: String,
    /// Regression intercept (alpha)
    pub intercept: f64,
    /// Factor loadings (betas) by factor name
    pub coefficients: BTreeMap<String, f64>,
    /// Coefficient of determination; 0 when the asset returns are constant
    pub r_squared: f64,
    /// R² adjusted for the number of factors; `None` without residual degrees
    /// of freedom
    pub adjusted_r_squared: Option<f64>,
    /// √(SSR / (n - k - 1)); `None` without residual degrees of freedom
    pub residual_std_error: Option<f64>,
    /// Coefficient standard errors; `None` without residual degrees of freedom
    pub standard_errors: Option<StandardErrors>,
    /// Observations used
    pub observations: usize,
}

impl FactorFit {
    /// Loading on a factor
    pub fn beta(&self, factor: &str) -> Option<f64> {
        self.coefficients.get(factor).copied()
    }

    /// Residual degrees of freedom, n - k - 1
    pub fn degrees_of_freedom(&self) -> usize {
        self.observations.saturating_sub(self.coefficients.len() + 1)
    }
}

/// OLS factor model fitter
#[derive(Debug, Clone, Default)]
pub struct FactorModelFitter {
    config: FitterConfig,
}

impl FactorModelFitter {
    /// Create a fitter with the given configuration
    pub const fn new(config: FitterConfig) -> Self {
        Self { config }
    }

    /// Fitter configuration
    pub const fn config(&self) -> &FitterConfig {
        &self.config
    }

    /// Regress `asset` on an intercept plus every series in `factors`.
    ///
    /// # Errors
    /// * [`FactorError::NoFactors`] if `factors` is empty
    /// * [`FactorError::DateMisalignment`] if a factor's dates differ from the
    ///   asset's
    /// * [`FactorError::InsufficientData`] with fewer than k + 1 observations
    /// * [`FactorError::NonFiniteReturn`] if any value is NaN or infinite
    /// * [`FactorError::SingularDesign`] if the design matrix is rank deficient
    pub fn fit(
        &self,
        asset: &ReturnSeries,
        factors: &BTreeMap<String, ReturnSeries>,
    ) -> Result<FactorFit> {
        if factors.is_empty() {
            return Err(FactorError::NoFactors);
        }
        for (name, factor) in factors {
            if factor.dates() != asset.dates() {
                return Err(FactorError::DateMisalignment {
                    series: name.clone(),
                });
            }
        }

        let n = asset.len();
        let k = factors.len();
        if n < k + 1 {
            return Err(FactorError::InsufficientData {
                required: k + 1,
                actual: n,
            });
        }

        require_finite(asset.name(), asset)?;
        for (name, factor) in factors {
            require_finite(name, factor)?;
        }

        let mut design = Array2::<f64>::ones((n, k + 1));
        for (j, factor) in factors.values().enumerate() {
            design.column_mut(j + 1).assign(&factor.view());
        }
        let y = asset.view();

        let normal = design.t().dot(&design);
        let inverse = invert_normal_matrix(&normal, self.config.singular_tolerance)?;
        let beta = inverse.dot(&design.t().dot(&y));

        let residuals = &y - &design.dot(&beta);
        let ssr = residuals.dot(&residuals);
        let mean = y.mean().unwrap_or(0.0);
        let sst = y.mapv(|v| (v - mean).powi(2)).sum();
        let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { 0.0 };

        let dof = n - k - 1;
        let (adjusted_r_squared, residual_std_error, standard_errors) = if dof > 0 {
            let sigma2 = ssr / dof as f64;
            let se: Array1<f64> = inverse.diag().mapv(|v| (sigma2 * v).sqrt());
            (
                Some(1.0 - (1.0 - r_squared) * (n - 1) as f64 / dof as f64),
                Some(sigma2.sqrt()),
                Some(StandardErrors {
                    intercept: se[0],
                    coefficients: factors
                        .keys()
                        .zip(se.iter().skip(1))
                        .map(|(name, s)| (name.clone(), *s))
                        .collect(),
                }),
            )
        } else {
            (None, None, None)
        };

        debug!(
            series = asset.name(),
            factors = k,
            observations = n,
            r_squared,
            "fitted factor model"
        );

        Ok(FactorFit {
            series: asset.name().to_string(),
            intercept: beta[0],
            coefficients: factors
                .keys()
                .zip(beta.iter().skip(1))
                .map(|(name, b)| (name.clone(), *b))
                .collect(),
            r_squared,
            adjusted_r_squared,
            residual_std_error,
            standard_errors,
            observations: n,
        })
    }
}

fn require_finite(name: &str, series: &ReturnSeries) -> Result<()> {
    match series.iter().find(|(_, v)| !v.is_finite()) {
        Some((date, _)) => Err(FactorError::NonFiniteReturn {
            series: name.to_string(),
            date,
        }),
        None => Ok(()),
    }
}

/// Invert a symmetric positive semi-definite matrix, failing when it is
/// numerically singular.
///
/// A = D C D with D = diag(A)^½ and C on unit diagonal; C is inverted by
/// Gauss-Jordan elimination and A⁻¹ = D⁻¹ C⁻¹ D⁻¹.
fn invert_normal_matrix(matrix: &Array2<f64>, tolerance: f64) -> Result<Array2<f64>> {
    let n = matrix.nrows();
    let diag = matrix.diag().to_owned();
    if diag.iter().any(|&d| d <= 0.0) {
        return Err(FactorError::SingularDesign);
    }
    let scale = diag.mapv(f64::sqrt);

    // augmented [C | I]
    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = matrix[[i, j]] / (scale[i] * scale[j]);
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| aug[[a, col]].abs().total_cmp(&aug[[b, col]].abs()))
            .unwrap_or(col);
        if pivot_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        // NaN fails the comparison too
        if !(pivot.abs() > tolerance) {
            return Err(FactorError::SingularDesign);
        }

        aug.row_mut(col).mapv_inplace(|v| v / pivot);
        let pivot_values = aug.row(col).to_owned();
        for (row, mut values) in aug.axis_iter_mut(Axis(0)).enumerate() {
            if row == col {
                continue;
            }
            let factor = values[col];
            if factor != 0.0 {
                values.scaled_add(-factor, &pivot_values);
            }
        }
    }

    let mut inverse = aug.slice_axis(Axis(1), Slice::from(n..)).to_owned();
    for i in 0..n {
        for j in 0..n {
            inverse[[i, j]] /= scale[i] * scale[j];
        }
    }
    Ok(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Days, NaiveDate};
    use ndarray::array;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        (0..n as u64)
            .map(|i| start.checked_add_days(Days::new(i)).unwrap())
            .collect()
    }

    fn series(name: &str, values: Vec<f64>) -> ReturnSeries {
        let n = values.len();
        ReturnSeries::new(name, tempest_data::ReturnMethod::Simple, dates(n), values).unwrap()
    }

    #[test]
    fn test_invert_recovers_known_inverse() {
        let m = array![[4.0, 2.0], [2.0, 3.0]];
        let inv = invert_normal_matrix(&m, 1e-10).unwrap();
        // det = 8
        assert_relative_eq!(inv[[0, 0]], 3.0 / 8.0, epsilon = 1e-14);
        assert_relative_eq!(inv[[0, 1]], -2.0 / 8.0, epsilon = 1e-14);
        assert_relative_eq!(inv[[1, 1]], 4.0 / 8.0, epsilon = 1e-14);

        let identity = m.dot(&inv);
        assert_relative_eq!(identity[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(identity[[1, 0]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invert_unscales_wide_diagonal() {
        let m = array![[400.0, 2.0, 0.0], [2.0, 1.0, 0.05], [0.0, 0.05, 0.01]];
        let inv = invert_normal_matrix(&m, 1e-10).unwrap();
        assert_eq!(inv.dim(), (3, 3));

        let identity = m.dot(&inv);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(identity[[i, j]], expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_invert_rejects_singular() {
        let m = array![[1.0, 2.0], [2.0, 4.0]];
        assert_eq!(
            invert_normal_matrix(&m, 1e-10),
            Err(FactorError::SingularDesign)
        );
        let zero = array![[1.0, 0.0], [0.0, 0.0]];
        assert_eq!(
            invert_normal_matrix(&zero, 1e-10),
            Err(FactorError::SingularDesign)
        );
    }

    #[test]
    fn test_single_factor_beta_matches_covariance_ratio() {
        let market = vec![0.01, -0.02, 0.03, 0.0, 0.015, -0.005];
        let asset = vec![0.012, -0.03, 0.041, 0.002, 0.018, -0.01];

        let n = market.len() as f64;
        let mm = market.iter().sum::<f64>() / n;
        let ma = asset.iter().sum::<f64>() / n;
        let cov: f64 = market.iter().zip(&asset).map(|(m, a)| (m - mm) * (a - ma)).sum();
        let var: f64 = market.iter().map(|m| (m - mm).powi(2)).sum();
        let beta = cov / var;

        let factors = BTreeMap::from([("mkt".to_string(), series("mkt", market))]);
        let fit = FactorModelFitter::default()
            .fit(&series("asset", asset), &factors)
            .unwrap();

        assert_relative_eq!(fit.beta("mkt").unwrap(), beta, epsilon = 1e-10);
        assert_relative_eq!(fit.intercept, ma - beta * mm, epsilon = 1e-10);
        assert_eq!(fit.degrees_of_freedom(), 4);
    }

    #[test]
    fn test_exactly_determined_has_no_error_estimates() {
        let factors = BTreeMap::from([
            ("a".to_string(), series("a", vec![0.01, 0.02, -0.01])),
            ("b".to_string(), series("b", vec![0.03, -0.01, 0.00])),
        ]);
        let fit = FactorModelFitter::default()
            .fit(&series("y", vec![0.02, 0.01, -0.02]), &factors)
            .unwrap();

        assert_eq!(fit.observations, 3);
        assert!(fit.residual_std_error.is_none());
        assert!(fit.standard_errors.is_none());
        assert!(fit.adjusted_r_squared.is_none());
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_constant_asset_has_zero_r_squared() {
        let factors = BTreeMap::from([(
            "mkt".to_string(),
            series("mkt", vec![0.01, -0.02, 0.03, 0.0]),
        )]);
        let fit = FactorModelFitter::default()
            .fit(&series("flat", vec![0.25; 4]), &factors)
            .unwrap();
        assert_eq!(fit.r_squared, 0.0);
        assert_relative_eq!(fit.intercept, 0.25, epsilon = 1e-12);
        assert_relative_eq!(fit.beta("mkt").unwrap(), 0.0, epsilon = 1e-10);
    }
}
