//! Common data types shared between the phase-space engine and fit models

use crate::{Error, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// One neighbor handed to a local fit: its observables and prior weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborSample {
    /// Primary observable (e.g. invariant mass).
    pub mass: f64,
    /// Secondary observable for two-dimensional fits.
    pub mass2: Option<f64>,
    /// Prior event weight.
    pub weight: f64,
}

/// Convergence status reported by a local fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    /// Minimizer converged.
    Ok,
    /// Minimizer failed or stopped early.
    Failed,
}

/// Quality of the covariance matrix reported alongside a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CovarianceQuality {
    /// No covariance was computed.
    NotAvailable,
    /// Approximation only, not accurate.
    Approximate,
    /// Full matrix, forced positive-definite.
    ForcedPositiveDefinite,
    /// Full, accurate covariance matrix.
    Full,
}

/// Best-fit value of one free parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEstimate {
    /// Parameter name.
    pub name: String,
    /// Best-fit value.
    pub value: f64,
    /// Best-fit uncertainty.
    pub uncertainty: f64,
}

impl ParameterEstimate {
    /// Create a new estimate
    pub fn new(name: impl Into<String>, value: f64, uncertainty: f64) -> Self {
        Self { name: name.into(), value, uncertainty }
    }
}

/// Result of fitting a signal+background model to one neighborhood.
///
/// `weight` is the signal probability at the query observable and is not
/// clamped here; the weighting engine clamps it to `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFitResult {
    /// Signal fraction at the query observable (Q-factor).
    pub weight: f64,

    /// Uncertainty on `weight` as reported by the model.
    pub weight_uncertainty: f64,

    /// Convergence status
    pub status: FitStatus,

    /// Free parameters in covariance order.
    pub parameters: Vec<ParameterEstimate>,

    /// Covariance matrix over `parameters` (row-major, N×N).
    pub covariance: Vec<f64>,

    /// Covariance quality
    pub covariance_quality: CovarianceQuality,
}

impl LocalFitResult {
    /// Create a converged result without parameters (fixed-shape models).
    pub fn new(weight: f64, weight_uncertainty: f64) -> Self {
        Self {
            weight,
            weight_uncertainty,
            status: FitStatus::Ok,
            parameters: Vec::new(),
            covariance: Vec::new(),
            covariance_quality: CovarianceQuality::NotAvailable,
        }
    }

    /// Attach free parameters and their covariance matrix.
    pub fn with_covariance(
        mut self,
        parameters: Vec<ParameterEstimate>,
        covariance: Vec<f64>,
        quality: CovarianceQuality,
    ) -> Self {
        self.parameters = parameters;
        self.covariance = covariance;
        self.covariance_quality = quality;
        self
    }

    /// Mark the result with a status.
    pub fn with_status(mut self, status: FitStatus) -> Self {
        self.status = status;
        self
    }

    /// `true` if the fit converged
    pub fn converged(&self) -> bool {
        self.status == FitStatus::Ok
    }

    /// Number of free parameters
    pub fn n_parameters(&self) -> usize {
        self.parameters.len()
    }

    /// Look up a free parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ParameterEstimate> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Best-fit values in covariance order.
    pub fn parameter_values(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.value).collect()
    }

    /// Best-fit uncertainties in covariance order.
    pub fn parameter_uncertainties(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.uncertainty).collect()
    }

    /// Covariance as a dense matrix.
    pub fn covariance_matrix(&self) -> Result<DMatrix<f64>> {
        self.validate()?;
        let n = self.n_parameters();
        Ok(DMatrix::from_row_slice(n, n, &self.covariance))
    }

    /// Check that the covariance is N×N over the free parameters and symmetric.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_parameters();
        if self.covariance.len() != n * n {
            return Err(Error::Validation(format!(
                "covariance has {} entries, expected {n}x{n}",
                self.covariance.len()
            )));
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let a = self.covariance[i * n + j];
                let b = self.covariance[j * n + i];
                let tol = 1e-9 * a.abs().max(b.abs()).max(1e-300);
                if (a - b).abs() > tol {
                    return Err(Error::Validation(format!(
                        "covariance is not symmetric at ({i}, {j}): {a} vs {b}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_param_result() -> LocalFitResult {
        LocalFitResult::new(0.8, 0.05).with_covariance(
            vec![ParameterEstimate::new("sigma", 10.0, 1.0), ParameterEstimate::new("frac", 0.6, 0.1)],
            vec![1.0, 0.02, 0.02, 0.01],
            CovarianceQuality::Full,
        )
    }

    #[test]
    fn test_fit_result_accessors() {
        let r = two_param_result();
        assert!(r.converged());
        assert_eq!(r.n_parameters(), 2);
        assert_eq!(r.parameter("frac").map(|p| p.value), Some(0.6));
        assert!(r.parameter("gamma").is_none());
        assert_eq!(r.parameter_values(), vec![10.0, 0.6]);
        assert_eq!(r.parameter_uncertainties(), vec![1.0, 0.1]);

        let cov = r.covariance_matrix().unwrap();
        assert_relative_eq!(cov[(0, 1)], 0.02);
        assert_relative_eq!(cov[(1, 1)], 0.01);
    }

    #[test]
    fn test_validate_tolerates_rounding_asymmetry() {
        let mut r = two_param_result();
        r.covariance = vec![1.0, 0.02, 0.02 * (1.0 + 1e-12), 0.01];
        assert!(r.validate().is_ok());

        let cov = r.covariance_matrix().unwrap();
        assert_relative_eq!(cov[(0, 1)], cov[(1, 0)], max_relative = 1e-9);
    }

    #[test]
    fn test_validate_rejects_bad_covariance() {
        let mut r = two_param_result();
        r.covariance = vec![1.0, 0.02, 0.03, 0.01];
        assert!(matches!(r.validate(), Err(Error::Validation(_))));

        r.covariance = vec![1.0];
        assert!(matches!(r.covariance_matrix(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_failed_status() {
        let r = LocalFitResult::new(0.3, 0.0).with_status(FitStatus::Failed);
        assert!(!r.converged());
    }
}
