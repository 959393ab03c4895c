//! Gaussian error propagation through an opaque scalar function of fit
//! parameters.
//!
//! For each free parameter `i` the derivative is taken by central differences
//! with step `ε_i = 0.01 σ_i`, all other parameters held at their best-fit
//! values:
//!
//! ```text
//! d_i = (f(p + ε_i e_i) - f(p - ε_i e_i)) / (2 ε_i)
//! Var = Σ_i Σ_j d_i C_ij d_j
//! ```

use nalgebra::{DMatrix, DVector};
use wb_core::{Error, LocalFitModel, LocalFitResult, Result};

/// Step size as a fraction of the parameter uncertainty.
pub const STEP_FRACTION: f64 = 0.01;

/// Central-difference derivatives of `f` at `params`.
///
/// `params` is perturbed in place one entry at a time and every entry is
/// restored to its best-fit value before the next one is touched. Parameters
/// with a non-positive or non-finite uncertainty get derivative `0`.
pub fn derivatives<F>(mut f: F, params: &mut [f64], uncertainties: &[f64]) -> Result<Vec<f64>>
where
    F: FnMut(&[f64]) -> Result<f64>,
{
    if params.len() != uncertainties.len() {
        return Err(Error::Validation(format!(
            "{} parameters but {} uncertainties",
            params.len(),
            uncertainties.len()
        )));
    }

    let mut grad = Vec::with_capacity(params.len());
    for i in 0..params.len() {
        let best = params[i];
        let eps = STEP_FRACTION * uncertainties[i];
        if !(eps.is_finite() && eps > 0.0) {
            log::debug!("parameter {i} has uncertainty {}; derivative set to 0", uncertainties[i]);
            grad.push(0.0);
            continue;
        }

        params[i] = best + eps;
        let high = f(&*params);
        params[i] = best - eps;
        let low = f(&*params);
        params[i] = best;

        grad.push((high? - low?) / (2.0 * eps));
    }
    Ok(grad)
}

/// Propagated uncertainty `sqrt(dᵀ C d)` of `f` at `params`.
///
/// `covariance` must be square and aligned index-for-index with `params`.
pub fn propagate<F>(
    f: F,
    params: &[f64],
    uncertainties: &[f64],
    covariance: &DMatrix<f64>,
) -> Result<f64>
where
    F: FnMut(&[f64]) -> Result<f64>,
{
    let n = params.len();
    if covariance.nrows() != n || covariance.ncols() != n {
        return Err(Error::Validation(format!(
            "covariance is {}x{}, expected {n}x{n}",
            covariance.nrows(),
            covariance.ncols()
        )));
    }

    let mut scratch = params.to_vec();
    let d = DVector::from_vec(derivatives(f, &mut scratch, uncertainties)?);
    debug_assert_eq!(scratch.as_slice(), params);

    let variance = d.dot(&(covariance * &d));
    if !variance.is_finite() || variance < 0.0 {
        return Err(Error::Computation(format!(
            "propagated variance is {variance}; covariance is not positive semi-definite"
        )));
    }
    Ok(variance.sqrt())
}

/// Propagate a fit's covariance into the uncertainty of its signal weight,
/// re-evaluating the weight through [`LocalFitModel::weight_at`].
pub fn propagate_weight<M: LocalFitModel + ?Sized>(model: &M, fit: &LocalFitResult) -> Result<f64> {
    let covariance = fit.covariance_matrix()?;
    propagate(
        |p| model.weight_at(p),
        &fit.parameter_values(),
        &fit.parameter_uncertainties(),
        &covariance,
    )
}
