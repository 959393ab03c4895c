//! Core traits
//!
//! The weighting engine never fits anything itself. It selects a neighborhood
//! and hands it to a [`LocalFitModel`]; which density model sits behind the
//! trait (Voigtian, Gaussian, Crystal Ball, 1-D or 2-D) is a configuration
//! choice of the caller.

use crate::Result;
use crate::types::{LocalFitResult, NeighborSample};
use std::path::Path;

/// Signal+background model fitted to one phase-space neighborhood.
///
/// Implementations are stateful: [`add_data`](LocalFitModel::add_data)
/// accumulates the current neighborhood until [`reset`](LocalFitModel::reset)
/// is called. The weighting engine resets before every query.
pub trait LocalFitModel {
    /// Enable or disable propagated weight uncertainties.
    fn set_error_calculation(&mut self, enabled: bool);

    /// Whether propagated weight uncertainties are requested.
    fn error_calculation(&self) -> bool;

    /// Drop all accumulated neighbor data.
    fn reset(&mut self);

    /// Add one neighbor to the local fit sample.
    fn add_data(&mut self, sample: NeighborSample);

    /// Request a diagnostic plot of the next fit only.
    fn request_snapshot(&mut self, path: &Path);

    /// Fit the accumulated sample and evaluate the signal weight at the
    /// query observable(s).
    fn fit(&mut self, mass: f64, mass2: Option<f64>) -> Result<LocalFitResult>;

    /// Re-evaluate the signal weight of the last fit with the free parameters
    /// set to `params` (covariance order). Must not alter the fitted state.
    fn weight_at(&self, params: &[f64]) -> Result<f64>;

    /// Lower edge of the observable window.
    fn min_observable(&self) -> f64;

    /// Upper edge of the observable window.
    fn max_observable(&self) -> f64;

    /// `(min, max)` observable window.
    fn window(&self) -> (f64, f64) {
        (self.min_observable(), self.max_observable())
    }
}
