//! Adaptive k-nearest-neighbor Q-factor engine.
//!
//! For each query event the pool is ranked by phase-space distance, the
//! nearest events are collected until their prior weights sum to at least
//! `K`, and the resulting neighborhood is handed to a [`LocalFitModel`]. The
//! fitted signal probability at the query's observable is the event's
//! Q-factor.

use crate::propagation::propagate_weight;
use serde::Serialize;
use std::path::Path;
use wb_core::{CovarianceQuality, Error, LocalFitModel, QFactorConfig, Result};
use wb_phasespace::{Point, PointCloud};

const POOL: usize = 0;

/// Outcome of one weight calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QFactor {
    /// Q-factor, clamped to `[0, 1]`.
    pub weight: f64,
    /// Uncertainty of the Q-factor.
    pub uncertainty: f64,
    /// Weight as returned by the fit, before clamping.
    pub raw_weight: f64,
    /// Number of neighbors handed to the fit.
    pub n_neighbors: usize,
    /// Cumulative prior weight of the neighborhood.
    pub neighbor_weight: f64,
}

impl QFactor {
    /// `true` if the fitted weight fell outside `[0, 1]`.
    pub fn clamped(&self) -> bool {
        self.raw_weight != self.weight
    }
}

/// Per-category counts of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Events attempted.
    pub processed: usize,
    /// Events with a stored Q-factor.
    pub computed: usize,
    /// Computed events whose Q-factor was clamped.
    pub clamped: usize,
    /// Events skipped because an observable is outside the window.
    pub out_of_range: usize,
    /// Events whose neighborhood could not reach the target weight.
    pub insufficient_neighbors: usize,
    /// Events whose local fit failed.
    pub fit_failed: usize,
    /// Events whose uncertainty propagation failed.
    pub propagation_failed: usize,
}

/// k-NN weighting engine over a single pool of events.
///
/// The engine owns its point cloud and its fit model; several engines with
/// different models can coexist.
#[derive(Debug)]
pub struct QFactorEngine<M: LocalFitModel> {
    cloud: PointCloud,
    model: M,
    config: QFactorConfig,
}

impl<M: LocalFitModel> QFactorEngine<M> {
    /// Create an engine with the default configuration (`K = 200`).
    pub fn new(model: M) -> Self {
        let config = QFactorConfig::default();
        let mut model = model;
        model.set_error_calculation(config.calc_errors);
        Self { cloud: PointCloud::new(&["pool"]), model, config }
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(model: M, config: QFactorConfig) -> Result<Self> {
        config.validate()?;
        let mut engine = Self::new(model);
        engine.model.set_error_calculation(config.calc_errors);
        engine.config = config;
        Ok(engine)
    }

    /// Register a phase-space coordinate. Fails once the pool is non-empty.
    pub fn register(&mut self, name: &str, scale: f64, circular: bool) -> Result<usize> {
        self.cloud.register(name, scale, circular)
    }

    /// Set the cumulative neighbor weight `K`.
    pub fn set_neighbor_weight(&mut self, k: f64) -> Result<()> {
        let config = QFactorConfig { neighbor_weight: k, ..self.config.clone() };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Declare whether queried events are members of the pool.
    pub fn set_query_in_pool(&mut self, query_in_pool: bool) {
        self.config.query_in_pool = query_in_pool;
    }

    /// Enable or disable propagated weight uncertainties.
    pub fn set_calc_errors(&mut self, enabled: bool) {
        self.config.calc_errors = enabled;
        self.model.set_error_calculation(enabled);
    }

    /// Ask the fit model to export a diagnostic plot of the next fit.
    pub fn request_snapshot(&mut self, path: impl AsRef<Path>) {
        self.model.request_snapshot(path.as_ref());
    }

    /// Current configuration.
    pub fn config(&self) -> &QFactorConfig {
        &self.config
    }

    /// The fit model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the fit model.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// The underlying point cloud.
    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    /// Pool events in insertion order.
    pub fn pool(&self) -> &[Point] {
        self.cloud.subset(POOL).unwrap_or_default()
    }

    /// Observable window of the fit model.
    pub fn window(&self) -> (f64, f64) {
        self.model.window()
    }

    /// Add a copy of `point` to the pool.
    ///
    /// Returns `Ok(false)` (and logs) if an observable lies outside the
    /// window; structural errors are returned and nothing is stored.
    pub fn add_point(&mut self, point: &Point) -> Result<bool> {
        let window = self.window();
        if !point.in_window(window) {
            log::warn!(
                "rejecting pool event outside mass window {window:?} (m1={}, m2={:?})",
                point.mass(),
                point.mass2()
            );
            return Ok(false);
        }
        self.cloud.insert(POOL, point)?;
        Ok(true)
    }

    /// Pool indices of the neighborhood of an arranged `query`, nearest first.
    ///
    /// Ties in distance keep insertion order. With `query_in_pool` the nearest
    /// entry is assumed to be the query itself and skipped.
    pub fn neighbors(&self, query: &Point) -> Result<Vec<usize>> {
        let pool = self.pool();
        let mut ranked = pool
            .iter()
            .enumerate()
            .map(|(i, p)| Ok((self.cloud.distance(p, query)?, i)))
            .collect::<Result<Vec<(f64, usize)>>>()?;
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let target = self.config.neighbor_weight;
        let start = usize::from(self.config.query_in_pool);
        let mut sum = 0.0;
        for (pos, &(_, idx)) in ranked.iter().enumerate().skip(start) {
            sum += pool[idx].prior_weight();
            if sum >= target {
                return Ok(ranked[start..=pos].iter().map(|&(_, i)| i).collect());
            }
        }
        Err(Error::InsufficientNeighbors { target, available: sum })
    }

    /// Compute the Q-factor of `query` and store it on the point.
    ///
    /// `query` is arranged in place. Nothing is stored if any step fails.
    pub fn calc_weight(&mut self, query: &mut Point) -> Result<QFactor> {
        self.cloud.arrange(query)?;

        let window = self.window();
        if !query.in_window(window) {
            log::warn!(
                "cannot weight event outside mass window {window:?} (m1={}, m2={:?})",
                query.mass(),
                query.mass2()
            );
            return Err(Error::OutOfRange { mass: query.mass(), mass2: query.mass2(), window });
        }

        let neighbors = self.neighbors(query).inspect_err(|e| log::warn!("{e}"))?;

        self.model.reset();
        let pool = self.cloud.subset(POOL)?;
        let mut neighbor_weight = 0.0;
        for &i in &neighbors {
            let sample = pool[i].sample();
            neighbor_weight += sample.weight;
            self.model.add_data(sample);
        }

        let fit = self
            .model
            .fit(query.mass(), query.mass2())
            .map_err(|e| Error::FitDidNotConverge(e.to_string()))?;
        if !fit.converged() {
            log::warn!("local fit did not converge (m1={})", query.mass());
            return Err(Error::FitDidNotConverge(format!("{:?}", fit.status)));
        }

        match fit.covariance_quality {
            CovarianceQuality::Full => {}
            CovarianceQuality::ForcedPositiveDefinite => {
                log::info!("covariance matrix forced positive-definite")
            }
            CovarianceQuality::Approximate => log::warn!("covariance matrix not accurate"),
            CovarianceQuality::NotAvailable => {
                if self.model.error_calculation() {
                    log::warn!("no covariance matrix available; keeping the fit's weight uncertainty")
                }
            }
        }

        let raw_weight = fit.weight;
        if !raw_weight.is_finite() {
            log::warn!("local fit returned Q = {raw_weight} (m1={})", query.mass());
            return Err(Error::FitDidNotConverge(format!("non-finite weight {raw_weight}")));
        }
        let weight = if raw_weight > 1.0 {
            log::warn!("Q = {raw_weight} > 1; setting Q = 1");
            1.0
        } else if raw_weight < 0.0 {
            log::warn!("Q = {raw_weight} < 0; setting Q = 0");
            0.0
        } else {
            raw_weight
        };

        let uncertainty = if self.model.error_calculation() && fit.n_parameters() > 0 {
            propagate_weight(&self.model, &fit)?
        } else {
            fit.weight_uncertainty
        };

        query.set_weight(weight, uncertainty);
        Ok(QFactor { weight, uncertainty, raw_weight, n_neighbors: neighbors.len(), neighbor_weight })
    }

    /// Weight every event in `queries`.
    ///
    /// Range rejections, insufficient neighborhoods, failed fits and failed
    /// uncertainty propagation are counted and skipped. Any other error aborts
    /// the batch.
    pub fn calc_weights(&mut self, queries: &mut [Point]) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        let total = queries.len();

        for query in queries.iter_mut() {
            summary.processed += 1;
            match self.calc_weight(query) {
                Ok(q) => {
                    summary.computed += 1;
                    if q.clamped() {
                        summary.clamped += 1;
                    }
                }
                Err(e) if e.is_soft() => summary.out_of_range += 1,
                Err(Error::InsufficientNeighbors { .. }) => summary.insufficient_neighbors += 1,
                Err(Error::FitDidNotConverge(_)) => summary.fit_failed += 1,
                Err(Error::Computation(msg)) => {
                    log::warn!("uncertainty propagation failed: {msg}");
                    summary.propagation_failed += 1;
                }
                Err(e) => return Err(e),
            }

            let every = self.config.progress_every;
            if every > 0 && summary.processed % every == 0 {
                log::info!(
                    "event {} / {} ({:.1}%)",
                    summary.processed,
                    total,
                    100.0 * summary.processed as f64 / total as f64
                );
            }
        }
        Ok(summary)
    }
}
