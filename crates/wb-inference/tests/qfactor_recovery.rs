//! Q-factor recovery on a toy dataset.
//!
//! Events carry one phase-space coordinate `x ∈ [0, 1]`; the signal fraction
//! at `x` is `x`. Signal is a Gaussian peak in mass on a flat background. A
//! sideband-counting model stands in for a real local fit.

use rand::prelude::*;
use rand_distr::{Normal, Uniform};
use std::f64::consts::PI;
use std::path::Path;
use wb_core::{
    CovarianceQuality, LocalFitModel, LocalFitResult, NeighborSample, ParameterEstimate,
    QFactorConfig, Result,
};
use wb_inference::QFactorEngine;
use wb_phasespace::Point;

const PEAK: f64 = 5.0;
const WIDTH: f64 = 0.5;
const LO: f64 = 0.0;
const HI: f64 = 10.0;
const HALF_WINDOW: f64 = 2.0;

fn gauss(m: f64) -> f64 {
    let z = (m - PEAK) / WIDTH;
    (-0.5 * z * z).exp() / (WIDTH * (2.0 * PI).sqrt())
}

/// Flat background estimated from the sidebands `|m - PEAK| > HALF_WINDOW`.
/// Parameters are the signal yield and the background density per unit mass.
#[derive(Debug, Default)]
struct SidebandModel {
    samples: Vec<NeighborSample>,
    errors: bool,
    at: f64,
}

impl LocalFitModel for SidebandModel {
    fn set_error_calculation(&mut self, enabled: bool) {
        self.errors = enabled;
    }

    fn error_calculation(&self) -> bool {
        self.errors
    }

    fn reset(&mut self) {
        self.samples.clear();
    }

    fn add_data(&mut self, sample: NeighborSample) {
        self.samples.push(sample);
    }

    fn request_snapshot(&mut self, _path: &Path) {}

    fn fit(&mut self, mass: f64, _mass2: Option<f64>) -> Result<LocalFitResult> {
        self.at = mass;
        let (mut inner, mut inner_w2, mut side, mut side_w2) = (0.0, 0.0, 0.0, 0.0);
        for s in &self.samples {
            if (s.mass - PEAK).abs() > HALF_WINDOW {
                side += s.weight;
                side_w2 += s.weight * s.weight;
            } else {
                inner += s.weight;
                inner_w2 += s.weight * s.weight;
            }
        }
        let side_width = (HI - LO) - 2.0 * HALF_WINDOW;
        let inner_frac = 2.0 * HALF_WINDOW / side_width;
        let density = side / side_width;
        let signal = inner - inner_frac * side;

        let var_signal = inner_w2 + inner_frac * inner_frac * side_w2;
        let var_density = side_w2 / (side_width * side_width);
        let cov = -inner_frac * side_w2 / side_width;

        let params = [signal, density];
        let weight = self.weight_at(&params)?;
        Ok(LocalFitResult::new(weight, 0.0).with_covariance(
            vec![
                ParameterEstimate::new("signal", signal, var_signal.sqrt()),
                ParameterEstimate::new("density", density, var_density.sqrt()),
            ],
            vec![var_signal, cov, cov, var_density],
            CovarianceQuality::Full,
        ))
    }

    fn weight_at(&self, params: &[f64]) -> Result<f64> {
        let s = params[0] * gauss(self.at);
        Ok(s / (s + params[1]))
    }

    fn min_observable(&self) -> f64 {
        LO
    }

    fn max_observable(&self) -> f64 {
        HI
    }
}

fn generate(n: usize, seed: u64) -> (Vec<Point>, usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let unit = Uniform::new(0.0, 1.0).unwrap();
    let flat = Uniform::new(LO, HI).unwrap();
    let peak = Normal::new(PEAK, WIDTH).unwrap();

    let mut n_signal = 0;
    let points = (0..n)
        .map(|_| {
            let x = unit.sample(&mut rng);
            let mass = if unit.sample(&mut rng) < x {
                n_signal += 1;
                peak.sample(&mut rng)
            } else {
                flat.sample(&mut rng)
            };
            Point::from_coordinates(mass, [("x", x)]).unwrap()
        })
        .collect();
    (points, n_signal)
}

fn engine(points: &[Point], calc_errors: bool) -> QFactorEngine<SidebandModel> {
    let config = QFactorConfig { neighbor_weight: 150.0, calc_errors, ..Default::default() };
    let mut engine = QFactorEngine::with_config(SidebandModel::default(), config).unwrap();
    engine.register("x", 1.0, false).unwrap();
    for p in points {
        assert!(engine.add_point(p).unwrap());
    }
    engine
}

#[test]
fn summed_q_factors_recover_signal_yield() {
    let (points, n_signal) = generate(1500, 2024);
    let mut engine = engine(&points, false);
    let mut events = points.clone();

    let summary = engine.calc_weights(&mut events).unwrap();
    assert_eq!(summary.processed, 1500);
    assert_eq!(summary.computed, 1500);
    assert_eq!(summary.fit_failed, 0);

    let total: f64 = events.iter().map(Point::weight).sum();
    let rel = (total - n_signal as f64).abs() / n_signal as f64;
    assert!(rel < 0.12, "sum Q = {total}, true signal = {n_signal}");
    assert!(events.iter().all(|p| (0.0..=1.0).contains(&p.weight())));
}

#[test]
fn q_factor_follows_local_signal_fraction() {
    let (points, _) = generate(1500, 99);
    let mut engine = engine(&points, false);
    let mut events = points.clone();
    engine.calc_weights(&mut events).unwrap();

    let mean_q = |lo: f64, hi: f64| {
        let sel: Vec<f64> = events
            .iter()
            .filter(|p| (p.mass() - PEAK).abs() < 1.0)
            .filter(|p| p.coordinate("x").is_some_and(|x| x >= lo && x < hi))
            .map(Point::weight)
            .collect();
        sel.iter().sum::<f64>() / sel.len() as f64
    };
    let low = mean_q(0.0, 0.2);
    let high = mean_q(0.8, 1.0);
    assert!(high > 0.85, "mean Q at high signal fraction = {high}");
    assert!(low < 0.6, "mean Q at low signal fraction = {low}");
}

#[test]
fn propagated_uncertainties_are_positive_in_the_peak() {
    let (points, _) = generate(600, 7);
    let mut engine = engine(&points, true);

    let mut checked = 0;
    for p in points.iter().filter(|p| (p.mass() - PEAK).abs() < 0.5).take(20) {
        let mut query = p.clone();
        let q = engine.calc_weight(&mut query).unwrap();
        if q.weight > 0.0 && q.weight < 1.0 {
            assert!(q.uncertainty.is_finite() && q.uncertainty > 0.0);
            assert_eq!(query.weight_uncertainty(), q.uncertainty);
            checked += 1;
        }
    }
    assert!(checked > 0);
}

#[test]
fn repeated_runs_are_identical() {
    let (points, _) = generate(400, 3);
    let mut a = points.clone();
    let mut b = points.clone();
    engine(&points, false).calc_weights(&mut a).unwrap();
    engine(&points, false).calc_weights(&mut b).unwrap();
    let wa: Vec<f64> = a.iter().map(Point::weight).collect();
    let wb: Vec<f64> = b.iter().map(Point::weight).collect();
    assert_eq!(wa, wb);
}
