//! # wb-inference
//!
//! Statistical consumers of the phase-space distance engine.
//!
//! This crate provides:
//! - the adaptive k-nearest-neighbor Q-factor engine,
//! - Gaussian error propagation through an opaque fit model,
//! - the two-sample energy test with multithreaded permutation resampling.
//!
//! ## Architecture
//!
//! Both engines own a `PointCloud` from `wb-phasespace`; the Q-factor engine
//! talks to the density model only through the `LocalFitModel` trait from
//! `wb-core`.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Central-difference error propagation.
pub mod propagation;
/// k-NN Q-factor engine.
pub mod qfactor;

pub use energy_test::{CoordinateNorm, EnergyTest, Normalization, p_value, significance};
pub use propagation::{propagate, propagate_weight};
pub use qfactor::{BatchSummary, QFactor, QFactorEngine};
