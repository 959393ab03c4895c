//! # wb-core
//!
//! Shared building blocks of the Q-factor toolkit:
//! - the [`Error`] taxonomy and [`Result`] alias,
//! - fit-result and neighbor types exchanged with local fit models,
//! - the [`LocalFitModel`] capability consumed by the weighting engine,
//! - serde-backed run configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{EnergyTestConfig, Kernel, QFactorConfig, ResampleConfig, RunConfig};
pub use error::{Error, Result};
pub use traits::LocalFitModel;
pub use types::{CovarianceQuality, FitStatus, LocalFitResult, NeighborSample, ParameterEstimate};
