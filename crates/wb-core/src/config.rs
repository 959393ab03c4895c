//! Run configuration (JSON or programmatic).
//!
//! Every section uses `#[serde(default)]`, so a partial document only
//! overrides the fields it names.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration of the k-nearest-neighbor weighting engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QFactorConfig {
    /// Cumulative prior weight of the neighborhood (`K`).
    pub neighbor_weight: f64,
    /// The query event is itself a member of the pool; skip the nearest entry.
    pub query_in_pool: bool,
    /// Propagate parameter covariance into the weight uncertainty.
    pub calc_errors: bool,
    /// Log batch progress every this many events (0 disables).
    pub progress_every: usize,
}

impl Default for QFactorConfig {
    fn default() -> Self {
        Self { neighbor_weight: 200.0, query_in_pool: true, calc_errors: false, progress_every: 100 }
    }
}

impl QFactorConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !(self.neighbor_weight.is_finite() && self.neighbor_weight > 0.0) {
            return Err(Error::Validation(format!(
                "neighbor_weight must be finite and > 0, got {}",
                self.neighbor_weight
            )));
        }
        Ok(())
    }
}

/// Distance kernel of the energy test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    /// `-ln(d + epsilon)`
    Log,
    /// `exp(-d^2 / gauss_2sig_sq)`
    Gauss,
}

/// Configuration of the energy-test statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyTestConfig {
    /// Distance kernel.
    pub kernel: Kernel,
    /// `2σ²` of the Gaussian kernel (ignored by the log kernel).
    pub gauss_2sig_sq: f64,
}

impl Default for EnergyTestConfig {
    fn default() -> Self {
        Self { kernel: Kernel::Gauss, gauss_2sig_sq: 0.04 }
    }
}

impl EnergyTestConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !(self.gauss_2sig_sq.is_finite() && self.gauss_2sig_sq > 0.0) {
            return Err(Error::Validation(format!(
                "gauss_2sig_sq must be finite and > 0, got {}",
                self.gauss_2sig_sq
            )));
        }
        Ok(())
    }
}

/// Configuration of the permutation resampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Draws per worker thread (`n`).
    pub draws_per_thread: usize,
    /// Number of worker threads.
    pub threads: usize,
    /// Base seed; `None` draws one from the OS-seeded thread RNG.
    pub seed: Option<u64>,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self { draws_per_thread: 100, threads: 1, seed: None }
    }
}

impl ResampleConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.draws_per_thread == 0 {
            return Err(Error::Validation("draws_per_thread must be > 0".into()));
        }
        if self.threads == 0 {
            return Err(Error::Validation("threads must be > 0".into()));
        }
        Ok(())
    }

    /// Total number of draws (`n × threads`).
    pub fn total_draws(&self) -> usize {
        self.draws_per_thread * self.threads
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Weighting engine section.
    pub qfactor: QFactorConfig,
    /// Energy-test section.
    pub energy_test: EnergyTestConfig,
    /// Resampling section.
    pub resample: ResampleConfig,
}

impl RunConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.qfactor.validate()?;
        self.energy_test.validate()?;
        self.resample.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = RunConfig::default();
        assert_eq!(c.qfactor.neighbor_weight, 200.0);
        assert!(c.qfactor.query_in_pool);
        assert_eq!(c.energy_test.kernel, Kernel::Gauss);
        assert_eq!(c.energy_test.gauss_2sig_sq, 0.04);
        assert_eq!(c.resample.total_draws(), 100);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{
            "qfactor": { "neighbor_weight": 50, "calc_errors": true },
            "energy_test": { "kernel": "log" },
            "resample": { "threads": 4, "seed": 7 }
        }"#;
        let c = RunConfig::from_json_str(json).unwrap();
        assert_eq!(c.qfactor.neighbor_weight, 50.0);
        assert!(c.qfactor.calc_errors);
        assert!(c.qfactor.query_in_pool);
        assert_eq!(c.energy_test.kernel, Kernel::Log);
        assert_eq!(c.energy_test.gauss_2sig_sq, 0.04);
        assert_eq!(c.resample.threads, 4);
        assert_eq!(c.resample.seed, Some(7));
        assert_eq!(c.resample.total_draws(), 400);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            RunConfig::from_json_str(r#"{"qfactor": {"neighbor_weight": 0}}"#),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            RunConfig::from_json_str(r#"{"resample": {"threads": 0}}"#),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            RunConfig::from_json_str(r#"{"energy_test": {"gauss_2sig_sq": -1}}"#),
            Err(Error::Validation(_))
        ));
        assert!(matches!(RunConfig::from_json_str("{"), Err(Error::Json(_))));
    }
}
