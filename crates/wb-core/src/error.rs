//! Error types for the Q-factor toolkit

use thiserror::Error;

/// Toolkit error type
#[derive(Error, Debug)]
pub enum Error {
    /// A coordinate (or raw point coordinate) with this name already exists
    #[error("duplicate name: '{0}' is already registered")]
    DuplicateName(String),

    /// Point and registry disagree on the number of phase-space dimensions
    #[error("dimension mismatch: registry has {expected} coordinates, point has {found}")]
    DimensionMismatch {
        /// Number of registered coordinates.
        expected: usize,
        /// Number of raw coordinates carried by the point.
        found: usize,
    },

    /// Point carries a coordinate that is not registered
    #[error("unknown coordinate: '{0}'")]
    UnknownCoordinate(String),

    /// Point was used for a distance query before arrangement
    #[error("point has not been arranged against the current registry")]
    NotArranged,

    /// Registration attempted after points were arranged against the registry
    #[error("registry is locked (points already arranged); cannot register '{0}'")]
    RegistryLocked(String),

    /// Pool exhausted before the cumulative neighbor weight reached its target
    #[error("insufficient neighbors: target weight {target}, pool provides {available}")]
    InsufficientNeighbors {
        /// Requested cumulative neighbor weight.
        target: f64,
        /// Cumulative weight actually available.
        available: f64,
    },

    /// Local fit reported non-convergence or produced no result
    #[error("fit did not converge: {0}")]
    FitDidNotConverge(String),

    /// Statistic evaluated before normalization
    #[error("energy test has not been initialized")]
    NotInitialized,

    /// Observable outside the fit window (soft rejection)
    #[error("observable out of range: mass={mass}, mass2={mass2:?}, window={window:?}")]
    OutOfRange {
        /// Primary observable.
        mass: f64,
        /// Secondary observable, if set.
        mass2: Option<f64>,
        /// Validity window `(min, max)`.
        window: (f64, f64),
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Soft errors are logged and skipped by batch callers; everything else
    /// aborts the current operation.
    pub fn is_soft(&self) -> bool {
        matches!(self, Error::OutOfRange { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
