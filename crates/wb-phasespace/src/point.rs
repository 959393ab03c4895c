//! A single event in phase space.

use crate::coord::CoordinateRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wb_core::{Error, NeighborSample, Result};

/// One event: named phase-space coordinates, observable(s) and weights.
///
/// Raw coordinates are keyed by name. Distance queries need the dense
/// arranged form, produced by [`Point::arrange`] against a registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    raw: BTreeMap<String, f64>,
    arranged: Option<Vec<f64>>,
    mass: f64,
    mass2: Option<f64>,
    prior_weight: f64,
    weight: f64,
    weight_uncertainty: f64,
}

impl Point {
    /// Create a point with the given primary observable and prior weight 1.
    pub fn new(mass: f64) -> Self {
        Self {
            raw: BTreeMap::new(),
            arranged: None,
            mass,
            mass2: None,
            prior_weight: 1.0,
            weight: 0.0,
            weight_uncertainty: 0.0,
        }
    }

    /// Create a point from `(name, value)` pairs.
    pub fn from_coordinates<I, S>(mass: f64, coords: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut p = Self::new(mass);
        for (name, value) in coords {
            p.set_coordinate(name, value)?;
        }
        Ok(p)
    }

    /// Set a raw named coordinate. Names are unique per point.
    ///
    /// Invalidates any previous arrangement.
    pub fn set_coordinate(&mut self, name: impl Into<String>, value: f64) -> Result<()> {
        let name = name.into();
        if self.raw.contains_key(&name) {
            return Err(Error::DuplicateName(name));
        }
        self.raw.insert(name, value);
        self.arranged = None;
        Ok(())
    }

    /// Raw coordinate by name.
    pub fn coordinate(&self, name: &str) -> Option<f64> {
        self.raw.get(name).copied()
    }

    /// Number of raw coordinates.
    pub fn n_coordinates(&self) -> usize {
        self.raw.len()
    }

    /// Arrange raw coordinates into a dense vector indexed by coordinate id.
    ///
    /// On failure the point is left exactly as it was.
    pub fn arrange(&mut self, registry: &CoordinateRegistry) -> Result<()> {
        if registry.len() != self.raw.len() {
            return Err(Error::DimensionMismatch { expected: registry.len(), found: self.raw.len() });
        }
        let mut values = vec![0.0; registry.len()];
        for (name, &value) in &self.raw {
            let coord =
                registry.get(name).ok_or_else(|| Error::UnknownCoordinate(name.clone()))?;
            values[coord.id] = value;
        }
        self.arranged = Some(values);
        Ok(())
    }

    /// `true` once [`arrange`](Self::arrange) has succeeded.
    pub fn is_arranged(&self) -> bool {
        self.arranged.is_some()
    }

    /// Arranged coordinate vector.
    pub fn arranged(&self) -> Result<&[f64]> {
        self.arranged.as_deref().ok_or(Error::NotArranged)
    }

    /// Arranged coordinate value by id.
    pub fn coord_value(&self, id: usize) -> Result<f64> {
        let values = self.arranged()?;
        values.get(id).copied().ok_or_else(|| {
            Error::Validation(format!("coordinate id {id} out of range (dimension {})", values.len()))
        })
    }

    /// Primary observable.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Set the primary observable.
    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass;
    }

    /// Secondary observable, if set.
    pub fn mass2(&self) -> Option<f64> {
        self.mass2
    }

    /// Set the secondary observable (two-dimensional fits).
    pub fn set_mass2(&mut self, mass2: f64) {
        self.mass2 = Some(mass2);
    }

    /// Prior (input) event weight.
    pub fn prior_weight(&self) -> f64 {
        self.prior_weight
    }

    /// Set the prior event weight.
    pub fn set_prior_weight(&mut self, weight: f64) {
        self.prior_weight = weight;
    }

    /// Computed Q-factor.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Uncertainty of the computed Q-factor.
    pub fn weight_uncertainty(&self) -> f64 {
        self.weight_uncertainty
    }

    /// Store a computed Q-factor and its uncertainty.
    pub fn set_weight(&mut self, weight: f64, uncertainty: f64) {
        self.weight = weight;
        self.weight_uncertainty = uncertainty;
    }

    /// `true` if both observables lie inside `[lo, hi]`.
    pub fn in_window(&self, (lo, hi): (f64, f64)) -> bool {
        let inside = |m: f64| m >= lo && m <= hi;
        inside(self.mass) && self.mass2.is_none_or(inside)
    }

    /// Observables and prior weight as handed to a local fit.
    pub fn sample(&self) -> NeighborSample {
        NeighborSample { mass: self.mass, mass2: self.mass2, weight: self.prior_weight }
    }
}
