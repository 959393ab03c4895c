//! Phase-space coordinate registry and the normalized metric.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wb_core::{Error, Result};

/// Metric parameters of one phase-space dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Dense index assigned at registration (insertion order).
    pub id: usize,
    /// Normalization scale. For circular coordinates this is half the period.
    pub scale: f64,
    /// Wraparound topology (angles).
    pub circular: bool,
}

impl Coordinate {
    /// Squared normalized separation of two values along this coordinate.
    #[inline]
    pub fn separation_sq(&self, a: f64, b: f64) -> f64 {
        let s = self.scale;
        if self.circular {
            let delta = (a - b).abs();
            let wrapped = delta.min(2.0 * s - delta);
            wrapped * wrapped / (s * s)
        } else {
            let d = (a - b) / s;
            d * d
        }
    }
}

/// Name → id → metric mapping for the phase-space dimensions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinateRegistry {
    coords: Vec<Coordinate>,
    names: Vec<String>,
    name_to_index: HashMap<String, usize>,
}

impl CoordinateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a coordinate and return its id.
    ///
    /// A duplicate name is rejected and leaves the registry unchanged.
    pub fn register(&mut self, name: &str, scale: f64, circular: bool) -> Result<usize> {
        if self.name_to_index.contains_key(name) {
            log::warn!("coordinate '{name}' already registered; registration rejected");
            return Err(Error::DuplicateName(name.to_string()));
        }
        validate_scale(name, scale)?;

        let id = self.coords.len();
        self.coords.push(Coordinate { id, scale, circular });
        self.names.push(name.to_string());
        self.name_to_index.insert(name.to_string(), id);
        Ok(id)
    }

    /// Overwrite the scale of a registered coordinate. Ids never change.
    pub fn set_scale(&mut self, id: usize, scale: f64) -> Result<()> {
        let name = self
            .names
            .get(id)
            .ok_or_else(|| Error::Validation(format!("coordinate id {id} out of range")))?;
        validate_scale(name, scale)?;
        self.coords[id].scale = scale;
        Ok(())
    }

    /// Number of registered coordinates.
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Look up a coordinate by name.
    pub fn get(&self, name: &str) -> Option<&Coordinate> {
        self.name_to_index.get(name).map(|&i| &self.coords[i])
    }

    /// Look up a coordinate by id.
    pub fn by_id(&self, id: usize) -> Option<&Coordinate> {
        self.coords.get(id)
    }

    /// Name of the coordinate with this id.
    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Coordinates with their names, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Coordinate)> {
        self.names.iter().map(String::as_str).zip(self.coords.iter())
    }

    /// Normalized distance between two arranged coordinate vectors.
    ///
    /// Both slices must have length [`len`](Self::len).
    #[inline]
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), self.coords.len());
        debug_assert_eq!(b.len(), self.coords.len());
        self.coords
            .iter()
            .zip(a.iter().zip(b.iter()))
            .map(|(c, (&x, &y))| c.separation_sq(x, y))
            .sum::<f64>()
            .sqrt()
    }
}

fn validate_scale(name: &str, scale: f64) -> Result<()> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(Error::Validation(format!(
            "scale of coordinate '{name}' must be finite and > 0, got {scale}"
        )));
    }
    Ok(())
}
