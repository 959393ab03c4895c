//! Point cloud: named subsets of owned points sharing one coordinate registry.

use crate::coord::{Coordinate, CoordinateRegistry};
use crate::point::Point;
use wb_core::{Error, Result};

/// Owns one or more subsets of arranged points and their common registry.
///
/// The registry is locked the first time the cloud arranges a point: further
/// registrations would silently change the dimension of already-arranged
/// points, so they fail with [`Error::RegistryLocked`]. Scales can still be
/// overwritten through [`set_scale`](Self::set_scale).
#[derive(Debug, Clone)]
pub struct PointCloud {
    registry: CoordinateRegistry,
    subset_names: Vec<String>,
    subsets: Vec<Vec<Point>>,
    locked: bool,
}

impl PointCloud {
    /// Create a cloud with the given subset names.
    pub fn new<S: AsRef<str>>(subset_names: &[S]) -> Self {
        Self {
            registry: CoordinateRegistry::new(),
            subset_names: subset_names.iter().map(|s| s.as_ref().to_string()).collect(),
            subsets: vec![Vec::new(); subset_names.len()],
            locked: false,
        }
    }

    /// Register a phase-space coordinate.
    ///
    /// `scale` is the normalization of the coordinate; for circular
    /// coordinates pass half the period (e.g. `π` for an azimuth in `[-π, π)`).
    pub fn register(&mut self, name: &str, scale: f64, circular: bool) -> Result<usize> {
        if self.locked {
            log::warn!("registry locked; coordinate '{name}' rejected");
            return Err(Error::RegistryLocked(name.to_string()));
        }
        self.registry.register(name, scale, circular)
    }

    /// Overwrite the scale of coordinate `id`.
    pub fn set_scale(&mut self, id: usize, scale: f64) -> Result<()> {
        self.registry.set_scale(id, scale)
    }

    /// The coordinate registry.
    pub fn registry(&self) -> &CoordinateRegistry {
        &self.registry
    }

    /// Coordinate metric by name.
    pub fn coordinate(&self, name: &str) -> Option<&Coordinate> {
        self.registry.get(name)
    }

    /// `true` once a point has been arranged through this cloud.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Arrange `point` against the registry and lock the registry.
    pub fn arrange(&mut self, point: &mut Point) -> Result<()> {
        point.arrange(&self.registry).inspect_err(|e| {
            log::error!("cannot arrange point: {e}");
        })?;
        self.locked = true;
        Ok(())
    }

    /// Arrange a copy of `point` and append it to `subset`.
    ///
    /// The caller's point is not modified. On error nothing is stored.
    pub fn insert(&mut self, subset: usize, point: &Point) -> Result<()> {
        self.check_subset(subset)?;
        let mut copy = point.clone();
        self.arrange(&mut copy)?;
        self.subsets[subset].push(copy);
        Ok(())
    }

    /// Points of `subset` in insertion order.
    pub fn subset(&self, subset: usize) -> Result<&[Point]> {
        self.check_subset(subset)?;
        Ok(&self.subsets[subset])
    }

    /// Mutable access to the points of `subset`.
    pub fn subset_mut(&mut self, subset: usize) -> Result<&mut [Point]> {
        self.check_subset(subset)?;
        Ok(&mut self.subsets[subset])
    }

    /// Name of `subset`.
    pub fn subset_name(&self, subset: usize) -> Option<&str> {
        self.subset_names.get(subset).map(String::as_str)
    }

    /// Number of subsets.
    pub fn n_subsets(&self) -> usize {
        self.subsets.len()
    }

    /// Total number of stored points over all subsets.
    pub fn len(&self) -> usize {
        self.subsets.iter().map(Vec::len).sum()
    }

    /// `true` if no subset holds a point.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalized phase-space distance between two arranged points.
    pub fn distance(&self, a: &Point, b: &Point) -> Result<f64> {
        let (xa, xb) = (a.arranged()?, b.arranged()?);
        let n = self.registry.len();
        if xa.len() != n || xb.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: if xa.len() != n { xa.len() } else { xb.len() },
            });
        }
        Ok(self.registry.distance(xa, xb))
    }

    fn check_subset(&self, subset: usize) -> Result<()> {
        if subset >= self.subsets.len() {
            return Err(Error::Validation(format!(
                "subset {subset} out of range ({} subsets)",
                self.subsets.len()
            )));
        }
        Ok(())
    }
}
