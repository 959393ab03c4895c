//! # wb-phasespace
//!
//! Phase-space geometry for event-by-event weighting:
//! - [`CoordinateRegistry`] maps coordinate names to dense ids and metric
//!   parameters (scale, circular topology).
//! - [`Point`] carries an event's named coordinates, observables and weights.
//! - [`PointCloud`] owns subsets of arranged points and computes the
//!   normalized distance
//!
//! ```text
//! d(a, b) = sqrt( Σ_c sep_c(a_c, b_c)^2 )
//! sep_c   = (a_c - b_c) / s_c                       (linear)
//! sep_c   = min(|a_c - b_c|, 2 s_c - |a_c - b_c|) / s_c   (circular, s_c = half period)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cloud;
pub mod coord;
pub mod point;

pub use cloud::PointCloud;
pub use coord::{Coordinate, CoordinateRegistry};
pub use point::Point;
