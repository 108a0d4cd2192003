//! Estimation domains
//!
//! A domain is any enumerable, ordered collection of locations. The
//! enumeration order (`0..len`) is the canonical order every estimation
//! result is indexed by.

mod grid;
mod point_set;

pub use grid::RegularGrid;
pub use point_set::PointSet;

/// An ordered collection of locations in N-dimensional space.
pub trait Domain: Sync {
    /// Coordinate dimension of every location.
    fn ndim(&self) -> usize;

    /// Number of locations.
    fn len(&self) -> usize;

    /// Whether the domain has no locations.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the coordinates of location `index` into `out`.
    ///
    /// `out.len()` must equal [`Domain::ndim`] and `index < len()`.
    fn location_into(&self, index: usize, out: &mut [f64]);

    /// Coordinates of location `index`.
    fn location(&self, index: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.ndim()];
        self.location_into(index, &mut out);
        out
    }
}
