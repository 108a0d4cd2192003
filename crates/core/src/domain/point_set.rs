//! Explicit point collections

use ndarray::{Array2, ArrayView1, ArrayView2};

use super::Domain;
use crate::error::{Error, Result};

/// A domain made of arbitrary points, stored as an `n × d` array.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    coords: Array2<f64>,
}

impl PointSet {
    /// Wrap an `n × d` coordinate array (one row per point).
    pub fn new(coords: Array2<f64>) -> Self {
        Self { coords }
    }

    /// Build from fixed-size coordinate tuples.
    pub fn from_points<const D: usize>(points: &[[f64; D]]) -> Self {
        let coords = Array2::from_shape_fn((points.len(), D), |(i, j)| points[i][j]);
        Self { coords }
    }

    /// Build from variable-length rows, checking that every row has the same dimension.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let ndim = rows.first().map(Vec::len).unwrap_or(0);
        let mut flat = Vec::with_capacity(rows.len() * ndim);
        for row in rows {
            if row.len() != ndim {
                return Err(Error::DimensionMismatch {
                    expected: ndim,
                    actual: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }
        let coords = Array2::from_shape_vec((rows.len(), ndim), flat)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self { coords })
    }

    /// Coordinates of point `index`.
    pub fn point(&self, index: usize) -> ArrayView1<'_, f64> {
        self.coords.row(index)
    }

    /// View of the full coordinate array.
    pub fn coords(&self) -> ArrayView2<'_, f64> {
        self.coords.view()
    }
}

impl Domain for PointSet {
    fn ndim(&self) -> usize {
        self.coords.ncols()
    }

    fn len(&self) -> usize {
        self.coords.nrows()
    }

    fn location_into(&self, index: usize, out: &mut [f64]) {
        for (o, &c) in out.iter_mut().zip(self.coords.row(index).iter()) {
            *o = c;
        }
    }
}
