//! Regular N-dimensional grids

use serde::{Deserialize, Serialize};

use super::Domain;
use crate::error::{Error, Result};

/// A regular grid of nodes in N dimensions.
///
/// Node coordinates along axis `a` are `origin[a] + i * spacing[a]` for
/// `i in 0..shape[a]`. Nodes are enumerated with the first axis varying
/// fastest, so for a 2D grid of shape `(nx, ny)` the linear index of
/// node `(i, j)` is `i + j * nx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct RegularGrid {
    shape: Vec<usize>,
    origin: Vec<f64>,
    spacing: Vec<f64>,
}

/// Unchecked grid fields as they appear in serialized form.
#[derive(Deserialize)]
struct RawGrid {
    shape: Vec<usize>,
    origin: Vec<f64>,
    spacing: Vec<f64>,
}

impl TryFrom<RawGrid> for RegularGrid {
    type Error = Error;

    fn try_from(raw: RawGrid) -> Result<Self> {
        RegularGrid::new(raw.shape, raw.origin, raw.spacing)
    }
}

impl RegularGrid {
    /// Create a grid, checking that shape, origin and spacing agree in
    /// dimension and that every axis has nodes and a positive spacing.
    pub fn new(shape: Vec<usize>, origin: Vec<f64>, spacing: Vec<f64>) -> Result<Self> {
        if shape.is_empty() {
            return Err(Error::configuration("shape", "[]", "grid needs at least one axis"));
        }
        if shape.contains(&0) {
            return Err(Error::configuration(
                "shape",
                format!("{shape:?}"),
                "every axis needs at least one node",
            ));
        }
        for len in [origin.len(), spacing.len()] {
            if len != shape.len() {
                return Err(Error::DimensionMismatch {
                    expected: shape.len(),
                    actual: len,
                });
            }
        }
        if let Some(s) = spacing.iter().find(|s| s.is_nan() || **s <= 0.0) {
            return Err(Error::configuration("spacing", s, "must be positive"));
        }
        Ok(Self {
            shape,
            origin,
            spacing,
        })
    }

    /// Grid with origin at zero and unit spacing.
    pub fn unit(shape: Vec<usize>) -> Result<Self> {
        let n = shape.len();
        Self::new(shape, vec![0.0; n], vec![1.0; n])
    }

    /// Number of nodes along each axis
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Coordinates of node zero
    pub fn origin(&self) -> &[f64] {
        &self.origin
    }

    /// Node spacing along each axis
    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    /// Convert a linear index into per-axis indices.
    pub fn multi_index(&self, mut index: usize) -> Vec<usize> {
        self.shape
            .iter()
            .map(|&n| {
                let i = index % n;
                index /= n;
                i
            })
            .collect()
    }

    /// Convert per-axis indices into a linear index. `None` if out of bounds.
    pub fn linear_index(&self, multi: &[usize]) -> Option<usize> {
        if multi.len() != self.shape.len() {
            return None;
        }
        let mut index = 0;
        let mut stride = 1;
        for (&i, &n) in multi.iter().zip(self.shape.iter()) {
            if i >= n {
                return None;
            }
            index += i * stride;
            stride *= n;
        }
        Some(index)
    }

    /// Linear index of the node closest to `point` (clamped to the grid).
    pub fn nearest_index(&self, point: &[f64]) -> Option<usize> {
        if point.len() != self.shape.len() || self.is_empty() {
            return None;
        }
        let multi: Vec<usize> = point
            .iter()
            .zip(self.origin.iter().zip(self.spacing.iter()))
            .zip(self.shape.iter())
            .map(|((&p, (&o, &s)), &n)| {
                let f = ((p - o) / s).round();
                if f.is_nan() || f <= 0.0 {
                    0
                } else {
                    (f as usize).min(n - 1)
                }
            })
            .collect();
        self.linear_index(&multi)
    }

    /// Bounding box as (min corner, max corner).
    pub fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        let max = self
            .origin
            .iter()
            .zip(self.spacing.iter())
            .zip(self.shape.iter())
            .map(|((&o, &s), &n)| o + s * n.saturating_sub(1) as f64)
            .collect();
        (self.origin.clone(), max)
    }
}

impl Domain for RegularGrid {
    fn ndim(&self) -> usize {
        self.shape.len()
    }

    fn len(&self) -> usize {
        self.shape.iter().product()
    }

    fn location_into(&self, mut index: usize, out: &mut [f64]) {
        for (a, o) in out.iter_mut().enumerate() {
            let n = self.shape[a];
            *o = self.origin[a] + (index % n) as f64 * self.spacing[a];
            index /= n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_enumeration_first_axis_fastest() {
        let grid = RegularGrid::new(vec![3, 2], vec![10.0, 20.0], vec![1.0, 5.0]).unwrap();
        assert_eq!(grid.len(), 6);
        assert_eq!(grid.location(0), vec![10.0, 20.0]);
        assert_eq!(grid.location(1), vec![11.0, 20.0]);
        assert_eq!(grid.location(3), vec![10.0, 25.0]);
        assert_eq!(grid.multi_index(5), vec![2, 1]);
        assert_eq!(grid.linear_index(&[2, 1]), Some(5));
        assert_eq!(grid.linear_index(&[3, 0]), None);
    }

    #[test]
    fn test_nearest_index() {
        let grid = RegularGrid::unit(vec![100, 100]).unwrap();
        let idx = grid.nearest_index(&[25.2, 74.8]).unwrap();
        assert_eq!(grid.location(idx), vec![25.0, 75.0]);

        // Outside the grid clamps to the border
        let idx = grid.nearest_index(&[-5.0, 500.0]).unwrap();
        assert_eq!(grid.location(idx), vec![0.0, 99.0]);
    }

    #[test]
    fn test_bounds() {
        let grid = RegularGrid::new(vec![11, 6], vec![0.0, 100.0], vec![10.0, 2.0]).unwrap();
        let (min, max) = grid.bounds();
        assert_relative_eq!(min[0], 0.0, epsilon = 1e-10);
        assert_relative_eq!(min[1], 100.0, epsilon = 1e-10);
        assert_relative_eq!(max[0], 100.0, epsilon = 1e-10);
        assert_relative_eq!(max[1], 110.0, epsilon = 1e-10);
    }

    #[test]
    fn test_invalid_spacing() {
        let err = RegularGrid::new(vec![2, 2], vec![0.0, 0.0], vec![1.0, 0.0]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_deserialize() {
        let grid: RegularGrid = serde_json::from_str(
            r#"{"shape":[4,4],"origin":[0.0,0.0],"spacing":[0.5,0.5]}"#,
        )
        .unwrap();
        assert_eq!(grid.len(), 16);
        assert_eq!(grid.location(5), vec![0.5, 0.5]);
    }

    #[test]
    fn test_deserialize_rejects_invalid_grid() {
        for json in [
            r#"{"shape":[3,3],"origin":[0.0],"spacing":[1.0,-1.0]}"#,
            r#"{"shape":[3,3],"origin":[0.0,0.0],"spacing":[1.0,0.0]}"#,
            r#"{"shape":[3,0],"origin":[0.0,0.0],"spacing":[1.0,1.0]}"#,
        ] {
            assert!(serde_json::from_str::<RegularGrid>(json).is_err(), "{json}");
        }
    }

    #[test]
    fn test_empty_axis_rejected() {
        let err = RegularGrid::new(vec![4, 0], vec![0.0, 0.0], vec![1.0, 1.0]).unwrap_err();
        assert!(err.is_configuration());
        assert!(RegularGrid::unit(vec![0]).is_err());
    }
}
