//! Drift (trend) functions for Universal and External-Drift Kriging
//!
//! Universal Kriging uses the monomials of total degree ≤ d in the
//! coordinates: for 2D and d = 2 that is {1, x, y, x², xy, y²}.
//! External-Drift Kriging takes arbitrary scalar functions of location.

use std::fmt;
use std::sync::Arc;

use geoestim_core::ObservationSet;

/// A scalar function of location used as a drift term.
#[derive(Clone)]
pub struct DriftFn(Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>);

impl DriftFn {
    pub fn new(f: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// The constant function 1.
    pub fn constant() -> Self {
        Self::new(|_| 1.0)
    }

    #[inline]
    pub fn eval(&self, location: &[f64]) -> f64 {
        (self.0)(location)
    }
}

impl fmt::Debug for DriftFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DriftFn(..)")
    }
}

/// Polynomial basis of a given total degree in `ndim` coordinates.
///
/// Monomials are evaluated in a local frame `(x - center) / scale`, so
/// basis values stay of order one wherever the data sits. Any per-axis
/// affine frame spans the same polynomial space.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialDrift {
    exponents: Vec<Vec<u32>>,
    center: Vec<f64>,
    scale: Vec<f64>,
}

impl PolynomialDrift {
    /// Basis in raw coordinates.
    pub fn new(ndim: usize, degree: usize) -> Self {
        let mut exponents = Vec::new();
        for total in 0..=degree as u32 {
            let mut current = vec![0; ndim];
            push_exponents(&mut exponents, &mut current, 0, total);
        }
        Self {
            exponents,
            center: vec![0.0; ndim],
            scale: vec![1.0; ndim],
        }
    }

    /// Use a frame centered on the centroid of `observations` and scaled by
    /// their largest offset from it along each axis.
    pub fn centered_on(mut self, observations: &ObservationSet) -> Self {
        if observations.is_empty() {
            return self;
        }
        let ndim = self.center.len();
        let n = observations.len() as f64;
        let mut center = vec![0.0; ndim];
        for i in 0..observations.len() {
            for (c, &x) in center.iter_mut().zip(observations.location(i)) {
                *c += x / n;
            }
        }
        let mut scale = vec![0.0_f64; ndim];
        for i in 0..observations.len() {
            for ((s, &c), &x) in scale.iter_mut().zip(&center).zip(observations.location(i)) {
                *s = s.max((x - c).abs());
            }
        }
        for s in scale.iter_mut() {
            if !(s.is_finite() && *s > 0.0) {
                *s = 1.0;
            }
        }
        self.center = center;
        self.scale = scale;
        self
    }

    /// Number of basis functions
    pub fn len(&self) -> usize {
        self.exponents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Exponent tuple of each basis function, by ascending total degree.
    pub fn exponents(&self) -> &[Vec<u32>] {
        &self.exponents
    }

    /// Value of basis function `k` at `location`.
    #[inline]
    pub fn eval(&self, k: usize, location: &[f64]) -> f64 {
        self.exponents[k]
            .iter()
            .zip(location)
            .zip(self.center.iter().zip(&self.scale))
            .map(|((&e, &x), (&c, &s))| ((x - c) / s).powi(e as i32))
            .product()
    }
}

/// Enumerate exponent tuples summing to `remaining`, first axis highest first.
fn push_exponents(out: &mut Vec<Vec<u32>>, current: &mut [u32], axis: usize, remaining: u32) {
    if axis + 1 == current.len() {
        current[axis] = remaining;
        out.push(current.to_vec());
        return;
    }
    for e in (0..=remaining).rev() {
        current[axis] = e;
        push_exponents(out, current, axis + 1, remaining - e);
    }
    current[axis] = 0;
}
