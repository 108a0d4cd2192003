//! Theoretical variogram models
//!
//! The semivariance γ(h) measures spatial dissimilarity as a function of
//! separation distance h. Bounded models level off at the sill, which
//! gives the covariance `C(h) = sill - γ(h)` used by the Kriging system.
//!
//! Models are pre-supplied: parameters come from the caller, there is no
//! fitting against an empirical variogram here.
//!
//! Reference:
//! Matheron, G. (1963). Principles of geostatistics. Economic Geology.
//! Cressie, N. (1993). Statistics for Spatial Data. Wiley.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use geoestim_core::{Error, Result};

use crate::spatial::DistanceMetric;

/// A semivariance function of a pair of locations with a finite sill.
pub trait Variogram: Debug + Send + Sync {
    /// Semivariance γ between two locations. Zero for coincident locations.
    fn semivariance(&self, a: &[f64], b: &[f64]) -> f64;

    /// Value γ levels off at for large separations.
    fn sill(&self) -> f64;

    /// Covariance `sill - γ(a, b)`.
    fn covariance(&self, a: &[f64], b: &[f64]) -> f64 {
        self.sill() - self.semivariance(a, b)
    }

    /// Check the model is usable for locations of dimension `ndim`.
    fn validate(&self, _ndim: usize) -> Result<()> {
        Ok(())
    }
}

/// Shape of a bounded variogram model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariogramKind {
    /// γ(h) = c₀ + c·[1 - exp(-3h²/a²)]
    #[default]
    Gaussian,
    /// γ(h) = c₀ + c·[1.5(h/a) - 0.5(h/a)³] for h ≤ a; c₀+c for h > a
    Spherical,
    /// γ(h) = c₀ + c·[1 - exp(-3h/a)]
    Exponential,
    /// γ(h) = c₀ + c·[7r² - 35/4 r³ + 7/2 r⁵ - 3/4 r⁷], r = h/a ≤ 1
    Cubic,
}

/// An isotropic variogram model evaluated under a distance metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariogramModel {
    pub kind: VariogramKind,
    /// Nugget (c₀): discontinuity at h → 0
    pub nugget: f64,
    /// Sill (c₀ + c): semivariance the model levels off at
    pub sill: f64,
    /// Range (a): distance at which semivariance reaches (about) the sill
    pub range: f64,
    /// Metric used to turn a pair of locations into a lag distance
    pub metric: DistanceMetric,
}

impl Default for VariogramModel {
    /// Gaussian model with unit sill and range and no nugget.
    fn default() -> Self {
        Self {
            kind: VariogramKind::Gaussian,
            nugget: 0.0,
            sill: 1.0,
            range: 1.0,
            metric: DistanceMetric::Euclidean,
        }
    }
}

impl VariogramModel {
    pub fn new(kind: VariogramKind, nugget: f64, sill: f64, range: f64) -> Self {
        Self {
            kind,
            nugget,
            sill,
            range,
            metric: DistanceMetric::Euclidean,
        }
    }

    /// Gaussian model without nugget.
    pub fn gaussian(sill: f64, range: f64) -> Self {
        Self::new(VariogramKind::Gaussian, 0.0, sill, range)
    }

    pub fn spherical(sill: f64, range: f64) -> Self {
        Self::new(VariogramKind::Spherical, 0.0, sill, range)
    }

    pub fn exponential(sill: f64, range: f64) -> Self {
        Self::new(VariogramKind::Exponential, 0.0, sill, range)
    }

    pub fn cubic(sill: f64, range: f64) -> Self {
        Self::new(VariogramKind::Cubic, 0.0, sill, range)
    }

    pub fn with_nugget(mut self, nugget: f64) -> Self {
        self.nugget = nugget;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Partial sill c = sill - nugget
    pub fn partial_sill(&self) -> f64 {
        self.sill - self.nugget
    }

    /// Evaluate the model at lag distance h.
    pub fn evaluate(&self, h: f64) -> f64 {
        if h < 1e-15 {
            return 0.0;
        }

        let c0 = self.nugget;
        let c = self.partial_sill();
        let a = self.range;

        match self.kind {
            VariogramKind::Gaussian => c0 + c * (1.0 - (-3.0 * h * h / (a * a)).exp()),
            VariogramKind::Spherical => {
                if h >= a {
                    c0 + c
                } else {
                    let hr = h / a;
                    c0 + c * (1.5 * hr - 0.5 * hr * hr * hr)
                }
            }
            VariogramKind::Exponential => c0 + c * (1.0 - (-3.0 * h / a).exp()),
            VariogramKind::Cubic => {
                if h >= a {
                    c0 + c
                } else {
                    let r = h / a;
                    let r2 = r * r;
                    let r3 = r2 * r;
                    let r5 = r3 * r2;
                    let r7 = r5 * r2;
                    c0 + c * (7.0 * r2 - 8.75 * r3 + 3.5 * r5 - 0.75 * r7)
                }
            }
        }
    }

    /// Check that the parameters describe a valid bounded model.
    pub fn validate(&self, ndim: usize) -> Result<()> {
        if self.sill.is_nan() || self.sill <= 0.0 {
            return Err(Error::configuration("variogram.sill", self.sill, "must be positive"));
        }
        if self.range.is_nan() || self.range <= 0.0 {
            return Err(Error::configuration("variogram.range", self.range, "must be positive"));
        }
        if self.nugget.is_nan() || self.nugget < 0.0 || self.nugget > self.sill {
            return Err(Error::configuration(
                "variogram.nugget",
                self.nugget,
                "must lie in [0, sill]",
            ));
        }
        self.metric.validate(ndim)
    }
}

impl Variogram for VariogramModel {
    fn semivariance(&self, a: &[f64], b: &[f64]) -> f64 {
        self.evaluate(self.metric.distance(a, b))
    }

    fn sill(&self) -> f64 {
        self.sill
    }

    fn validate(&self, ndim: usize) -> Result<()> {
        VariogramModel::validate(self, ndim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spherical_evaluation() {
        let model = VariogramModel::spherical(10.0, 50.0).with_nugget(1.0);

        assert!(model.evaluate(0.0).abs() < 1e-10);

        let at_range = model.evaluate(50.0);
        assert!((at_range - 10.0).abs() < 0.01, "At range, should equal sill: got {:.2}", at_range);

        let beyond = model.evaluate(100.0);
        assert!((beyond - 10.0).abs() < 0.01, "Beyond range, should be sill: got {:.2}", beyond);

        let mid = model.evaluate(25.0);
        assert!(mid > 1.0 && mid < 10.0, "Mid should be between nugget and sill: {:.2}", mid);
    }

    #[test]
    fn test_exponential_evaluation() {
        let model = VariogramModel::exponential(10.0, 30.0);
        assert!(model.evaluate(0.0).abs() < 1e-10);

        // At h=range, ~95% of sill by definition of the practical range
        let at_range = model.evaluate(30.0);
        assert!(at_range > 9.0 && at_range < 10.0, "got {:.2}", at_range);
    }

    #[test]
    fn test_gaussian_default() {
        let model = VariogramModel::default();
        assert_eq!(model.kind, VariogramKind::Gaussian);
        assert_eq!(model.sill(), 1.0);
        // Smooth near the origin
        assert!(model.evaluate(0.01) < 1e-3);
        assert!((model.evaluate(10.0) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cubic_is_continuous_at_range() {
        let model = VariogramModel::cubic(2.0, 5.0);
        let below = model.evaluate(5.0 - 1e-9);
        assert!((below - 2.0).abs() < 1e-6, "got {}", below);
        assert_eq!(model.evaluate(6.0), 2.0);
    }

    #[test]
    fn test_covariance_on_locations() {
        let model = VariogramModel::gaussian(4.0, 10.0).with_nugget(1.0);
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        let gamma = model.semivariance(&a, &b);
        assert!((gamma - model.evaluate(5.0)).abs() < 1e-12);
        assert!((model.covariance(&a, &b) - (4.0 - gamma)).abs() < 1e-12);
        // Covariance at zero lag includes the nugget
        assert_eq!(model.covariance(&a, &a), 4.0);
    }

    #[test]
    fn test_validate() {
        assert!(VariogramModel::gaussian(0.0, 1.0).validate(2).is_err());
        assert!(VariogramModel::gaussian(1.0, -1.0).validate(2).is_err());
        assert!(VariogramModel::gaussian(1.0, 1.0).with_nugget(2.0).validate(2).is_err());
        assert!(VariogramModel::gaussian(1.0, 1.0).validate(2).is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let model: VariogramModel =
            serde_json::from_str(r#"{"kind":"spherical","sill":3.0,"range":20.0}"#).unwrap();
        assert_eq!(model.kind, VariogramKind::Spherical);
        assert_eq!(model.nugget, 0.0);
        assert_eq!(model.metric, DistanceMetric::Euclidean);
    }
}
