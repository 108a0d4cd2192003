//! Locally Weighted Regression (LWR)
//!
//! At each location a linear model `z ≈ θ₀ + Σ θⱼ xⱼ` is fitted by weighted
//! least squares on the k nearest observations. Weights come from a kernel
//! of the normalized distance `δᵢ = dᵢ / max dⱼ`, by default `exp(-3δ²)`.
//!
//! The reported uncertainty is the norm of `W X (XᵀWX)⁻¹ x̃` with
//! `x̃ = [1, x]`, the influence of the local observations on the estimate.
//!
//! Reference:
//! Cleveland, W.S. (1979). Robust locally weighted regression and smoothing
//! scatterplots. Journal of the American Statistical Association.

use std::fmt;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use geoestim_core::{Error, ObservationSet, Result};

use super::{Estimate, Estimator};
use crate::linalg::WeightedLeastSquares;
use crate::spatial::{DistanceMetric, KNearestSearch, NeighborSearch};

/// Kernel mapping a normalized distance in [0, 1] to a weight.
#[derive(Clone)]
pub struct WeightFn(Arc<dyn Fn(f64) -> f64 + Send + Sync>);

impl WeightFn {
    pub fn new(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Every neighbor gets weight 1 (ordinary least squares).
    pub fn uniform() -> Self {
        Self::new(|_| 1.0)
    }

    #[inline]
    pub fn eval(&self, h: f64) -> f64 {
        (self.0)(h)
    }
}

impl Default for WeightFn {
    fn default() -> Self {
        Self::new(|h| (-3.0 * h * h).exp())
    }
}

impl fmt::Debug for WeightFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeightFn(..)")
    }
}

/// Parameters for LWR
#[derive(Debug, Clone, Default)]
pub struct LwrParams {
    /// Neighbors per local fit. `None` means ⌈0.2·n⌉.
    pub neighbors: Option<usize>,
    pub distance: DistanceMetric,
    pub weight_fn: WeightFn,
}

impl LwrParams {
    pub fn with_neighbors(mut self, k: usize) -> Self {
        self.neighbors = Some(k);
        self
    }

    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_weight_fn(mut self, weight_fn: WeightFn) -> Self {
        self.weight_fn = weight_fn;
        self
    }

    /// Neighbor count used for `n` observations.
    pub fn resolved_neighbors(&self, n: usize) -> usize {
        self.neighbors.unwrap_or_else(|| (0.2 * n as f64).ceil() as usize)
    }

    pub fn validate(&self, n: usize, ndim: usize) -> Result<()> {
        let k = self.resolved_neighbors(n);
        if k == 0 {
            return Err(Error::configuration("lwr.neighbors", k, "must be positive"));
        }
        if k > n {
            return Err(Error::configuration(
                "lwr.neighbors",
                k,
                format!("exceeds the {n} available observations"),
            ));
        }
        self.distance.validate(ndim)
    }
}

/// LWR estimator
#[derive(Debug, Clone, Default)]
pub struct LocallyWeightedRegression {
    params: LwrParams,
}

/// Fitted LWR state: the observations and their neighbor index.
pub struct LwrModel {
    observations: ObservationSet,
    search: KNearestSearch,
}

impl LocallyWeightedRegression {
    pub fn new(params: LwrParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LwrParams {
        &self.params
    }
}

impl Estimator for LocallyWeightedRegression {
    type Model = LwrModel;

    fn fit(&self, observations: &ObservationSet) -> Result<LwrModel> {
        if observations.is_empty() {
            return Err(Error::InsufficientData("LWR needs at least one observation".into()));
        }
        let n = observations.len();
        self.params.validate(n, observations.ndim())?;
        let k = self.params.resolved_neighbors(n);
        let search = KNearestSearch::new(observations, k, self.params.distance)?;
        debug!(observations = n, neighbors = k, "fitted LWR");

        Ok(LwrModel {
            observations: observations.clone(),
            search,
        })
    }

    fn predict(&self, model: &LwrModel, location: &[f64]) -> Result<Estimate> {
        let obs = &model.observations;
        let neighbors = model.search.search(location);
        if neighbors.is_empty() {
            return Ok(Estimate::UNDEFINED);
        }

        let m = neighbors.len();
        let p = obs.ndim() + 1;
        let max_distance = neighbors.iter().fold(0.0_f64, |a, n| a.max(n.distance));
        let weights: Vec<f64> = neighbors
            .iter()
            .map(|n| {
                let h = if max_distance > 0.0 {
                    n.distance / max_distance
                } else {
                    0.0
                };
                self.params.weight_fn.eval(h)
            })
            .collect();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::Numerical("LWR kernel produced an invalid weight".into()));
        }

        let design = DMatrix::from_fn(m, p, |i, j| match j {
            0 => 1.0,
            _ => obs.location(neighbors[i].index)[j - 1],
        });
        let z: Vec<f64> = neighbors.iter().map(|n| obs.value(n.index)).collect();
        let fit = WeightedLeastSquares::fit(&design, &weights, &z)?;

        let x0 = DVector::from_fn(p, |j, _| if j == 0 { 1.0 } else { location[j - 1] });
        let mean = fit.coefficients().dot(&x0);

        let v = fit.solve_normal(&x0)?;
        let xv = &design * v;
        let influence = DVector::from_fn(m, |i, _| weights[i] * xv[i]);
        let variance = influence.norm();

        if !mean.is_finite() || !variance.is_finite() {
            return Err(Error::Numerical("LWR produced a non-finite estimate".into()));
        }
        Ok(Estimate::new(mean, variance))
    }
}
