//! Inverse Distance Weighting (IDW)
//!
//! Estimates values at unknown locations as a weighted average of nearby
//! observations, where weights are inversely proportional to distance
//! raised to a power parameter:
//!
//! ```text
//! z(x) = Σ(wᵢ · zᵢ) / Σ(wᵢ)
//! where wᵢ = 1 / d(x, xᵢ)^p
//! ```
//!
//! Weights are computed as `(d_min / dᵢ)^p`, which leaves the normalized
//! weights unchanged and keeps them finite for very small distances.
//!
//! A location that coincides with an observation takes its value exactly.
//! The reported uncertainty is the distance to the closest neighbor.
//!
//! Reference:
//! Shepard, D. (1968). A two-dimensional interpolation function for
//! irregularly-spaced data. ACM National Conference.

use serde::{Deserialize, Serialize};
use tracing::debug;

use geoestim_core::{Error, ObservationSet, Result};

use super::{Estimate, Estimator};
use crate::spatial::{DistanceMetric, GlobalSearch, KNearestSearch, Neighbor, NeighborSearch};

/// Parameters for IDW
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdwParams {
    /// Number of nearest observations to use.
    /// `None` means every observation is used (global IDW).
    pub neighbors: Option<usize>,
    /// Metric used for neighbor search and weighting
    pub distance: DistanceMetric,
    /// Power parameter (default: 1.0).
    /// Higher values give more weight to nearby observations.
    pub power: f64,
}

impl Default for IdwParams {
    fn default() -> Self {
        Self {
            neighbors: None,
            distance: DistanceMetric::Euclidean,
            power: 1.0,
        }
    }
}

impl IdwParams {
    pub fn with_neighbors(mut self, k: usize) -> Self {
        self.neighbors = Some(k);
        self
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    /// Check the parameters against `n` observations in `ndim` dimensions.
    pub fn validate(&self, n: usize, ndim: usize) -> Result<()> {
        if self.power.is_nan() || self.power <= 0.0 {
            return Err(Error::configuration("idw.power", self.power, "must be positive"));
        }
        if let Some(k) = self.neighbors {
            if k == 0 {
                return Err(Error::configuration("idw.neighbors", k, "must be positive"));
            }
            if k > n {
                return Err(Error::configuration(
                    "idw.neighbors",
                    k,
                    format!("exceeds the {n} available observations"),
                ));
            }
        }
        self.distance.validate(ndim)
    }
}

/// IDW estimator
#[derive(Debug, Clone, Default)]
pub struct InverseDistanceWeighting {
    params: IdwParams,
}

/// Fitted IDW state: a neighbor index over the observations.
pub struct IdwModel {
    search: Box<dyn NeighborSearch>,
    values: Vec<f64>,
    power: f64,
}

impl InverseDistanceWeighting {
    pub fn new(params: IdwParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IdwParams {
        &self.params
    }
}

impl IdwModel {
    /// Normalized weight of each neighbor of `location`, as `(index, weight)`.
    ///
    /// A neighbor at distance zero receives the whole weight.
    pub fn weights(&self, location: &[f64]) -> Vec<(usize, f64)> {
        let neighbors = self.search.search(location);
        if let Some(hit) = exact_match(&neighbors) {
            return vec![(hit.index, 1.0)];
        }
        let nearest = nearest_distance(&neighbors);
        let raw: Vec<f64> = neighbors
            .iter()
            .map(|n| relative_weight(nearest, n.distance, self.power))
            .collect();
        let total: f64 = raw.iter().sum();
        neighbors
            .iter()
            .zip(raw)
            .map(|(n, w)| (n.index, w / total))
            .collect()
    }
}

/// Lowest-index neighbor at distance zero, if any.
fn exact_match(neighbors: &[Neighbor]) -> Option<&Neighbor> {
    neighbors
        .iter()
        .filter(|n| n.distance == 0.0)
        .min_by_key(|n| n.index)
}

fn nearest_distance(neighbors: &[Neighbor]) -> f64 {
    neighbors.iter().map(|n| n.distance).fold(f64::INFINITY, f64::min)
}

/// Weight of a neighbor at `distance`, relative to the nearest one.
#[inline]
fn relative_weight(nearest: f64, distance: f64, power: f64) -> f64 {
    (nearest / distance).powf(power)
}

impl Estimator for InverseDistanceWeighting {
    type Model = IdwModel;

    fn fit(&self, observations: &ObservationSet) -> Result<IdwModel> {
        if observations.is_empty() {
            return Err(Error::InsufficientData("IDW needs at least one observation".into()));
        }
        self.params.validate(observations.len(), observations.ndim())?;

        let search: Box<dyn NeighborSearch> = match self.params.neighbors {
            Some(k) => Box::new(KNearestSearch::new(observations, k, self.params.distance)?),
            None => Box::new(GlobalSearch::new(observations, self.params.distance)?),
        };
        debug!(
            observations = observations.len(),
            neighbors = ?self.params.neighbors,
            power = self.params.power,
            "fitted IDW"
        );

        Ok(IdwModel {
            search,
            values: observations.values().to_vec(),
            power: self.params.power,
        })
    }

    fn predict(&self, model: &IdwModel, location: &[f64]) -> Result<Estimate> {
        let neighbors = model.search.search(location);
        if neighbors.is_empty() {
            return Ok(Estimate::UNDEFINED);
        }
        if let Some(hit) = exact_match(&neighbors) {
            return Ok(Estimate::new(model.values[hit.index], 0.0));
        }

        let nearest = nearest_distance(&neighbors);
        let mut sum_w = 0.0;
        let mut sum_wz = 0.0;
        for n in &neighbors {
            let w = relative_weight(nearest, n.distance, model.power);
            sum_w += w;
            sum_wz += w * model.values[n.index];
        }

        if sum_w > 0.0 && sum_w.is_finite() {
            Ok(Estimate::new(sum_wz / sum_w, nearest))
        } else {
            Err(Error::Numerical(format!(
                "IDW weights do not normalize (sum = {sum_w})"
            )))
        }
    }
}
