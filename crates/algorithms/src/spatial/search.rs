//! Neighbor search strategies
//!
//! A search strategy answers "which observations are candidate neighbors
//! of this query point". Every strategy returns `(index, distance)` pairs
//! sorted by ascending distance with ties broken by observation index,
//! except [`GlobalSearch`] which returns every observation in index order.

use serde::{Deserialize, Serialize};

use geoestim_core::{Error, ObservationSet, Result};

use super::{DistanceMetric, Neighbor, SpatialIndex};

/// Find candidate neighbors of a query location.
pub trait NeighborSearch: Send + Sync {
    /// Candidate neighbors of `query`.
    fn search(&self, query: &[f64]) -> Vec<Neighbor>;

    /// Upper bound on the number of results, if any.
    fn max_neighbors(&self) -> Option<usize> {
        None
    }
}

/// Explicit search neighborhood geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighborhood {
    /// Metric ball of fixed radius around the query point.
    Ball { radius: f64, metric: DistanceMetric },
}

impl Neighborhood {
    /// Euclidean ball of the given radius.
    pub fn ball(radius: f64) -> Self {
        Neighborhood::Ball {
            radius,
            metric: DistanceMetric::Euclidean,
        }
    }

    pub fn validate(&self, ndim: usize) -> Result<()> {
        match *self {
            Neighborhood::Ball { radius, metric } => {
                if radius.is_nan() || radius <= 0.0 {
                    return Err(Error::configuration("neighborhood", radius, "radius must be positive"));
                }
                metric.validate(ndim)
            }
        }
    }
}

/// Every observation is a neighbor.
#[derive(Debug)]
pub struct GlobalSearch {
    coords: Vec<f64>,
    ndim: usize,
    metric: DistanceMetric,
}

impl GlobalSearch {
    pub fn new(observations: &ObservationSet, metric: DistanceMetric) -> Result<Self> {
        metric.validate(observations.ndim())?;
        let coords = (0..observations.len())
            .flat_map(|i| observations.location(i).iter().copied())
            .collect();
        Ok(Self {
            coords,
            ndim: observations.ndim(),
            metric,
        })
    }
}

impl NeighborSearch for GlobalSearch {
    fn search(&self, query: &[f64]) -> Vec<Neighbor> {
        self.coords
            .chunks_exact(self.ndim.max(1))
            .enumerate()
            .map(|(i, p)| Neighbor::new(i, self.metric.distance(query, p)))
            .collect()
    }
}

/// The `min(k, n)` nearest observations.
#[derive(Debug)]
pub struct KNearestSearch {
    index: SpatialIndex,
    k: usize,
}

impl KNearestSearch {
    pub fn new(observations: &ObservationSet, k: usize, metric: DistanceMetric) -> Result<Self> {
        if k == 0 {
            return Err(Error::configuration("neighbors", k, "must be positive"));
        }
        Ok(Self {
            index: SpatialIndex::build(observations.coords().view(), metric)?,
            k,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl NeighborSearch for KNearestSearch {
    fn search(&self, query: &[f64]) -> Vec<Neighbor> {
        self.index.k_nearest(query, self.k)
    }

    fn max_neighbors(&self) -> Option<usize> {
        Some(self.k)
    }
}

/// All observations within a metric ball around the query.
#[derive(Debug)]
pub struct BallSearch {
    index: SpatialIndex,
    radius: f64,
}

impl BallSearch {
    pub fn new(observations: &ObservationSet, neighborhood: Neighborhood) -> Result<Self> {
        neighborhood.validate(observations.ndim())?;
        let Neighborhood::Ball { radius, metric } = neighborhood;
        Ok(Self {
            index: SpatialIndex::build(observations.coords().view(), metric)?,
            radius,
        })
    }
}

impl NeighborSearch for BallSearch {
    fn search(&self, query: &[f64]) -> Vec<Neighbor> {
        self.index.within_radius(query, self.radius)
    }
}

/// At most `k` closest observations within a metric ball.
#[derive(Debug)]
pub struct KBallSearch {
    ball: BallSearch,
    k: usize,
}

impl KBallSearch {
    pub fn new(observations: &ObservationSet, k: usize, neighborhood: Neighborhood) -> Result<Self> {
        if k == 0 {
            return Err(Error::configuration("neighbors", k, "must be positive"));
        }
        Ok(Self {
            ball: BallSearch::new(observations, neighborhood)?,
            k,
        })
    }
}

impl NeighborSearch for KBallSearch {
    fn search(&self, query: &[f64]) -> Vec<Neighbor> {
        let mut found = self.ball.search(query);
        found.truncate(self.k);
        found
    }

    fn max_neighbors(&self) -> Option<usize> {
        Some(self.k)
    }
}
