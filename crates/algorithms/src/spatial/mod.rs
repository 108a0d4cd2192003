//! Spatial indexing and neighbor search
//!
//! - **metric**: distance metrics (Euclidean, Minkowski family, Haversine)
//! - **kdtree**: N-D k-d tree for Minkowski-family metrics
//! - **balltree**: metric tree for arbitrary metrics
//! - **search**: neighbor search strategies used by the estimators

mod balltree;
mod kdtree;
mod metric;
pub mod search;

use std::cmp::Ordering;

use ndarray::ArrayView2;

use geoestim_core::Result;

pub use balltree::BallTree;
pub use kdtree::KdTree;
pub use metric::{DistanceMetric, EARTH_RADIUS};
pub use search::{
    BallSearch, GlobalSearch, KBallSearch, KNearestSearch, NeighborSearch, Neighborhood,
};

/// An observation index together with its distance to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

impl Neighbor {
    pub fn new(index: usize, distance: f64) -> Self {
        Self { index, distance }
    }

    /// Ascending distance, ties broken by ascending index.
    #[inline]
    pub fn order(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.index.cmp(&other.index))
    }
}

/// Sort neighbors by ascending distance, ties by index.
pub fn sort_neighbors(neighbors: &mut [Neighbor]) {
    neighbors.sort_unstable_by(Neighbor::order);
}

/// Bounded candidate list for k-nearest queries.
///
/// Kept sorted in descending order so the current worst candidate sits at
/// position 0.
#[derive(Debug)]
pub(crate) struct KnnHeap {
    k: usize,
    items: Vec<Neighbor>,
}

impl KnnHeap {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k + 1),
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.items.len() >= self.k
    }

    /// Distance of the worst retained candidate, infinite until full.
    pub(crate) fn bound(&self) -> f64 {
        if self.is_full() {
            self.items[0].distance
        } else {
            f64::INFINITY
        }
    }

    pub(crate) fn push(&mut self, candidate: Neighbor) {
        if self.k == 0 {
            return;
        }
        if self.is_full() {
            if candidate.order(&self.items[0]) != Ordering::Less {
                return;
            }
            self.items.remove(0);
        }
        let pos = self
            .items
            .binary_search_by(|probe| probe.order(&candidate).reverse())
            .unwrap_or_else(|e| e);
        self.items.insert(pos, candidate);
    }

    pub(crate) fn into_sorted(mut self) -> Vec<Neighbor> {
        self.items.reverse();
        self.items
    }
}

/// Nearest-neighbor oracle over a fixed point set.
///
/// Uses a [`KdTree`] for Minkowski-family metrics and a [`BallTree`]
/// otherwise. Query results are always sorted by (distance, index).
#[derive(Debug)]
pub enum SpatialIndex {
    Kd(KdTree),
    Ball(BallTree),
}

impl SpatialIndex {
    /// Build the index best suited to `metric`.
    pub fn build(points: ArrayView2<'_, f64>, metric: DistanceMetric) -> Result<Self> {
        metric.validate(points.ncols())?;
        if metric.is_minkowski() {
            Ok(SpatialIndex::Kd(KdTree::build(points, metric)?))
        } else {
            Ok(SpatialIndex::Ball(BallTree::build(points, metric)?))
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SpatialIndex::Kd(t) => t.len(),
            SpatialIndex::Ball(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metric(&self) -> DistanceMetric {
        match self {
            SpatialIndex::Kd(t) => t.metric(),
            SpatialIndex::Ball(t) => t.metric(),
        }
    }

    /// The `min(k, n)` nearest points.
    pub fn k_nearest(&self, query: &[f64], k: usize) -> Vec<Neighbor> {
        match self {
            SpatialIndex::Kd(t) => t.k_nearest(query, k),
            SpatialIndex::Ball(t) => t.k_nearest(query, k),
        }
    }

    /// All points within `radius` (inclusive).
    pub fn within_radius(&self, query: &[f64], radius: f64) -> Vec<Neighbor> {
        match self {
            SpatialIndex::Kd(t) => t.within_radius(query, radius),
            SpatialIndex::Ball(t) => t.within_radius(query, radius),
        }
    }
}
