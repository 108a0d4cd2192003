//! Ball tree (metric tree) for spatial indexing under arbitrary metrics
//!
//! Each node stores a pivot and a covering radius. The triangle
//! inequality gives the lower bound `d(q, pivot) - radius` for every
//! point below the node, which is valid for any metric, including
//! great-circle distances where k-d tree pruning is not.
//!
//! Reference:
//! Omohundro, S.M. (1989). Five balltree construction algorithms.
//! ICSI Technical Report TR-89-063.

use ndarray::ArrayView2;

use geoestim_core::Result;

use super::{sort_neighbors, DistanceMetric, KnnHeap, Neighbor};

/// Maximum number of points stored in a leaf.
const LEAF_SIZE: usize = 8;

/// A ball tree over a fixed set of points.
#[derive(Debug)]
pub struct BallTree {
    nodes: Vec<BallNode>,
    /// Point coordinates, row-major
    coords: Vec<f64>,
    ndim: usize,
    /// Point indices, permuted so that every node covers a contiguous range
    order: Vec<usize>,
    metric: DistanceMetric,
}

#[derive(Debug)]
struct BallNode {
    pivot: Vec<f64>,
    radius: f64,
    start: usize,
    end: usize,
    children: Option<(usize, usize)>,
}

impl BallTree {
    /// Build a ball tree from an `n × d` array of points.
    pub fn build(points: ArrayView2<'_, f64>, metric: DistanceMetric) -> Result<Self> {
        metric.validate(points.ncols())?;

        let n = points.nrows();
        let mut tree = Self {
            nodes: Vec::new(),
            coords: points.rows().into_iter().flatten().copied().collect(),
            ndim: points.ncols(),
            order: (0..n).collect(),
            metric,
        };
        if n > 0 && tree.ndim > 0 {
            tree.build_recursive(0, n);
        }
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    #[inline]
    fn point(&self, i: usize) -> &[f64] {
        &self.coords[i * self.ndim..(i + 1) * self.ndim]
    }

    /// Find the k nearest points to `query`, sorted by distance then index.
    pub fn k_nearest(&self, query: &[f64], k: usize) -> Vec<Neighbor> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }
        let mut heap = KnnHeap::new(k.min(self.len()));
        let root_dist = self.metric.distance(query, &self.nodes[0].pivot);
        self.knn_recursive(0, root_dist, query, &mut heap);
        heap.into_sorted()
    }

    /// Find all points within `radius` of `query` (inclusive), sorted by distance.
    pub fn within_radius(&self, query: &[f64], radius: f64) -> Vec<Neighbor> {
        if self.nodes.is_empty() || radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let mut results = Vec::new();
        self.radius_recursive(0, query, radius, &mut results);
        sort_neighbors(&mut results);
        results
    }

    fn knn_recursive(&self, node_idx: usize, pivot_dist: f64, query: &[f64], heap: &mut KnnHeap) {
        let node = &self.nodes[node_idx];
        if pivot_dist - node.radius > heap.bound() {
            return;
        }

        match node.children {
            None => {
                for &i in &self.order[node.start..node.end] {
                    heap.push(Neighbor::new(i, self.metric.distance(query, self.point(i))));
                }
            }
            Some((a, b)) => {
                let da = self.metric.distance(query, &self.nodes[a].pivot);
                let db = self.metric.distance(query, &self.nodes[b].pivot);
                // Closer child first tightens the bound sooner
                if da <= db {
                    self.knn_recursive(a, da, query, heap);
                    self.knn_recursive(b, db, query, heap);
                } else {
                    self.knn_recursive(b, db, query, heap);
                    self.knn_recursive(a, da, query, heap);
                }
            }
        }
    }

    fn radius_recursive(
        &self,
        node_idx: usize,
        query: &[f64],
        radius: f64,
        results: &mut Vec<Neighbor>,
    ) {
        let node = &self.nodes[node_idx];
        if self.metric.distance(query, &node.pivot) - node.radius > radius {
            return;
        }

        match node.children {
            None => {
                for &i in &self.order[node.start..node.end] {
                    let d = self.metric.distance(query, self.point(i));
                    if d <= radius {
                        results.push(Neighbor::new(i, d));
                    }
                }
            }
            Some((a, b)) => {
                self.radius_recursive(a, query, radius, results);
                self.radius_recursive(b, query, radius, results);
            }
        }
    }

    /// Build the node covering `order[start..end]`, returning its index.
    fn build_recursive(&mut self, start: usize, end: usize) -> usize {
        let ndim = self.ndim;

        // Pivot: coordinate-wise mean of the covered points
        let mut pivot = vec![0.0; ndim];
        for &i in &self.order[start..end] {
            for (p, c) in pivot.iter_mut().zip(self.point(i)) {
                *p += c;
            }
        }
        let count = (end - start) as f64;
        pivot.iter_mut().for_each(|p| *p /= count);

        let radius = self.order[start..end]
            .iter()
            .map(|&i| self.metric.distance(&pivot, self.point(i)))
            .fold(0.0, f64::max);

        let node_idx = self.nodes.len();
        self.nodes.push(BallNode {
            pivot,
            radius,
            start,
            end,
            children: None,
        });

        if end - start <= LEAF_SIZE {
            return node_idx;
        }

        // Split along the axis of greatest coordinate spread
        let split_dim = (0..ndim)
            .map(|d| {
                let (lo, hi) = self.order[start..end].iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &i| {
                        let v = self.coords[i * ndim + d];
                        (lo.min(v), hi.max(v))
                    },
                );
                (d, hi - lo)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(d, _)| d)
            .unwrap_or(0);

        let mid = (end - start) / 2;
        let coords = &self.coords;
        self.order[start..end].select_nth_unstable_by(mid, |&a, &b| {
            coords[a * ndim + split_dim]
                .total_cmp(&coords[b * ndim + split_dim])
                .then(a.cmp(&b))
        });

        let left = self.build_recursive(start, start + mid);
        let right = self.build_recursive(start + mid, end);
        self.nodes[node_idx].children = Some((left, right));

        node_idx
    }
}
