//! N-dimensional k-d tree for spatial indexing
//!
//! Provides O(log n) average k-nearest-neighbor and range queries for
//! scattered observations under Minkowski-family metrics, where any
//! single coordinate difference is a lower bound of the full distance.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use ndarray::ArrayView2;

use geoestim_core::{Error, Result};

use super::{sort_neighbors, DistanceMetric, KnnHeap, Neighbor};

/// A k-d tree over a fixed set of points.
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    /// Point coordinates, row-major
    coords: Vec<f64>,
    ndim: usize,
    metric: DistanceMetric,
}

#[derive(Debug)]
struct KdNode {
    /// Row index into `points`
    point_idx: usize,
    /// Axis this node splits on
    split_dim: usize,
    left: Option<usize>,
    right: Option<usize>,
}

impl KdTree {
    /// Build a k-d tree from an `n × d` array of points.
    ///
    /// Construction is O(n log n) using median splits on cycling axes.
    pub fn build(points: ArrayView2<'_, f64>, metric: DistanceMetric) -> Result<Self> {
        if !metric.is_minkowski() {
            return Err(Error::configuration(
                "distance",
                format!("{:?}", metric),
                "k-d tree requires a Minkowski-family metric",
            ));
        }

        let ndim = points.ncols();
        let coords: Vec<f64> = points.rows().into_iter().flatten().copied().collect();
        let mut tree = Self {
            nodes: Vec::with_capacity(points.nrows()),
            coords,
            ndim,
            metric,
        };
        if points.nrows() > 0 && ndim > 0 {
            let mut indices: Vec<usize> = (0..points.nrows()).collect();
            tree.build_recursive(&mut indices, 0);
        }
        Ok(tree)
    }

    /// Number of points in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    #[inline]
    fn point(&self, i: usize) -> &[f64] {
        &self.coords[i * self.ndim..(i + 1) * self.ndim]
    }

    /// Find the k nearest points to `query`.
    ///
    /// Returns `min(k, n)` results sorted by ascending distance, ties by index.
    pub fn k_nearest(&self, query: &[f64], k: usize) -> Vec<Neighbor> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }
        let mut heap = KnnHeap::new(k.min(self.len()));
        self.knn_recursive(0, query, &mut heap);
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

    fn knn_recursive(&self, node_idx: usize, query: &[f64], heap: &mut KnnHeap) {
        let node = &self.nodes[node_idx];
        let p = self.point(node.point_idx);
        let dist = self.metric.distance(query, p);

        heap.push(Neighbor::new(node.point_idx, dist));

        let diff = query[node.split_dim] - p[node.split_dim];
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.knn_recursive(child, query, heap);
        }

        // Equal distances still have to be visited for index tie-breaking
        if diff.abs() <= heap.bound() {
            if let Some(child) = second {
                self.knn_recursive(child, query, heap);
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
        let p = self.point(node.point_idx);
        let dist = self.metric.distance(query, p);

        if dist <= radius {
            results.push(Neighbor::new(node.point_idx, dist));
        }

        let diff = query[node.split_dim] - p[node.split_dim];

        // Left subtree holds coordinates <= the split value, right holds >=
        if let Some(left) = node.left {
            if diff <= 0.0 || diff.abs() <= radius {
                self.radius_recursive(left, query, radius, results);
            }
        }

        if let Some(right) = node.right {
            if diff >= 0.0 || diff.abs() <= radius {
                self.radius_recursive(right, query, radius, results);
            }
        }
    }

    /// Recursively build the tree over `indices`, returning the node index.
    fn build_recursive(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let split_dim = depth % self.ndim;
        let median = indices.len() / 2;

        let coords = &self.coords;
        let ndim = self.ndim;
        indices.select_nth_unstable_by(median, |&a, &b| {
            coords[a * ndim + split_dim]
                .total_cmp(&coords[b * ndim + split_dim])
                .then(a.cmp(&b))
        });

        let node_idx = self.nodes.len();
        self.nodes.push(KdNode {
            point_idx: indices[median],
            split_dim,
            left: None,
            right: None,
        });

        let (lower, rest) = indices.split_at_mut(median);
        let upper = &mut rest[1..];

        if !lower.is_empty() {
            let left_idx = self.build_recursive(lower, depth + 1);
            self.nodes[node_idx].left = Some(left_idx);
        }

        if !upper.is_empty() {
            let right_idx = self.build_recursive(upper, depth + 1);
            self.nodes[node_idx].right = Some(right_idx);
        }

        node_idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn sample_points() -> Array2<f64> {
        array![
            [2.0, 3.0],
            [5.0, 4.0],
            [9.0, 6.0],
            [4.0, 7.0],
            [8.0, 1.0],
            [7.0, 2.0],
            [1.0, 8.0],
            [6.0, 5.0],
        ]
    }

    fn brute_force(pts: &Array2<f64>, q: &[f64], metric: DistanceMetric) -> Vec<Neighbor> {
        let mut all: Vec<Neighbor> = pts
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, r)| Neighbor::new(i, metric.distance(q, r.as_slice().unwrap())))
            .collect();
        sort_neighbors(&mut all);
        all
    }

    #[test]
    fn test_build_and_size() {
        let pts = sample_points();
        let tree = KdTree::build(pts.view(), DistanceMetric::Euclidean).unwrap();
        assert_eq!(tree.len(), 8);
        assert!(!tree.is_empty());
    }

    #[test]
    fn test_empty_tree() {
        let pts = Array2::<f64>::zeros((0, 2));
        let tree = KdTree::build(pts.view(), DistanceMetric::Euclidean).unwrap();
        assert!(tree.is_empty());
        assert!(tree.k_nearest(&[0.0, 0.0], 3).is_empty());
        assert!(tree.within_radius(&[0.0, 0.0], 10.0).is_empty());
    }

    #[test]
    fn test_rejects_haversine() {
        let pts = sample_points();
        assert!(KdTree::build(pts.view(), DistanceMetric::haversine()).is_err());
    }

    #[test]
    fn test_k_nearest_matches_brute_force() {
        let pts = sample_points();
        for metric in [
            DistanceMetric::Euclidean,
            DistanceMetric::Manhattan,
            DistanceMetric::Chebyshev,
            DistanceMetric::Minkowski(3.0),
        ] {
            let tree = KdTree::build(pts.view(), metric).unwrap();
            for qx in 0..10 {
                for qy in 0..10 {
                    let q = [qx as f64 + 0.25, qy as f64 + 0.5];
                    let got = tree.k_nearest(&q, 3);
                    let expected = brute_force(&pts, &q, metric);
                    assert_eq!(got.len(), 3);
                    for (g, e) in got.iter().zip(expected.iter()) {
                        assert_eq!(g.index, e.index, "{:?} at {:?}", metric, q);
                        assert!((g.distance - e.distance).abs() < 1e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn test_k_nearest_ties_by_index() {
        // Four points equidistant from the origin
        let pts = array![[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]];
        let tree = KdTree::build(pts.view(), DistanceMetric::Euclidean).unwrap();
        let got: Vec<usize> = tree.k_nearest(&[0.0, 0.0], 2).iter().map(|n| n.index).collect();
        assert_eq!(got, vec![0, 1]);
    }

    #[test]
    fn test_k_nearest_more_than_points() {
        let pts = sample_points();
        let tree = KdTree::build(pts.view(), DistanceMetric::Euclidean).unwrap();
        assert_eq!(tree.k_nearest(&[5.0, 5.0], 100).len(), pts.nrows());
    }

    #[test]
    fn test_within_radius() {
        let pts = sample_points();
        let tree = KdTree::build(pts.view(), DistanceMetric::Euclidean).unwrap();
        let results = tree.within_radius(&[5.0, 5.0], 2.0);

        let bf: Vec<usize> = brute_force(&pts, &[5.0, 5.0], DistanceMetric::Euclidean)
            .into_iter()
            .filter(|n| n.distance <= 2.0)
            .map(|n| n.index)
            .collect();
        let got: Vec<usize> = results.iter().map(|n| n.index).collect();
        assert_eq!(got, bf);
    }

    #[test]
    fn test_three_dimensions() {
        let pts: Array2<f64> = Array2::from_shape_fn((60, 3), |(i, j)| {
            ((i * (7 + 4 * j) + 13 * j) % 23) as f64
        });
        let tree = KdTree::build(pts.view(), DistanceMetric::Euclidean).unwrap();
        let q = [11.3, 4.2, 17.9];
        let got = tree.k_nearest(&q, 5);
        let expected = brute_force(&pts, &q, DistanceMetric::Euclidean);
        assert_eq!(&got[..], &expected[..5]);
    }
}
