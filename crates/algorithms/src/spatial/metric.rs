//! Distance metrics between locations

use serde::{Deserialize, Serialize};

use geoestim_core::{Error, Result};

/// Mean Earth radius in meters, used by [`DistanceMetric::Haversine`] by default.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Distance metric used for neighbor search and weighting.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// √(Σ(aᵢ - bᵢ)²)
    #[default]
    Euclidean,
    /// Σ|aᵢ - bᵢ|
    Manhattan,
    /// max|aᵢ - bᵢ|
    Chebyshev,
    /// (Σ|aᵢ - bᵢ|^p)^(1/p), p ≥ 1
    Minkowski(f64),
    /// Great-circle distance between (longitude, latitude) pairs in degrees.
    Haversine { radius: f64 },
}

impl DistanceMetric {
    /// Haversine metric on a sphere of Earth's mean radius (meters).
    pub fn haversine() -> Self {
        DistanceMetric::Haversine {
            radius: EARTH_RADIUS,
        }
    }

    /// Distance between two points of equal dimension.
    #[inline]
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len(), "Points must have same dimension");
        match *self {
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
            DistanceMetric::Chebyshev => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y).abs())
                .fold(0.0, f64::max),
            DistanceMetric::Minkowski(p) => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y).abs().powf(p))
                .sum::<f64>()
                .powf(1.0 / p),
            DistanceMetric::Haversine { radius } => haversine(a, b, radius),
        }
    }

    /// Whether the distance is bounded below by every per-axis coordinate
    /// difference, which is what k-d tree pruning relies on.
    pub fn is_minkowski(&self) -> bool {
        !matches!(self, DistanceMetric::Haversine { .. })
    }

    /// Check the metric's parameters against the coordinate dimension.
    pub fn validate(&self, ndim: usize) -> Result<()> {
        match *self {
            DistanceMetric::Minkowski(p) if p.is_nan() || p < 1.0 => Err(Error::configuration(
                "distance",
                format!("Minkowski({})", p),
                "exponent must be at least 1",
            )),
            DistanceMetric::Haversine { radius } if radius.is_nan() || radius <= 0.0 => {
                Err(Error::configuration("distance", radius, "haversine radius must be positive"))
            }
            DistanceMetric::Haversine { .. } if ndim != 2 => Err(Error::configuration(
                "distance",
                "haversine",
                format!("requires (lon, lat) coordinates, got {} dimensions", ndim),
            )),
            _ => Ok(()),
        }
    }
}

fn haversine(a: &[f64], b: &[f64], radius: f64) -> f64 {
    let (lon1, lat1) = (a[0].to_radians(), a[1].to_radians());
    let (lon2, lat2) = (b[0].to_radians(), b[1].to_radians());
    let s_lat = ((lat2 - lat1) / 2.0).sin();
    let s_lon = ((lon2 - lon1) / 2.0).sin();
    let h = s_lat * s_lat + lat1.cos() * lat2.cos() * s_lon * s_lon;
    2.0 * radius * h.sqrt().min(1.0).asin()
}
