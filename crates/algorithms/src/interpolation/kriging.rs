//! Kriging
//!
//! Best Linear Unbiased Estimator (BLUE) for spatial data. A variogram model
//! gives the covariance `C(a, b) = sill - γ(a, b)` between locations, and the
//! weights λ minimize the estimation variance subject to unbiasedness
//! constraints on a set of drift functions fₖ:
//!
//! ```text
//! [ C   F ] [λ]   [c]        C_ij = C(xᵢ, xⱼ)    c_i = C(xᵢ, x₀)
//! [ Fᵀ  0 ] [ν] = [f]        F_ik = fₖ(xᵢ)       f_k = fₖ(x₀)
//! ```
//!
//! The variants differ only in their drift functions:
//!
//! | Variant         | Drift                                   |
//! |-----------------|-----------------------------------------|
//! | Simple          | none, residuals about a known mean      |
//! | Ordinary        | the constant 1                          |
//! | Universal       | monomials of total degree ≤ d           |
//! | External drift  | user-supplied functions of location     |
//!
//! The estimation variance is `sill - [λ, ν]·[c, f]`, clamped at zero.
//!
//! Reference:
//! Matheron, G. (1963). Principles of geostatistics. Economic Geology.
//! Cressie, N. (1993). Statistics for Spatial Data. Wiley.

use std::sync::Arc;

use ndarray::Array2;
use tracing::debug;

use geoestim_core::{Error, ObservationSet, Result};

use super::drift::{DriftFn, PolynomialDrift};
use super::variogram::{Variogram, VariogramModel};
use super::{Estimate, Estimator};
use crate::linalg::LuFactorization;
use crate::spatial::{DistanceMetric, Neighborhood};

/// Which Kriging system to solve.
#[derive(Debug, Clone, Default)]
pub enum KrigingVariant {
    /// Known constant mean
    Simple { mean: f64 },
    /// Unknown constant mean
    #[default]
    Ordinary,
    /// Polynomial trend of the given total degree
    Universal { degree: usize },
    /// Trend spanned by external drift functions
    ExternalDrift { drifts: Vec<DriftFn> },
}

impl KrigingVariant {
    /// Pick the variant implied by a set of optional settings.
    ///
    /// Drift functions take precedence over a polynomial degree, which takes
    /// precedence over a known mean. With none of them the mean is unknown.
    pub fn from_options(mean: Option<f64>, degree: Option<usize>, drifts: Option<Vec<DriftFn>>) -> Self {
        match (drifts, degree, mean) {
            (Some(drifts), _, _) => KrigingVariant::ExternalDrift { drifts },
            (None, Some(degree), _) => KrigingVariant::Universal { degree },
            (None, None, Some(mean)) => KrigingVariant::Simple { mean },
            (None, None, None) => KrigingVariant::Ordinary,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            KrigingVariant::Simple { .. } => "simple",
            KrigingVariant::Ordinary => "ordinary",
            KrigingVariant::Universal { .. } => "universal",
            KrigingVariant::ExternalDrift { .. } => "external_drift",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            KrigingVariant::Simple { mean } if !mean.is_finite() => {
                Err(Error::configuration("kriging.mean", mean, "must be finite"))
            }
            KrigingVariant::ExternalDrift { drifts } if drifts.is_empty() => Err(Error::configuration(
                "kriging.drifts",
                0,
                "at least one drift function is required",
            )),
            _ => Ok(()),
        }
    }
}

/// Parameters for Kriging
#[derive(Debug, Clone)]
pub struct KrigingParams {
    pub variant: KrigingVariant,
    pub variogram: Arc<dyn Variogram>,
    /// Locations with fewer neighbors than this are left undefined (default 1).
    pub min_neighbors: usize,
    /// Neighbors per local system (default 10).
    /// `None` solves a single global system over all observations.
    pub max_neighbors: Option<usize>,
    /// Restrict neighbors to a search neighborhood.
    pub neighborhood: Option<Neighborhood>,
    /// Metric for nearest-neighbor search when no neighborhood is given
    pub distance: DistanceMetric,
}

impl Default for KrigingParams {
    fn default() -> Self {
        Self {
            variant: KrigingVariant::Ordinary,
            variogram: Arc::new(VariogramModel::default()),
            min_neighbors: 1,
            max_neighbors: Some(10),
            neighborhood: None,
            distance: DistanceMetric::Euclidean,
        }
    }
}

impl KrigingParams {
    pub fn new(variogram: impl Variogram + 'static) -> Self {
        Self {
            variogram: Arc::new(variogram),
            ..Default::default()
        }
    }

    pub fn with_variant(mut self, variant: KrigingVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_min_neighbors(mut self, n: usize) -> Self {
        self.min_neighbors = n;
        self
    }

    pub fn with_max_neighbors(mut self, n: Option<usize>) -> Self {
        self.max_neighbors = n;
        self
    }

    pub fn with_neighborhood(mut self, neighborhood: Neighborhood) -> Self {
        self.neighborhood = Some(neighborhood);
        self
    }

    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    pub fn validate(&self, ndim: usize) -> Result<()> {
        if self.min_neighbors == 0 {
            return Err(Error::configuration("kriging.min_neighbors", 0, "must be positive"));
        }
        if let Some(max) = self.max_neighbors {
            if max == 0 {
                return Err(Error::configuration("kriging.max_neighbors", 0, "must be positive"));
            }
            if self.min_neighbors > max {
                return Err(Error::configuration(
                    "kriging.min_neighbors",
                    self.min_neighbors,
                    format!("exceeds max_neighbors ({max})"),
                ));
            }
        }
        if let Some(neighborhood) = &self.neighborhood {
            neighborhood.validate(ndim)?;
        }
        self.distance.validate(ndim)?;
        self.variogram.validate(ndim)?;
        self.variant.validate()
    }
}

/// Drift terms of a fitted system.
#[derive(Debug, Clone)]
enum DriftTerms {
    None,
    Polynomial(PolynomialDrift),
    External(Vec<DriftFn>),
}

impl DriftTerms {
    fn for_variant(variant: &KrigingVariant, observations: &ObservationSet) -> Self {
        let ndim = observations.ndim();
        match variant {
            KrigingVariant::Simple { .. } => DriftTerms::None,
            KrigingVariant::Ordinary => DriftTerms::Polynomial(PolynomialDrift::new(ndim, 0)),
            KrigingVariant::Universal { degree } => {
                DriftTerms::Polynomial(PolynomialDrift::new(ndim, *degree).centered_on(observations))
            }
            KrigingVariant::ExternalDrift { drifts } => DriftTerms::External(drifts.clone()),
        }
    }

    fn len(&self) -> usize {
        match self {
            DriftTerms::None => 0,
            DriftTerms::Polynomial(p) => p.len(),
            DriftTerms::External(d) => d.len(),
        }
    }

    fn eval(&self, k: usize, location: &[f64]) -> f64 {
        match self {
            DriftTerms::None => 0.0,
            DriftTerms::Polynomial(p) => p.eval(k, location),
            DriftTerms::External(d) => d[k].eval(location),
        }
    }
}

/// Kriging estimator for one variant and variogram.
#[derive(Debug, Clone)]
pub struct KrigingEstimator {
    variant: KrigingVariant,
    variogram: Arc<dyn Variogram>,
}

/// Factored Kriging system over a set of observations.
#[derive(Debug, Clone)]
pub struct KrigingModel {
    observations: ObservationSet,
    lu: LuFactorization,
    drift: DriftTerms,
    /// Known mean for Simple Kriging
    mean: Option<f64>,
}

/// Solution of a Kriging system at one location.
#[derive(Debug, Clone, PartialEq)]
pub struct KrigingWeights {
    /// Weight λᵢ of each observation
    pub lambda: Vec<f64>,
    /// Lagrange multiplier ν of each drift constraint
    pub multipliers: Vec<f64>,
    /// Estimation variance, clamped at zero
    pub variance: f64,
}

impl KrigingEstimator {
    pub fn new(variant: KrigingVariant, variogram: Arc<dyn Variogram>) -> Self {
        Self { variant, variogram }
    }

    pub fn from_params(params: &KrigingParams) -> Self {
        Self::new(params.variant.clone(), Arc::clone(&params.variogram))
    }

    pub fn variant(&self) -> &KrigingVariant {
        &self.variant
    }

    /// Solve for the weights at `location` with a fitted model.
    pub fn weights(&self, model: &KrigingModel, location: &[f64]) -> Result<KrigingWeights> {
        let obs = &model.observations;
        let n = obs.len();
        let p = model.drift.len();

        let mut rhs = Vec::with_capacity(n + p);
        rhs.extend((0..n).map(|i| self.variogram.covariance(obs.location(i), location)));
        rhs.extend((0..p).map(|k| model.drift.eval(k, location)));

        let solution = model.lu.solve(&rhs)?;
        let explained: f64 = solution.iter().zip(&rhs).map(|(s, r)| s * r).sum();
        let variance = (self.variogram.sill() - explained).max(0.0);

        let mut lambda = solution;
        let multipliers = lambda.split_off(n);
        Ok(KrigingWeights {
            lambda,
            multipliers,
            variance,
        })
    }
}

impl Estimator for KrigingEstimator {
    type Model = KrigingModel;

    fn fit(&self, observations: &ObservationSet) -> Result<KrigingModel> {
        if observations.is_empty() {
            return Err(Error::InsufficientData("Kriging needs at least one observation".into()));
        }
        let n = observations.len();
        let drift = DriftTerms::for_variant(&self.variant, observations);
        let p = drift.len();
        if n < p {
            return Err(Error::Numerical(format!(
                "{} Kriging needs at least {} observations, got {}",
                self.variant.name(),
                p,
                n
            )));
        }

        let size = n + p;
        let mut system = Array2::<f64>::zeros((size, size));
        for i in 0..n {
            let xi = observations.location(i);
            for j in i..n {
                let c = self.variogram.covariance(xi, observations.location(j));
                system[[i, j]] = c;
                system[[j, i]] = c;
            }
            for k in 0..p {
                let f = drift.eval(k, xi);
                system[[i, n + k]] = f;
                system[[n + k, i]] = f;
            }
        }

        let lu = LuFactorization::factor(system).map_err(|e| match e {
            Error::Numerical(msg) => Error::Numerical(format!(
                "{} Kriging system is singular: {msg}",
                self.variant.name()
            )),
            other => other,
        })?;
        debug!(
            variant = self.variant.name(),
            observations = n,
            constraints = p,
            "factored Kriging system"
        );

        let mean = match self.variant {
            KrigingVariant::Simple { mean } => Some(mean),
            _ => None,
        };
        Ok(KrigingModel {
            observations: observations.clone(),
            lu,
            drift,
            mean,
        })
    }

    fn predict(&self, model: &KrigingModel, location: &[f64]) -> Result<Estimate> {
        let weights = self.weights(model, location)?;
        let values = model.observations.values();

        let mean = match model.mean {
            Some(mu) => {
                mu + weights
                    .lambda
                    .iter()
                    .zip(values)
                    .map(|(l, z)| l * (z - mu))
                    .sum::<f64>()
            }
            None => weights.lambda.iter().zip(values).map(|(l, z)| l * z).sum(),
        };

        if !mean.is_finite() {
            return Err(Error::Numerical("Kriging produced a non-finite estimate".into()));
        }
        Ok(Estimate::new(mean, weights.variance))
    }
}
