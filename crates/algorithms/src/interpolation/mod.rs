//! Spatial estimators
//!
//! Every estimator follows the same two-step contract: `fit` on a set of
//! observations produces a model, `predict` evaluates the model at a
//! location and returns a mean together with an uncertainty.
//!
//! - **IDW**: Inverse Distance Weighting
//! - **LWR**: Locally Weighted Regression
//! - **Kriging**: Simple, Ordinary, Universal and External-Drift Kriging
//! - **Variogram**: bounded variogram models used by Kriging

pub mod drift;
mod idw;
pub mod kriging;
mod lwr;
pub mod variogram;

use geoestim_core::{ObservationSet, Result};

pub use drift::{DriftFn, PolynomialDrift};
pub use idw::{IdwModel, IdwParams, InverseDistanceWeighting};
pub use kriging::{KrigingEstimator, KrigingModel, KrigingParams, KrigingVariant, KrigingWeights};
pub use lwr::{LocallyWeightedRegression, LwrModel, LwrParams, WeightFn};
pub use variogram::{Variogram, VariogramKind, VariogramModel};

/// Mean and uncertainty at a single location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub mean: f64,
    pub variance: f64,
}

impl Estimate {
    /// Sentinel for locations that could not be estimated.
    pub const UNDEFINED: Estimate = Estimate {
        mean: f64::NAN,
        variance: f64::NAN,
    };

    pub fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }

    pub fn is_undefined(&self) -> bool {
        self.mean.is_nan()
    }
}

/// Shared fit/predict contract of all estimators.
pub trait Estimator: Send + Sync {
    /// State produced by [`Estimator::fit`].
    type Model: Send + Sync;

    /// Fit on the given observations.
    fn fit(&self, observations: &ObservationSet) -> Result<Self::Model>;

    /// Evaluate a fitted model at `location`.
    fn predict(&self, model: &Self::Model, location: &[f64]) -> Result<Estimate>;
}
