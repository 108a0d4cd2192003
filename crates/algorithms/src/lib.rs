//! # geoestim Algorithms
//!
//! Spatial estimation algorithms for geoestim.
//!
//! ## Components
//!
//! - **spatial**: distance metrics, k-d and ball trees, neighbor search strategies
//! - **interpolation**: IDW, Locally Weighted Regression, Kriging and variogram models
//! - **engine**: estimation driver (exact and approximate modes) and per-method solvers
//! - **linalg**: pivoted LU and weighted least squares used by the estimators
//!
//! ## Example
//!
//! ```
//! use geoestim_algorithms::prelude::*;
//!
//! let data = SpatialData::from_points(&[[25.0, 25.0], [50.0, 75.0], [75.0, 50.0]])
//!     .with_values("z", vec![1.0, 0.0, 1.0])?;
//! let grid = RegularGrid::unit(vec![100, 100])?;
//! let variables = vec!["z".to_string()];
//! let problem = EstimationProblem::new(&data, &grid, &variables)?;
//!
//! let params = KrigingParams::new(VariogramModel::gaussian(1.0, 35.0));
//! let result = KrigingSolver::new(params).solve(&problem)?;
//! let surface = result.mean_array("z", &grid)?;
//! assert_eq!(surface.shape(), &[100, 100]);
//! # Ok::<(), geoestim_core::Error>(())
//! ```

pub mod engine;
pub mod interpolation;
pub mod linalg;
pub(crate) mod maybe_rayon;
pub mod spatial;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::{
        CancellationToken, EstimationDriver, EstimationOptions, ExecutionMode, IdwSolver, KrigingSolver, LwrSolver,
        NumericalFailurePolicy, Solver, VariableParams,
    };
    pub use crate::interpolation::{
        DriftFn, Estimate, Estimator, IdwParams, InverseDistanceWeighting, KrigingEstimator, KrigingParams,
        KrigingVariant, LocallyWeightedRegression, LwrParams, Variogram, VariogramKind, VariogramModel, WeightFn,
    };
    pub use crate::spatial::{
        BallSearch, DistanceMetric, GlobalSearch, KBallSearch, KNearestSearch, NeighborSearch, Neighborhood,
    };
    pub use geoestim_core::prelude::*;
}
