//! Estimation engine: drivers and solvers
//!
//! [`EstimationDriver`] runs one estimator for one variable over a domain.
//! The [`Solver`] implementations build on it to estimate every variable of
//! an [`EstimationProblem`](geoestim_core::EstimationProblem).

mod driver;
mod solver;

pub use driver::{
    CancellationToken, DriverState, EstimationDriver, EstimationOptions, ExecutionMode, NumericalFailurePolicy,
};
pub use solver::{IdwSolver, KrigingSolver, LwrSolver, Solver, VariableParams};
