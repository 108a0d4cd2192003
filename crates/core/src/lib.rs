//! # geoestim Core
//!
//! Core types shared by the geoestim estimation engine.
//!
//! This crate provides:
//! - [`Domain`]: enumerable target locations ([`RegularGrid`], [`PointSet`])
//! - [`SpatialData`] and [`ObservationSet`]: observed values with missing-value filtering
//! - [`EstimationProblem`] and [`EstimationResult`]: the engine's input and output
//! - The crate-wide [`Error`] taxonomy

pub mod data;
pub mod domain;
pub mod error;
pub mod problem;
pub mod solution;

pub use data::{ObservationSet, SpatialData};
pub use domain::{Domain, PointSet, RegularGrid};
pub use error::{Error, Result};
pub use problem::EstimationProblem;
pub use solution::{EstimationResult, VariableEstimate};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::data::{ObservationSet, SpatialData};
    pub use crate::domain::{Domain, PointSet, RegularGrid};
    pub use crate::error::{Error, Result};
    pub use crate::problem::EstimationProblem;
    pub use crate::solution::{EstimationResult, VariableEstimate};
}
