//! Estimation problems: what to estimate, from which data, where

use crate::data::SpatialData;
use crate::domain::Domain;
use crate::error::{Error, Result};

/// A request to estimate some variables of `data` over `domain`.
#[derive(Debug)]
pub struct EstimationProblem<'a, D: Domain> {
    data: &'a SpatialData,
    domain: &'a D,
    variables: &'a [String],
}

impl<'a, D: Domain> EstimationProblem<'a, D> {
    /// Create a problem, checking that every variable exists and that the
    /// data and domain share the same coordinate dimension.
    pub fn new(data: &'a SpatialData, domain: &'a D, variables: &'a [String]) -> Result<Self> {
        if data.ndim() != domain.ndim() {
            return Err(Error::DimensionMismatch {
                expected: domain.ndim(),
                actual: data.ndim(),
            });
        }
        if variables.is_empty() {
            return Err(Error::configuration("variables", "[]", "nothing to estimate"));
        }
        if let Some(missing) = variables.iter().find(|v| !data.has_variable(v)) {
            return Err(Error::UnknownVariable(missing.clone()));
        }
        Ok(Self {
            data,
            domain,
            variables,
        })
    }

    pub fn data(&self) -> &'a SpatialData {
        self.data
    }

    pub fn domain(&self) -> &'a D {
        self.domain
    }

    /// Requested variables, in request order
    pub fn variables(&self) -> &'a [String] {
        self.variables
    }
}
