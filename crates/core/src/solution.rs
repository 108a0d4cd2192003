//! Estimation results

use ndarray::{ArrayD, IxDyn, ShapeBuilder};

use crate::domain::RegularGrid;
use crate::error::{Error, Result};

/// Mean and variance fields of one variable.
///
/// Both sequences are indexed in the domain's canonical order. Locations
/// that could not be estimated hold NaN in both.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableEstimate {
    pub mean: Vec<f64>,
    pub variance: Vec<f64>,
}

impl VariableEstimate {
    /// Pair up mean and variance fields of equal length.
    pub fn new(mean: Vec<f64>, variance: Vec<f64>) -> Result<Self> {
        if mean.len() != variance.len() {
            return Err(Error::DimensionMismatch {
                expected: mean.len(),
                actual: variance.len(),
            });
        }
        Ok(Self { mean, variance })
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Number of locations left undefined (NaN mean)
    pub fn undefined_count(&self) -> usize {
        self.mean.iter().filter(|v| v.is_nan()).count()
    }
}

/// Estimates for every requested variable, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimationResult {
    variables: Vec<(String, VariableEstimate)>,
}

impl EstimationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the estimate of a variable, replacing any previous one.
    pub fn insert(&mut self, name: impl Into<String>, estimate: VariableEstimate) {
        let name = name.into();
        match self.variables.iter_mut().find(|(n, _)| *n == name) {
            Some((_, e)) => *e = estimate,
            None => self.variables.push((name, estimate)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&VariableEstimate> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariableEstimate)> {
        self.variables.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Flattened named fields: `"<var>"` for the mean and
    /// `"<var>_variance"` for the variance of each variable.
    pub fn fields(&self) -> Vec<(String, &[f64])> {
        self.variables
            .iter()
            .flat_map(|(n, e)| {
                [
                    (n.clone(), e.mean.as_slice()),
                    (variance_field_name(n), e.variance.as_slice()),
                ]
            })
            .collect()
    }

    /// Mean field of `name` reshaped onto `grid` (first axis fastest).
    pub fn mean_array(&self, name: &str, grid: &RegularGrid) -> Result<ArrayD<f64>> {
        let est = self.lookup(name)?;
        to_grid_array(&est.mean, grid)
    }

    /// Variance field of `name` reshaped onto `grid` (first axis fastest).
    pub fn variance_array(&self, name: &str, grid: &RegularGrid) -> Result<ArrayD<f64>> {
        let est = self.lookup(name)?;
        to_grid_array(&est.variance, grid)
    }

    fn lookup(&self, name: &str) -> Result<&VariableEstimate> {
        self.get(name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))
    }
}

/// Name of the variance field associated with variable `name`.
pub fn variance_field_name(name: &str) -> String {
    format!("{}_variance", name)
}

fn to_grid_array(values: &[f64], grid: &RegularGrid) -> Result<ArrayD<f64>> {
    // Column-major layout matches the grid's first-axis-fastest enumeration
    ArrayD::from_shape_vec(IxDyn(grid.shape()).f(), values.to_vec())
        .map_err(|e| Error::Other(e.to_string()))
}
