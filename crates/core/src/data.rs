//! Observed data and per-variable observation sets

use ndarray::{Array2, ArrayView2};

use crate::error::{Error, Result};

/// Observation locations with one or more named variables.
///
/// Values may be missing, either as `None` or as NaN. Variables keep
/// their insertion order.
#[derive(Debug, Clone)]
pub struct SpatialData {
    coords: Array2<f64>,
    variables: Vec<(String, Vec<Option<f64>>)>,
}

impl SpatialData {
    /// Start from an `n × d` array of observation coordinates.
    pub fn new(coords: Array2<f64>) -> Self {
        Self {
            coords,
            variables: Vec::new(),
        }
    }

    /// Build from fixed-size coordinate tuples.
    pub fn from_points<const D: usize>(points: &[[f64; D]]) -> Self {
        Self::new(Array2::from_shape_fn((points.len(), D), |(i, j)| points[i][j]))
    }

    /// Attach a variable with possibly-missing values.
    ///
    /// Replaces an existing variable of the same name.
    pub fn with_variable(mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<Self> {
        if values.len() != self.coords.nrows() {
            return Err(Error::DimensionMismatch {
                expected: self.coords.nrows(),
                actual: values.len(),
            });
        }
        let name = name.into();
        match self.variables.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = values,
            None => self.variables.push((name, values)),
        }
        Ok(self)
    }

    /// Attach a fully-specified variable. NaN entries count as missing.
    pub fn with_values(self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let values = values
            .into_iter()
            .map(|v| if v.is_nan() { None } else { Some(v) })
            .collect();
        self.with_variable(name, values)
    }

    /// Number of observation locations (including those with missing values)
    pub fn len(&self) -> usize {
        self.coords.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.nrows() == 0
    }

    /// Coordinate dimension
    pub fn ndim(&self) -> usize {
        self.coords.ncols()
    }

    pub fn coords(&self) -> ArrayView2<'_, f64> {
        self.coords.view()
    }

    /// Variable names in insertion order
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|(n, _)| n.as_str())
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|(n, _)| n == name)
    }

    /// Raw values of a variable, missing entries included.
    pub fn values(&self, name: &str) -> Option<&[Option<f64>]> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }
}

/// The non-missing observations of one variable.
///
/// Built once per variable and immutable afterwards. Always holds at
/// least one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSet {
    /// Coordinates, row-major
    coords: Vec<f64>,
    ndim: usize,
    values: Vec<f64>,
    /// Row of each observation in the originating [`SpatialData`]
    source: Vec<usize>,
}

impl ObservationSet {
    /// Collect the observations of `variable`, dropping missing values.
    pub fn from_data(data: &SpatialData, variable: &str) -> Result<Self> {
        let raw = data
            .values(variable)
            .ok_or_else(|| Error::UnknownVariable(variable.to_string()))?;

        let source: Vec<usize> = raw
            .iter()
            .enumerate()
            .filter_map(|(i, v)| match v {
                Some(x) if !x.is_nan() => Some(i),
                _ => None,
            })
            .collect();

        if source.is_empty() {
            return Err(Error::InsufficientData(format!(
                "variable '{}' has no observed values",
                variable
            )));
        }

        let coords = source
            .iter()
            .flat_map(|&i| data.coords.row(i).to_vec())
            .collect();
        let values = source.iter().filter_map(|&i| raw[i]).collect();

        Ok(Self {
            coords,
            ndim: data.ndim(),
            values,
            source,
        })
    }

    /// Build directly from coordinates and values.
    pub fn new(coords: Array2<f64>, values: Vec<f64>) -> Result<Self> {
        if coords.nrows() != values.len() {
            return Err(Error::DimensionMismatch {
                expected: coords.nrows(),
                actual: values.len(),
            });
        }
        if values.is_empty() {
            return Err(Error::InsufficientData("no observations provided".into()));
        }
        let source = (0..values.len()).collect();
        Ok(Self {
            ndim: coords.ncols(),
            coords: coords.rows().into_iter().flatten().copied().collect(),
            values,
            source,
        })
    }

    /// Restrict to the given observation indices, in the given order.
    ///
    /// Indices refer to this set. Fails when `indices` is empty.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if indices.is_empty() {
            return Err(Error::InsufficientData("empty observation subset".into()));
        }
        Ok(Self {
            coords: indices
                .iter()
                .flat_map(|&i| self.location(i).iter().copied())
                .collect(),
            ndim: self.ndim,
            values: indices.iter().map(|&i| self.values[i]).collect(),
            source: indices.iter().map(|&i| self.source[i]).collect(),
        })
    }

    /// Number of observations (always ≥ 1)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Coordinates of observation `i`
    pub fn location(&self, i: usize) -> &[f64] {
        &self.coords[i * self.ndim..(i + 1) * self.ndim]
    }

    /// Coordinates as an `n × d` array
    pub fn coords(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.len(), self.ndim), |(i, j)| self.coords[i * self.ndim + j])
    }

    pub fn value(&self, i: usize) -> f64 {
        self.values[i]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Row of observation `i` in the originating data set
    pub fn source_index(&self, i: usize) -> usize {
        self.source[i]
    }

    /// Arithmetic mean of the observed values.
    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}
