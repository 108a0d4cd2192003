//! Error types for geoestim

use thiserror::Error;

/// Main error type for geoestim operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid estimator or search parameter, detected before traversal.
    #[error("Invalid parameter: {name} = {value} ({reason})")]
    Configuration {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Not enough observations to estimate anything.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Singular or ill-conditioned linear system.
    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Estimation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a [`Error::Configuration`] error.
    pub fn configuration(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::Configuration {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error was raised by parameter validation.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    /// Whether this error came from a failed linear solve.
    pub fn is_numerical(&self) -> bool {
        matches!(self, Error::Numerical(_))
    }
}

/// Result type alias for geoestim operations
pub type Result<T> = std::result::Result<T, Error>;
