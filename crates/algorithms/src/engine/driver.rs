//! Estimation driver
//!
//! Runs one estimator for one variable over every location of a domain.
//!
//! ```text
//! Configuring ──prepare──▶ Ready ──run──▶ Traversing ──▶ Done
//! ```
//!
//! In [`ExecutionMode::Exact`] the estimator is fitted once on all
//! observations and the model is evaluated everywhere. In
//! [`ExecutionMode::Approximate`] each location gets its own model, fitted on
//! the neighbors returned by a search strategy. Locations are independent,
//! so traversal runs in parallel when the `parallel` feature is enabled;
//! results are collected by location index and do not depend on scheduling.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use geoestim_core::{Domain, Error, ObservationSet, Result, VariableEstimate};

use crate::interpolation::{Estimate, Estimator};
use crate::maybe_rayon::*;
use crate::spatial::NeighborSearch;

/// What to do when a per-location solve fails numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericalFailurePolicy {
    /// Stop the whole run with the error.
    #[default]
    Abort,
    /// Record the location as undefined (NaN mean and variance) and continue.
    Undefined,
}

/// Shared flag to stop a running traversal.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Run-level options shared by every solver.
#[derive(Debug, Clone, Default)]
pub struct EstimationOptions {
    pub failure_policy: NumericalFailurePolicy,
    pub cancellation: Option<CancellationToken>,
}

impl EstimationOptions {
    pub fn with_failure_policy(mut self, policy: NumericalFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// How models are fitted during traversal.
pub enum ExecutionMode {
    /// One model over all observations.
    Exact,
    /// One model per location over its neighbors.
    Approximate {
        search: Box<dyn NeighborSearch>,
        /// Locations with fewer neighbors are undefined.
        min_neighbors: usize,
    },
}

impl ExecutionMode {
    pub fn approximate(search: impl NeighborSearch + 'static, min_neighbors: usize) -> Self {
        ExecutionMode::Approximate {
            search: Box::new(search),
            min_neighbors,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::Exact => "exact",
            ExecutionMode::Approximate { .. } => "approximate",
        }
    }
}

impl fmt::Debug for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Exact => f.write_str("Exact"),
            ExecutionMode::Approximate { search, min_neighbors } => f
                .debug_struct("Approximate")
                .field("max_neighbors", &search.max_neighbors())
                .field("min_neighbors", min_neighbors)
                .finish(),
        }
    }
}

/// Lifecycle of an [`EstimationDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Configuring,
    Ready,
    Traversing,
    Done,
}

/// Drives one estimator over a domain for one variable.
pub struct EstimationDriver<'a, E: Estimator> {
    estimator: &'a E,
    observations: &'a ObservationSet,
    mode: ExecutionMode,
    options: EstimationOptions,
    state: DriverState,
    model: Option<E::Model>,
}

impl<'a, E: Estimator> EstimationDriver<'a, E> {
    pub fn new(estimator: &'a E, observations: &'a ObservationSet, mode: ExecutionMode) -> Self {
        Self {
            estimator,
            observations,
            mode,
            options: EstimationOptions::default(),
            state: DriverState::Configuring,
            model: None,
        }
    }

    pub fn with_options(mut self, options: EstimationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn mode(&self) -> &ExecutionMode {
        &self.mode
    }

    /// Fit the global model in exact mode. A failed fit is always fatal.
    pub fn prepare(&mut self) -> Result<()> {
        if self.state != DriverState::Configuring {
            return Ok(());
        }
        if let ExecutionMode::Exact = self.mode {
            self.model = Some(self.estimator.fit(self.observations)?);
        }
        self.state = DriverState::Ready;
        Ok(())
    }

    /// Estimate every location of `domain`, in domain order.
    pub fn run<D: Domain>(&mut self, domain: &D) -> Result<VariableEstimate> {
        if domain.ndim() != self.observations.ndim() {
            return Err(Error::DimensionMismatch {
                expected: self.observations.ndim(),
                actual: domain.ndim(),
            });
        }
        match self.state {
            DriverState::Configuring => self.prepare()?,
            DriverState::Ready => {}
            DriverState::Traversing | DriverState::Done => {
                return Err(Error::Other(format!(
                    "driver cannot run from state {:?}",
                    self.state
                )));
            }
        }

        self.state = DriverState::Traversing;
        info!(
            mode = self.mode.name(),
            observations = self.observations.len(),
            locations = domain.len(),
            "estimating"
        );

        let failures = AtomicUsize::new(0);
        let traversal: Result<Vec<Estimate>> = (0..domain.len())
            .into_par_iter()
            .map(|index| {
                if self.options.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let location = domain.location(index);
                match self.estimate_at(&location) {
                    Err(e) if e.is_numerical() && self.options.failure_policy == NumericalFailurePolicy::Undefined => {
                        debug!(index, error = %e, "location left undefined");
                        failures.fetch_add(1, Ordering::Relaxed);
                        Ok(Estimate::UNDEFINED)
                    }
                    other => other,
                }
            })
            .collect();
        self.state = DriverState::Done;
        let estimates = traversal?;

        let failures = failures.into_inner();
        if failures > 0 {
            warn!(failures, "numerical failures recorded as undefined");
        }

        let (mean, variance): (Vec<f64>, Vec<f64>) = estimates.into_iter().map(|e| (e.mean, e.variance)).unzip();
        VariableEstimate::new(mean, variance)
    }

    /// Prepare and run, consuming the driver.
    pub fn run_once<D: Domain>(mut self, domain: &D) -> Result<VariableEstimate> {
        self.run(domain)
    }

    fn estimate_at(&self, location: &[f64]) -> Result<Estimate> {
        match &self.mode {
            ExecutionMode::Exact => {
                let model = self
                    .model
                    .as_ref()
                    .ok_or_else(|| Error::Other("exact-mode model was not fitted".into()))?;
                self.estimator.predict(model, location)
            }
            ExecutionMode::Approximate { search, min_neighbors } => {
                let neighbors = search.search(location);
                if neighbors.len() < *min_neighbors || neighbors.is_empty() {
                    return Ok(Estimate::UNDEFINED);
                }
                let indices: Vec<usize> = neighbors.iter().map(|n| n.index).collect();
                let local = self.observations.subset(&indices)?;
                let model = self.estimator.fit(&local)?;
                self.estimator.predict(&model, location)
            }
        }
    }
}
