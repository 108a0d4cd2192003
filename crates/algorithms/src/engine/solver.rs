//! Solvers: estimate every requested variable of a problem
//!
//! A solver owns per-variable parameters and run options. It validates all
//! variables before estimating any of them, so a bad configuration fails
//! without doing any traversal work.

use tracing::info;

use geoestim_core::{Domain, EstimationProblem, EstimationResult, ObservationSet, Result};

use super::driver::{EstimationDriver, EstimationOptions, ExecutionMode};
use crate::interpolation::{
    IdwParams, InverseDistanceWeighting, KrigingEstimator, KrigingParams, LocallyWeightedRegression, LwrParams,
};
use crate::spatial::{KBallSearch, KNearestSearch, NeighborSearch};

/// Estimate all variables of a problem over its domain.
pub trait Solver {
    fn name(&self) -> &'static str;

    fn solve<D: Domain>(&self, problem: &EstimationProblem<'_, D>) -> Result<EstimationResult>;
}

/// Parameters with optional per-variable overrides.
#[derive(Debug, Clone, Default)]
pub struct VariableParams<P> {
    default: P,
    overrides: Vec<(String, P)>,
}

impl<P> VariableParams<P> {
    pub fn new(default: P) -> Self {
        Self {
            default,
            overrides: Vec::new(),
        }
    }

    /// Use `params` for `variable` instead of the default.
    pub fn with(mut self, variable: impl Into<String>, params: P) -> Self {
        let variable = variable.into();
        match self.overrides.iter_mut().find(|(v, _)| *v == variable) {
            Some((_, p)) => *p = params,
            None => self.overrides.push((variable, params)),
        }
        self
    }

    pub fn get(&self, variable: &str) -> &P {
        self.overrides
            .iter()
            .find(|(v, _)| v == variable)
            .map_or(&self.default, |(_, p)| p)
    }
}

impl<P> From<P> for VariableParams<P> {
    fn from(default: P) -> Self {
        Self::new(default)
    }
}

/// A variable ready for traversal.
struct PreparedVariable<'a, P> {
    name: &'a str,
    observations: ObservationSet,
    params: &'a P,
}

/// Build and validate the observation set of every variable.
fn prepare_variables<'a, D: Domain, P>(
    problem: &EstimationProblem<'a, D>,
    params: &'a VariableParams<P>,
    validate: impl Fn(&P, &ObservationSet) -> Result<()>,
) -> Result<Vec<PreparedVariable<'a, P>>> {
    problem
        .variables()
        .iter()
        .map(|name| {
            let observations = ObservationSet::from_data(problem.data(), name)?;
            let params = params.get(name);
            validate(params, &observations)?;
            Ok(PreparedVariable {
                name,
                observations,
                params,
            })
        })
        .collect()
}

/// Inverse Distance Weighting over every requested variable.
#[derive(Debug, Clone, Default)]
pub struct IdwSolver {
    params: VariableParams<IdwParams>,
    options: EstimationOptions,
}

impl IdwSolver {
    pub fn new(params: impl Into<VariableParams<IdwParams>>) -> Self {
        Self {
            params: params.into(),
            options: EstimationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EstimationOptions) -> Self {
        self.options = options;
        self
    }
}

impl Solver for IdwSolver {
    fn name(&self) -> &'static str {
        "idw"
    }

    fn solve<D: Domain>(&self, problem: &EstimationProblem<'_, D>) -> Result<EstimationResult> {
        let prepared = prepare_variables(problem, &self.params, |p, obs| p.validate(obs.len(), obs.ndim()))?;

        let mut result = EstimationResult::new();
        for var in prepared {
            info!(solver = self.name(), variable = var.name, observations = var.observations.len(), "solving");
            let estimator = InverseDistanceWeighting::new(*var.params);
            let estimate = EstimationDriver::new(&estimator, &var.observations, ExecutionMode::Exact)
                .with_options(self.options.clone())
                .run_once(problem.domain())?;
            result.insert(var.name, estimate);
        }
        Ok(result)
    }
}

/// Locally Weighted Regression over every requested variable.
#[derive(Debug, Clone, Default)]
pub struct LwrSolver {
    params: VariableParams<LwrParams>,
    options: EstimationOptions,
}

impl LwrSolver {
    pub fn new(params: impl Into<VariableParams<LwrParams>>) -> Self {
        Self {
            params: params.into(),
            options: EstimationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EstimationOptions) -> Self {
        self.options = options;
        self
    }
}

impl Solver for LwrSolver {
    fn name(&self) -> &'static str {
        "lwr"
    }

    fn solve<D: Domain>(&self, problem: &EstimationProblem<'_, D>) -> Result<EstimationResult> {
        let prepared = prepare_variables(problem, &self.params, |p, obs| p.validate(obs.len(), obs.ndim()))?;

        let mut result = EstimationResult::new();
        for var in prepared {
            info!(solver = self.name(), variable = var.name, observations = var.observations.len(), "solving");
            let estimator = LocallyWeightedRegression::new(var.params.clone());
            let estimate = EstimationDriver::new(&estimator, &var.observations, ExecutionMode::Exact)
                .with_options(self.options.clone())
                .run_once(problem.domain())?;
            result.insert(var.name, estimate);
        }
        Ok(result)
    }
}

/// Kriging over every requested variable.
///
/// Without `max_neighbors` a single system over all observations is
/// factored once. Otherwise each location solves its own system over at
/// most `max_neighbors` neighbors (capped at the observation count), taken
/// from the configured neighborhood or by nearest distance.
#[derive(Debug, Clone, Default)]
pub struct KrigingSolver {
    params: VariableParams<KrigingParams>,
    options: EstimationOptions,
}

impl KrigingSolver {
    pub fn new(params: impl Into<VariableParams<KrigingParams>>) -> Self {
        Self {
            params: params.into(),
            options: EstimationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EstimationOptions) -> Self {
        self.options = options;
        self
    }

    fn mode(params: &KrigingParams, observations: &ObservationSet) -> Result<ExecutionMode> {
        let Some(max) = params.max_neighbors else {
            return Ok(ExecutionMode::Exact);
        };
        let k = max.min(observations.len());
        let search: Box<dyn NeighborSearch> = match params.neighborhood {
            Some(neighborhood) => Box::new(KBallSearch::new(observations, k, neighborhood)?),
            None => Box::new(KNearestSearch::new(observations, k, params.distance)?),
        };
        Ok(ExecutionMode::Approximate {
            search,
            min_neighbors: params.min_neighbors,
        })
    }
}

impl Solver for KrigingSolver {
    fn name(&self) -> &'static str {
        "kriging"
    }

    fn solve<D: Domain>(&self, problem: &EstimationProblem<'_, D>) -> Result<EstimationResult> {
        let prepared = prepare_variables(problem, &self.params, |p, obs| p.validate(obs.ndim()))?;

        let mut result = EstimationResult::new();
        for var in prepared {
            let estimator = KrigingEstimator::from_params(var.params);
            let mode = Self::mode(var.params, &var.observations)?;
            info!(
                solver = self.name(),
                variable = var.name,
                variant = estimator.variant().name(),
                mode = mode.name(),
                observations = var.observations.len(),
                "solving"
            );
            let estimate = EstimationDriver::new(&estimator, &var.observations, mode)
                .with_options(self.options.clone())
                .run_once(problem.domain())?;
            result.insert(var.name, estimate);
        }
        Ok(result)
    }
}
