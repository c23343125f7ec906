//! Calibration of the utility weights by simulated method of moments
//!
//! The calibrator searches over the stacked `[chi_b.., chi_n..]` vector,
//! solving the steady state at every candidate and scoring it by the
//! weighted distance between model and data moments.

pub mod moments;
pub mod objective;
pub mod search;

pub use moments::{MomentSpec, Moments, WeightingMatrix};
pub use objective::{BestEvaluation, CalibrationObjective, EvaluationRecord};
pub use search::{
    nelder_mead, run_search, BasinHopping, LocalMinimum, MonotonicBasinHopping, NelderMeadOptions,
    SearchObjective, SearchOutcome, SearchStrategy,
};

use crate::equilibrium::{SolverConfig, SteadyStateSolution};
use crate::error::{ModelError, Result};
use crate::params::{ParameterSet, UtilityWeights};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Which global search drives the calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchKind {
    BasinHopping,
    MonotonicBasinHopping,
}

/// Search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    pub kind: SearchKind,
    pub local: NelderMeadOptions,
    /// Perturbation hops after the first local refinement
    pub niter: usize,
    /// Half-width of the log-space perturbation
    pub step_size: f64,
    /// Metropolis temperature
    pub temperature: f64,
    pub seed: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            kind: SearchKind::BasinHopping,
            local: NelderMeadOptions::default(),
            niter: 20,
            step_size: 0.5,
            temperature: 1.0,
            seed: 2016,
        }
    }
}

impl SearchSettings {
    fn strategy(&self) -> Box<dyn SearchStrategy> {
        match self.kind {
            SearchKind::BasinHopping => Box::new(BasinHopping::new(
                self.local,
                self.niter,
                self.step_size,
                self.temperature,
                self.seed,
            )),
            SearchKind::MonotonicBasinHopping => {
                Box::new(MonotonicBasinHopping::new(self.local, self.niter, self.step_size, self.seed))
            }
        }
    }
}

/// Configuration of a calibration run
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    pub moment_spec: MomentSpec,
    pub weighting: WeightingMatrix,
    pub solver: SolverConfig,
    pub search: SearchSettings,
    /// Objective evaluations allowed across the whole search
    pub max_evaluations: usize,
}

impl CalibrationConfig {
    /// Identity weighting, four wealth bands and default solver and search
    /// settings
    pub fn new(s: usize) -> Self {
        Self {
            moment_spec: MomentSpec::even_bands(s, 4),
            weighting: WeightingMatrix::Identity,
            solver: SolverConfig::default(),
            search: SearchSettings::default(),
            max_evaluations: 10_000,
        }
    }
}

/// Result of a calibration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Best weights found, converged or not
    pub weights: UtilityWeights,
    pub distance: f64,
    /// Data moments targeted
    pub data_moments: Moments,
    /// Model moments at the best converged candidate
    pub model_moments: Option<Moments>,
    /// Equilibrium at the best converged candidate
    pub solution: Option<SteadyStateSolution>,
    pub evaluations: Vec<EvaluationRecord>,
    pub hops: usize,
    pub accepted: usize,
}

impl CalibrationResult {
    pub fn converged(&self) -> bool {
        self.solution.is_some()
    }
}

/// Drives the search over utility weights
pub struct Calibrator<'a> {
    params: &'a ParameterSet,
    data: Moments,
    config: CalibrationConfig,
}

impl<'a> Calibrator<'a> {
    pub fn new(params: &'a ParameterSet, data: Moments, config: CalibrationConfig) -> Result<Self> {
        let (s, j) = (params.s(), params.j());
        config.moment_spec.validate(s)?;
        let expected = config.moment_spec.len(s, j);
        if data.len() != expected {
            return Err(ModelError::dimension("data moments", expected, data.len()));
        }
        config.weighting.check_size(expected)?;
        if config.max_evaluations == 0 {
            return Err(ModelError::invalid("max_evaluations", "must be positive"));
        }
        Ok(Self { params, data, config })
    }

    /// Search from `initial`
    pub fn run(&self, initial: &UtilityWeights) -> Result<CalibrationResult> {
        initial.check_size(self.params.size)?;
        let x0 = initial.stacked();
        info!(
            "Calibrating {} parameters against {} moments with {:?}",
            x0.len(),
            self.data.len(),
            self.config.search.kind
        );

        let mut objective = CalibrationObjective::new(
            self.params,
            self.config.solver.clone(),
            &self.config.moment_spec,
            &self.data,
            &self.config.weighting,
            self.config.max_evaluations,
        );
        let mut strategy = self.config.search.strategy();
        let outcome = run_search(strategy.as_mut(), &mut objective, &x0);
        let (evaluations, best) = objective.into_parts();

        info!(
            "Calibration finished after {} evaluations: best distance {:.6e}",
            evaluations.len(),
            outcome.best.f
        );

        let result = match best {
            Some(best) => CalibrationResult {
                weights: UtilityWeights::from_stacked(&best.candidate, self.params.size)?,
                distance: best.distance,
                data_moments: self.data.clone(),
                model_moments: Some(best.moments),
                solution: Some(best.solution),
                evaluations,
                hops: outcome.hops,
                accepted: outcome.accepted,
            },
            None => {
                warn!("No candidate produced a converged steady state");
                let weights = UtilityWeights::from_stacked(&outcome.best.x, self.params.size)
                    .unwrap_or_else(|_| initial.clone());
                CalibrationResult {
                    weights,
                    distance: outcome.best.f,
                    data_moments: self.data.clone(),
                    model_moments: None,
                    solution: None,
                    evaluations,
                    hops: outcome.hops,
                    accepted: outcome.accepted,
                }
            }
        };
        Ok(result)
    }
}
