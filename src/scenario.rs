//! Scenario runner for baseline and reform steady states
//!
//! Holds the baseline parameters and utility weights once, solves the
//! baseline, then solves any number of policy reforms against it with the
//! baseline income factor held fixed.

use crate::equilibrium::{EquilibriumGuess, SolveMode, SolverConfig, SteadyStateSolution, SteadyStateSolver};
use crate::error::Result;
use crate::params::{ParameterSet, UtilityWeights};

/// Pre-loaded scenario runner
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::new(params, weights);
/// let baseline = runner.run_baseline()?;
///
/// for rate in [0.20, 0.25, 0.30] {
///     let mut reform = runner.params().clone();
///     reform.tax.tau_payroll = rate;
///     let result = runner.run_reform(&reform, &baseline)?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    params: ParameterSet,
    weights: UtilityWeights,
    config: SolverConfig,
}

impl ScenarioRunner {
    /// Create runner with default solver settings
    pub fn new(params: ParameterSet, weights: UtilityWeights) -> Self {
        Self::with_config(params, weights, SolverConfig::default())
    }

    /// Create runner with specific solver settings; the mode is set per run
    pub fn with_config(params: ParameterSet, weights: UtilityWeights, config: SolverConfig) -> Self {
        Self { params, weights, config }
    }

    /// Solve the baseline steady state, calibrating the income factor
    pub fn run_baseline(&self) -> Result<SteadyStateSolution> {
        let config = SolverConfig {
            mode: SolveMode::Baseline,
            ..self.config.clone()
        };
        SteadyStateSolver::new(&self.params, &self.weights, config).solve(&EquilibriumGuess::new(&self.params))
    }

    /// Solve a reform economy, holding the baseline factor fixed and starting
    /// from the baseline equilibrium
    pub fn run_reform(&self, reform: &ParameterSet, baseline: &SteadyStateSolution) -> Result<SteadyStateSolution> {
        reform.validate()?;
        let config = SolverConfig {
            mode: SolveMode::Reform {
                factor: baseline.prices.factor,
            },
            ..self.config.clone()
        };
        SteadyStateSolver::new(reform, &self.weights, config).solve(&EquilibriumGuess::from_solution(baseline))
    }

    /// Run several reforms against the same baseline
    pub fn run_reforms(
        &self,
        reforms: &[ParameterSet],
        baseline: &SteadyStateSolution,
    ) -> Result<Vec<SteadyStateSolution>> {
        reforms.iter().map(|reform| self.run_reform(reform, baseline)).collect()
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn weights(&self) -> &UtilityWeights {
        &self.weights
    }

    /// Get mutable reference to the weights, e.g. after a calibration
    pub fn weights_mut(&mut self) -> &mut UtilityWeights {
        &mut self.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equilibrium::SolveStatus;
    use crate::params::ModelSize;

    fn runner() -> ScenarioRunner {
        let params = ParameterSet::illustrative(ModelSize::new(6, 2));
        let weights = UtilityWeights::uniform(params.size, 0.8, 3.0);
        ScenarioRunner::new(params, weights)
    }

    #[test]
    fn test_reform_keeps_baseline_factor() {
        let runner = runner();
        let baseline = runner.run_baseline().unwrap();
        assert!(baseline.converged);

        let mut reform = runner.params().clone();
        reform.tax.tau_payroll = 0.12;
        let result = runner.run_reform(&reform, &baseline).unwrap();

        assert_eq!(result.status, SolveStatus::Converged);
        assert_eq!(result.prices.factor, baseline.prices.factor);
        assert!(result.converged, "summary {:?}", result.summary());
    }

    #[test]
    fn test_higher_payroll_tax_lowers_labor() {
        let runner = runner();
        let baseline = runner.run_baseline().unwrap();

        let reforms: Vec<ParameterSet> = [0.15, 0.20]
            .iter()
            .map(|&rate| {
                let mut reform = runner.params().clone();
                reform.tax.tau_payroll = rate;
                reform
            })
            .collect();
        let results = runner.run_reforms(&reforms, &baseline).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[1].l < baseline.l);
    }
}
