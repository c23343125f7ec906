//! Newton solve of one ability type's lifetime problem

use super::cohort::CohortState;
use super::euler::HouseholdProblem;
use crate::equilibrium::PriceVector;
use crate::params::{ParameterSet, UtilityWeights};
use crate::penalty;
use crate::solver::{newton_solve, NewtonConfig, Termination};
use serde::{Deserialize, Serialize};

/// Configuration for household solves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HouseholdConfig {
    pub newton: NewtonConfig,
    /// Max-norm residual at which a solve counts as converged
    pub accept_tolerance: f64,
    /// Halvings of the savings guess tried when the warm start is infeasible
    pub max_shrinks: usize,
}

impl Default for HouseholdConfig {
    fn default() -> Self {
        Self {
            newton: NewtonConfig::default(),
            accept_tolerance: 1e-9,
            max_shrinks: 12,
        }
    }
}

/// Solved path of one ability type plus its residuals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdSolution {
    pub ability: usize,
    pub cohort: CohortState,
    /// Savings first-order condition residuals by age
    pub euler_savings: Vec<f64>,
    /// Labor first-order condition residuals by age
    pub euler_labor: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl HouseholdSolution {
    pub fn max_euler_error(&self) -> f64 {
        self.euler_savings
            .iter()
            .chain(self.euler_labor.iter())
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}

/// Solves household first-order conditions at given prices
pub struct HouseholdSolver<'a> {
    params: &'a ParameterSet,
    weights: &'a UtilityWeights,
    config: HouseholdConfig,
}

impl<'a> HouseholdSolver<'a> {
    pub fn new(params: &'a ParameterSet, weights: &'a UtilityWeights, config: HouseholdConfig) -> Self {
        Self {
            params,
            weights,
            config,
        }
    }

    /// Solve for ability type `ability`, starting from `guess`
    pub fn solve(&self, ability: usize, prices: PriceVector, guess: &CohortState) -> HouseholdSolution {
        let problem = HouseholdProblem::new(self.params, self.weights, prices, ability);
        let start = self.feasible_start(&problem, guess);

        let outcome = newton_solve(|x| problem.residuals(x), &start, &self.config.newton);

        let s = self.params.s();
        let max_residual = outcome.max_residual();
        let converged = max_residual <= self.config.accept_tolerance
            && !penalty::any_penalized(&outcome.residuals);
        if !converged {
            log::debug!(
                "Household solve for ability {} ended with {:?} after {} iterations, max residual {:.3e}",
                ability,
                outcome.termination,
                outcome.iterations,
                max_residual
            );
        } else if outcome.termination == Termination::MaxIterations {
            log::debug!("Household solve for ability {} hit the iteration cap but is within tolerance", ability);
        }

        HouseholdSolution {
            ability,
            cohort: problem.cohort(&outcome.x),
            euler_savings: outcome.residuals[..s].to_vec(),
            euler_labor: outcome.residuals[s..].to_vec(),
            iterations: outcome.iterations,
            converged,
        }
    }

    /// Pull an infeasible warm start back toward zero savings and interior
    /// labor until the residuals are unpenalized
    fn feasible_start(&self, problem: &HouseholdProblem, guess: &CohortState) -> Vec<f64> {
        let x0 = guess.stacked();
        if !penalty::any_penalized(&problem.residuals(&x0)) {
            return x0;
        }

        let s = self.params.s();
        let ltilde = self.params.ltilde;
        let labor: Vec<f64> = guess
            .n
            .iter()
            .map(|n| n.clamp(0.05 * ltilde, 0.95 * ltilde))
            .collect();

        let mut shrink = 1.0;
        for _ in 0..self.config.max_shrinks {
            shrink *= 0.5;
            let candidate: Vec<f64> = guess
                .b
                .iter()
                .map(|b| b * shrink)
                .chain(labor.iter().copied())
                .collect();
            if !penalty::any_penalized(&problem.residuals(&candidate)) {
                return candidate;
            }
        }

        log::debug!(
            "No feasible shrink of the warm start for ability {}; using the default guess",
            problem.ability()
        );
        CohortState::initial_guess(s, ltilde).stacked()
    }
}
