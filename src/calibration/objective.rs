//! Simulated-method-of-moments objective

use super::moments::{MomentSpec, Moments, WeightingMatrix};
use super::search::SearchObjective;
use crate::equilibrium::{EquilibriumGuess, SolverConfig, SteadyStateSolution, SteadyStateSolver};
use crate::params::{ParameterSet, UtilityWeights};
use crate::penalty::{sanitize, PENALTY};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// One objective evaluation, kept for reproducibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Stacked `[chi_b.., chi_n..]`
    pub candidate: Vec<f64>,
    pub distance: f64,
    pub converged: bool,
}

/// Best converged candidate seen so far
#[derive(Debug, Clone)]
pub struct BestEvaluation {
    pub candidate: Vec<f64>,
    pub distance: f64,
    pub moments: Moments,
    pub solution: SteadyStateSolution,
}

/// Weighted distance between model and data moments as a function of the
/// stacked utility weights
pub struct CalibrationObjective<'a> {
    params: &'a ParameterSet,
    solver: SolverConfig,
    moment_spec: &'a MomentSpec,
    data: &'a Moments,
    weighting: &'a WeightingMatrix,
    max_evaluations: usize,
    records: Vec<EvaluationRecord>,
    best: Option<BestEvaluation>,
    /// Last converged equilibrium, used to seed the next solve
    warm: Option<EquilibriumGuess>,
}

impl<'a> CalibrationObjective<'a> {
    pub fn new(
        params: &'a ParameterSet,
        solver: SolverConfig,
        moment_spec: &'a MomentSpec,
        data: &'a Moments,
        weighting: &'a WeightingMatrix,
        max_evaluations: usize,
    ) -> Self {
        Self {
            params,
            solver,
            moment_spec,
            data,
            weighting,
            max_evaluations,
            records: Vec::new(),
            best: None,
            warm: None,
        }
    }

    /// Total amount by which entries fall short of strict positivity;
    /// non-finite entries count one each
    fn violation(candidate: &[f64]) -> f64 {
        candidate
            .iter()
            .map(|v| {
                if !v.is_finite() {
                    1.0
                } else if *v <= 0.0 {
                    -v + f64::EPSILON
                } else {
                    0.0
                }
            })
            .sum()
    }

    /// Solve the steady state at `candidate` and return `d' W d`, or a
    /// penalty when the candidate is infeasible or the solve fails
    pub fn evaluate(&mut self, candidate: &[f64]) -> f64 {
        let violation = Self::violation(candidate);
        let (distance, converged) = if violation > 0.0 {
            (sanitize(PENALTY * (1.0 + violation)), false)
        } else {
            self.solve_and_measure(candidate)
        };

        info!(
            "Evaluation {}: distance {:.6e}{} at {:?}",
            self.records.len() + 1,
            distance,
            if converged { "" } else { " (penalized)" },
            candidate
        );
        self.records.push(EvaluationRecord {
            candidate: candidate.to_vec(),
            distance,
            converged,
        });
        distance
    }

    fn solve_and_measure(&mut self, candidate: &[f64]) -> (f64, bool) {
        let weights = match UtilityWeights::from_stacked(candidate, self.params.size) {
            Ok(weights) => weights,
            Err(e) => {
                debug!("Rejected candidate: {}", e);
                return (PENALTY, false);
            }
        };

        let guess = match &self.warm {
            Some(guess) => guess.clone(),
            None => EquilibriumGuess::new(self.params),
        };
        let solution = match SteadyStateSolver::new(self.params, &weights, self.solver.clone()).solve(&guess) {
            Ok(solution) => solution,
            Err(e) => {
                debug!("Steady-state solve failed: {}", e);
                return (PENALTY, false);
            }
        };
        if !solution.converged {
            return (PENALTY, false);
        }

        let moments = Moments::from_solution(&solution, self.moment_spec, self.params);
        let deviations: Vec<f64> = moments
            .stacked()
            .iter()
            .zip(self.data.stacked().iter())
            .map(|(model, data)| model - data)
            .collect();
        let distance = sanitize(self.weighting.distance(&deviations));

        self.warm = Some(EquilibriumGuess::from_solution(&solution));
        let improved = self.best.as_ref().map_or(true, |best| distance < best.distance);
        if improved {
            self.best = Some(BestEvaluation {
                candidate: candidate.to_vec(),
                distance,
                moments,
                solution,
            });
        }
        (distance, true)
    }

    pub fn evaluations(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn best(&self) -> Option<&BestEvaluation> {
        self.best.as_ref()
    }

    /// Hand over the evaluation log and the best converged candidate
    pub fn into_parts(self) -> (Vec<EvaluationRecord>, Option<BestEvaluation>) {
        (self.records, self.best)
    }
}

impl SearchObjective for CalibrationObjective<'_> {
    fn value(&mut self, x: &[f64]) -> f64 {
        if self.exhausted() {
            return PENALTY;
        }
        self.evaluate(x)
    }

    fn exhausted(&self) -> bool {
        self.records.len() >= self.max_evaluations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ModelSize, TaxParams};

    fn setup() -> (ParameterSet, MomentSpec) {
        let mut params = ParameterSet::illustrative(ModelSize::new(3, 1));
        params.tax = TaxParams::none(3, 1);
        (params, MomentSpec::even_bands(3, 3))
    }

    #[test]
    fn test_non_positive_candidate_is_penalized() {
        let (params, moment_spec) = setup();
        let data = Moments {
            wealth: vec![1.0; 3],
            labor: vec![0.4; 3],
        };
        let weighting = WeightingMatrix::Identity;
        let mut objective = CalibrationObjective::new(&params, SolverConfig::default(), &moment_spec, &data, &weighting, 10);

        let small = objective.evaluate(&[0.5, 1.0, -0.1, 1.0]);
        let large = objective.evaluate(&[0.5, 1.0, -2.0, 1.0]);
        assert!(small >= PENALTY);
        assert!(large > small);
        assert_eq!(objective.evaluations(), 2);
        assert!(objective.records().iter().all(|r| !r.converged));
        assert!(objective.best().is_none());
    }

    #[test]
    fn test_nan_candidate_is_penalized() {
        let (params, moment_spec) = setup();
        let data = Moments {
            wealth: vec![1.0; 3],
            labor: vec![0.4; 3],
        };
        let weighting = WeightingMatrix::Identity;
        let mut objective = CalibrationObjective::new(&params, SolverConfig::default(), &moment_spec, &data, &weighting, 10);
        let value = objective.evaluate(&[f64::NAN, 1.0, 1.0, 1.0]);
        assert!(value.is_finite() && value >= PENALTY);
    }

    #[test]
    fn test_zero_distance_at_data_generating_weights() {
        let (params, moment_spec) = setup();
        let weights = UtilityWeights::new(vec![0.6], vec![2.0, 3.0, 4.0]).unwrap();
        let solution = SteadyStateSolver::new(&params, &weights, SolverConfig::default())
            .solve(&EquilibriumGuess::new(&params))
            .unwrap();
        assert!(solution.converged);
        let data = Moments::from_solution(&solution, &moment_spec, &params);
        let weighting = WeightingMatrix::relative(&data).unwrap();

        let mut objective = CalibrationObjective::new(&params, SolverConfig::default(), &moment_spec, &data, &weighting, 10);
        let at_truth = objective.evaluate(&weights.stacked());
        let away = objective.evaluate(&[0.9, 2.0, 3.0, 4.0]);
        assert!(at_truth < 1e-12, "distance {}", at_truth);
        assert!(away > at_truth);
        let best = objective.best().unwrap();
        assert_eq!(best.candidate, weights.stacked());
    }

    #[test]
    fn test_unconverged_solve_is_penalized() {
        let (params, moment_spec) = setup();
        let data = Moments {
            wealth: vec![1.0; 3],
            labor: vec![0.4; 3],
        };
        let weighting = WeightingMatrix::Identity;
        let solver = SolverConfig {
            max_iterations: 1,
            ..SolverConfig::default()
        };
        let mut objective = CalibrationObjective::new(&params, solver, &moment_spec, &data, &weighting, 10);

        let value = objective.evaluate(&[0.6, 2.0, 3.0, 4.0]);
        assert_eq!(value, PENALTY);
        assert!(!objective.records()[0].converged);
        assert!(objective.best().is_none());
    }

    #[test]
    fn test_budget_stops_evaluations() {
        let (params, moment_spec) = setup();
        let data = Moments {
            wealth: vec![1.0; 3],
            labor: vec![0.4; 3],
        };
        let weighting = WeightingMatrix::Identity;
        let mut objective = CalibrationObjective::new(&params, SolverConfig::default(), &moment_spec, &data, &weighting, 1);
        objective.value(&[-1.0, 1.0, 1.0, 1.0]);
        assert!(objective.exhausted());
        assert_eq!(objective.value(&[1.0, 1.0, 1.0, 1.0]), PENALTY);
        assert_eq!(objective.evaluations(), 1);
    }
}
