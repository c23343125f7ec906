//! Feasibility checks on a converged steady state
//!
//! Every violation is returned as a warning. Whether any of them is fatal is
//! the caller's decision.

use crate::params::ParameterSet;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum consumption floor used in the borrowing recursion
pub const DEFAULT_MIN_CONSUMPTION: f64 = 1e-6;
/// Minimum terminal bequest used in the borrowing recursion
pub const DEFAULT_MIN_BEQUEST: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintViolation {
    NonPositiveCapital { k: f64 },
    Borrowing {
        age: usize,
        ability: usize,
        wealth: f64,
        minimum: f64,
    },
    NegativeLabor { age: usize, ability: usize, n: f64 },
    LaborAboveEndowment { age: usize, ability: usize, n: f64 },
    NegativeConsumption { age: usize, ability: usize, c: f64 },
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintViolation::NonPositiveCapital { k } => {
                write!(f, "aggregate capital is not positive (K = {:.6e})", k)
            }
            ConstraintViolation::Borrowing {
                age,
                ability,
                wealth,
                minimum,
            } => write!(
                f,
                "borrowing constraint violated at age {} ability {}: wealth {:.6} below minimum {:.6}",
                age, ability, wealth, minimum
            ),
            ConstraintViolation::NegativeLabor { age, ability, n } => {
                write!(f, "negative labor at age {} ability {}: {:.6}", age, ability, n)
            }
            ConstraintViolation::LaborAboveEndowment { age, ability, n } => {
                write!(f, "labor above endowment at age {} ability {}: {:.6}", age, ability, n)
            }
            ConstraintViolation::NegativeConsumption { age, ability, c } => {
                write!(f, "negative consumption at age {} ability {}: {:.6}", age, ability, c)
            }
        }
    }
}

/// Inputs the checker needs from a solved steady state
pub struct CheckInputs<'m> {
    pub k: f64,
    pub r: f64,
    pub w: f64,
    pub b: &'m DMatrix<f64>,
    pub n: &'m DMatrix<f64>,
    pub c: &'m DMatrix<f64>,
    /// Bequests received per capita by ability type
    pub bq_per_capita: &'m [f64],
}

pub struct ConstraintChecker<'a> {
    params: &'a ParameterSet,
    min_consumption: f64,
    min_bequest: f64,
}

impl<'a> ConstraintChecker<'a> {
    pub fn new(params: &'a ParameterSet) -> Self {
        Self {
            params,
            min_consumption: DEFAULT_MIN_CONSUMPTION,
            min_bequest: DEFAULT_MIN_BEQUEST,
        }
    }

    pub fn with_floors(mut self, min_consumption: f64, min_bequest: f64) -> Self {
        self.min_consumption = min_consumption;
        self.min_bequest = min_bequest;
        self
    }

    /// Smallest wealth entering each age (index 1..S) that still affords the
    /// consumption floor while working the full endowment, found by
    /// recursing backward from the terminal age. Index 0 is unused.
    pub fn minimum_wealth(&self, r: f64, w: f64, bq: f64, ability: usize) -> Vec<f64> {
        let p = self.params;
        let s_len = p.s();
        let growth = p.g_y.exp();
        let mut minimum = vec![0.0; s_len];

        let last = s_len - 1;
        minimum[last] = (self.min_consumption + self.min_bequest
            - w * p.e[(last, ability)] * p.ltilde
            - bq)
            / (1.0 + r);
        for s in (1..last).rev() {
            minimum[s] = (self.min_consumption + growth * minimum[s + 1]
                - w * p.e[(s, ability)] * p.ltilde
                - bq)
                / (1.0 + r);
        }
        minimum
    }

    pub fn check(&self, inputs: &CheckInputs) -> Vec<ConstraintViolation> {
        let p = self.params;
        let mut violations = Vec::new();

        if !(inputs.k > 0.0) {
            violations.push(ConstraintViolation::NonPositiveCapital { k: inputs.k });
        }

        for j in 0..p.j() {
            let minimum = self.minimum_wealth(inputs.r, inputs.w, inputs.bq_per_capita[j], j);
            for s in 1..p.s() {
                let wealth = inputs.b[(s - 1, j)];
                if wealth < minimum[s] {
                    violations.push(ConstraintViolation::Borrowing {
                        age: s,
                        ability: j,
                        wealth,
                        minimum: minimum[s],
                    });
                }
            }

            for s in 0..p.s() {
                let n = inputs.n[(s, j)];
                if n < 0.0 {
                    violations.push(ConstraintViolation::NegativeLabor { age: s, ability: j, n });
                }
                if n > p.ltilde {
                    violations.push(ConstraintViolation::LaborAboveEndowment { age: s, ability: j, n });
                }
                let c = inputs.c[(s, j)];
                if c < 0.0 {
                    violations.push(ConstraintViolation::NegativeConsumption { age: s, ability: j, c });
                }
            }
        }

        for violation in &violations {
            log::warn!("Constraint check: {}", violation);
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ModelSize;

    fn inputs<'m>(
        b: &'m DMatrix<f64>,
        n: &'m DMatrix<f64>,
        c: &'m DMatrix<f64>,
        bq: &'m [f64],
    ) -> CheckInputs<'m> {
        CheckInputs {
            k: 1.0,
            r: 0.3,
            w: 1.0,
            b,
            n,
            c,
            bq_per_capita: bq,
        }
    }

    #[test]
    fn test_clean_solution_has_no_warnings() {
        let params = ParameterSet::illustrative(ModelSize::new(4, 1));
        let b = DMatrix::from_element(4, 1, 0.2);
        let n = DMatrix::from_element(4, 1, 0.4);
        let c = DMatrix::from_element(4, 1, 0.5);
        let bq = [0.01];
        let checker = ConstraintChecker::new(&params);
        assert!(checker.check(&inputs(&b, &n, &c, &bq)).is_empty());
    }

    #[test]
    fn test_reports_each_violation_kind() {
        let params = ParameterSet::illustrative(ModelSize::new(4, 1));
        let b = DMatrix::from_column_slice(4, 1, &[-100.0, 0.2, 0.2, 0.2]);
        let n = DMatrix::from_column_slice(4, 1, &[0.4, -0.1, 1.5, 0.4]);
        let c = DMatrix::from_column_slice(4, 1, &[0.5, 0.5, 0.5, -0.2]);
        let bq = [0.0];
        let checker = ConstraintChecker::new(&params);
        let mut check = inputs(&b, &n, &c, &bq);
        check.k = -1.0;

        let warnings = checker.check(&check);
        assert!(warnings.iter().any(|v| matches!(v, ConstraintViolation::NonPositiveCapital { .. })));
        assert!(warnings.iter().any(|v| matches!(v, ConstraintViolation::Borrowing { age: 1, .. })));
        assert!(warnings.iter().any(|v| matches!(v, ConstraintViolation::NegativeLabor { age: 1, .. })));
        assert!(warnings.iter().any(|v| matches!(v, ConstraintViolation::LaborAboveEndowment { age: 2, .. })));
        assert!(warnings.iter().any(|v| matches!(v, ConstraintViolation::NegativeConsumption { age: 3, .. })));
    }

    #[test]
    fn test_minimum_wealth_recursion() {
        let mut params = ParameterSet::illustrative(ModelSize::new(3, 1));
        params.g_y = 0.0;
        let checker = ConstraintChecker::new(&params).with_floors(0.1, 0.05);
        let (r, w, bq) = (0.5, 2.0, 0.0);
        let minimum = checker.minimum_wealth(r, w, bq, 0);

        let e = &params.e;
        let last = (0.1 + 0.05 - w * e[(2, 0)]) / 1.5;
        let middle = (0.1 + last - w * e[(1, 0)]) / 1.5;
        assert!((minimum[2] - last).abs() < 1e-12);
        assert!((minimum[1] - middle).abs() < 1e-12);
    }
}
