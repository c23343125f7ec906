//! Steady-state result record

use super::config::{SolveMode, Strategy};
use super::constraints::ConstraintViolation;
use super::prices::PriceVector;
use crate::household::CohortState;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Terminal state of the outer loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Converged,
    MaxIterExceeded,
    /// A non-finite aggregate appeared and iteration stopped
    Degenerate,
}

/// Full steady-state solution, handed to downstream consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteadyStateSolution {
    pub status: SolveStatus,
    pub mode: SolveMode,
    pub strategy: Strategy,

    /// Outer iterations (or root-finder iterations) used
    pub iterations: usize,

    /// Final outer distance
    pub distance: f64,

    /// Outer distance at every iteration
    pub distance_history: Vec<f64>,

    /// Equilibrium prices (r, w, T_H, factor)
    pub prices: PriceVector,

    // ---- Aggregates ----
    pub k: f64,
    pub l: f64,
    pub y: f64,
    pub c: f64,
    pub i: f64,

    /// Total bequests by ability type
    pub bq: Vec<f64>,

    /// Replacement rate by ability type
    pub theta: Vec<f64>,

    // ---- S x J distributions ----
    /// Savings chosen at each age
    pub b: DMatrix<f64>,
    pub n: DMatrix<f64>,
    pub consumption: DMatrix<f64>,
    pub utility: DMatrix<f64>,
    /// Capital plus labor income
    pub income: DMatrix<f64>,
    /// Income net of taxes, transfers and benefits
    pub after_tax_income: DMatrix<f64>,

    // ---- Diagnostics ----
    pub euler_savings: DMatrix<f64>,
    pub euler_labor: DMatrix<f64>,

    /// Y - (C + I)
    pub resource_residual: f64,

    pub warnings: Vec<ConstraintViolation>,

    /// Status converged, resource constraint and Euler residuals within
    /// tolerance
    pub converged: bool,
}

impl SteadyStateSolution {
    /// Largest absolute household first-order condition residual
    pub fn max_euler_error(&self) -> f64 {
        self.euler_savings
            .iter()
            .chain(self.euler_labor.iter())
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    /// Lifetime paths of one ability type
    pub fn cohort(&self, ability: usize) -> CohortState {
        CohortState {
            b: self.b.column(ability).iter().copied().collect(),
            n: self.n.column(ability).iter().copied().collect(),
            c: self.consumption.column(ability).iter().copied().collect(),
        }
    }

    /// Get summary statistics
    pub fn summary(&self) -> SolutionSummary {
        SolutionSummary {
            status: self.status,
            converged: self.converged,
            iterations: self.iterations,
            r: self.prices.r,
            w: self.prices.w,
            t_h: self.prices.t_h,
            factor: self.prices.factor,
            k: self.k,
            l: self.l,
            y: self.y,
            c: self.c,
            i: self.i,
            capital_output_ratio: self.k / self.y,
            resource_residual: self.resource_residual,
            max_euler_error: self.max_euler_error(),
            warnings: self.warnings.len(),
        }
    }
}

/// Scalar summary of a steady state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSummary {
    pub status: SolveStatus,
    pub converged: bool,
    pub iterations: usize,
    pub r: f64,
    pub w: f64,
    pub t_h: f64,
    pub factor: f64,
    pub k: f64,
    pub l: f64,
    pub y: f64,
    pub c: f64,
    pub i: f64,
    pub capital_output_ratio: f64,
    pub resource_residual: f64,
    pub max_euler_error: f64,
    pub warnings: usize,
}
