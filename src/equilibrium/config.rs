//! Steady-state solver configuration

use super::constraints::{DEFAULT_MIN_BEQUEST, DEFAULT_MIN_CONSUMPTION};
use crate::household::HouseholdConfig;
use crate::solver::NewtonConfig;
use serde::{Deserialize, Serialize};

/// Baseline solves target the data mean income through the factor; reform
/// solves hold a previously calibrated factor fixed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SolveMode {
    Baseline,
    Reform {
        /// Factor taken from the baseline steady state
        factor: f64,
    },
}

impl SolveMode {
    pub fn is_baseline(&self) -> bool {
        matches!(self, SolveMode::Baseline)
    }
}

/// How the outer equilibrium conditions are solved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Damped fixed-point iteration on (r, T_H, factor)
    DampedFixedPoint,
    /// Direct Newton root-find on the same conditions
    RootFinding,
}

/// Configuration for a steady-state solve
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub mode: SolveMode,
    pub strategy: Strategy,

    /// Outer iteration budget
    pub max_iterations: usize,

    /// Convergence tolerance on the outer distance
    pub tolerance: f64,

    /// Initial damping weight on the proposed values, in (0, 1)
    pub damping: f64,

    /// Iterations before damping may be halved
    pub warmup_iterations: usize,

    /// Largest acceptable |Y - (C + I)|
    pub resource_tolerance: f64,

    /// Largest acceptable household first-order condition residual
    pub euler_tolerance: f64,

    /// Treat a resource-constraint violation as a hard error
    pub strict: bool,

    /// Consumption floor for the borrowing-constraint check
    pub min_consumption: f64,

    /// Bequest floor at the terminal age for the same check
    pub min_bequest: f64,

    /// Solve ability types on the rayon pool
    pub parallel: bool,

    pub household: HouseholdConfig,

    /// Newton settings for the root-finding strategy
    pub root_finding: NewtonConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mode: SolveMode::Baseline,
            strategy: Strategy::DampedFixedPoint,
            max_iterations: 250,
            tolerance: 1e-9,
            damping: 0.4,
            warmup_iterations: 10,
            resource_tolerance: 1e-8,
            euler_tolerance: 1e-8,
            strict: false,
            min_consumption: DEFAULT_MIN_CONSUMPTION,
            min_bequest: DEFAULT_MIN_BEQUEST,
            parallel: true,
            household: HouseholdConfig::default(),
            root_finding: NewtonConfig {
                xtol: 1e-12,
                ftol: 1e-11,
                max_iterations: 50,
                fd_step: 1e-6,
                fd_floor: 1e-2,
                max_backtracks: 30,
            },
        }
    }
}
