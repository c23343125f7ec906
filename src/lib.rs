//! OLG Equilibrium - steady-state solver and calibration for an
//! overlapping-generations economy
//!
//! This library provides:
//! - Household lifetime savings and labor decisions per ability type
//! - Aggregation into capital, labor, output, bequests and government transfers
//! - Damped fixed-point and direct root-finding steady-state solvers
//! - Feasibility checks on converged equilibria
//! - Simulated-method-of-moments calibration of bequest and labor weights
//! - Baseline and policy-reform scenario runs

pub mod calibration;
pub mod equilibrium;
pub mod error;
pub mod household;
pub mod params;
pub mod penalty;
pub mod scenario;
pub mod solver;

// Re-export commonly used types
pub use calibration::{CalibrationConfig, CalibrationResult, Calibrator, MomentSpec, Moments, WeightingMatrix};
pub use equilibrium::{
    EquilibriumGuess, PriceVector, SolveMode, SolveStatus, SolverConfig, SteadyStateSolution, SteadyStateSolver,
    Strategy,
};
pub use error::{ModelError, Result};
pub use household::{CohortState, HouseholdSolver};
pub use params::{ModelSize, ParameterSet, UtilityWeights};
pub use scenario::ScenarioRunner;
