//! General equilibrium: firm, aggregation, prices and the steady-state solver

mod aggregates;
mod config;
pub mod constraints;
pub mod firm;
mod prices;
mod result;
mod steady_state;

pub use aggregates::{Aggregates, AggregationEngine};
pub use config::{SolveMode, SolverConfig, Strategy};
pub use constraints::{CheckInputs, ConstraintChecker, ConstraintViolation};
pub use prices::{convex_combo, relative_gap, PriceVector, ZERO_THRESHOLD};
pub use result::{SolutionSummary, SolveStatus, SteadyStateSolution};
pub use steady_state::{EquilibriumGuess, SteadyStateSolver};
