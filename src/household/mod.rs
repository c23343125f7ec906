//! Household block: preferences, taxes, first-order conditions and the
//! per-ability-type Euler solver

mod cohort;
mod euler;
mod solver;
pub mod tax;
pub mod utility;

pub use cohort::{entering_wealth, CohortState, WarmStartCache};
pub use euler::{BudgetPaths, HouseholdProblem};
pub use solver::{HouseholdConfig, HouseholdSolution, HouseholdSolver};
pub use tax::{TaxBase, TaxSystem};
