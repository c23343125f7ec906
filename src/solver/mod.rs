//! Numerical root finding shared by the household and equilibrium solvers

pub mod newton;

pub use newton::{solve as newton_solve, NewtonConfig, NewtonOutcome, Termination};
