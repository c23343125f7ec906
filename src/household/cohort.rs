//! Per-ability-type lifetime paths and the warm-start cache

use serde::{Deserialize, Serialize};

/// Lifetime decisions of one ability type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortState {
    /// Savings chosen at each age, carried into the next age
    pub b: Vec<f64>,
    /// Labor supply at each age
    pub n: Vec<f64>,
    /// Consumption at each age
    pub c: Vec<f64>,
}

impl CohortState {
    /// Starting point with small positive savings and interior labor supply
    pub fn initial_guess(s: usize, ltilde: f64) -> Self {
        Self {
            b: vec![0.01; s],
            n: vec![0.4 * ltilde; s],
            c: vec![0.0; s],
        }
    }

    pub fn from_paths(b: Vec<f64>, n: Vec<f64>) -> Self {
        let c = vec![0.0; b.len()];
        Self { b, n, c }
    }

    pub fn ages(&self) -> usize {
        self.b.len()
    }

    /// Stack as the household unknown vector `[b.., n..]`
    pub fn stacked(&self) -> Vec<f64> {
        self.b.iter().chain(self.n.iter()).copied().collect()
    }

    /// Wealth entering each age (zero at the first age)
    pub fn entering_wealth(&self) -> Vec<f64> {
        entering_wealth(&self.b)
    }
}

/// Shift chosen savings one age forward
pub fn entering_wealth(b: &[f64]) -> Vec<f64> {
    let mut entering = vec![0.0; b.len()];
    if b.len() > 1 {
        entering[1..].copy_from_slice(&b[..b.len() - 1]);
    }
    entering
}

/// Warm-start cache, one entry per ability type
///
/// An entry is only replaced by a converged household solve, and each
/// ability type only ever reads its own entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmStartCache {
    entries: Vec<CohortState>,
    updates: usize,
}

impl WarmStartCache {
    pub fn new(entries: Vec<CohortState>) -> Self {
        Self { entries, updates: 0 }
    }

    pub fn get(&self, ability: usize) -> &CohortState {
        &self.entries[ability]
    }

    /// Store a converged solution; returns false (and keeps the old entry)
    /// when the solve did not converge
    pub fn record(&mut self, ability: usize, state: &CohortState, converged: bool) -> bool {
        if !converged {
            return false;
        }
        self.entries[ability] = state.clone();
        self.updates += 1;
        true
    }

    pub fn updates(&self) -> usize {
        self.updates
    }
}
