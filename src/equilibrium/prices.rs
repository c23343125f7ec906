//! Price vector and damping helpers

use super::firm;
use crate::params::ParameterSet;
use serde::{Deserialize, Serialize};

/// Values below this are treated as zero when measuring relative gaps
pub const ZERO_THRESHOLD: f64 = 1e-12;

/// Prices and transfers households take as given
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceVector {
    /// Interest rate
    pub r: f64,
    /// Wage
    pub w: f64,
    /// Lump-sum transfer
    pub t_h: f64,
    /// Income scaling factor from model units to data units
    pub factor: f64,
}

impl PriceVector {
    /// Prices with the wage implied by the interest rate
    pub fn from_rate(r: f64, t_h: f64, factor: f64, params: &ParameterSet) -> Self {
        Self {
            r,
            w: firm::wage_from_rate(r, params),
            t_h,
            factor,
        }
    }
}

/// `nu * proposed + (1 - nu) * old`
#[inline]
pub fn convex_combo(proposed: f64, old: f64, nu: f64) -> f64 {
    nu * proposed + (1.0 - nu) * old
}

/// Relative difference `|proposed - current| / |current|`, falling back to the
/// absolute difference when `current` is numerically zero
pub fn relative_gap(proposed: f64, current: f64) -> f64 {
    if current.abs() < ZERO_THRESHOLD {
        (proposed - current).abs()
    } else {
        ((proposed - current) / current).abs()
    }
}
