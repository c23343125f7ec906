//! Period utility and marginal utilities
//!
//! CRRA utility of consumption, the elliptical approximation to labor
//! disutility, and a warm-glow bequest motive.

use crate::params::ParameterSet;

/// Marginal utility of consumption, `c^(-sigma)`
#[inline]
pub fn marginal_utility_consumption(c: f64, sigma: f64) -> f64 {
    c.powf(-sigma)
}

/// Marginal disutility of labor under elliptical utility
///
/// `chi_n * (b / l) * (n / l)^(upsilon - 1) * (1 - (n / l)^upsilon)^((1 - upsilon) / upsilon)`
pub fn marginal_disutility_labor(n: f64, chi_n: f64, params: &ParameterSet) -> f64 {
    let ltilde = params.ltilde;
    let upsilon = params.ellipse.upsilon;
    let share = n / ltilde;
    chi_n
        * (params.ellipse.b_ellipse / ltilde)
        * share.powf(upsilon - 1.0)
        * (1.0 - share.powf(upsilon)).powf((1.0 - upsilon) / upsilon)
}

/// CRRA utility, logarithmic at `sigma == 1`
#[inline]
pub fn crra(x: f64, sigma: f64) -> f64 {
    if (sigma - 1.0).abs() < 1e-12 {
        x.ln()
    } else {
        (x.powf(1.0 - sigma) - 1.0) / (1.0 - sigma)
    }
}

/// Utility flow at one age: consumption, leisure and the mortality-weighted
/// bequest of `b_next`
pub fn period_utility(
    c: f64,
    n: f64,
    b_next: f64,
    rho: f64,
    chi_n: f64,
    chi_b: f64,
    params: &ParameterSet,
) -> f64 {
    let upsilon = params.ellipse.upsilon;
    let leisure = chi_n
        * params.ellipse.b_ellipse
        * (1.0 - (n / params.ltilde).powf(upsilon)).powf(1.0 / upsilon);
    let mut utility = crra(c, params.sigma) + leisure;
    if rho > 0.0 {
        let growth = ((1.0 - params.sigma) * params.g_y).exp();
        utility += rho * chi_b * growth * crra(b_next, params.sigma);
    }
    utility
}
