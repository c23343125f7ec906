//! Cobb-Douglas firm block

use crate::params::ParameterSet;

/// `Y = Z K^alpha L^(1 - alpha)`
pub fn output(k: f64, l: f64, params: &ParameterSet) -> f64 {
    params.z * k.powf(params.alpha) * l.powf(1.0 - params.alpha)
}

/// Rental rate net of depreciation, `alpha Y / K - delta`
pub fn interest_rate(y: f64, k: f64, params: &ParameterSet) -> f64 {
    params.alpha * y / k - params.delta
}

/// Wage, `(1 - alpha) Y / L`
pub fn wage(y: f64, l: f64, params: &ParameterSet) -> f64 {
    (1.0 - params.alpha) * y / l
}

/// Wage consistent with interest rate `r` under constant returns
pub fn wage_from_rate(r: f64, params: &ParameterSet) -> f64 {
    let alpha = params.alpha;
    let z = params.z;
    (1.0 - alpha) * z * ((r + params.delta) / (alpha * z)).powf(alpha / (alpha - 1.0))
}
