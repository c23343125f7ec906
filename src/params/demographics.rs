//! Population weight consistency
//!
//! Steady-state population weights must satisfy the law of motion
//! `(1 + g_n) * omega[s+1] = (1 - rho[s]) * omega[s] + imm[s+1] * omega[s+1]`
//! for the aggregate resource identity to hold.

/// Build normalized stationary population weights from mortality and
/// immigration rates
pub fn stationary_weights(rho: &[f64], imm_rates: &[f64], g_n: f64) -> Vec<f64> {
    let s = rho.len();
    let mut omega = vec![0.0; s];
    if s == 0 {
        return omega;
    }

    omega[0] = 1.0;
    for age in 0..s - 1 {
        let inflow = 1.0 + g_n - imm_rates.get(age + 1).copied().unwrap_or(0.0);
        omega[age + 1] = (1.0 - rho[age]) * omega[age] / inflow;
    }

    let total: f64 = omega.iter().sum();
    omega.iter_mut().for_each(|w| *w /= total);
    omega
}

/// Largest violation of the stationary law of motion
pub fn stationarity_gap(omega: &[f64], rho: &[f64], imm_rates: &[f64], g_n: f64) -> f64 {
    (0..omega.len().saturating_sub(1))
        .map(|age| {
            let lhs = (1.0 + g_n) * omega[age + 1];
            let rhs = (1.0 - rho[age]) * omega[age] + imm_rates[age + 1] * omega[age + 1];
            (lhs - rhs).abs()
        })
        .fold(0.0, f64::max)
}
