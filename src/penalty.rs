//! Feasibility penalty policy
//!
//! Every infeasibility check in the crate (negative consumption, labor outside
//! the leisure endowment, non-positive bequest holdings, NaN/Inf residuals,
//! non-positive calibration parameters, failed equilibrium solves) maps to the
//! same constant. It sits many orders of magnitude above any residual or
//! moment distance a feasible candidate can produce, so root finders and the
//! calibration search are pushed back toward the feasible region.

/// Residual or objective value assigned to an infeasible candidate
pub const PENALTY: f64 = 1e14;

/// Values at or above this are treated as penalized
const PENALIZED_THRESHOLD: f64 = PENALTY * 0.5;

/// Replace a non-finite value with the penalty
#[inline]
pub fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        PENALTY
    }
}

/// True if a residual carries the penalty (or is non-finite)
#[inline]
pub fn is_penalized(value: f64) -> bool {
    !value.is_finite() || value.abs() >= PENALIZED_THRESHOLD
}

/// True if any entry of a residual vector is penalized
pub fn any_penalized(values: &[f64]) -> bool {
    values.iter().any(|&v| is_penalized(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_maps_non_finite_to_penalty() {
        assert_eq!(sanitize(f64::NAN), PENALTY);
        assert_eq!(sanitize(f64::INFINITY), PENALTY);
        assert_eq!(sanitize(f64::NEG_INFINITY), PENALTY);
        assert_eq!(sanitize(1.5), 1.5);
    }

    #[test]
    fn test_penalized_detection() {
        assert!(is_penalized(PENALTY));
        assert!(is_penalized(-PENALTY));
        assert!(!is_penalized(1e6));
        assert!(any_penalized(&[0.0, 1.0, PENALTY]));
        assert!(!any_penalized(&[0.0, 1.0, -3.0]));
    }
}
