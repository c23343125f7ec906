//! Tax and transfer parameters
//!
//! These are the fixed-shape inputs handed over by the tax collaborator. The
//! household module turns them into liabilities and marginal rates.

use serde::{Deserialize, Serialize};

/// Ratio-form rate schedule in income measured in data units
///
/// `rate(x) = min_rate + (max_rate - min_rate) * x / (x + scale)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSchedule {
    /// Rate applied at zero income
    pub min_rate: f64,
    /// Asymptotic rate as income grows
    pub max_rate: f64,
    /// Income (in data units) at which the rate is halfway between min and max
    pub scale: f64,
}

impl RateSchedule {
    /// Same rate at every income level
    pub fn flat(rate: f64) -> Self {
        Self {
            min_rate: rate,
            max_rate: rate,
            scale: 1.0,
        }
    }

    pub fn zero() -> Self {
        Self::flat(0.0)
    }

    fn is_flat(&self) -> bool {
        self.max_rate == self.min_rate
    }

    /// Rate at income `x` (data units)
    pub fn rate(&self, x: f64) -> f64 {
        if self.is_flat() {
            return self.min_rate;
        }
        let x = x.max(0.0);
        self.min_rate + (self.max_rate - self.min_rate) * x / (x + self.scale)
    }

    /// Derivative of the rate with respect to `x`
    pub fn slope(&self, x: f64) -> f64 {
        if self.is_flat() || x < 0.0 {
            return 0.0;
        }
        (self.max_rate - self.min_rate) * self.scale / (x + self.scale).powi(2)
    }
}

/// Income tax schedules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncomeTaxParams {
    /// Effective (average) tax rate on total income
    pub etr: RateSchedule,
    /// Marginal rate on labor income, used unless `analytical_mtrs` is set
    pub mtrx: RateSchedule,
    /// Marginal rate on capital income, used unless `analytical_mtrs` is set
    pub mtry: RateSchedule,
    /// Derive marginal rates from the effective schedule
    pub analytical_mtrs: bool,
}

impl IncomeTaxParams {
    pub fn zero() -> Self {
        Self {
            etr: RateSchedule::zero(),
            mtrx: RateSchedule::zero(),
            mtry: RateSchedule::zero(),
            analytical_mtrs: true,
        }
    }
}

/// Wealth tax `tau(b) = p * h * b / (h * b + m)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WealthTaxParams {
    pub h: f64,
    pub p: f64,
    pub m: f64,
}

impl WealthTaxParams {
    pub fn zero() -> Self {
        Self { h: 0.0, p: 0.0, m: 0.0 }
    }

    /// Average wealth tax rate at holdings `b`
    pub fn rate(&self, b: f64) -> f64 {
        let denom = self.h * b + self.m;
        if self.p == 0.0 || denom.abs() < 1e-300 {
            return 0.0;
        }
        self.p * self.h * b / denom
    }

    /// Derivative of the average rate with respect to `b`
    pub fn slope(&self, b: f64) -> f64 {
        let denom = self.h * b + self.m;
        if self.p == 0.0 || denom.abs() < 1e-300 {
            return 0.0;
        }
        self.p * self.h * self.m / (denom * denom)
    }
}

/// Social-security benefit formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetirementParams {
    /// Pay benefits at all
    pub enabled: bool,
    /// First age index at which benefits are paid
    pub retire_age: usize,
    /// Number of highest-earning periods averaged into AIME
    pub aime_years: usize,
    /// AIME bend points (monthly dollars)
    pub bend_points: [f64; 2],
    /// PIA replacement rates within each bracket
    pub pia_rates: [f64; 3],
    /// Monthly benefit cap
    pub max_payment: f64,
    /// Monthly benefit floor (0 disables)
    pub min_payment: f64,
}

impl RetirementParams {
    pub fn disabled(s: usize) -> Self {
        Self {
            enabled: false,
            retire_age: s,
            ..Self::default()
        }
    }
}

impl Default for RetirementParams {
    fn default() -> Self {
        Self {
            enabled: true,
            retire_age: 44,
            aime_years: 35,
            bend_points: [749.0, 4517.0],
            pia_rates: [0.9, 0.32, 0.15],
            max_payment: 3501.0,
            min_payment: 0.0,
        }
    }
}

/// All tax and transfer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxParams {
    pub income: IncomeTaxParams,
    /// Payroll tax rate on labor income
    pub tau_payroll: f64,
    /// Bequest tax rate per ability type
    pub tau_bq: Vec<f64>,
    pub wealth: WealthTaxParams,
    pub retirement: RetirementParams,
}

impl TaxParams {
    /// No taxes and no benefits
    pub fn none(s: usize, j: usize) -> Self {
        Self {
            income: IncomeTaxParams::zero(),
            tau_payroll: 0.0,
            tau_bq: vec![0.0; j],
            wealth: WealthTaxParams::zero(),
            retirement: RetirementParams::disabled(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_schedule_bounds() {
        let sched = RateSchedule {
            min_rate: 0.05,
            max_rate: 0.35,
            scale: 50_000.0,
        };
        assert!((sched.rate(0.0) - 0.05).abs() < 1e-12);
        assert!((sched.rate(50_000.0) - 0.20).abs() < 1e-12);
        assert!(sched.rate(1e12) < 0.35);
        // negative income taxed at the floor
        assert_eq!(sched.rate(-10.0), 0.05);
    }

    #[test]
    fn test_rate_schedule_slope_matches_difference() {
        let sched = RateSchedule {
            min_rate: 0.0,
            max_rate: 0.3,
            scale: 2.0,
        };
        let x = 1.3;
        let h = 1e-6;
        let fd = (sched.rate(x + h) - sched.rate(x - h)) / (2.0 * h);
        assert!((fd - sched.slope(x)).abs() < 1e-8, "slope {} vs fd {}", sched.slope(x), fd);
    }

    #[test]
    fn test_wealth_tax_zero_when_disabled() {
        let w = WealthTaxParams::zero();
        assert_eq!(w.rate(3.0), 0.0);
        assert_eq!(w.slope(3.0), 0.0);

        let w = WealthTaxParams { h: 0.1, p: 0.02, m: 1.0 };
        let b = 2.0;
        let fd = (w.rate(b + 1e-6) - w.rate(b - 1e-6)) / 2e-6;
        assert!((fd - w.slope(b)).abs() < 1e-9);
    }
}
