//! Household tax liabilities, marginal rates and social-security benefits

use crate::params::TaxParams;
use std::cmp::Ordering;

/// Everything a household's tax bill depends on at one age
#[derive(Debug, Clone, Copy)]
pub struct TaxBase {
    pub age: usize,
    pub ability: usize,
    pub r: f64,
    pub w: f64,
    /// Wealth entering the period
    pub b: f64,
    pub n: f64,
    pub e: f64,
    /// Bequests received per capita
    pub bq: f64,
    pub factor: f64,
    /// Replacement rate of this ability type
    pub theta: f64,
}

impl TaxBase {
    /// Capital plus labor income in model units
    pub fn income(&self) -> f64 {
        self.r * self.b + self.w * self.e * self.n
    }
}

/// Tax system built over the collaborator-supplied parameters
#[derive(Debug, Clone, Copy)]
pub struct TaxSystem<'a> {
    tax: &'a TaxParams,
    s: usize,
}

impl<'a> TaxSystem<'a> {
    pub fn new(tax: &'a TaxParams, s: usize) -> Self {
        Self { tax, s }
    }

    /// Income tax in model units
    pub fn income_tax(&self, income: f64, factor: f64) -> f64 {
        self.tax.income.etr.rate(income * factor) * income
    }

    fn analytical_mtr(&self, income: f64, factor: f64) -> f64 {
        let x = income * factor;
        self.tax.income.etr.rate(x) + x * self.tax.income.etr.slope(x)
    }

    /// Marginal tax rate on labor income
    pub fn mtr_labor(&self, income: f64, factor: f64) -> f64 {
        if self.tax.income.analytical_mtrs {
            self.analytical_mtr(income, factor)
        } else {
            self.tax.income.mtrx.rate(income * factor)
        }
    }

    /// Marginal tax rate on capital income
    pub fn mtr_capital(&self, income: f64, factor: f64) -> f64 {
        if self.tax.income.analytical_mtrs {
            self.analytical_mtr(income, factor)
        } else {
            self.tax.income.mtry.rate(income * factor)
        }
    }

    pub fn payroll_rate(&self) -> f64 {
        self.tax.tau_payroll
    }

    /// Gross return on one unit of wealth after capital income and wealth taxes
    pub fn after_tax_return(&self, base: &TaxBase) -> f64 {
        let mtry = self.mtr_capital(base.income(), base.factor);
        let wealth = &self.tax.wealth;
        1.0 + base.r * (1.0 - mtry) - wealth.slope(base.b) * base.b - wealth.rate(base.b)
    }

    /// Retirement benefit paid at this age
    pub fn benefit(&self, base: &TaxBase) -> f64 {
        let retirement = &self.tax.retirement;
        if retirement.enabled && base.age >= retirement.retire_age {
            base.theta * base.w
        } else {
            0.0
        }
    }

    /// Taxes paid net of retirement benefits, before the lump-sum transfer
    pub fn gross_tax(&self, base: &TaxBase) -> f64 {
        let income_tax = self.income_tax(base.income(), base.factor);
        let payroll = self.tax.tau_payroll * base.w * base.e * base.n;
        let bequest = self.tax.tau_bq[base.ability] * base.bq;
        let wealth = self.tax.wealth.rate(base.b) * base.b;
        income_tax + payroll - self.benefit(base) + bequest + wealth
    }

    /// Net tax including the lump-sum transfer `t_h`
    pub fn net_tax(&self, base: &TaxBase, t_h: f64) -> f64 {
        self.gross_tax(base) - t_h
    }

    /// Social-security replacement rate for one ability type
    ///
    /// Average indexed monthly earnings over the highest-earning periods before
    /// retirement run through a three-bracket benefit formula, then expressed
    /// relative to `factor * w`.
    pub fn replacement_rate(&self, n: &[f64], e: &[f64], w: f64, factor: f64) -> f64 {
        let retirement = &self.tax.retirement;
        let retire = retirement.retire_age;
        let scale = factor * w;
        if !retirement.enabled || retire == 0 || retire >= self.s || !(scale > 0.0) {
            return 0.0;
        }

        let mut earnings: Vec<f64> = (0..retire).map(|s| e[s] * n[s] * scale).collect();
        earnings.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        let periods = retirement.aime_years.clamp(1, retire);
        let months_per_period = 12.0 * 80.0 / self.s as f64;
        let aime = earnings[..periods].iter().sum::<f64>() / (months_per_period * periods as f64);

        let [bend_1, bend_2] = retirement.bend_points;
        let [rate_1, rate_2, rate_3] = retirement.pia_rates;
        let mut pia = if aime < bend_1 {
            rate_1 * aime
        } else if aime < bend_2 {
            rate_1 * bend_1 + rate_2 * (aime - bend_1)
        } else {
            rate_1 * bend_1 + rate_2 * (bend_2 - bend_1) + rate_3 * (aime - bend_2)
        };
        pia = pia.min(retirement.max_payment);
        if retirement.min_payment > 0.0 {
            pia = pia.max(retirement.min_payment);
        }

        pia * months_per_period / scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{IncomeTaxParams, RateSchedule, RetirementParams, WealthTaxParams};

    fn progressive(s: usize) -> TaxParams {
        TaxParams {
            income: IncomeTaxParams {
                etr: RateSchedule {
                    min_rate: 0.02,
                    max_rate: 0.35,
                    scale: 60_000.0,
                },
                mtrx: RateSchedule::flat(0.3),
                mtry: RateSchedule::flat(0.2),
                analytical_mtrs: true,
            },
            tau_payroll: 0.12,
            tau_bq: vec![0.1],
            wealth: WealthTaxParams { h: 0.1, p: 0.02, m: 1.0 },
            retirement: RetirementParams {
                retire_age: s - 2,
                ..RetirementParams::default()
            },
        }
    }

    fn retiring_at(s: usize, age: usize) -> TaxParams {
        let mut params = progressive(s);
        params.retirement.retire_age = age;
        params
    }

    fn base(age: usize) -> TaxBase {
        TaxBase {
            age,
            ability: 0,
            r: 0.05,
            w: 1.2,
            b: 0.8,
            n: 0.4,
            e: 1.1,
            bq: 0.05,
            factor: 80_000.0,
            theta: 0.3,
        }
    }

    #[test]
    fn test_analytical_mtr_is_derivative_of_income_tax() {
        let params = progressive(10);
        let tax = TaxSystem::new(&params, 10);
        let income = 0.7;
        let factor = 80_000.0;
        let h = 1e-7;
        let fd = (tax.income_tax(income + h, factor) - tax.income_tax(income - h, factor)) / (2.0 * h);
        let mtr = tax.mtr_labor(income, factor);
        assert!((fd - mtr).abs() < 1e-6, "fd {} vs mtr {}", fd, mtr);
        assert_eq!(tax.mtr_labor(income, factor), tax.mtr_capital(income, factor));
    }

    #[test]
    fn test_separate_marginal_schedules() {
        let mut params = progressive(10);
        params.income.analytical_mtrs = false;
        let tax = TaxSystem::new(&params, 10);
        assert!((tax.mtr_labor(1.0, 1.0) - 0.3).abs() < 1e-12);
        assert!((tax.mtr_capital(1.0, 1.0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_benefits_paid_only_after_retirement() {
        let params = progressive(10);
        let tax = TaxSystem::new(&params, 10);
        assert_eq!(tax.benefit(&base(7)), 0.0);
        assert!((tax.benefit(&base(8)) - 0.3 * 1.2).abs() < 1e-12);
        assert!(tax.gross_tax(&base(8)) < tax.gross_tax(&base(7)));
    }

    #[test]
    fn test_net_tax_subtracts_transfer() {
        let params = progressive(10);
        let tax = TaxSystem::new(&params, 10);
        let b = base(3);
        assert!((tax.gross_tax(&b) - tax.net_tax(&b, 0.25) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_replacement_rate_first_bracket() {
        // S = 80 so one period is one year and AIME is monthly earnings
        let s = 80;
        let params = retiring_at(s, 45);
        let tax = TaxSystem::new(&params, s);

        let n = vec![0.5; s];
        let e = vec![1.0; s];
        let w = 1.0;
        let factor = 10_000.0;
        // earnings 5000 per year -> AIME 416.67 per month, below the first bend
        let theta = tax.replacement_rate(&n, &e, w, factor);
        let expected = 0.9 * (5_000.0 / 12.0) * 12.0 / factor;
        assert!((theta - expected).abs() < 1e-12, "theta {} expected {}", theta, expected);
    }

    #[test]
    fn test_replacement_rate_capped() {
        let s = 80;
        let params = retiring_at(s, 45);
        let tax = TaxSystem::new(&params, s);

        let n = vec![0.9; s];
        let e = vec![5.0; s];
        let theta = tax.replacement_rate(&n, &e, 2.0, 1_000_000.0);
        let expected = 3501.0 * 12.0 / 2_000_000.0;
        assert!((theta - expected).abs() < 1e-12);
    }

    #[test]
    fn test_replacement_rate_zero_when_disabled() {
        let mut params = progressive(10);
        params.retirement.enabled = false;
        let tax = TaxSystem::new(&params, 10);
        assert_eq!(tax.replacement_rate(&[0.5; 10], &[1.0; 10], 1.0, 1.0), 0.0);
    }
}
