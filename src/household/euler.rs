//! Household first-order conditions for one ability type
//!
//! The unknown vector is `[b[0..S], n[0..S]]` where `b[s]` is the saving
//! chosen at age `s`. The first S residuals are the savings conditions, the
//! last S the labor conditions.

use super::cohort::{entering_wealth, CohortState};
use super::tax::{TaxBase, TaxSystem};
use super::utility::{marginal_disutility_labor, marginal_utility_consumption, period_utility};
use crate::equilibrium::PriceVector;
use crate::params::{ParameterSet, UtilityWeights};
use crate::penalty::{sanitize, PENALTY};

/// Household problem of one ability type at fixed prices
pub struct HouseholdProblem<'a> {
    params: &'a ParameterSet,
    weights: &'a UtilityWeights,
    prices: PriceVector,
    ability: usize,
    e: Vec<f64>,
    tax: TaxSystem<'a>,
}

/// Budget-side quantities implied by a candidate path
#[derive(Debug, Clone)]
pub struct BudgetPaths {
    /// Bequests received per capita
    pub bq: f64,
    /// Replacement rate
    pub theta: f64,
    pub entering: Vec<f64>,
    pub consumption: Vec<f64>,
    pub taxes: Vec<f64>,
}

impl<'a> HouseholdProblem<'a> {
    pub fn new(
        params: &'a ParameterSet,
        weights: &'a UtilityWeights,
        prices: PriceVector,
        ability: usize,
    ) -> Self {
        let e = params.e.column(ability).iter().copied().collect();
        Self {
            params,
            weights,
            prices,
            ability,
            e,
            tax: TaxSystem::new(&params.tax, params.s()),
        }
    }

    pub fn ability(&self) -> usize {
        self.ability
    }

    pub fn prices(&self) -> &PriceVector {
        &self.prices
    }

    /// Per-capita bequests received by this ability type, implied by its own
    /// savings path
    pub fn bequests_received(&self, b: &[f64]) -> f64 {
        let p = self.params;
        let pooled: f64 = b
            .iter()
            .enumerate()
            .map(|(s, bs)| p.rho[s] * p.omega[s] * bs)
            .sum();
        (1.0 + self.prices.r) / (1.0 + p.g_n) * pooled
    }

    fn tax_base(&self, age: usize, entering: f64, n: f64, bq: f64, theta: f64) -> TaxBase {
        TaxBase {
            age,
            ability: self.ability,
            r: self.prices.r,
            w: self.prices.w,
            b: entering,
            n,
            e: self.e[age],
            bq,
            factor: self.prices.factor,
            theta,
        }
    }

    /// Consumption and taxes along a candidate path
    pub fn budget(&self, b: &[f64], n: &[f64]) -> BudgetPaths {
        let p = self.params;
        let PriceVector { r, w, t_h, factor } = self.prices;
        let bq = self.bequests_received(b);
        let theta = self.tax.replacement_rate(n, &self.e, w, factor);
        let entering = entering_wealth(b);
        let growth = p.g_y.exp();

        let mut consumption = Vec::with_capacity(b.len());
        let mut taxes = Vec::with_capacity(b.len());
        for s in 0..b.len() {
            let base = self.tax_base(s, entering[s], n[s], bq, theta);
            let tax = self.tax.net_tax(&base, t_h);
            let c = (1.0 + r) * entering[s] + w * self.e[s] * n[s] + bq - growth * b[s] - tax;
            consumption.push(c);
            taxes.push(tax);
        }

        BudgetPaths {
            bq,
            theta,
            entering,
            consumption,
            taxes,
        }
    }

    /// Savings and labor residuals, penalized where the candidate is infeasible
    pub fn residuals(&self, x: &[f64]) -> Vec<f64> {
        let p = self.params;
        let s_len = p.s();
        let (b, n) = x.split_at(s_len);
        let budget = self.budget(b, n);
        let c = &budget.consumption;

        let sigma = p.sigma;
        let discount = (-sigma * p.g_y).exp();
        let chi_b = self.weights.chi_b[self.ability];
        let w = self.prices.w;

        let mut out = vec![0.0; 2 * s_len];

        for s in 0..s_len {
            let mu = marginal_utility_consumption(c[s], sigma);

            let bequest = if p.rho[s] > 0.0 {
                p.rho[s] * discount * chi_b * b[s].powf(-sigma)
            } else {
                0.0
            };

            let continuation = if s + 1 < s_len {
                let next = self.tax_base(s + 1, b[s], n[s + 1], budget.bq, budget.theta);
                p.beta
                    * (1.0 - p.rho[s])
                    * self.tax.after_tax_return(&next)
                    * marginal_utility_consumption(c[s + 1], sigma)
                    * discount
            } else {
                0.0
            };

            out[s] = if c[s] <= 0.0 || (p.rho[s] > 0.0 && b[s] <= 0.0) {
                PENALTY
            } else {
                sanitize(mu - continuation - bequest)
            };

            let base = self.tax_base(s, budget.entering[s], n[s], budget.bq, budget.theta);
            let after_tax_wage =
                w * self.e[s] * (1.0 - self.tax.payroll_rate() - self.tax.mtr_labor(base.income(), base.factor));
            let labor = mu * after_tax_wage
                - marginal_disutility_labor(n[s], self.weights.chi_n[s], p);

            out[s_len + s] = if n[s] < 0.0 || n[s] >= p.ltilde {
                PENALTY
            } else {
                sanitize(labor)
            };
        }

        out
    }

    /// Build the cohort record, with consumption, for a solved vector
    pub fn cohort(&self, x: &[f64]) -> CohortState {
        let s_len = self.params.s();
        let (b, n) = x.split_at(s_len);
        let budget = self.budget(b, n);
        CohortState {
            b: b.to_vec(),
            n: n.to_vec(),
            c: budget.consumption,
        }
    }

    /// Period utility along a solved path
    pub fn utility(&self, state: &CohortState) -> Vec<f64> {
        let p = self.params;
        let chi_b = self.weights.chi_b[self.ability];
        (0..state.ages())
            .map(|s| {
                period_utility(
                    state.c[s],
                    state.n[s],
                    state.b[s],
                    p.rho[s],
                    self.weights.chi_n[s],
                    chi_b,
                    p,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ModelSize, TaxParams};
    use crate::penalty::is_penalized;

    fn untaxed(s: usize) -> ParameterSet {
        let mut params = ParameterSet::illustrative(ModelSize::new(s, 1));
        params.tax = TaxParams::none(s, 1);
        params.g_y = 0.0;
        params
    }

    fn prices() -> PriceVector {
        PriceVector {
            r: 0.3,
            w: 1.0,
            t_h: 0.0,
            factor: 1.0,
        }
    }

    #[test]
    fn test_budget_identity_without_taxes() {
        let params = untaxed(4);
        let weights = UtilityWeights::uniform(params.size, 0.5, 1.0);
        let problem = HouseholdProblem::new(&params, &weights, prices(), 0);

        let b = vec![0.1, 0.2, 0.15, 0.05];
        let n = vec![0.5, 0.5, 0.4, 0.2];
        let budget = problem.budget(&b, &n);
        let bq = problem.bequests_received(&b);

        let expected = (1.0 + 0.3) * 0.1 + params.e[(1, 0)] * 0.5 + bq - 0.2;
        assert!((budget.consumption[1] - expected).abs() < 1e-12);
        assert!(budget.taxes.iter().all(|t| t.abs() < 1e-15));
    }

    #[test]
    fn test_negative_consumption_is_penalized() {
        let params = untaxed(3);
        let weights = UtilityWeights::uniform(params.size, 0.5, 1.0);
        let problem = HouseholdProblem::new(&params, &weights, prices(), 0);

        // saving far more than income at the first age
        let x = vec![50.0, 0.1, 0.1, 0.4, 0.4, 0.4];
        let res = problem.residuals(&x);
        assert_eq!(res[0], PENALTY);
    }

    #[test]
    fn test_labor_outside_endowment_is_penalized() {
        let params = untaxed(3);
        let weights = UtilityWeights::uniform(params.size, 0.5, 1.0);
        let problem = HouseholdProblem::new(&params, &weights, prices(), 0);

        let x = vec![0.05, 0.05, 0.05, -0.1, 0.4, params.ltilde];
        let res = problem.residuals(&x);
        assert_eq!(res[3], PENALTY);
        assert!(!is_penalized(res[4]));
        assert_eq!(res[5], PENALTY);
    }

    #[test]
    fn test_residuals_finite_at_feasible_point() {
        let params = untaxed(5);
        let weights = UtilityWeights::uniform(params.size, 0.5, 2.0);
        let problem = HouseholdProblem::new(&params, &weights, prices(), 0);
        let x = CohortState::initial_guess(5, params.ltilde).stacked();
        let res = problem.residuals(&x);
        assert!(res.iter().all(|r| r.is_finite() && !is_penalized(*r)), "{:?}", res);
    }
}
