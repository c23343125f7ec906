//! Aggregation of household decisions into macro quantities and proposed
//! prices

use super::config::SolveMode;
use super::firm;
use super::prices::PriceVector;
use crate::household::{entering_wealth, TaxBase, TaxSystem};
use crate::params::ParameterSet;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Aggregates implied by one set of household decisions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregates {
    pub k: f64,
    pub l: f64,
    pub y: f64,
    /// Interest rate implied by the firm's first-order condition
    pub r: f64,
    /// Wage implied by the firm's first-order condition
    pub w: f64,
    /// Total bequests left by each ability type
    pub bq: Vec<f64>,
    /// Replacement rate per ability type
    pub theta: Vec<f64>,
    /// Proposed income factor
    pub factor: f64,
    /// Proposed lump-sum transfer balancing the government budget
    pub t_h: f64,
    /// Average model income per capita
    pub mean_income: f64,
}

impl Aggregates {
    /// Proposed prices for the next outer iteration
    pub fn proposed_prices(&self) -> PriceVector {
        PriceVector {
            r: self.r,
            w: self.w,
            t_h: self.t_h,
            factor: self.factor,
        }
    }

    pub fn is_finite(&self) -> bool {
        [self.k, self.l, self.y, self.r, self.w, self.factor, self.t_h]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Aggregation over all ages and ability types
pub struct AggregationEngine<'a> {
    params: &'a ParameterSet,
    tax: TaxSystem<'a>,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(params: &'a ParameterSet) -> Self {
        Self {
            params,
            tax: TaxSystem::new(&params.tax, params.s()),
        }
    }

    /// Population-and-type weight of cell (s, j)
    fn weight(&self, s: usize, j: usize) -> f64 {
        self.params.omega[s] * self.params.lambdas[j]
    }

    /// Immigrants arriving at age s+1 per unit of current population
    fn arriving(&self, s: usize) -> f64 {
        let p = self.params;
        if s + 1 < p.s() {
            p.imm_rates[s + 1] * p.omega[s + 1]
        } else {
            0.0
        }
    }

    /// Capital next period: all savings plus the wealth immigrants bring,
    /// per member of next period's population
    pub fn capital(&self, b: &DMatrix<f64>) -> f64 {
        let p = self.params;
        let mut total = 0.0;
        for s in 0..p.s() {
            for j in 0..p.j() {
                total += (p.omega[s] + self.arriving(s)) * p.lambdas[j] * b[(s, j)];
            }
        }
        total / (1.0 + p.g_n)
    }

    /// Effective labor supply
    pub fn labor(&self, n: &DMatrix<f64>) -> f64 {
        let p = self.params;
        let mut total = 0.0;
        for s in 0..p.s() {
            for j in 0..p.j() {
                total += p.e[(s, j)] * self.weight(s, j) * n[(s, j)];
            }
        }
        total
    }

    /// Steady-state gross investment
    pub fn investment(&self, k: f64, b: &DMatrix<f64>) -> f64 {
        let p = self.params;
        let growth = p.g_y.exp();
        let mut imported = 0.0;
        for s in 0..p.s() {
            for j in 0..p.j() {
                imported += self.arriving(s) * p.lambdas[j] * b[(s, j)];
            }
        }
        ((1.0 + p.g_n) * growth - 1.0 + p.delta) * k - growth * imported
    }

    /// Bequests received per capita by each ability type
    pub fn bequests_per_capita(&self, r: f64, b: &DMatrix<f64>) -> Vec<f64> {
        let p = self.params;
        (0..p.j())
            .map(|j| {
                let pooled: f64 = (0..p.s()).map(|s| p.rho[s] * p.omega[s] * b[(s, j)]).sum();
                (1.0 + r) / (1.0 + p.g_n) * pooled
            })
            .collect()
    }

    /// Total bequests left by each ability type
    pub fn bequests(&self, r: f64, b: &DMatrix<f64>) -> Vec<f64> {
        self.bequests_per_capita(r, b)
            .into_iter()
            .zip(self.params.lambdas.iter())
            .map(|(per_capita, lambda)| per_capita * lambda)
            .collect()
    }

    /// Replacement rate of every ability type
    pub fn replacement_rates(&self, n: &DMatrix<f64>, w: f64, factor: f64) -> Vec<f64> {
        let p = self.params;
        (0..p.j())
            .map(|j| {
                let labor: Vec<f64> = n.column(j).iter().copied().collect();
                let e: Vec<f64> = p.e.column(j).iter().copied().collect();
                self.tax.replacement_rate(&labor, &e, w, factor)
            })
            .collect()
    }

    /// Average capital plus labor income per capita in model units
    pub fn mean_income(&self, r: f64, w: f64, b: &DMatrix<f64>, n: &DMatrix<f64>) -> f64 {
        let p = self.params;
        let mut total = 0.0;
        for j in 0..p.j() {
            let column: Vec<f64> = b.column(j).iter().copied().collect();
            let entering = entering_wealth(&column);
            for s in 0..p.s() {
                total += (r * entering[s] + w * p.e[(s, j)] * n[(s, j)]) * self.weight(s, j);
            }
        }
        total
    }

    /// Government revenue net of benefits, rebated as the lump-sum transfer
    pub fn lump_sum(
        &self,
        prices: &PriceVector,
        b: &DMatrix<f64>,
        n: &DMatrix<f64>,
        bq_per_capita: &[f64],
        theta: &[f64],
    ) -> f64 {
        let p = self.params;
        let mut revenue = 0.0;
        for j in 0..p.j() {
            let column: Vec<f64> = b.column(j).iter().copied().collect();
            let entering = entering_wealth(&column);
            for s in 0..p.s() {
                let base = TaxBase {
                    age: s,
                    ability: j,
                    r: prices.r,
                    w: prices.w,
                    b: entering[s],
                    n: n[(s, j)],
                    e: p.e[(s, j)],
                    bq: bq_per_capita[j],
                    factor: prices.factor,
                    theta: theta[j],
                };
                revenue += self.tax.gross_tax(&base) * self.weight(s, j);
            }
        }
        revenue
    }

    /// Macro aggregates and proposed prices from the S x J decision matrices
    pub fn aggregate(
        &self,
        b: &DMatrix<f64>,
        n: &DMatrix<f64>,
        current: &PriceVector,
        mode: SolveMode,
    ) -> Aggregates {
        let p = self.params;
        let k = self.capital(b);
        let l = self.labor(n);
        let y = firm::output(k, l, p);
        let r = firm::interest_rate(y, k, p);
        let w = firm::wage(y, l, p);

        let mean_income = self.mean_income(r, w, b, n);
        let factor = match mode {
            SolveMode::Baseline => p.mean_income_data / mean_income,
            SolveMode::Reform { .. } => current.factor,
        };

        let bq_per_capita = self.bequests_per_capita(r, b);
        let theta = self.replacement_rates(n, w, factor);
        let proposed = PriceVector { r, w, t_h: 0.0, factor };
        let t_h = self.lump_sum(&proposed, b, n, &bq_per_capita, &theta);

        let bq = bq_per_capita
            .iter()
            .zip(p.lambdas.iter())
            .map(|(per_capita, lambda)| per_capita * lambda)
            .collect();

        Aggregates {
            k,
            l,
            y,
            r,
            w,
            bq,
            theta,
            factor,
            t_h,
            mean_income,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ModelSize, TaxParams};

    fn flat_matrices(params: &ParameterSet, b: f64, n: f64) -> (DMatrix<f64>, DMatrix<f64>) {
        (
            DMatrix::from_element(params.s(), params.j(), b),
            DMatrix::from_element(params.s(), params.j(), n),
        )
    }

    #[test]
    fn test_labor_with_normalized_ability() {
        let params = ParameterSet::illustrative(ModelSize::new(6, 2));
        let engine = AggregationEngine::new(&params);
        let (_, n) = flat_matrices(&params, 0.0, 0.35);
        // effective labor endowment normalized to one
        assert!((engine.labor(&n) - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_capital_without_immigration_or_growth() {
        let mut params = ParameterSet::illustrative(ModelSize::new(5, 1));
        params.imm_rates = vec![0.0; 5];
        params.g_n = 0.0;
        let engine = AggregationEngine::new(&params);
        let (b, _) = flat_matrices(&params, 2.0, 0.0);
        assert!((engine.capital(&b) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_bequests_pool_terminal_savings() {
        let mut params = ParameterSet::illustrative(ModelSize::new(3, 1));
        params.rho = vec![0.0, 0.0, 1.0];
        params.omega = vec![1.0 / 3.0; 3];
        params.g_n = 0.0;
        let engine = AggregationEngine::new(&params);
        let b = DMatrix::from_column_slice(3, 1, &[0.1, 0.2, 0.6]);
        let bq = engine.bequests(0.5, &b);
        assert!((bq[0] - 1.5 * 0.6 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_reform_mode_keeps_factor() {
        let params = ParameterSet::illustrative(ModelSize::new(6, 2));
        let engine = AggregationEngine::new(&params);
        let (b, n) = flat_matrices(&params, 0.5, 0.4);
        let current = PriceVector::from_rate(0.3, 0.01, 123_456.0, &params);

        let reform = engine.aggregate(&b, &n, &current, SolveMode::Reform { factor: 123_456.0 });
        assert_eq!(reform.factor, 123_456.0);

        let baseline = engine.aggregate(&b, &n, &current, SolveMode::Baseline);
        assert!((baseline.factor * baseline.mean_income - params.mean_income_data).abs() < 1e-6);
    }

    #[test]
    fn test_no_taxes_means_no_transfer() {
        let mut params = ParameterSet::illustrative(ModelSize::new(6, 2));
        params.tax = TaxParams::none(6, 2);
        let engine = AggregationEngine::new(&params);
        let (b, n) = flat_matrices(&params, 0.5, 0.4);
        let current = PriceVector::from_rate(0.3, 0.0, 1.0, &params);
        let agg = engine.aggregate(&b, &n, &current, SolveMode::Baseline);
        assert_eq!(agg.t_h, 0.0);
        assert!(agg.theta.iter().all(|t| *t == 0.0));
    }

    #[test]
    fn test_firm_prices_consistent_with_aggregates() {
        let params = ParameterSet::illustrative(ModelSize::new(6, 2));
        let engine = AggregationEngine::new(&params);
        let (b, n) = flat_matrices(&params, 0.8, 0.4);
        let current = PriceVector::from_rate(0.3, 0.0, 1.0, &params);
        let agg = engine.aggregate(&b, &n, &current, SolveMode::Baseline);
        assert!((params.alpha * agg.y / agg.k - params.delta - agg.r).abs() < 1e-12);
        assert!((firm::wage_from_rate(agg.r, &params) - agg.w).abs() < 1e-10);
    }
}
