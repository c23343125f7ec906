//! Model parameters: structural scalars, demographic and ability arrays,
//! tax parameters and the calibrated utility weights

mod demographics;
pub mod loader;
mod tax;

pub use demographics::{stationarity_gap, stationary_weights};
pub use tax::{IncomeTaxParams, RateSchedule, RetirementParams, TaxParams, WealthTaxParams};

use crate::error::{ModelError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of ages and ability types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSize {
    /// Number of age cohorts (S)
    pub s: usize,
    /// Number of ability types (J)
    pub j: usize,
}

impl ModelSize {
    pub fn new(s: usize, j: usize) -> Self {
        Self { s, j }
    }
}

/// Elliptical approximation to CFE labor disutility
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipticalUtility {
    pub b_ellipse: f64,
    pub upsilon: f64,
}

impl Default for EllipticalUtility {
    fn default() -> Self {
        Self {
            b_ellipse: 0.527,
            upsilon: 1.497,
        }
    }
}

/// Immutable model parameters, constructed once and passed by reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSet {
    pub size: ModelSize,
    /// Discount factor per model period
    pub beta: f64,
    /// Coefficient of relative risk aversion
    pub sigma: f64,
    /// Capital share of income
    pub alpha: f64,
    /// Total factor productivity
    pub z: f64,
    /// Depreciation rate per model period
    pub delta: f64,
    /// Labor-augmenting technology growth (log rate per period)
    pub g_y: f64,
    /// Population growth per period
    pub g_n: f64,
    /// Time endowment
    pub ltilde: f64,
    pub ellipse: EllipticalUtility,
    pub tax: TaxParams,
    /// Mean household income in the data (dollars), targeted by the factor
    pub mean_income_data: f64,
    /// Ability-productivity grid e[s, j]
    pub e: DMatrix<f64>,
    /// Population weights by age
    pub omega: Vec<f64>,
    /// Population share of each ability type
    pub lambdas: Vec<f64>,
    /// Mortality probability at the end of each age
    pub rho: Vec<f64>,
    /// Immigration rates by age
    pub imm_rates: Vec<f64>,
}

impl ParameterSet {
    pub fn s(&self) -> usize {
        self.size.s
    }

    pub fn j(&self) -> usize {
        self.size.j
    }

    /// Self-consistent parameterization for `size.s` periods spanning ages
    /// 21 to 100 and `size.j` ability types of equal mass
    pub fn illustrative(size: ModelSize) -> Self {
        let ModelSize { s, j } = size;
        let years = 80.0 / s as f64;

        let rho: Vec<f64> = (0..s)
            .map(|age| {
                if age + 1 == s {
                    1.0
                } else {
                    let annual = (0.0005 * (0.085 * (age as f64 * years)).exp()).min(1.0);
                    1.0 - (1.0 - annual).powf(years)
                }
            })
            .collect();
        let imm_rates: Vec<f64> = (0..s)
            .map(|age| if age > 0 && age < s / 2 { 0.001 * years } else { 0.0 })
            .collect();
        let g_n = 1.01_f64.powf(years) - 1.0;
        let omega = stationary_weights(&rho, &imm_rates, g_n);
        let lambdas = vec![1.0 / j as f64; j];

        let mut e = DMatrix::from_fn(s, j, |age, ability| {
            let a = age as f64 * years;
            (0.04 * a - 0.0006 * a * a).exp() * 1.6_f64.powi(ability as i32)
        });
        // Normalize effective labor endowment to one
        let mass: f64 = (0..s)
            .flat_map(|age| (0..j).map(move |ability| (age, ability)))
            .map(|(age, ability)| e[(age, ability)] * omega[age] * lambdas[ability])
            .sum();
        e /= mass;

        let mean_income_data = 84_377.0;
        let retire_age = (((65.0 - 21.0) / years).round() as usize).min(s);

        let tax = TaxParams {
            income: IncomeTaxParams {
                etr: RateSchedule {
                    min_rate: 0.0,
                    max_rate: 0.30,
                    scale: mean_income_data,
                },
                mtrx: RateSchedule::flat(0.25),
                mtry: RateSchedule::flat(0.20),
                analytical_mtrs: true,
            },
            tau_payroll: 0.10,
            tau_bq: vec![0.0; j],
            wealth: WealthTaxParams { h: 0.1, p: 0.0, m: 1.0 },
            retirement: RetirementParams {
                retire_age,
                ..RetirementParams::default()
            },
        };

        Self {
            size,
            beta: 0.96_f64.powf(years),
            sigma: 2.0,
            alpha: 0.35,
            z: 1.0,
            delta: 1.0 - 0.95_f64.powf(years),
            g_y: 0.02 * years,
            g_n,
            ltilde: 1.0,
            ellipse: EllipticalUtility::default(),
            tax,
            mean_income_data,
            e,
            omega,
            lambdas,
            rho,
            imm_rates,
        }
    }

    /// Load a parameter set from a JSON file and validate it
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let params: ParameterSet = serde_json::from_reader(std::io::BufReader::new(file))?;
        params.validate()?;
        Ok(params)
    }

    /// Replace the demographic and ability arrays with those found in `dir`
    pub fn with_arrays_from_csv(mut self, dir: &Path) -> Result<Self> {
        let arrays = loader::LoadedArrays::load_from(dir)?;
        self.omega = arrays.omega;
        self.rho = arrays.rho;
        self.imm_rates = arrays.imm_rates;
        self.lambdas = arrays.lambdas;
        self.e = arrays.e;
        self.size = ModelSize::new(self.e.nrows(), self.e.ncols());
        self.validate()?;
        Ok(self)
    }

    /// Check dimensions and the invariants every solver relies on
    pub fn validate(&self) -> Result<()> {
        let ModelSize { s, j } = self.size;
        if s < 2 {
            return Err(ModelError::invalid("S", "need at least two ages"));
        }
        if j == 0 {
            return Err(ModelError::invalid("J", "need at least one ability type"));
        }

        check_len("omega", &self.omega, s)?;
        check_len("rho", &self.rho, s)?;
        check_len("imm_rates", &self.imm_rates, s)?;
        check_len("lambdas", &self.lambdas, j)?;
        check_len("tau_bq", &self.tax.tau_bq, j)?;
        if self.e.nrows() != s {
            return Err(ModelError::dimension("e rows", s, self.e.nrows()));
        }
        if self.e.ncols() != j {
            return Err(ModelError::dimension("e columns", j, self.e.ncols()));
        }

        check_nonnegative("omega", &self.omega)?;
        check_nonnegative("rho", &self.rho)?;
        check_nonnegative("lambdas", &self.lambdas)?;
        check_nonnegative("e", self.e.as_slice())?;
        check_sums_to_one("omega", &self.omega)?;
        check_sums_to_one("lambdas", &self.lambdas)?;

        if self.rho.iter().any(|&r| r > 1.0) {
            return Err(ModelError::invalid("rho", "mortality rates must not exceed 1"));
        }
        if (self.rho[s - 1] - 1.0).abs() > 1e-12 {
            return Err(ModelError::invalid("rho", "terminal mortality rate must be 1"));
        }

        if !(self.beta > 0.0) {
            return Err(ModelError::invalid("beta", "must be positive"));
        }
        if !(self.sigma > 0.0) {
            return Err(ModelError::invalid("sigma", "must be positive"));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ModelError::invalid("alpha", "must lie in (0, 1)"));
        }
        if !(self.z > 0.0) {
            return Err(ModelError::invalid("Z", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.delta) {
            return Err(ModelError::invalid("delta", "must lie in [0, 1]"));
        }
        if !(self.g_n > -1.0) {
            return Err(ModelError::invalid("g_n", "must exceed -1"));
        }
        if !(self.ltilde > 0.0) {
            return Err(ModelError::invalid("ltilde", "must be positive"));
        }
        if !(self.ellipse.b_ellipse > 0.0) {
            return Err(ModelError::invalid("b_ellipse", "must be positive"));
        }
        if !(self.ellipse.upsilon > 1.0) {
            return Err(ModelError::invalid("upsilon", "must exceed 1"));
        }
        if !(self.mean_income_data > 0.0) {
            return Err(ModelError::invalid("mean_income_data", "must be positive"));
        }
        if self.tax.retirement.retire_age > s {
            return Err(ModelError::invalid("retire_age", format!("must not exceed S = {}", s)));
        }
        for (name, sched) in [
            ("etr", &self.tax.income.etr),
            ("mtrx", &self.tax.income.mtrx),
            ("mtry", &self.tax.income.mtry),
        ] {
            if sched.max_rate != sched.min_rate && !(sched.scale > 0.0) {
                return Err(ModelError::invalid(name, "non-flat schedule needs a positive scale"));
            }
        }

        let gap = stationarity_gap(&self.omega, &self.rho, &self.imm_rates, self.g_n);
        if gap > 1e-10 {
            log::warn!(
                "Population weights are not stationary (gap {:.3e}); the resource constraint will not hold exactly",
                gap
            );
        }

        Ok(())
    }
}

fn check_len(name: &str, values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(ModelError::dimension(name, expected, values.len()));
    }
    Ok(())
}

fn check_nonnegative(name: &str, values: &[f64]) -> Result<()> {
    if values.iter().any(|v| !(*v >= 0.0)) {
        return Err(ModelError::invalid(name, "entries must be nonnegative and finite"));
    }
    Ok(())
}

fn check_sums_to_one(name: &str, values: &[f64]) -> Result<()> {
    let total: f64 = values.iter().sum();
    if (total - 1.0).abs() > 1e-6 {
        return Err(ModelError::invalid(name, format!("must sum to 1, sums to {}", total)));
    }
    Ok(())
}

/// Calibrated preference weights
///
/// Held fixed during a single equilibrium solve; the calibration loop owns
/// them between evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilityWeights {
    /// Bequest-utility weight per ability type
    pub chi_b: Vec<f64>,
    /// Labor-disutility weight per age
    pub chi_n: Vec<f64>,
}

impl UtilityWeights {
    pub fn new(chi_b: Vec<f64>, chi_n: Vec<f64>) -> Result<Self> {
        if let Some(v) = chi_b.iter().find(|v| !(**v > 0.0) || !v.is_finite()) {
            return Err(ModelError::invalid("chi_b", format!("entries must be positive, found {}", v)));
        }
        if let Some(v) = chi_n.iter().find(|v| !(**v > 0.0) || !v.is_finite()) {
            return Err(ModelError::invalid("chi_n", format!("entries must be positive, found {}", v)));
        }
        Ok(Self { chi_b, chi_n })
    }

    /// Same weight at every ability type and every age
    pub fn uniform(size: ModelSize, chi_b: f64, chi_n: f64) -> Self {
        Self {
            chi_b: vec![chi_b; size.j],
            chi_n: vec![chi_n; size.s],
        }
    }

    /// Split a stacked `[chi_b.., chi_n..]` vector
    pub fn from_stacked(theta: &[f64], size: ModelSize) -> Result<Self> {
        if theta.len() != size.j + size.s {
            return Err(ModelError::dimension("stacked weights", size.j + size.s, theta.len()));
        }
        Self::new(theta[..size.j].to_vec(), theta[size.j..].to_vec())
    }

    /// Stack as `[chi_b.., chi_n..]`
    pub fn stacked(&self) -> Vec<f64> {
        self.chi_b.iter().chain(self.chi_n.iter()).copied().collect()
    }

    pub fn check_size(&self, size: ModelSize) -> Result<()> {
        check_len("chi_b", &self.chi_b, size.j)?;
        check_len("chi_n", &self.chi_n, size.s)
    }

    /// Multiply every labor-disutility weight by `factor`
    pub fn scale_labor(&self, factor: f64) -> Self {
        Self {
            chi_b: self.chi_b.clone(),
            chi_n: self.chi_n.iter().map(|c| c * factor).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illustrative_parameters_validate() {
        for (s, j) in [(3, 1), (8, 2), (80, 7)] {
            let params = ParameterSet::illustrative(ModelSize::new(s, j));
            assert!(params.validate().is_ok(), "S={} J={} failed validation", s, j);
            let gap = stationarity_gap(&params.omega, &params.rho, &params.imm_rates, params.g_n);
            assert!(gap < 1e-12);
        }
    }

    #[test]
    fn test_effective_labor_normalized() {
        let params = ParameterSet::illustrative(ModelSize::new(10, 3));
        let mut mass = 0.0;
        for s in 0..10 {
            for j in 0..3 {
                mass += params.e[(s, j)] * params.omega[s] * params.lambdas[j];
            }
        }
        assert!((mass - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_validation_rejects_bad_lambdas() {
        let mut params = ParameterSet::illustrative(ModelSize::new(4, 2));
        params.lambdas = vec![0.7, 0.7];
        assert!(matches!(params.validate(), Err(ModelError::InvalidParameter { .. })));
    }

    #[test]
    fn test_validation_rejects_wrong_dimensions() {
        let mut params = ParameterSet::illustrative(ModelSize::new(4, 2));
        params.rho.push(1.0);
        assert!(matches!(params.validate(), Err(ModelError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_validation_rejects_negative_omega() {
        let mut params = ParameterSet::illustrative(ModelSize::new(4, 1));
        params.omega = vec![0.6, 0.5, -0.2, 0.1];
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_weights_stack_round_trip() {
        let size = ModelSize::new(3, 2);
        let weights = UtilityWeights::new(vec![0.5, 1.0], vec![1.0, 2.0, 3.0]).unwrap();
        let stacked = weights.stacked();
        assert_eq!(stacked, vec![0.5, 1.0, 1.0, 2.0, 3.0]);
        assert_eq!(UtilityWeights::from_stacked(&stacked, size).unwrap(), weights);
    }

    #[test]
    fn test_weights_reject_non_positive() {
        assert!(UtilityWeights::new(vec![0.0], vec![1.0]).is_err());
        assert!(UtilityWeights::new(vec![1.0], vec![-1.0]).is_err());
        assert!(UtilityWeights::new(vec![1.0], vec![f64::NAN]).is_err());
    }

    #[test]
    fn test_parameters_json_round_trip() {
        let params = ParameterSet::illustrative(ModelSize::new(5, 2));
        let json = serde_json::to_string(&params).unwrap();
        let back: ParameterSet = serde_json::from_str(&json).unwrap();
        assert!(back.validate().is_ok());
        assert_eq!(back.size, params.size);
        assert!((back.e[(2, 1)] - params.e[(2, 1)]).abs() < 1e-12);
    }
}
