//! Wealth and labor moments, and the weighting matrix of the distance

use crate::equilibrium::SteadyStateSolution;
use crate::error::{ModelError, Result};
use crate::params::loader;
use crate::params::ParameterSet;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;

/// Which moments are matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentSpec {
    /// Age bands over which mean wealth is taken, per ability type
    pub age_bands: Vec<Range<usize>>,
}

impl MomentSpec {
    /// Split `s` ages into `count` contiguous bands of near-equal width
    pub fn even_bands(s: usize, count: usize) -> Self {
        let count = count.clamp(1, s.max(1));
        let age_bands = (0..count)
            .map(|band| (band * s / count)..((band + 1) * s / count))
            .collect();
        Self { age_bands }
    }

    pub fn wealth_len(&self, j: usize) -> usize {
        self.age_bands.len() * j
    }

    /// Total number of moments for an S x J economy
    pub fn len(&self, s: usize, j: usize) -> usize {
        self.wealth_len(j) + s
    }

    pub fn validate(&self, s: usize) -> Result<()> {
        if self.age_bands.is_empty() {
            return Err(ModelError::invalid("age_bands", "need at least one band"));
        }
        for band in &self.age_bands {
            if band.start >= band.end || band.end > s {
                return Err(ModelError::invalid(
                    "age_bands",
                    format!("band {}..{} is empty or beyond S = {}", band.start, band.end, s),
                ));
            }
        }
        Ok(())
    }
}

/// A stacked moment vector: mean wealth by ability type and age band
/// (ability-major), then aggregate labor by age
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub wealth: Vec<f64>,
    pub labor: Vec<f64>,
}

impl Moments {
    /// Model moments of a solved steady state, with wealth in data units
    ///
    /// Wealth is the population-weighted mean of `b * factor` over each age
    /// band within an ability type; the ability share is common to the band
    /// and drops out.
    pub fn from_solution(solution: &SteadyStateSolution, bands: &MomentSpec, params: &ParameterSet) -> Self {
        let factor = solution.prices.factor;
        let mut wealth = Vec::with_capacity(bands.wealth_len(params.j()));
        for j in 0..params.j() {
            for band in &bands.age_bands {
                wealth.push(band_mean(band, &params.omega, |s| solution.b[(s, j)] * factor));
            }
        }

        let labor = (0..params.s())
            .map(|s| {
                (0..params.j())
                    .map(|j| solution.n[(s, j)] * params.lambdas[j])
                    .sum()
            })
            .collect();

        Self { wealth, labor }
    }

    /// Split a stacked vector laid out as `[wealth.., labor..]`
    pub fn from_stacked(values: &[f64], bands: &MomentSpec, s: usize, j: usize) -> Result<Self> {
        let expected = bands.len(s, j);
        if values.len() != expected {
            return Err(ModelError::dimension("moments", expected, values.len()));
        }
        let split = bands.wealth_len(j);
        Ok(Self {
            wealth: values[..split].to_vec(),
            labor: values[split..].to_vec(),
        })
    }

    /// Load a single-column moments file in stacked order
    pub fn from_csv(path: &Path, bands: &MomentSpec, s: usize, j: usize) -> Result<Self> {
        let values = loader::load_vector(path)?;
        Self::from_stacked(&values, bands, s, j)
    }

    pub fn stacked(&self) -> Vec<f64> {
        self.wealth.iter().chain(self.labor.iter()).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.wealth.len() + self.labor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Weighting of moment deviations in the distance `d' W d`
#[derive(Debug, Clone, PartialEq)]
pub enum WeightingMatrix {
    Identity,
    Matrix(DMatrix<f64>),
}

impl WeightingMatrix {
    /// Inverse of a moment covariance matrix
    pub fn inverse_covariance(covariance: &DMatrix<f64>) -> Result<Self> {
        if !covariance.is_square() {
            return Err(ModelError::dimension("covariance columns", covariance.nrows(), covariance.ncols()));
        }
        covariance
            .clone()
            .try_inverse()
            .map(WeightingMatrix::Matrix)
            .ok_or_else(|| ModelError::invalid("covariance", "matrix is singular"))
    }

    /// Diagonal weights `1 / m^2`, making the distance a sum of squared
    /// relative deviations
    pub fn relative(data: &Moments) -> Result<Self> {
        let values = data.stacked();
        if let Some(m) = values.iter().find(|m| m.abs() < 1e-300) {
            return Err(ModelError::invalid("moments", format!("cannot weight relative to {}", m)));
        }
        let diagonal = DVector::from_iterator(values.len(), values.iter().map(|m| 1.0 / (m * m)));
        Ok(WeightingMatrix::Matrix(DMatrix::from_diagonal(&diagonal)))
    }

    pub fn check_size(&self, len: usize) -> Result<()> {
        match self {
            WeightingMatrix::Identity => Ok(()),
            WeightingMatrix::Matrix(w) => {
                if w.nrows() != len {
                    return Err(ModelError::dimension("weighting matrix rows", len, w.nrows()));
                }
                if w.ncols() != len {
                    return Err(ModelError::dimension("weighting matrix columns", len, w.ncols()));
                }
                Ok(())
            }
        }
    }

    /// `d' W d` for the deviation vector `d`
    pub fn distance(&self, deviations: &[f64]) -> f64 {
        match self {
            WeightingMatrix::Identity => deviations.iter().map(|d| d * d).sum(),
            WeightingMatrix::Matrix(w) => {
                let d = DVector::from_column_slice(deviations);
                d.dot(&(w * &d))
            }
        }
    }
}

/// Mean of `value` over `band` weighted by `omega`; a band with no
/// population falls back to the plain mean
fn band_mean(band: &Range<usize>, omega: &[f64], value: impl Fn(usize) -> f64) -> f64 {
    let mass: f64 = band.clone().map(|s| omega[s]).sum();
    if mass > 0.0 {
        band.clone().map(|s| omega[s] * value(s)).sum::<f64>() / mass
    } else {
        band.clone().map(&value).sum::<f64>() / band.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_bands_cover_all_ages() {
        let bands = MomentSpec::even_bands(10, 3);
        assert_eq!(bands.age_bands, vec![0..3, 3..6, 6..10]);
        assert!(bands.validate(10).is_ok());
        assert_eq!(bands.len(10, 2), 3 * 2 + 10);
    }

    #[test]
    fn test_band_beyond_last_age_rejected() {
        let bands = MomentSpec { age_bands: vec![0..2, 2..7] };
        assert!(bands.validate(5).is_err());
    }

    #[test]
    fn test_identity_and_matrix_distances_agree() {
        let d = [0.5, -1.0, 2.0];
        let identity = WeightingMatrix::Identity.distance(&d);
        let matrix = WeightingMatrix::Matrix(DMatrix::identity(3, 3)).distance(&d);
        assert!((identity - 5.25).abs() < 1e-12);
        assert!((matrix - identity).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_covariance() {
        let cov = DMatrix::from_diagonal(&DVector::from_vec(vec![4.0, 0.25]));
        let w = WeightingMatrix::inverse_covariance(&cov).unwrap();
        assert!((w.distance(&[2.0, 0.5]) - 2.0).abs() < 1e-12);

        let singular = DMatrix::from_element(2, 2, 1.0);
        assert!(WeightingMatrix::inverse_covariance(&singular).is_err());
    }

    #[test]
    fn test_relative_weights() {
        let data = Moments {
            wealth: vec![100.0],
            labor: vec![0.5],
        };
        let w = WeightingMatrix::relative(&data).unwrap();
        // 1% deviation in each moment
        assert!((w.distance(&[1.0, 0.005]) - 2e-4).abs() < 1e-15);
    }

    #[test]
    fn test_band_mean_weights_by_population() {
        let values = [1.0, 2.0, 4.0];
        assert!((band_mean(&(0..3), &[0.5, 0.25, 0.25], |s| values[s]) - 2.0).abs() < 1e-12);
        assert!((band_mean(&(1..3), &[0.5, 0.5, 0.0], |s| values[s]) - 2.0).abs() < 1e-12);
        assert!((band_mean(&(1..3), &[1.0, 0.0, 0.0], |s| values[s]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_wealth_moments_follow_population_weights() {
        use crate::equilibrium::{EquilibriumGuess, SolverConfig, SteadyStateSolver};
        use crate::params::{ModelSize, TaxParams, UtilityWeights};

        let mut params = ParameterSet::illustrative(ModelSize::new(3, 1));
        params.tax = TaxParams::none(3, 1);
        let weights = UtilityWeights::new(vec![0.6], vec![2.0, 3.0, 4.0]).unwrap();
        let solution = SteadyStateSolver::new(&params, &weights, SolverConfig::default())
            .solve(&EquilibriumGuess::new(&params))
            .unwrap();
        assert!(solution.converged);

        let bands = MomentSpec::even_bands(3, 1);
        let base = Moments::from_solution(&solution, &bands, &params);
        let expected: f64 = (0..3)
            .map(|s| params.omega[s] * solution.b[(s, 0)] * solution.prices.factor)
            .sum::<f64>()
            / params.omega.iter().sum::<f64>();
        assert!((base.wealth[0] - expected).abs() < 1e-12 * expected.abs().max(1.0));

        // shifting population toward the oldest age moves the wealth moment
        let mut older = params.clone();
        older.omega = vec![0.1, 0.2, 0.7];
        let shifted = Moments::from_solution(&solution, &bands, &older);
        assert!((shifted.wealth[0] - base.wealth[0]).abs() > 1e-6);
        assert_eq!(shifted.labor, base.labor);
    }

    #[test]
    fn test_stacked_layout() {
        let bands = MomentSpec::even_bands(3, 3);
        let values = [1.0, 2.0, 3.0, 0.4, 0.5, 0.3];
        let moments = Moments::from_stacked(&values, &bands, 3, 1).unwrap();
        assert_eq!(moments.wealth, vec![1.0, 2.0, 3.0]);
        assert_eq!(moments.labor, vec![0.4, 0.5, 0.3]);
        assert_eq!(moments.stacked(), values.to_vec());
        assert!(Moments::from_stacked(&values[..5], &bands, 3, 1).is_err());
    }
}
