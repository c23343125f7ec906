//! Newton-type root finder for square nonlinear systems
//!
//! Used both for the household first-order conditions and for the direct
//! root-finding strategy over equilibrium prices. The Jacobian is built by
//! finite differences, the Newton step comes from an LU solve (falling back to
//! an SVD least-squares solve when the Jacobian is near singular) and a
//! backtracking line search on `0.5 * |F|^2` keeps candidates away from the
//! penalized region.

use crate::penalty;
use nalgebra::{DMatrix, DVector};

/// Settings for a Newton solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonConfig {
    /// Relative step size below which iteration stops
    pub xtol: f64,
    /// Max-norm residual below which iteration stops
    pub ftol: f64,
    pub max_iterations: usize,
    /// Relative finite-difference step
    pub fd_step: f64,
    /// Smallest |x| used to scale the finite-difference step
    pub fd_floor: f64,
    /// Step halvings tried before giving up on a direction
    pub max_backtracks: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            xtol: 1e-13,
            ftol: 1e-13,
            max_iterations: 100,
            fd_step: 1.49e-8,
            fd_floor: 1.0,
            max_backtracks: 40,
        }
    }
}

/// Why the iteration stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    ResidualTolerance,
    StepTolerance,
    /// No direction reduced the residual norm
    Stalled,
    MaxIterations,
}

/// Result of a Newton solve
#[derive(Debug, Clone)]
pub struct NewtonOutcome {
    pub x: Vec<f64>,
    pub residuals: Vec<f64>,
    pub iterations: usize,
    pub termination: Termination,
}

impl NewtonOutcome {
    /// Largest absolute residual
    pub fn max_residual(&self) -> f64 {
        max_abs(&self.residuals)
    }
}

pub(crate) fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc, v| {
        if v.is_finite() {
            acc.max(v.abs())
        } else {
            f64::INFINITY
        }
    })
}

fn merit(values: &[f64]) -> f64 {
    0.5 * values.iter().map(|v| v * v).sum::<f64>()
}

fn norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Solve `f(x) = 0` starting from `x0`
pub fn solve<F>(mut f: F, x0: &[f64], config: &NewtonConfig) -> NewtonOutcome
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    let mut x = x0.to_vec();
    let mut fx = f(&x);
    let mut current = merit(&fx);

    for iteration in 0..config.max_iterations {
        if max_abs(&fx) <= config.ftol {
            return NewtonOutcome {
                x,
                residuals: fx,
                iterations: iteration,
                termination: Termination::ResidualTolerance,
            };
        }

        let jac = jacobian(&mut f, &x, &fx, config);
        let rhs = DVector::from_iterator(fx.len(), fx.iter().map(|v| -v));

        let mut step = solve_linear(&jac, &rhs)
            .and_then(|dir| line_search(&mut f, &x, current, &dir, config, true));

        if step.is_none() {
            // Steepest descent on the merit function
            let grad = jac.transpose() * DVector::from_column_slice(&fx);
            let grad_norm = grad.norm();
            if grad_norm.is_finite() && grad_norm > 0.0 {
                let scale = norm(&x).max(1.0) / grad_norm;
                let dir = grad * (-scale);
                step = line_search(&mut f, &x, current, &dir, config, false);
            }
        }

        let Some(accepted) = step else {
            return NewtonOutcome {
                x,
                residuals: fx,
                iterations: iteration + 1,
                termination: Termination::Stalled,
            };
        };

        let x_scale = norm(&x);
        x = accepted.x;
        fx = accepted.fx;
        current = accepted.merit;

        if accepted.step_norm <= config.xtol * (x_scale + config.xtol) {
            let termination = if max_abs(&fx) <= config.ftol {
                Termination::ResidualTolerance
            } else {
                Termination::StepTolerance
            };
            return NewtonOutcome {
                x,
                residuals: fx,
                iterations: iteration + 1,
                termination,
            };
        }
    }

    let termination = if max_abs(&fx) <= config.ftol {
        Termination::ResidualTolerance
    } else {
        Termination::MaxIterations
    };
    NewtonOutcome {
        x,
        residuals: fx,
        iterations: config.max_iterations,
        termination,
    }
}

struct AcceptedStep {
    x: Vec<f64>,
    fx: Vec<f64>,
    merit: f64,
    step_norm: f64,
}

fn line_search<F>(
    f: &mut F,
    x: &[f64],
    current: f64,
    direction: &DVector<f64>,
    config: &NewtonConfig,
    sufficient_decrease: bool,
) -> Option<AcceptedStep>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    let mut t = 1.0;
    for _ in 0..config.max_backtracks {
        let candidate: Vec<f64> = x
            .iter()
            .zip(direction.iter())
            .map(|(xi, di)| xi + t * di)
            .collect();
        let f_candidate = f(&candidate);
        let m = merit(&f_candidate);

        let target = if sufficient_decrease {
            (1.0 - 1e-4 * t) * current
        } else {
            current
        };
        if m.is_finite() && m < target {
            let step_norm = t * direction.norm();
            return Some(AcceptedStep {
                x: candidate,
                fx: f_candidate,
                merit: m,
                step_norm,
            });
        }
        t *= 0.5;
    }
    None
}

/// Forward-difference Jacobian, switching to a backward difference for any
/// coordinate whose forward perturbation lands in the penalized region
fn jacobian<F>(f: &mut F, x: &[f64], fx: &[f64], config: &NewtonConfig) -> DMatrix<f64>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    let n = x.len();
    let m = fx.len();
    let base_penalized = penalty::any_penalized(fx);
    let mut jac = DMatrix::zeros(m, n);
    let mut probe = x.to_vec();

    for i in 0..n {
        let h = config.fd_step * x[i].abs().max(config.fd_floor);

        probe[i] = x[i] + h;
        let mut shifted = f(&probe);
        let mut sign = 1.0;
        if !base_penalized && penalty::any_penalized(&shifted) {
            probe[i] = x[i] - h;
            shifted = f(&probe);
            sign = -1.0;
        }
        probe[i] = x[i];

        for row in 0..m {
            jac[(row, i)] = sign * (shifted[row] - fx[row]) / h;
        }
    }
    jac
}

/// Solve `J d = rhs`, trying LU first and SVD least squares second
fn solve_linear(jac: &DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    if let Some(dir) = jac.clone().lu().solve(rhs) {
        if dir.iter().all(|v| v.is_finite()) {
            return Some(dir);
        }
    }

    let svd = jac.clone().svd(true, true);
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(dir) = svd.solve(rhs, tol) {
            if dir.iter().all(|v| v.is_finite()) {
                return Some(dir);
            }
        }
    }
    None
}
