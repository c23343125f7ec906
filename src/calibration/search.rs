//! Derivative-free global search
//!
//! A search alternates a local refinement with random perturbations of the
//! current point, keeping the best local minimum it has seen. Concrete
//! strategies decide how to refine, how to perturb and which local minima to
//! move to.

use crate::penalty::PENALTY;
use log::{debug, info};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Something a search can evaluate
pub trait SearchObjective {
    fn value(&mut self, x: &[f64]) -> f64;

    /// True once the evaluation budget is spent
    fn exhausted(&self) -> bool {
        false
    }
}

impl<F> SearchObjective for F
where
    F: FnMut(&[f64]) -> f64,
{
    fn value(&mut self, x: &[f64]) -> f64 {
        self(x)
    }
}

/// A local minimum found by a refinement step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalMinimum {
    pub x: Vec<f64>,
    pub f: f64,
    pub evaluations: usize,
}

/// Pluggable global search
pub trait SearchStrategy {
    /// Refine `x0` to a nearby local minimum
    fn local_refine(&mut self, objective: &mut dyn SearchObjective, x0: &[f64]) -> LocalMinimum;

    /// Random jump away from `x`
    fn perturb(&mut self, x: &[f64]) -> Vec<f64>;

    /// Whether to move from a local minimum with value `current` to one with
    /// value `candidate`
    fn accept(&mut self, current: f64, candidate: f64) -> bool;

    /// Number of perturbation hops
    fn iterations(&self) -> usize;
}

/// Outcome of [`run_search`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best: LocalMinimum,
    pub hops: usize,
    pub accepted: usize,
    pub evaluations: usize,
}

/// Run `strategy` from `x0`
pub fn run_search<S>(strategy: &mut S, objective: &mut dyn SearchObjective, x0: &[f64]) -> SearchOutcome
where
    S: SearchStrategy + ?Sized,
{
    let first = strategy.local_refine(objective, x0);
    let mut evaluations = first.evaluations;
    info!("Initial local minimum {:.6e}", first.f);

    let mut current = first.clone();
    let mut best = first;
    let mut hops = 0;
    let mut accepted = 0;

    for hop in 0..strategy.iterations() {
        if objective.exhausted() {
            info!("Evaluation budget spent after {} hops", hop);
            break;
        }
        hops += 1;

        let start = strategy.perturb(&current.x);
        let candidate = strategy.local_refine(objective, &start);
        evaluations += candidate.evaluations;

        if candidate.f < best.f {
            best = candidate.clone();
        }
        let moved = strategy.accept(current.f, candidate.f);
        if moved {
            accepted += 1;
            current = candidate;
        }
        info!(
            "Hop {}: local minimum {:.6e}, {}, best {:.6e}",
            hop + 1,
            current.f,
            if moved { "accepted" } else { "rejected" },
            best.f
        );
    }

    SearchOutcome {
        best,
        hops,
        accepted,
        evaluations,
    }
}

/// Settings for the Nelder-Mead simplex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NelderMeadOptions {
    /// Iterations per simplex run
    pub max_iterations: usize,
    /// Simplex size in x below which a run stops
    pub xatol: f64,
    /// Spread of simplex values below which a run stops
    pub fatol: f64,
    /// Relative size of the initial simplex
    pub initial_step: f64,
    /// Fresh simplices built around the best point after a run stops
    pub restarts: usize,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            xatol: 1e-8,
            fatol: 1e-12,
            initial_step: 0.05,
            restarts: 2,
        }
    }
}

/// Nelder-Mead minimization with restarts
pub fn nelder_mead(objective: &mut dyn SearchObjective, x0: &[f64], options: &NelderMeadOptions) -> LocalMinimum {
    let mut result = simplex_run(objective, x0, options);
    for restart in 0..options.restarts {
        if objective.exhausted() {
            break;
        }
        let again = simplex_run(objective, &result.x, options);
        let evaluations = result.evaluations + again.evaluations;
        let improvement = result.f - again.f;
        debug!("Restart {}: {:.6e} -> {:.6e}", restart + 1, result.f, again.f);
        if again.f <= result.f {
            result = LocalMinimum { evaluations, ..again };
        } else {
            result.evaluations = evaluations;
        }
        if improvement.abs() <= options.fatol {
            break;
        }
    }
    result
}

fn simplex_run(objective: &mut dyn SearchObjective, x0: &[f64], options: &NelderMeadOptions) -> LocalMinimum {
    const REFLECT: f64 = 1.0;
    const EXPAND: f64 = 2.0;
    const CONTRACT: f64 = 0.5;
    const SHRINK: f64 = 0.5;

    let dim = x0.len();
    let mut evaluations = 0;
    let mut eval = |objective: &mut dyn SearchObjective, x: &[f64]| {
        evaluations += 1;
        let f = objective.value(x);
        if f.is_nan() {
            PENALTY
        } else {
            f
        }
    };

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(x0.to_vec());
    for i in 0..dim {
        let mut vertex = x0.to_vec();
        vertex[i] = if vertex[i] != 0.0 {
            vertex[i] * (1.0 + options.initial_step)
        } else {
            0.00025
        };
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(objective, v)).collect();

    for _ in 0..options.max_iterations {
        if objective.exhausted() {
            break;
        }

        let mut order: Vec<usize> = (0..=dim).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(simplex[0].iter()).map(|(a, b)| (a - b).abs()))
            .fold(0.0_f64, f64::max);
        let f_spread = values[1..]
            .iter()
            .map(|f| (f - values[0]).abs())
            .fold(0.0_f64, f64::max);
        if x_spread <= options.xatol && f_spread <= options.fatol {
            break;
        }

        let centroid: Vec<f64> = (0..dim)
            .map(|k| simplex[..dim].iter().map(|v| v[k]).sum::<f64>() / dim as f64)
            .collect();
        let worst = simplex[dim].clone();
        let along = |t: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(worst.iter())
                .map(|(c, w)| c + t * (c - w))
                .collect()
        };

        let reflected = along(REFLECT);
        let f_reflected = eval(objective, &reflected);

        if f_reflected < values[0] {
            let expanded = along(EXPAND);
            let f_expanded = eval(objective, &expanded);
            if f_expanded < f_reflected {
                simplex[dim] = expanded;
                values[dim] = f_expanded;
            } else {
                simplex[dim] = reflected;
                values[dim] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[dim - 1] {
            simplex[dim] = reflected;
            values[dim] = f_reflected;
            continue;
        }

        let (contracted, f_contracted) = if f_reflected < values[dim] {
            let outside = along(CONTRACT);
            let f = eval(objective, &outside);
            (outside, f)
        } else {
            let inside = along(-CONTRACT);
            let f = eval(objective, &inside);
            (inside, f)
        };
        if f_contracted < values[dim].min(f_reflected) {
            simplex[dim] = contracted;
            values[dim] = f_contracted;
            continue;
        }

        let best = simplex[0].clone();
        for i in 1..=dim {
            simplex[i] = best
                .iter()
                .zip(simplex[i].iter())
                .map(|(b, v)| b + SHRINK * (v - b))
                .collect();
            values[i] = eval(objective, &simplex[i]);
        }
    }

    let best = (0..=dim)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);
    LocalMinimum {
        x: simplex[best].clone(),
        f: values[best],
        evaluations,
    }
}

/// Basin-hopping with Metropolis acceptance
///
/// Perturbations are multiplicative, `x * exp(u)` with `u` uniform on
/// `[-step_size, step_size]`, so positive parameters stay positive.
#[derive(Debug, Clone)]
pub struct BasinHopping {
    pub local: NelderMeadOptions,
    pub niter: usize,
    pub step_size: f64,
    pub temperature: f64,
    rng: StdRng,
}

impl BasinHopping {
    pub fn new(local: NelderMeadOptions, niter: usize, step_size: f64, temperature: f64, seed: u64) -> Self {
        Self {
            local,
            niter,
            step_size,
            temperature,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

fn log_uniform_step(rng: &mut StdRng, x: &[f64], step_size: f64) -> Vec<f64> {
    if !(step_size > 0.0) {
        return x.to_vec();
    }
    x.iter()
        .map(|v| v * rng.gen_range(-step_size..=step_size).exp())
        .collect()
}

impl SearchStrategy for BasinHopping {
    fn local_refine(&mut self, objective: &mut dyn SearchObjective, x0: &[f64]) -> LocalMinimum {
        nelder_mead(objective, x0, &self.local)
    }

    fn perturb(&mut self, x: &[f64]) -> Vec<f64> {
        log_uniform_step(&mut self.rng, x, self.step_size)
    }

    fn accept(&mut self, current: f64, candidate: f64) -> bool {
        if candidate <= current {
            return true;
        }
        if !(self.temperature > 0.0) {
            return false;
        }
        let probability = (-(candidate - current) / self.temperature).exp();
        self.rng.gen::<f64>() < probability
    }

    fn iterations(&self) -> usize {
        self.niter
    }
}

/// Basin-hopping that only moves to improving local minima
#[derive(Debug, Clone)]
pub struct MonotonicBasinHopping {
    pub local: NelderMeadOptions,
    pub niter: usize,
    pub step_size: f64,
    rng: StdRng,
}

impl MonotonicBasinHopping {
    pub fn new(local: NelderMeadOptions, niter: usize, step_size: f64, seed: u64) -> Self {
        Self {
            local,
            niter,
            step_size,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SearchStrategy for MonotonicBasinHopping {
    fn local_refine(&mut self, objective: &mut dyn SearchObjective, x0: &[f64]) -> LocalMinimum {
        nelder_mead(objective, x0, &self.local)
    }

    fn perturb(&mut self, x: &[f64]) -> Vec<f64> {
        log_uniform_step(&mut self.rng, x, self.step_size)
    }

    fn accept(&mut self, current: f64, candidate: f64) -> bool {
        candidate < current
    }

    fn iterations(&self) -> usize {
        self.niter
    }
}
