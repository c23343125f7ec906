//! Steady-state solver
//!
//! One solver covers baseline and reform solves, and both outer strategies:
//! a damped fixed-point iteration on (r, T_H, factor) and a direct Newton
//! root-find on the same conditions. Both end in the same finalization, so
//! the result record looks the same whichever strategy produced it.

use super::aggregates::{Aggregates, AggregationEngine};
use super::config::{SolveMode, SolverConfig, Strategy};
use super::constraints::{CheckInputs, ConstraintChecker};
use super::firm;
use super::prices::{convex_combo, relative_gap, PriceVector};
use super::result::{SolveStatus, SteadyStateSolution};
use crate::error::{ModelError, Result};
use crate::household::{CohortState, HouseholdProblem, HouseholdSolution, HouseholdSolver, WarmStartCache};
use crate::params::{ParameterSet, UtilityWeights};
use crate::penalty::{sanitize, PENALTY};
use crate::solver::{newton_solve, Termination};
use log::{debug, info, warn};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Starting point of a steady-state solve
#[derive(Debug, Clone)]
pub struct EquilibriumGuess {
    pub prices: PriceVector,
    /// S x J savings
    pub b: DMatrix<f64>,
    /// S x J labor supply
    pub n: DMatrix<f64>,
}

impl EquilibriumGuess {
    /// Default guess: the interest rate of a representative agent economy,
    /// no transfer, household default paths and the factor matching mean
    /// income at those paths
    pub fn new(params: &ParameterSet) -> Self {
        let (s, j) = (params.s(), params.j());
        let r = (params.sigma * params.g_y).exp() / params.beta - 1.0;
        let w = firm::wage_from_rate(r, params);

        let initial = CohortState::initial_guess(s, params.ltilde);
        let b = DMatrix::from_fn(s, j, |age, _| initial.b[age]);
        let n = DMatrix::from_fn(s, j, |age, _| initial.n[age]);

        let mean_income = AggregationEngine::new(params).mean_income(r, w, &b, &n);
        let factor = params.mean_income_data / mean_income;

        Self {
            prices: PriceVector { r, w, t_h: 0.0, factor },
            b,
            n,
        }
    }

    /// Re-seed from a previous solution
    pub fn from_solution(solution: &SteadyStateSolution) -> Self {
        Self {
            prices: solution.prices,
            b: solution.b.clone(),
            n: solution.n.clone(),
        }
    }

    fn warm_start(&self) -> WarmStartCache {
        let entries = (0..self.b.ncols())
            .map(|j| {
                CohortState::from_paths(
                    self.b.column(j).iter().copied().collect(),
                    self.n.column(j).iter().copied().collect(),
                )
            })
            .collect();
        WarmStartCache::new(entries)
    }
}

/// Halve the damping weight when the distance rose past the warm-up period
fn adjust_damping(nu: f64, iteration: usize, warmup: usize, previous: Option<f64>, distance: f64) -> f64 {
    match previous {
        Some(previous) if iteration > warmup && distance > previous => {
            warn!(
                "Distance rose from {:.3e} to {:.3e}; damping halved to {}",
                previous,
                distance,
                nu / 2.0
            );
            nu / 2.0
        }
        _ => nu,
    }
}

/// Household decisions and aggregates at one price vector
struct InnerEvaluation {
    prices: PriceVector,
    households: Vec<HouseholdSolution>,
    b: DMatrix<f64>,
    n: DMatrix<f64>,
    aggregates: Aggregates,
}

/// Where the outer loop stopped
struct OuterOutcome {
    status: SolveStatus,
    iterations: usize,
    distance: f64,
    history: Vec<f64>,
    last: InnerEvaluation,
}

/// Solves for the steady-state equilibrium at fixed utility weights
pub struct SteadyStateSolver<'a> {
    params: &'a ParameterSet,
    weights: &'a UtilityWeights,
    config: SolverConfig,
}

impl<'a> SteadyStateSolver<'a> {
    pub fn new(params: &'a ParameterSet, weights: &'a UtilityWeights, config: SolverConfig) -> Self {
        Self {
            params,
            weights,
            config,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve from `guess`
    ///
    /// Non-convergence is reported through the status and the `converged`
    /// flag. Only malformed inputs, or a resource-constraint violation in
    /// strict mode, produce an error.
    pub fn solve(&self, guess: &EquilibriumGuess) -> Result<SteadyStateSolution> {
        self.check_inputs(guess)?;

        let mut start = guess.prices;
        if let SolveMode::Reform { factor } = self.config.mode {
            start.factor = factor;
        }
        start.w = firm::wage_from_rate(start.r, self.params);

        info!(
            "Solving {} steady state with {:?}: S = {}, J = {}, r0 = {:.6}, factor0 = {:.4}",
            if self.config.mode.is_baseline() { "baseline" } else { "reform" },
            self.config.strategy,
            self.params.s(),
            self.params.j(),
            start.r,
            start.factor
        );

        let mut cache = guess.warm_start();
        let outcome = match self.config.strategy {
            Strategy::DampedFixedPoint => self.fixed_point(start, &mut cache),
            Strategy::RootFinding => self.root_find(start, &mut cache),
        };

        info!(
            "Outer loop finished: {:?} after {} iterations, distance {:.3e}, {} warm-start updates",
            outcome.status,
            outcome.iterations,
            outcome.distance,
            cache.updates()
        );
        self.finalize(outcome)
    }

    fn check_inputs(&self, guess: &EquilibriumGuess) -> Result<()> {
        let p = self.params;
        p.validate()?;
        self.weights.check_size(p.size)?;
        for (name, matrix) in [("guess b", &guess.b), ("guess n", &guess.n)] {
            if matrix.nrows() != p.s() {
                return Err(ModelError::dimension(name, p.s(), matrix.nrows()));
            }
            if matrix.ncols() != p.j() {
                return Err(ModelError::dimension(name, p.j(), matrix.ncols()));
            }
        }
        let nu = self.config.damping;
        if !(nu > 0.0 && nu < 1.0) {
            return Err(ModelError::invalid("damping", format!("must lie in (0, 1), found {}", nu)));
        }
        if let SolveMode::Reform { factor } = self.config.mode {
            if !(factor > 0.0 && factor.is_finite()) {
                return Err(ModelError::invalid("factor", "reform factor must be positive"));
            }
        }
        Ok(())
    }

    /// Solve every ability type at `prices`, then aggregate
    fn evaluate(&self, prices: PriceVector, cache: &mut WarmStartCache) -> InnerEvaluation {
        let p = self.params;
        let solver = HouseholdSolver::new(p, self.weights, self.config.household);
        let seeds: &WarmStartCache = cache;
        let solve_one = |j: usize| solver.solve(j, prices, seeds.get(j));

        let households: Vec<HouseholdSolution> = if self.config.parallel {
            (0..p.j()).into_par_iter().map(solve_one).collect()
        } else {
            (0..p.j()).map(solve_one).collect()
        };

        for household in &households {
            if !cache.record(household.ability, &household.cohort, household.converged) {
                warn!(
                    "Household solve for ability {} did not converge (max residual {:.3e}); keeping previous warm start",
                    household.ability,
                    household.max_euler_error()
                );
            }
        }

        let s = p.s();
        let b = matrix_from_columns(s, households.iter().map(|h| h.cohort.b.as_slice()));
        let n = matrix_from_columns(s, households.iter().map(|h| h.cohort.n.as_slice()));
        let aggregates = AggregationEngine::new(p).aggregate(&b, &n, &prices, self.config.mode);

        InnerEvaluation {
            prices,
            households,
            b,
            n,
            aggregates,
        }
    }

    /// Largest relative gap between proposed and current prices; the factor
    /// only counts when it is solved for
    fn distance(&self, proposed: &PriceVector, current: &PriceVector) -> f64 {
        let mut distance = relative_gap(proposed.r, current.r).max(relative_gap(proposed.t_h, current.t_h));
        if self.config.mode.is_baseline() {
            distance = distance.max(relative_gap(proposed.factor, current.factor));
        }
        distance
    }

    fn fixed_point(&self, start: PriceVector, cache: &mut WarmStartCache) -> OuterOutcome {
        let config = &self.config;
        let mut prices = start;
        let mut nu = config.damping;
        let mut history: Vec<f64> = Vec::new();

        let mut iteration = 0;
        loop {
            iteration += 1;
            let eval = self.evaluate(prices, cache);

            if !eval.aggregates.is_finite() {
                warn!("Non-finite aggregates at iteration {}; stopping", iteration);
                return OuterOutcome {
                    status: SolveStatus::Degenerate,
                    iterations: iteration,
                    distance: PENALTY,
                    history,
                    last: eval,
                };
            }

            let proposed = eval.aggregates.proposed_prices();
            let distance = self.distance(&proposed, &prices);
            debug!(
                "Iteration {}: distance {:.3e}, r {:.8}, T_H {:.8}, factor {:.4}, nu {}",
                iteration, distance, prices.r, prices.t_h, prices.factor, nu
            );

            if distance < config.tolerance {
                history.push(distance);
                return OuterOutcome {
                    status: SolveStatus::Converged,
                    iterations: iteration,
                    distance,
                    history,
                    last: eval,
                };
            }

            nu = adjust_damping(nu, iteration, config.warmup_iterations, history.last().copied(), distance);
            history.push(distance);

            if iteration >= config.max_iterations {
                return OuterOutcome {
                    status: SolveStatus::MaxIterExceeded,
                    iterations: iteration,
                    distance,
                    history,
                    last: eval,
                };
            }

            let r = convex_combo(proposed.r, prices.r, nu);
            let t_h = convex_combo(proposed.t_h, prices.t_h, nu);
            let factor = match config.mode {
                SolveMode::Baseline => convex_combo(proposed.factor, prices.factor, nu),
                SolveMode::Reform { factor } => factor,
            };
            prices = PriceVector::from_rate(r, t_h, factor, self.params);
        }
    }

    /// Residuals of the outer conditions at `x = [r, T_H(, factor)]`
    fn outer_residuals(&self, x: &[f64], fixed_factor: f64, cache: &mut WarmStartCache) -> (Vec<f64>, f64) {
        let baseline = self.config.mode.is_baseline();
        let factor = if baseline { x[2] } else { fixed_factor };
        if x.iter().any(|v| !v.is_finite()) || x[0] + self.params.delta <= 0.0 || !(factor > 0.0) {
            return (vec![PENALTY; x.len()], PENALTY);
        }

        let prices = PriceVector::from_rate(x[0], x[1], factor, self.params);
        let eval = self.evaluate(prices, cache);
        if !eval.aggregates.is_finite() {
            return (vec![PENALTY; x.len()], PENALTY);
        }

        let proposed = eval.aggregates.proposed_prices();
        let mut residuals = vec![sanitize(proposed.r - x[0]), sanitize(proposed.t_h - x[1])];
        if baseline {
            residuals.push(sanitize((proposed.factor - factor) / factor));
        }
        (residuals, self.distance(&proposed, &prices))
    }

    fn root_find(&self, start: PriceVector, cache: &mut WarmStartCache) -> OuterOutcome {
        let fixed_factor = start.factor;
        let x0 = if self.config.mode.is_baseline() {
            vec![start.r, start.t_h, start.factor]
        } else {
            vec![start.r, start.t_h]
        };

        let mut history = Vec::new();
        let outcome = newton_solve(
            |x| {
                let (residuals, distance) = self.outer_residuals(x, fixed_factor, cache);
                history.push(distance);
                residuals
            },
            &x0,
            &self.config.root_finding,
        );
        debug!(
            "Root finder ended with {:?} after {} iterations, max residual {:.3e}",
            outcome.termination,
            outcome.iterations,
            outcome.max_residual()
        );

        // One more inner pass at the root builds the record
        let x = &outcome.x;
        let factor = if self.config.mode.is_baseline() { x[2] } else { fixed_factor };
        let prices = PriceVector::from_rate(x[0], x[1], factor, self.params);
        let last = self.evaluate(prices, cache);

        let (status, distance) = if !last.aggregates.is_finite() {
            (SolveStatus::Degenerate, PENALTY)
        } else {
            let distance = self.distance(&last.aggregates.proposed_prices(), &prices);
            let solved = outcome.termination == Termination::ResidualTolerance || distance < self.config.tolerance;
            if solved {
                (SolveStatus::Converged, distance)
            } else {
                (SolveStatus::MaxIterExceeded, distance)
            }
        };

        OuterOutcome {
            status,
            iterations: outcome.iterations,
            distance,
            history,
            last,
        }
    }

    /// Build the result record and run the post-convergence checks
    fn finalize(&self, outcome: OuterOutcome) -> Result<SteadyStateSolution> {
        let p = self.params;
        let (s_len, j_len) = (p.s(), p.j());
        let OuterOutcome {
            status,
            iterations,
            distance,
            history,
            last,
        } = outcome;
        let prices = last.prices;
        let engine = AggregationEngine::new(p);

        let mut consumption = DMatrix::zeros(s_len, j_len);
        let mut utility = DMatrix::zeros(s_len, j_len);
        let mut income = DMatrix::zeros(s_len, j_len);
        let mut after_tax_income = DMatrix::zeros(s_len, j_len);
        let mut euler_savings = DMatrix::zeros(s_len, j_len);
        let mut euler_labor = DMatrix::zeros(s_len, j_len);

        for household in &last.households {
            let j = household.ability;
            let problem = HouseholdProblem::new(p, self.weights, prices, j);
            let cohort = &household.cohort;
            let budget = problem.budget(&cohort.b, &cohort.n);
            let period_utility = problem.utility(cohort);
            for s in 0..s_len {
                let earned = prices.r * budget.entering[s] + prices.w * p.e[(s, j)] * cohort.n[s];
                consumption[(s, j)] = budget.consumption[s];
                utility[(s, j)] = period_utility[s];
                income[(s, j)] = earned;
                after_tax_income[(s, j)] = earned + budget.bq - budget.taxes[s];
                euler_savings[(s, j)] = household.euler_savings[s];
                euler_labor[(s, j)] = household.euler_labor[s];
            }
        }

        let agg = &last.aggregates;
        let mut c = 0.0;
        for s in 0..s_len {
            for j in 0..j_len {
                c += p.omega[s] * p.lambdas[j] * consumption[(s, j)];
            }
        }
        let i = engine.investment(agg.k, &last.b);
        let resource_residual = agg.y - (c + i);

        if status == SolveStatus::Converged && !(resource_residual.abs() <= self.config.resource_tolerance) {
            warn!(
                "Resource constraint violated: Y - (C + I) = {:.3e} (tolerance {:.1e})",
                resource_residual, self.config.resource_tolerance
            );
            if self.config.strict {
                return Err(ModelError::ResourceConstraint {
                    residual: resource_residual,
                    tolerance: self.config.resource_tolerance,
                });
            }
        }

        let bq_per_capita = engine.bequests_per_capita(prices.r, &last.b);
        let warnings = ConstraintChecker::new(p)
            .with_floors(self.config.min_consumption, self.config.min_bequest)
            .check(&CheckInputs {
                k: agg.k,
                r: prices.r,
                w: prices.w,
                b: &last.b,
                n: &last.n,
                c: &consumption,
                bq_per_capita: &bq_per_capita,
            });

        let mut solution = SteadyStateSolution {
            status,
            mode: self.config.mode,
            strategy: self.config.strategy,
            iterations,
            distance,
            distance_history: history,
            prices,
            k: agg.k,
            l: agg.l,
            y: agg.y,
            c,
            i,
            bq: agg.bq.clone(),
            theta: agg.theta.clone(),
            b: last.b,
            n: last.n,
            consumption,
            utility,
            income,
            after_tax_income,
            euler_savings,
            euler_labor,
            resource_residual,
            warnings,
            converged: false,
        };
        solution.converged = status == SolveStatus::Converged
            && resource_residual.abs() <= self.config.resource_tolerance
            && solution.max_euler_error() <= self.config.euler_tolerance;

        if solution.converged {
            info!(
                "Steady state: r = {:.6}, w = {:.6}, K = {:.6}, L = {:.6}, Y = {:.6}",
                prices.r, prices.w, solution.k, solution.l, solution.y
            );
        } else {
            warn!(
                "Steady state not accepted: status {:?}, resource residual {:.3e}, max euler error {:.3e}",
                status,
                resource_residual,
                solution.max_euler_error()
            );
        }
        Ok(solution)
    }
}

/// Stack per-type columns of length `s` into an S x J matrix
fn matrix_from_columns<'h>(s: usize, columns: impl Iterator<Item = &'h [f64]>) -> DMatrix<f64> {
    let data: Vec<f64> = columns.flat_map(|column| column.iter().copied()).collect();
    let j = data.len() / s;
    DMatrix::from_vec(s, j, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equilibrium::ConstraintViolation;
    use crate::params::{ModelSize, TaxParams};

    fn economy(s: usize, j: usize) -> (ParameterSet, UtilityWeights) {
        let params = ParameterSet::illustrative(ModelSize::new(s, j));
        let weights = UtilityWeights::uniform(params.size, 0.8, 3.0);
        (params, weights)
    }

    fn solve_default(params: &ParameterSet, weights: &UtilityWeights, config: SolverConfig) -> SteadyStateSolution {
        SteadyStateSolver::new(params, weights, config)
            .solve(&EquilibriumGuess::new(params))
            .unwrap()
    }

    #[test]
    fn test_fixed_point_converges_with_clean_diagnostics() {
        let (params, weights) = economy(8, 2);
        let sol = solve_default(&params, &weights, SolverConfig::default());

        assert_eq!(sol.status, SolveStatus::Converged);
        assert!(sol.converged, "summary {:?}", sol.summary());
        assert!(sol.resource_residual.abs() < 1e-8, "RC residual {}", sol.resource_residual);
        assert!(sol.max_euler_error() < 1e-8);
        assert!(sol.k > 0.0 && sol.l > 0.0);
        assert!(sol.warnings.is_empty(), "{:?}", sol.warnings);
        assert_eq!(sol.distance_history.len(), sol.iterations);
    }

    #[test]
    fn test_untaxed_economy_matches_textbook_equilibrium() {
        let (mut params, weights) = economy(8, 1);
        params.tax = TaxParams::none(8, 1);
        let config = SolverConfig {
            tolerance: 1e-10,
            ..SolverConfig::default()
        };
        let sol = solve_default(&params, &weights, config);

        assert!(sol.converged);
        let r = sol.prices.r;
        assert!((params.alpha * sol.y / sol.k - params.delta - r).abs() < 1e-8 * r.abs().max(1.0));
        assert!((sol.prices.w - (1.0 - params.alpha) * sol.y / sol.l).abs() < 1e-8);
        assert_eq!(sol.prices.t_h, 0.0);
    }

    #[test]
    fn test_reseeding_from_solution_reconverges_immediately() {
        let (params, weights) = economy(6, 2);
        let config = SolverConfig {
            parallel: false,
            ..SolverConfig::default()
        };
        let solver = SteadyStateSolver::new(&params, &weights, config);
        let first = solver.solve(&EquilibriumGuess::new(&params)).unwrap();
        assert!(first.converged);

        let second = solver.solve(&EquilibriumGuess::from_solution(&first)).unwrap();
        assert!(second.converged);
        assert!(second.iterations <= 1, "took {} iterations", second.iterations);
        assert!(relative_gap(second.prices.r, first.prices.r) < 1e-8);
        assert!(relative_gap(second.prices.factor, first.prices.factor) < 1e-8);
        assert!((second.k - first.k).abs() < 1e-8 * first.k);
    }

    #[test]
    fn test_higher_labor_disutility_lowers_aggregate_labor() {
        let (params, weights) = economy(6, 2);
        let low = solve_default(&params, &weights, SolverConfig::default());
        let high = solve_default(&params, &weights.scale_labor(1.5), SolverConfig::default());
        assert!(low.converged && high.converged);
        assert!(high.l <= low.l, "L rose from {} to {}", low.l, high.l);
    }

    #[test]
    fn test_root_finding_agrees_with_fixed_point() {
        let (params, weights) = economy(6, 2);
        let damped = solve_default(&params, &weights, SolverConfig::default());
        assert!(damped.converged);

        let mut guess = EquilibriumGuess::from_solution(&damped);
        guess.prices.r *= 1.02;
        guess.prices.t_h *= 0.98;
        guess.prices.factor *= 1.02;
        let config = SolverConfig {
            strategy: Strategy::RootFinding,
            ..SolverConfig::default()
        };
        let root = SteadyStateSolver::new(&params, &weights, config).solve(&guess).unwrap();

        assert_eq!(root.strategy, Strategy::RootFinding);
        assert!(root.converged, "summary {:?}", root.summary());
        assert!(relative_gap(root.prices.r, damped.prices.r) < 1e-6);
        assert!(relative_gap(root.prices.factor, damped.prices.factor) < 1e-6);
        assert!((root.prices.t_h - damped.prices.t_h).abs() < 1e-7);
        assert!(root.resource_residual.abs() < 1e-8);
    }

    #[test]
    fn test_reform_holds_factor_fixed() {
        let (params, weights) = economy(6, 2);
        let baseline = solve_default(&params, &weights, SolverConfig::default());
        let factor = baseline.prices.factor * 1.1;

        let config = SolverConfig {
            mode: SolveMode::Reform { factor },
            ..SolverConfig::default()
        };
        let reform = SteadyStateSolver::new(&params, &weights, config)
            .solve(&EquilibriumGuess::from_solution(&baseline))
            .unwrap();
        assert_eq!(reform.status, SolveStatus::Converged);
        assert_eq!(reform.prices.factor, factor);
        assert!(matches!(reform.mode, SolveMode::Reform { .. }));
    }

    #[test]
    fn test_strict_mode_escalates_resource_violation() {
        let (mut params, weights) = economy(6, 1);
        // non-stationary population weights break the resource identity
        params.omega[0] += 0.01;
        params.omega[1] -= 0.01;

        let lenient = solve_default(&params, &weights, SolverConfig::default());
        assert_eq!(lenient.status, SolveStatus::Converged);
        assert!(lenient.resource_residual.abs() > 1e-8);
        assert!(!lenient.converged);

        let strict = SolverConfig {
            strict: true,
            ..SolverConfig::default()
        };
        let result = SteadyStateSolver::new(&params, &weights, strict).solve(&EquilibriumGuess::new(&params));
        assert!(matches!(result, Err(ModelError::ResourceConstraint { .. })));
    }

    #[test]
    fn test_rejects_bad_damping() {
        let (params, weights) = economy(4, 1);
        let config = SolverConfig {
            damping: 1.5,
            ..SolverConfig::default()
        };
        let result = SteadyStateSolver::new(&params, &weights, config).solve(&EquilibriumGuess::new(&params));
        assert!(matches!(result, Err(ModelError::InvalidParameter { .. })));
    }

    #[test]
    fn test_damping_halves_only_after_warmup() {
        // rising distance inside the warm-up keeps nu
        assert_eq!(adjust_damping(0.4, 3, 10, Some(1e-3), 2e-3), 0.4);
        // falling distance after the warm-up keeps nu
        assert_eq!(adjust_damping(0.4, 12, 10, Some(2e-3), 1e-3), 0.4);
        // no previous distance on the first iteration
        assert_eq!(adjust_damping(0.4, 12, 10, None, 1e-3), 0.4);
        assert_eq!(adjust_damping(0.4, 12, 10, Some(1e-3), 2e-3), 0.2);
        assert_eq!(adjust_damping(0.2, 13, 10, Some(2e-3), 3e-3), 0.1);
    }

    #[test]
    fn test_iteration_budget_ends_in_max_iter_exceeded() {
        let (params, weights) = economy(6, 2);
        let config = SolverConfig {
            max_iterations: 2,
            ..SolverConfig::default()
        };
        let sol = solve_default(&params, &weights, config);

        assert_eq!(sol.status, SolveStatus::MaxIterExceeded);
        assert!(!sol.converged);
        assert_eq!(sol.iterations, 2);
        assert_eq!(sol.distance_history.len(), 2);
        assert!(sol.distance >= 1e-9);
    }

    #[test]
    fn test_consumption_floor_from_config_reaches_checker() {
        let (params, weights) = economy(6, 2);
        let config = SolverConfig {
            min_consumption: 1e3,
            ..SolverConfig::default()
        };
        let sol = solve_default(&params, &weights, config);
        assert_eq!(sol.status, SolveStatus::Converged);
        assert!(sol
            .warnings
            .iter()
            .any(|v| matches!(v, ConstraintViolation::Borrowing { .. })));
    }

    #[test]
    fn test_rejects_short_mortality_profile() {
        let (mut params, weights) = economy(4, 1);
        let guess = EquilibriumGuess::new(&params);
        params.rho.pop();

        let result = SteadyStateSolver::new(&params, &weights, SolverConfig::default()).solve(&guess);
        assert!(matches!(result, Err(ModelError::DimensionMismatch { .. })), "{:?}", result.map(|s| s.status));
    }
}
