//! OLG Equilibrium CLI
//!
//! Solves a steady state or calibrates the utility weights and writes the
//! result as JSON

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use olg_equilibrium::calibration::{SearchKind, SearchSettings};
use olg_equilibrium::{
    CalibrationConfig, Calibrator, ModelSize, MomentSpec, Moments, ParameterSet, ScenarioRunner, SolverConfig,
    SteadyStateSolution, Strategy, UtilityWeights, WeightingMatrix,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "olg", version, about = "OLG steady-state solver and calibration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solve the baseline steady state, optionally followed by a reform
    Solve(SolveArgs),
    /// Calibrate chi_b and chi_n against data moments
    Calibrate(CalibrateArgs),
}

/// Where the parameters come from
#[derive(Debug, Parser, Clone)]
struct ModelArgs {
    /// Parameter set JSON; the illustrative parameterization is used if absent
    #[arg(long)]
    params: Option<PathBuf>,

    /// Directory with omega/rho/imm_rates/lambdas/e CSV files (e.g. data/params)
    #[arg(long)]
    arrays: Option<PathBuf>,

    /// Ages for the illustrative parameterization
    #[arg(short = 's', long, default_value_t = 80)]
    ages: usize,

    /// Ability types for the illustrative parameterization
    #[arg(short = 'j', long, default_value_t = 7)]
    abilities: usize,

    /// Utility weights JSON ({"chi_b": [...], "chi_n": [...]})
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Uniform bequest weight when no weights file is given
    #[arg(long, default_value_t = 1.0)]
    chi_b: f64,

    /// Uniform labor weight when no weights file is given
    #[arg(long, default_value_t = 2.0)]
    chi_n: f64,

    /// Solve ability types sequentially
    #[arg(long)]
    sequential: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Damped,
    Root,
}

#[derive(Debug, Parser)]
struct SolveArgs {
    #[command(flatten)]
    model: ModelArgs,

    #[arg(long, value_enum, default_value_t = StrategyArg::Damped)]
    strategy: StrategyArg,

    /// Treat a resource-constraint violation as an error
    #[arg(long)]
    strict: bool,

    /// Reform parameter set JSON, solved with the baseline factor held fixed
    #[arg(long)]
    reform: Option<PathBuf>,

    /// Output JSON path
    #[arg(short = 'o', long, default_value = "steady_state.json")]
    output: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SearchArg {
    Basin,
    Monotonic,
}

#[derive(Debug, Parser)]
struct CalibrateArgs {
    #[command(flatten)]
    model: ModelArgs,

    /// Single-column CSV of data moments: wealth by ability and age band, then labor by age
    #[arg(long)]
    moments: PathBuf,

    /// Square CSV moment covariance; identity weighting if absent
    #[arg(long)]
    covariance: Option<PathBuf>,

    /// Wealth age bands
    #[arg(long, default_value_t = 4)]
    bands: usize,

    /// Basin-hopping iterations
    #[arg(long, default_value_t = 20)]
    niter: usize,

    #[arg(long, value_enum, default_value_t = SearchArg::Basin)]
    search: SearchArg,

    #[arg(long, default_value_t = 2016)]
    seed: u64,

    #[arg(long, default_value_t = 10_000)]
    max_evaluations: usize,

    #[arg(short = 'o', long, default_value = "calibration.json")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Solve(args) => solve(args),
        Command::Calibrate(args) => calibrate(args),
    }
}

fn load_params(args: &ModelArgs) -> Result<ParameterSet> {
    let params = match &args.params {
        Some(path) => ParameterSet::from_json_path(path)
            .with_context(|| format!("Failed to load parameters from {}", path.display()))?,
        None => ParameterSet::illustrative(ModelSize::new(args.ages, args.abilities)),
    };
    let params = match &args.arrays {
        Some(dir) => params
            .with_arrays_from_csv(dir)
            .with_context(|| format!("Failed to load arrays from {}", dir.display()))?,
        None => params,
    };
    params.validate().context("Invalid parameter set")?;
    Ok(params)
}

fn load_weights(args: &ModelArgs, params: &ParameterSet) -> Result<UtilityWeights> {
    let weights = match &args.weights {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            let weights: UtilityWeights = serde_json::from_reader(std::io::BufReader::new(file))
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            UtilityWeights::new(weights.chi_b, weights.chi_n)?
        }
        None => UtilityWeights::new(vec![args.chi_b; params.j()], vec![args.chi_n; params.s()])?,
    };
    weights.check_size(params.size)?;
    Ok(weights)
}

fn solver_config(model: &ModelArgs) -> SolverConfig {
    SolverConfig {
        parallel: !model.sequential,
        ..SolverConfig::default()
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_solution(label: &str, solution: &SteadyStateSolution) {
    let s = solution.summary();
    println!("{} steady state ({:?}, {} iterations)", label, s.status, s.iterations);
    println!("{}", "-".repeat(48));
    println!("  {:<22} {:>20.8}", "r", s.r);
    println!("  {:<22} {:>20.8}", "w", s.w);
    println!("  {:<22} {:>20.8}", "T_H", s.t_h);
    println!("  {:<22} {:>20.2}", "factor", s.factor);
    println!("  {:<22} {:>20.8}", "K", s.k);
    println!("  {:<22} {:>20.8}", "L", s.l);
    println!("  {:<22} {:>20.8}", "Y", s.y);
    println!("  {:<22} {:>20.8}", "C", s.c);
    println!("  {:<22} {:>20.8}", "I", s.i);
    println!("  {:<22} {:>20.8}", "K/Y", s.capital_output_ratio);
    println!("  {:<22} {:>20.3e}", "Y - (C + I)", s.resource_residual);
    println!("  {:<22} {:>20.3e}", "max Euler error", s.max_euler_error);
    println!("  {:<22} {:>20}", "constraint warnings", s.warnings);
    println!("  {:<22} {:>20}", "converged", s.converged);
    println!();
}

#[derive(Serialize)]
struct SolveOutput {
    baseline: SteadyStateSolution,
    reform: Option<SteadyStateSolution>,
}

fn solve(args: SolveArgs) -> Result<()> {
    let params = load_params(&args.model)?;
    let weights = load_weights(&args.model, &params)?;
    let config = SolverConfig {
        strategy: match args.strategy {
            StrategyArg::Damped => Strategy::DampedFixedPoint,
            StrategyArg::Root => Strategy::RootFinding,
        },
        strict: args.strict,
        ..solver_config(&args.model)
    };

    let runner = ScenarioRunner::with_config(params, weights, config);
    let baseline = runner.run_baseline().context("Baseline solve failed")?;
    print_solution("Baseline", &baseline);

    let reform = match &args.reform {
        Some(path) => {
            let reform_params = ParameterSet::from_json_path(path)
                .with_context(|| format!("Failed to load reform parameters from {}", path.display()))?;
            let solution = runner.run_reform(&reform_params, &baseline).context("Reform solve failed")?;
            print_solution("Reform", &solution);
            Some(solution)
        }
        None => None,
    };

    write_json(&args.output, &SolveOutput { baseline, reform })
}

fn calibrate(args: CalibrateArgs) -> Result<()> {
    let params = load_params(&args.model)?;
    let initial = load_weights(&args.model, &params)?;

    let mut config = CalibrationConfig::new(params.s());
    config.moment_spec = MomentSpec::even_bands(params.s(), args.bands);
    config.solver = solver_config(&args.model);
    config.max_evaluations = args.max_evaluations;
    config.search = SearchSettings {
        kind: match args.search {
            SearchArg::Basin => SearchKind::BasinHopping,
            SearchArg::Monotonic => SearchKind::MonotonicBasinHopping,
        },
        niter: args.niter,
        seed: args.seed,
        ..SearchSettings::default()
    };

    let data = Moments::from_csv(&args.moments, &config.moment_spec, params.s(), params.j())
        .with_context(|| format!("Failed to load moments from {}", args.moments.display()))?;
    if let Some(path) = &args.covariance {
        let covariance = olg_equilibrium::params::loader::load_square_matrix(path)
            .with_context(|| format!("Failed to load covariance from {}", path.display()))?;
        config.weighting = WeightingMatrix::inverse_covariance(&covariance)?;
    }

    let calibrator = Calibrator::new(&params, data, config)?;
    let result = calibrator.run(&initial)?;

    println!("Calibration: {} evaluations, {} hops ({} accepted)", result.evaluations.len(), result.hops, result.accepted);
    println!("  distance {:.6e}", result.distance);
    println!("  chi_b {:?}", result.weights.chi_b);
    println!("  chi_n {:?}", result.weights.chi_n);
    match &result.solution {
        Some(solution) => print_solution("Calibrated", solution),
        None => bail!("No candidate produced a converged steady state"),
    }

    write_json(&args.output, &result)
}
