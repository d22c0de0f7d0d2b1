use std::fs::read_to_string;
use std::path::PathBuf;

use clap::Parser;
use fairdist::{DistributeOptions, Problem, backend_by_name, default_backend};
use tracing_subscriber::EnvFilter;

/// Fairly distribute objects among targets described in a YAML file.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Problem document with `targets`, `objects` and `weights`.
    input: PathBuf,

    /// Write the model in LP format to this path before solving.
    #[arg(long)]
    lp: Option<PathBuf>,

    /// Only minimise total weight.
    #[arg(long)]
    no_fairness: bool,

    /// Include per-phase timings in the output.
    #[arg(long)]
    timings: bool,

    /// Solver backend (`microlp` or `coin_cbc`, when compiled in).
    #[arg(long)]
    backend: Option<String>,

    /// Log level; RUST_LOG takes precedence.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let buf = read_to_string(&args.input)?;
    let mut problem: Problem = serde_yaml::from_str(&buf)?;
    if args.no_fairness {
        problem.fairness = false;
    }

    let mut backend = match &args.backend {
        Some(name) => backend_by_name(name).ok_or_else(|| format!("unknown solver backend `{name}`"))?,
        None => default_backend(),
    };

    let mut options = DistributeOptions::new();
    options.output = args.lp;

    let mut solution = problem.solve_with(&options, &mut backend)?;
    if !args.timings {
        solution.timings = None;
    }

    println!("{}", serde_yaml::to_string(&solution)?);
    Ok(())
}
