use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use spmxv::{
    run_spmv, BenchConfig, ErrorCheck, Format, GeneratorConfig, MatrixGenerator, MatrixMarketIO,
    PerformanceSummary, DEFAULT_CHUNK_SIZE, DEFAULT_REPETITIONS, DEFAULT_TOLERANCE,
};

/// Sparse matrix-vector multiplication benchmark (CSR / ELLPACK)
#[derive(Debug, Parser)]
#[command(name = "spmxv", version)]
#[command(about = "Times y = A·x for a sparse matrix in CSR or ELLPACK layout", long_about = None)]
struct Cli {
    /// Storage format (csr or ellpack)
    #[arg(short, long, default_value = "csr")]
    format: String,

    /// Number of worker threads (defaults to the number of CPUs)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Number of timed repetitions
    #[arg(short, long, default_value_t = DEFAULT_REPETITIONS)]
    repetitions: usize,

    /// Rows per statically scheduled chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Matrix Market file to load
    #[arg(short, long, value_name = "FILE", conflicts_with = "generate")]
    matrix: Option<PathBuf>,

    /// Generate a banded matrix with this many rows instead of loading one
    #[arg(short, long, value_name = "ROWS")]
    generate: Option<usize>,

    /// Entries per row of a generated matrix
    #[arg(long, default_value_t = 7)]
    row_width: usize,

    /// Widen every n-th generated row
    #[arg(long, value_name = "N")]
    skew_every: Option<usize>,

    /// Entries per widened row
    #[arg(long, default_value_t = 100)]
    skew_width: usize,

    /// Seed for the generated matrix and the random x
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let format: Format = cli.format.parse()?;
    let config = BenchConfig {
        format,
        n_threads: cli.threads.unwrap_or_else(num_cpus::get),
        repetitions: cli.repetitions,
        chunk_size: cli.chunk_size,
    };
    config.validate()?;

    let mut generator = MatrixGenerator::new(cli.seed);
    let mut input = match (&cli.matrix, cli.generate) {
        (Some(path), _) => MatrixMarketIO::read_matrix(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        (None, Some(n_rows)) => {
            let mut shape = GeneratorConfig::banded(n_rows, cli.row_width);
            if let Some(every) = cli.skew_every {
                shape = shape.with_skew(every, cli.skew_width);
            }
            generator.generate(&shape)?
        }
        (None, None) => bail!("either --matrix <FILE> or --generate <ROWS> is required"),
    };
    let rhs = generator.random_rhs(input.n_rows);
    input.set_rhs(rhs)?;
    info!("loaded matrix and random RHS");

    println!("Using {} format", config.format);
    let run = run_spmv(&input, &config)?;

    let check = ErrorCheck::compute(&input, &run.y, DEFAULT_TOLERANCE);
    println!("{}", check);
    if !check.passed() {
        bail!(
            "result check failed: max relative error {:.3e} exceeds {:.1e}",
            check.max_rel_error,
            check.tolerance
        );
    }

    let summary = PerformanceSummary::from_timings(&run.timings, input.nnz(), config.n_threads);
    println!("{}", summary);
    if summary.repetitions > 1 && summary.max_seconds > 10.0 * summary.min_seconds {
        warn!("repetition times vary by more than 10x; the machine may be busy");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err, &mut std::io::stderr());
            ExitCode::FAILURE
        }
    }
}

/// Logs the fatal error and writes it with its cause chain to `out`, which
/// stays visible when logging is filtered out
fn report_failure(err: &anyhow::Error, out: &mut impl Write) {
    error!("{:#}", err);
    let _ = writeln!(out, "error: {:#}", err);
}
