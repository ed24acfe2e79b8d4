//! Command line driver.
//!
//! Runs the selected oracle against in-memory SQLite databases, or prints
//! generated statements without executing them.

use std::io::{IsTerminal, stdin};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use rand::RngCore;
use stonedb_fuzzer::provider::generate_script;
use stonedb_fuzzer::{
    Context, ErrorCatalog, OracleKind, Options, Runner, RunnerConfig, SqliteSession,
};

/// Random SQL generator with NoREC and query-partitioning oracles.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Random seed; worker `i` uses `seed + i`.
    #[arg(short, long, default_value_t = rand::rng().next_u64())]
    seed: u64,

    /// Number of worker threads.
    #[arg(long, default_value_t = 1)]
    num_threads: usize,

    /// Databases generated per worker.
    #[arg(long, default_value_t = 100)]
    num_tries: usize,

    /// Oracle checks per database.
    #[arg(long, default_value_t = 1000)]
    num_queries: usize,

    /// Oracle to run.
    #[arg(short, long, value_enum, default_value_t = OracleKind::NoRec)]
    oracle: OracleKind,

    /// JSON file with generator options.
    #[arg(long)]
    options: Option<PathBuf>,

    /// JSON file with additional expected error substrings per group.
    #[arg(long)]
    errors: Option<PathBuf>,

    /// Override the maximum expression depth.
    #[arg(long)]
    max_expression_depth: Option<usize>,

    /// Write a JSON report of the run to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print generated statements without executing them.
    Generate {
        /// Statements to print after the CREATE TABLE statements.
        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,
    },
}

fn load_options(path: Option<&Path>, default: Options, depth: Option<usize>) -> Result<Options> {
    let options = match path {
        Some(path) => Options::from_json_file(path)
            .with_context(|| format!("failed to load options from {}", path.display()))?,
        None => default,
    };
    let options = match depth {
        Some(depth) => options.with_max_expression_depth(depth),
        None => options,
    };
    options.check()?;
    Ok(options)
}

fn load_catalog(base: ErrorCatalog, path: Option<&Path>) -> Result<ErrorCatalog> {
    match path {
        Some(path) => {
            let extra = ErrorCatalog::from_json_file(path)
                .with_context(|| format!("failed to load errors from {}", path.display()))?;
            Ok(base.merged(extra))
        }
        None => Ok(base),
    }
}

fn main() -> Result<()> {
    let mut subscriber = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into()),
    );
    if !stdin().is_terminal() {
        subscriber = subscriber.with_ansi(false)
    }
    subscriber.init();

    let args = Args::parse();

    if let Some(Commands::Generate { count }) = args.command {
        let options = load_options(
            args.options.as_deref(),
            Options::default(),
            args.max_expression_depth,
        )?;
        let catalog = load_catalog(ErrorCatalog::default(), args.errors.as_deref())?;
        let mut ctx = Context::new_with_seed(args.seed);
        println!("-- seed {}", args.seed);
        for stmt in generate_script(&mut ctx, &options, &catalog, count) {
            println!("{stmt};");
        }
        return Ok(());
    }

    let options = load_options(
        args.options.as_deref(),
        Options::sqlite_compatible(),
        args.max_expression_depth,
    )?;
    let catalog = load_catalog(ErrorCatalog::with_sqlite(), args.errors.as_deref())?;
    let timeout = Duration::from_millis(options.statement_timeout_ms);
    let config = RunnerConfig {
        seed: args.seed,
        num_threads: args.num_threads,
        num_tries: args.num_tries,
        num_queries: args.num_queries,
        oracle: args.oracle,
        options,
        catalog,
    };
    tracing::info!(
        "running {} with seed {} on {} threads",
        config.oracle,
        config.seed,
        config.num_threads
    );

    let runner = Runner::new(config);
    let report = runner.run(|_| SqliteSession::open_in_memory(timeout))?;
    println!("\n{}", report.stats.to_table(runner.config()));

    for failure in &report.failures {
        tracing::error!(
            "worker {} (seed {}), database {}: {}",
            failure.worker,
            failure.seed,
            failure.database,
            failure.message
        );
    }
    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        tracing::info!("report written to {}", path.display());
    }

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
