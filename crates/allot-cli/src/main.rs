#![forbid(unsafe_code)]

mod config;

use allot_core::lock::ExperimentLock;
use allot_core::{BlobStore, Experiment, ExperimentError, FsStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Base path for experiments inside the store root.
const EXPERIMENTS_BASE: &str = "experiments";

const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "allot: partition an annotation corpus and allocate units to workers",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Store root directory.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Experiment name.
    #[arg(short, long)]
    experiment: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Start an experiment",
        long_about = "Partition the items file into units and write the labeling-tool config. \
                      The unit set is immutable afterwards."
    )]
    Start {
        /// Launch configuration (TOML).
        #[arg(long)]
        config: PathBuf,

        /// Items file, one JSON object per line: {"id": ..., "text": ...}.
        #[arg(long)]
        items: PathBuf,
    },

    #[command(about = "Register a worker and seed its first allocation")]
    AddWorker {
        /// Worker id.
        id: String,

        /// Worker credential, stored apart from allocation metadata.
        #[arg(long)]
        credential: String,
    },

    #[command(
        about = "Allocate the next unit to a worker",
        long_about = "Allocate the next unit to a worker and print the destination path. \
                      Exits with status 2 once the worker has received every unit."
    )]
    Allocate {
        /// Worker id.
        worker: String,
    },

    #[command(about = "Show units, workers, and allocation histories")]
    Status,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn report(err: &anyhow::Error) -> ExitCode {
    if let Some(exp_err) = err.downcast_ref::<ExperimentError>() {
        eprintln!("{}: {exp_err}", exp_err.code());
        if let Some(hint) = exp_err.hint() {
            eprintln!("hint: {hint}");
        }
        // "No work left" is an expected end state, not a failure.
        if matches!(exp_err, ExperimentError::Exhausted(_)) {
            return ExitCode::from(2);
        }
        return ExitCode::FAILURE;
    }
    eprintln!("error: {err:#}");
    ExitCode::FAILURE
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let store = Arc::new(FsStore::new(&cli.root));
    let experiment = Experiment::new(
        Arc::clone(&store) as Arc<dyn BlobStore>,
        EXPERIMENTS_BASE,
        &cli.experiment,
    );

    match &cli.command {
        Commands::Start { config, items } => {
            let _lock = acquire_lock(cli)?;
            let launch = config::load_launch_config(config)?;
            let items = config::read_items(items)?;
            info!(items = items.len(), "loaded item corpus");
            experiment.start(
                &launch.sample_source,
                &launch.sample_name,
                &items,
                &launch.entities(),
                &launch.options(),
            )?;
            println!(
                "started `{}`: {} units at {}",
                experiment.name(),
                experiment.units()?.len(),
                experiment.experiment_path()
            );
        }
        Commands::AddWorker { id, credential } => {
            let _lock = acquire_lock(cli)?;
            let dest = experiment.register_worker(id, credential)?;
            println!("{dest}");
        }
        Commands::Allocate { worker } => {
            let _lock = acquire_lock(cli)?;
            let dest = experiment.allocate_next(worker)?;
            println!("{dest}");
        }
        Commands::Status => {
            let units = experiment.units()?;
            println!("experiment: {}", experiment.name());
            println!("units: {}", units.len());
            for worker in experiment.workers()? {
                let history = experiment.allocations(&worker)?;
                println!("worker {worker}: {}", history.join(" "));
            }
        }
    }
    Ok(())
}

/// Cross-process serialization for mutating commands; the facade's own
/// mutex only covers one process.
fn acquire_lock(cli: &Cli) -> Result<ExperimentLock> {
    let path = cli.root.join(format!("{}.lock", cli.experiment));
    ExperimentLock::acquire(&path, LOCK_TIMEOUT)
        .with_context(|| format!("Failed to lock experiment `{}`", cli.experiment))
}
