//! mpp - fit and query model printer profiles

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mpp")]
#[command(author, version, about = "Fit and query model printer profiles")]
#[command(long_about = "
Builds compact analytic models of printers and displays from measurement
files, and answers colour queries against them.

Examples:
  mpp fit chart.ti3 -o printer.mpp -q 2 -l 300
  mpp fit chart.ti3 -o printer.mpp --spectral --tuning tuning.yaml
  mpp lookup printer.mpp 100 0 0 0 --lab
  mpp info printer.mpp
  mpp gamut printer.mpp -o surface.txt -d 5
  mpp verify printer.mpp check.ti3
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a model to a measurement file
    Fit(FitArgs),

    /// Convert device values through a model
    #[command(visible_alias = "l")]
    Lookup(LookupArgs),

    /// Show a model's configuration and white/black points
    #[command(visible_alias = "i")]
    Info(InfoArgs),

    /// Write the gamut surface of a model
    Gamut(GamutArgs),

    /// Compare a model against measurements
    Verify(VerifyArgs),
}

#[derive(Args)]
struct FitArgs {
    /// Measurement file (CGATS, CTI3 style)
    input: PathBuf,

    /// Output model
    #[arg(short, long)]
    output: PathBuf,

    /// Quality level: 0 low, 1 medium, 2 high, 3 ultra
    #[arg(short, long, default_value = "1")]
    quality: u8,

    /// Total ink limit in percent
    #[arg(short, long)]
    limit: Option<f64>,

    /// Skip the ink interaction (shape) parameters
    #[arg(long)]
    no_shape: bool,

    /// Fit spectral bands as well (measurements must carry spectra)
    #[arg(long)]
    spectral: bool,

    /// Write primary combinations as Lab
    #[arg(long)]
    lab: bool,

    /// YAML file overriding fit tuning constants
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Stop a band once a pass improves its error by less than this fraction
    #[arg(long)]
    early_exit: Option<f64>,
}

#[derive(Args)]
struct LookupArgs {
    /// Model file
    model: PathBuf,

    /// Device values in percent, one per channel
    #[arg(required = true, allow_negative_numbers = true)]
    values: Vec<f64>,

    /// Print Lab instead of XYZ
    #[arg(long)]
    lab: bool,

    /// Print the modelled spectrum
    #[arg(long)]
    spectral: bool,

    /// Integrate the spectrum under this illuminant (D50, A, E)
    #[arg(long)]
    illuminant: Option<String>,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,
}

#[derive(Args)]
struct GamutArgs {
    /// Model file
    model: PathBuf,

    /// Output surface file (CGATS)
    #[arg(short, long)]
    output: PathBuf,

    /// Surface sampling detail; smaller is finer
    #[arg(short, long, default_value = "10")]
    detail: f64,
}

#[derive(Args)]
struct VerifyArgs {
    /// Model file
    model: PathBuf,

    /// Measurement file
    input: PathBuf,
}

/// Installs the log subscriber. `RUST_LOG` overrides the `-v` level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Fit(args) => commands::fit::run(args, cli.verbose),
        Commands::Lookup(args) => commands::lookup::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Gamut(args) => commands::gamut::run(args, cli.verbose),
        Commands::Verify(args) => commands::verify::run(args),
    }
}
