//! Model fitting command

use crate::FitArgs;
use anyhow::{Context, Result, anyhow, bail};
use mpp_model::{FitOptions, FitTuning, Mpp, PcsEncoding, Quality};
use std::path::Path;
use tracing::info;

/// Reads a tuning override file. Missing keys keep their defaults.
fn load_tuning(path: &Path) -> Result<FitTuning> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tuning: {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("Bad tuning file: {}", path.display()))
}

pub fn run(args: FitArgs, verbose: u8) -> Result<()> {
    let m = super::load_measurements(&args.input)?;
    if args.spectral && m.spectral.is_none() {
        bail!("{} carries no spectral data", args.input.display());
    }

    let quality = Quality::from_level(args.quality)
        .ok_or_else(|| anyhow!("quality must be 0..=3, got {}", args.quality))?;
    let mut opts = FitOptions::with_quality(quality);
    opts.verbose = verbose > 0;
    opts.limit = args.limit.map(|l| l / 100.0);
    opts.shape = !args.no_shape;
    opts.spectral = if args.spectral { m.spectral } else { None };
    opts.instrument = m.instrument;
    opts.early_exit = args.early_exit;
    if let Some(path) = &args.tuning {
        opts.tuning = load_tuning(path)?;
    }

    info!(input = %args.input.display(), inks = %m.mask, %quality, "fitting");
    let mpp = Mpp::create(m.mask, &m.samples, &opts).context("Fit failed")?;

    let enc = if args.lab { PcsEncoding::Lab } else { PcsEncoding::Xyz };
    mpp.write_mpp(&args.output, enc)
        .with_context(|| format!("Failed to write: {}", args.output.display()))?;

    let report = mpp.fit_report(&m.samples)?;
    println!("{}: {report}", args.output.display());
    Ok(())
}
