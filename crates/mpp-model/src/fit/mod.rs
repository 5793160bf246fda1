//! Fitting pipeline.
//!
//! Bands are fitted one at a time, in an order where each band can start
//! from a neighbour that was fitted before it:
//!
//! - spectral models start at the band nearest 555 nm, walk up to the
//!   longest wavelength, then down from the start to the shortest; the
//!   X, Y and Z bands come last, started from the spectral bands nearest
//!   600, 555 and 445 nm
//! - colorimetric models fit Y first, then X and Z started from Y
//!
//! Every band then runs a fixed number of passes. Each pass optimizes the
//! transfer curves, the shape parameters (if any) and the primary
//! combinations in turn, tightening the minimizer tolerance as it goes.

mod init;
mod objective;

use crate::options::FitOptions;
use crate::params::{BandParams, Layout, MppParts, XYZ_BANDS, check_bands, check_inks};
use crate::{MppResult, Sample};
use init::{initial_bands, prepare_points};
use mpp_color::{InkMask, SpectralShape, lde};
use objective::{BandProblem, Stage};
use tracing::{debug, info, warn};

/// Fits all model parameters to `samples`.
pub(crate) fn fit(mask: InkMask, samples: &[Sample], opts: &FitOptions) -> MppResult<MppParts> {
    let n = check_inks(mask.count())?;
    let spec_n = match &opts.spectral {
        Some(s) => check_bands(s.bands)?,
        None => 0,
    };
    let layout = Layout::new(n, opts.quality.transfer_order(), opts.shape);
    let passes = opts.quality.passes();
    info!(
        inks = %mask,
        samples = samples.len(),
        bands = XYZ_BANDS + spec_n,
        quality = %opts.quality,
        "fitting model"
    );

    let points = prepare_points(samples, n, spec_n)?;
    let mut bands = initial_bands(&layout, &points, mask.is_additive(), &opts.tuning);
    let anchors: Vec<Vec<f64>> = bands
        .iter()
        .map(|bp| bp.pc.iter().map(|&v| lde(v)).collect())
        .collect();

    for (band, source) in band_order(opts.spectral.as_ref()) {
        let prob = BandProblem::new(&layout, &points, band, &opts.tuning, &anchors[band]);
        let src = source.map(|s| bands[s].clone());
        let err = fit_band(&prob, &mut bands[band], src.as_ref(), opts, passes)?;
        debug!(band, error = err, "band fitted");
    }

    Ok(MppParts {
        mask,
        limit: opts.limit,
        cord: layout.cord,
        shaped: layout.shaped,
        spectral: opts.spectral,
        instrument: opts.instrument.clone(),
        created: None,
        bands,
    })
}

/// Bands in fitting order, each with the band it is warm started from.
pub(crate) fn band_order(spectral: Option<&SpectralShape>) -> Vec<(usize, Option<usize>)> {
    let Some(shape) = spectral else {
        return vec![(1, None), (0, Some(1)), (2, Some(1))];
    };
    let sb = |i: usize| XYZ_BANDS + i;
    let start = shape.index_nearest(555.0);

    let mut order = vec![(sb(start), None)];
    order.extend((start + 1..shape.bands).map(|i| (sb(i), Some(sb(i - 1)))));
    order.extend((0..start).rev().map(|i| (sb(i), Some(sb(i + 1)))));
    order.push((1, Some(sb(shape.index_nearest(555.0)))));
    order.push((0, Some(sb(shape.index_nearest(600.0)))));
    order.push((2, Some(sb(shape.index_nearest(445.0)))));
    order
}

/// Picks the best of three starting points: the band's own initial
/// curves, a full copy of the source band's curves and shapes, or only the
/// source's first harmonic.
fn warm_start(prob: &BandProblem<'_>, bp: &mut BandParams, src: &BandParams) {
    let cord = prob.layout.cord;

    let mut full = bp.clone();
    full.tc.copy_from_slice(&src.tc);
    full.shape.copy_from_slice(&src.shape);

    let mut first = bp.clone();
    for (m, chunk) in first.tc.chunks_mut(cord).enumerate() {
        chunk.fill(0.0);
        chunk[0] = src.tc[m * cord];
    }

    let own_err = prob.error(bp);
    let full_err = prob.error(&full);
    let first_err = prob.error(&first);
    debug!(band = prob.band, own_err, full_err, first_err, "warm start candidates");

    if full_err <= own_err && full_err <= first_err {
        *bp = full;
    } else if first_err < own_err {
        *bp = first;
    }
}

/// Fits one band in place and returns its final error.
fn fit_band(
    prob: &BandProblem<'_>,
    bp: &mut BandParams,
    source: Option<&BandParams>,
    opts: &FitOptions,
    passes: usize,
) -> MppResult<f64> {
    if let Some(src) = source {
        warm_start(prob, bp, src);
    }

    let tuning = &opts.tuning;
    let track = opts.verbose || opts.early_exit.is_some();
    let mut last = if track { prob.error(bp) } else { f64::NAN };
    let mut tol = tuning.tol_start;

    let stages: &[Stage] = if prob.layout.shaped {
        &[Stage::Transfer, Stage::Shape, Stage::Combination]
    } else {
        &[Stage::Transfer, Stage::Combination]
    };

    for pass in 0..passes {
        for &stage in stages {
            let min = prob.minimize(stage, bp, tol)?;
            if !min.converged {
                warn!(band = prob.band, pass, ?stage, value = min.value, "minimizer hit its iteration limit");
            }
        }

        if track {
            let err = prob.error(bp);
            debug!(band = prob.band, pass, error = err, "pass done");
            if let Some(eps) = opts.early_exit {
                if last - err <= eps * last {
                    debug!(band = prob.band, pass, "improvement below early exit threshold, stopping");
                    return Ok(err);
                }
            }
            last = err;
        }
        tol *= tuning.tol_scale;
    }
    Ok(if track { last } else { prob.error(bp) })
}
