//! Fitting setup: sample validation and starting parameters.

use crate::options::FitTuning;
use crate::params::{BandParams, Layout, XYZ_BANDS};
use crate::{MppError, MppResult, Sample};
use mpp_color::lde;
use mpp_math::saturate;
use tracing::{debug, trace};

/// A sample prepared for fitting.
#[derive(Debug, Clone)]
pub(crate) struct FitPoint {
    /// Device values clamped to [0, 1].
    pub dev: Vec<f64>,
    /// Target value of every band.
    pub target: Vec<f64>,
    /// Target of every band in L*-like units.
    pub ltarget: Vec<f64>,
    pub weight: f64,
}

/// Validates and copies the caller's samples.
pub(crate) fn prepare_points(samples: &[Sample], n: usize, spec_n: usize) -> MppResult<Vec<FitPoint>> {
    if samples.is_empty() {
        return Err(MppError::NoSamples);
    }
    samples
        .iter()
        .enumerate()
        .map(|(index, s)| {
            let invalid = |reason: String| MppError::InvalidSample { index, reason };
            if s.dev.len() != n {
                return Err(invalid(format!("{} device values, expected {n}", s.dev.len())));
            }
            if s.dev.iter().chain(&s.xyz).any(|v| !v.is_finite()) {
                return Err(invalid("non-finite value".into()));
            }
            if !(s.weight >= 0.0) {
                return Err(invalid(format!("weight {}", s.weight)));
            }
            let mut target = s.xyz.to_vec();
            if spec_n > 0 {
                match &s.spec {
                    Some(spec) if spec.len() == spec_n => target.extend_from_slice(spec),
                    Some(spec) => {
                        return Err(invalid(format!("{} spectral values, expected {spec_n}", spec.len())));
                    }
                    None => return Err(invalid("missing spectrum".into())),
                }
            }
            Ok(FitPoint {
                dev: s.dev.iter().map(|&d| saturate(d)).collect(),
                ltarget: target.iter().map(|&t| lde(t)).collect(),
                target,
                weight: s.weight,
            })
        })
        .collect()
}

fn corner_dev(comb: usize, n: usize) -> impl Iterator<Item = f64> {
    (0..n).map(move |m| if comb & (1 << m) != 0 { 1.0 } else { 0.0 })
}

/// Starting parameters for every band.
///
/// Transfer curves start at a generic dot gain shape and shapes at zero.
/// Each primary combination starts at the nearest sample. Overprints of
/// two or more channels are then estimated from the single channel
/// corners (additive sums for displays, decaying density sums for
/// printers) unless a sample sits close enough to measure them directly.
pub(crate) fn initial_bands(
    layout: &Layout,
    points: &[FitPoint],
    additive: bool,
    tuning: &FitTuning,
) -> Vec<BandParams> {
    let n = layout.n;
    let nb = points.first().map_or(XYZ_BANDS, |p| p.target.len());

    // Nearest sample to each corner
    let nearest: Vec<(usize, f64)> = (0..layout.nn)
        .map(|comb| {
            points
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let d2: f64 = p.dev.iter().zip(corner_dev(comb, n)).map(|(a, b)| (a - b).powi(2)).sum();
                    (i, d2)
                })
                .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
        })
        .collect();

    let mut bands = Vec::with_capacity(nb);
    for j in 0..nb {
        let mut bp = BandParams::zeroed(layout);
        for m in 0..n {
            bp.tc[m * layout.cord] = tuning.initial_trans;
        }

        for (comb, &(i, _)) in nearest.iter().enumerate() {
            bp.pc[comb] = points[i].target[j];
        }

        let base = bp.pc[0];
        for comb in (0..layout.nn).filter(|c| c.count_ones() >= 2) {
            let inks = (0..n).filter(|&m| comb & (1 << m) != 0);
            let nk = comb.count_ones() as i32;
            let estimate = if additive {
                base + inks.map(|m| bp.pc[1 << m] - base).sum::<f64>()
            } else {
                let paper = base.max(1e-6);
                let density: f64 = inks.map(|m| -(bp.pc[1 << m].max(1e-6) / paper).ln()).sum();
                paper * (-density * tuning.trap_decay.powi(nk - 1)).exp()
            };

            let (i, d2) = nearest[comb];
            bp.pc[comb] = if d2 < tuning.near_sq { points[i].target[j] } else { estimate };
        }
        trace!(band = j, pc = ?bp.pc, "initial primaries");
        bands.push(bp);
    }

    let measured = nearest.iter().filter(|(_, d2)| *d2 < tuning.near_sq).count();
    debug!(corners = layout.nn, measured, "initialized primary combinations");
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn point(dev: &[f64], y: f64) -> FitPoint {
        let s = Sample::new(dev.to_vec(), [y, y, y]);
        prepare_points(&[s], dev.len(), 0).unwrap().remove(0)
    }

    #[test]
    fn rejects_bad_samples() {
        assert!(matches!(prepare_points(&[], 3, 0), Err(MppError::NoSamples)));
        let s = Sample::new(vec![0.1, 0.2], [0.5; 3]);
        assert!(matches!(
            prepare_points(&[s.clone()], 3, 0),
            Err(MppError::InvalidSample { index: 0, .. })
        ));
        assert!(prepare_points(&[s], 2, 5).is_err());
    }

    #[test]
    fn estimates_overprints() {
        let tuning = FitTuning::default();
        let layout = Layout::new(2, 4, true);
        let points = vec![
            point(&[0.0, 0.0], 0.8),
            point(&[1.0, 0.0], 0.4),
            point(&[0.0, 1.0], 0.2),
        ];
        let bands = initial_bands(&layout, &points, false, &tuning);
        assert_eq!(bands.len(), 3);
        let bp = &bands[1];
        assert_abs_diff_eq!(bp.tc[0], -1.6);
        assert_abs_diff_eq!(bp.tc[1], 0.0);
        assert_abs_diff_eq!(bp.pc[0], 0.8);
        assert_abs_diff_eq!(bp.pc[1], 0.4);
        let density = (2.0f64).ln() + (4.0f64).ln();
        assert_abs_diff_eq!(bp.pc[3], 0.8 * (-density * 0.9).exp(), epsilon = 1e-12);

        let bands = initial_bands(&layout, &points, true, &tuning);
        assert_abs_diff_eq!(bands[0].pc[3], 0.8 + (0.4 - 0.8) + (0.2 - 0.8), epsilon = 1e-12);
    }

    #[test]
    fn measured_overprint_wins() {
        let tuning = FitTuning::default();
        let layout = Layout::new(2, 4, false);
        let points = vec![
            point(&[0.0, 0.0], 0.8),
            point(&[1.0, 0.0], 0.4),
            point(&[0.0, 1.0], 0.2),
            point(&[0.95, 1.0], 0.05),
        ];
        let bands = initial_bands(&layout, &points, false, &tuning);
        assert_abs_diff_eq!(bands[2].pc[3], 0.05);
    }
}
