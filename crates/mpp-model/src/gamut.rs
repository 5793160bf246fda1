//! Gamut surface sampling.
//!
//! Only the two dimensional faces of the device hypercube can lie on the
//! gamut boundary, so those are all that get sampled: every pair of
//! channels is swept over a grid while the remaining channels sit at each
//! combination of 0 and 1. Each point is pulled back inside the ink limit
//! before it is evaluated. The hypercube corners are reported separately
//! as cusps.

use crate::params::clip_to_limit;
use crate::{Mpp, MppError, MppResult};
use rayon::prelude::*;
use tracing::debug;

/// Upper bound on the device values one gamut extraction evaluates.
const MAX_GAMUT_SAMPLES: usize = 4_000_000;

/// Cusp reporting protocol of [`GamutSink::set_cusps`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CuspEvent {
    /// Start of the cusp list.
    Begin,
    /// One cusp in Lab.
    Add([f64; 3]),
    /// End of the cusp list.
    End,
}

/// Receiver of gamut surface points.
pub trait GamutSink {
    /// Adds one surface point in Lab.
    fn expand(&mut self, lab: [f64; 3]);

    /// Receives cusp events.
    fn set_cusps(&mut self, _event: CuspEvent) {}

    /// Receives the white, black and K-only black points in Lab.
    fn set_wb(&mut self, _white: [f64; 3], _black: [f64; 3], _kblack: [f64; 3]) {}
}

/// Sink that keeps everything it is given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamutSurface {
    /// Surface points in Lab, in sampling order.
    pub points: Vec<[f64; 3]>,
    /// Cusps in Lab.
    pub cusps: Vec<[f64; 3]>,
    /// White point.
    pub white: Option<[f64; 3]>,
    /// Black point.
    pub black: Option<[f64; 3]>,
    /// K-only black point.
    pub kblack: Option<[f64; 3]>,
    in_cusps: bool,
}

impl GamutSurface {
    /// Creates an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Per axis minimum and maximum of the surface points.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = *self.points.first()?;
        Some(self.points.iter().fold((first, first), |(mut lo, mut hi), p| {
            for j in 0..3 {
                lo[j] = lo[j].min(p[j]);
                hi[j] = hi[j].max(p[j]);
            }
            (lo, hi)
        }))
    }
}

impl GamutSink for GamutSurface {
    fn expand(&mut self, lab: [f64; 3]) {
        self.points.push(lab);
    }

    fn set_cusps(&mut self, event: CuspEvent) {
        match event {
            CuspEvent::Begin => {
                self.cusps.clear();
                self.in_cusps = true;
            }
            CuspEvent::Add(lab) if self.in_cusps => self.cusps.push(lab),
            CuspEvent::Add(_) => {}
            CuspEvent::End => self.in_cusps = false,
        }
    }

    fn set_wb(&mut self, white: [f64; 3], black: [f64; 3], kblack: [f64; 3]) {
        self.white = Some(white);
        self.black = Some(black);
        self.kblack = Some(kblack);
    }
}

/// Number of square faces sampled for `n` channels.
fn face_count(n: usize) -> usize {
    if n < 2 { 1 } else { n * (n - 1) / 2 * (1 << (n - 2)) }
}

/// Device values on the hypercube faces at `res` steps per axis.
fn face_samples(n: usize, res: usize, limit: Option<f64>) -> Vec<Vec<f64>> {
    let step = |i: usize| i as f64 / (res - 1) as f64;
    let mut out = Vec::new();

    if n == 1 {
        for i in 0..res {
            let mut dev = vec![step(i)];
            clip_to_limit(&mut dev, limit);
            out.push(dev);
        }
        return out;
    }

    for a in 0..n {
        for b in a + 1..n {
            let others: Vec<usize> = (0..n).filter(|&m| m != a && m != b).collect();
            for fixed in 0..1usize << others.len() {
                for i in 0..res {
                    for j in 0..res {
                        let mut dev = vec![0.0; n];
                        for (k, &m) in others.iter().enumerate() {
                            dev[m] = ((fixed >> k) & 1) as f64;
                        }
                        dev[a] = step(i);
                        dev[b] = step(j);
                        clip_to_limit(&mut dev, limit);
                        out.push(dev);
                    }
                }
            }
        }
    }
    out
}

impl Mpp {
    /// Device values sampled by [`get_gamut`](Self::get_gamut), already
    /// clipped to the ink limit. Smaller `detail` samples more finely.
    pub fn gamut_samples(&self, detail: f64) -> MppResult<Vec<Vec<f64>>> {
        if !(detail.is_finite() && detail > 0.0) {
            return Err(MppError::InvalidArgument(format!("gamut detail {detail}")));
        }
        let res = (100.0 / detail).round().max(3.0);
        let n = self.channels();
        let count = face_count(n) as f64 * if n == 1 { res } else { res * res };
        if count > MAX_GAMUT_SAMPLES as f64 {
            return Err(MppError::InvalidArgument(format!(
                "gamut detail {detail} needs {count:.0} samples, at most {MAX_GAMUT_SAMPLES} allowed"
            )));
        }
        Ok(face_samples(n, res as usize, self.ink_limit()))
    }

    /// Feeds the gamut surface, its cusps and the white and black points
    /// to `sink`.
    pub fn get_gamut<S: GamutSink + ?Sized>(&self, detail: f64, sink: &mut S) -> MppResult<()> {
        let devs = self.gamut_samples(detail)?;
        debug!(points = devs.len(), detail, "sampling gamut surface");
        let labs: Vec<[f64; 3]> = devs.par_iter().map(|d| self.lookup_lab(d)).collect();
        for lab in labs {
            sink.expand(lab);
        }

        let mut corners = face_samples(self.channels(), 2, self.ink_limit());
        corners.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        corners.dedup();
        sink.set_cusps(CuspEvent::Begin);
        for dev in &corners {
            sink.set_cusps(CuspEvent::Add(self.lookup_lab(dev)));
        }
        sink.set_cusps(CuspEvent::End);

        let wb = self.get_wb().lab();
        sink.set_wb(wb.white, wb.black, wb.kblack);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MppParts;
    use mpp_color::InkMask;

    fn cmyk(limit: Option<f64>) -> Mpp {
        let prims: Vec<[f64; 3]> = (0..16)
            .map(|c: usize| {
                let k = if c & 8 != 0 { 0.04 } else { 0.85 * 0.4f64.powi(c.count_ones() as i32) };
                [k * 0.96, k, k * 0.82]
            })
            .collect();
        let mut parts = MppParts::from_primaries(InkMask::CMYK, &prims).unwrap();
        parts.limit = limit;
        Mpp::from_parts(parts).unwrap()
    }

    #[test]
    fn face_sample_counts() {
        // 6 channel pairs, 4 combinations of the other two, 3x3 grid
        assert_eq!(face_samples(4, 3, None).len(), 6 * 4 * 9);
        assert_eq!(face_samples(1, 5, None).len(), 5);
    }

    #[test]
    fn samples_respect_ink_limit() {
        let mpp = cmyk(Some(2.6));
        let devs = mpp.gamut_samples(20.0).unwrap();
        assert!(!devs.is_empty());
        for d in &devs {
            assert!(d.iter().sum::<f64>() <= 2.6 + 1e-9, "{d:?}");
        }
        assert!(matches!(mpp.gamut_samples(0.0), Err(MppError::InvalidArgument(_))));
    }

    #[test]
    fn rejects_oversized_surfaces() {
        let mpp = cmyk(None);
        assert!(matches!(mpp.gamut_samples(1e-12), Err(MppError::InvalidArgument(_))));
        assert!(matches!(mpp.gamut_samples(0.01), Err(MppError::InvalidArgument(_))));
        // 24 faces at 50 x 50
        assert_eq!(mpp.gamut_samples(2.0).unwrap().len(), 24 * 50 * 50);
        assert_eq!(face_count(4), 24);
        assert_eq!(face_count(1), 1);
    }

    #[test]
    fn sink_receives_everything() {
        let mpp = cmyk(None);
        let mut surface = GamutSurface::new();
        mpp.get_gamut(25.0, &mut surface).unwrap();

        assert_eq!(surface.points.len(), mpp.gamut_samples(25.0).unwrap().len());
        assert_eq!(surface.cusps.len(), 16);
        let (lo, hi) = surface.bounds().unwrap();
        assert!(lo[0] < 30.0 && hi[0] > 90.0);

        let white = surface.white.unwrap();
        assert!((white[0] - hi[0]).abs() < 1e-9);
        assert!(surface.black.unwrap()[0] < white[0]);
    }

    #[test]
    fn empty_surface_has_no_bounds() {
        assert!(GamutSurface::new().bounds().is_none());
    }
}
