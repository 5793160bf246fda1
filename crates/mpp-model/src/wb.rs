//! White, black and K-only black points.
//!
//! Displays are trivial: white is every channel at full, black every
//! channel off. For printers white is the bare substrate, and black is
//! searched for: the darkest device value that stays on the neutral line
//! from white toward the device's natural black (its K ink, or a CMY
//! overprint) and within the ink limit.

use crate::options::FitTuning;
use crate::params::clip_to_limit;
use crate::{Mpp, MppError, MppResult};
use mpp_color::{Ink, xyz_to_lab};
use mpp_math::{powell, saturate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

/// Lab denominator below which the white to black line is taken as flat.
const FLAT_LINE: f64 = 1e-6;

/// Cached white and black points of a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhiteBlack {
    /// Device value of the white point.
    pub white: Vec<f64>,
    /// XYZ of the white point.
    pub white_xyz: [f64; 3],
    /// Device value of the darkest neutral black.
    pub black: Vec<f64>,
    /// XYZ of the black point.
    pub black_xyz: [f64; 3],
    /// Device value of the black made with K only. Same as `black` for
    /// devices without K.
    pub kblack: Vec<f64>,
    /// XYZ of the K-only black.
    pub kblack_xyz: [f64; 3],
}

/// White, black and K-only black in Lab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteBlackLab {
    /// White point.
    pub white: [f64; 3],
    /// Black point.
    pub black: [f64; 3],
    /// K-only black.
    pub kblack: [f64; 3],
}

impl WhiteBlack {
    /// The three points as D50 Lab.
    pub fn lab(&self) -> WhiteBlackLab {
        WhiteBlackLab {
            white: xyz_to_lab(self.white_xyz),
            black: xyz_to_lab(self.black_xyz),
            kblack: xyz_to_lab(self.kblack_xyz),
        }
    }
}

/// Computes the white and black points of `mpp`.
pub(crate) fn solve(mpp: &Mpp, tuning: &FitTuning) -> MppResult<WhiteBlack> {
    let mask = mpp.mask();
    let n = mask.count();

    if mask.is_additive() {
        let white = vec![1.0; n];
        let black = vec![0.0; n];
        let black_xyz = mpp.lookup(&black);
        return Ok(WhiteBlack {
            white_xyz: mpp.lookup(&white),
            white,
            black_xyz,
            kblack: black.clone(),
            kblack_xyz: black_xyz,
            black,
        });
    }

    let limit = mpp.ink_limit();
    let white = vec![0.0; n];
    let white_xyz = mpp.lookup(&white);
    let wlab = xyz_to_lab(white_xyz);

    // K alone at full, or as much as the limit allows
    let kblack = mask.index_of(Ink::Black).map(|k| {
        let mut dev = vec![0.0; n];
        dev[k] = limit.map_or(1.0, |l| l.min(1.0));
        dev
    });

    // Where the neutral line heads
    let dir_lab = if let Some(kdev) = &kblack {
        mpp.lookup_lab(kdev)
    } else if let (Some(c), Some(m), Some(y)) = (
        mask.index_of(Ink::Cyan),
        mask.index_of(Ink::Magenta),
        mask.index_of(Ink::Yellow),
    ) {
        let mut dev = vec![0.0; n];
        dev[c] = 1.0;
        dev[m] = 1.0;
        dev[y] = 1.0;
        clip_to_limit(&mut dev, limit);
        mpp.lookup_lab(&dev)
    } else {
        [0.0, 0.0, 0.0]
    };
    trace!(?wlab, ?dir_lab, "black point direction");

    let objective = |dev: &[f64]| -> f64 {
        let mut over = 0.0;
        let mut clipped = Vec::with_capacity(n);
        for &d in dev {
            over += (-d).max(0.0) + (d - 1.0).max(0.0);
            clipped.push(saturate(d));
        }
        if let Some(l) = limit {
            over += (clipped.iter().sum::<f64>() - l).max(0.0);
        }

        let lab = mpp.lookup_lab(&clipped);
        let dl = dir_lab[0] - wlab[0];
        let t = if dl.abs() < FLAT_LINE { 1.0 } else { (lab[0] - wlab[0]) / dl };
        let da = lab[1] - (wlab[1] + t * (dir_lab[1] - wlab[1]));
        let db = lab[2] - (wlab[2] + t * (dir_lab[2] - wlab[2]));

        lab[0] + tuning.black_neutral_weight * (da * da + db * db) + tuning.black_range_weight * over
    };

    let mut rng = StdRng::seed_from_u64(tuning.black_seed);
    let radii = vec![0.1; n];
    let mut best: Option<(f64, Vec<f64>)> = None;
    for trial in 0..tuning.black_restarts.max(1) {
        let mut p: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
        clip_to_limit(&mut p, limit);
        let min = powell(&mut p, &radii, 1e-6, 500, &objective)?;
        trace!(trial, value = min.value, "black point trial");
        if best.as_ref().is_none_or(|(v, _)| min.value < *v) {
            best = Some((min.value, p));
        }
    }

    let Some((value, mut black)) = best else {
        return Err(MppError::BlackPointSolve { best: f64::INFINITY });
    };
    if value > tuning.black_fail {
        return Err(MppError::BlackPointSolve { best: value });
    }
    for d in &mut black {
        *d = saturate(*d);
    }
    clip_to_limit(&mut black, limit);
    let black_xyz = mpp.lookup(&black);
    debug!(?black, lab = ?xyz_to_lab(black_xyz), objective = value, "black point");

    let kblack = kblack.unwrap_or_else(|| black.clone());
    Ok(WhiteBlack {
        white,
        white_xyz,
        kblack_xyz: mpp.lookup(&kblack),
        kblack,
        black,
        black_xyz,
    })
}
