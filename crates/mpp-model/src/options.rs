//! Fitting options and tuning constants.

use mpp_color::SpectralShape;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fit quality. Trades transfer curve detail and iteration count for time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Level 0.
    Low,
    /// Level 1.
    #[default]
    Medium,
    /// Level 2.
    High,
    /// Level 3.
    Ultra,
}

impl Quality {
    /// Quality for a numeric level 0..=3.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Quality::Low),
            1 => Some(Quality::Medium),
            2 => Some(Quality::High),
            3 => Some(Quality::Ultra),
            _ => None,
        }
    }

    /// Numeric level 0..=3.
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Harmonic order of the transfer curves.
    pub fn transfer_order(self) -> usize {
        match self {
            Quality::Low => 4,
            Quality::Medium => 6,
            Quality::High => 8,
            Quality::Ultra => 12,
        }
    }

    /// Optimization passes per band.
    pub fn passes(self) -> usize {
        match self {
            Quality::Low => 3,
            Quality::Medium => 5,
            Quality::High => 8,
            Quality::Ultra => 10,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
            Quality::Ultra => "ultra",
        };
        f.write_str(name)
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "low" | "l" => Ok(Quality::Low),
            "1" | "medium" | "m" => Ok(Quality::Medium),
            "2" | "high" | "h" => Ok(Quality::High),
            "3" | "ultra" | "u" => Ok(Quality::Ultra),
            _ => Err(format!("unknown quality: {s}")),
        }
    }
}

/// Empirically tuned constants of the fitting pipeline.
///
/// The defaults are the values the model was tuned with. They interact
/// with the minimizer step sizes, so change them with care. Loadable from
/// a config file; missing entries keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitTuning {
    /// Density decay per additional ink when estimating overprints.
    pub trap_decay: f64,
    /// Regularization weight on the mean squared shape value.
    pub shape_pmw: f64,
    /// Weight pulling primary combinations toward their initial values.
    pub comb_pmw: f64,
    /// Weight on squared negative primary combination values.
    pub comb_neg_weight: f64,
    /// Transfer regularization weight for harmonics 0 and 1.
    pub trans_hw01: f64,
    /// Harmonic at which the transfer weight reaches `trans_hwbr`.
    pub trans_hbreak: usize,
    /// Transfer regularization weight at `trans_hbreak`.
    pub trans_hwbr: f64,
    /// Transfer weight increase per harmonic above `trans_hbreak`.
    pub trans_hwinc: f64,
    /// Initial first transfer coefficient (a typical dot gain curve).
    pub initial_trans: f64,
    /// Squared device distance under which a measured sample replaces an
    /// estimated primary combination.
    pub near_sq: f64,
    /// Minimizer tolerance of the first pass.
    pub tol_start: f64,
    /// Tolerance multiplier per pass.
    pub tol_scale: f64,
    /// Iteration limit of each minimizer call in the fitting loop.
    pub max_iter: usize,
    /// Random restarts of the black point search.
    pub black_restarts: usize,
    /// Seed for the black point restarts.
    pub black_seed: u64,
    /// Weight on squared hue deviation from the neutral line.
    pub black_neutral_weight: f64,
    /// Weight on out-of-range and over-limit device values.
    pub black_range_weight: f64,
    /// Objective above which the black point search fails.
    pub black_fail: f64,
}

impl Default for FitTuning {
    fn default() -> Self {
        Self {
            trap_decay: 0.90,
            shape_pmw: 10.0,
            comb_pmw: 0.008,
            comb_neg_weight: 5000.0,
            trans_hw01: 0.01,
            trans_hbreak: 3,
            trans_hwbr: 0.1,
            trans_hwinc: 0.1,
            initial_trans: -1.6,
            near_sq: 0.02,
            tol_start: 0.1,
            tol_scale: 0.2,
            max_iter: 200,
            black_restarts: 20,
            black_seed: 0x4d50_5042,
            black_neutral_weight: 10.0,
            black_range_weight: 200.0,
            black_fail: 1000.0,
        }
    }
}

impl FitTuning {
    /// Regularization weight of transfer harmonic `order`.
    ///
    /// Flat at `trans_hw01` for harmonics 0 and 1, ramps linearly to
    /// `trans_hwbr` at `trans_hbreak`, then grows by `trans_hwinc` per
    /// harmonic.
    pub fn harmonic_weight(&self, order: usize) -> f64 {
        let f = order as f64;
        let brk = self.trans_hbreak.max(2) as f64;
        if f <= 1.0 {
            self.trans_hw01
        } else if f <= brk {
            let t = (f - 1.0) / (brk - 1.0);
            self.trans_hw01 + t * (self.trans_hwbr - self.trans_hw01)
        } else {
            self.trans_hwbr + (f - brk) * self.trans_hwinc
        }
    }
}

/// Options for [`Mpp::create`](crate::Mpp::create).
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Evaluate and log the fit error after every pass.
    pub verbose: bool,
    /// Fit quality.
    pub quality: Quality,
    /// Total ink limit as a sum of fractions (3.0 = 300%). `None`, or a
    /// value at or above the channel count, means unlimited.
    pub limit: Option<f64>,
    /// Fit ink interaction (shape) parameters.
    pub shape: bool,
    /// Spectral band layout. Samples must then carry spectra.
    pub spectral: Option<SpectralShape>,
    /// Instrument name, carried through to the model file.
    pub instrument: Option<String>,
    /// Stop iterating a band once a pass improves its error by less than
    /// this fraction. Off by default; the stock pipeline always runs the
    /// full pass budget.
    pub early_exit: Option<f64>,
    /// Tuning constants.
    pub tuning: FitTuning,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            quality: Quality::default(),
            limit: None,
            shape: true,
            spectral: None,
            instrument: None,
            early_exit: None,
            tuning: FitTuning::default(),
        }
    }
}

impl FitOptions {
    /// Options at the given quality.
    pub fn with_quality(quality: Quality) -> Self {
        Self { quality, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quality_plan() {
        let plan: Vec<_> = (0..4)
            .map(|l| {
                let q = Quality::from_level(l).unwrap();
                (q.transfer_order(), q.passes())
            })
            .collect();
        assert_eq!(plan, vec![(4, 3), (6, 5), (8, 8), (12, 10)]);
        assert_eq!(Quality::from_level(4), None);
        assert_eq!("HIGH".parse::<Quality>(), Ok(Quality::High));
        assert_eq!(Quality::Ultra.level(), 3);
    }

    #[test]
    fn harmonic_weights_ramp() {
        let t = FitTuning::default();
        assert_abs_diff_eq!(t.harmonic_weight(0), 0.01);
        assert_abs_diff_eq!(t.harmonic_weight(1), 0.01);
        assert_abs_diff_eq!(t.harmonic_weight(2), 0.055, epsilon = 1e-12);
        assert_abs_diff_eq!(t.harmonic_weight(3), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(t.harmonic_weight(5), 0.3, epsilon = 1e-12);
    }
}
