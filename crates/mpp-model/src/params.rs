//! Model parameter storage.
//!
//! Every output band (X, Y, Z, then any spectral bands) has its own
//! [`BandParams`]: transfer curve coefficients per channel, shape
//! parameters per channel and combination of the other channels, and the
//! colour of every primary combination.
//!
//! Combinations are bitmasks over channels: bit `m` set means channel `m`
//! is at 100%. Combination 0 is the bare substrate (or display black),
//! `nn - 1` is every channel at full.
//!
//! # Shape parameter indexing
//!
//! A channel's shape parameter only depends on the state of the *other*
//! channels, so for channel `m` only the `nn / 2` combinations with bit `m`
//! clear are stored. [`shape_index`] compacts such a combination by
//! squeezing out bit `m`; [`shape_comb`] expands it back:
//!
//! ```text
//! n = 3, m = 1      comb   compact
//!                   0b000  0
//!                   0b001  1
//!                   0b100  2
//!                   0b101  3
//! ```

use crate::{MppError, MppResult};
use mpp_color::{InkMask, SpectralShape};

/// Most device channels a model can have.
pub const MAX_INKS: usize = 8;
/// Most spectral bands a model can have.
pub const MAX_BANDS: usize = 61;
/// Highest transfer curve order.
pub const MAX_ORDER: usize = 20;

/// Number of colorimetric (XYZ) bands, which come before any spectral ones.
pub const XYZ_BANDS: usize = 3;

/// Compact shape slot of `comb` for channel `m`. Bit `m` of `comb` is
/// ignored.
#[inline]
pub fn shape_index(m: usize, comb: usize) -> usize {
    let low = (1 << m) - 1;
    (comb & low) | ((comb >> (m + 1)) << m)
}

/// Combination for compact shape slot `idx` of channel `m`. Bit `m` of the
/// result is clear.
#[inline]
pub fn shape_comb(m: usize, idx: usize) -> usize {
    let low = (1 << m) - 1;
    (idx & low) | ((idx >> m) << (m + 1))
}

/// Dimensions shared by every band of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Number of channels.
    pub n: usize,
    /// Number of primary combinations, `2^n`.
    pub nn: usize,
    /// Transfer curve order.
    pub cord: usize,
    /// Whether shape parameters are in use.
    pub shaped: bool,
}

impl Layout {
    /// Layout for `n` channels.
    pub fn new(n: usize, cord: usize, shaped: bool) -> Self {
        Self { n, nn: 1 << n, cord, shaped }
    }

    /// Number of transfer coefficients per band.
    #[inline]
    pub fn n_transfer(&self) -> usize {
        self.n * self.cord
    }

    /// Shape slots per channel.
    #[inline]
    pub fn shape_per_channel(&self) -> usize {
        if self.shaped { self.nn / 2 } else { 0 }
    }

    /// Number of shape parameters per band.
    #[inline]
    pub fn n_shape(&self) -> usize {
        self.n * self.shape_per_channel()
    }
}

/// Parameters of one output band.
#[derive(Debug, Clone, PartialEq)]
pub struct BandParams {
    /// Transfer coefficients, `cord` per channel, channel major.
    pub tc: Vec<f64>,
    /// Shape parameters, `nn / 2` per channel in compact order, channel
    /// major. Empty when the model has no shape parameters.
    pub shape: Vec<f64>,
    /// Primary combination values, indexed by combination.
    pub pc: Vec<f64>,
}

impl BandParams {
    /// All parameters zero: straight transfer curves, no interaction and
    /// black primaries.
    pub fn zeroed(layout: &Layout) -> Self {
        Self {
            tc: vec![0.0; layout.n_transfer()],
            shape: vec![0.0; layout.n_shape()],
            pc: vec![0.0; layout.nn],
        }
    }

    /// Transfer coefficients of channel `m`.
    pub fn transfer(&self, layout: &Layout, m: usize) -> &[f64] {
        &self.tc[m * layout.cord..(m + 1) * layout.cord]
    }

    /// Shape parameter of channel `m` at combination `comb` (bit `m`
    /// ignored).
    pub fn shape_at(&self, layout: &Layout, m: usize, comb: usize) -> f64 {
        self.shape[m * layout.shape_per_channel() + shape_index(m, comb)]
    }

    fn check(&self, layout: &Layout, band: usize) -> MppResult<()> {
        let bad = |what: &str, got: usize, want: usize| {
            MppError::InvalidArgument(format!("band {band}: {got} {what}, expected {want}"))
        };
        if self.tc.len() != layout.n_transfer() {
            return Err(bad("transfer coefficients", self.tc.len(), layout.n_transfer()));
        }
        if self.shape.len() != layout.n_shape() {
            return Err(bad("shape parameters", self.shape.len(), layout.n_shape()));
        }
        if self.pc.len() != layout.nn {
            return Err(bad("primary combinations", self.pc.len(), layout.nn));
        }
        Ok(())
    }
}

/// Everything needed to build a model without fitting it.
///
/// `bands` holds X, Y and Z first, followed by one entry per spectral band
/// when `spectral` is set. Colorimetric values are XYZ scaled so the
/// perfect diffuser has Y = 1; spectral values are reflectance in 0..1.
#[derive(Debug, Clone, PartialEq)]
pub struct MppParts {
    /// Device colorants.
    pub mask: InkMask,
    /// Total ink limit as a sum of fractions.
    pub limit: Option<f64>,
    /// Transfer curve order.
    pub cord: usize,
    /// Whether shape parameters are present.
    pub shaped: bool,
    /// Spectral band layout.
    pub spectral: Option<SpectralShape>,
    /// Instrument the measurements came from.
    pub instrument: Option<String>,
    /// Creation date carried from a model file.
    pub created: Option<String>,
    /// Per band parameters.
    pub bands: Vec<BandParams>,
}

impl MppParts {
    /// A plain n-linear model: straight transfer curves, no shape
    /// parameters, and the given XYZ value at every device corner.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mpp_color::InkMask;
    /// use mpp_model::{Mpp, MppParts};
    ///
    /// let mask = InkMask::from_chars("W").unwrap();
    /// let parts = MppParts::from_primaries(mask, &[[0.0; 3], [0.9642, 1.0, 0.8249]]).unwrap();
    /// let mpp = Mpp::from_parts(parts).unwrap();
    /// assert!((mpp.lookup(&[0.5])[1] - 0.5).abs() < 1e-12);
    /// ```
    pub fn from_primaries(mask: InkMask, primaries: &[[f64; 3]]) -> MppResult<Self> {
        let n = mask.count();
        check_inks(n)?;
        let layout = Layout::new(n, 1, false);
        if primaries.len() != layout.nn {
            return Err(MppError::InvalidArgument(format!(
                "{} primaries for {n} channels, expected {}",
                primaries.len(),
                layout.nn
            )));
        }
        let bands = (0..XYZ_BANDS)
            .map(|j| {
                let mut bp = BandParams::zeroed(&layout);
                for (pc, xyz) in bp.pc.iter_mut().zip(primaries) {
                    *pc = xyz[j];
                }
                bp
            })
            .collect();
        Ok(Self {
            mask,
            limit: None,
            cord: 1,
            shaped: false,
            spectral: None,
            instrument: None,
            created: None,
            bands,
        })
    }

    /// Layout implied by the mask, order and shape flag.
    pub fn layout(&self) -> Layout {
        Layout::new(self.mask.count(), self.cord, self.shaped)
    }

    /// Checks dimensions and ranges.
    pub fn validate(&self) -> MppResult<()> {
        let n = self.mask.count();
        check_inks(n)?;
        if !(1..=MAX_ORDER).contains(&self.cord) {
            return Err(MppError::InvalidArgument(format!(
                "transfer order {} outside 1..={MAX_ORDER}",
                self.cord
            )));
        }
        let spec_n = match &self.spectral {
            Some(s) => check_bands(s.bands)?,
            None => 0,
        };
        if self.bands.len() != XYZ_BANDS + spec_n {
            return Err(MppError::InvalidArgument(format!(
                "{} bands, expected {}",
                self.bands.len(),
                XYZ_BANDS + spec_n
            )));
        }
        let layout = self.layout();
        for (j, bp) in self.bands.iter().enumerate() {
            bp.check(&layout, j)?;
        }
        if let Some(l) = self.limit {
            if !(l > 0.0) {
                return Err(MppError::InvalidArgument(format!("ink limit {l}")));
            }
        }
        Ok(())
    }
}

pub(crate) fn check_inks(n: usize) -> MppResult<usize> {
    if n > MAX_INKS {
        return Err(MppError::TooManyInks(n));
    }
    Ok(n)
}

pub(crate) fn check_bands(bands: usize) -> MppResult<usize> {
    if bands > MAX_BANDS {
        return Err(MppError::TooManyBands(bands));
    }
    Ok(bands)
}

/// Ink limit that actually constrains `n` channels.
pub(crate) fn effective_limit(limit: Option<f64>, n: usize) -> Option<f64> {
    limit.filter(|&l| l < n as f64)
}

/// Scales `dev` down uniformly so its sum does not exceed `limit`.
pub(crate) fn clip_to_limit(dev: &mut [f64], limit: Option<f64>) {
    let Some(limit) = limit else { return };
    let sum: f64 = dev.iter().sum();
    if sum > limit && sum > 0.0 {
        let s = limit / sum;
        for d in dev.iter_mut() {
            *d *= s;
        }
    }
}
