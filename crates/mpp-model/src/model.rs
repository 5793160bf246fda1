//! The fitted model and its queries.

use crate::forward::{Gradient, evaluate};
use crate::options::{FitOptions, FitTuning};
use crate::params::{BandParams, Layout, MAX_INKS, MppParts, XYZ_BANDS, effective_limit};
use crate::wb::{self, WhiteBlack};
use crate::{MppError, MppResult, fit};
use mpp_color::{Illuminant, InkMask, SpectralConverter, SpectralShape, xyz_to_lab};
use rayon::prelude::*;
use std::fmt;
use tracing::{debug, info};

/// One measured patch.
///
/// Device values are 0..1. XYZ is scaled so the perfect diffuser has
/// Y = 1, and spectra are reflectance in 0..1.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Device values, one per channel.
    pub dev: Vec<f64>,
    /// Measured XYZ.
    pub xyz: [f64; 3],
    /// Measured spectrum, required when fitting a spectral model.
    pub spec: Option<Vec<f64>>,
    /// Relative importance in the fit.
    pub weight: f64,
}

impl Sample {
    /// A colorimetric sample of weight 1.
    pub fn new(dev: Vec<f64>, xyz: [f64; 3]) -> Self {
        Self { dev, xyz, spec: None, weight: 1.0 }
    }

    /// Adds a spectrum.
    pub fn with_spectrum(mut self, spec: Vec<f64>) -> Self {
        self.spec = Some(spec);
        self
    }
}

/// Whether the device emits or absorbs light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Printer (subtractive).
    Output,
    /// Display (additive).
    Display,
}

impl DeviceClass {
    /// Keyword used in model files.
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Output => "OUTPUT",
            DeviceClass::Display => "DISPLAY",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a model's configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MppInfo {
    /// Device colorants.
    pub mask: InkMask,
    /// Number of channels.
    pub channels: usize,
    /// Display or printer.
    pub class: DeviceClass,
    /// Total ink limit as a sum of fractions, if one constrains the device.
    pub limit: Option<f64>,
    /// Transfer curve order.
    pub transfer_order: usize,
    /// Whether shape parameters are in use.
    pub shaped: bool,
    /// Spectral band layout.
    pub spectral: Option<SpectralShape>,
    /// Instrument the measurements came from.
    pub instrument: Option<String>,
}

/// A model printer profile.
///
/// Immutable once built apart from [`set_ilob`](Self::set_ilob); every
/// query takes `&self`, so a model can be shared across threads.
#[derive(Debug, Clone)]
pub struct Mpp {
    mask: InkMask,
    layout: Layout,
    limit: Option<f64>,
    spectral: Option<SpectralShape>,
    instrument: Option<String>,
    created: Option<String>,
    bands: Vec<BandParams>,
    ilob: Option<IlluminantWeights>,
    tuning: FitTuning,
    wb: WhiteBlack,
}

impl Mpp {
    /// Fits a model to measured samples.
    ///
    /// # Errors
    ///
    /// Fails on more than [`MAX_INKS`] channels, too many spectral bands,
    /// no or malformed samples, or when no acceptable black point exists.
    pub fn create(mask: InkMask, samples: &[Sample], opts: &FitOptions) -> MppResult<Self> {
        let parts = fit::fit(mask, samples, opts)?;
        let mpp = Self::build(parts, opts.tuning.clone())?;
        if opts.verbose {
            let report = mpp.fit_report(samples)?;
            info!(%report, "model fitted");
        }
        Ok(mpp)
    }

    /// Builds a model from explicit parameters. The black point search
    /// uses the default [`FitTuning`].
    pub fn from_parts(parts: MppParts) -> MppResult<Self> {
        Self::build(parts, FitTuning::default())
    }

    pub(crate) fn build(parts: MppParts, tuning: FitTuning) -> MppResult<Self> {
        parts.validate()?;
        let layout = parts.layout();
        let mut mpp = Self {
            mask: parts.mask,
            layout,
            limit: parts.limit,
            spectral: parts.spectral,
            instrument: parts.instrument,
            created: parts.created,
            bands: parts.bands,
            ilob: None,
            tuning,
            wb: WhiteBlack::default(),
        };
        mpp.wb = wb::solve(&mpp, &mpp.tuning)?;
        Ok(mpp)
    }

    /// The model's parameters.
    pub fn to_parts(&self) -> MppParts {
        MppParts {
            mask: self.mask,
            limit: self.limit,
            cord: self.layout.cord,
            shaped: self.layout.shaped,
            spectral: self.spectral,
            instrument: self.instrument.clone(),
            created: self.created.clone(),
            bands: self.bands.clone(),
        }
    }

    /// Device colorants.
    pub fn mask(&self) -> InkMask {
        self.mask
    }

    /// Number of device channels.
    pub fn channels(&self) -> usize {
        self.layout.n
    }

    /// Number of output bands: 3 plus any spectral bands.
    pub fn bands(&self) -> usize {
        self.bands.len()
    }

    /// Ink limit that actually constrains the device.
    pub fn ink_limit(&self) -> Option<f64> {
        effective_limit(self.limit, self.layout.n)
    }

    pub(crate) fn layout(&self) -> &Layout {
        &self.layout
    }

    pub(crate) fn band_params(&self) -> &[BandParams] {
        &self.bands
    }

    pub(crate) fn tuning(&self) -> &FitTuning {
        &self.tuning
    }

    pub(crate) fn created(&self) -> Option<&str> {
        self.created.as_deref()
    }

    /// Configuration summary.
    pub fn info(&self) -> MppInfo {
        MppInfo {
            mask: self.mask,
            channels: self.layout.n,
            class: if self.mask.is_additive() { DeviceClass::Display } else { DeviceClass::Output },
            limit: self.ink_limit(),
            transfer_order: self.layout.cord,
            shaped: self.layout.shaped,
            spectral: self.spectral,
            instrument: self.instrument.clone(),
        }
    }

    /// Cached white, black and K-only black points.
    pub fn get_wb(&self) -> &WhiteBlack {
        &self.wb
    }

    /// Copies `dev` into a full width buffer, clamped to [0, 1]. Missing
    /// channels read as 0.
    fn device(&self, dev: &[f64]) -> [f64; MAX_INKS] {
        let mut buf = [0.0; MAX_INKS];
        for (b, &d) in buf.iter_mut().zip(dev).take(self.layout.n) {
            *b = d.clamp(0.0, 1.0);
        }
        buf
    }

    fn check_band(&self, band: usize) -> MppResult<&BandParams> {
        self.bands.get(band).ok_or_else(|| {
            MppError::InvalidArgument(format!("band {band} of {}", self.bands.len()))
        })
    }

    /// Value of one output band: 0, 1, 2 are X, Y, Z, spectral bands
    /// follow.
    pub fn band_value(&self, band: usize, dev: &[f64]) -> MppResult<f64> {
        let bp = self.check_band(band)?;
        Ok(evaluate(&self.layout, bp, &self.device(dev), None))
    }

    /// [`band_value`](Self::band_value) and its partial derivative with
    /// respect to every device channel.
    pub fn band_value_deriv(&self, band: usize, dev: &[f64]) -> MppResult<(f64, Vec<f64>)> {
        let bp = self.check_band(band)?;
        let mut grad = Gradient::new(&self.layout);
        let v = evaluate(&self.layout, bp, &self.device(dev), Some(&mut grad));
        Ok((v, grad.dev))
    }

    /// Device values to XYZ.
    ///
    /// Values are clamped to [0, 1]. For spectral models with an
    /// illuminant set through [`set_ilob`](Self::set_ilob), the modelled
    /// spectrum is integrated instead of returning the fitted XYZ bands.
    pub fn lookup(&self, dev: &[f64]) -> [f64; 3] {
        let dev = self.device(dev);
        if let Some(weights) = &self.ilob {
            return weights.integrate(&self.spectrum(&dev));
        }
        let mut xyz = [0.0; 3];
        for (v, bp) in xyz.iter_mut().zip(&self.bands[..XYZ_BANDS]) {
            *v = evaluate(&self.layout, bp, &dev, None);
        }
        xyz
    }

    /// Device values to D50 Lab.
    pub fn lookup_lab(&self, dev: &[f64]) -> [f64; 3] {
        xyz_to_lab(self.lookup(dev))
    }

    /// [`lookup`](Self::lookup) over many device values in parallel.
    pub fn lookup_many(&self, devs: &[Vec<f64>]) -> Vec<[f64; 3]> {
        devs.par_iter().map(|d| self.lookup(d)).collect()
    }

    /// Device values to reflectance spectrum.
    pub fn lookup_spec(&self, dev: &[f64]) -> MppResult<Vec<f64>> {
        if self.spectral.is_none() {
            return Err(MppError::NotSpectral);
        }
        Ok(self.spectrum(&self.device(dev)))
    }

    fn spectrum(&self, dev: &[f64]) -> Vec<f64> {
        self.bands[XYZ_BANDS..]
            .iter()
            .map(|bp| evaluate(&self.layout, bp, dev, None))
            .collect()
    }

    /// Makes [`lookup`](Self::lookup) integrate the modelled spectrum
    /// under `illuminant`. `None` returns to the fitted XYZ bands. White
    /// and black points are recomputed.
    pub fn set_ilob(&mut self, illuminant: Option<Illuminant>) -> MppResult<()> {
        let weights = match (illuminant, &self.spectral) {
            (None, _) => None,
            (Some(_), None) => return Err(MppError::NotSpectral),
            (Some(ill), Some(shape)) => Some(IlluminantWeights::new(ill, shape)?),
        };

        let previous = std::mem::replace(&mut self.ilob, weights);
        match wb::solve(self, &self.tuning) {
            Ok(wb) => {
                self.wb = wb;
                debug!(?illuminant, "lookup illuminant set");
                Ok(())
            }
            Err(e) => {
                self.ilob = previous;
                Err(e)
            }
        }
    }
}

/// XYZ contribution of each spectral band under one illuminant.
#[derive(Debug, Clone)]
struct IlluminantWeights {
    bands: Vec<[f64; 3]>,
}

impl IlluminantWeights {
    fn new(illuminant: Illuminant, shape: &SpectralShape) -> MppResult<Self> {
        let conv = SpectralConverter::new(illuminant);
        let unit = SpectralShape { norm: 1.0, ..*shape };
        let mut basis = vec![0.0; shape.bands];
        let mut bands = Vec::with_capacity(shape.bands);
        for i in 0..shape.bands {
            basis.fill(0.0);
            basis[i] = 1.0;
            bands.push(conv.convert(&unit, &basis)?);
        }
        Ok(Self { bands })
    }

    /// Integrates a spectrum with one value per band.
    fn integrate(&self, spectrum: &[f64]) -> [f64; 3] {
        let mut xyz = [0.0; 3];
        for (w, &r) in self.bands.iter().zip(spectrum) {
            for c in 0..3 {
                xyz[c] += r * w[c];
            }
        }
        xyz
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use mpp_color::D50;

    fn grey_display() -> Mpp {
        let mask = InkMask::from_chars("W").unwrap();
        Mpp::from_parts(MppParts::from_primaries(mask, &[[0.0; 3], D50]).unwrap()).unwrap()
    }

    #[test]
    fn lookup_clamps_and_pads() {
        let mpp = grey_display();
        assert_abs_diff_eq!(mpp.lookup(&[2.0])[1], 1.0);
        assert_abs_diff_eq!(mpp.lookup(&[-1.0])[1], 0.0);
        assert_abs_diff_eq!(mpp.lookup(&[])[1], 0.0);
        assert_abs_diff_eq!(mpp.lookup(&[0.25, 9.0])[1], 0.25);
    }

    #[test]
    fn band_queries() {
        let mpp = grey_display();
        assert_abs_diff_eq!(mpp.band_value(2, &[0.5]).unwrap(), 0.5 * D50[2], epsilon = 1e-12);
        let (v, d) = mpp.band_value_deriv(0, &[0.3]).unwrap();
        assert_abs_diff_eq!(v, 0.3 * D50[0], epsilon = 1e-12);
        assert_abs_diff_eq!(d[0], D50[0], epsilon = 1e-12);
        assert!(matches!(mpp.band_value(3, &[0.5]), Err(MppError::InvalidArgument(_))));
        assert!(matches!(mpp.lookup_spec(&[0.5]), Err(MppError::NotSpectral)));
    }

    #[test]
    fn lookup_many_matches_lookup() {
        let mpp = grey_display();
        let devs: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 / 19.0]).collect();
        let many = mpp.lookup_many(&devs);
        for (d, xyz) in devs.iter().zip(&many) {
            assert_eq!(*xyz, mpp.lookup(d));
        }
    }

    #[test]
    fn display_white_black() {
        let mpp = grey_display();
        let wb = mpp.get_wb();
        assert_eq!(wb.white, vec![1.0]);
        assert_eq!(wb.black, vec![0.0]);
        assert_abs_diff_eq!(wb.lab().white[0], 100.0, epsilon = 1e-9);
        assert_eq!(mpp.info().class, DeviceClass::Display);
    }

    fn spectral_cmy(bad_band: Option<usize>) -> Mpp {
        let mask = InkMask::from_chars("CMY").unwrap();
        let prims: Vec<[f64; 3]> = (0..8usize)
            .map(|c| {
                let k = 0.85 * 0.4f64.powi(c.count_ones() as i32);
                [k * D50[0], k, k * D50[2]]
            })
            .collect();
        let mut parts = MppParts::from_primaries(mask, &prims).unwrap();
        let shape = SpectralShape::new(4, 400.0, 700.0, 1.0).unwrap();
        parts.spectral = Some(shape);
        let layout = parts.layout();
        for i in 0..shape.bands {
            let mut bp = BandParams::zeroed(&layout);
            bp.pc = (0..8usize).map(|c| 0.85 * 0.4f64.powi(c.count_ones() as i32)).collect();
            if bad_band == Some(i) {
                bp.pc[0] = f64::NAN;
            }
            parts.bands.push(bp);
        }
        Mpp::from_parts(parts).unwrap()
    }

    #[test]
    fn failed_ilob_keeps_previous_state() {
        let mut mpp = spectral_cmy(Some(2));
        let wb = mpp.get_wb().clone();
        let before = mpp.lookup(&[0.3, 0.2, 0.1]);

        assert!(mpp.set_ilob(Some(Illuminant::D50)).is_err());
        assert_eq!(*mpp.get_wb(), wb);
        assert_eq!(mpp.lookup(&[0.3, 0.2, 0.1]), before);
    }

    #[test]
    fn ilob_integrates_modelled_spectrum() {
        let mut mpp = spectral_cmy(None);
        mpp.set_ilob(Some(Illuminant::D50)).unwrap();
        let dev = [0.5, 0.25, 0.75];
        let spec = mpp.lookup_spec(&dev).unwrap();
        let shape = mpp.info().spectral.unwrap();
        let want = SpectralConverter::new(Illuminant::D50).convert(&shape, &spec).unwrap();
        let got = mpp.lookup(&dev);
        for j in 0..3 {
            assert_abs_diff_eq!(got[j], want[j], epsilon = 1e-12);
        }
        assert_abs_diff_eq!(mpp.get_wb().white_xyz[1], 0.85, epsilon = 1e-9);
    }

    #[test]
    fn ilob_needs_spectral_model() {
        let mut mpp = grey_display();
        assert!(matches!(mpp.set_ilob(Some(Illuminant::D50)), Err(MppError::NotSpectral)));
        mpp.set_ilob(None).unwrap();
    }
}
