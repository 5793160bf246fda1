//! Spectral band layouts and spectrum to XYZ conversion.
//!
//! Reflectance spectra are sampled on an evenly spaced band layout
//! described by [`SpectralShape`]. A [`SpectralConverter`] integrates a
//! reflectance spectrum against an illuminant and the CIE 1931 2 degree
//! standard observer, normalized so a perfect reflector has Y = 1.
//!
//! # Example
//!
//! ```rust
//! use mpp_color::{Illuminant, SpectralConverter, SpectralShape};
//!
//! let shape = SpectralShape::new(36, 380.0, 730.0, 1.0).unwrap();
//! let white = vec![1.0; 36];
//! let conv = SpectralConverter::new(Illuminant::E);
//! let xyz = conv.convert(&shape, &white).unwrap();
//! assert!((xyz[1] - 1.0).abs() < 1e-9);
//! ```

use crate::{ColorError, ColorResult};
use mpp_math::lerp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// First wavelength of the built-in tables, nm.
const TABLE_START: f64 = 380.0;
/// Table spacing, nm.
const TABLE_STEP: f64 = 10.0;

/// CIE 1931 2 degree colour matching functions, 380..=780 nm in 10 nm steps.
#[rustfmt::skip]
const CIE1931_2: [[f64; 3]; 41] = [
    [0.001368, 0.000039, 0.006450], [0.004243, 0.000120, 0.020050],
    [0.014310, 0.000396, 0.067850], [0.043510, 0.001210, 0.207400],
    [0.134380, 0.004000, 0.645600], [0.283900, 0.011600, 1.385600],
    [0.348280, 0.023000, 1.747060], [0.336200, 0.038000, 1.772110],
    [0.290800, 0.060000, 1.669200], [0.195360, 0.090980, 1.287640],
    [0.095640, 0.139020, 0.812950], [0.032010, 0.208020, 0.465180],
    [0.004900, 0.323000, 0.272000], [0.009300, 0.503000, 0.158200],
    [0.063270, 0.710000, 0.078250], [0.165500, 0.862000, 0.042160],
    [0.290400, 0.954000, 0.020300], [0.433450, 0.994950, 0.008750],
    [0.594500, 0.995000, 0.003900], [0.762100, 0.952000, 0.002100],
    [0.916300, 0.870000, 0.001650], [1.026300, 0.757000, 0.001100],
    [1.062200, 0.631000, 0.000800], [1.002600, 0.503000, 0.000340],
    [0.854450, 0.381000, 0.000190], [0.642400, 0.265000, 0.000050],
    [0.447900, 0.175000, 0.000020], [0.283500, 0.107000, 0.000000],
    [0.164900, 0.061000, 0.000000], [0.087400, 0.032000, 0.000000],
    [0.046770, 0.017000, 0.000000], [0.022700, 0.008210, 0.000000],
    [0.011359, 0.004102, 0.000000], [0.005790, 0.002091, 0.000000],
    [0.002899, 0.001047, 0.000000], [0.001440, 0.000520, 0.000000],
    [0.000690, 0.000249, 0.000000], [0.000332, 0.000120, 0.000000],
    [0.000166, 0.000060, 0.000000], [0.000083, 0.000030, 0.000000],
    [0.000042, 0.000015, 0.000000],
];

/// CIE D50 relative spectral power, 380..=780 nm in 10 nm steps.
#[rustfmt::skip]
const D50_SPD: [f64; 41] = [
    24.488, 29.871, 49.308, 56.513, 60.034, 57.818, 74.825, 87.247, 90.612, 91.368,
    95.109, 91.963, 95.724, 96.613, 97.129, 102.099, 100.755, 102.317, 100.000, 97.735,
    98.918, 93.499, 97.688, 99.269, 99.042, 95.722, 98.857, 95.667, 98.190, 103.003,
    99.133, 87.381, 91.604, 92.889, 76.854, 86.511, 92.580, 78.230, 57.692, 82.923,
    78.274,
];

/// Second radiation constant as used by CIE illuminant A, nm*K.
const PLANCK_C2: f64 = 1.435e7;

/// Evenly spaced spectral band layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralShape {
    /// Number of bands.
    pub bands: usize,
    /// Wavelength of the first band, nm.
    pub start_nm: f64,
    /// Wavelength of the last band, nm.
    pub end_nm: f64,
    /// Value that represents 100% reflectance.
    pub norm: f64,
}

impl SpectralShape {
    /// Creates a validated band layout.
    pub fn new(bands: usize, start_nm: f64, end_nm: f64, norm: f64) -> ColorResult<Self> {
        if bands < 2 {
            return Err(ColorError::InvalidSpectralShape(format!("{bands} bands")));
        }
        if !(end_nm > start_nm) {
            return Err(ColorError::InvalidSpectralShape(format!(
                "range {start_nm}..{end_nm} nm"
            )));
        }
        if !(norm > 0.0) {
            return Err(ColorError::InvalidSpectralShape(format!("norm {norm}")));
        }
        Ok(Self { bands, start_nm, end_nm, norm })
    }

    /// Band spacing, nm.
    #[inline]
    pub fn step(&self) -> f64 {
        (self.end_nm - self.start_nm) / (self.bands - 1) as f64
    }

    /// Wavelength of band `i`, nm.
    #[inline]
    pub fn wavelength(&self, i: usize) -> f64 {
        self.start_nm + self.step() * i as f64
    }

    /// Index of the band closest to `nm`.
    pub fn index_nearest(&self, nm: f64) -> usize {
        let i = ((nm - self.start_nm) / self.step()).round();
        i.clamp(0.0, (self.bands - 1) as f64) as usize
    }

    /// Linearly interpolated spectrum value at `nm`, clamped to the end
    /// bands outside the covered range.
    pub fn sample(&self, spectrum: &[f64], nm: f64) -> f64 {
        let pos = ((nm - self.start_nm) / self.step()).clamp(0.0, (self.bands - 1) as f64);
        let i = (pos.floor() as usize).min(self.bands - 2);
        let t = pos - i as f64;
        lerp(spectrum[i], spectrum[i + 1], t)
    }
}

/// Illuminant used to turn reflectance into colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Illuminant {
    /// CIE D50, the ICC PCS illuminant.
    #[default]
    D50,
    /// CIE illuminant A (2856 K Planckian).
    A,
    /// Equal energy.
    E,
}

impl Illuminant {
    /// Relative spectral power at `nm` (table wavelengths only for D50).
    fn power(self, table_index: usize, nm: f64) -> f64 {
        match self {
            Illuminant::D50 => D50_SPD[table_index],
            Illuminant::A => {
                let num = (PLANCK_C2 / (2856.0 * 560.0)).exp_m1();
                let den = (PLANCK_C2 / (2856.0 * nm)).exp_m1();
                100.0 * (560.0 / nm).powi(5) * num / den
            }
            Illuminant::E => 100.0,
        }
    }
}

impl fmt::Display for Illuminant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Illuminant::D50 => "D50",
            Illuminant::A => "A",
            Illuminant::E => "E",
        };
        f.write_str(s)
    }
}

impl FromStr for Illuminant {
    type Err = ColorError;

    fn from_str(s: &str) -> ColorResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "D50" => Ok(Illuminant::D50),
            "A" => Ok(Illuminant::A),
            "E" => Ok(Illuminant::E),
            _ => Err(ColorError::UnknownIlluminant(s.to_string())),
        }
    }
}

/// Reflectance spectrum to XYZ converter.
#[derive(Debug, Clone)]
pub struct SpectralConverter {
    illuminant: Illuminant,
    // Illuminant-weighted observer, premultiplied and normalized to Y = 1
    weights: Vec<[f64; 3]>,
}

impl SpectralConverter {
    /// Builds a converter for `illuminant` and the 1931 2 degree observer.
    pub fn new(illuminant: Illuminant) -> Self {
        let mut weights: Vec<[f64; 3]> = CIE1931_2
            .iter()
            .enumerate()
            .map(|(i, cmf)| {
                let s = illuminant.power(i, TABLE_START + TABLE_STEP * i as f64);
                [cmf[0] * s, cmf[1] * s, cmf[2] * s]
            })
            .collect();
        let k: f64 = weights.iter().map(|w| w[1]).sum();
        for w in &mut weights {
            for c in w.iter_mut() {
                *c /= k;
            }
        }
        Self { illuminant, weights }
    }

    /// Illuminant this converter integrates under.
    pub fn illuminant(&self) -> Illuminant {
        self.illuminant
    }

    /// Converts a reflectance spectrum laid out as `shape` to XYZ.
    pub fn convert(&self, shape: &SpectralShape, spectrum: &[f64]) -> ColorResult<[f64; 3]> {
        if spectrum.len() != shape.bands {
            return Err(ColorError::SpectrumLength {
                expected: shape.bands,
                actual: spectrum.len(),
            });
        }
        let mut xyz = [0.0; 3];
        for (i, w) in self.weights.iter().enumerate() {
            let nm = TABLE_START + TABLE_STEP * i as f64;
            let r = shape.sample(spectrum, nm) / shape.norm;
            for c in 0..3 {
                xyz[c] += r * w[c];
            }
        }
        Ok(xyz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn shape36() -> SpectralShape {
        SpectralShape::new(36, 380.0, 730.0, 1.0).unwrap()
    }

    #[test]
    fn band_geometry() {
        let s = shape36();
        assert_abs_diff_eq!(s.step(), 10.0);
        assert_abs_diff_eq!(s.wavelength(0), 380.0);
        assert_abs_diff_eq!(s.wavelength(35), 730.0);
        assert_eq!(s.index_nearest(555.0), 18);
        assert_eq!(s.index_nearest(100.0), 0);
        assert_eq!(s.index_nearest(900.0), 35);
    }

    #[test]
    fn sample_interpolates_and_clamps() {
        let s = SpectralShape::new(3, 400.0, 600.0, 1.0).unwrap();
        let spec = [0.0, 1.0, 3.0];
        assert_abs_diff_eq!(s.sample(&spec, 450.0), 0.5);
        assert_abs_diff_eq!(s.sample(&spec, 550.0), 2.0);
        assert_abs_diff_eq!(s.sample(&spec, 300.0), 0.0);
        assert_abs_diff_eq!(s.sample(&spec, 700.0), 3.0);
        assert_abs_diff_eq!(s.sample(&spec, 600.0), 3.0);
    }

    #[test]
    fn perfect_reflector_under_d50() {
        let conv = SpectralConverter::new(Illuminant::D50);
        let xyz = conv.convert(&shape36(), &[1.0; 36]).unwrap();
        assert_abs_diff_eq!(xyz[0], 0.9642, epsilon = 0.01);
        assert_abs_diff_eq!(xyz[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(xyz[2], 0.8249, epsilon = 0.01);
    }

    #[test]
    fn perfect_reflector_under_a() {
        let conv = SpectralConverter::new(Illuminant::A);
        let xyz = conv.convert(&shape36(), &[1.0; 36]).unwrap();
        assert_abs_diff_eq!(xyz[0], 1.0985, epsilon = 0.01);
        assert_abs_diff_eq!(xyz[2], 0.3558, epsilon = 0.01);
    }

    #[test]
    fn norm_scales_reflectance() {
        let shape = SpectralShape::new(36, 380.0, 730.0, 100.0).unwrap();
        let conv = SpectralConverter::new(Illuminant::E);
        let xyz = conv.convert(&shape, &[50.0; 36]).unwrap();
        assert_abs_diff_eq!(xyz[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(SpectralShape::new(1, 380.0, 730.0, 1.0).is_err());
        assert!(SpectralShape::new(36, 730.0, 380.0, 1.0).is_err());
        assert!(SpectralShape::new(36, 380.0, 730.0, 0.0).is_err());
        let conv = SpectralConverter::new(Illuminant::D50);
        assert!(matches!(
            conv.convert(&shape36(), &[1.0; 10]),
            Err(ColorError::SpectrumLength { expected: 36, actual: 10 })
        ));
        assert_eq!("d50".parse::<Illuminant>().unwrap(), Illuminant::D50);
        assert!("F2".parse::<Illuminant>().is_err());
    }
}
