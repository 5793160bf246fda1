//! # mpp-model
//!
//! Model printer profiles: a compact, analytic model of how a printer or
//! display turns device values into colour.
//!
//! Each output band (X, Y, Z and optionally reflectance at each
//! wavelength) is modelled as:
//!
//! 1. a per channel transfer curve, a sum of rational bias harmonics
//! 2. optional shape parameters that bend each channel's interpolation
//!    weight depending on which other inks are present
//! 3. multilinear interpolation between the measured-like colours of all
//!    `2^n` primary combinations
//!
//! The parameters are fitted to measurements by staged conjugate gradient
//! descent, one band at a time.
//!
//! # Quick Start
//!
//! ```rust
//! use mpp_color::{InkMask, D50};
//! use mpp_model::{Mpp, MppParts};
//!
//! // A one channel grey display, black to D50 white
//! let mask = InkMask::from_chars("W").unwrap();
//! let parts = MppParts::from_primaries(mask, &[[0.0; 3], D50]).unwrap();
//! let mpp = Mpp::from_parts(parts).unwrap();
//!
//! let xyz = mpp.lookup(&[0.5]);
//! assert!((xyz[1] - 0.5).abs() < 1e-12);
//! ```
//!
//! Fitting from measurements:
//!
//! ```rust,no_run
//! use mpp_color::InkMask;
//! use mpp_model::{FitOptions, Mpp, PcsEncoding, Quality, Sample};
//!
//! # fn load() -> Vec<Sample> { Vec::new() }
//! let samples: Vec<Sample> = load();
//! let opts = FitOptions::with_quality(Quality::High);
//! let mpp = Mpp::create(InkMask::CMYK, &samples, &opts)?;
//! mpp.write_mpp("printer.mpp", PcsEncoding::Xyz)?;
//! # Ok::<(), mpp_model::MppError>(())
//! ```
//!
//! # Threading
//!
//! A built [`Mpp`] is immutable apart from [`Mpp::set_ilob`], so lookups can
//! be shared freely between threads. Batch lookups and gamut sampling use
//! rayon internally.
//!
//! # Dependencies
//!
//! - [`mpp-math`] - Minimizers and the rational bias curve
//! - [`mpp-color`] - Lab, ink masks, spectral conversion
//! - [`mpp-cgats`] - Model file format
//! - [`rayon`] - Parallel lookups
//! - [`rand`] - Seeded restarts of the black point search
//! - [`serde`] - Fit tuning from configuration files
//! - [`tracing`] - Fit progress logging
//!
//! # Used By
//!
//! - `mpp-cli` - Command line tool
//! - `mpp-bench` - Benchmarks

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod fit;
pub mod forward;
mod gamut;
mod model;
mod options;
mod params;
mod persist;
mod report;
mod wb;

pub use error::{MppError, MppResult};
pub use gamut::{CuspEvent, GamutSink, GamutSurface};
pub use model::{DeviceClass, Mpp, MppInfo, Sample};
pub use options::{FitOptions, FitTuning, Quality};
pub use params::{
    BandParams, Layout, MAX_BANDS, MAX_INKS, MAX_ORDER, MppParts, XYZ_BANDS, shape_comb, shape_index,
};
pub use persist::{MPP_TABLE, PcsEncoding};
pub use report::FitReport;
pub use wb::{WhiteBlack, WhiteBlackLab};
