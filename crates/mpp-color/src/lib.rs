//! # mpp-color
//!
//! Colorimetric building blocks for model printer profiles.
//!
//! - **Lab** - CIE XYZ <-> L*a*b* against the D50 PCS white, delta E, and
//!   the L*-like rescale ([`lde`]) the profile fitter measures error in
//! - **Colorant masks** - [`InkMask`], the compact description of which
//!   inks or display channels a device has
//! - **Spectral** - [`SpectralShape`] band layouts and a
//!   [`SpectralConverter`] from reflectance spectra to XYZ
//!
//! # Architecture
//!
//! ```text
//!        mpp-model
//!            |
//!     +------+------+
//!     |             |
//! mpp-color     mpp-math
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use mpp_color::{InkMask, xyz_to_lab, D50};
//!
//! let mask: InkMask = "CMYK".parse().unwrap();
//! assert_eq!(mask.count(), 4);
//! assert!(!mask.is_additive());
//!
//! let white = xyz_to_lab(D50);
//! assert!((white[0] - 100.0).abs() < 1e-9);
//! ```
//!
//! # Dependencies
//!
//! - [`mpp-math`] - Interpolation helpers
//! - [`glam`] - Vector geometry in Lab space
//! - [`thiserror`] - Error handling
//! - [`serde`] - Illuminant names in configuration files

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod inkmask;
mod lab;
pub mod spectral;

pub use error::{ColorError, ColorResult};
pub use inkmask::{Ink, InkMask};
pub use lab::*;
pub use spectral::{Illuminant, SpectralConverter, SpectralShape};
