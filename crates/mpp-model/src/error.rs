//! Model error types.

use crate::params::{MAX_BANDS, MAX_INKS};
use mpp_cgats::CgatsError;
use mpp_color::ColorError;
use mpp_math::MinimizeError;
use thiserror::Error;

/// Result type for model operations.
pub type MppResult<T> = Result<T, MppError>;

/// Errors from fitting, querying or persisting a model.
#[derive(Debug, Error)]
pub enum MppError {
    /// Device has more channels than the model supports.
    #[error("{0} colorants, at most {max} supported", max = MAX_INKS)]
    TooManyInks(usize),

    /// Spectral layout has more bands than the model supports.
    #[error("{0} spectral bands, at most {max} supported", max = MAX_BANDS)]
    TooManyBands(usize),

    /// Fitting needs at least one sample.
    #[error("no samples to fit")]
    NoSamples,

    /// A sample does not match the device or spectral layout.
    #[error("sample {index}: {reason}")]
    InvalidSample {
        /// Index in the sample list.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// No black point candidate met the acceptance threshold.
    #[error("black point search failed (best objective {best:.3})")]
    BlackPointSolve {
        /// Best objective value reached.
        best: f64,
    },

    /// Invalid argument to a query or constructor.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed or inconsistent model file.
    #[error("model file: {0}")]
    Format(String),

    /// Operation needs a spectral model.
    #[error("model has no spectral bands")]
    NotSpectral,

    /// Minimizer setup error.
    #[error(transparent)]
    Minimize(#[from] MinimizeError),

    /// Colour utility error.
    #[error(transparent)]
    Color(#[from] ColorError),

    /// CGATS read/write error.
    #[error(transparent)]
    Cgats(#[from] CgatsError),
}
