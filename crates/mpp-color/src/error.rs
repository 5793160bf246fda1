//! Error types for colorimetric operations.

use thiserror::Error;

/// Colorimetry error.
#[derive(Debug, Error)]
pub enum ColorError {
    /// Colorant string contains a character that names no ink.
    #[error("unknown colorant '{0}'")]
    UnknownInk(char),

    /// Colorant string is empty or repeats an ink.
    #[error("invalid colorant description: {0}")]
    InvalidInkString(String),

    /// Spectral band layout is unusable.
    #[error("invalid spectral shape: {0}")]
    InvalidSpectralShape(String),

    /// Spectrum has the wrong number of bands for its shape.
    #[error("spectrum has {actual} bands, expected {expected}")]
    SpectrumLength {
        /// Bands in the shape.
        expected: usize,
        /// Bands supplied.
        actual: usize,
    },

    /// Illuminant name not recognised.
    #[error("unknown illuminant: {0}")]
    UnknownIlluminant(String),
}

/// Result type for colorimetric operations.
pub type ColorResult<T> = Result<T, ColorError>;
