//! Minimizer error types.

use thiserror::Error;

/// Result type for minimizer operations.
pub type MinimizeResult<T> = Result<T, MinimizeError>;

/// Errors that can occur when setting up a minimization.
///
/// Non-convergence is not an error; see [`crate::Minimum::converged`].
#[derive(Debug, Error)]
pub enum MinimizeError {
    /// The problem has no free parameters.
    #[error("nothing to minimize: zero parameters")]
    Empty,

    /// Parameter and search radius vectors differ in length.
    #[error("dimension mismatch: {params} parameters, {radii} search radii")]
    DimensionMismatch {
        /// Number of parameters.
        params: usize,
        /// Number of search radii.
        radii: usize,
    },

    /// The objective is NaN or infinite at the starting point.
    #[error("objective is not finite at the start point: {0}")]
    NonFinite(f64),

    /// The underlying solver gave up with an error.
    #[error("solver failed: {0}")]
    Solver(String),
}

pub(crate) fn solver_error(e: argmin::core::Error) -> MinimizeError {
    MinimizeError::Solver(e.to_string())
}

pub(crate) fn check_setup(p: &[f64], radii: &[f64]) -> MinimizeResult<()> {
    if p.is_empty() {
        return Err(MinimizeError::Empty);
    }
    if p.len() != radii.len() {
        return Err(MinimizeError::DimensionMismatch {
            params: p.len(),
            radii: radii.len(),
        });
    }
    Ok(())
}
