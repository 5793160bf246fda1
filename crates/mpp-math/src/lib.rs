//! # mpp-math
//!
//! Numeric utilities for fitting model printer profiles.
//!
//! This crate provides the numeric primitives the profile fitter relies on:
//!
//! - [`powell`] - derivative-free minimization (Powell's direction set method)
//! - [`conjgrad`] - gradient minimization (argmin's Polak-Ribiere conjugate gradient)
//! - [`line_minimize`] - bracketing plus argmin's Brent search, used by [`powell`]
//! - Scalar helpers ([`lerp`], [`saturate`], [`rational_bias`])
//!
//! # Design
//!
//! Gradient based problems implement argmin's [`CostFunction`] and
//! [`Gradient`] on a context struct that borrows whatever the objective
//! needs (test points, fixed parameters, weights). The derivative-free
//! [`powell`] takes a plain closure. Either way there is no global
//! optimization state:
//!
//! ```rust
//! use mpp_math::powell;
//!
//! let target = [1.0, -2.0];
//! let mut p = vec![0.0, 0.0];
//! let min = powell(&mut p, &[0.5, 0.5], 1e-10, 200, |x| {
//!     (x[0] - target[0]).powi(2) + (x[1] - target[1]).powi(2)
//! })
//! .unwrap();
//!
//! assert!(min.value < 1e-8);
//! assert!((p[0] - 1.0).abs() < 1e-4);
//! ```
//!
//! # Dependencies
//!
//! - [`argmin`] - Conjugate gradient, More-Thuente and Brent solvers
//! - `argmin-math` - Vector arithmetic for `Vec<f64>` parameters
//! - [`thiserror`] - Error handling
//! - [`tracing`] - Diagnostics
//!
//! # Used By
//!
//! - `mpp-model` - Transfer/shape/primary fitting and the black point solver

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod conjgrad;
mod error;
mod interp;
mod linmin;
mod powell;

pub use argmin::core::{CostFunction, Error as ObjectiveError, Gradient};
pub use conjgrad::conjgrad;
pub use error::{MinimizeError, MinimizeResult};
pub use interp::*;
pub use linmin::{line_minimize, LineMinimum};
pub use powell::powell;

/// Outcome of a multi-dimensional minimization.
///
/// Running out of iterations is not an error: the best point found so far
/// is left in the caller's parameter vector and `converged` is `false`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    /// Objective value at the returned point.
    pub value: f64,
    /// Number of outer iterations performed.
    pub iterations: usize,
    /// Whether the tolerance test was met before `max_iter`.
    pub converged: bool,
}
