//! Scalar interpolation and warping helpers.
//!
//! - Linear interpolation ([`lerp`])
//! - Clamping ([`clamp`], [`saturate`])
//! - Rational bias ([`rational_bias`]), the monotonic [0,1] warp that the
//!   profile model builds its transfer curves and ink interaction terms from
//!
//! # Usage
//!
//! ```rust
//! use mpp_math::{lerp, rational_bias};
//!
//! assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
//!
//! // Zero bias is the identity
//! assert_eq!(rational_bias(0.0, 0.3), 0.3);
//! ```

/// Linear interpolation between two values.
///
/// Returns `a` when `t = 0.0`, and `b` when `t = 1.0`.
/// For values outside [0, 1], the result is extrapolated.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Clamps a value to the range [min, max].
///
/// # Example
///
/// ```rust
/// use mpp_math::clamp;
///
/// assert_eq!(clamp(-0.5, 0.0, 1.0), 0.0);
/// assert_eq!(clamp(1.5, 0.0, 1.0), 1.0);
/// ```
#[inline]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Clamps a value to [0, 1].
#[inline]
pub fn saturate(value: f64) -> f64 {
    clamp(value, 0.0, 1.0)
}

/// Rational bias curve on [0, 1].
///
/// A variant of Schlick's fast bias function with the control parameter
/// remapped from (0, 1) to (-inf, +inf), which keeps the search space of a
/// minimizer close to linear:
///
/// ```text
/// g >= 0:  v / (g - g*v + 1)
/// g <  0:  (v - g*v) / (1 - g*v)
/// ```
///
/// Maps [0, 1] onto [0, 1] monotonically for any `g`, fixes both end
/// points, and is the identity when `g = 0`. Positive `g` bends the curve
/// down, negative `g` bends it up.
#[inline]
pub fn rational_bias(g: f64, v: f64) -> f64 {
    if g >= 0.0 {
        v / (g - g * v + 1.0)
    } else {
        (v - g * v) / (1.0 - g * v)
    }
}

/// [`rational_bias`] together with its partial derivatives.
///
/// Returns `(value, d/dv, d/dg)`. Both partials are continuous across
/// `g = 0`.
#[inline]
pub fn rational_bias_partials(g: f64, v: f64) -> (f64, f64, f64) {
    if g >= 0.0 {
        let den = g - g * v + 1.0;
        let den2 = den * den;
        (v / den, (1.0 + g) / den2, -v * (1.0 - v) / den2)
    } else {
        let den = 1.0 - g * v;
        let den2 = den * den;
        ((v - g * v) / den, (1.0 - g) / den2, -v * (1.0 - v) / den2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 10.0, 0.0), 0.0);
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
        assert_eq!(lerp(0.0, 10.0, 1.0), 10.0);
    }

    #[test]
    fn test_saturate() {
        assert_eq!(saturate(-0.5), 0.0);
        assert_eq!(saturate(0.5), 0.5);
        assert_eq!(saturate(1.5), 1.0);
    }

    #[test]
    fn bias_identity_at_zero() {
        for i in 0..=100 {
            let v = i as f64 / 100.0;
            assert_eq!(rational_bias(0.0, v), v);
        }
    }

    #[test]
    fn bias_stays_in_unit_range() {
        for gi in -50..=50 {
            let g = gi as f64 / 10.0;
            for i in 0..=200 {
                let v = i as f64 / 200.0;
                let w = rational_bias(g, v);
                assert!((0.0..=1.0 + 1e-12).contains(&w), "g={g} v={v} -> {w}");
            }
            assert_abs_diff_eq!(rational_bias(g, 0.0), 0.0);
            assert_abs_diff_eq!(rational_bias(g, 1.0), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn bias_is_monotonic() {
        for g in [-4.0, -1.6, -0.3, 0.0, 0.7, 3.0] {
            let mut last = -1.0;
            for i in 0..=100 {
                let w = rational_bias(g, i as f64 / 100.0);
                assert!(w > last);
                last = w;
            }
        }
    }

    #[test]
    fn bias_partials_match_finite_differences() {
        let h = 1e-6;
        for g in [-2.5, -0.4, 0.3, 1.8] {
            for v in [0.1, 0.45, 0.9] {
                let (w, dv, dg) = rational_bias_partials(g, v);
                assert_abs_diff_eq!(w, rational_bias(g, v), epsilon = 1e-15);
                let fdv = (rational_bias(g, v + h) - rational_bias(g, v - h)) / (2.0 * h);
                let fdg = (rational_bias(g + h, v) - rational_bias(g - h, v)) / (2.0 * h);
                assert_abs_diff_eq!(dv, fdv, epsilon = 1e-6);
                assert_abs_diff_eq!(dg, fdg, epsilon = 1e-6);
            }
        }
    }
}
