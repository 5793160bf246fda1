//! CIE L*a*b* conversions and the perceptual error rescale.
//!
//! All XYZ values are relative to a perfect diffuser with Y = 1.0, and Lab
//! is always taken against the D50 PCS white.

use glam::DVec3;

/// D50 PCS white point (ICC), Y normalized to 1.0.
pub const D50: [f64; 3] = [0.9642, 1.0, 0.8249];

/// Knee of the L* curve, `(6/29)^3`.
pub const LSTAR_KNEE: f64 = 216.0 / 24389.0;

/// Slope of the linear toe of the L* curve, `(29/3)^3`.
pub const LSTAR_SLOPE: f64 = 24389.0 / 27.0;

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > LSTAR_KNEE {
        t.cbrt()
    } else {
        (LSTAR_SLOPE * t + 16.0) / 116.0
    }
}

#[inline]
fn lab_f_inv(f: f64) -> f64 {
    let t = f * f * f;
    if t > LSTAR_KNEE {
        t
    } else {
        (116.0 * f - 16.0) / LSTAR_SLOPE
    }
}

/// Converts XYZ to L*a*b* (D50).
///
/// # Example
///
/// ```rust
/// use mpp_color::{xyz_to_lab, D50};
///
/// let lab = xyz_to_lab([0.0, 0.0, 0.0]);
/// assert_eq!(lab, [0.0, 0.0, 0.0]);
/// ```
pub fn xyz_to_lab(xyz: [f64; 3]) -> [f64; 3] {
    let fx = lab_f(xyz[0] / D50[0]);
    let fy = lab_f(xyz[1] / D50[1]);
    let fz = lab_f(xyz[2] / D50[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// Converts L*a*b* (D50) to XYZ.
pub fn lab_to_xyz(lab: [f64; 3]) -> [f64; 3] {
    let fy = (lab[0] + 16.0) / 116.0;
    let fx = fy + lab[1] / 500.0;
    let fz = fy - lab[2] / 200.0;
    let y = if lab[0] > LSTAR_SLOPE * LSTAR_KNEE {
        fy * fy * fy
    } else {
        lab[0] / LSTAR_SLOPE
    };
    [D50[0] * lab_f_inv(fx), D50[1] * y, D50[2] * lab_f_inv(fz)]
}

/// CIE76 colour difference.
#[inline]
pub fn delta_e(a: [f64; 3], b: [f64; 3]) -> f64 {
    DVec3::from_array(a).distance(DVec3::from_array(b))
}

/// L*-like rescale of a single band value.
///
/// The L* lightness formula applied to any band (X, Y, Z or a spectral
/// reflectance), so that fitting error is weighted roughly by visual
/// significance: `116 * x^(1/3) - 16` above [`LSTAR_KNEE`], linear below.
/// Negative values extend the linear toe.
#[inline]
pub fn lde(x: f64) -> f64 {
    if x > LSTAR_KNEE {
        116.0 * x.cbrt() - 16.0
    } else {
        LSTAR_SLOPE * x
    }
}

/// Derivative of [`lde`].
#[inline]
pub fn lde_deriv(x: f64) -> f64 {
    if x > LSTAR_KNEE {
        let c = x.cbrt();
        116.0 / (3.0 * c * c)
    } else {
        LSTAR_SLOPE
    }
}

/// Inverse of [`lde`].
#[inline]
pub fn lde_inv(l: f64) -> f64 {
    if l > LSTAR_SLOPE * LSTAR_KNEE {
        let f = (l + 16.0) / 116.0;
        f * f * f
    } else {
        l / LSTAR_SLOPE
    }
}

/// Perpendicular distance of `p` from the line through `a` and `b`.
///
/// Falls back to the distance from `a` when the line is degenerate.
pub fn line_distance(p: [f64; 3], a: [f64; 3], b: [f64; 3]) -> f64 {
    let p = DVec3::from_array(p);
    let a = DVec3::from_array(a);
    let dir = DVec3::from_array(b) - a;
    let len2 = dir.length_squared();
    if len2 < 1e-12 {
        return p.distance(a);
    }
    let t = (p - a).dot(dir) / len2;
    p.distance(a + dir * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn white_is_l100() {
        let lab = xyz_to_lab(D50);
        assert_abs_diff_eq!(lab[0], 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lab[1], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lab[2], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn lab_round_trip() {
        for xyz in [[0.2, 0.3, 0.1], [0.001, 0.002, 0.0015], [0.9, 0.95, 0.7], [0.5, 0.2, 0.6]] {
            let back = lab_to_xyz(xyz_to_lab(xyz));
            for i in 0..3 {
                assert_abs_diff_eq!(back[i], xyz[i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn lde_matches_lstar_on_y() {
        for y in [0.001, 0.05, 0.18, 0.5, 1.0] {
            assert_abs_diff_eq!(lde(y), xyz_to_lab([D50[0] * y, y, D50[2] * y])[0], epsilon = 1e-9);
        }
    }

    #[test]
    fn lde_is_continuous_at_knee() {
        let below = lde(LSTAR_KNEE * (1.0 - 1e-9));
        let above = lde(LSTAR_KNEE * (1.0 + 1e-9));
        assert_abs_diff_eq!(below, above, epsilon = 1e-6);
        assert_abs_diff_eq!(
            lde_deriv(LSTAR_KNEE * (1.0 - 1e-9)),
            lde_deriv(LSTAR_KNEE * (1.0 + 1e-9)),
            epsilon = 1e-3
        );
    }

    #[test]
    fn lde_derivative_and_inverse() {
        let h = 1e-7;
        for x in [-0.01, 0.004, 0.02, 0.3, 0.9] {
            let fd = (lde(x + h) - lde(x - h)) / (2.0 * h);
            assert_abs_diff_eq!(lde_deriv(x), fd, epsilon = 1e-4 * fd.abs().max(1.0));
            assert_abs_diff_eq!(lde_inv(lde(x)), x, epsilon = 1e-12);
        }
    }

    #[test]
    fn distance_from_line() {
        let d = line_distance([0.0, 3.0, 4.0], [0.0, 0.0, 0.0], [10.0, 0.0, 0.0]);
        assert_abs_diff_eq!(d, 5.0, epsilon = 1e-12);
        let d = line_distance([1.0, 1.0, 1.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
        assert_abs_diff_eq!(d, 3f64.sqrt(), epsilon = 1e-12);
    }
}
