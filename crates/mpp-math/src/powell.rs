//! Powell's direction set minimizer.

use crate::error::check_setup;
use crate::linmin::line_minimize;
use crate::{Minimum, MinimizeError, MinimizeResult};
use tracing::trace;

const TINY: f64 = 1.0e-25;

/// Minimizes `f` without derivatives.
///
/// The initial search directions are the coordinate axes, each scaled by
/// the matching entry of `radii` (the expected distance to the minimum
/// along that axis). Iteration stops when one sweep over all directions
/// improves the objective by less than `ftol` relative to its magnitude,
/// or after `max_iter` sweeps.
///
/// Each line minimization runs argmin's Brent search, see
/// [`line_minimize`](crate::line_minimize). On return `p` holds the best
/// point found.
///
/// # Errors
///
/// Fails on an invalid setup (no parameters, mismatched `radii`, or an
/// objective that is not finite at the start point) or when a line search
/// fails.
///
/// # Example
///
/// ```rust
/// use mpp_math::powell;
///
/// // Rosenbrock valley
/// let mut p = vec![-1.2, 1.0];
/// let min = powell(&mut p, &[0.5, 0.5], 1e-12, 500, |x| {
///     100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2)
/// })
/// .unwrap();
/// assert!(min.value < 1e-4);
/// ```
pub fn powell<F>(
    p: &mut [f64],
    radii: &[f64],
    ftol: f64,
    max_iter: usize,
    mut f: F,
) -> MinimizeResult<Minimum>
where
    F: FnMut(&[f64]) -> f64,
{
    check_setup(p, radii)?;
    let n = p.len();

    let mut dirs: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let mut d = vec![0.0; n];
            d[i] = if radii[i] > 0.0 { radii[i] } else { 1.0 };
            d
        })
        .collect();

    let mut fret = f(p);
    if !fret.is_finite() {
        return Err(MinimizeError::NonFinite(fret));
    }

    let mut pt = p.to_vec();
    let mut ptt = vec![0.0; n];
    let mut xit = vec![0.0; n];

    for iter in 1..=max_iter {
        let fp = fret;
        let mut ibig = 0;
        let mut del = 0.0;

        for (i, dir) in dirs.iter().enumerate() {
            xit.copy_from_slice(dir);
            let fptt = fret;
            fret = line_minimize(p, &mut xit, &mut f)?.value;
            if fptt - fret > del {
                del = fptt - fret;
                ibig = i;
            }
        }

        trace!(iter, value = fret, "powell sweep");
        if 2.0 * (fp - fret) <= ftol * (fp.abs() + fret.abs()) + TINY {
            return Ok(Minimum { value: fret, iterations: iter, converged: true });
        }

        // Extrapolated point and average direction moved
        for j in 0..n {
            ptt[j] = 2.0 * p[j] - pt[j];
            xit[j] = p[j] - pt[j];
            pt[j] = p[j];
        }
        let fptt = f(&ptt);
        if fptt < fp {
            let t = 2.0 * (fp - 2.0 * fret + fptt) * (fp - fret - del).powi(2)
                - del * (fp - fptt).powi(2);
            if t < 0.0 {
                fret = line_minimize(p, &mut xit, &mut f)?.value;
                dirs.swap(ibig, n - 1);
                dirs[n - 1].copy_from_slice(&xit);
            }
        }
    }

    Ok(Minimum { value: fret, iterations: max_iter, converged: false })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quadratic_bowl() {
        let mut p = vec![0.0, 0.0, 0.0];
        let min = powell(&mut p, &[1.0, 1.0, 1.0], 1e-12, 100, |x| {
            (x[0] - 1.0).powi(2) + 2.0 * (x[1] + 0.5).powi(2) + 3.0 * (x[2] - 0.25).powi(2)
        })
        .unwrap();
        assert!(min.converged);
        assert_abs_diff_eq!(p[0], 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(p[1], -0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(p[2], 0.25, epsilon = 1e-4);
    }

    #[test]
    fn rejects_bad_setup() {
        let mut p: Vec<f64> = vec![];
        assert!(matches!(powell(&mut p, &[], 1e-6, 10, |_| 0.0), Err(MinimizeError::Empty)));

        let mut p = vec![0.0, 0.0];
        assert!(matches!(
            powell(&mut p, &[1.0], 1e-6, 10, |_| 0.0),
            Err(MinimizeError::DimensionMismatch { params: 2, radii: 1 })
        ));

        let mut p = vec![0.0];
        assert!(matches!(
            powell(&mut p, &[1.0], 1e-6, 10, |_| f64::NAN),
            Err(MinimizeError::NonFinite(_))
        ));
    }

    #[test]
    fn reports_iteration_limit() {
        let mut p = vec![-1.2, 1.0];
        let min = powell(&mut p, &[0.1, 0.1], 1e-30, 1, |x| {
            100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2)
        })
        .unwrap();
        assert!(!min.converged);
        assert_eq!(min.iterations, 1);
    }
}
