//! One dimensional line search.
//!
//! The minimum along a direction is bracketed by golden ratio expansion
//! from the current point, then located inside the bracket with argmin's
//! Brent minimizer.

use crate::error::solver_error;
use crate::MinimizeResult;
use argmin::core::{CostFunction, Error, Executor, State};
use argmin::solver::brent::BrentOpt;
use std::cell::RefCell;

const GOLD: f64 = 1.618034;
const BRACKET_MAX: usize = 60;
const BRENT_MAX: u64 = 100;

/// Result of a line minimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMinimum {
    /// Step taken along the direction, in units of the direction vector.
    pub t: f64,
    /// Objective value at the new point.
    pub value: f64,
}

/// `f` restricted to the line `p + t * dir`.
struct Line<'a, F> {
    f: RefCell<&'a mut F>,
    p: &'a [f64],
    dir: &'a [f64],
    buf: RefCell<Vec<f64>>,
}

impl<F: FnMut(&[f64]) -> f64> Line<'_, F> {
    fn eval(&self, t: f64) -> f64 {
        let mut buf = self.buf.borrow_mut();
        for ((b, &pi), &di) in buf.iter_mut().zip(self.p).zip(self.dir) {
            *b = pi + t * di;
        }
        let mut guard = self.f.borrow_mut();
        let f: &mut F = &mut **guard;
        f(&buf[..])
    }
}

impl<F: FnMut(&[f64]) -> f64> CostFunction for Line<'_, F> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, t: &f64) -> Result<f64, Error> {
        Ok(self.eval(*t))
    }
}

/// Bracket `(lo, hi)` around a minimum plus the best sampled point.
struct Bracket {
    lo: f64,
    hi: f64,
    t: f64,
    value: f64,
}

fn bracket<F: FnMut(&[f64]) -> f64>(line: &Line<'_, F>) -> Bracket {
    let (mut a, fa) = (0.0, line.eval(0.0));
    let (mut b, mut fb) = (1.0, line.eval(1.0));
    if fb > fa {
        (a, b, fb) = (1.0, 0.0, fa);
    }
    let mut c = b + GOLD * (b - a);
    let mut fc = line.eval(c);

    let mut iters = 0;
    while fb > fc && iters < BRACKET_MAX {
        iters += 1;
        a = b;
        b = c;
        fb = fc;
        c = b + GOLD * (b - a);
        fc = line.eval(c);
    }
    Bracket { lo: a.min(c), hi: a.max(c), t: b, value: fb }
}

/// Minimizes `f` along the line `p + t * dir`.
///
/// On return `p` holds the minimizing point and `dir` has been scaled by
/// the step taken, so it holds the actual displacement.
///
/// # Errors
///
/// Returns [`MinimizeError::Solver`](crate::MinimizeError::Solver) if the
/// Brent search fails.
pub fn line_minimize<F>(p: &mut [f64], dir: &mut [f64], f: &mut F) -> MinimizeResult<LineMinimum>
where
    F: FnMut(&[f64]) -> f64,
{
    let (t, value) = {
        let line = Line {
            f: RefCell::new(&mut *f),
            p: &*p,
            dir: &*dir,
            buf: RefCell::new(vec![0.0; p.len()]),
        };
        let br = bracket(&line);
        let res = Executor::new(line, BrentOpt::new(br.lo, br.hi))
            .configure(|state| state.max_iters(BRENT_MAX))
            .run()
            .map_err(solver_error)?;
        let state = res.state();
        match state.get_best_param() {
            Some(&t) if state.get_best_cost() <= br.value => (t, state.get_best_cost()),
            _ => (br.t, br.value),
        }
    };

    for (pi, di) in p.iter_mut().zip(dir.iter_mut()) {
        *di *= t;
        *pi += *di;
    }
    Ok(LineMinimum { t, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn finds_parabola_minimum() {
        let mut p = vec![0.0, 0.0];
        let mut dir = vec![1.0, 2.0];
        let mut f = |x: &[f64]| (x[0] - 3.0).powi(2) + (x[1] - 6.0).powi(2);
        let m = line_minimize(&mut p, &mut dir, &mut f).unwrap();
        assert_abs_diff_eq!(m.t, 3.0, epsilon = 1e-4);
        assert_abs_diff_eq!(p[0], 3.0, epsilon = 1e-4);
        assert_abs_diff_eq!(p[1], 6.0, epsilon = 1e-4);
        assert_abs_diff_eq!(dir[0], 3.0, epsilon = 1e-4);
        assert!(m.value < 1e-7);
    }

    #[test]
    fn searches_backwards() {
        let mut p = vec![1.0];
        let mut dir = vec![1.0];
        let mut f = |x: &[f64]| (x[0] + 2.0).powi(2) + 1.0;
        let m = line_minimize(&mut p, &mut dir, &mut f).unwrap();
        assert_abs_diff_eq!(p[0], -2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(m.value, 1.0, epsilon = 1e-7);
    }

    #[test]
    fn never_moves_uphill() {
        let mut p = vec![0.0];
        let mut dir = vec![1.0];
        let mut f = |x: &[f64]| x[0].abs();
        let m = line_minimize(&mut p, &mut dir, &mut f).unwrap();
        assert!(m.value <= 1e-6);
        assert!(p[0].abs() <= 1e-6);
    }
}
