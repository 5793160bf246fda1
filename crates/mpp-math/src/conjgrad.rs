//! Conjugate gradient minimizer.

use crate::error::{check_setup, solver_error};
use crate::{Minimum, MinimizeError, MinimizeResult};
use argmin::core::{
    CostFunction, Error, Executor, Gradient, State, TerminationReason, TerminationStatus,
};
use argmin::solver::conjugategradient::NonlinearConjugateGradient;
use argmin::solver::conjugategradient::beta::PolakRibiere;
use argmin::solver::linesearch::MoreThuenteLineSearch;
use tracing::{debug, trace};

const EPS: f64 = 1.0e-18;
const RESTART_ORTHOGONALITY: f64 = 0.1;

/// A problem seen in coordinates divided by the search radii.
struct Scaled<'a, O> {
    inner: &'a O,
    scale: &'a [f64],
}

impl<O> Scaled<'_, O> {
    fn unscale(&self, q: &[f64]) -> Vec<f64> {
        q.iter().zip(self.scale).map(|(&qi, &si)| qi * si).collect()
    }
}

impl<O> CostFunction for Scaled<'_, O>
where
    O: CostFunction<Param = Vec<f64>, Output = f64>,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, q: &Vec<f64>) -> Result<f64, Error> {
        self.inner.cost(&self.unscale(q))
    }
}

impl<O> Gradient for Scaled<'_, O>
where
    O: Gradient<Param = Vec<f64>, Gradient = Vec<f64>>,
{
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, q: &Vec<f64>) -> Result<Vec<f64>, Error> {
        let mut g = self.inner.gradient(&self.unscale(q))?;
        for (gi, &si) in g.iter_mut().zip(self.scale) {
            *gi *= si;
        }
        Ok(g)
    }
}

/// Outcome of one restart cycle.
struct Cycle {
    best: Vec<f64>,
    value: f64,
    iterations: usize,
    hit_limit: bool,
}

fn cycle<O>(problem: &Scaled<'_, O>, start: &[f64], iters: usize) -> Result<Cycle, Error>
where
    O: CostFunction<Param = Vec<f64>, Output = f64> + Gradient<Param = Vec<f64>, Gradient = Vec<f64>>,
{
    let linesearch: MoreThuenteLineSearch<Vec<f64>, Vec<f64>, f64> = MoreThuenteLineSearch::new();
    let solver = NonlinearConjugateGradient::new(linesearch, PolakRibiere::new())
        .restart_orthogonality(RESTART_ORTHOGONALITY);
    let scaled = Scaled { inner: problem.inner, scale: problem.scale };

    let res = Executor::new(scaled, solver)
        .configure(|state| state.param(start.to_vec()).max_iters(iters as u64))
        .run()?;
    let state = res.state();
    Ok(Cycle {
        best: state.get_best_param().cloned().unwrap_or_else(|| start.to_vec()),
        value: state.get_best_cost(),
        iterations: state.get_iter() as usize,
        hit_limit: matches!(
            state.get_termination_status(),
            TerminationStatus::Terminated(TerminationReason::MaxItersReached)
        ),
    })
}

/// Minimizes a problem using its gradient.
///
/// Runs argmin's nonlinear conjugate gradient with the Polak-Ribiere
/// update and a More-Thuente line search. The search restarts from the
/// steepest descent direction every `n` iterations, where `n` is the
/// number of parameters. If a conjugate direction fails to descend the
/// remaining iterations fall back to steepest descent.
///
/// The search runs in coordinates scaled by `radii`, so parameters with
/// very different natural ranges are stepped comparably. Iteration stops
/// when a restart cycle improves the objective by less than `ftol`
/// relative to its magnitude, when no descent direction remains, or after
/// `max_iter` iterations.
///
/// On return `p` holds the best point found.
///
/// # Errors
///
/// Fails only on an invalid setup: no parameters, mismatched `radii`, or
/// an objective that is not finite at the start point.
pub fn conjgrad<O>(
    p: &mut [f64],
    radii: &[f64],
    ftol: f64,
    max_iter: usize,
    problem: &O,
) -> MinimizeResult<Minimum>
where
    O: CostFunction<Param = Vec<f64>, Output = f64> + Gradient<Param = Vec<f64>, Gradient = Vec<f64>>,
{
    check_setup(p, radii)?;
    let scale: Vec<f64> = radii.iter().map(|&r| if r > 0.0 { r } else { 1.0 }).collect();
    let scaled = Scaled { inner: problem, scale: &scale };

    let mut q: Vec<f64> = p.iter().zip(&scale).map(|(&pi, &si)| pi / si).collect();
    let mut fp = scaled.cost(&q).map_err(solver_error)?;
    if !fp.is_finite() {
        return Err(MinimizeError::NonFinite(fp));
    }

    let mut result = Minimum { value: fp, iterations: 0, converged: false };
    let mut span = p.len();
    while result.iterations < max_iter {
        let iters = span.min(max_iter - result.iterations);
        let run = match cycle(&scaled, &q, iters) {
            Ok(run) => run,
            Err(e) if span > 1 => {
                debug!(error = %e, "conjugate direction failed, continuing with steepest descent");
                span = 1;
                continue;
            }
            Err(e) => {
                trace!(error = %e, "no descent direction left");
                result.converged = true;
                break;
            }
        };

        result.iterations += run.iterations.max(1);
        if run.value < fp {
            q = run.best;
            result.value = run.value;
        }
        trace!(iterations = result.iterations, value = result.value, "conjgrad cycle");

        let stalled = 2.0 * (fp - result.value).abs() <= ftol * (fp.abs() + result.value.abs() + EPS);
        fp = result.value;
        if stalled || !run.hit_limit {
            result.converged = true;
            break;
        }
    }
    result.iterations = result.iterations.min(max_iter);

    for ((pi, &qi), &si) in p.iter_mut().zip(&q).zip(&scale) {
        *pi = qi * si;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct Bowl;

    impl Bowl {
        fn value(x: &[f64]) -> f64 {
            (x[0] - 2.0).powi(2) + 10.0 * (x[1] + 1.0).powi(2) + x[0] * x[1]
        }
    }

    impl CostFunction for Bowl {
        type Param = Vec<f64>;
        type Output = f64;

        fn cost(&self, x: &Vec<f64>) -> Result<f64, Error> {
            Ok(Self::value(x))
        }
    }

    impl Gradient for Bowl {
        type Param = Vec<f64>;
        type Gradient = Vec<f64>;

        fn gradient(&self, x: &Vec<f64>) -> Result<Vec<f64>, Error> {
            Ok(vec![2.0 * (x[0] - 2.0) + x[1], 20.0 * (x[1] + 1.0) + x[0]])
        }
    }

    struct Parabola;

    impl CostFunction for Parabola {
        type Param = Vec<f64>;
        type Output = f64;

        fn cost(&self, x: &Vec<f64>) -> Result<f64, Error> {
            Ok((x[0] - 1.0).powi(2))
        }
    }

    impl Gradient for Parabola {
        type Param = Vec<f64>;
        type Gradient = Vec<f64>;

        fn gradient(&self, x: &Vec<f64>) -> Result<Vec<f64>, Error> {
            Ok(vec![2.0 * (x[0] - 1.0)])
        }
    }

    #[test]
    fn minimizes_coupled_quadratic() {
        // Stationary point of Bowl: 2x + y = 4, x + 20y = -20
        let y = (-20.0 - 2.0) / (20.0 - 0.5);
        let x = (4.0 - y) / 2.0;

        let mut p = vec![0.0, 0.0];
        let min = conjgrad(&mut p, &[1.0, 0.2], 1e-12, 200, &Bowl).unwrap();
        assert!(min.converged);
        assert_abs_diff_eq!(p[0], x, epsilon = 1e-4);
        assert_abs_diff_eq!(p[1], y, epsilon = 1e-4);
        assert_abs_diff_eq!(min.value, Bowl::value(&p), epsilon = 1e-9);
    }

    #[test]
    fn starting_at_minimum_converges_immediately() {
        let mut p = vec![1.0];
        let min = conjgrad(&mut p, &[1.0], 1e-10, 50, &Parabola).unwrap();
        assert!(min.converged);
        assert_abs_diff_eq!(p[0], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn iteration_count_respects_limit() {
        let mut p = vec![-3.0, 4.0];
        let min = conjgrad(&mut p, &[1.0, 1.0], 0.0, 1, &Bowl).unwrap();
        assert!(min.iterations <= 1);
        assert!(min.value < Bowl::value(&[-3.0, 4.0]));
    }

    #[test]
    fn rejects_bad_setup() {
        let mut p: Vec<f64> = vec![];
        assert!(matches!(conjgrad(&mut p, &[], 1e-6, 10, &Parabola), Err(MinimizeError::Empty)));
        let mut p = vec![0.0, 1.0];
        assert!(matches!(
            conjgrad(&mut p, &[1.0], 1e-6, 10, &Bowl),
            Err(MinimizeError::DimensionMismatch { params: 2, radii: 1 })
        ));
    }
}
