//! Per band objectives for the three fitting stages.
//!
//! Each stage optimizes one parameter group of a band (transfer curves,
//! shape parameters, or primary combinations) with the others held fixed.
//! The objective is the weighted mean squared error in L*-like units plus
//! a stage specific regularization term. Values and gradients come from
//! the shared [`forward::evaluate`](crate::forward::evaluate), so every
//! stage's gradient is consistent with its value by construction.

use super::init::FitPoint;
use crate::forward::{Gradient, evaluate};
use crate::options::FitTuning;
use crate::params::{BandParams, Layout};
use mpp_color::{lde, lde_deriv};
use mpp_math::{CostFunction, Minimum, MinimizeResult, ObjectiveError, conjgrad};

/// Parameter group optimized by one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Transfer,
    Shape,
    Combination,
}

impl Stage {
    fn params(self, bp: &BandParams) -> &[f64] {
        match self {
            Stage::Transfer => &bp.tc,
            Stage::Shape => &bp.shape,
            Stage::Combination => &bp.pc,
        }
    }

    fn params_mut(self, bp: &mut BandParams) -> &mut [f64] {
        match self {
            Stage::Transfer => &mut bp.tc,
            Stage::Shape => &mut bp.shape,
            Stage::Combination => &mut bp.pc,
        }
    }

    fn grad(self, g: &Gradient) -> &[f64] {
        match self {
            Stage::Transfer => &g.tc,
            Stage::Shape => &g.shape,
            Stage::Combination => &g.pc,
        }
    }

    /// Initial search radius of each parameter.
    fn radius(self) -> f64 {
        match self {
            Stage::Transfer => 0.5,
            Stage::Shape => 0.5,
            Stage::Combination => 0.05,
        }
    }
}

/// Fitting context of one band. Read only; each stage's minimization borrows it.
pub(crate) struct BandProblem<'a> {
    pub layout: &'a Layout,
    pub points: &'a [FitPoint],
    pub band: usize,
    pub tuning: &'a FitTuning,
    /// Initial primary combination values in L*-like units.
    pub anchors: &'a [f64],
    wsum: f64,
}

impl<'a> BandProblem<'a> {
    pub fn new(
        layout: &'a Layout,
        points: &'a [FitPoint],
        band: usize,
        tuning: &'a FitTuning,
        anchors: &'a [f64],
    ) -> Self {
        let wsum = points.iter().map(|p| p.weight).sum::<f64>();
        Self {
            layout,
            points,
            band,
            tuning,
            anchors,
            wsum: if wsum > 0.0 { wsum } else { 1.0 },
        }
    }

    /// Weighted mean squared error in L*-like units.
    pub fn error(&self, bp: &BandParams) -> f64 {
        let sum: f64 = self
            .points
            .iter()
            .map(|p| {
                let v = evaluate(self.layout, bp, &p.dev, None);
                p.weight * (lde(v) - p.ltarget[self.band]).powi(2)
            })
            .sum();
        sum / self.wsum
    }

    /// Error plus the stage's regularization.
    pub fn objective(&self, stage: Stage, bp: &BandParams) -> f64 {
        self.error(bp) + self.penalty(stage, bp, None)
    }

    /// [`objective`](Self::objective) and its gradient over the stage's
    /// parameters.
    pub fn objective_grad(&self, stage: Stage, bp: &BandParams, out: &mut [f64], scratch: &mut Gradient) -> f64 {
        out.fill(0.0);
        let mut sum = 0.0;
        for p in self.points {
            let v = evaluate(self.layout, bp, &p.dev, Some(scratch));
            let e = lde(v) - p.ltarget[self.band];
            sum += p.weight * e * e;
            let k = 2.0 * p.weight * e * lde_deriv(v) / self.wsum;
            for (o, g) in out.iter_mut().zip(stage.grad(scratch)) {
                *o += k * g;
            }
        }
        sum / self.wsum + self.penalty(stage, bp, Some(out))
    }

    /// Regularization term. Adds its gradient to `grad` when given.
    fn penalty(&self, stage: Stage, bp: &BandParams, mut grad: Option<&mut [f64]>) -> f64 {
        let t = self.tuning;
        let mut pen = 0.0;
        match stage {
            Stage::Transfer => {
                let cord = self.layout.cord;
                for (i, &c) in bp.tc.iter().enumerate() {
                    let w = t.harmonic_weight(i % cord);
                    pen += w * c * c;
                    if let Some(g) = grad.as_deref_mut() {
                        g[i] += 2.0 * w * c;
                    }
                }
            }
            Stage::Shape => {
                if bp.shape.is_empty() {
                    return 0.0;
                }
                let w = t.shape_pmw / bp.shape.len() as f64;
                for (i, &s) in bp.shape.iter().enumerate() {
                    pen += w * s * s;
                    if let Some(g) = grad.as_deref_mut() {
                        g[i] += 2.0 * w * s;
                    }
                }
            }
            Stage::Combination => {
                for (i, (&p, &a)) in bp.pc.iter().zip(self.anchors).enumerate() {
                    let d = lde(p) - a;
                    pen += t.comb_pmw * d * d;
                    let mut dp = 2.0 * t.comb_pmw * d * lde_deriv(p);
                    if p < 0.0 {
                        pen += t.comb_neg_weight * p * p;
                        dp += 2.0 * t.comb_neg_weight * p;
                    }
                    if let Some(g) = grad.as_deref_mut() {
                        g[i] += dp;
                    }
                }
            }
        }
        pen
    }

    /// Runs conjugate gradient over one stage, updating `bp` in place.
    pub fn minimize(&self, stage: Stage, bp: &mut BandParams, tol: f64) -> MinimizeResult<Minimum> {
        let mut start = stage.params(bp).to_vec();
        let radii = vec![stage.radius(); start.len()];
        let min = {
            let problem = StageProblem { band: self, stage, base: &*bp };
            conjgrad(&mut start, &radii, tol, self.tuning.max_iter, &problem)?
        };
        stage.params_mut(bp).copy_from_slice(&start);
        Ok(min)
    }
}

/// One stage of a band, over that stage's parameters only.
struct StageProblem<'p, 'a> {
    band: &'p BandProblem<'a>,
    stage: Stage,
    base: &'p BandParams,
}

impl StageProblem<'_, '_> {
    fn with(&self, p: &[f64]) -> BandParams {
        let mut bp = self.base.clone();
        self.stage.params_mut(&mut bp).copy_from_slice(p);
        bp
    }
}

impl CostFunction for StageProblem<'_, '_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Vec<f64>) -> Result<f64, ObjectiveError> {
        Ok(self.band.objective(self.stage, &self.with(p)))
    }
}

impl mpp_math::Gradient for StageProblem<'_, '_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, p: &Vec<f64>) -> Result<Vec<f64>, ObjectiveError> {
        let mut out = vec![0.0; p.len()];
        let mut scratch = Gradient::new(self.band.layout);
        self.band.objective_grad(self.stage, &self.with(p), &mut out, &mut scratch);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sample;
    use crate::fit::init::prepare_points;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn setup() -> (Layout, Vec<FitPoint>, BandParams) {
        let mut rng = StdRng::seed_from_u64(21);
        let layout = Layout::new(2, 3, true);
        let samples: Vec<Sample> = (0..25)
            .map(|_| {
                let dev = vec![rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)];
                let y = 0.9 * (1.0 - 0.7 * dev[0]) * (1.0 - 0.5 * dev[1]);
                Sample::new(dev, [y; 3])
            })
            .collect();
        let points = prepare_points(&samples, 2, 0).unwrap();
        let mut bp = BandParams::zeroed(&layout);
        for t in &mut bp.tc {
            *t = rng.gen_range(-1.0..1.0);
        }
        for s in &mut bp.shape {
            *s = rng.gen_range(-0.5..0.5);
        }
        bp.pc = vec![0.9, 0.3, 0.45, 0.1];
        bp.pc[3] = -0.02;
        (layout, points, bp)
    }

    #[test]
    fn gradients_match_values() {
        let (layout, points, bp) = setup();
        let tuning = FitTuning::default();
        let anchors: Vec<f64> = [0.85, 0.25, 0.5, 0.05].iter().map(|&v| lde(v)).collect();
        let prob = BandProblem::new(&layout, &points, 1, &tuning, &anchors);
        let mut scratch = Gradient::new(&layout);
        let h = 1e-6;

        for stage in [Stage::Transfer, Stage::Shape, Stage::Combination] {
            let np = stage.params(&bp).len();
            let mut g = vec![0.0; np];
            let v = prob.objective_grad(stage, &bp, &mut g, &mut scratch);
            assert_relative_eq!(v, prob.objective(stage, &bp), max_relative = 1e-12);

            for i in 0..np {
                let mut up = bp.clone();
                let mut dn = bp.clone();
                stage.params_mut(&mut up)[i] += h;
                stage.params_mut(&mut dn)[i] -= h;
                let fd = (prob.objective(stage, &up) - prob.objective(stage, &dn)) / (2.0 * h);
                assert_relative_eq!(g[i], fd, epsilon = 1e-4, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn stages_reduce_objective() {
        let (layout, points, mut bp) = setup();
        let tuning = FitTuning::default();
        let anchors: Vec<f64> = bp.pc.iter().map(|&v| lde(v)).collect();
        let prob = BandProblem::new(&layout, &points, 1, &tuning, &anchors);
        for stage in [Stage::Transfer, Stage::Shape, Stage::Combination] {
            let before = prob.objective(stage, &bp);
            let min = prob.minimize(stage, &mut bp, 1e-6).unwrap();
            assert!(min.value <= before + 1e-12);
            assert_relative_eq!(min.value, prob.objective(stage, &bp), max_relative = 1e-9);
        }
    }
}
