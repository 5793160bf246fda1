//! Forward model: device values to one band value.
//!
//! For each band the model runs three stages:
//!
//! 1. **Transfer**: each channel value goes through its own harmonic
//!    transfer curve ([`transfer`]).
//! 2. **Shape**: each channel gets a rational bias whose strength is the
//!    n-linear interpolation of its shape parameters over the other
//!    channels' transfer values.
//! 3. **Interpolation**: the n-linear (Neugebauer) blend of the primary
//!    combination values, weighted by the shaped channel values.
//!
//! [`evaluate`] computes the value and, when asked, every partial
//! derivative in the same pass: with respect to the device values, the
//! transfer coefficients, the shape parameters and the primary
//! combinations. The fitter's objectives, their gradients and
//! [`Mpp::band_value_deriv`](crate::Mpp::band_value_deriv) all use it.

use crate::params::{BandParams, Layout, MAX_INKS, shape_comb, shape_index};
use mpp_math::{rational_bias, rational_bias_partials, saturate};

/// Partial derivatives of one band value.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    /// With respect to each device value.
    pub dev: Vec<f64>,
    /// With respect to each transfer coefficient, laid out like
    /// [`BandParams::tc`].
    pub tc: Vec<f64>,
    /// With respect to each shape parameter, laid out like
    /// [`BandParams::shape`].
    pub shape: Vec<f64>,
    /// With respect to each primary combination value.
    pub pc: Vec<f64>,
}

impl Gradient {
    /// Zeroed gradient for `layout`.
    pub fn new(layout: &Layout) -> Self {
        Self {
            dev: vec![0.0; layout.n],
            tc: vec![0.0; layout.n_transfer()],
            shape: vec![0.0; layout.n_shape()],
            pc: vec![0.0; layout.nn],
        }
    }
}

/// Harmonic transfer curve.
///
/// Order `o` splits [0, 1] into `o + 1` sections and applies a rational
/// bias of strength `coef[o]` within each, alternating its sign so
/// adjacent sections join smoothly. All coefficients zero is the identity.
///
/// ```rust
/// use mpp_model::forward::transfer;
///
/// assert_eq!(transfer(&[0.0, 0.0, 0.0], 0.37), 0.37);
/// assert!(transfer(&[-1.6], 0.5) > 0.5);
/// ```
pub fn transfer(coef: &[f64], x: f64) -> f64 {
    transfer_partials(coef, x, None).0
}

/// [`transfer`] and its derivative with respect to `x`. If `dcoef` is
/// given it receives the derivative with respect to each coefficient.
pub fn transfer_partials(coef: &[f64], x: f64, mut dcoef: Option<&mut [f64]>) -> (f64, f64) {
    let mut vv = x;
    let mut dx = 1.0;
    for (o, &c) in coef.iter().enumerate() {
        let nsec = (o + 1) as f64;
        let scaled = vv * nsec;
        let sec = scaled.floor();
        let odd = (sec as i64) & 1 == 1;
        let g = if odd { -c } else { c };
        let (w, w_v, w_g) = rational_bias_partials(g, scaled - sec);
        let active = c != 0.0;
        if let Some(d) = dcoef.as_deref_mut() {
            if active {
                for e in &mut d[..o] {
                    *e *= w_v;
                }
            }
            d[o] = (if odd { -w_g } else { w_g }) / nsec;
        }
        // Zero harmonics leave the value bit exact
        if active {
            vv = (w + sec) / nsec;
            dx *= w_v;
        }
    }
    (vv, dx)
}

/// Weight of corner `comb` in an n-linear blend of `v`, leaving out the
/// channels whose bits are set in `skip`.
#[inline]
fn corner_weight(v: &[f64], comb: usize, skip: usize) -> f64 {
    let mut w = 1.0;
    for (j, &vj) in v.iter().enumerate() {
        let bit = 1 << j;
        if skip & bit == 0 {
            w *= if comb & bit != 0 { vj } else { 1.0 - vj };
        }
    }
    w
}

/// Band value at `dev`, plus its partials if `grad` is given.
///
/// Device values are clamped to [0, 1]. `dev` must have at least
/// `layout.n` entries.
pub fn evaluate(layout: &Layout, bp: &BandParams, dev: &[f64], mut grad: Option<&mut Gradient>) -> f64 {
    let n = layout.n;
    let cord = layout.cord;

    // Transfer curves
    let mut tv = [0.0; MAX_INKS];
    let mut dtdx = [0.0; MAX_INKS];
    for m in 0..n {
        let coef = &bp.tc[m * cord..(m + 1) * cord];
        let dcoef = grad.as_deref_mut().map(|g| &mut g.tc[m * cord..(m + 1) * cord]);
        (tv[m], dtdx[m]) = transfer_partials(coef, saturate(dev[m]), dcoef);
    }
    let tv = &tv[..n];

    // Shape warp
    let mut u = [0.0; MAX_INKS];
    u[..n].copy_from_slice(tv);
    let mut wv = [1.0; MAX_INKS];
    let mut wg = [0.0; MAX_INKS];
    let mut dg = [[0.0; MAX_INKS]; MAX_INKS];
    let half = layout.shape_per_channel();
    if half > 0 {
        for m in 0..n {
            let bit = 1 << m;
            let s = &bp.shape[m * half..(m + 1) * half];
            let g: f64 = s
                .iter()
                .enumerate()
                .map(|(i, &sv)| sv * corner_weight(tv, shape_comb(m, i), bit))
                .sum();

            if grad.is_none() {
                u[m] = rational_bias(g, tv[m]);
                continue;
            }
            (u[m], wv[m], wg[m]) = rational_bias_partials(g, tv[m]);

            // How g[m] moves with each other channel's transfer value
            for k in (0..n).filter(|&k| k != m) {
                let kb = 1 << k;
                dg[m][k] = s
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &sv)| {
                        let c = shape_comb(m, i);
                        (c & kb == 0).then(|| {
                            (s[shape_index(m, c | kb)] - sv) * corner_weight(tv, c, bit | kb)
                        })
                    })
                    .sum();
            }
        }
    }
    let u = &u[..n];

    // N-linear interpolation
    let mut out = 0.0;
    for (c, &p) in bp.pc.iter().enumerate() {
        out += p * corner_weight(u, c, 0);
    }
    let Some(grad) = grad else {
        return out;
    };

    for (c, d) in grad.pc.iter_mut().enumerate() {
        *d = corner_weight(u, c, 0);
    }

    let mut dout_du = [0.0; MAX_INKS];
    for (m, d) in dout_du[..n].iter_mut().enumerate() {
        let bit = 1 << m;
        *d = (0..layout.nn)
            .filter(|c| c & bit == 0)
            .map(|c| (bp.pc[c | bit] - bp.pc[c]) * corner_weight(u, c, bit))
            .sum();
    }

    for k in 0..n {
        let mut total = dout_du[k] * wv[k];
        for m in (0..n).filter(|&m| m != k) {
            total += dout_du[m] * wg[m] * dg[m][k];
        }
        grad.dev[k] = total * dtdx[k];
        for d in &mut grad.tc[k * cord..(k + 1) * cord] {
            *d *= total;
        }
    }

    for m in 0..n {
        let bit = 1 << m;
        let f = dout_du[m] * wg[m];
        for (i, d) in grad.shape[m * half..(m + 1) * half].iter_mut().enumerate() {
            *d = f * corner_weight(tv, shape_comb(m, i), bit);
        }
    }
    out
}
