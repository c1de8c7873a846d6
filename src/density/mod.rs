//! Per-channel source-density models: the pluggable capability referenced by
//! the design as `phi` / `dphi` / `mean_logp`, vectorized over frames.
//!
//! Two families are implemented: [`GeneralizedGaussianDensity`] (the
//! default wired into the objective functor's gradient) and
//! [`SejnowskiDensity`] (the tanh-based infomax alternative). Both
//! implement the same [`Density`] trait so the objective functor can be
//! parameterized over either.

mod simd;

use crate::matrix::{IcaScalar, RowMajor};

/// Per-channel super-/sub-Gaussian choice, driven by the kurtosis proxy in
/// the objective functor (see `crate::objective`). `Super` corresponds to
/// `signs[c] = +1` (alpha_super = 1 for the generalized-Gaussian family);
/// `Sub` to `signs[c] = -1` (alpha_sub = 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Super,
    Sub,
}

/// Runtime CPU-capability probe, recorded once at density construction and
/// never re-checked inside a hot loop (design notes: "keep the hot inner
/// loops free of branches on the capability flag").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCaps {
    pub simd: bool,
}

impl CpuCaps {
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            Self {
                simd: is_x86_64_feature_detected!("sse3"),
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            Self { simd: false }
        }
    }

    /// Force a choice, bypassing feature detection. Used by the backend
    /// equivalence test suite (spec testable property 4 / scenario S6) to
    /// run the same input through both code paths.
    pub fn force(simd: bool) -> Self {
        Self { simd }
    }
}

/// A source-density model usable by the objective functor (and standalone).
pub trait Density<T: IcaScalar> {
    /// phi[c,f] for every channel c and frame f of `z`, using `signs[c]` to
    /// select the per-channel model.
    fn compute_phi(&self, z: &RowMajor<T>, signs: &[Sign]) -> RowMajor<T>;

    /// dphi[c,f], the score derivative.
    fn compute_dphi(&self, z: &RowMajor<T>, signs: &[Sign]) -> RowMajor<T>;

    /// Per-channel mean log-density, m[c] = (1/N) * sum_f log p(z[c,f]).
    fn compute_means_logp(&self, z: &RowMajor<T>, signs: &[Sign]) -> Vec<T>;
}

/// alpha = 1 (super-Gaussian) or alpha = 4 (sub-Gaussian). Kept as a closed
/// enum rather than a raw exponent so `|z|^alpha` is dispatched through
/// repeated multiplication instead of a generic `powf` call (design notes:
/// "compile-time power specialization").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alpha {
    Super,
    Sub,
}

impl Alpha {
    fn of(sign: Sign) -> Self {
        match sign {
            Sign::Super => Alpha::Super,
            Sign::Sub => Alpha::Sub,
        }
    }

    fn value(self) -> f64 {
        match self {
            Alpha::Super => 1.0,
            Alpha::Sub => 4.0,
        }
    }

    /// ln(Gamma(1/alpha)), hardcoded for the two possible alphas rather
    /// than evaluated through a general-purpose gamma function: alpha=1
    /// gives Gamma(1) = 1; alpha=4 gives Gamma(0.25) approx 3.6256099082.
    fn log_gamma_recip(self) -> f64 {
        match self {
            Alpha::Super => 0.0,
            Alpha::Sub => 1.288_022_524_698_077,
        }
    }

    fn pow_abs<T: IcaScalar>(self, abs_z: T) -> T {
        match self {
            Alpha::Super => abs_z,
            Alpha::Sub => abs_z * abs_z * abs_z * abs_z,
        }
    }

    fn pow_abs_minus_one<T: IcaScalar>(self, abs_z: T) -> T {
        match self {
            Alpha::Super => T::one(),
            Alpha::Sub => abs_z * abs_z * abs_z,
        }
    }

    fn pow_abs_minus_two<T: IcaScalar>(self, abs_z: T) -> T {
        match self {
            Alpha::Super => T::zero(),
            Alpha::Sub => abs_z * abs_z,
        }
    }
}

fn scalar_phi_generalized_gaussian<T: IcaScalar>(z: &RowMajor<T>, signs: &[Sign]) -> RowMajor<T> {
    let mut out = RowMajor::zeros(z.rows(), z.cols());
    for c in 0..z.rows() {
        let alpha = Alpha::of(signs[c]);
        let alpha_t = T::from_f64(alpha.value()).unwrap();
        let row = z.row(c);
        let out_row = out.row_mut(c);
        for f in 0..row.len() {
            let v = row[f];
            let abs_v = v.abs();
            let sgn = if v.is_sign_negative() && v != T::zero() {
                -T::one()
            } else {
                T::one()
            };
            out_row[f] = alpha_t * alpha.pow_abs_minus_one(abs_v) * sgn;
        }
    }
    out
}

fn scalar_dphi_generalized_gaussian<T: IcaScalar>(z: &RowMajor<T>, signs: &[Sign]) -> RowMajor<T> {
    let mut out = RowMajor::zeros(z.rows(), z.cols());
    for c in 0..z.rows() {
        let alpha = Alpha::of(signs[c]);
        let alpha_t = T::from_f64(alpha.value()).unwrap();
        let alpha_m1 = alpha_t - T::one();
        let row = z.row(c);
        let out_row = out.row_mut(c);
        for f in 0..row.len() {
            let abs_v = row[f].abs();
            out_row[f] = alpha_t * alpha_m1 * alpha.pow_abs_minus_two(abs_v);
        }
    }
    out
}

fn scalar_means_logp_generalized_gaussian<T: IcaScalar>(
    z: &RowMajor<T>,
    signs: &[Sign],
) -> Vec<T> {
    let n = T::from_usize(z.cols()).unwrap();
    (0..z.rows())
        .map(|c| {
            let alpha = Alpha::of(signs[c]);
            let alpha_t = T::from_f64(alpha.value()).unwrap();
            let log_alpha = alpha_t.ln();
            let log_2 = T::from_f64(std::f64::consts::LN_2).unwrap();
            let log_gamma = T::from_f64(alpha.log_gamma_recip()).unwrap();
            let mut acc = T::zero();
            for &v in z.row(c) {
                acc += alpha.pow_abs(v.abs());
            }
            -(acc / n) + log_alpha - log_2 - log_gamma
        })
        .collect()
}

/// |z|^alpha generalized-Gaussian family with per-channel alpha chosen by
/// the objective functor's kurtosis proxy. This is the density wired into
/// the objective functor's H and gradient (resolution of the reference's
/// ambiguity between this and the tanh-based family, see `SPEC_FULL.md`
/// section 11).
pub struct GeneralizedGaussianDensity {
    caps: CpuCaps,
}

impl GeneralizedGaussianDensity {
    pub fn new(caps: CpuCaps) -> Self {
        Self { caps }
    }
}

impl Density<f32> for GeneralizedGaussianDensity {
    fn compute_phi(&self, z: &RowMajor<f32>, signs: &[Sign]) -> RowMajor<f32> {
        if self.caps.simd {
            simd::phi_generalized_gaussian_f32(z, signs)
        } else {
            scalar_phi_generalized_gaussian(z, signs)
        }
    }

    fn compute_dphi(&self, z: &RowMajor<f32>, signs: &[Sign]) -> RowMajor<f32> {
        scalar_dphi_generalized_gaussian(z, signs)
    }

    fn compute_means_logp(&self, z: &RowMajor<f32>, signs: &[Sign]) -> Vec<f32> {
        if self.caps.simd {
            simd::means_logp_generalized_gaussian_f32(z, signs)
        } else {
            scalar_means_logp_generalized_gaussian(z, signs)
        }
    }
}

impl Density<f64> for GeneralizedGaussianDensity {
    fn compute_phi(&self, z: &RowMajor<f64>, signs: &[Sign]) -> RowMajor<f64> {
        if self.caps.simd {
            simd::phi_generalized_gaussian_f64(z, signs)
        } else {
            scalar_phi_generalized_gaussian(z, signs)
        }
    }

    fn compute_dphi(&self, z: &RowMajor<f64>, signs: &[Sign]) -> RowMajor<f64> {
        scalar_dphi_generalized_gaussian(z, signs)
    }

    fn compute_means_logp(&self, z: &RowMajor<f64>, signs: &[Sign]) -> Vec<f64> {
        if self.caps.simd {
            simd::means_logp_generalized_gaussian_f64(z, signs)
        } else {
            scalar_means_logp_generalized_gaussian(z, signs)
        }
    }
}

fn sign_value<T: IcaScalar>(sign: Sign) -> T {
    match sign {
        Sign::Super => T::one(),
        Sign::Sub => -T::one(),
    }
}

fn scalar_phi_sejnowski<T: IcaScalar>(z: &RowMajor<T>, signs: &[Sign]) -> RowMajor<T> {
    let mut out = RowMajor::zeros(z.rows(), z.cols());
    for c in 0..z.rows() {
        let s = sign_value::<T>(signs[c]);
        let row = z.row(c);
        let out_row = out.row_mut(c);
        for f in 0..row.len() {
            out_row[f] = row[f] + s * row[f].tanh();
        }
    }
    out
}

fn scalar_dphi_sejnowski<T: IcaScalar>(z: &RowMajor<T>, signs: &[Sign]) -> RowMajor<T> {
    let mut out = RowMajor::zeros(z.rows(), z.cols());
    for c in 0..z.rows() {
        let row = z.row(c);
        let out_row = out.row_mut(c);
        let two = T::from_f64(2.0).unwrap();
        match signs[c] {
            Sign::Super => {
                for f in 0..row.len() {
                    let y = row[f].tanh();
                    out_row[f] = two - y * y;
                }
            }
            Sign::Sub => {
                for f in 0..row.len() {
                    let y = row[f].tanh();
                    out_row[f] = y * y;
                }
            }
        }
    }
    out
}

fn scalar_means_logp_sejnowski<T: IcaScalar>(z: &RowMajor<T>, signs: &[Sign]) -> Vec<T> {
    let n = T::from_usize(z.cols()).unwrap();
    let half = T::from_f64(0.5).unwrap();
    let log_2 = T::from_f64(std::f64::consts::LN_2).unwrap();
    (0..z.rows())
        .map(|c| {
            let mut acc = T::zero();
            match signs[c] {
                Sign::Super => {
                    for &v in z.row(c) {
                        acc += -v.cosh().ln() - half * v * v;
                    }
                }
                Sign::Sub => {
                    for &v in z.row(c) {
                        let two_v = v + v;
                        acc += -log_2 - half * (v - T::one()) * (v - T::one())
                            + (T::one() + (-two_v).exp()).ln();
                    }
                }
            }
            acc / n
        })
        .collect()
}

/// tanh-based Sejnowski/infomax density family (spec section 4.1), offered
/// as an alternate plug-in implementation of [`Density`].
pub struct SejnowskiDensity {
    caps: CpuCaps,
}

impl SejnowskiDensity {
    pub fn new(caps: CpuCaps) -> Self {
        Self { caps }
    }
}

impl Density<f32> for SejnowskiDensity {
    fn compute_phi(&self, z: &RowMajor<f32>, signs: &[Sign]) -> RowMajor<f32> {
        if self.caps.simd {
            simd::phi_sejnowski_f32(z, signs)
        } else {
            scalar_phi_sejnowski(z, signs)
        }
    }

    fn compute_dphi(&self, z: &RowMajor<f32>, signs: &[Sign]) -> RowMajor<f32> {
        if self.caps.simd {
            simd::dphi_sejnowski_f32(z, signs)
        } else {
            scalar_dphi_sejnowski(z, signs)
        }
    }

    fn compute_means_logp(&self, z: &RowMajor<f32>, signs: &[Sign]) -> Vec<f32> {
        if self.caps.simd {
            simd::means_logp_sejnowski_f32(z, signs)
        } else {
            scalar_means_logp_sejnowski(z, signs)
        }
    }
}

impl Density<f64> for SejnowskiDensity {
    fn compute_phi(&self, z: &RowMajor<f64>, signs: &[Sign]) -> RowMajor<f64> {
        if self.caps.simd {
            simd::phi_sejnowski_f64(z, signs)
        } else {
            scalar_phi_sejnowski(z, signs)
        }
    }

    fn compute_dphi(&self, z: &RowMajor<f64>, signs: &[Sign]) -> RowMajor<f64> {
        if self.caps.simd {
            simd::dphi_sejnowski_f64(z, signs)
        } else {
            scalar_dphi_sejnowski(z, signs)
        }
    }

    fn compute_means_logp(&self, z: &RowMajor<f64>, signs: &[Sign]) -> Vec<f64> {
        if self.caps.simd {
            simd::means_logp_sejnowski_f64(z, signs)
        } else {
            scalar_means_logp_sejnowski(z, signs)
        }
    }
}
