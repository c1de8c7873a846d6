//! Synthetic source/mixing generators used by the behavioral scenarios in
//! the end-to-end and property test suites. Test-signal synthesis is
//! explicitly out of scope as a *library* feature, so these helpers live
//! here rather than under `src/`.

use linear_ica::RowMajor;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Scenario S1: four sinusoidal/nonstationary sources over `t` spanning
/// `[-span/2, span/2]`.
pub fn mixed_sinusoid_sources(n: usize, span: f64) -> RowMajor<f64> {
    let mut data = vec![0.0f64; 4 * n];
    for f in 0..n {
        let t = -span / 2.0 + span * (f as f64) / (n as f64);
        data[0 * n + f] = (3.0 * t).sin() + (6.0 * t).cos();
        data[1 * n + f] = (10.0 * t).cos();
        data[2 * n + f] = (5.0 * t).sin();
        data[3 * n + f] = (t * t).sin();
    }
    RowMajor::from_rows(4, n, data)
}

/// A uniform-random C x C mixing matrix, seeded for determinism.
pub fn uniform_mixing_matrix(channels: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..channels * channels)
        .map(|_| rng.gen::<f64>())
        .collect()
}

/// Applies a C x C row-major mixing matrix to C x N sources, X = A * S.
pub fn mix(a: &[f64], sources: &RowMajor<f64>) -> RowMajor<f64> {
    let c = sources.rows();
    let n = sources.cols();
    let mut out = RowMajor::zeros(c, n);
    for i in 0..c {
        let out_row = out.row_mut(i);
        for f in 0..n {
            let mut acc = 0.0;
            for k in 0..c {
                acc += a[i * c + k] * sources.get(k, f);
            }
            out_row[f] = acc;
        }
    }
    out
}

/// Laplace-distributed (super-Gaussian) samples via inverse-CDF sampling.
pub fn laplace_samples(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let u: f64 = rng.gen_range(-0.5..0.5);
            -u.signum() * (1.0 - 2.0 * u.abs()).ln()
        })
        .collect()
}

/// Uniform (sub-Gaussian) samples on `[-1, 1]`.
pub fn uniform_samples(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Best signed-permutation cross-correlation between estimated and true
/// sources, used by the identity-recovery property (spec testable property
/// 2) and scenario S1's `>= 0.95` acceptance threshold. Exhaustive over
/// the (small, fixed C) permutation group, which is fine for the C <= 4
/// scenarios in the test suite.
pub fn best_signed_permutation_correlation(estimate: &RowMajor<f64>, truth: &RowMajor<f64>) -> f64 {
    let c = truth.rows();
    let n = truth.cols();
    let mut perm: Vec<usize> = (0..c).collect();
    let mut best = f64::NEG_INFINITY;

    permute(&mut perm, 0, &mut |p| {
        let mut total = 0.0;
        for (row_est, &row_truth) in p.iter().enumerate() {
            let e = estimate.row(row_est);
            let t = truth.row(row_truth);
            let mut dot = 0.0;
            let mut norm_e = 0.0;
            let mut norm_t = 0.0;
            for f in 0..n {
                dot += e[f] * t[f];
                norm_e += e[f] * e[f];
                norm_t += t[f] * t[f];
            }
            let corr = dot / (norm_e.sqrt() * norm_t.sqrt()).max(1e-12);
            total += corr.abs();
        }
        best = best.max(total / c as f64);
    });

    best
}

fn permute(arr: &mut Vec<usize>, k: usize, visit: &mut impl FnMut(&[usize])) {
    if k == arr.len() {
        visit(arr);
        return;
    }
    for i in k..arr.len() {
        arr.swap(k, i);
        permute(arr, k + 1, visit);
        arr.swap(k, i);
    }
}
