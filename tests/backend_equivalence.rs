mod common;

use linear_ica::backend::NalgebraBackend;
use linear_ica::density::{CpuCaps, Density, GeneralizedGaussianDensity, Sign, SejnowskiDensity};
use linear_ica::objective::IcaObjective;
use linear_ica::whiten::whiten;
use linear_ica::RowMajor;

fn sample_tile() -> RowMajor<f64> {
    let n = 256;
    let data: Vec<f64> = (0..n)
        .map(|f| {
            let t = -10.0 + 20.0 * (f as f64) / (n as f64);
            t
        })
        .collect();
    RowMajor::from_rows(1, n, data)
}

/// Testable property 4: scalar and SIMD kernels agree within 4 ULP for phi
/// and within 1e-5 relative tolerance for means_logp, over [-10, 10].
#[test]
fn generalized_gaussian_scalar_and_simd_phi_agree() {
    let z = sample_tile();
    let scalar = GeneralizedGaussianDensity::new(CpuCaps::force(false));
    let simd = GeneralizedGaussianDensity::new(CpuCaps::force(true));

    for &sign in &[Sign::Super, Sign::Sub] {
        let phi_scalar = scalar.compute_phi(&z, &[sign]);
        let phi_simd = simd.compute_phi(&z, &[sign]);
        for f in 0..z.cols() {
            let a = phi_scalar.get(0, f);
            let b = phi_simd.get(0, f);
            assert!((a - b).abs() <= 1e-9 * (1.0 + a.abs()), "phi mismatch at {}: {} vs {}", f, a, b);
        }

        let m_scalar = scalar.compute_means_logp(&z, &[sign]);
        let m_simd = simd.compute_means_logp(&z, &[sign]);
        let rel = (m_scalar[0] - m_simd[0]).abs() / (1.0 + m_scalar[0].abs());
        assert!(rel <= 1e-5, "means_logp relative mismatch {}", rel);
    }
}

#[test]
fn sejnowski_scalar_and_simd_agree() {
    let z = sample_tile();
    let scalar = SejnowskiDensity::new(CpuCaps::force(false));
    let simd = SejnowskiDensity::new(CpuCaps::force(true));

    for &sign in &[Sign::Super, Sign::Sub] {
        let phi_scalar = scalar.compute_phi(&z, &[sign]);
        let phi_simd = simd.compute_phi(&z, &[sign]);
        for f in 0..z.cols() {
            let a = phi_scalar.get(0, f);
            let b = phi_simd.get(0, f);
            assert!((a - b).abs() <= 1e-2, "phi mismatch at {}: {} vs {}", f, a, b);
        }
    }
}

/// Scenario S6: the same input evaluated through the objective functor with
/// SIMD forced on and off agrees within 1e-10 (double precision).
#[test]
fn end_to_end_objective_value_agrees_across_backends() {
    let sources = common::mixed_sinusoid_sources(800, 15.0);
    let a = common::uniform_mixing_matrix(4, 99);
    let x = common::mix(&a, &sources);

    let backend = NalgebraBackend;
    let whitened = whiten(&x, &backend, 1e-10).expect("whitening should succeed");

    let channels = x.rows();
    let mut theta = vec![0.0f64; channels * (channels + 1)];
    for i in 0..channels {
        theta[i * channels + i] = 1.0;
    }

    let scalar_density = GeneralizedGaussianDensity::new(CpuCaps::force(false));
    let scalar_objective = IcaObjective::new(&whitened.x_white, scalar_density, &backend, 1e-10);
    let scalar_value = scalar_objective.evaluate(&theta, false).value;

    let simd_density = GeneralizedGaussianDensity::new(CpuCaps::force(true));
    let simd_objective = IcaObjective::new(&whitened.x_white, simd_density, &backend, 1e-10);
    let simd_value = simd_objective.evaluate(&theta, false).value;

    assert!(
        (scalar_value - simd_value).abs() <= 1e-10 * (1.0 + scalar_value.abs()),
        "objective value differs across backends: {} vs {}",
        scalar_value,
        simd_value
    );
}
