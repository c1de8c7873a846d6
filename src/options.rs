use serde::{Deserialize, Serialize};

/// Search direction used by the optimizer backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerDirection {
    /// L-BFGS-family quasi-Newton search. Default.
    QuasiNewton,
    /// Nonlinear conjugate gradient (Polak-Ribiere variant).
    NonlinearConjugateGradient,
}

impl Default for OptimizerDirection {
    fn default() -> Self {
        OptimizerDirection::QuasiNewton
    }
}

/// Which source-density family backs the objective functor's score and
/// log-density terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DensityFamily {
    /// |z|^alpha generalized-Gaussian family with per-channel alpha chosen
    /// by a kurtosis proxy. The default, matching the reference functor.
    GeneralizedGaussian,
    /// tanh-based Sejnowski/infomax family.
    Sejnowski,
}

impl Default for DensityFamily {
    fn default() -> Self {
        DensityFamily::GeneralizedGaussian
    }
}

/// Run parameters for [`crate::ica::linear_ica`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcaOptions {
    pub direction: OptimizerDirection,
    pub max_iter: u64,
    pub verbosity: u8,
    pub density: DensityFamily,
    /// Objective barrier threshold: |det(W)| below this returns +infinity.
    pub eps_det: f64,
    /// Whitening rejects covariance eigenvalues below this floor.
    pub eps_whiten: f64,
}

impl IcaOptions {
    pub fn with_direction(mut self, direction: OptimizerDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_max_iter(mut self, max_iter: u64) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_density(mut self, density: DensityFamily) -> Self {
        self.density = density;
        self
    }
}

impl Default for IcaOptions {
    fn default() -> Self {
        Self {
            direction: OptimizerDirection::QuasiNewton,
            max_iter: 100,
            verbosity: 0,
            density: DensityFamily::GeneralizedGaussian,
            eps_det: 1e-10,
            eps_whiten: 1e-12,
        }
    }
}

/// Mirrors the reference's `make_default_options()`: quasi-Newton,
/// max_iter = 100, verbosity = 0.
pub fn make_default_options() -> IcaOptions {
    IcaOptions::default()
}
