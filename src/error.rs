use thiserror::Error;

/// Errors surfaced by the public entry points of this crate.
///
/// Recoverable numeric degeneracy encountered *inside* an objective
/// evaluation (a near-singular trial `W`) is not represented here: it is
/// absorbed by the `+infinity` barrier convention and handled by the
/// optimizer's line search instead of propagating as an `Err`.
#[derive(Error, Debug)]
pub enum IcaError {
    #[error("channel count must be >= 1, got {0}")]
    InvalidChannelCount(usize),

    #[error("frame count must be >= {min}, got {actual}")]
    InsufficientFrames { min: usize, actual: usize },

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("whitening failed: covariance is not positive definite (eigenvalue {0:e} <= 0)")]
    NonPositiveEigenvalue(f64),

    #[error("whitening failed: covariance is singular beyond tolerance (min eigenvalue {0:e})")]
    SingularCovariance(f64),

    #[error("optimizer backend failed: {0}")]
    OptimizerFailed(String),
}

pub type Result<T> = std::result::Result<T, IcaError>;
