//! Linear Independent Component Analysis: whitening, a maximum-likelihood
//! objective with adaptive per-channel source densities, and an optimizer
//! driver built on top of pluggable linear-algebra and optimization
//! backends.

pub mod backend;
pub mod density;
pub mod error;
pub mod ica;
pub mod matrix;
pub mod objective;
pub mod optimizer;
pub mod options;
pub mod profiling;
pub mod whiten;

pub use error::{IcaError, Result};
pub use ica::{linear_ica, make_default_options};
pub use matrix::{IcaScalar, RowMajor};
pub use options::{DensityFamily, IcaOptions, OptimizerDirection};
