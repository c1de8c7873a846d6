use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::error::{IcaError, Result};
use crate::matrix::{IcaScalar, RowMajor};

/// The external linear-algebra collaborator referenced by the design as
/// GEMM/GETRF/GETRI/SYEV, wrapped behind a trait so an alternate provider
/// (a different pure-Rust crate, or a BLAS/LAPACK binding) can stand in for
/// the in-tree nalgebra-backed implementation.
pub trait LinAlgBackend<T: IcaScalar> {
    /// z1 = W * x, where W is C x C and x is C x N row-major.
    fn gemm_square(&self, w: &DMatrix<T>, x: &RowMajor<T>) -> RowMajor<T>;

    /// LU decomposition of a square matrix; returns the matrix of |det|
    /// diagonal factors is not exposed directly, only `determinant` and
    /// `inverse`, since that's all the objective functor needs.
    fn determinant(&self, w: &DMatrix<T>) -> T;

    /// Inverse of a square matrix; `None` if singular beyond nalgebra's own
    /// tolerance (the caller is expected to have already checked
    /// `determinant` against the barrier threshold first).
    fn inverse(&self, w: &DMatrix<T>) -> Option<DMatrix<T>>;

    /// Symmetric eigendecomposition sigma = U * diag(eigenvalues) * U^T.
    fn symmetric_eigen(&self, sigma: &DMatrix<T>) -> (DVector<T>, DMatrix<T>);
}

/// Default backend, delegating the small C x C operations to `nalgebra`.
pub struct NalgebraBackend;

impl<T: IcaScalar + nalgebra::RealField> LinAlgBackend<T> for NalgebraBackend {
    fn gemm_square(&self, w: &DMatrix<T>, x: &RowMajor<T>) -> RowMajor<T> {
        let c = x.rows();
        let n = x.cols();
        debug_assert_eq!(w.nrows(), c);
        debug_assert_eq!(w.ncols(), c);

        let mut out = RowMajor::zeros(c, n);
        for i in 0..c {
            let w_row = w.row(i);
            let out_row = out.row_mut(i);
            for f in 0..n {
                let mut acc = T::zero();
                for k in 0..c {
                    acc += w_row[k] * x.get(k, f);
                }
                out_row[f] = acc;
            }
        }
        out
    }

    fn determinant(&self, w: &DMatrix<T>) -> T {
        w.clone().lu().determinant()
    }

    fn inverse(&self, w: &DMatrix<T>) -> Option<DMatrix<T>> {
        w.clone().try_inverse()
    }

    fn symmetric_eigen(&self, sigma: &DMatrix<T>) -> (DVector<T>, DMatrix<T>) {
        let eigen = SymmetricEigen::new(sigma.clone());
        (eigen.eigenvalues, eigen.eigenvectors)
    }
}

/// Builds the W block of `theta` as a `DMatrix`, viewing (not copying) the
/// underlying row-major layout; W is stored row-major in theta (spec data
/// model section 3), so this transposes nalgebra's column-major convention
/// at construction time rather than in every subsequent read.
pub fn weights_from_theta<T: IcaScalar>(theta: &[T], channels: usize) -> DMatrix<T> {
    DMatrix::from_fn(channels, channels, |r, col| theta[r * channels + col])
}

pub fn bias_from_theta<T: IcaScalar>(theta: &[T], channels: usize) -> &[T] {
    &theta[channels * channels..channels * channels + channels]
}

/// Packs `(weights, bias)` back into a flat theta buffer, W row-major
/// followed by b, per the spec data model.
pub fn pack_theta<T: IcaScalar>(weights: &DMatrix<T>, bias: &[T]) -> Vec<T> {
    let c = weights.nrows();
    let mut theta = Vec::with_capacity(c * c + c);
    for r in 0..c {
        for col in 0..c {
            theta.push(weights[(r, col)]);
        }
    }
    theta.extend_from_slice(bias);
    theta
}

/// Validates that `eigenvalue >= floor`, translating a failure into the
/// distinct whitening-numeric-degeneracy errors from spec section 7.2.
pub fn check_eigenvalue_floor(eigenvalue: f64, floor: f64) -> Result<()> {
    if eigenvalue <= 0.0 {
        return Err(IcaError::NonPositiveEigenvalue(eigenvalue));
    }
    if eigenvalue < floor {
        return Err(IcaError::SingularCovariance(eigenvalue));
    }
    Ok(())
}
