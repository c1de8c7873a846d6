use nalgebra::DMatrix;

use crate::backend::{check_eigenvalue_floor, LinAlgBackend};
use crate::error::Result;
use crate::matrix::{IcaScalar, RowMajor};

/// Output of [`whiten`]: the decorrelated data plus the transform that
/// produced it, in case a caller wants to re-apply it to held-out frames.
pub struct Whitened<T> {
    pub x_white: RowMajor<T>,
    /// Q = Lambda^(-1/2) * U^T, the decorrelating transform.
    pub q: DMatrix<T>,
    pub means: Vec<T>,
}

/// Centers `x`, forms the empirical covariance, eigen-decomposes it and
/// applies the decorrelating transform so that the result has zero row
/// means and unit, uncorrelated channel variance (spec section 4.2).
pub fn whiten<T: IcaScalar + nalgebra::RealField>(
    x: &RowMajor<T>,
    backend: &dyn LinAlgBackend<T>,
    eps_whiten: f64,
) -> Result<Whitened<T>> {
    let c = x.rows();
    let n = x.cols();

    let means = x.row_means();
    let mut x_hat = x.clone();
    x_hat.center_rows(&means);

    log::debug!("whiten: centered {}x{} input, forming covariance", c, n);

    let n_t = T::from_usize(n).expect("frame count fits in scalar type");
    let mut sigma = DMatrix::<T>::zeros(c, c);
    for i in 0..c {
        let row_i = x_hat.row(i);
        for j in i..c {
            let row_j = x_hat.row(j);
            let mut acc = T::zero();
            for f in 0..n {
                acc += row_i[f] * row_j[f];
            }
            let cov = acc / n_t;
            sigma[(i, j)] = cov;
            sigma[(j, i)] = cov;
        }
    }

    let (eigenvalues, eigenvectors) = backend.symmetric_eigen(&sigma);

    for k in 0..c {
        let lambda: f64 = num_traits::ToPrimitive::to_f64(&eigenvalues[k])
            .expect("eigenvalue convertible to f64 for the floor check");
        check_eigenvalue_floor(lambda, eps_whiten)?;
    }

    let mut inv_sqrt_lambda = DMatrix::<T>::zeros(c, c);
    for k in 0..c {
        inv_sqrt_lambda[(k, k)] = T::one() / eigenvalues[k].sqrt();
    }
    let q = inv_sqrt_lambda * eigenvectors.transpose();

    let mut x_white = RowMajor::zeros(c, n);
    for i in 0..c {
        let q_row = q.row(i);
        let out_row = x_white.row_mut(i);
        for f in 0..n {
            let mut acc = T::zero();
            for k in 0..c {
                acc += q_row[k] * x_hat.get(k, f);
            }
            out_row[f] = acc;
        }
    }

    log::debug!("whiten: decorrelating transform applied, {} channels", c);

    Ok(Whitened { x_white, q, means })
}
