use num_traits::{Float, FromPrimitive, NumAssignOps};

/// Scalar bound shared by every generic numeric type in this crate.
///
/// `T in {f32, f64}` per the public API surface (spec section 6); this trait
/// collects exactly the operations the whitening stage, the density kernels
/// and the objective functor need from a scalar, so call sites never reach
/// for `as f64` casts or `.unwrap()` on a `pow`/`ln` result.
pub trait IcaScalar:
    Float + FromPrimitive + NumAssignOps + Send + Sync + Copy + std::fmt::Debug + 'static
{
}

impl<T> IcaScalar for T where
    T: Float + FromPrimitive + NumAssignOps + Send + Sync + Copy + std::fmt::Debug + 'static
{
}

/// A dense C x N matrix stored channel-major (row-major): row `c` occupies
/// the contiguous slice `data[c*cols .. (c+1)*cols]`.
///
/// `nalgebra::DMatrix` is column-major, which would scatter a channel's
/// frames across the buffer; the density kernels in [`crate::density`] need
/// a contiguous per-channel tile to vectorize over, so the large C x N
/// working buffers (the observed/whitened data, z1, phi) use this type
/// instead. The small C x C matrices (W, its LU factors, its inverse) are
/// left to `nalgebra::DMatrix`, where layout doesn't affect correctness.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMajor<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: IcaScalar> RowMajor<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::zero(); rows * cols],
        }
    }

    pub fn from_rows(rows: usize, cols: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "RowMajor buffer length mismatch: expected {}, got {}",
            rows * cols,
            data.len()
        );
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Contiguous view of channel `c`'s frames.
    pub fn row(&self, c: usize) -> &[T] {
        let start = c * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn row_mut(&mut self, c: usize) -> &mut [T] {
        let start = c * self.cols;
        &mut self.data[start..start + self.cols]
    }

    pub fn get(&self, c: usize, f: usize) -> T {
        self.data[c * self.cols + f]
    }

    pub fn set(&mut self, c: usize, f: usize, value: T) {
        self.data[c * self.cols + f] = value;
    }

    /// Row means: mu[c] = (1/N) * sum_f data[c,f].
    pub fn row_means(&self) -> Vec<T> {
        let n = T::from_usize(self.cols).expect("cols fits in scalar type");
        (0..self.rows)
            .map(|c| self.row(c).iter().fold(T::zero(), |acc, &x| acc + x) / n)
            .collect()
    }

    /// Subtract `means[c]` from every frame of row `c`, in place.
    pub fn center_rows(&mut self, means: &[T]) {
        for c in 0..self.rows {
            let mu = means[c];
            for v in self.row_mut(c).iter_mut() {
                *v -= mu;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_is_contiguous_per_channel() {
        let m = RowMajor::from_rows(2, 3, vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.row(0), &[1.0, 2.0, 3.0]);
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn row_means_matches_manual_average() {
        let m = RowMajor::from_rows(2, 4, vec![1.0f64, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0]);
        let means = m.row_means();
        assert_eq!(means, vec![2.5, 0.0]);
    }

    #[test]
    fn center_rows_zeros_the_mean() {
        let mut m = RowMajor::from_rows(1, 4, vec![1.0f64, 2.0, 3.0, 4.0]);
        let means = m.row_means();
        m.center_rows(&means);
        let sum: f64 = m.row(0).iter().sum();
        assert!(sum.abs() < 1e-12);
    }
}
