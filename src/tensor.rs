//! Tensor Operations
//!
//! A minimal 2D tensor, just large enough for bag-of-embeddings models.
//! Every tensor here is either a matrix `[rows, cols]` or a vector `[n]`.
//!
//! ## Core Concepts
//!
//! - **Data**: Flat `Vec<f32>` storing all elements in row-major order
//! - **Shape**: `[n]` for vectors, `[rows, cols]` for matrices
//!
//! ## Example
//!
//! ```rust
//! use bagwise::Tensor;
//!
//! let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
//! let b = Tensor::new(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], vec![3, 2]);
//! let c = a.matmul(&b);
//! assert_eq!(c.shape, vec![2, 2]);
//! assert_eq!(c.data, vec![4.0, 5.0, 10.0, 11.0]);
//! ```
//!
//! ## Performance
//!
//! Matrix multiplication and row-wise softmax switch to Rayon row
//! parallelism once the work is large enough to pay for the thread hand-off.
//! The models in this crate are tiny, so most calls stay sequential.

use rayon::prelude::*;

/// Work (multiply-adds) below which matmul stays on the calling thread
const PARALLEL_MATMUL_THRESHOLD: usize = 16_384;

/// A row-major array of `f32` values
///
/// # Memory Layout
///
/// For shape `[2, 3]`, data is stored as:
/// `[r0c0, r0c1, r0c2, r1c0, r1c1, r1c2]`
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    /// Flat storage of all tensor elements
    pub data: Vec<f32>,
    /// Shape of the tensor
    pub shape: Vec<usize>,
}

impl Tensor {
    /// Create a new tensor with given data and shape
    ///
    /// # Panics
    ///
    /// Panics if the product of shape dimensions doesn't equal data length
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        let expected_size: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected_size,
            "Data length ({}) doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            expected_size
        );
        Self { data, shape }
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: Vec<usize>) -> Self {
        let size: usize = shape.iter().product();
        Self::new(vec![0.0; size], shape)
    }

    /// Create a zero tensor with the same shape as `self`
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape.clone())
    }

    /// Number of rows (first dimension)
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Number of columns (last dimension; 1 for vectors)
    pub fn cols(&self) -> usize {
        if self.shape.len() >= 2 {
            self.shape[self.shape.len() - 1]
        } else {
            1
        }
    }

    /// Borrow row `i` of a matrix
    pub fn row(&self, i: usize) -> &[f32] {
        let cols = self.cols();
        &self.data[i * cols..(i + 1) * cols]
    }

    /// Mutably borrow row `i` of a matrix
    pub fn row_mut(&mut self, i: usize) -> &mut [f32] {
        let cols = self.cols();
        &mut self.data[i * cols..(i + 1) * cols]
    }

    fn assert_matrix(&self, op: &str) {
        assert_eq!(
            self.shape.len(),
            2,
            "{} expects a 2D tensor, got shape {:?}",
            op,
            self.shape
        );
    }

    /// Matrix multiplication `[m, k] @ [k, n] -> [m, n]`
    ///
    /// # Panics
    ///
    /// Panics if either operand is not 2D or the inner dimensions differ
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        self.assert_matrix("matmul");
        other.assert_matrix("matmul");
        assert_eq!(
            self.shape[1], other.shape[0],
            "Matrix dimensions incompatible: [{}, {}] @ [{}, {}]",
            self.shape[0], self.shape[1], other.shape[0], other.shape[1]
        );

        let m = self.shape[0];
        let k = self.shape[1];
        let n = other.shape[1];
        let mut result = vec![0.0; m * n];

        // i-k-j order keeps the inner loop walking contiguous memory
        let compute_row = |i: usize, out_row: &mut [f32]| {
            let a_row = &self.data[i * k..(i + 1) * k];
            for (l, &a_val) in a_row.iter().enumerate() {
                let b_row = &other.data[l * n..(l + 1) * n];
                for (r, &b_val) in out_row.iter_mut().zip(b_row) {
                    *r += a_val * b_val;
                }
            }
        };

        if n > 0 {
            if m * n * k >= PARALLEL_MATMUL_THRESHOLD {
                result
                    .par_chunks_mut(n)
                    .enumerate()
                    .for_each(|(i, out_row)| compute_row(i, out_row));
            } else {
                for (i, out_row) in result.chunks_mut(n).enumerate() {
                    compute_row(i, out_row);
                }
            }
        }

        Tensor::new(result, vec![m, n])
    }

    /// Swap rows and columns of a matrix
    pub fn transpose(&self) -> Tensor {
        self.assert_matrix("transpose");
        let rows = self.shape[0];
        let cols = self.shape[1];
        let mut result = vec![0.0; rows * cols];

        for i in 0..rows {
            for j in 0..cols {
                result[j * rows + i] = self.data[i * cols + j];
            }
        }

        Tensor::new(result, vec![cols, rows])
    }

    /// Add a vector `[n]` to every row of a matrix `[m, n]` (bias addition)
    pub fn add_row(&self, row: &Tensor) -> Tensor {
        self.assert_matrix("add_row");
        let cols = self.shape[1];
        assert_eq!(
            row.data.len(),
            cols,
            "Cannot broadcast {:?} over rows of {:?}",
            row.shape,
            self.shape
        );

        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(i, &x)| x + row.data[i % cols])
            .collect();
        Tensor::new(data, self.shape.clone())
    }

    /// Sum each column, producing a `[cols]` vector
    pub fn sum_rows(&self) -> Tensor {
        self.assert_matrix("sum_rows");
        let cols = self.shape[1];
        let mut sums = vec![0.0; cols];
        for row in self.data.chunks(cols.max(1)) {
            for (s, &x) in sums.iter_mut().zip(row) {
                *s += x;
            }
        }
        Tensor::new(sums, vec![cols])
    }

    /// Softmax over each row, computed with the max subtracted for stability
    pub fn softmax_rows(&self) -> Tensor {
        self.assert_matrix("softmax_rows");
        let cols = self.shape[1];
        if cols == 0 {
            return self.clone();
        }

        let data: Vec<f32> = self
            .data
            .par_chunks(cols)
            .flat_map_iter(|row| {
                let max = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
                let exp_values: Vec<f32> = row.iter().map(|&x| (x - max).exp()).collect();
                let sum: f32 = exp_values.iter().sum();
                exp_values.into_iter().map(move |val| val / sum)
            })
            .collect();

        Tensor::new(data, self.shape.clone())
    }

    /// Index of the largest value in each row (first one wins on ties)
    pub fn argmax_rows(&self) -> Vec<usize> {
        self.assert_matrix("argmax_rows");
        let cols = self.shape[1];
        if cols == 0 {
            return vec![0; self.shape[0]];
        }
        self.data
            .chunks(cols)
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |(best_i, best), (i, &x)| {
                        if x > best {
                            (i, x)
                        } else {
                            (best_i, best)
                        }
                    })
                    .0
            })
            .collect()
    }

    /// Multiply every element by `factor`
    pub fn scale(&self, factor: f32) -> Tensor {
        Tensor::new(
            self.data.iter().map(|&x| x * factor).collect(),
            self.shape.clone(),
        )
    }

    /// Multiply every element by `factor` in place
    pub fn scale_in_place(&mut self, factor: f32) {
        self.data.par_iter_mut().for_each(|x| *x *= factor);
    }

    /// Sum of squared elements
    pub fn sum_of_squares(&self) -> f32 {
        self.data.par_iter().map(|&x| x * x).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_accessors() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        assert_eq!(t.rows(), 2);
        assert_eq!(t.cols(), 3);
        assert_eq!(t.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "doesn't match shape")]
    fn test_new_rejects_bad_shape() {
        Tensor::new(vec![1.0, 2.0, 3.0], vec![2, 2]);
    }

    #[test]
    fn test_matmul_small() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let identity = Tensor::new(vec![1.0, 0.0, 0.0, 1.0], vec![2, 2]);
        assert_eq!(a.matmul(&identity), a);
    }

    #[test]
    fn test_matmul_parallel_matches_sequential() {
        let m = 40;
        let k = 30;
        let n = 20;
        let a = Tensor::new((0..m * k).map(|i| (i % 7) as f32 - 3.0).collect(), vec![m, k]);
        let b = Tensor::new((0..k * n).map(|i| (i % 5) as f32 * 0.5).collect(), vec![k, n]);

        let c = a.matmul(&b);

        for i in 0..m {
            for j in 0..n {
                let expected: f32 = (0..k).map(|l| a.data[i * k + l] * b.data[l * n + j]).sum();
                assert!((c.data[i * n + j] - expected).abs() < 1e-4);
            }
        }
    }

    #[test]
    #[should_panic(expected = "incompatible")]
    fn test_matmul_rejects_mismatch() {
        let a = Tensor::zeros(vec![2, 3]);
        let b = Tensor::zeros(vec![2, 3]);
        a.matmul(&b);
    }

    #[test]
    fn test_transpose() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let tt = t.transpose();
        assert_eq!(tt.shape, vec![3, 2]);
        assert_eq!(tt.data, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_add_row_and_sum_rows() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let bias = Tensor::new(vec![10.0, 20.0], vec![2]);
        assert_eq!(t.add_row(&bias).data, vec![11.0, 22.0, 13.0, 24.0]);
        assert_eq!(t.sum_rows().data, vec![4.0, 6.0]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 1000.0, 1000.0, 1000.0], vec![2, 3]);
        let s = t.softmax_rows();
        for i in 0..2 {
            let sum: f32 = s.row(i).iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
        assert!((s.data[3] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_argmax_rows() {
        let t = Tensor::new(vec![0.1, 0.9, 0.5, 0.5], vec![2, 2]);
        assert_eq!(t.argmax_rows(), vec![1, 0]);
    }

    #[test]
    fn test_scale_and_norm() {
        let mut t = Tensor::new(vec![3.0, 4.0], vec![2]);
        assert_eq!(t.sum_of_squares(), 25.0);
        t.scale_in_place(2.0);
        assert_eq!(t.data, vec![6.0, 8.0]);
        assert_eq!(t.scale(0.5).data, vec![3.0, 4.0]);
    }
}
