//! Linear Layer (Fully Connected)
//!
//! Performs an affine transformation: y = x @ W + b
//!
//! ## Forward Pass
//!
//! ```text
//! Input:  x [batch, in_features]
//! Weight: W [in_features, out_features]
//! Bias:   b [out_features]
//! Output: y = x @ W + b [batch, out_features]
//! ```
//!
//! ## Backward Pass
//!
//! Using the chain rule:
//! ```text
//! grad_W = x^T @ grad_y
//! grad_b = sum(grad_y, axis=0)
//! grad_x = grad_y @ W^T
//! ```
//!
//! In the text classifier, `x` is one pooled sentence vector per row and `y`
//! holds one logit per class.

use super::init::uniform_init;
use crate::tensor::Tensor;
use rand::rngs::StdRng;

/// Linear layer (fully connected)
pub struct Linear {
    pub weight: Tensor,
    pub bias: Tensor,
}

impl Linear {
    /// Create a linear layer with weights uniform in `[-init_range, init_range]`
    /// and zero bias
    pub fn new(in_features: usize, out_features: usize, init_range: f32, rng: &mut StdRng) -> Self {
        Self {
            weight: Tensor::new(
                uniform_init(in_features * out_features, init_range, rng),
                vec![in_features, out_features],
            ),
            bias: Tensor::zeros(vec![out_features]),
        }
    }

    /// Wrap an existing weight matrix and bias
    pub fn from_parts(weight: Tensor, bias: Tensor) -> Self {
        assert_eq!(weight.shape.len(), 2, "linear weight must be 2D");
        assert_eq!(
            bias.data.len(),
            weight.shape[1],
            "bias length must equal out_features"
        );
        Self { weight, bias }
    }

    pub fn in_features(&self) -> usize {
        self.weight.shape[0]
    }

    pub fn out_features(&self) -> usize {
        self.weight.shape[1]
    }

    /// Computes y = x @ W + b and caches x for the backward pass
    pub fn forward(&self, x: &Tensor) -> (Tensor, LinearCache) {
        let y = x.matmul(&self.weight).add_row(&self.bias);
        let cache = LinearCache { x: x.clone() };
        (y, cache)
    }

    /// Gradients for weight, bias, and input
    pub fn backward(&self, grad_out: &Tensor, cache: &LinearCache) -> LinearGradients {
        LinearGradients {
            weight: cache.x.transpose().matmul(grad_out),
            bias: grad_out.sum_rows(),
            x: grad_out.matmul(&self.weight.transpose()),
        }
    }
}

/// Cache for linear layer backward pass
pub struct LinearCache {
    pub x: Tensor,
}

/// Gradients for linear layer
pub struct LinearGradients {
    pub weight: Tensor,
    pub bias: Tensor,
    pub x: Tensor, // Gradient to pass to previous layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::init::seeded_rng;

    fn layer() -> Linear {
        Linear::from_parts(
            Tensor::new(vec![1.0, -1.0, 0.5, 2.0, 0.0, 1.0], vec![3, 2]),
            Tensor::new(vec![0.1, -0.2], vec![2]),
        )
    }

    #[test]
    fn test_forward() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0], vec![1, 3]);
        let (y, _) = layer().forward(&x);
        // [1 + 1 + 0, -1 + 4 + 3] + bias
        assert!((y.data[0] - 2.1).abs() < 1e-6);
        assert!((y.data[1] - 5.8).abs() < 1e-6);
    }

    #[test]
    fn test_new_has_zero_bias() {
        let linear = Linear::new(4, 3, 0.5, &mut seeded_rng(1));
        assert_eq!(linear.in_features(), 4);
        assert_eq!(linear.out_features(), 3);
        assert!(linear.bias.data.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_backward_matches_finite_differences() {
        let x = Tensor::new(vec![0.5, -1.0, 2.0, 1.5, 0.25, -0.5], vec![2, 3]);
        let probe = Tensor::new(vec![0.2, -0.3, 0.7, 1.0], vec![2, 2]);

        let base = layer();
        let (_, cache) = base.forward(&x);
        let grads = base.backward(&probe, &cache);

        let loss = |linear: &Linear, x: &Tensor| -> f32 {
            let (y, _) = linear.forward(x);
            y.data.iter().zip(&probe.data).map(|(a, b)| a * b).sum()
        };

        let eps = 1e-2;
        for i in 0..base.weight.data.len() {
            let mut plus = layer();
            plus.weight.data[i] += eps;
            let mut minus = layer();
            minus.weight.data[i] -= eps;
            let numeric = (loss(&plus, &x) - loss(&minus, &x)) / (2.0 * eps);
            assert!((numeric - grads.weight.data[i]).abs() < 1e-2);
        }

        for i in 0..x.data.len() {
            let mut plus = x.clone();
            plus.data[i] += eps;
            let mut minus = x.clone();
            minus.data[i] -= eps;
            let numeric = (loss(&base, &plus) - loss(&base, &minus)) / (2.0 * eps);
            assert!((numeric - grads.x.data[i]).abs() < 1e-2);
        }

        // Bias gradient is the column sum of the upstream gradient
        assert!((grads.bias.data[0] - 0.9).abs() < 1e-6);
        assert!((grads.bias.data[1] - 0.7).abs() < 1e-6);
    }
}
