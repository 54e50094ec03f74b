//! SGD Optimizer, Gradient Clipping and Learning-Rate Schedule
//!
//! ## Stochastic Gradient Descent
//!
//! For each parameter θ with gradient g:
//!
//! ```text
//! v = μ * v + g        # velocity (only when momentum μ > 0)
//! θ = θ - α * v        # parameter update
//! ```
//!
//! where α is the learning rate. With μ = 0 this is plain SGD: `θ -= α * g`.
//!
//! Bag-of-embeddings classifiers are shallow and train well with plain SGD
//! at a large learning rate (the classic text classification recipe uses
//! α = 5), provided gradients are clipped.
//!
//! ## Gradient Clipping
//!
//! ```text
//! if ||grad|| > max_norm:
//!     grad = grad * (max_norm / ||grad||)
//! ```
//!
//! The norm is taken over all parameters together, so clipping preserves the
//! direction of the update.
//!
//! ## Step Schedule
//!
//! [`StepLr`] multiplies the learning rate by `gamma` every `step_size`
//! epochs, a simple way to take big steps early and fine-tune later.

use crate::error::{Error, Result};
use crate::tensor::Tensor;

/// Stochastic gradient descent with optional momentum
///
/// # Example
///
/// ```rust
/// use bagwise::{Sgd, Tensor};
///
/// let mut weight = Tensor::new(vec![1.0, 2.0], vec![2]);
/// let grad = Tensor::new(vec![0.5, -0.5], vec![2]);
///
/// let mut sgd = Sgd::new(0.1);
/// sgd.step(&mut [&mut weight], &[&grad]).unwrap();
/// assert!((weight.data[0] - 0.95).abs() < 1e-6);
/// ```
#[derive(Clone, Debug)]
pub struct Sgd {
    pub learning_rate: f32,
    pub momentum: f32,
    /// One velocity buffer per parameter, created on the first step
    velocity: Vec<Tensor>,
}

impl Sgd {
    /// Plain SGD (no momentum)
    pub fn new(learning_rate: f32) -> Self {
        Self::with_momentum(learning_rate, 0.0)
    }

    /// SGD with heavy-ball momentum
    pub fn with_momentum(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: Vec::new(),
        }
    }

    /// Update every parameter in place from its gradient
    ///
    /// Parameters must be passed in the same order on every call so each
    /// keeps its own velocity buffer.
    ///
    /// # Errors
    ///
    /// [`Error::ShapeMismatch`] if the parameter and gradient lists differ in
    /// length or a gradient's shape differs from its parameter's.
    pub fn step(&mut self, params: &mut [&mut Tensor], grads: &[&Tensor]) -> Result<()> {
        if params.len() != grads.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} parameters but {} gradients",
                params.len(),
                grads.len()
            )));
        }
        for (i, (param, grad)) in params.iter().zip(grads).enumerate() {
            if param.shape != grad.shape {
                return Err(Error::ShapeMismatch(format!(
                    "parameter {} has shape {:?} but gradient has {:?}",
                    i, param.shape, grad.shape
                )));
            }
        }

        let lr = self.learning_rate;

        if self.momentum == 0.0 {
            for (param, grad) in params.iter_mut().zip(grads) {
                for (p, &g) in param.data.iter_mut().zip(&grad.data) {
                    *p -= lr * g;
                }
            }
            return Ok(());
        }

        if self.velocity.len() != params.len() {
            self.velocity = grads.iter().map(|g| g.zeros_like()).collect();
        }

        let momentum = self.momentum;
        for ((param, grad), velocity) in params.iter_mut().zip(grads).zip(&mut self.velocity) {
            for ((p, &g), v) in param
                .data
                .iter_mut()
                .zip(&grad.data)
                .zip(velocity.data.iter_mut())
            {
                *v = momentum * *v + g;
                *p -= lr * *v;
            }
        }
        Ok(())
    }
}

/// Global L2 norm over a set of gradients
pub fn grad_norm(grads: &[&Tensor]) -> f32 {
    grads.iter().map(|g| g.sum_of_squares()).sum::<f32>().sqrt()
}

/// Scale gradients so their global norm is at most `max_norm`
///
/// Returns the norm measured before clipping.
///
/// # Example
///
/// ```rust
/// use bagwise::{clip_grad_norm, Tensor};
///
/// let mut g = Tensor::new(vec![3.0, 4.0], vec![2]);
/// let norm = clip_grad_norm(&mut [&mut g], 1.0);
/// assert_eq!(norm, 5.0);
/// assert!((g.data[0] - 0.6).abs() < 1e-6);
/// ```
pub fn clip_grad_norm(grads: &mut [&mut Tensor], max_norm: f32) -> f32 {
    let norm = grads
        .iter()
        .map(|g| g.sum_of_squares())
        .sum::<f32>()
        .sqrt();

    // Only clip if norm exceeds threshold
    if norm > max_norm && norm > 0.0 {
        let scale = max_norm / norm;
        for grad in grads.iter_mut() {
            grad.scale_in_place(scale);
        }
    }
    norm
}

/// Decays the learning rate by `gamma` every `step_size` calls to [`StepLr::step`]
#[derive(Clone, Debug)]
pub struct StepLr {
    pub step_size: usize,
    pub gamma: f32,
    steps: usize,
}

impl StepLr {
    pub fn new(step_size: usize, gamma: f32) -> Self {
        Self {
            step_size: step_size.max(1),
            gamma,
            steps: 0,
        }
    }

    /// Count one epoch; decay the optimizer's learning rate when due
    pub fn step(&mut self, optimizer: &mut Sgd) {
        self.steps += 1;
        if self.steps % self.step_size == 0 {
            optimizer.learning_rate *= self.gamma;
            tracing::debug!(
                learning_rate = optimizer.learning_rate,
                "learning rate decayed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_sgd_step() {
        let mut w = Tensor::new(vec![1.0, 1.0], vec![2]);
        let mut b = Tensor::new(vec![0.0], vec![1]);
        let gw = Tensor::new(vec![1.0, -2.0], vec![2]);
        let gb = Tensor::new(vec![4.0], vec![1]);

        let mut sgd = Sgd::new(0.5);
        sgd.step(&mut [&mut w, &mut b], &[&gw, &gb]).unwrap();

        assert_eq!(w.data, vec![0.5, 2.0]);
        assert_eq!(b.data, vec![-2.0]);
    }

    #[test]
    fn test_momentum_accumulates() {
        let mut w = Tensor::new(vec![0.0], vec![1]);
        let g = Tensor::new(vec![1.0], vec![1]);

        let mut sgd = Sgd::with_momentum(1.0, 0.5);
        sgd.step(&mut [&mut w], &[&g]).unwrap();
        assert_eq!(w.data, vec![-1.0]);
        // v = 0.5 * 1 + 1 = 1.5
        sgd.step(&mut [&mut w], &[&g]).unwrap();
        assert_eq!(w.data, vec![-2.5]);
    }

    #[test]
    fn test_step_rejects_mismatches() {
        let mut w = Tensor::zeros(vec![2]);
        let g = Tensor::zeros(vec![3]);
        let mut sgd = Sgd::new(0.1);
        assert!(matches!(
            sgd.step(&mut [&mut w], &[&g]),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matches!(
            sgd.step(&mut [&mut w], &[]),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_clip_leaves_small_gradients_alone() {
        let mut g = Tensor::new(vec![0.3, 0.4], vec![2]);
        let norm = clip_grad_norm(&mut [&mut g], 1.0);
        assert!((norm - 0.5).abs() < 1e-6);
        assert_eq!(g.data, vec![0.3, 0.4]);
    }

    #[test]
    fn test_clip_uses_global_norm() {
        let mut a = Tensor::new(vec![3.0], vec![1]);
        let mut b = Tensor::new(vec![4.0], vec![1]);
        clip_grad_norm(&mut [&mut a, &mut b], 0.5);
        assert!((grad_norm(&[&a, &b]) - 0.5).abs() < 1e-6);
        assert!((a.data[0] / b.data[0] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_step_lr_decays_on_schedule() {
        let mut sgd = Sgd::new(1.0);
        let mut schedule = StepLr::new(2, 0.5);

        schedule.step(&mut sgd);
        assert_eq!(sgd.learning_rate, 1.0);
        schedule.step(&mut sgd);
        assert_eq!(sgd.learning_rate, 0.5);
        schedule.step(&mut sgd);
        schedule.step(&mut sgd);
        assert_eq!(sgd.learning_rate, 0.25);
    }
}
