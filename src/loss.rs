//! Cross-Entropy Loss
//!
//! For a batch of logits `[n, classes]` and integer targets:
//!
//! ```text
//! loss = -mean_i( log softmax(logits_i)[target_i] )
//! ```
//!
//! The log-softmax is computed with the row max subtracted first
//! (log-sum-exp trick) so large logits cannot overflow.
//!
//! ## Gradient
//!
//! ```text
//! d(loss)/d(logits_i) = (softmax(logits_i) - onehot(target_i)) / n
//! ```

use crate::error::{Error, Result};
use crate::tensor::Tensor;

/// Mean cross-entropy over a batch, and its gradient w.r.t. the logits
///
/// # Errors
///
/// [`Error::EmptyBatch`] for zero rows, [`Error::ShapeMismatch`] if the
/// number of targets differs from the number of rows, and
/// [`Error::InvalidLabel`] for a target outside `0..classes`.
///
/// # Example
///
/// ```rust
/// use bagwise::{cross_entropy, Tensor};
///
/// let logits = Tensor::new(vec![0.0, 0.0], vec![1, 2]);
/// let (loss, _grad) = cross_entropy(&logits, &[1]).unwrap();
/// assert!((loss - 2f32.ln()).abs() < 1e-6);
/// ```
pub fn cross_entropy(logits: &Tensor, targets: &[usize]) -> Result<(f32, Tensor)> {
    let rows = logits.rows();
    let classes = logits.cols();

    if rows == 0 {
        return Err(Error::EmptyBatch);
    }
    if targets.len() != rows {
        return Err(Error::ShapeMismatch(format!(
            "{} targets for {} rows of logits",
            targets.len(),
            rows
        )));
    }
    if let Some(&label) = targets.iter().find(|&&t| t >= classes) {
        return Err(Error::InvalidLabel {
            label,
            num_classes: classes,
        });
    }

    let probs = logits.softmax_rows();
    let mut grad = probs.clone();
    let mut total_loss = 0.0;

    for (i, &target) in targets.iter().enumerate() {
        let row = logits.row(i);
        let max_logit = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let exp_sum: f32 = row.iter().map(|&x| (x - max_logit).exp()).sum();
        let log_prob = (row[target] - max_logit) - exp_sum.ln();
        total_loss -= log_prob;

        grad.row_mut(i)[target] -= 1.0;
    }

    grad.scale_in_place(1.0 / rows as f32);
    Ok((total_loss / rows as f32, grad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_logits_give_log_classes() {
        let logits = Tensor::zeros(vec![3, 4]);
        let (loss, _) = cross_entropy(&logits, &[0, 1, 3]).unwrap();
        assert!((loss - 4f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn test_confident_correct_prediction_has_low_loss() {
        let logits = Tensor::new(vec![10.0, -10.0], vec![1, 2]);
        let (loss, _) = cross_entropy(&logits, &[0]).unwrap();
        assert!(loss < 1e-4);
    }

    #[test]
    fn test_large_logits_stay_finite() {
        let logits = Tensor::new(vec![1000.0, 0.0], vec![1, 2]);
        let (loss, grad) = cross_entropy(&logits, &[1]).unwrap();
        assert!(loss.is_finite());
        assert!((loss - 1000.0).abs() < 1e-2);
        assert!(grad.data.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn test_gradient_rows_sum_to_zero() {
        let logits = Tensor::new(vec![0.5, -1.0, 2.0, 0.0, 0.3, 0.3], vec![2, 3]);
        let (_, grad) = cross_entropy(&logits, &[2, 0]).unwrap();
        for i in 0..2 {
            let sum: f32 = grad.row(i).iter().sum();
            assert!(sum.abs() < 1e-6);
        }
        // Target entries are pushed down, others up
        assert!(grad.row(0)[2] < 0.0);
        assert!(grad.row(1)[1] > 0.0);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let base = Tensor::new(vec![0.5, -1.0, 2.0, 0.0, 0.3, 0.3], vec![2, 3]);
        let targets = [1, 2];
        let (_, grad) = cross_entropy(&base, &targets).unwrap();

        let eps = 1e-2;
        for i in 0..base.data.len() {
            let mut plus = base.clone();
            plus.data[i] += eps;
            let mut minus = base.clone();
            minus.data[i] -= eps;
            let numeric = (cross_entropy(&plus, &targets).unwrap().0
                - cross_entropy(&minus, &targets).unwrap().0)
                / (2.0 * eps);
            assert!((numeric - grad.data[i]).abs() < 1e-3);
        }
    }

    #[test]
    fn test_errors() {
        let logits = Tensor::zeros(vec![2, 2]);
        assert!(matches!(
            cross_entropy(&Tensor::zeros(vec![0, 2]), &[]),
            Err(Error::EmptyBatch)
        ));
        assert!(matches!(
            cross_entropy(&logits, &[0]),
            Err(Error::ShapeMismatch(_))
        ));
        assert!(matches!(
            cross_entropy(&logits, &[0, 2]),
            Err(Error::InvalidLabel {
                label: 2,
                num_classes: 2
            })
        ));
    }
}
