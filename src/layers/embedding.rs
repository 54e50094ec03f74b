//! Embedding and EmbeddingBag Layers
//!
//! An embedding is a learnable lookup table: row `i` of the weight matrix is
//! the vector for vocabulary index `i`.
//!
//! ## Embedding
//!
//! ```text
//! Input:  [n] token indices
//! Weight: [vocab_size, dim]
//! Output: [n, dim], one row per token
//! ```
//!
//! ## EmbeddingBag
//!
//! An `EmbeddingBag` looks up every token of a packed batch and reduces each
//! bag (sentence) to a single vector, without materializing the per-token
//! rows of the whole batch:
//!
//! ```text
//! Tokens:  [0, 7, 2, 0, 4, 3, 0, 1, 6, 8, 5]
//! Offsets: [0, 3, 6]
//!
//! Bag 0 = reduce(W[0], W[7], W[2])
//! Bag 1 = reduce(W[0], W[4], W[3])
//! Bag 2 = reduce(W[0], W[1], W[6], W[8], W[5])
//!
//! Output: [3, dim]
//! ```
//!
//! The reduction is a sum, a mean, or an element-wise max. An empty bag
//! (repeated offset) reduces to the zero vector.
//!
//! ## Backward Pass
//!
//! Lookup is a row copy, so its gradient is a scatter-add back into the rows
//! that were read:
//! - **Sum**: every token in the bag receives the bag's gradient
//! - **Mean**: every token receives the bag's gradient divided by bag length
//! - **Max**: per dimension, only the token that won the max receives it
//!
//! A token appearing several times accumulates several contributions.

use super::init::{normal_init, seeded_rng};
use crate::error::{Error, Result};
use crate::offsets::{bag_ranges, PackedBatch};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::ops::Range;

fn check_indices(indices: &[usize], vocab_size: usize) -> Result<()> {
    match indices.iter().find(|&&index| index >= vocab_size) {
        Some(&index) => Err(Error::IndexOutOfRange {
            index,
            size: vocab_size,
        }),
        None => Ok(()),
    }
}

/// Token embedding table
pub struct Embedding {
    /// Embedding weight matrix: [vocab_size, dim]
    pub weight: Tensor,
}

impl Embedding {
    /// Create an embedding table initialized from N(0, 1)
    pub fn new(vocab_size: usize, dim: usize, seed: u64) -> Self {
        let mut rng = seeded_rng(seed);
        Self {
            weight: Tensor::new(normal_init(vocab_size * dim, &mut rng), vec![vocab_size, dim]),
        }
    }

    /// Wrap an existing `[vocab_size, dim]` weight matrix
    pub fn from_weight(weight: Tensor) -> Self {
        assert_eq!(weight.shape.len(), 2, "embedding weight must be 2D");
        Self { weight }
    }

    /// Number of rows in the table
    pub fn vocab_size(&self) -> usize {
        self.weight.shape[0]
    }

    /// Length of each embedding vector
    pub fn dim(&self) -> usize {
        self.weight.shape[1]
    }

    /// Look up one row per index
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if an index has no row.
    pub fn forward(&self, indices: &[usize]) -> Result<(Tensor, EmbeddingCache)> {
        check_indices(indices, self.vocab_size())?;

        let dim = self.dim();
        let mut output = Vec::with_capacity(indices.len() * dim);
        for &index in indices {
            output.extend_from_slice(self.weight.row(index));
        }

        let cache = EmbeddingCache {
            indices: indices.to_vec(),
        };
        Ok((Tensor::new(output, vec![indices.len(), dim]), cache))
    }

    /// Scatter-add `grad_out` [n, dim] back into a [vocab_size, dim] gradient
    pub fn backward(&self, grad_out: &Tensor, cache: &EmbeddingCache) -> Tensor {
        let mut grad_weight = self.weight.zeros_like();
        for (pos, &index) in cache.indices.iter().enumerate() {
            for (g, &d) in grad_weight.row_mut(index).iter_mut().zip(grad_out.row(pos)) {
                *g += d;
            }
        }
        grad_weight
    }
}

/// Cache for embedding backward pass
pub struct EmbeddingCache {
    pub indices: Vec<usize>,
}

/// How an [`EmbeddingBag`] reduces the rows of a bag
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BagMode {
    Sum,
    #[default]
    Mean,
    Max,
}

/// Embedding table that reduces each offset-delimited bag to one vector
pub struct EmbeddingBag {
    /// Embedding weight matrix: [vocab_size, dim]
    pub weight: Tensor,
    pub mode: BagMode,
}

impl EmbeddingBag {
    /// Create a bag layer initialized from N(0, 1)
    pub fn new(vocab_size: usize, dim: usize, mode: BagMode, seed: u64) -> Self {
        let mut rng = seeded_rng(seed);
        Self {
            weight: Tensor::new(normal_init(vocab_size * dim, &mut rng), vec![vocab_size, dim]),
            mode,
        }
    }

    /// Wrap an existing `[vocab_size, dim]` weight matrix
    pub fn from_weight(weight: Tensor, mode: BagMode) -> Self {
        assert_eq!(weight.shape.len(), 2, "embedding weight must be 2D");
        Self { weight, mode }
    }

    /// Re-draw the weights uniformly from `[-init_range, init_range]`
    pub fn reset_uniform(&mut self, init_range: f32, rng: &mut StdRng) {
        self.weight.data = super::init::uniform_init(self.weight.data.len(), init_range, rng);
    }

    /// Number of rows in the table
    pub fn vocab_size(&self) -> usize {
        self.weight.shape[0]
    }

    /// Length of each embedding vector
    pub fn dim(&self) -> usize {
        self.weight.shape[1]
    }

    /// Reduce each bag of `tokens` delimited by `offsets` to one row
    ///
    /// # Arguments
    ///
    /// * `tokens` - Flattened token indices of the whole batch
    /// * `offsets` - Start of each bag within `tokens`
    ///
    /// # Returns
    ///
    /// Tuple of (output [num_bags, dim], cache)
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOffsets`] if the offsets do not delimit bags within
    /// `tokens`, [`Error::IndexOutOfRange`] for a token with no row.
    pub fn forward(&self, tokens: &[usize], offsets: &[usize]) -> Result<(Tensor, BagCache)> {
        let ranges = bag_ranges(offsets, tokens.len())?;
        check_indices(tokens, self.vocab_size())?;

        let dim = self.dim();
        let mut output = Tensor::zeros(vec![ranges.len(), dim]);
        // For max mode: position in `tokens` of the winning row, per (bag, dim)
        let mut max_positions = Vec::new();

        for (bag, range) in ranges.iter().enumerate() {
            if range.is_empty() {
                if self.mode == BagMode::Max {
                    max_positions.extend(std::iter::repeat(None).take(dim));
                }
                continue;
            }

            let out_row = output.row_mut(bag);
            match self.mode {
                BagMode::Sum | BagMode::Mean => {
                    for &token in &tokens[range.clone()] {
                        for (o, &w) in out_row.iter_mut().zip(self.weight.row(token)) {
                            *o += w;
                        }
                    }
                    if self.mode == BagMode::Mean {
                        let len = range.len() as f32;
                        out_row.iter_mut().for_each(|o| *o /= len);
                    }
                }
                BagMode::Max => {
                    let mut winners = vec![range.start; dim];
                    out_row.copy_from_slice(self.weight.row(tokens[range.start]));
                    for pos in range.clone().skip(1) {
                        for (d, &w) in self.weight.row(tokens[pos]).iter().enumerate() {
                            if w > out_row[d] {
                                out_row[d] = w;
                                winners[d] = pos;
                            }
                        }
                    }
                    max_positions.extend(winners.into_iter().map(Some));
                }
            }
        }

        let cache = BagCache {
            tokens: tokens.to_vec(),
            ranges,
            max_positions,
        };
        Ok((output, cache))
    }

    /// Forward pass over a [`PackedBatch`]
    pub fn forward_packed(&self, batch: &PackedBatch) -> Result<(Tensor, BagCache)> {
        self.forward(&batch.tokens, &batch.offsets)
    }

    /// Gradient of the weight table given `grad_out` [num_bags, dim]
    pub fn backward(&self, grad_out: &Tensor, cache: &BagCache) -> Tensor {
        let dim = self.dim();
        let mut grad_weight = self.weight.zeros_like();

        for (bag, range) in cache.ranges.iter().enumerate() {
            if range.is_empty() {
                continue;
            }
            let grad_row = grad_out.row(bag);

            match self.mode {
                BagMode::Sum | BagMode::Mean => {
                    let factor = if self.mode == BagMode::Mean {
                        1.0 / range.len() as f32
                    } else {
                        1.0
                    };
                    for &token in &cache.tokens[range.clone()] {
                        for (g, &d) in grad_weight.row_mut(token).iter_mut().zip(grad_row) {
                            *g += d * factor;
                        }
                    }
                }
                BagMode::Max => {
                    for (d, &grad) in grad_row.iter().enumerate() {
                        if let Some(pos) = cache.max_positions[bag * dim + d] {
                            let token = cache.tokens[pos];
                            grad_weight.data[token * dim + d] += grad;
                        }
                    }
                }
            }
        }

        grad_weight
    }
}

/// Cache for embedding bag backward pass
pub struct BagCache {
    pub tokens: Vec<usize>,
    pub ranges: Vec<Range<usize>>,
    /// Max mode only: winning token position per (bag, dim); `None` for empty bags
    pub max_positions: Vec<Option<usize>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Tensor {
        // 4 tokens x 2 dims
        Tensor::new(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 0.0, -1.0, 8.0],
            vec![4, 2],
        )
    }

    #[test]
    fn test_embedding_lookup() {
        let emb = Embedding::from_weight(table());
        let (out, _) = emb.forward(&[2, 0, 2]).unwrap();
        assert_eq!(out.shape, vec![3, 2]);
        assert_eq!(out.data, vec![5.0, 0.0, 1.0, 2.0, 5.0, 0.0]);
    }

    #[test]
    fn test_embedding_rejects_out_of_range() {
        let emb = Embedding::from_weight(table());
        assert!(matches!(
            emb.forward(&[0, 4]),
            Err(Error::IndexOutOfRange { index: 4, size: 4 })
        ));
    }

    #[test]
    fn test_embedding_backward_accumulates_repeats() {
        let emb = Embedding::from_weight(table());
        let (out, cache) = emb.forward(&[1, 1]).unwrap();
        let grad = Tensor::new(vec![1.0; out.data.len()], out.shape.clone());
        let grad_weight = emb.backward(&grad, &cache);
        assert_eq!(grad_weight.row(1), &[2.0, 2.0]);
        assert_eq!(grad_weight.row(0), &[0.0, 0.0]);
    }

    #[test]
    fn test_bag_mean_matches_embedding_rows() {
        let emb = Embedding::from_weight(table());
        let bag = EmbeddingBag::from_weight(table(), BagMode::Mean);

        let (rows, _) = emb.forward(&[0, 1, 3]).unwrap();
        let (out, _) = bag.forward(&[0, 1, 3], &[0]).unwrap();

        for d in 0..2 {
            let mean = (0..3).map(|r| rows.row(r)[d]).sum::<f32>() / 3.0;
            assert!((out.data[d] - mean).abs() < 1e-6);
        }
    }

    #[test]
    fn test_bag_sum_and_max() {
        let sum = EmbeddingBag::from_weight(table(), BagMode::Sum);
        let (out, _) = sum.forward(&[0, 1, 2, 3], &[0, 2]).unwrap();
        assert_eq!(out.data, vec![4.0, 6.0, 4.0, 8.0]);

        let max = EmbeddingBag::from_weight(table(), BagMode::Max);
        let (out, _) = max.forward(&[0, 1, 2, 3], &[0, 2]).unwrap();
        assert_eq!(out.data, vec![3.0, 4.0, 5.0, 8.0]);
    }

    #[test]
    fn test_empty_bag_is_zero() {
        for mode in [BagMode::Sum, BagMode::Mean, BagMode::Max] {
            let bag = EmbeddingBag::from_weight(table(), mode);
            let (out, cache) = bag.forward(&[1, 2, 3], &[0, 2, 2]).unwrap();
            assert_eq!(out.row(1), &[0.0, 0.0], "mode {:?}", mode);

            let grad = Tensor::new(vec![1.0; 6], vec![3, 2]);
            let grad_weight = bag.backward(&grad, &cache);
            assert_eq!(grad_weight.shape, vec![4, 2]);
        }
    }

    #[test]
    fn test_bag_forward_packed() {
        let bag = EmbeddingBag::from_weight(table(), BagMode::Sum);
        let packed = PackedBatch::from_sequences(&[vec![0], vec![], vec![1, 1]]);
        let (out, _) = bag.forward_packed(&packed).unwrap();
        assert_eq!(out.data, vec![1.0, 2.0, 0.0, 0.0, 6.0, 8.0]);
    }

    #[test]
    fn test_bag_rejects_bad_offsets_and_tokens() {
        let bag = EmbeddingBag::from_weight(table(), BagMode::Mean);
        assert!(matches!(
            bag.forward(&[0, 1], &[1]),
            Err(Error::InvalidOffsets(_))
        ));
        assert!(matches!(
            bag.forward(&[0, 9], &[0]),
            Err(Error::IndexOutOfRange { index: 9, .. })
        ));
    }

    #[test]
    fn test_bag_max_backward_routes_to_winner() {
        let bag = EmbeddingBag::from_weight(table(), BagMode::Max);
        let (_, cache) = bag.forward(&[0, 1], &[0]).unwrap();
        let grad = Tensor::new(vec![1.0, 1.0], vec![1, 2]);
        let grad_weight = bag.backward(&grad, &cache);
        // token 1 = [3, 4] beats token 0 = [1, 2] in both dims
        assert_eq!(grad_weight.row(0), &[0.0, 0.0]);
        assert_eq!(grad_weight.row(1), &[1.0, 1.0]);
    }

    #[test]
    fn test_bag_gradients_match_finite_differences() {
        let tokens = [0, 2, 2, 1, 3];
        let offsets = [0, 3];
        // Loss = sum(output * probe) so d(loss)/d(output) = probe
        let probe = Tensor::new(vec![0.3, -0.7, 1.1, 0.4], vec![2, 2]);

        for mode in [BagMode::Sum, BagMode::Mean] {
            let bag = EmbeddingBag::from_weight(table(), mode);
            let (_, cache) = bag.forward(&tokens, &offsets).unwrap();
            let analytic = bag.backward(&probe, &cache);

            let loss = |weight: Tensor| -> f32 {
                let layer = EmbeddingBag::from_weight(weight, mode);
                let (out, _) = layer.forward(&tokens, &offsets).unwrap();
                out.data.iter().zip(&probe.data).map(|(o, p)| o * p).sum()
            };

            let eps = 1e-2;
            for i in 0..table().data.len() {
                let mut plus = table();
                plus.data[i] += eps;
                let mut minus = table();
                minus.data[i] -= eps;
                let numeric = (loss(plus) - loss(minus)) / (2.0 * eps);
                assert!(
                    (numeric - analytic.data[i]).abs() < 1e-2,
                    "mode {:?} param {}: numeric {} vs analytic {}",
                    mode,
                    i,
                    numeric,
                    analytic.data[i]
                );
            }
        }
    }

    #[test]
    fn test_seeded_construction_is_reproducible() {
        let a = EmbeddingBag::new(5, 3, BagMode::Mean, 11);
        let b = EmbeddingBag::new(5, 3, BagMode::Mean, 11);
        assert_eq!(a.weight, b.weight);
        assert_eq!(Embedding::new(5, 3, 11).weight, a.weight);
    }
}
