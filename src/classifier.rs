//! Bag-of-Embeddings Text Classifier
//!
//! The model is two layers deep:
//!
//! ```text
//! PackedBatch (tokens + offsets)
//!     │
//!     ▼
//! EmbeddingBag (mean)   [num_sentences, embed_dim]
//!     │
//!     ▼
//! Linear                [num_sentences, num_classes]  (logits)
//! ```
//!
//! Word order is ignored: a sentence is the average of its word vectors.
//! That is enough to separate "I love this movie" from "I hate this movie",
//! because the two sentences differ in one word and that word's embedding is
//! free to move during training.
//!
//! ## Initialization
//!
//! Embedding and linear weights are drawn uniformly from
//! `[-init_range, init_range]` (default 0.5) and the bias starts at zero.

use crate::error::{Error, Result};
use crate::layers::{seeded_rng, BagCache, BagMode, EmbeddingBag, Linear, LinearCache};
use crate::offsets::PackedBatch;
use crate::optimizer::{clip_grad_norm, Sgd};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Classifier hyperparameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Length of each word vector
    pub embed_dim: usize,
    /// Number of output classes
    pub num_classes: usize,
    /// How word vectors are pooled into a sentence vector
    pub bag_mode: BagMode,
    /// Half-width of the uniform initialization range
    pub init_range: f32,
    /// Seed for weight initialization
    pub seed: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            embed_dim: 64,
            num_classes: 2,
            bag_mode: BagMode::Mean,
            init_range: 0.5,
            seed: 42,
        }
    }
}

impl ClassifierConfig {
    /// Small configuration for toy datasets of a handful of sentences
    pub fn tiny(num_classes: usize) -> Self {
        Self {
            embed_dim: 8,
            num_classes,
            ..Self::default()
        }
    }
}

/// EmbeddingBag followed by a linear layer
pub struct TextClassifier {
    pub embedding: EmbeddingBag,
    pub fc: Linear,
    config: ClassifierConfig,
}

impl TextClassifier {
    /// Build a classifier for a vocabulary of `vocab_size` tokens
    pub fn new(vocab_size: usize, config: ClassifierConfig) -> Self {
        let mut rng = seeded_rng(config.seed);
        let mut embedding = EmbeddingBag::from_weight(
            Tensor::zeros(vec![vocab_size, config.embed_dim]),
            config.bag_mode,
        );
        embedding.reset_uniform(config.init_range, &mut rng);
        let fc = Linear::new(config.embed_dim, config.num_classes, config.init_range, &mut rng);

        tracing::debug!(
            vocab_size,
            embed_dim = config.embed_dim,
            num_classes = config.num_classes,
            "created text classifier"
        );

        Self {
            embedding,
            fc,
            config,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn vocab_size(&self) -> usize {
        self.embedding.vocab_size()
    }

    pub fn num_classes(&self) -> usize {
        self.config.num_classes
    }

    /// Total number of trainable parameters
    pub fn count_parameters(&self) -> usize {
        self.embedding.weight.data.len() + self.fc.weight.data.len() + self.fc.bias.data.len()
    }

    /// Compute logits `[batch.len(), num_classes]` for a packed batch
    pub fn forward(&self, batch: &PackedBatch) -> Result<(Tensor, ClassifierCache)> {
        let (pooled, bag) = self.embedding.forward_packed(batch)?;
        let (logits, fc) = self.fc.forward(&pooled);
        Ok((logits, ClassifierCache { bag, fc }))
    }

    /// Backpropagate `grad_logits` through both layers
    pub fn backward(&self, grad_logits: &Tensor, cache: &ClassifierCache) -> ClassifierGradients {
        let fc_grads = self.fc.backward(grad_logits, &cache.fc);
        let embedding = self.embedding.backward(&fc_grads.x, &cache.bag);
        ClassifierGradients {
            embedding,
            fc_weight: fc_grads.weight,
            fc_bias: fc_grads.bias,
        }
    }

    /// Clip (optionally) and apply gradients; returns the pre-clip gradient norm
    pub fn apply_gradients(
        &mut self,
        grads: &mut ClassifierGradients,
        optimizer: &mut Sgd,
        max_grad_norm: Option<f32>,
    ) -> Result<f32> {
        let norm = clip_grad_norm(
            &mut [&mut grads.embedding, &mut grads.fc_weight, &mut grads.fc_bias],
            max_grad_norm.unwrap_or(f32::INFINITY),
        );
        optimizer.step(
            &mut [
                &mut self.embedding.weight,
                &mut self.fc.weight,
                &mut self.fc.bias,
            ],
            &[&grads.embedding, &grads.fc_weight, &grads.fc_bias],
        )?;
        Ok(norm)
    }

    /// Class probabilities for each sentence
    pub fn probabilities(&self, batch: &PackedBatch) -> Result<Tensor> {
        let (logits, _) = self.forward(batch)?;
        Ok(logits.softmax_rows())
    }

    /// Most likely class for each sentence
    pub fn predict(&self, batch: &PackedBatch) -> Result<Vec<usize>> {
        let (logits, _) = self.forward(batch)?;
        Ok(logits.argmax_rows())
    }

    /// Save configuration and weights to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let state = ClassifierState {
            config: self.config.clone(),
            vocab_size: self.vocab_size(),
            embedding: self.embedding.weight.data.clone(),
            fc_weight: self.fc.weight.data.clone(),
            fc_bias: self.fc.bias.data.clone(),
        };
        fs::write(path, serde_json::to_string(&state)?)?;
        Ok(())
    }

    /// Load a classifier written by [`TextClassifier::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let state: ClassifierState = serde_json::from_str(&fs::read_to_string(path)?)?;
        let ClassifierState {
            config,
            vocab_size,
            embedding,
            fc_weight,
            fc_bias,
        } = state;

        let expect = |name: &str, got: usize, want: usize| -> Result<()> {
            if got == want {
                Ok(())
            } else {
                Err(Error::ShapeMismatch(format!(
                    "{} has {} values, expected {}",
                    name, got, want
                )))
            }
        };
        expect("embedding", embedding.len(), vocab_size * config.embed_dim)?;
        expect("fc_weight", fc_weight.len(), config.embed_dim * config.num_classes)?;
        expect("fc_bias", fc_bias.len(), config.num_classes)?;

        Ok(Self {
            embedding: EmbeddingBag::from_weight(
                Tensor::new(embedding, vec![vocab_size, config.embed_dim]),
                config.bag_mode,
            ),
            fc: Linear::from_parts(
                Tensor::new(fc_weight, vec![config.embed_dim, config.num_classes]),
                Tensor::new(fc_bias, vec![config.num_classes]),
            ),
            config,
        })
    }
}

/// Cached activations for the classifier backward pass
pub struct ClassifierCache {
    pub bag: BagCache,
    pub fc: LinearCache,
}

/// Gradients for every classifier parameter
pub struct ClassifierGradients {
    pub embedding: Tensor,
    pub fc_weight: Tensor,
    pub fc_bias: Tensor,
}

#[derive(Serialize, Deserialize)]
struct ClassifierState {
    config: ClassifierConfig,
    vocab_size: usize,
    embedding: Vec<f32>,
    fc_weight: Vec<f32>,
    fc_bias: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::cross_entropy;

    fn batch() -> PackedBatch {
        PackedBatch::from_sequences(&[vec![0, 1, 2], vec![0, 3, 2], vec![4]])
    }

    #[test]
    fn test_forward_shape() {
        let model = TextClassifier::new(5, ClassifierConfig::tiny(3));
        let (logits, _) = model.forward(&batch()).unwrap();
        assert_eq!(logits.shape, vec![3, 3]);
        assert_eq!(model.count_parameters(), 5 * 8 + 8 * 3 + 3);
    }

    #[test]
    fn test_init_respects_range() {
        let model = TextClassifier::new(5, ClassifierConfig::tiny(2));
        assert!(model
            .embedding
            .weight
            .data
            .iter()
            .all(|w| w.abs() <= 0.5));
        assert!(model.fc.bias.data.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_empty_sentence_gets_bias_logits() {
        let model = TextClassifier::new(5, ClassifierConfig::tiny(2));
        let packed = PackedBatch::from_sequences(&[vec![1], vec![]]);
        let (logits, _) = model.forward(&packed).unwrap();
        // Zero pooled vector times W plus a zero bias
        assert_eq!(logits.row(1), &[0.0, 0.0]);
    }

    #[test]
    fn test_rejects_unknown_token() {
        let model = TextClassifier::new(3, ClassifierConfig::tiny(2));
        assert!(matches!(
            model.forward(&batch()),
            Err(Error::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_gradient_step_reduces_loss() {
        let mut model = TextClassifier::new(5, ClassifierConfig::tiny(2));
        let labels = [1, 0, 1];
        let mut sgd = Sgd::new(0.1);

        let (logits, cache) = model.forward(&batch()).unwrap();
        let (before, grad) = cross_entropy(&logits, &labels).unwrap();
        let mut grads = model.backward(&grad, &cache);
        model.apply_gradients(&mut grads, &mut sgd, None).unwrap();

        let (logits, _) = model.forward(&batch()).unwrap();
        let (after, _) = cross_entropy(&logits, &labels).unwrap();
        assert!(after < before, "loss went from {} to {}", before, after);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = TextClassifier::new(5, ClassifierConfig::tiny(4));
        let probs = model.probabilities(&batch()).unwrap();
        for i in 0..3 {
            assert!((probs.row(i).iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
        assert_eq!(model.predict(&batch()).unwrap().len(), 3);
    }

    #[test]
    fn test_save_load_roundtrip_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let model = TextClassifier::new(5, ClassifierConfig::tiny(3));
        model.save(&path).unwrap();
        let loaded = TextClassifier::load(&path).unwrap();

        assert_eq!(loaded.config(), model.config());
        for (a, b) in loaded
            .embedding
            .weight
            .data
            .iter()
            .zip(&model.embedding.weight.data)
        {
            assert!((a - b).abs() < 1e-6);
        }
        assert_eq!(
            loaded.predict(&batch()).unwrap(),
            model.predict(&batch()).unwrap()
        );
    }
}
