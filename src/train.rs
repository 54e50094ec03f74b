//! Training Data and Training Loop
//!
//! This module connects text to the classifier:
//!
//! ```text
//! "I love this movie"          label 1
//!      │ tokenizer
//!      ▼
//! ["i", "love", "this", "movie"]
//!      │ vocabulary
//!      ▼
//! [2, 5, 1, 0]
//!      │ collate (a batch of sentences)
//!      ▼
//! PackedBatch { tokens, offsets }  +  labels [1, ...]
//!      │ TextClassifier
//!      ▼
//! logits -> cross-entropy -> backward -> SGD step
//! ```
//!
//! Labels are collected in the same order as the packed sentences, so
//! `labels[i]` always belongs to the bag that starts at `offsets[i]`.
//!
//! ## Example
//!
//! ```rust
//! use bagwise::{
//!     build_vocab, train, BasicEnglishTokenizer, ClassifierConfig, LabeledText,
//!     TextClassifier, TextPipeline, TrainingConfig, VocabBuilder,
//! };
//!
//! let samples = vec![
//!     LabeledText::new(1, "I love this movie"),
//!     LabeledText::new(0, "I hate this movie"),
//! ];
//! let tokenizer = BasicEnglishTokenizer::new();
//! let mut vocab = build_vocab(
//!     samples.iter().map(|s| s.text.as_str()),
//!     &tokenizer,
//!     &VocabBuilder::new().specials(["<unk>"]),
//! );
//! vocab.set_default_index(Some(0)).unwrap();
//!
//! let pipeline = TextPipeline::new(&tokenizer, &vocab);
//! let mut model = TextClassifier::new(vocab.len(), ClassifierConfig::tiny(2));
//! let history = train(&mut model, &samples, &pipeline, &TrainingConfig::tiny(), None).unwrap();
//! assert_eq!(history.len(), TrainingConfig::tiny().epochs);
//! ```

use crate::classifier::TextClassifier;
use crate::error::{Error, Result};
use crate::layers::seeded_rng;
use crate::loss::cross_entropy;
use crate::offsets::PackedBatch;
use crate::optimizer::{Sgd, StepLr};
use crate::tokenizer::Tokenize;
use crate::training_logger::TrainingLogger;
use crate::vocab::{Vocab, VocabBuilder};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// A sentence and its class label
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledText {
    pub label: usize,
    pub text: String,
}

impl LabeledText {
    pub fn new(label: usize, text: impl Into<String>) -> Self {
        Self {
            label,
            text: text.into(),
        }
    }
}

/// Tokenize every text and build a vocabulary from the resulting streams
pub fn build_vocab<'a, I, T>(texts: I, tokenizer: &T, builder: &VocabBuilder) -> Vocab
where
    I: IntoIterator<Item = &'a str>,
    T: Tokenize,
{
    builder.build(texts.into_iter().map(|text| tokenizer.tokenize(text)))
}

/// Text-to-indices conversion: tokenizer followed by vocabulary lookup
pub struct TextPipeline<'a, T: Tokenize> {
    tokenizer: &'a T,
    vocab: &'a Vocab,
}

impl<'a, T: Tokenize> TextPipeline<'a, T> {
    pub fn new(tokenizer: &'a T, vocab: &'a Vocab) -> Self {
        Self { tokenizer, vocab }
    }

    pub fn vocab(&self) -> &Vocab {
        self.vocab
    }

    /// Token indices for one sentence
    pub fn encode(&self, text: &str) -> Result<Vec<usize>> {
        let tokens = self.tokenizer.tokenize(text);
        self.vocab.indices_of(&tokens)
    }

    /// Pack several unlabeled sentences for inference
    pub fn pack<S: AsRef<str>>(&self, texts: &[S]) -> Result<PackedBatch> {
        let sequences = texts
            .iter()
            .map(|text| self.encode(text.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(PackedBatch::from_sequences(&sequences))
    }
}

/// Encode and pack a batch of labeled sentences
///
/// # Returns
///
/// Tuple of (labels, packed batch), aligned by position
pub fn collate<T: Tokenize>(
    samples: &[LabeledText],
    pipeline: &TextPipeline<'_, T>,
) -> Result<(Vec<usize>, PackedBatch)> {
    let labels = samples.iter().map(|sample| sample.label).collect();
    let sequences = samples
        .iter()
        .map(|sample| pipeline.encode(&sample.text))
        .collect::<Result<Vec<_>>>()?;
    Ok((labels, PackedBatch::from_sequences(&sequences)))
}

/// Training hyperparameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of passes through the dataset
    pub epochs: usize,
    /// Number of sentences per batch
    pub batch_size: usize,
    /// Initial SGD learning rate
    pub learning_rate: f32,
    /// SGD momentum (0 for plain SGD)
    pub momentum: f32,
    /// Clip the global gradient norm to this value
    pub max_grad_norm: Option<f32>,
    /// Decay the learning rate every this many epochs
    pub lr_step_size: usize,
    /// Learning-rate decay factor
    pub lr_gamma: f32,
    /// Shuffle sample order each epoch
    pub shuffle: bool,
    /// Seed for shuffling
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 64,
            learning_rate: 5.0,
            momentum: 0.0,
            max_grad_norm: Some(0.1),
            lr_step_size: 1,
            lr_gamma: 0.1,
            shuffle: false,
            seed: 0,
        }
    }
}

impl TrainingConfig {
    /// A few epochs over a handful of sentences, one batch per epoch
    pub fn tiny() -> Self {
        Self {
            epochs: 5,
            batch_size: 8,
            learning_rate: 0.5,
            momentum: 0.0,
            max_grad_norm: None,
            lr_step_size: 1,
            lr_gamma: 1.0,
            shuffle: false,
            seed: 0,
        }
    }
}

/// Metrics for one training epoch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number
    pub epoch: usize,
    /// Mean cross-entropy over all samples seen this epoch
    pub loss: f32,
    /// Fraction of samples classified correctly (before each update)
    pub accuracy: f32,
    /// Learning rate used during this epoch
    pub learning_rate: f32,
}

/// Loss and accuracy of a model on a labeled dataset
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
}

/// Train `model` on `samples`, returning per-epoch statistics
///
/// Each epoch walks the samples in batches of `config.batch_size`: pack,
/// forward, cross-entropy, backward, optional clipping, SGD step. The
/// learning rate schedule advances once per epoch.
///
/// # Errors
///
/// [`Error::EmptyBatch`] when there are no samples, [`Error::InvalidLabel`]
/// for a label outside the model's classes, and any lookup error from the
/// pipeline.
pub fn train<T: Tokenize>(
    model: &mut TextClassifier,
    samples: &[LabeledText],
    pipeline: &TextPipeline<'_, T>,
    config: &TrainingConfig,
    mut logger: Option<&mut TrainingLogger>,
) -> Result<Vec<EpochStats>> {
    if samples.is_empty() {
        return Err(Error::EmptyBatch);
    }
    if let Some(sample) = samples.iter().find(|s| s.label >= model.num_classes()) {
        return Err(Error::InvalidLabel {
            label: sample.label,
            num_classes: model.num_classes(),
        });
    }

    let mut optimizer = Sgd::with_momentum(config.learning_rate, config.momentum);
    let mut schedule = StepLr::new(config.lr_step_size, config.lr_gamma);
    let mut rng = seeded_rng(config.seed);
    let mut order: Vec<usize> = (0..samples.len()).collect();
    let batch_size = config.batch_size.max(1);

    tracing::info!(
        samples = samples.len(),
        epochs = config.epochs,
        batch_size,
        parameters = model.count_parameters(),
        "starting training"
    );

    let mut history = Vec::with_capacity(config.epochs);
    for epoch in 1..=config.epochs {
        if config.shuffle {
            order.shuffle(&mut rng);
        }

        let learning_rate = optimizer.learning_rate;
        let mut total_loss = 0.0;
        let mut correct = 0;

        for (batch_idx, chunk) in order.chunks(batch_size).enumerate() {
            let batch: Vec<LabeledText> = chunk.iter().map(|&i| samples[i].clone()).collect();
            let (labels, packed) = collate(&batch, pipeline)?;

            let (logits, cache) = model.forward(&packed)?;
            let (loss, grad_logits) = cross_entropy(&logits, &labels)?;

            correct += logits
                .argmax_rows()
                .iter()
                .zip(&labels)
                .filter(|(predicted, label)| predicted == label)
                .count();
            total_loss += loss * labels.len() as f32;

            let mut grads = model.backward(&grad_logits, &cache);
            let grad_norm = model.apply_gradients(&mut grads, &mut optimizer, config.max_grad_norm)?;

            tracing::debug!(epoch, batch = batch_idx, loss, grad_norm, "batch complete");
        }

        let stats = EpochStats {
            epoch,
            loss: total_loss / samples.len() as f32,
            accuracy: correct as f32 / samples.len() as f32,
            learning_rate,
        };
        tracing::info!(
            epoch,
            loss = stats.loss,
            accuracy = stats.accuracy,
            learning_rate,
            "epoch complete"
        );
        if let Some(logger) = logger.as_deref_mut() {
            logger.log(&stats)?;
        }
        history.push(stats);

        schedule.step(&mut optimizer);
    }

    Ok(history)
}

/// Loss and accuracy of `model` on `samples`, without updating it
pub fn evaluate<T: Tokenize>(
    model: &TextClassifier,
    samples: &[LabeledText],
    pipeline: &TextPipeline<'_, T>,
) -> Result<Evaluation> {
    let (labels, packed) = collate(samples, pipeline)?;
    let (logits, _) = model.forward(&packed)?;
    let (loss, _) = cross_entropy(&logits, &labels)?;
    let correct = logits
        .argmax_rows()
        .iter()
        .zip(&labels)
        .filter(|(predicted, label)| predicted == label)
        .count();
    Ok(Evaluation {
        loss,
        accuracy: correct as f32 / samples.len() as f32,
    })
}
