//! Bagwise: Bag-of-Embeddings Text Classification from Scratch
//!
//! An educational walk through the mechanics behind a simple neural text
//! classifier: tokenizing sentences, numbering words with a vocabulary,
//! packing variable-length sentences into one buffer with offsets, pooling
//! word embeddings into sentence vectors, and training a linear classifier on
//! top with hand-written backpropagation.
//!
//! # Modules
//!
//! - [`offsets`] - Flattening a batch of sentences and computing start offsets
//! - [`tokenizer`] - Basic English tokenization
//! - [`vocab`] - Vocabulary construction and lookup
//! - [`tensor`] - Minimal 2D tensor
//! - [`layers`] - `Embedding`, `EmbeddingBag`, `Linear`
//! - [`loss`] - Cross-entropy
//! - [`optimizer`] - SGD, gradient clipping, step learning-rate schedule
//! - [`classifier`] - `EmbeddingBag` + `Linear` text classifier
//! - [`train`] - Collation, training loop, evaluation
//! - [`training_logger`] - Per-epoch CSV metrics
//! - [`records`] - Append-only `name,text` CSV log
//!
//! # Example
//!
//! ```rust
//! use bagwise::encode_offsets;
//!
//! let batch = vec![vec![0, 7, 2], vec![0, 4, 3], vec![0, 1, 6, 8, 5]];
//! let (tokens, offsets) = encode_offsets(&batch);
//!
//! assert_eq!(tokens, vec![0, 7, 2, 0, 4, 3, 0, 1, 6, 8, 5]);
//! assert_eq!(offsets, vec![0, 3, 6]);
//! ```

pub mod classifier;
pub mod error;
pub mod layers;
pub mod loss;
pub mod offsets;
pub mod optimizer;
pub mod records;
pub mod tensor;
pub mod tokenizer;
pub mod train;
pub mod training_logger;
pub mod vocab;

// Re-export main types for convenience
pub use classifier::{ClassifierConfig, ClassifierGradients, TextClassifier};
pub use error::{Error, Result};
pub use layers::{BagMode, Embedding, EmbeddingBag, Linear};
pub use loss::cross_entropy;
pub use offsets::{encode_offsets, PackedBatch};
pub use optimizer::{clip_grad_norm, grad_norm, Sgd, StepLr};
pub use records::{read_records, Record, RecordLog};
pub use tensor::Tensor;
pub use tokenizer::{BasicEnglishTokenizer, Tokenize, WhitespaceTokenizer};
pub use train::{
    build_vocab, collate, evaluate, train, EpochStats, Evaluation, LabeledText, TextPipeline,
    TrainingConfig,
};
pub use training_logger::TrainingLogger;
pub use vocab::{Vocab, VocabBuilder, VocabOrdering};
