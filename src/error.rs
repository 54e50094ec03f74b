//! Error types for bagwise.

/// Errors that can occur while building vocabularies, packing batches,
/// running layers, or reading and writing log files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Token not in the vocabulary and no default index is set.
    #[error("token {0:?} is not in the vocabulary and no default index is set")]
    OutOfVocabulary(String),

    /// Index past the end of a vocabulary or embedding table.
    #[error("index {index} out of range (size = {size})")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of valid entries.
        size: usize,
    },

    /// Token appended to a vocabulary that already contains it.
    #[error("token {0:?} is already in the vocabulary")]
    DuplicateToken(String),

    /// Offsets that do not delimit bags within the flattened buffer.
    #[error("invalid offsets: {0}")]
    InvalidOffsets(String),

    /// Tensor or batch shapes that do not line up.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// An operation that needs at least one sample received none.
    #[error("empty batch")]
    EmptyBatch,

    /// Class label outside `0..num_classes`.
    #[error("label {label} out of range for {num_classes} classes")]
    InvalidLabel {
        /// The offending label.
        label: usize,
        /// Number of classes the model predicts.
        num_classes: usize,
    },

    /// Malformed CSV content.
    #[error("csv error at line {line}: {message}")]
    Csv {
        /// 1-based line where the problem was detected.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias for bagwise operations.
pub type Result<T> = std::result::Result<T, Error>;
