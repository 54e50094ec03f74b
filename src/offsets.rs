//! Offset Encoding for Variable-Length Batches
//!
//! Bag-style aggregation (see [`EmbeddingBag`](crate::layers::EmbeddingBag))
//! consumes a whole batch of sentences at once. Rather than padding every
//! sentence to the same length, the batch is packed into one flat buffer of
//! token indices plus an array of start offsets, one per sentence.
//!
//! ## Example
//!
//! ```text
//! Batch:     [[0, 7, 2], [0, 4, 3], [0, 1, 6, 8, 5]]
//! Lengths:   [3, 3, 5]
//!
//! Flattened: [0, 7, 2, 0, 4, 3, 0, 1, 6, 8, 5]
//! Offsets:   [0, 3, 6]
//! ```
//!
//! The offsets are an exclusive prefix sum of the sequence lengths: a leading
//! zero, and the final running total dropped, so there is exactly one offset
//! per sentence. Bag `i` spans `offsets[i]..offsets[i + 1]`, and the last bag
//! runs to the end of the buffer.
//!
//! ## Empty Sentences
//!
//! An empty sentence contributes no tokens, so its offset coincides with the
//! next one:
//!
//! ```text
//! Batch:     [[1, 2], [], [3]]
//! Flattened: [1, 2, 3]
//! Offsets:   [0, 2, 2]
//! ```
//!
//! Repeated offsets are valid. Downstream aggregation treats the bag as
//! empty and produces a zero vector for it.

use crate::error::{Error, Result};
use std::ops::Range;

/// Flatten a batch of token sequences and compute each sequence's start offset
///
/// Performs a single left-to-right pass, keeping a running total of the
/// lengths seen so far. Both output buffers are allocated once at their final
/// size.
///
/// # Arguments
///
/// * `batch` - Ordered token sequences; any of them may be empty
///
/// # Returns
///
/// Tuple of (flattened tokens, offsets) where `offsets.len() == batch.len()`
///
/// # Example
///
/// ```rust
/// use bagwise::encode_offsets;
///
/// let batch = vec![vec![1, 2], vec![], vec![3]];
/// let (tokens, offsets) = encode_offsets(&batch);
/// assert_eq!(tokens, vec![1, 2, 3]);
/// assert_eq!(offsets, vec![0, 2, 2]);
/// ```
pub fn encode_offsets<S: AsRef<[usize]>>(batch: &[S]) -> (Vec<usize>, Vec<usize>) {
    let total: usize = batch.iter().map(|seq| seq.as_ref().len()).sum();

    let mut tokens = Vec::with_capacity(total);
    let mut offsets = Vec::with_capacity(batch.len());

    for seq in batch {
        // Running total before this sequence is appended
        offsets.push(tokens.len());
        tokens.extend_from_slice(seq.as_ref());
    }

    (tokens, offsets)
}

/// Turn offsets into one index range per bag
///
/// Unlike [`encode_offsets`], this accepts offsets from outside the crate and
/// so checks them: the first offset must be zero, offsets must never
/// decrease, and none may point past `total_len`.
///
/// # Errors
///
/// Returns [`Error::InvalidOffsets`] when the offsets do not delimit bags
/// within a buffer of `total_len` tokens.
///
/// # Example
///
/// ```rust
/// use bagwise::offsets::bag_ranges;
///
/// let ranges = bag_ranges(&[0, 2, 2], 3).unwrap();
/// assert_eq!(ranges, vec![0..2, 2..2, 2..3]);
/// ```
pub fn bag_ranges(offsets: &[usize], total_len: usize) -> Result<Vec<Range<usize>>> {
    if offsets.is_empty() {
        if total_len == 0 {
            return Ok(Vec::new());
        }
        return Err(Error::InvalidOffsets(format!(
            "{} tokens but no offsets",
            total_len
        )));
    }

    if offsets[0] != 0 {
        return Err(Error::InvalidOffsets(format!(
            "first offset must be 0, got {}",
            offsets[0]
        )));
    }

    let mut ranges = Vec::with_capacity(offsets.len());
    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(total_len);
        if end < start {
            return Err(Error::InvalidOffsets(format!(
                "offset {} ({}) is past the end of its bag ({})",
                i, start, end
            )));
        }
        if end > total_len {
            return Err(Error::InvalidOffsets(format!(
                "offset {} ({}) exceeds buffer length {}",
                i + 1,
                end,
                total_len
            )));
        }
        ranges.push(start..end);
    }

    Ok(ranges)
}

/// A batch packed into a flat token buffer plus per-sequence offsets
///
/// Produced by [`PackedBatch::from_sequences`]; always satisfies the offset
/// invariants, so bag lookups cannot fail.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PackedBatch {
    /// All token indices, in batch order
    pub tokens: Vec<usize>,
    /// Start position of each sequence within `tokens`
    pub offsets: Vec<usize>,
}

impl PackedBatch {
    /// Pack a batch of token sequences
    pub fn from_sequences<S: AsRef<[usize]>>(batch: &[S]) -> Self {
        let (tokens, offsets) = encode_offsets(batch);
        Self { tokens, offsets }
    }

    /// Number of sequences (bags) in the batch
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// True when the batch holds no sequences
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Total number of tokens across all sequences
    pub fn num_tokens(&self) -> usize {
        self.tokens.len()
    }

    /// Tokens of sequence `i`
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`
    pub fn bag(&self, i: usize) -> &[usize] {
        let start = self.offsets[i];
        let end = self
            .offsets
            .get(i + 1)
            .copied()
            .unwrap_or(self.tokens.len());
        &self.tokens[start..end]
    }

    /// Iterate over the sequences in batch order
    pub fn bags(&self) -> impl Iterator<Item = &[usize]> + '_ {
        (0..self.len()).map(move |i| self.bag(i))
    }
}
