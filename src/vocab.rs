//! Vocabulary Construction
//!
//! A vocabulary maps each token string to a unique integer index. The index
//! is what the embedding table is addressed by, so it must be stable: the same
//! corpus always has to produce the same numbering.
//!
//! ## How Indices Are Assigned
//!
//! 1. **Count** every token across all token streams, remembering where each
//!    token was first seen
//! 2. **Filter** tokens seen fewer than `min_freq` times
//! 3. **Order** the survivors, by default most frequent first with ties broken
//!    by first appearance
//! 4. **Place specials** such as `<unk>` ahead of (or after) the counted tokens
//!
//! ## Example
//!
//! ```text
//! Streams: ["the", "cat"], ["the", "dog"]
//! Specials: ["<unk>"]
//!
//! Counts:  the=2, cat=1, dog=1
//! Indices: <unk>=0, the=1, cat=2, dog=3
//! ```
//!
//! ## Unknown Tokens
//!
//! Looking up a token that was never seen is an error unless a default index
//! is set. The usual setup is a `<unk>` special whose index is also the
//! default, so every unseen word maps to the same embedding row.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// How counted (non-special) tokens are ordered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VocabOrdering {
    /// Most frequent first; ties keep their first-seen order
    #[default]
    Frequency,
    /// Order of first appearance in the token streams
    FirstSeen,
}

/// Options for building a [`Vocab`] from token streams
///
/// # Example
///
/// ```rust
/// use bagwise::VocabBuilder;
///
/// let streams = vec![vec!["the", "cat"], vec!["the", "dog"]];
/// let vocab = VocabBuilder::new()
///     .specials(["<unk>"])
///     .build(streams);
///
/// assert_eq!(vocab.len(), 4);
/// assert_eq!(vocab.index_of("<unk>").unwrap(), 0);
/// assert_eq!(vocab.index_of("the").unwrap(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct VocabBuilder {
    min_freq: usize,
    specials: Vec<String>,
    specials_first: bool,
    ordering: VocabOrdering,
}

impl Default for VocabBuilder {
    fn default() -> Self {
        Self {
            min_freq: 1,
            specials: Vec::new(),
            specials_first: true,
            ordering: VocabOrdering::Frequency,
        }
    }
}

impl VocabBuilder {
    /// Builder with `min_freq = 1`, no specials, frequency ordering
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop tokens seen fewer than `min_freq` times (specials are never dropped)
    pub fn min_freq(mut self, min_freq: usize) -> Self {
        self.min_freq = min_freq.max(1);
        self
    }

    /// Reserve entries for special tokens such as `<unk>` or `<pad>`
    pub fn specials<I, S>(mut self, specials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.specials = specials.into_iter().map(Into::into).collect();
        self
    }

    /// Put specials before (`true`, default) or after counted tokens
    pub fn specials_first(mut self, specials_first: bool) -> Self {
        self.specials_first = specials_first;
        self
    }

    /// Choose how counted tokens are ordered
    pub fn ordering(mut self, ordering: VocabOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Count tokens across `streams` and assign indices
    pub fn build<I, T, S>(&self, streams: I) -> Vocab
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // token -> (count, first position seen)
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut position = 0;
        for stream in streams {
            for token in stream {
                let entry = counts
                    .entry(token.as_ref().to_string())
                    .or_insert((0, position));
                entry.0 += 1;
                position += 1;
            }
        }

        let mut counted: Vec<(String, usize, usize)> = counts
            .into_iter()
            .filter(|(token, (count, _))| *count >= self.min_freq && !self.specials.contains(token))
            .map(|(token, (count, first))| (token, count, first))
            .collect();

        // first-seen positions are unique, so both orders are total
        match self.ordering {
            VocabOrdering::Frequency => {
                counted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.2.cmp(&b.2)))
            }
            VocabOrdering::FirstSeen => counted.sort_by_key(|entry| entry.2),
        }

        let mut specials: Vec<String> = Vec::with_capacity(self.specials.len());
        for special in &self.specials {
            if !specials.contains(special) {
                specials.push(special.clone());
            }
        }

        let counted = counted.into_iter().map(|(token, _, _)| token);
        let itos: Vec<String> = if self.specials_first {
            specials.into_iter().chain(counted).collect()
        } else {
            counted.chain(specials).collect()
        };

        tracing::debug!(
            vocab_size = itos.len(),
            specials = self.specials.len(),
            "built vocabulary"
        );

        Vocab::from_unique(itos, None)
    }
}

/// Token-to-index mapping with an optional fallback index
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocab {
    itos: Vec<String>,
    stoi: HashMap<String, usize>,
    default_index: Option<usize>,
}

/// On-disk representation: the index-ordered token list is enough to
/// rebuild the lookup map.
#[derive(Serialize, Deserialize)]
struct VocabFile {
    itos: Vec<String>,
    default_index: Option<usize>,
}

impl Vocab {
    /// Create a vocabulary from an index-ordered token list
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateToken`] if a token appears twice.
    pub fn from_itos<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self::from_unique(Vec::new(), None);
        for token in tokens {
            vocab.append_token(token)?;
        }
        Ok(vocab)
    }

    fn from_unique(itos: Vec<String>, default_index: Option<usize>) -> Self {
        let stoi = itos
            .iter()
            .enumerate()
            .map(|(index, token)| (token.clone(), index))
            .collect();
        Self {
            itos,
            stoi,
            default_index,
        }
    }

    /// Number of tokens in the vocabulary
    pub fn len(&self) -> usize {
        self.itos.len()
    }

    /// True when the vocabulary has no tokens
    pub fn is_empty(&self) -> bool {
        self.itos.is_empty()
    }

    /// True if `token` has its own entry (ignores the default index)
    pub fn contains(&self, token: &str) -> bool {
        self.stoi.contains_key(token)
    }

    /// Index used for tokens that are not in the vocabulary
    pub fn default_index(&self) -> Option<usize> {
        self.default_index
    }

    /// Set (or clear) the index used for unknown tokens
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if the index has no token.
    pub fn set_default_index(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(index) = index {
            if index >= self.itos.len() {
                return Err(Error::IndexOutOfRange {
                    index,
                    size: self.itos.len(),
                });
            }
        }
        self.default_index = index;
        Ok(())
    }

    /// Look up a token's index
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfVocabulary`] if the token is unknown and no
    /// default index is set.
    pub fn index_of(&self, token: &str) -> Result<usize> {
        match self.stoi.get(token) {
            Some(&index) => Ok(index),
            None => self
                .default_index
                .ok_or_else(|| Error::OutOfVocabulary(token.to_string())),
        }
    }

    /// Look up the index of every token in order
    pub fn indices_of<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<usize>> {
        tokens
            .iter()
            .map(|token| self.index_of(token.as_ref()))
            .collect()
    }

    /// Look up the token stored at `index`
    pub fn token_of(&self, index: usize) -> Result<&str> {
        self.itos
            .get(index)
            .map(String::as_str)
            .ok_or(Error::IndexOutOfRange {
                index,
                size: self.itos.len(),
            })
    }

    /// Look up the token of every index in order
    pub fn tokens_of(&self, indices: &[usize]) -> Result<Vec<&str>> {
        indices.iter().map(|&index| self.token_of(index)).collect()
    }

    /// Add a new token at the end of the vocabulary, returning its index
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateToken`] if the token already exists.
    pub fn append_token<S: Into<String>>(&mut self, token: S) -> Result<usize> {
        let token = token.into();
        if self.stoi.contains_key(&token) {
            return Err(Error::DuplicateToken(token));
        }
        let index = self.itos.len();
        self.stoi.insert(token.clone(), index);
        self.itos.push(token);
        Ok(index)
    }

    /// Tokens in index order
    pub fn itos(&self) -> &[String] {
        &self.itos
    }

    /// Token-to-index map
    pub fn stoi(&self) -> &HashMap<String, usize> {
        &self.stoi
    }

    /// Save the vocabulary to a JSON file
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use bagwise::VocabBuilder;
    /// # let vocab = VocabBuilder::new().build(vec![vec!["a"]]);
    /// vocab.save("vocab.json").expect("Failed to save");
    /// ```
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = VocabFile {
            itos: self.itos.clone(),
            default_index: self.default_index,
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a vocabulary previously written by [`Vocab::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let file: VocabFile = serde_json::from_str(&json)?;
        let mut vocab = Self::from_itos(file.itos)?;
        vocab.set_default_index(file.default_index)?;
        Ok(vocab)
    }
}
