//! Basic English Tokenization
//!
//! This module turns raw sentences into word-level tokens. It is deliberately
//! simple: the classifier in this crate learns from bags of words, so there is
//! no need for sub-word units.
//!
//! ## How the Basic English Tokenizer Works
//!
//! 1. **Lowercase** the whole sentence
//! 2. **Pad punctuation** with spaces so it becomes its own token
//!    (`.` `,` `(` `)` `!` `?` and the apostrophe)
//! 3. **Drop noise**: double quotes, `;`, `:` and HTML line breaks (`<br />`)
//! 4. **Split** on runs of whitespace
//!
//! ## Example
//!
//! ```text
//! "I don't like it, at all!"
//!   -> ["i", "don", "'", "t", "like", "it", ",", "at", "all", "!"]
//! ```
//!
//! ## Why Normalize?
//!
//! Without lowercasing, "Movie" and "movie" would get separate vocabulary
//! entries and separate embeddings, halving the training signal each one
//! receives. Splitting punctuation off keeps "great!" and "great" from being
//! different words.

/// Anything that can split a sentence into string tokens
///
/// The vocabulary and the training pipeline are generic over this trait, so a
/// different tokenizer can be swapped in without touching them.
pub trait Tokenize {
    /// Split `text` into tokens
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Replacement rules applied in order after lowercasing
const BASIC_ENGLISH_RULES: &[(&str, &str)] = &[
    ("'", " '  "),
    ("\"", ""),
    (".", " . "),
    ("<br />", " "),
    (",", " , "),
    ("(", " ( "),
    (")", " ) "),
    ("!", " ! "),
    ("?", " ? "),
    (";", " "),
    (":", " "),
];

/// Lowercasing, punctuation-splitting English tokenizer
///
/// # Example
///
/// ```rust
/// use bagwise::{BasicEnglishTokenizer, Tokenize};
///
/// let tokenizer = BasicEnglishTokenizer::new();
/// let tokens = tokenizer.tokenize("Hello, World!");
/// assert_eq!(tokens, vec!["hello", ",", "world", "!"]);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicEnglishTokenizer;

impl BasicEnglishTokenizer {
    /// Create a new tokenizer
    pub fn new() -> Self {
        Self
    }

    /// Normalize a sentence without splitting it
    ///
    /// Useful for inspecting what the tokenizer sees before the split.
    pub fn normalize(&self, text: &str) -> String {
        let mut line = text.to_lowercase();
        for (pattern, replacement) in BASIC_ENGLISH_RULES {
            if line.contains(pattern) {
                line = line.replace(pattern, replacement);
            }
        }
        line
    }
}

impl Tokenize for BasicEnglishTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.normalize(text)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// Tokenizer that only splits on whitespace
///
/// Keeps case and punctuation untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct WhitespaceTokenizer;

impl Tokenize for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }
}
