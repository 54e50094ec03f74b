//! Neural Network Layers
//!
//! The layers a bag-of-embeddings classifier needs. Each one provides both
//! forward and backward passes for training.
//!
//! ## Layers
//!
//! - **embedding**: `Embedding` lookup and `EmbeddingBag` pooling over offsets
//! - **linear**: Fully connected layer
//! - **init**: Seeded parameter initialization
//!
//! ## Design Pattern
//!
//! Each trainable layer follows a consistent pattern:
//!
//! ```rust,ignore
//! pub struct Layer {
//!     // Parameters (weights, biases, etc.)
//! }
//!
//! impl Layer {
//!     pub fn new(...) -> Self { }
//!     pub fn forward(&self, x: ...) -> (Tensor, Cache) { }
//!     pub fn backward(&self, grad: &Tensor, cache: &Cache) -> Gradients { }
//! }
//! ```
//!
//! Backpropagation is explicit: no autograd, every gradient is written out.

pub mod embedding;
pub mod init;
pub mod linear;

// Re-export main types for convenience
pub use embedding::{BagCache, BagMode, Embedding, EmbeddingBag, EmbeddingCache};
pub use init::{normal_init, seeded_rng, uniform_init};
pub use linear::{Linear, LinearCache, LinearGradients};
