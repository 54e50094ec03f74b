//! Tokens, Vocabulary and Embeddings
//!
//! This example walks the path from raw sentences to sentence vectors:
//! - Tokenizing sentences
//! - Building a vocabulary and looking words up
//! - Looking up word embeddings
//! - Packing a batch with offsets and pooling it with an EmbeddingBag
//!
//! Run with `RUST_LOG=debug` to see the library's own log lines.

use bagwise::offsets::bag_ranges;
use bagwise::{
    encode_offsets, BagMode, BasicEnglishTokenizer, Embedding, EmbeddingBag, Tokenize,
    VocabBuilder,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Tokens, Vocabulary and Embeddings ===\n");

    let sentences = [
        "I love this movie.",
        "I hate this movie!",
        "I really, really love (most of) this film.",
    ];

    // ========================================================================
    // 1. Tokenization
    // ========================================================================
    println!("{}", "=".repeat(70));
    println!("1. Tokenization");
    println!("{}", "=".repeat(70));

    let tokenizer = BasicEnglishTokenizer::new();
    let tokenized: Vec<Vec<String>> = sentences.iter().map(|s| tokenizer.tokenize(s)).collect();
    for (sentence, tokens) in sentences.iter().zip(&tokenized) {
        println!("  {:45} -> {:?}", format!("\"{}\"", sentence), tokens);
    }

    // ========================================================================
    // 2. Vocabulary
    // ========================================================================
    println!("\n{}", "=".repeat(70));
    println!("2. Vocabulary");
    println!("{}", "=".repeat(70));

    let mut vocab = VocabBuilder::new()
        .specials(["<unk>"])
        .build(tokenized.iter());
    vocab.set_default_index(Some(0))?;

    println!("\n  {} entries (most frequent first):", vocab.len());
    for (index, token) in vocab.itos().iter().enumerate() {
        println!("    [{:2}] {}", index, token);
    }

    let probe = tokenizer.tokenize("I adore this movie");
    println!(
        "\n  \"I adore this movie\" -> {:?}  (\"adore\" is unseen, maps to <unk>)",
        vocab.indices_of(&probe)?
    );

    let indexed: Vec<Vec<usize>> = tokenized
        .iter()
        .map(|tokens| vocab.indices_of(tokens))
        .collect::<Result<_, _>>()?;

    // ========================================================================
    // 3. Word Embeddings
    // ========================================================================
    println!("\n{}", "=".repeat(70));
    println!("3. Word Embeddings");
    println!("{}", "=".repeat(70));

    let embed_dim = 4;
    let embedding = Embedding::new(vocab.len(), embed_dim, 42);
    let (vectors, _) = embedding.forward(&indexed[0])?;

    println!("\n  Embedding table: {} x {}", vocab.len(), embed_dim);
    println!("  Vectors for sentence 1:");
    for (i, &index) in indexed[0].iter().enumerate() {
        println!(
            "    {:8} [{}] -> {:?}",
            vocab.token_of(index)?,
            index,
            rounded(vectors.row(i))
        );
    }

    // ========================================================================
    // 4. Sentence Embeddings with Offsets
    // ========================================================================
    println!("\n{}", "=".repeat(70));
    println!("4. Sentence Embeddings with Offsets");
    println!("{}", "=".repeat(70));

    let (tokens, offsets) = encode_offsets(&indexed);
    println!("\n  Flattened tokens: {:?}", tokens);
    println!("  Offsets:          {:?}", offsets);
    for (i, range) in bag_ranges(&offsets, tokens.len())?.into_iter().enumerate() {
        println!("    sentence {} = tokens[{}..{}]", i + 1, range.start, range.end);
    }

    let bag = EmbeddingBag::from_weight(embedding.weight.clone(), BagMode::Mean);
    let (sentence_vectors, _) = bag.forward(&tokens, &offsets)?;

    println!("\n  Mean-pooled sentence vectors:");
    for i in 0..sentence_vectors.rows() {
        println!("    sentence {} -> {:?}", i + 1, rounded(sentence_vectors.row(i)));
    }

    println!("\n{}", "=".repeat(70));
    Ok(())
}

fn rounded(values: &[f32]) -> Vec<f32> {
    values.iter().map(|v| (v * 1000.0).round() / 1000.0).collect()
}
