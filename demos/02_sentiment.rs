//! Sentiment Classification with a Bag of Embeddings
//!
//! Trains the `EmbeddingBag` + `Linear` classifier on a handful of labeled
//! sentences, then classifies a few new ones.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --example 02_sentiment
//! cargo run --release --example 02_sentiment -- --epochs 500 --lr 0.5
//! cargo run --release --example 02_sentiment -- --log training_log.csv --records asked.csv
//! RUST_LOG=bagwise=debug cargo run --release --example 02_sentiment
//! ```

use bagwise::{
    build_vocab, evaluate, train, BagMode, BasicEnglishTokenizer, ClassifierConfig, LabeledText,
    Record, RecordLog, TextClassifier, TextPipeline, TrainingConfig, TrainingLogger, VocabBuilder,
};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "02_sentiment",
    about = "Train a bag-of-embeddings sentiment classifier on a few sentences"
)]
struct Args {
    /// Passes over the training sentences
    #[arg(long, default_value = "300")]
    epochs: usize,

    /// SGD learning rate
    #[arg(long, default_value = "0.5")]
    lr: f32,

    /// Embedding width
    #[arg(long, default_value = "8")]
    embed_dim: usize,

    /// Pooling: sum, mean or max
    #[arg(long, default_value = "mean")]
    mode: String,

    /// Write per-epoch metrics to this CSV file
    #[arg(long)]
    log: Option<PathBuf>,

    /// Append each classified sentence to this `name,text` CSV file
    #[arg(long)]
    records: Option<PathBuf>,

    /// Name recorded alongside each classified sentence
    #[arg(long, default_value = "demo")]
    name: String,

    /// Save the trained model as JSON
    #[arg(long)]
    save: Option<PathBuf>,
}

const LABELS: [&str; 2] = ["negative", "positive"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bagwise=info")),
        )
        .init();

    let args = Args::parse();

    let bag_mode = match args.mode.as_str() {
        "sum" => BagMode::Sum,
        "mean" => BagMode::Mean,
        "max" => BagMode::Max,
        other => return Err(format!("unknown pooling mode '{}'", other).into()),
    };

    println!("=== Sentiment Classification ===\n");

    let samples = vec![
        LabeledText::new(1, "I love this movie"),
        LabeledText::new(0, "I hate this movie"),
        LabeledText::new(1, "What a great film!"),
        LabeledText::new(0, "What a terrible, boring film."),
        LabeledText::new(1, "Great acting and a lovely story"),
        LabeledText::new(0, "Boring story, I hate it"),
    ];

    // Vocabulary
    let tokenizer = BasicEnglishTokenizer::new();
    let mut vocab = build_vocab(
        samples.iter().map(|s| s.text.as_str()),
        &tokenizer,
        &VocabBuilder::new().specials(["<unk>"]),
    );
    vocab.set_default_index(Some(0))?;
    let pipeline = TextPipeline::new(&tokenizer, &vocab);
    println!("Vocabulary: {} tokens", vocab.len());

    // Model
    let mut model = TextClassifier::new(
        vocab.len(),
        ClassifierConfig {
            embed_dim: args.embed_dim,
            num_classes: LABELS.len(),
            bag_mode,
            ..ClassifierConfig::default()
        },
    );
    println!(
        "Model: {} x {} embeddings ({:?} pooling), {} parameters\n",
        model.vocab_size(),
        args.embed_dim,
        bag_mode,
        model.count_parameters()
    );

    // Training
    let config = TrainingConfig {
        epochs: args.epochs,
        learning_rate: args.lr,
        ..TrainingConfig::tiny()
    };
    let mut logger = match &args.log {
        Some(path) => Some(TrainingLogger::new(path)?),
        None => None,
    };
    let history = train(&mut model, &samples, &pipeline, &config, logger.as_mut())?;

    if let (Some(first), Some(last)) = (history.first(), history.last()) {
        println!(
            "Loss: {:.4} (epoch {}) -> {:.4} (epoch {})",
            first.loss, first.epoch, last.loss, last.epoch
        );
    }
    let result = evaluate(&model, &samples, &pipeline)?;
    println!(
        "Training set: loss {:.4}, accuracy {:.1}%\n",
        result.loss,
        result.accuracy * 100.0
    );

    // Inference
    let queries = [
        "I love this film",
        "What a boring movie",
        "A lovely, great story",
        "I hate the acting",
    ];
    let batch = pipeline.pack(&queries)?;
    let probabilities = model.probabilities(&batch)?;
    let predictions = model.predict(&batch)?;

    println!("{}", "=".repeat(70));
    for (i, query) in queries.iter().enumerate() {
        let label = LABELS[predictions[i]];
        let confidence = probabilities.row(i)[predictions[i]];
        println!("  {:30} -> {:8} ({:.1}%)", query, label, confidence * 100.0);
    }
    println!("{}", "=".repeat(70));

    if let Some(path) = &args.records {
        let mut log = RecordLog::open(path)?;
        for query in &queries {
            log.append(&Record::new(args.name.as_str(), *query))?;
        }
        println!("\nAppended {} records to {}", queries.len(), path.display());
    }

    if let Some(path) = &args.save {
        model.save(path)?;
        println!("Saved model to {}", path.display());
    }

    Ok(())
}
