//! Build a snapshot from a folder and answer a question with offline toy providers.
//!
//! ```text
//! cargo run -p quarry-rag --example basic -- ./docs "How long do refunds take?"
//! ```

use quarry_core::{EmbeddingModel, GenerationRequest, LanguageModel, ProviderError};
use quarry_rag::{Pipeline, RagConfig};
use tracing_subscriber::EnvFilter;

/// Hashes words into buckets so passages sharing vocabulary end up close.
struct WordHashEmbedder;

impl EmbeddingModel for WordHashEmbedder {
    fn dim(&self) -> usize {
        128
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vector = vec![0.0; self.dim()];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(5381_usize, |h, b| h.wrapping_mul(33) ^ usize::from(b));
            let len = vector.len();
            vector[hash % len] += 1.0;
        }
        Ok(vector)
    }
}

/// Quotes the best passage instead of calling a real model.
struct Extractive;

impl LanguageModel for Extractive {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        Ok(request.passages.first().map_or_else(
            || "The documents do not cover this.".to_owned(),
            |passage| format!("{} [{}]", passage.text.trim(), passage.label),
        ))
    }
}

#[tokio::main]
async fn main() -> quarry_rag::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let docs = args.next().unwrap_or_else(|| "./documents".to_owned());
    let question = args
        .next()
        .unwrap_or_else(|| "What is this collection about?".to_owned());

    let index_dir = std::env::temp_dir().join("quarry-basic-example");
    let config = RagConfig::builder()
        .index_dir(index_dir)
        .source_dir(&docs)
        .top_k(3)
        .build();
    let pipeline = Pipeline::open(WordHashEmbedder, Extractive, config).await?;

    let report = pipeline.build_from_directory(&docs).await?;
    println!(
        "snapshot {:?}: {} documents, {} chunks, {} errors",
        report.snapshot_version,
        report.documents_processed,
        report.chunks_created,
        report.errors.len()
    );
    for error in &report.errors {
        println!("  skipped {}: {}", error.source, error.message);
    }
    if !report.success {
        println!("nothing to search yet");
        return Ok(());
    }

    let answer = pipeline.ask(&question).await?;
    println!("\nQ: {question}\nA: {}\n", answer.text);
    for (n, citation) in answer.citations.iter().enumerate() {
        match citation.page {
            Some(page) => println!("[{}] {} (page {page}, score {:.3})", n + 1, citation.source, citation.score),
            None => println!("[{}] {} (score {:.3})", n + 1, citation.source, citation.score),
        }
    }
    Ok(())
}
