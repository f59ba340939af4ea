//! # Embedding Module
//!
//! Embeddings are dense vector representations of text that capture semantic meaning.
//! Similar texts produce similar vectors, which is what lets the retrieval pipeline find
//! passages by meaning rather than by exact keywords.
//!
//! An [`EmbeddingModel`] has a fixed output dimension. The pipeline pins that dimension
//! into every index it builds, so swapping to a model with a different dimension requires
//! a rebuild.
//!
//! ```rust
//! use quarry_core::EmbeddingModel;
//!
//! async fn example<T: EmbeddingModel>(model: &T) -> quarry_core::Result<()> {
//!     let texts = vec!["Hello, world!".to_owned(), "Goodbye".to_owned()];
//!     let vectors = model.embed_batch(&texts).await?;
//!     assert_eq!(vectors.len(), texts.len());
//!     assert!(vectors.iter().all(|v| v.len() == model.dim()));
//!     Ok(())
//! }
//! ```

use core::future::Future;

use crate::error::ProviderError;

/// A type alias for an embedding vector of 32-bit floats.
pub type Embedding = Vec<f32>;

/// Converts text to vector representations.
///
/// # Implementation Requirements
///
/// - Every returned vector must have length [`dim`](EmbeddingModel::dim).
/// - [`embed_batch`](EmbeddingModel::embed_batch) returns exactly one vector per input, in
///   input order, or fails as a whole. Partial batches are never returned.
/// - Failures must be explicit. Never truncate or pad a vector to hide a provider error;
///   classify it as a [`ProviderError`] so callers know whether to retry.
///
/// # Example
///
/// ```rust
/// use quarry_core::{EmbeddingModel, ProviderError};
///
/// struct MyEmbedding {
///     api_key: String,
/// }
///
/// impl EmbeddingModel for MyEmbedding {
///     fn dim(&self) -> usize {
///         1536
///     }
///
///     async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
///         if self.api_key.is_empty() {
///             return Err(ProviderError::Authentication("missing api key".into()));
///         }
///         Ok(vec![0.0; self.dim()])
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let model = MyEmbedding { api_key: "sk-...".to_string() };
/// let embedding = model.embed("The quick brown fox").await.unwrap();
/// assert_eq!(embedding.len(), 1536);
/// # });
/// ```
pub trait EmbeddingModel: Send + Sync {
    /// Returns the embedding vector dimension.
    fn dim(&self) -> usize;

    /// Converts a single text to an embedding vector.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Embedding, ProviderError>> + Send;

    /// Converts many texts at once.
    ///
    /// The default implementation embeds sequentially and stops at the first error, so it
    /// already honours the all-or-nothing contract. Providers with a native batch endpoint
    /// should override it.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Embedding>, ProviderError>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        }
    }
}
