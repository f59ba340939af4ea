//! # quarry-core
//!
//! Provider-facing trait APIs for the quarry workspace. The retrieval pipeline in
//! `quarry-rag` never talks to a concrete embedding service or language model; it is
//! generic over the two capabilities defined here, and every provider integration simply
//! implements them.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │  quarry-rag     │───▶│   quarry-core    │◀───│   Providers     │
//! │                 │    │   (this crate)   │    │                 │
//! │ - Chunking      │    │                  │    │ - hosted APIs   │
//! │ - Snapshots     │    │ - EmbeddingModel │    │ - local models  │
//! │ - Ask pipeline  │    │ - LanguageModel  │    │ - test fakes    │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! | Capability | Trait | Description |
//! |------------|-------|-------------|
//! | **Embeddings** | [`EmbeddingModel`] | Batch text to fixed-dimension vectors |
//! | **Generation** | [`LanguageModel`] | Answer a question from ordered context passages |
//!
//! Both traits report failures as [`ProviderError`], which classifies every failure as
//! transient (worth retrying) or fatal.
//!
//! ## Example
//!
//! ```rust
//! use quarry_core::{EmbeddingModel, ProviderError};
//!
//! struct Constant;
//!
//! impl EmbeddingModel for Constant {
//!     fn dim(&self) -> usize {
//!         3
//!     }
//!
//!     async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
//!         Ok(vec![1.0, 0.0, 0.0])
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let vectors = Constant
//!     .embed_batch(&["a".to_owned(), "b".to_owned()])
//!     .await
//!     .unwrap();
//! assert_eq!(vectors.len(), 2);
//! # });
//! ```

/// Text embeddings.
pub mod embedding;
/// Provider failure taxonomy.
pub mod error;
/// Grounded answer generation.
pub mod llm;

#[doc(inline)]
pub use embedding::{Embedding, EmbeddingModel};
#[doc(inline)]
pub use error::ProviderError;
#[doc(inline)]
pub use llm::{GenerationRequest, LanguageModel, Passage};

/// Result type used by provider implementations.
pub type Result<T> = core::result::Result<T, ProviderError>;
