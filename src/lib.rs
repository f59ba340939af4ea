//! # quarry
//!
//! High level façade crate that re-exports the provider traits from [`quarry_core`] and,
//! behind features, the retrieval pipeline and PDF extraction. Pull this crate into your
//! binary to answer questions over a private document collection with any embedding
//! provider and language model that implement the core traits.
//!
//! ## What's inside?
//!
//! - [`EmbeddingModel`] and [`LanguageModel`], the two capabilities a provider implements.
//! - [`rag`] (feature `rag`, on by default): chunking, exact vector search, atomic on-disk
//!   snapshots and the [`Pipeline`](rag::Pipeline) that returns cited answers.
//! - [`pdf`] (feature `pdf`): page-by-page PDF text extraction.
//!
//! ## Example
//!
//! ```rust,no_run
//! use quarry::rag::{Pipeline, RagConfig};
//! use quarry::{EmbeddingModel, LanguageModel};
//!
//! async fn demo<E: EmbeddingModel, G: LanguageModel>(embedder: E, llm: G) -> quarry::rag::Result<()> {
//!     let config = RagConfig::builder()
//!         .index_dir("./index")
//!         .source_dir("./documents")
//!         .build();
//!     let pipeline = Pipeline::open(embedder, llm, config).await?;
//!     pipeline.build_from_directory("./documents").await?;
//!
//!     let answer = pipeline.ask("How long do refunds take?").await?;
//!     println!("{}", answer.text);
//!     for citation in &answer.citations {
//!         println!("  {} page {:?}", citation.source, citation.page);
//!     }
//!     Ok(())
//! }
//! ```

pub use quarry_core::*;

/// Retrieval pipeline.
#[cfg(feature = "rag")]
pub use quarry_rag as rag;

/// PDF text extraction.
#[cfg(feature = "pdf")]
pub use quarry_pdf as pdf;
