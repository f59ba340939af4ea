//! Retrieval-augmented question answering over a private document collection.
//!
//! The [`Pipeline`] glues any [`EmbeddingModel`](quarry_core::EmbeddingModel) and
//! [`LanguageModel`](quarry_core::LanguageModel) to a chunker, an exact vector index and an
//! atomic on-disk snapshot store:
//!
//! - [`Pipeline::build_from_directory`] – extract, chunk, embed and index a file tree, then
//!   promote the result as a new snapshot.
//! - [`Pipeline::build_from_uploads`] – store uploaded files and rebuild.
//! - [`Pipeline::ask`] – retrieve the best passages and generate a cited answer.
//!
//! ```text
//! documents ─▶ loader ─▶ chunking ─▶ embedding ─▶ FlatIndex ─▶ snapshot store
//!                                                               │
//! question ─▶ embedding ─▶ retrieval (current snapshot) ◀───────┘
//!                              │
//!                              ▼
//!                       context window ─▶ language model ─▶ Answer + citations
//! ```
//!
//! Builds never disturb readers: questions are answered from the snapshot that was
//! current when they started, and a failed build leaves it untouched.

pub mod chunking;
pub mod config;
pub mod context;
pub mod error;
pub mod index;
pub mod indexing;
pub mod loader;
pub mod persistence;
pub mod pipeline;
pub mod retrieval;
pub mod types;

pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{RagConfig, RagConfigBuilder, RetryPolicy};
pub use context::{ContextWindow, assemble};
pub use error::{ParseError, RagError, Result};
pub use index::{FlatIndex, VectorIndex};
pub use indexing::{BuildProgress, BuildStage, collect_files};
pub use loader::{DocumentFormat, load_document};
pub use persistence::{DirectorySnapshotStore, Snapshot, SnapshotHandle, SnapshotStore};
pub use pipeline::{Pipeline, PipelineState};
pub use retrieval::Retriever;
pub use types::{
    Answer, BuildReport, Chunk, Citation, Document, DocumentError, IndexEntry, Page,
    SearchResult, Upload,
};
