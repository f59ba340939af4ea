//! Vector index implementations for RAG.
//!
//! This module provides the [`VectorIndex`] trait and the exact [`FlatIndex`]
//! implementation, which scores every entry in parallel.

mod flat;

pub use flat::FlatIndex;

use crate::error::Result;
use crate::types::{IndexEntry, SearchResult};

/// Trait for vector index implementations.
///
/// An index is append-only while it is being built: an entry's identity is its
/// insertion position, and that position breaks ties between equal scores.
pub trait VectorIndex: Send + Sync {
    /// Appends entries.
    ///
    /// The batch is applied entirely or not at all: if any embedding has the wrong
    /// dimension, nothing is appended and [`RagError::DimensionMismatch`](crate::RagError)
    /// is returned.
    fn add(&mut self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Returns up to `k` entries ranked by cosine similarity, highest first.
    ///
    /// An empty index or `k == 0` yields no results for any query. Otherwise a query
    /// whose length differs from [`dimension`](Self::dimension) is a
    /// [`RagError::DimensionMismatch`](crate::RagError).
    ///
    /// # Arguments
    /// * `query` - The query embedding vector
    /// * `k` - Maximum number of results to return
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Returns the embedding dimension.
    fn dimension(&self) -> usize;

    /// Returns the number of indexed chunks.
    fn len(&self) -> usize;

    /// Returns `true` if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
