//! Text chunking for RAG.
//!
//! This module provides the [`Chunker`] trait and the [`FixedSizeChunker`] used by the
//! pipeline. Chunks never span pages, so every chunk carries the exact page it came from.

mod boundary;
mod fixed;

pub use fixed::FixedSizeChunker;

use crate::types::{Chunk, Document};

/// Trait for text chunking strategies.
///
/// Chunkers split documents into smaller pieces that can be individually
/// embedded and searched. Chunking is infallible: a document without visible
/// text simply yields no chunks.
pub trait Chunker: Send + Sync {
    /// Splits a document into chunks, numbered from 0 across all pages.
    fn chunk(&self, doc: &Document) -> Vec<Chunk>;

    /// Returns the name of this chunking strategy.
    fn name(&self) -> &'static str;
}
