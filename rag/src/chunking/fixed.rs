//! Fixed-size text chunking with boundary-aware split points.

use crate::error::{RagError, Result};
use crate::types::{Chunk, Document};

use super::Chunker;
use super::boundary::PageText;

/// Chunks each page into windows of at most `chunk_size` characters.
///
/// Consecutive chunks of a page share exactly `overlap` characters. Split points are
/// searched in the last quarter of each window, preferring sentence boundaries, then
/// whitespace, and falling back to a hard cut at `chunk_size`. Only the last chunk of a
/// page may be shorter than [`min_len`](Self::min_len).
///
/// # Example
///
/// ```rust
/// use quarry_rag::chunking::{Chunker, FixedSizeChunker};
/// use quarry_rag::Document;
///
/// let chunker = FixedSizeChunker::new(100, 20).unwrap();
/// let doc = Document::new("doc1", "Long text content...");
/// let chunks = chunker.chunk(&doc);
/// assert_eq!(chunks.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    /// Maximum size of each chunk in characters.
    chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    overlap: usize,
}

impl FixedSizeChunker {
    /// Creates a new fixed-size chunker.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "overlap ({overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Maximum chunk length.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared by consecutive chunks.
    #[must_use]
    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Minimum length of every chunk except the last one of a page.
    #[must_use]
    pub fn min_len(&self) -> usize {
        (self.overlap + 1).max(self.chunk_size - self.chunk_size / 4)
    }

    /// Char spans `(start, end)` covering one page.
    fn spans(&self, page: &PageText<'_>) -> Vec<(usize, usize)> {
        let len = page.len();
        let mut spans = Vec::new();
        let mut start = 0;
        loop {
            if len - start <= self.chunk_size {
                spans.push((start, len));
                return spans;
            }
            let hi = start + self.chunk_size;
            let lo = start + self.min_len();
            let end = page.split_point(lo, hi);
            spans.push((start, end));
            start = end - self.overlap;
        }
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, doc: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in &doc.pages {
            if page.text.trim().is_empty() {
                continue;
            }
            let text = PageText::new(&page.text);
            for (start, end) in self.spans(&text) {
                chunks.push(Chunk {
                    text: text.slice(start, end).to_owned(),
                    source: doc.id.clone(),
                    page: page.number,
                    index: chunks.len(),
                    start,
                    len: end - start,
                });
            }
        }
        chunks
    }

    fn name(&self) -> &'static str {
        "fixed_size"
    }
}
