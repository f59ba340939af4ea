//! Core types for the RAG crate.

use serde::{Deserialize, Serialize};

/// One page of extracted text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number; `None` for unpaginated documents.
    pub number: Option<u32>,
    /// Raw page text.
    pub text: String,
}

/// A document to be indexed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier: path relative to the ingestion root, or upload name.
    pub id: String,
    /// Pages in reading order.
    pub pages: Vec<Page>,
}

impl Document {
    /// Creates an unpaginated document.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pages: vec![Page {
                number: None,
                text: text.into(),
            }],
        }
    }

    /// Creates a paginated document; pages are numbered from 1.
    #[must_use]
    pub fn paginated<I, S>(id: impl Into<String>, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            pages: (1u32..)
                .zip(pages)
                .map(|(number, text)| Page {
                    number: Some(number),
                    text: text.into(),
                })
                .collect(),
        }
    }

    /// Total page count when paginated.
    #[must_use]
    pub fn page_count(&self) -> Option<usize> {
        self.pages
            .iter()
            .any(|page| page.number.is_some())
            .then_some(self.pages.len())
    }

    /// Returns `true` when the document holds no visible text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.text.trim().is_empty())
    }
}

/// A chunk of text derived from a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content of the chunk.
    pub text: String,
    /// Parent document ID.
    pub source: String,
    /// Page the chunk lies on.
    pub page: Option<u32>,
    /// Sequence index within the document, continuous across pages.
    pub index: usize,
    /// Character offset of the chunk within its page.
    pub start: usize,
    /// Length in characters.
    pub len: usize,
}

impl Chunk {
    /// Identifier of the form `{source}#chunk_{index}`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}#chunk_{}", self.source, self.index)
    }
}

/// A search result containing a chunk and its similarity score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matching chunk.
    pub chunk: Chunk,
    /// Cosine similarity (1.0 = identical direction).
    pub score: f32,
}

/// Entry appended to the index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// The chunk.
    pub chunk: Chunk,
    /// The embedding vector.
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    /// Creates a new index entry.
    #[must_use]
    pub const fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }
}

/// Attribution for one passage used to answer a question.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Source document identifier.
    pub source: String,
    /// Page number, for paginated documents.
    pub page: Option<u32>,
    /// Chunk sequence index within the document.
    pub chunk_index: usize,
    /// Retrieval score.
    pub score: f32,
}

impl From<&SearchResult> for Citation {
    fn from(hit: &SearchResult) -> Self {
        Self {
            source: hit.chunk.source.clone(),
            page: hit.chunk.page,
            chunk_index: hit.chunk.index,
            score: hit.score,
        }
    }
}

/// Generated answer plus the passages it was conditioned on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Model output.
    pub text: String,
    /// Passages given to the model, in retrieval order.
    pub citations: Vec<Citation>,
    /// Whether the top passage had to be cut to fit the context budget.
    pub context_truncated: bool,
    /// Retrieved passages left out because the budget ran out.
    pub dropped_passages: usize,
}

/// A file handed to the pipeline by an upload adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    /// Bare file name, e.g. `handbook.pdf`.
    pub name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Creates an upload.
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// A document that failed to parse during a build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentError {
    /// Document identifier.
    pub source: String,
    /// Human-readable reason.
    pub message: String,
}

/// Outcome of a build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Whether a new snapshot was promoted.
    pub success: bool,
    /// Version of the promoted snapshot.
    pub snapshot_version: Option<u64>,
    /// Documents that parsed successfully.
    pub documents_processed: usize,
    /// Chunks embedded and indexed.
    pub chunks_created: usize,
    /// Documents that failed to parse.
    pub errors: Vec<DocumentError>,
    /// Documents that parsed but produced no chunks.
    pub empty_documents: Vec<String>,
}
