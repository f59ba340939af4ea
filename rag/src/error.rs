//! Error types for the RAG crate.

use std::path::PathBuf;

use quarry_core::ProviderError;
use thiserror::Error;

use crate::types::Citation;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// No snapshot has been built or loaded yet.
    #[error("index not ready: build the index before asking questions")]
    IndexNotReady,

    /// Another build is already running.
    #[error("a build is already in progress")]
    BuildInProgress,

    /// The question was empty after trimming.
    #[error("question is empty")]
    EmptyQuestion,

    /// Embedding failed fatally or exhausted its retries.
    #[error("embedding failed: {0}")]
    Embedding(#[source] ProviderError),

    /// Dimension mismatch between embedding and index.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension provided.
        actual: usize,
    },

    /// The language model failed after retrieval succeeded.
    #[error("generation failed: {source}")]
    Generation {
        /// Provider failure.
        #[source]
        source: ProviderError,
        /// Passages that had been retrieved for the question.
        citations: Vec<Citation>,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Persistence operation failed.
    #[error("persistence error at {path}: {source}")]
    Persistence {
        /// Path where the error occurred.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored snapshot failed verification.
    #[error("snapshot {version} is corrupt: {reason}")]
    CorruptSnapshot {
        /// Snapshot version.
        version: u64,
        /// What failed to verify.
        reason: String,
    },

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl RagError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RagError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// Result type alias for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// Reasons a single document could not be turned into text.
///
/// These never abort a build; they are collected into the
/// [`BuildReport`](crate::BuildReport).
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file extension is not a supported document format.
    #[error("unsupported document format: {0}")]
    Unsupported(String),

    /// The file could not be read.
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    /// A text document is not valid UTF-8.
    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// PDF extraction failed.
    #[error(transparent)]
    Pdf(#[from] quarry_pdf::PdfProcessError),

    /// An upload name is not a bare, visible file name.
    #[error("invalid upload name {0:?}")]
    InvalidName(String),
}
