//! Page-preserving PDF text extraction.
//!
//! Retrieval needs to cite the page a passage came from, so this crate never flattens a
//! document into one string: [`PdfProcessor::extract`] returns the text of every page
//! separately, numbered from 1 in document order.
//!
//! ```no_run
//! use quarry_pdf::PdfProcessor;
//!
//! let pdf = PdfProcessor::from_path("handbook.pdf").extract()?;
//! for page in &pdf.pages {
//!     println!("page {}: {} chars", page.number, page.text.len());
//! }
//! # Ok::<(), quarry_pdf::PdfProcessError>(())
//! ```

mod error;
mod model;
mod parser;

pub use error::{PdfProcessError, Result};
pub use model::{ExtractedPdf, PageText};

use std::path::PathBuf;

/// PDF processor entrypoint.
#[derive(Debug, Clone)]
pub struct PdfProcessor {
    source: PdfSource,
}

#[derive(Debug, Clone)]
enum PdfSource {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
}

impl PdfProcessor {
    /// Build a processor from a PDF file path.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: PdfSource::Path(path.into()),
        }
    }

    /// Build a processor from PDF bytes, reported under `name`.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            source: PdfSource::Bytes {
                name: name.into(),
                bytes: bytes.into(),
            },
        }
    }

    /// Extracts the text of every page.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, does not parse as a PDF, or is encrypted.
    pub fn extract(&self) -> Result<ExtractedPdf> {
        match &self.source {
            PdfSource::Path(path) => parser::parse_from_path(path),
            PdfSource::Bytes { name, bytes } => parser::parse_from_bytes(bytes, name),
        }
    }
}
