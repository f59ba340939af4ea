//! Text extraction from files on disk.

use std::fs;
use std::path::Path;

use quarry_pdf::PdfProcessor;
use tracing::debug;

use crate::error::ParseError;
use crate::types::{Document, Page};

/// Page break marker in plain text, as emitted by `pdftotext`.
const FORM_FEED: char = '\u{c}';

/// Document formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// PDF, extracted page by page.
    Pdf,
    /// UTF-8 text or Markdown.
    Text,
}

impl DocumentFormat {
    /// Detects the format from the file extension, case-insensitively.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" | "md" | "markdown" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Reads `path` into a [`Document`] identified by `id`.
///
/// PDFs yield one numbered page per PDF page. Text files are a single unnumbered page
/// unless they contain form feeds, which split them into numbered pages.
///
/// # Errors
///
/// Returns a [`ParseError`] for unsupported extensions, unreadable files, invalid
/// UTF-8 and PDFs that fail to extract.
pub fn load_document(path: &Path, id: impl Into<String>) -> Result<Document, ParseError> {
    let id = id.into();
    let Some(format) = DocumentFormat::from_path(path) else {
        let extension = path
            .extension()
            .map_or_else(|| "(none)".to_owned(), |e| e.to_string_lossy().into_owned());
        return Err(ParseError::Unsupported(extension));
    };

    match format {
        DocumentFormat::Pdf => {
            let pdf = PdfProcessor::from_path(path).extract()?;
            debug!(
                source = %id,
                title = pdf.title.as_deref().unwrap_or(""),
                pages = pdf.page_count,
                blank = pdf.is_blank(),
                "extracted pdf"
            );
            Ok(Document {
                id,
                pages: pdf
                    .pages
                    .into_iter()
                    .map(|page| Page {
                        number: Some(page.number),
                        text: page.text,
                    })
                    .collect(),
            })
        }
        DocumentFormat::Text => {
            let text = String::from_utf8(fs::read(path)?)?;
            let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
            if text.contains(FORM_FEED) {
                Ok(Document::paginated(id, text.split(FORM_FEED)))
            } else {
                Ok(Document::new(id, text))
            }
        }
    }
}
