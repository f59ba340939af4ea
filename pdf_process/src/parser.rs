use std::path::Path;

use lopdf::Document;

use crate::error::{PdfProcessError, Result};
use crate::model::{ExtractedPdf, PageText};

pub(crate) fn parse_from_path(path: &Path) -> Result<ExtractedPdf> {
    let bytes = std::fs::read(path)?;
    parse_from_bytes(&bytes, &path.display().to_string())
}

pub(crate) fn parse_from_bytes(bytes: &[u8], source_name: &str) -> Result<ExtractedPdf> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfProcessError::Parse(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(PdfProcessError::Encrypted);
    }
    Ok(parse_document(&doc, source_name.to_string()))
}

fn parse_document(doc: &Document, source: String) -> ExtractedPdf {
    let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    page_numbers.sort_unstable();

    // Pages whose content streams cannot be decoded still count, as blank pages,
    // so numbering stays aligned with the document.
    let pages = page_numbers
        .iter()
        .map(|&number| PageText {
            number,
            text: doc
                .extract_text(&[number])
                .map(|raw| normalize_text(&raw))
                .unwrap_or_default(),
        })
        .collect();

    ExtractedPdf {
        source,
        page_count: page_numbers.len(),
        pages,
        title: extract_title(doc),
    }
}

fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn extract_title(doc: &Document) -> Option<String> {
    let info_ref = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let dict = doc.get_dictionary(info_ref).ok()?;
    let title = dict.get(b"Title").ok()?.as_str().ok()?;
    let title = String::from_utf8_lossy(title).trim().to_string();
    (!title.is_empty()).then_some(title)
}
