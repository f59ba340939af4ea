/// Text of a single PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number in document order.
    pub number: u32,
    /// Normalized page text. Empty for pages without extractable text.
    pub text: String,
}

/// Page-by-page text extracted from one PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPdf {
    /// Path or caller-supplied name of the source.
    pub source: String,
    /// Number of pages in the document.
    pub page_count: usize,
    /// One entry per page, in order.
    pub pages: Vec<PageText>,
    /// `Title` from the document info dictionary, if present.
    pub title: Option<String>,
}

impl ExtractedPdf {
    /// Returns `true` when no page produced any text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.text.trim().is_empty())
    }
}
