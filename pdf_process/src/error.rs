use thiserror::Error;

/// Errors emitted while extracting text from a PDF.
#[derive(Debug, Error)]
pub enum PdfProcessError {
    /// The input bytes do not decode as a valid PDF structure.
    #[error("failed to parse PDF: {0}")]
    Parse(String),
    /// The source PDF could not be read from the filesystem.
    #[error("failed to read PDF: {0}")]
    Io(#[from] std::io::Error),
    /// The document is encrypted and could not be opened without a password.
    #[error("PDF is encrypted")]
    Encrypted,
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, PdfProcessError>;
