use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to read outline: {0}")]
    OutlineError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One entry of a document outline, flattened to traversal order.
///
/// Nesting depth is deliberately discarded — segmentation treats nested
/// entries as siblings. `page` is the 0-indexed destination page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub title: String,
    pub page: u32,
}

/// Trait for PDF structure/text backends.
///
/// Implementors provide the low-level PDF reads; segmentation
/// ([`crate::segment`]) and the similarity report ([`crate::report`]) are
/// backend-agnostic.
pub trait PdfBackend: Send + Sync {
    /// Read the outline (bookmark tree) flattened to document order.
    ///
    /// Entries without a page destination are dropped — they cannot open a
    /// section. An absent or unreadable outline is an error, not an empty
    /// list.
    fn read_outline(&self, path: &Path) -> Result<Vec<OutlineEntry>, BackendError>;

    /// Number of pages in the document.
    fn page_count(&self, path: &Path) -> Result<u32, BackendError>;

    /// Extract the full plain-text content of a PDF file.
    fn extract_text(&self, path: &Path) -> Result<String, BackendError>;
}
