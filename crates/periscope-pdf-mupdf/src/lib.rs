use std::path::Path;

use mupdf::{Document, Outline, TextPageFlags};

use periscope_core::{BackendError, OutlineEntry, PdfBackend};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island — it isolates the mupdf dependency
/// (which is AGPL-3.0) so that non-PDF code paths do not transitively
/// depend on it.
#[derive(Default)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

fn open(path: &Path) -> Result<Document, BackendError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;
    Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))
}

/// Flatten the outline tree depth-first. Nesting depth carries no meaning
/// for segmentation, only document order does. Entries without a resolved
/// page destination (external links, broken anchors) are dropped.
fn flatten_outline(nodes: &[Outline], out: &mut Vec<OutlineEntry>) {
    for node in nodes {
        if let Some(dest) = &node.dest {
            out.push(OutlineEntry {
                title: node.title.clone(),
                page: dest.loc.page_number,
            });
        }
        flatten_outline(&node.down, out);
    }
}

impl PdfBackend for MupdfBackend {
    fn read_outline(&self, path: &Path) -> Result<Vec<OutlineEntry>, BackendError> {
        let document = open(path)?;
        let outlines = document
            .outlines()
            .map_err(|e| BackendError::OutlineError(e.to_string()))?;

        let mut entries = Vec::new();
        flatten_outline(&outlines, &mut entries);
        Ok(entries)
    }

    fn page_count(&self, path: &Path) -> Result<u32, BackendError> {
        let document = open(path)?;
        let count = document
            .page_count()
            .map_err(|e| BackendError::OpenError(e.to_string()))?;
        u32::try_from(count)
            .map_err(|_| BackendError::OpenError(format!("negative page count: {count}")))
    }

    fn extract_text(&self, path: &Path) -> Result<String, BackendError> {
        let document = open(path)?;

        let mut pages_text = Vec::new();
        for page_result in document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?
        {
            let page = page_result.map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

            let mut page_text = String::new();
            for block in text_page.blocks() {
                for line in block.lines() {
                    let line_text: String = line
                        .chars()
                        .map(|c| c.char().unwrap_or('\u{FFFD}'))
                        .collect();
                    page_text.push_str(&line_text);
                    page_text.push('\n');
                }
            }
            pages_text.push(page_text);
        }

        Ok(pages_text.join("\n"))
    }
}
