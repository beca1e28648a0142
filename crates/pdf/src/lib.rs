//! PDF layout extraction for tabhead.
//!
//! Reads every page's content stream and produces the
//! [`tabhead_core::DocumentLayout`] the header pipeline consumes: positioned
//! words and drawn ruling lines, with a top-left origin.

use std::path::Path;

use log::{debug, warn};
use tabhead_core::{DocumentLayout, PageLayout};
use thiserror::Error;

use parser::backend::{LopdfBackend, PdfBackend};

pub mod parser;
pub mod words;

/// Page size used when a page carries no usable MediaBox (A4 portrait).
pub const FALLBACK_PAGE_SIZE: (f32, f32) = (595.0, 842.0);

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse PDF bytes and extract the layout of every page.
pub fn read_layout(bytes: &[u8]) -> Result<DocumentLayout, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    debug!("loaded document with {} pages", backend.page_count());
    Ok(extract_layout(&backend))
}

/// Read a PDF file from disk and extract its layout.
pub fn read_layout_from_path(path: &Path) -> Result<DocumentLayout, PdfError> {
    let bytes = std::fs::read(path)?;
    read_layout(&bytes)
}

/// Extract layout through any [`PdfBackend`].
///
/// Page-level failures do not abort the document: an undecodable page comes
/// back empty, a missing MediaBox falls back to [`FALLBACK_PAGE_SIZE`].
pub fn extract_layout(backend: &dyn PdfBackend) -> DocumentLayout {
    let pages = backend
        .pages()
        .values()
        .enumerate()
        .map(|(index, &page_id)| {
            let (width, height) = backend.page_dimensions(page_id).unwrap_or_else(|e| {
                warn!("page {}: {}, assuming A4", index + 1, e);
                FALLBACK_PAGE_SIZE
            });
            match parser::content::interpret_page(backend, page_id) {
                Ok(content) => {
                    let layout = words::page_layout(index, width, height, &content);
                    debug!(
                        "page {}: {} words, {} lines",
                        index + 1,
                        layout.words.len(),
                        layout.lines.len()
                    );
                    layout
                }
                Err(e) => {
                    warn!("page {}: {}, skipping content", index + 1, e);
                    PageLayout {
                        index,
                        width,
                        height,
                        ..Default::default()
                    }
                }
            }
        })
        .collect();

    DocumentLayout { pages }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
