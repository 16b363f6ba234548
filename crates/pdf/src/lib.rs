//! PDF access layer for pdfoutline.
//!
//! Opens and validates a PDF with `lopdf`, replays each page's content stream
//! and hands the classifier a [`DocumentInput`]: text blocks and the raw span
//! stream, both with top-left-origin boxes and 0-based page indices.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pdfoutline_core::normalize::normalize_text;
use pdfoutline_core::types::DocumentInput;
use pdfoutline_core::OutlineError;

use parser::backend::{LopdfBackend, PdfBackend};
use parser::layout;

pub mod parser;

/// How many leading bytes may precede the `%PDF-` marker.
const HEADER_SEARCH_WINDOW: usize = 1024;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("File does not exist: {0}")]
    NotFound(String),
    #[error("File is not a PDF")]
    NotPdf,
    #[error("File is empty")]
    Empty,
    #[error("PDF is password protected")]
    Encrypted,
    #[error("PDF has no pages")]
    NoPages,
    #[error("Cannot extract text from the first page: {0}")]
    UnreadableFirstPage(String),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PdfError> for OutlineError {
    fn from(e: PdfError) -> Self {
        match e {
            PdfError::Parse(_) | PdfError::Io(_) => OutlineError::Extraction(e.to_string()),
            _ => OutlineError::Validation(e.to_string()),
        }
    }
}

/// Document information dictionary plus page count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A validated, parsed PDF.
pub struct PdfDocument {
    backend: LopdfBackend,
}

impl PdfDocument {
    /// Read and validate the file at `path`.
    pub fn open(path: &Path) -> Result<Self, PdfError> {
        if !path.exists() {
            return Err(PdfError::NotFound(path.display().to_string()));
        }
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(PdfError::NotPdf);
        }

        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Validate and parse in-memory PDF bytes.
    ///
    /// Rejects empty input, input without a `%PDF-` header, encrypted files,
    /// files with no pages, and files whose first page cannot be decoded.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        if bytes.is_empty() {
            return Err(PdfError::Empty);
        }
        let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
        if !window.windows(5).any(|w| w == b"%PDF-") {
            return Err(PdfError::NotPdf);
        }

        let backend = LopdfBackend::load_bytes(bytes)?;
        let pages = backend.pages();
        let Some(&first) = pages.values().next() else {
            return Err(PdfError::NoPages);
        };
        layout::extract_page_runs(&backend, first)
            .map_err(|e| PdfError::UnreadableFirstPage(e.to_string()))?;

        Ok(PdfDocument { backend })
    }

    pub fn page_count(&self) -> usize {
        self.backend.page_count()
    }

    pub fn metadata(&self) -> DocumentMetadata {
        let mut raw = self.backend.metadata();
        DocumentMetadata {
            title: raw.remove("Title"),
            author: raw.remove("Author"),
            subject: raw.remove("Subject"),
            creator: raw.remove("Creator"),
            producer: raw.remove("Producer"),
            page_count: self.page_count(),
        }
    }

    /// Extract blocks and spans from every page, in reading order.
    ///
    /// A page whose content stream cannot be decoded is skipped with a
    /// warning; the first page was already checked when the document was
    /// opened.
    pub fn extract_input(&self) -> DocumentInput {
        let pages = self.backend.pages();
        let mut input = DocumentInput {
            page_count: pages.len(),
            ..DocumentInput::default()
        };

        for (index, (&number, &page_id)) in pages.iter().enumerate() {
            let (_, height) = self.backend.page_size(page_id);

            let runs = match layout::extract_page_runs(&self.backend, page_id) {
                Ok(runs) => runs,
                Err(e) => {
                    log::warn!("skipping page {number}: {e}");
                    continue;
                }
            };

            let spans = runs
                .into_iter()
                .map(|run| layout::to_span(run, index, height))
                .filter_map(|mut span| {
                    span.text = normalize_text(&span.text, &[]);
                    (!span.text.is_empty()).then_some(span)
                })
                .collect();
            let lines = layout::group_spans_into_lines(spans);

            input.blocks.extend(layout::group_lines_into_blocks(&lines, index));
            input
                .spans
                .extend(lines.into_iter().flat_map(|line| line.spans));
        }

        log::debug!(
            "extracted {} blocks and {} spans from {} pages",
            input.blocks.len(),
            input.spans.len(),
            input.page_count
        );
        input
    }
}
