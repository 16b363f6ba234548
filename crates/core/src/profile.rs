use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::normalize::char_len;
use crate::types::TextBlock;

const FORM_KEYWORDS: &[&str] = &["application", "form", "advance", "grant", "ltc"];
const FORM_FIELDS: &[&str] = &[
    "name",
    "designation",
    "date",
    "salary",
    "grade",
    "pay",
    "station",
];
const FORM_PATTERNS: &[&str] = &["s.no", "serial number", "amount", "details", "remarks"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Simple,
    Complex,
    Form,
    Standard,
    Flyer,
}

/// Which extraction granularity to trust for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Emit no outline at all.
    Minimal,
    SpanPreferred,
    BlockPreferred,
    /// Run both paths and keep the better-scoring outline.
    Hybrid,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Minimal => "minimal",
            Strategy::SpanPreferred => "span_preferred",
            Strategy::BlockPreferred => "block_preferred",
            Strategy::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

/// Aggregate shape of a document and the strategy it calls for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentProfile {
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub strategy: Strategy,
    pub block_count: usize,
    pub total_chars: usize,
    pub unique_fonts: usize,
    pub font_size_range: f32,
}

/// Classify the document from aggregate counts and its title. Rules are
/// checked in order and the first match wins.
pub fn profile_document(blocks: &[TextBlock], title: &str) -> DocumentProfile {
    let block_count = blocks.len();
    let total_chars: usize = blocks.iter().map(|b| char_len(&b.text)).sum();
    let unique_fonts = blocks
        .iter()
        .map(|b| b.font_name.as_str())
        .collect::<HashSet<_>>()
        .len();
    let font_size_range = if blocks.is_empty() {
        0.0
    } else {
        let (min, max) = blocks.iter().fold((f32::MAX, f32::MIN), |(lo, hi), b| {
            (lo.min(b.font_size), hi.max(b.font_size))
        });
        max - min
    };

    let (doc_type, strategy) = if total_chars < 400 && block_count < 6 {
        (DocumentType::Simple, Strategy::SpanPreferred)
    } else if total_chars > 15000 || block_count > 100 {
        (DocumentType::Complex, Strategy::BlockPreferred)
    } else if is_form_document(blocks, title) {
        (DocumentType::Form, Strategy::Minimal)
    } else if block_count >= 6 && total_chars > 1000 {
        (DocumentType::Standard, Strategy::BlockPreferred)
    } else if block_count == 6 && total_chars < 500 {
        (DocumentType::Flyer, Strategy::BlockPreferred)
    } else {
        (DocumentType::Standard, Strategy::Hybrid)
    };

    log::debug!(
        "profile: {doc_type:?} ({block_count} blocks, {total_chars} chars), strategy {strategy}"
    );

    DocumentProfile {
        doc_type,
        strategy,
        block_count,
        total_chars,
        unique_fonts,
        font_size_range,
    }
}

/// A title naming a form, backed by a corpus dense in form-field vocabulary.
pub fn is_form_document(blocks: &[TextBlock], title: &str) -> bool {
    let title = title.to_lowercase();
    if !FORM_KEYWORDS.iter().any(|k| title.contains(k)) {
        return false;
    }

    let corpus = blocks
        .iter()
        .map(|b| b.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let field_count = FORM_FIELDS.iter().filter(|f| corpus.contains(*f)).count();
    let pattern_count = FORM_PATTERNS.iter().filter(|p| corpus.contains(*p)).count();

    field_count >= 4 || pattern_count >= 2
}
