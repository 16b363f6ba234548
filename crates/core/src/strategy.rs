//! Choosing between the block-level and span-level outlines.

use crate::normalize::char_len;
use crate::profile::Strategy;
use crate::types::{HeadingCandidate, HeadingLevel};

const MEANINGFUL_WORDS: &[&str] = &[
    "introduction",
    "conclusion",
    "summary",
    "background",
    "overview",
    "methodology",
    "results",
    "discussion",
    "references",
    "abstract",
    "pathway",
    "options",
    "requirements",
    "hope",
    "see you",
    "there",
];

const STRUCTURAL_PATTERNS: &[&str] = &[
    "introduction",
    "conclusion",
    "summary",
    "overview",
    "references",
    "table of contents",
    "background",
    "methodology",
    "results",
    "discussion",
];

const INVITATION_PHRASES: &[&str] = &["hope", "see you"];

/// Corpus size figures the hybrid comparison is weighted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CorpusSize {
    pub block_count: usize,
    pub total_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Blocks,
    Spans,
}

/// Pick the final outline for `strategy` from the two candidate outlines.
pub fn select_outline(
    strategy: Strategy,
    blocks: Vec<HeadingCandidate>,
    spans: Vec<HeadingCandidate>,
    corpus: CorpusSize,
) -> Vec<HeadingCandidate> {
    match strategy {
        Strategy::Minimal => Vec::new(),
        Strategy::SpanPreferred => {
            if !spans.is_empty() && has_meaningful_content(&spans) {
                spans
            } else {
                blocks
            }
        }
        Strategy::BlockPreferred => {
            if blocks.len() >= 3 {
                blocks
            } else {
                spans
            }
        }
        Strategy::Hybrid => {
            if blocks.is_empty() {
                return spans;
            }
            if spans.is_empty() {
                return blocks;
            }

            let block_score = quality_score(&blocks, Source::Blocks, corpus);
            let span_score = quality_score(&spans, Source::Spans, corpus);
            log::debug!("hybrid: block outline {block_score:.2}, span outline {span_score:.2}");

            if span_score > block_score {
                spans
            } else {
                blocks
            }
        }
    }
}

/// At least 30% (and at least one) of the entries are longer than three
/// characters, not purely digits, and mention a structural word.
fn has_meaningful_content(outline: &[HeadingCandidate]) -> bool {
    let meaningful = outline
        .iter()
        .filter(|h| {
            let text = h.text.as_str();
            let lower = text.to_lowercase();
            char_len(text) > 3
                && !text.chars().all(|c| c.is_ascii_digit())
                && MEANINGFUL_WORDS.iter().any(|w| lower.contains(w))
        })
        .count();

    meaningful as f32 >= (outline.len() as f32 * 0.3).max(1.0)
}

fn quality_score(outline: &[HeadingCandidate], source: Source, corpus: CorpusSize) -> f32 {
    let has_level = |level: HeadingLevel| outline.iter().any(|h| h.level == level);
    let mentions = |h: &HeadingCandidate, words: &[&str]| {
        let lower = h.text.to_lowercase();
        words.iter().any(|w| lower.contains(w))
    };

    let mut score = outline.len() as f32 * 0.5;
    if has_level(HeadingLevel::H1) {
        score += 2.0;
    }
    if has_level(HeadingLevel::H2) {
        score += 1.0;
    }
    if has_level(HeadingLevel::H3) {
        score += 0.5;
    }
    score += outline
        .iter()
        .filter(|h| mentions(h, STRUCTURAL_PATTERNS))
        .count() as f32;

    if outline.len() as f32 > corpus.block_count as f32 * 0.8 {
        score *= 0.3;
    }

    match source {
        Source::Spans => {
            if corpus.total_chars < 1000 {
                score *= 1.5;
            }
            if outline.iter().any(|h| mentions(h, INVITATION_PHRASES)) {
                score += 3.0;
            }
        }
        Source::Blocks => {
            if corpus.total_chars > 5000 {
                score *= 1.2;
            }
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BBox;

    fn make_heading(text: &str, level: HeadingLevel) -> HeadingCandidate {
        HeadingCandidate {
            text: text.to_string(),
            level,
            confidence: 0.8,
            page: 0,
            bbox: BBox::default(),
        }
    }

    fn corpus(block_count: usize, total_chars: usize) -> CorpusSize {
        CorpusSize {
            block_count,
            total_chars,
        }
    }

    #[test]
    fn test_minimal_is_empty() {
        let blocks = vec![make_heading("Introduction", HeadingLevel::H1)];
        assert!(select_outline(Strategy::Minimal, blocks, vec![], corpus(10, 2000)).is_empty());
    }

    #[test]
    fn test_span_preferred_requires_meaningful_spans() {
        let blocks = vec![make_heading("Block Heading", HeadingLevel::H1)];
        let meaningful = vec![make_heading("HOPE TO SEE YOU THERE!", HeadingLevel::H1)];
        let chosen = select_outline(
            Strategy::SpanPreferred,
            blocks.clone(),
            meaningful.clone(),
            corpus(4, 200),
        );
        assert_eq!(chosen, meaningful);

        let noise = vec![make_heading("12345", HeadingLevel::H3)];
        let chosen = select_outline(Strategy::SpanPreferred, blocks.clone(), noise, corpus(4, 200));
        assert_eq!(chosen, blocks);
    }

    #[test]
    fn test_block_preferred_falls_back_to_spans() {
        let blocks = vec![make_heading("Only One", HeadingLevel::H1)];
        let spans = vec![make_heading("Span Heading", HeadingLevel::H2)];
        let chosen = select_outline(
            Strategy::BlockPreferred,
            blocks,
            spans.clone(),
            corpus(50, 5000),
        );
        assert_eq!(chosen, spans);
    }

    #[test]
    fn test_hybrid_single_side() {
        let spans = vec![make_heading("Span Heading", HeadingLevel::H2)];
        let chosen = select_outline(Strategy::Hybrid, vec![], spans.clone(), corpus(20, 800));
        assert_eq!(chosen, spans);
    }

    #[test]
    fn test_hybrid_tie_prefers_blocks() {
        let blocks = vec![make_heading("Alpha", HeadingLevel::H1)];
        let spans = vec![make_heading("Beta", HeadingLevel::H1)];
        let chosen = select_outline(Strategy::Hybrid, blocks.clone(), spans, corpus(20, 3000));
        assert_eq!(chosen, blocks);
    }

    #[test]
    fn test_hybrid_invitation_bonus() {
        let blocks = vec![
            make_heading("Alpha", HeadingLevel::H1),
            make_heading("Beta", HeadingLevel::H2),
        ];
        let spans = vec![make_heading("Hope to see you there!", HeadingLevel::H1)];
        let chosen = select_outline(Strategy::Hybrid, blocks, spans.clone(), corpus(20, 3000));
        assert_eq!(chosen, spans);
    }

    #[test]
    fn test_quality_score_penalises_dense_outlines() {
        let outline = vec![
            make_heading("Alpha", HeadingLevel::H1),
            make_heading("Beta", HeadingLevel::H1),
        ];
        let sparse = quality_score(&outline, Source::Blocks, corpus(20, 3000));
        let dense = quality_score(&outline, Source::Blocks, corpus(2, 3000));
        assert!((sparse - 3.0).abs() < 1e-6);
        assert!((dense - 0.9).abs() < 1e-6);
    }
}
