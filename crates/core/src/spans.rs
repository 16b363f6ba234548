//! Span-level fallback path.
//!
//! Block grouping sometimes swallows short headings into neighbouring text or
//! splits one heading into many single-word runs. This path works on the raw
//! span stream instead: adjacent spans are merged back into phrases and then
//! judged by a simpler classifier than the block-level one.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

use crate::noise::NoiseClassifier;
use crate::normalize::{char_len, is_upper_case, normalize_text, word_count};
use crate::stats::{font_family, FontStatistics};
use crate::types::{HeadingCandidate, HeadingLevel, Span};

const ATTACHED_PUNCTUATION: &str = "!?.,;:";

const GENERIC_TERMS: &[&str] = &[
    "com", "www", "http", ".org", ".net", "parkway", "avenue", "street", "rsvp:",
];

fn reading_order(a: &Span, b: &Span) -> Ordering {
    a.page
        .cmp(&b.page)
        .then_with(|| a.bbox.y0.total_cmp(&b.bbox.y0))
        .then_with(|| a.bbox.x0.total_cmp(&b.bbox.x0))
}

/// Whether `next` continues the group that starts at `first` and currently
/// ends at `last`.
fn continues(first: &Span, last: &Span, next: &Span) -> bool {
    if next.page != first.page {
        return false;
    }

    let max_y_diff = (first.font_size / 8.0).clamp(2.0, 5.0);
    if (next.bbox.y0 - first.bbox.y0).abs() > max_y_diff {
        return false;
    }

    let max_x_gap = (first.font_size * 2.0).clamp(20.0, 50.0);
    if next.bbox.x0 - last.bbox.x1 > max_x_gap {
        return false;
    }

    first.has_bold_flag() == next.has_bold_flag()
        && (next.font_size - first.font_size).abs() < 8.0
        && font_family(&first.font_name) == font_family(&next.font_name)
}

fn merge(group: &[Span]) -> Span {
    let first = &group[0];
    let mut text = first.text.clone();
    let mut bbox = first.bbox;
    for span in &group[1..] {
        if !span.text.is_empty() && ATTACHED_PUNCTUATION.contains(span.text.as_str()) {
            text.push_str(&span.text);
        } else {
            text.push(' ');
            text.push_str(&span.text);
        }
        bbox = bbox.union(&span.bbox);
    }

    Span {
        text,
        font_name: first.font_name.clone(),
        font_size: group.iter().map(|s| s.font_size).sum::<f32>() / group.len() as f32,
        font_flags: first.font_flags,
        bbox,
        page: first.page,
    }
}

/// Merge adjacent spans that read as one phrase, in reading order.
pub fn consolidate_spans(spans: &[Span]) -> Vec<Span> {
    let mut sorted = spans.to_vec();
    sorted.sort_by(reading_order);

    let mut consolidated = Vec::with_capacity(sorted.len());
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && continues(&sorted[i], &sorted[j - 1], &sorted[j]) {
            j += 1;
        }

        if j - i > 1 {
            consolidated.push(merge(&sorted[i..j]));
        } else {
            consolidated.push(sorted[i].clone());
        }
        i = j;
    }
    consolidated
}

/// Classify one (possibly consolidated) span. Returns the level and a
/// nominal confidence for the rule that fired.
pub fn classify_span(
    span: &Span,
    stats: &FontStatistics,
    noise: &NoiseClassifier,
) -> Option<(HeadingLevel, f32)> {
    let text = span.text.as_str();
    if char_len(text) < 3 || noise.is_noise(text) {
        return None;
    }

    let words = word_count(text);
    if words > 10 {
        return None;
    }

    let name = span.font_name.to_lowercase();
    let bold = span.has_bold_flag() || name.contains("bold") || name.contains("black");

    let ratio = stats.size_ratio(span.font_size);
    let large = ratio > 1.4;
    let very_large = ratio > 1.8;

    static RE_MIXED_CASE: OnceLock<Regex> = OnceLock::new();
    let re_mixed_case = RE_MIXED_CASE.get_or_init(|| Regex::new(r"[A-Z][a-z]+.*[A-Z]").unwrap());
    let mixed_case = re_mixed_case.is_match(text);
    let exclamation = text.ends_with('!');

    let lower = text.to_lowercase();
    if words <= 3 && !exclamation && GENERIC_TERMS.iter().any(|t| lower.contains(t)) {
        return None;
    }

    if bold && large && words <= 8 {
        Some((HeadingLevel::H1, 0.8))
    } else if very_large && (is_upper_case(text) || mixed_case) && words <= 8 {
        Some((HeadingLevel::H1, 0.75))
    } else if mixed_case && (exclamation || text.ends_with('?')) && (3..=10).contains(&words) {
        Some((HeadingLevel::H1, 0.7))
    } else if bold && words <= 4 {
        Some((HeadingLevel::H3, 0.5))
    } else {
        None
    }
}

/// Normalise, consolidate and classify a raw span stream.
pub fn extract_span_headings(
    spans: &[Span],
    stats: &FontStatistics,
    noise: &NoiseClassifier,
    filters: &[Regex],
) -> Vec<HeadingCandidate> {
    let normalized: Vec<Span> = spans
        .iter()
        .filter_map(|span| {
            let text = normalize_text(&span.text, filters);
            (!text.is_empty()).then(|| Span {
                text,
                ..span.clone()
            })
        })
        .collect();

    let consolidated = consolidate_spans(&normalized);
    let headings: Vec<HeadingCandidate> = consolidated
        .iter()
        .filter_map(|span| {
            let (level, confidence) = classify_span(span, stats, noise)?;
            Some(HeadingCandidate {
                text: span.text.clone(),
                level,
                confidence,
                page: span.page,
                bbox: span.bbox,
            })
        })
        .collect();

    log::debug!(
        "span path: {} spans, {} consolidated, {} headings",
        normalized.len(),
        consolidated.len(),
        headings.len()
    );
    headings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_NOISE_PATTERNS;
    use crate::exceptions::CorpusExceptions;
    use crate::stats::analyze_font_statistics;
    use crate::types::{BBox, TextBlock, FONT_FLAG_BOLD};

    fn make_span(text: &str, x0: f32, x1: f32, y0: f32, size: f32, bold: bool) -> Span {
        Span {
            text: text.to_string(),
            font_name: "Arial-Black".to_string(),
            font_size: size,
            font_flags: if bold { FONT_FLAG_BOLD } else { 0 },
            bbox: BBox::new(x0, y0, x1, y0 + size),
            page: 0,
        }
    }

    fn noise() -> NoiseClassifier {
        NoiseClassifier::new(
            DEFAULT_NOISE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            CorpusExceptions::new(true),
        )
    }

    fn body_stats() -> FontStatistics {
        let blocks: Vec<TextBlock> = (0..5)
            .map(|_| make_span("body", 0.0, 10.0, 0.0, 12.0, false))
            .collect();
        analyze_font_statistics(&blocks)
    }

    fn invitation_spans() -> Vec<Span> {
        vec![
            make_span("THERE", 315.0, 390.0, 500.0, 20.0, true),
            make_span("HOPE", 100.0, 160.0, 500.0, 20.0, true),
            make_span("TO", 170.0, 195.0, 500.0, 20.0, true),
            make_span("SEE", 205.0, 250.0, 500.0, 20.0, true),
            make_span("YOU", 260.0, 305.0, 500.0, 20.0, true),
            make_span("!", 390.0, 397.0, 500.0, 20.0, true),
        ]
    }

    #[test]
    fn test_consolidates_words_into_phrase() {
        let merged = consolidate_spans(&invitation_spans());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "HOPE TO SEE YOU THERE!");
        assert_eq!(merged[0].bbox, BBox::new(100.0, 500.0, 397.0, 520.0));
        assert_eq!(merged[0].font_size, 20.0);
    }

    #[test]
    fn test_bold_change_breaks_group() {
        let spans = vec![
            make_span("Title", 100.0, 150.0, 100.0, 14.0, true),
            make_span("body", 155.0, 190.0, 100.0, 14.0, false),
        ];
        assert_eq!(consolidate_spans(&spans).len(), 2);
    }

    #[test]
    fn test_vertical_gap_breaks_group() {
        let spans = vec![
            make_span("First", 100.0, 150.0, 100.0, 12.0, true),
            make_span("Second", 100.0, 160.0, 120.0, 12.0, true),
        ];
        assert_eq!(consolidate_spans(&spans).len(), 2);
    }

    #[test]
    fn test_size_averaged_on_merge() {
        let spans = vec![
            make_span("Big", 100.0, 150.0, 100.0, 16.0, true),
            make_span("Small", 152.0, 190.0, 101.0, 12.0, true),
        ];
        let merged = consolidate_spans(&spans);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].font_size, 14.0);
    }

    #[test]
    fn test_bold_large_span_is_h1() {
        let stats = body_stats();
        let span = make_span("HOPE TO SEE YOU THERE!", 100.0, 397.0, 500.0, 20.0, true);
        assert_eq!(
            classify_span(&span, &stats, &noise()).map(|(l, _)| l),
            Some(HeadingLevel::H1)
        );
    }

    #[test]
    fn test_generic_short_terms_rejected() {
        let stats = body_stats();
        let span = make_span("Welcome Home", 100.0, 200.0, 100.0, 20.0, true);
        assert_eq!(classify_span(&span, &stats, &noise()), None);
    }

    #[test]
    fn test_bold_fallback_is_h3() {
        let stats = body_stats();
        let span = make_span("Parking Rules", 100.0, 200.0, 100.0, 12.0, true);
        assert_eq!(
            classify_span(&span, &stats, &noise()),
            Some((HeadingLevel::H3, 0.5))
        );
    }

    #[test]
    fn test_extract_span_headings_end_to_end() {
        let stats = body_stats();
        let found = extract_span_headings(&invitation_spans(), &stats, &noise(), &[]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "HOPE TO SEE YOU THERE!");
        assert_eq!(found[0].level, HeadingLevel::H1);
    }
}
