use crate::normalize::{char_len, is_title_case, is_upper_case, word_count};
use crate::patterns;
use crate::stats::FontStatistics;
use crate::types::{HeadingLevel, TextBlock};

const BOLD_NAME_MARKERS: &[&str] = &[
    "bold",
    "black",
    "heavy",
    "demi",
    "semibold",
    "extrabold",
    "boldmt",
];

const HIGH_VALUE_WORDS: &[&str] = &[
    "introduction",
    "conclusion",
    "abstract",
    "summary",
    "overview",
    "background",
    "options",
    "pathway",
    "requirements",
    "prerequisites",
];

const MEDIUM_VALUE_WORDS: &[&str] = &[
    "methodology",
    "results",
    "discussion",
    "references",
    "acknowledgements",
    "table of contents",
    "revision history",
    "program",
    "curriculum",
    "schedule",
];

const SECTION_WORDS: &[&str] = &[
    "appendix",
    "definitions",
    "scope",
    "requirements",
    "evaluation",
    "approach",
];

const INTRO_PHRASES: &[&str] = &[
    "this section",
    "the following",
    "as described",
    "section covers",
];

/// Heading likelihood and the level it suggests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub confidence: f32,
    pub level: HeadingLevel,
}

/// Bold bit set, or a font name that reads as a heavy weight.
pub fn is_bold(block: &TextBlock) -> bool {
    if block.has_bold_flag() {
        return true;
    }
    let name = block.font_name.to_lowercase();
    BOLD_NAME_MARKERS.iter().any(|m| name.contains(m))
}

/// Additive heading-confidence scorer over one document's statistics.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceScorer<'a> {
    stats: &'a FontStatistics,
    structural_words: &'a [String],
}

impl<'a> ConfidenceScorer<'a> {
    pub fn new(stats: &'a FontStatistics, structural_words: &'a [String]) -> Self {
        ConfidenceScorer {
            stats,
            structural_words,
        }
    }

    /// Score `text` as rendered by `block`. `text` is usually the block's own
    /// text, but may be a fragment cut from it. `context` holds neighbouring
    /// blocks; pass an empty slice to skip the context rule.
    pub fn score(&self, text: &str, block: &TextBlock, context: &[TextBlock]) -> Score {
        let thresholds = &self.stats.heading_thresholds;
        let size = block.font_size;
        let ratio = self.stats.size_ratio(size);

        let mut confidence: f32 = 0.0;
        let mut level = HeadingLevel::H3;

        if size >= thresholds.h1 {
            confidence += 0.4;
            level = HeadingLevel::H1;
        } else if size >= thresholds.h2 {
            confidence += 0.3;
            level = HeadingLevel::H2;
        } else if size >= self.stats.scoring_floor {
            confidence += 0.25;
        } else {
            confidence -= 0.1;
        }

        let bold = is_bold(block);
        if ratio > 1.8 && !bold {
            return Score {
                confidence: (confidence * 0.3).max(0.0),
                level: HeadingLevel::H3,
            };
        } else if ratio > 1.5 && !bold {
            confidence *= 0.7;
        }

        if bold {
            confidence += 0.3;
            if level == HeadingLevel::H3 && confidence > 0.4 {
                level = HeadingLevel::H2;
            } else if level == HeadingLevel::H2 && confidence > 0.6 {
                level = HeadingLevel::H1;
            }
        }

        let lower = text.to_lowercase();
        let (vocabulary, vocabulary_level) = self.vocabulary(&lower, level);
        confidence += vocabulary;
        level = vocabulary_level;

        confidence += fairness_adjustment(text);

        if let Some((score, pattern_level)) =
            patterns::chapter_pattern(text).or_else(|| patterns::numbered_pattern(text))
        {
            confidence += score;
            level = pattern_level;
        }

        if block.bbox.top() < 100.0 {
            confidence += 0.1;
        }

        let words = word_count(text);
        if (2..=8).contains(&words) {
            confidence += 0.1;
        } else if words == 1 && char_len(text) > 3 {
            confidence += 0.05;
        } else if words > 15 {
            confidence -= 0.3;
        }

        if is_title_case(text) {
            confidence += 0.1;
        } else if is_upper_case(text) && words <= 5 {
            confidence += 0.15;
        }

        if text.ends_with(':') {
            confidence += 0.1;
            if level == HeadingLevel::H1 {
                level = HeadingLevel::H2;
            }
        }

        if !context.is_empty() {
            confidence += self.context_bonus(context);
        }

        Score {
            confidence: confidence.min(1.0),
            level,
        }
    }

    /// First matching vocabulary group: form fields, then the high, medium
    /// and section tiers, then the caller's structural words.
    fn vocabulary(&self, lower: &str, level: HeadingLevel) -> (f32, HeadingLevel) {
        if let Some(score) = patterns::form_field_score(lower) {
            return (score, HeadingLevel::H3);
        }

        let contains_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if contains_any(HIGH_VALUE_WORDS) {
            let level = if level == HeadingLevel::H3 {
                HeadingLevel::H1
            } else {
                level
            };
            (0.4, level)
        } else if contains_any(MEDIUM_VALUE_WORDS) {
            let level = if level == HeadingLevel::H3 {
                HeadingLevel::H2
            } else {
                level
            };
            (0.3, level)
        } else if contains_any(SECTION_WORDS) {
            (0.2, level)
        } else if self
            .structural_words
            .iter()
            .any(|w| lower.contains(w.as_str()))
        {
            (0.15, level)
        } else {
            (0.0, level)
        }
    }

    fn context_bonus(&self, context: &[TextBlock]) -> f32 {
        let mut bonus: f32 = 0.0;
        for neighbour in context.iter().take(3) {
            if neighbour.font_size < self.stats.median {
                bonus += 0.05;
            }
            let lower = neighbour.text.to_lowercase();
            if INTRO_PHRASES.iter().any(|p| lower.contains(p)) {
                bonus += 0.1;
            }
        }
        bonus.min(0.2)
    }
}

/// Boost for text that is mostly non-ASCII, so scripts without case or
/// English vocabulary are not structurally disadvantaged.
fn fairness_adjustment(text: &str) -> f32 {
    let len = char_len(text);
    if len == 0 {
        return 0.0;
    }
    let non_ascii = text.chars().filter(|c| !c.is_ascii()).count();
    let mut bonus = 0.0;
    if non_ascii > 0 && non_ascii as f32 / len as f32 > 0.3 {
        bonus += 0.15;
    }
    if len < 8 && non_ascii as f32 > len as f32 * 0.5 {
        bonus += 0.1;
    }
    bonus
}
