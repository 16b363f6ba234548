//! Regexes shared by more than one classifier stage.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::HeadingLevel;

macro_rules! shared_regex {
    ($(#[$meta:meta])* $name:ident, $pattern:expr) => {
        $(#[$meta])*
        pub fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).unwrap())
        }
    };
}

shared_regex!(
    /// `1. Introduction`, `2.3. Scope`
    numbered_section,
    r"^(\d+\.)+\s+[A-Z]"
);
shared_regex!(
    /// `2.1 Audience`
    numbered_subsection,
    r"^(\d+\.\d+)+\s+[A-Z]"
);
shared_regex!(numbered_subsubsection, r"^(\d+\.\d+\.\d+)+\s+[A-Z]");
shared_regex!(lettered_section, r"^[A-Z]+\.\s+[A-Z]");
shared_regex!(parenthesised_letter, r"^\([a-z]\)\s+[A-Z]");
shared_regex!(
    /// Main-section override shape: a single number then a capital.
    main_section,
    r"^(\d+\.)\s+[A-Z]"
);
shared_regex!(leading_number, r"^\d+\.");
shared_regex!(chapter, r"(?i)^Chapter\s+\d+:");
shared_regex!(
    /// Leading section number, used to measure the rest of a heading.
    section_number_prefix,
    r"^\d+(\.\d+)*\.?\s+"
);

/// Form-field vocabulary, strongest first, matched against lowercased text.
fn form_field_rules() -> &'static [(Regex, f32)] {
    static RULES: OnceLock<Vec<(Regex, f32)>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            (
                Regex::new(
                    r"\b(name|designation|date|service|account|emoluments|salary|pay|grade|department)\b",
                )
                .unwrap(),
                0.35,
            ),
            (
                Regex::new(r"\b(present|current|basic|leave|advance|grant|application)\b").unwrap(),
                0.25,
            ),
        ]
    })
}

/// Score of the first form-field rule matching `lower`, if any.
pub fn form_field_score(lower: &str) -> Option<f32> {
    form_field_rules()
        .iter()
        .find_map(|(re, score)| re.is_match(lower).then_some(*score))
}

/// Chapter and professional-description shapes, checked before numbering.
pub fn chapter_pattern(text: &str) -> Option<(f32, HeadingLevel)> {
    static RULES: OnceLock<Vec<(Regex, f32, HeadingLevel)>> = OnceLock::new();
    let rules = RULES.get_or_init(|| {
        vec![
            (Regex::new(r"(?i)^Chapter\s+\d+:").unwrap(), 0.7, HeadingLevel::H1),
            (
                Regex::new(r"(?i)^\d+\.\s+Professionals?\s+who").unwrap(),
                0.6,
                HeadingLevel::H3,
            ),
            (
                Regex::new(r"(?i)^\d+\.\s+Junior\s+professional").unwrap(),
                0.6,
                HeadingLevel::H3,
            ),
            (
                Regex::new(r"(?i)^\d+\.\s+[A-Z][a-z]+.*?(experience|testing|profession)").unwrap(),
                0.5,
                HeadingLevel::H3,
            ),
        ]
    });
    rules
        .iter()
        .find(|(re, _, _)| re.is_match(text))
        .map(|(_, score, level)| (*score, *level))
}

/// Section-numbering shapes, most specific prefix first.
pub fn numbered_pattern(text: &str) -> Option<(f32, HeadingLevel)> {
    let rules: [(&Regex, f32, HeadingLevel); 5] = [
        (numbered_section(), 0.6, HeadingLevel::H1),
        (numbered_subsection(), 0.5, HeadingLevel::H2),
        (numbered_subsubsection(), 0.4, HeadingLevel::H3),
        (lettered_section(), 0.35, HeadingLevel::H2),
        (parenthesised_letter(), 0.3, HeadingLevel::H3),
    ];
    rules
        .iter()
        .find(|(re, _, _)| re.is_match(text))
        .map(|(_, score, level)| (*score, *level))
}
