use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Normalise a raw text run before classification.
///
/// Applies NFKC compatibility normalisation (which also folds ligatures and
/// full-width forms), trims, collapses every whitespace run into a single
/// space, and finally removes each match of the caller's custom filters.
pub fn normalize_text(text: &str, filters: &[Regex]) -> String {
    let mut result: String = text.trim().nfkc().collect();

    static RE_WS: OnceLock<Regex> = OnceLock::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    result = re_ws.replace_all(&result, " ").to_string();

    for filter in filters {
        result = filter.replace_all(&result, "").to_string();
    }

    // NFKC can turn some characters into spaces, so trim again last.
    result.trim().to_string()
}

/// Python-style `istitle`: every cased run starts with an uppercase letter
/// followed only by lowercase letters, and at least one cased letter exists.
pub fn is_title_case(text: &str) -> bool {
    let mut seen_cased = false;
    let mut prev_cased = false;
    for c in text.chars() {
        if c.is_uppercase() {
            if prev_cased {
                return false;
            }
            prev_cased = true;
            seen_cased = true;
        } else if c.is_lowercase() {
            if !prev_cased {
                return false;
            }
            prev_cased = true;
            seen_cased = true;
        } else {
            prev_cased = false;
        }
    }
    seen_cased
}

/// At least one cased letter, and no lowercase letters.
pub fn is_upper_case(text: &str) -> bool {
    let mut seen_cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            seen_cased = true;
        }
    }
    seen_cased
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
