//! Ordered noise rules.
//!
//! Each rule looks at a line and either returns a verdict or passes. The first
//! verdict wins, so a later, more permissive rule can never override an
//! earlier rejection. Anything no rule claims is kept.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};

use crate::exceptions::CorpusExceptions;
use crate::normalize::{char_len, word_count};
use crate::patterns;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Noise,
    Keep,
}

/// Precomputed views of the line under test.
struct Line<'a> {
    text: &'a str,
    trimmed: &'a str,
    lower: String,
    chars: usize,
    words: usize,
}

struct Ctx<'a> {
    patterns: &'a [String],
    exceptions: CorpusExceptions,
}

type Rule = fn(&Line, &Ctx) -> Option<Verdict>;

const RULES: &[(&str, Rule)] = &[
    ("exact_noise_pattern", exact_noise_pattern),
    ("always_keep", always_keep),
    ("punctuation_ratio", punctuation_ratio),
    ("decorative_line", decorative_line),
    ("keep_title", keep_title),
    ("document_metadata", document_metadata),
    ("url", url),
    ("contact_field", contact_field),
    ("numbered_form_field", numbered_form_field),
    ("overlong", overlong),
    ("form_phrasing", form_phrasing),
    ("copyright_footer", copyright_footer),
    ("long_unstructured", long_unstructured),
    ("custom_noise_substring", custom_noise_substring),
    ("contact_label", contact_label),
    ("address_word", address_word),
    ("calendar_date", calendar_date),
    ("decorative_characters", decorative_characters),
];

/// Noise classifier over an injected noise-pattern list.
#[derive(Debug, Clone)]
pub struct NoiseClassifier {
    patterns: Vec<String>,
    exceptions: CorpusExceptions,
}

impl NoiseClassifier {
    pub fn new(patterns: Vec<String>, exceptions: CorpusExceptions) -> Self {
        NoiseClassifier {
            patterns,
            exceptions,
        }
    }

    /// Whether `text` can never be a heading.
    pub fn is_noise(&self, text: &str) -> bool {
        self.classify(text).0 == Verdict::Noise
    }

    /// Verdict plus the name of the rule that decided it (`None` when no
    /// rule claimed the line).
    pub fn classify(&self, text: &str) -> (Verdict, Option<&'static str>) {
        let trimmed = text.trim();
        let line = Line {
            text,
            trimmed,
            lower: text.to_lowercase(),
            chars: char_len(text),
            words: word_count(text),
        };
        let ctx = Ctx {
            patterns: &self.patterns,
            exceptions: self.exceptions,
        };

        for (name, rule) in RULES {
            if let Some(verdict) = rule(&line, &ctx) {
                return (verdict, Some(*name));
            }
        }
        (Verdict::Keep, None)
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn exact_noise_pattern(line: &Line, ctx: &Ctx) -> Option<Verdict> {
    ctx.patterns
        .iter()
        .any(|p| p == line.trimmed)
        .then_some(Verdict::Noise)
}

fn always_keep(line: &Line, ctx: &Ctx) -> Option<Verdict> {
    ctx.exceptions
        .always_keep(line.trimmed)
        .then_some(Verdict::Keep)
}

const SPECIAL_CHARS: &str = "-_=+*#@$%^&(){}[]|\\:;\"',.<>?/~`!";

fn punctuation_ratio(line: &Line, _: &Ctx) -> Option<Verdict> {
    let special = line
        .trimmed
        .chars()
        .filter(|c| SPECIAL_CHARS.contains(*c))
        .count();
    let letters = line
        .trimmed
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .count();
    (special > 0 && letters > 0 && special as f32 / letters as f32 > 0.5).then_some(Verdict::Noise)
}

fn decorative_line(line: &Line, _: &Ctx) -> Option<Verdict> {
    if char_len(line.trimmed) <= 5 {
        return None;
    }
    let mut unique: Vec<char> = line.trimmed.chars().filter(|c| *c != ' ').collect();
    unique.sort_unstable();
    unique.dedup();
    (unique.len() <= 2 && unique.iter().any(|c| "-_=+*#".contains(*c))).then_some(Verdict::Noise)
}

fn keep_title(line: &Line, ctx: &Ctx) -> Option<Verdict> {
    ctx.exceptions
        .keep_title(line.trimmed)
        .then_some(Verdict::Keep)
}

fn document_metadata(line: &Line, _: &Ctx) -> Option<Verdict> {
    static RE: OnceLock<RegexSet> = OnceLock::new();
    let set = RE.get_or_init(|| {
        RegexSet::new([
            r"(?i)^International\s+.*\s+Qualifications?\s+Board$",
            r"(?i)^.*Software\s+Testing.*Foundation.*Level.*Extension.*Qualifications$",
            r"(?i)^Copyright\s+©.*International.*$",
            r"(?i)^Version\s+\d+.*Page\s+\d+.*of\s+\d+.*$",
            r"(?i)^.*Page\s+\d+\s+of\s+\d+.*\d{4}$",
        ])
        .unwrap()
    });
    set.is_match(line.text).then_some(Verdict::Noise)
}

fn url(line: &Line, _: &Ctx) -> Option<Verdict> {
    let lower = &line.lower;
    (lower.starts_with("www.")
        || lower.starts_with("http")
        || lower.contains(".com")
        || lower.contains(".org")
        || lower.contains(".net"))
    .then_some(Verdict::Noise)
}

fn contact_field(line: &Line, _: &Ctx) -> Option<Verdict> {
    static RE_RSVP: OnceLock<Regex> = OnceLock::new();
    let re_rsvp = RE_RSVP.get_or_init(|| Regex::new(r"^rsvp:\s*[-_]{3,}").unwrap());
    (re_rsvp.is_match(&line.lower) || line.lower.contains("phone:") || line.lower.contains("email:"))
        .then_some(Verdict::Noise)
}

fn numbered_form_field(line: &Line, _: &Ctx) -> Option<Verdict> {
    static RE: OnceLock<RegexSet> = OnceLock::new();
    let set = RE.get_or_init(|| {
        RegexSet::new([
            r"^\d+\.\s+(name|designation|date|salary|pay|grade|age|relationship)",
            r"^s\.no\s+name\s+age",
        ])
        .unwrap()
    });
    (set.is_match(&line.lower) || line.lower.ends_with("rs.")).then_some(Verdict::Noise)
}

fn is_numbered_or_chapter(text: &str) -> bool {
    patterns::leading_number().is_match(text) || patterns::chapter().is_match(text)
}

fn overlong(line: &Line, _: &Ctx) -> Option<Verdict> {
    const PROFESSIONAL: &[&str] = &[
        "professional",
        "testing",
        "experience",
        "methods",
        "techniques",
    ];
    let structured = is_numbered_or_chapter(line.text);
    if line.chars > 120 && !structured && !PROFESSIONAL.iter().any(|w| line.lower.contains(w)) {
        return Some(Verdict::Noise);
    }
    (line.chars > 100 && line.words > 15 && !structured).then_some(Verdict::Noise)
}

fn form_phrasing(line: &Line, _: &Ctx) -> Option<Verdict> {
    static RE: OnceLock<RegexSet> = OnceLock::new();
    let set = RE.get_or_init(|| {
        RegexSet::new([
            r"^\d+\.\s*(name|designation|date|salary|grade|pay|scale|station|whether|home|amount|details|place)",
            r"^(name|designation|date|salary|grade|pay|scale|station)(\s+of.*)?:?\s*$",
            r"^date\s+of\s+(entering|joining|birth|appointment)",
            r"^signature\s+of\s+",
            r"^\([a-z]\)\s+block\s+for\s+which",
            r"^block\s+for\s+which",
            r"^whether\s+",
            r"^\([a-z]\)\s+if\s+",
            r"^single\s+(rail|bus)\s+fare",
            r"^headquarters\s+to\s+",
        ])
        .unwrap()
    });
    const PHRASES: &[&str] = &[
        "entitled to ltc",
        "ltc is to be availed",
        "place to be visited",
    ];
    const LABELS: &[&str] = &[
        "s.no",
        "serial number",
        "amount",
        "details",
        "remarks",
        "signature",
        "name",
        "relationship",
        "date",
        "designation",
        "salary",
        "grade",
        "pay",
        "service",
    ];
    let lower = line.lower.as_str();
    (set.is_match(lower)
        || lower.ends_with(" route.")
        || PHRASES.iter().any(|p| lower.contains(p))
        || LABELS.contains(&lower))
    .then_some(Verdict::Noise)
}

fn copyright_footer(line: &Line, _: &Ctx) -> Option<Verdict> {
    static RE_TRAILING_NUMBER: OnceLock<Regex> = OnceLock::new();
    let re_trailing_number =
        RE_TRAILING_NUMBER.get_or_init(|| Regex::new(r"^.*\s+\d+\s*$").unwrap());
    static RE_DIGITS: OnceLock<Regex> = OnceLock::new();
    let re_digits = RE_DIGITS.get_or_init(|| Regex::new(r"^\d+$").unwrap());
    static RE_PAGE: OnceLock<Regex> = OnceLock::new();
    let re_page = RE_PAGE.get_or_init(|| Regex::new(r"\bpage\s*\d+").unwrap());

    let text = line.text;
    let lower = line.lower.as_str();

    // Dots inside a leading section number do not count toward density.
    let body = patterns::section_number_prefix().replace(text, "");
    let dot_dense = body.matches('.').count() as f32 > char_len(&body) as f32 * 0.15;

    let toc_entry = re_trailing_number.is_match(text) && line.chars > 15 && !lower.starts_with("table");

    (lower.starts_with("copyright")
        || text.starts_with('©')
        || toc_entry
        || dot_dense
        || re_digits.is_match(line.trimmed)
        || re_page.is_match(lower)
        || (lower.starts_with("version") && line.words <= 3)
        || lower.starts_with("http")
        || (lower.starts_with("www.") && line.chars > 20)
        || (lower.contains("page ") && lower.contains("of "))
        || lower.ends_with(" of ")
        || lower.starts_with("page "))
    .then_some(Verdict::Noise)
}

fn long_unstructured(line: &Line, _: &Ctx) -> Option<Verdict> {
    const KEY_WORDS: &[&str] = &[
        "introduction",
        "overview",
        "summary",
        "conclusion",
        "principles",
        "methods",
        "techniques",
    ];
    (line.chars > 80
        && !is_numbered_or_chapter(line.text)
        && !KEY_WORDS.iter().any(|w| line.lower.contains(w)))
    .then_some(Verdict::Noise)
}

fn custom_noise_substring(line: &Line, ctx: &Ctx) -> Option<Verdict> {
    (line.chars > 50
        && ctx
            .patterns
            .iter()
            .any(|p| line.lower.contains(p.as_str())))
    .then_some(Verdict::Noise)
}

fn contact_label(line: &Line, _: &Ctx) -> Option<Verdict> {
    (line.lower.ends_with(':')
        && line.words <= 2
        && ["contact", "email", "phone"]
            .iter()
            .any(|t| line.lower.contains(t)))
    .then_some(Verdict::Noise)
}

fn address_word(line: &Line, _: &Ctx) -> Option<Verdict> {
    (line.words == 1
        && line.chars < 10
        && ["parkway", "avenue", "street", "road", "suite", "floor"]
            .iter()
            .any(|t| line.lower.contains(t)))
    .then_some(Verdict::Noise)
}

fn calendar_date(line: &Line, _: &Ctx) -> Option<Verdict> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"^(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2},?\s+\d{4}$",
        )
        .unwrap()
    });
    re.is_match(&line.lower).then_some(Verdict::Noise)
}

fn decorative_characters(line: &Line, _: &Ctx) -> Option<Verdict> {
    let mut unique: Vec<char> = line
        .text
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();
    unique.sort_unstable();
    unique.dedup();

    let decorative = line.text.matches('-').count() > 15
        || line.text.matches('_').count() > 5
        || (unique.len() <= 2 && line.chars > 8);
    if !decorative {
        return None;
    }

    let rsvp_label = line.lower.starts_with("rsvp") && line.text.contains(':');
    (!rsvp_label).then_some(Verdict::Noise)
}
