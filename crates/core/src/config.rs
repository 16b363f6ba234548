use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::OutlineError;

/// Substrings and exact lines that are never headings.
pub const DEFAULT_NOISE_PATTERNS: &[&str] = &[
    "qualifications board",
    "testing board",
    "international board",
    "copyright notice",
    "document may be copied",
    "source is acknowledged",
    ". *",
    ".*",
    "..",
    "\u{2022} *",
    "- *",
    "* *",
];

/// Words whose presence nudges a block toward being a section heading.
pub const DEFAULT_STRUCTURAL_WORDS: &[&str] = &[
    "introduction",
    "background",
    "summary",
    "conclusion",
    "overview",
    "methodology",
    "results",
    "discussion",
    "references",
    "appendix",
    "timeline",
    "milestones",
    "approach",
    "evaluation",
    "requirements",
    "preamble",
    "membership",
    "meetings",
    "term",
    "revision",
    "history",
    "acknowledgements",
    "contents",
    "abstract",
    "objectives",
    "scope",
    "definitions",
    "recommendations",
];

/// User-facing extractor configuration.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Minimum number of characters for a heading.
    pub min_heading_length: usize,
    /// Maximum number of words for a heading (relaxed for a few block shapes).
    pub max_heading_words: usize,
    /// Whether the batch runner may reuse cached results.
    pub enable_cache: bool,
    /// Regexes removed (case-insensitively) from every text run.
    pub custom_filters: Vec<String>,
    /// Replaces [`DEFAULT_NOISE_PATTERNS`] when set.
    pub noise_patterns: Option<Vec<String>>,
    /// Replaces [`DEFAULT_STRUCTURAL_WORDS`] when set.
    pub structural_words: Option<Vec<String>>,
    /// Enables the known-corpus exception table (see `exceptions`).
    pub corpus_exceptions: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_heading_length: 3,
            max_heading_words: 25,
            enable_cache: true,
            custom_filters: Vec::new(),
            noise_patterns: None,
            structural_words: None,
            corpus_exceptions: true,
        }
    }
}

impl ExtractorConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, OutlineError> {
        toml::from_str(raw).map_err(|e| OutlineError::Configuration(e.to_string()))
    }

    /// Validate the configuration and compile it into the immutable form
    /// threaded through the engine.
    pub fn compile(&self) -> Result<CompiledConfig, OutlineError> {
        if self.max_heading_words == 0 {
            return Err(OutlineError::Configuration(
                "max_heading_words must be at least 1".into(),
            ));
        }

        let filters = self
            .custom_filters
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        OutlineError::Configuration(format!(
                            "custom filter `{pattern}` is not a valid regex: {e}"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let noise_patterns = match &self.noise_patterns {
            Some(list) => list.clone(),
            None => DEFAULT_NOISE_PATTERNS.iter().map(|s| s.to_string()).collect(),
        };

        let structural_words = match &self.structural_words {
            Some(list) => list.iter().map(|w| w.to_lowercase()).collect(),
            None => DEFAULT_STRUCTURAL_WORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        Ok(CompiledConfig {
            min_heading_length: self.min_heading_length,
            max_heading_words: self.max_heading_words,
            filters,
            noise_patterns,
            structural_words,
            corpus_exceptions: self.corpus_exceptions,
        })
    }
}

/// Validated configuration. Built once per engine and never mutated.
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub min_heading_length: usize,
    pub max_heading_words: usize,
    pub filters: Vec<Regex>,
    pub noise_patterns: Vec<String>,
    pub structural_words: Vec<String>,
    pub corpus_exceptions: bool,
}

impl Default for CompiledConfig {
    fn default() -> Self {
        // The default configuration always compiles.
        ExtractorConfig::default()
            .compile()
            .unwrap_or_else(|_| unreachable!("default configuration is valid"))
    }
}
