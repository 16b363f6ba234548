use std::cmp::Ordering;
use std::collections::HashMap;

use crate::normalize::char_len;
use crate::types::{HeadingCandidate, HeadingLevel};

// ----------------------------------------------------------------------------
// Post-processing
// ----------------------------------------------------------------------------

/// Turn raw candidates into a clean outline: drop entries that repeat the
/// title, order by position, remove duplicate texts and make sure no level
/// ever jumps more than one step below the previous entry.
///
/// Running it again on its own output is a no-op.
pub fn post_process(candidates: Vec<HeadingCandidate>, title: &str) -> Vec<HeadingCandidate> {
    let mut headings = remove_title_matches(candidates, title);
    sort_by_position(&mut headings);
    validate_hierarchy(&mut headings);

    let mut headings = remove_duplicates(headings);
    sort_by_position(&mut headings);
    validate_hierarchy(&mut headings);
    headings
}

fn remove_title_matches(candidates: Vec<HeadingCandidate>, title: &str) -> Vec<HeadingCandidate> {
    let title = title.trim().to_lowercase();
    if title.is_empty() {
        return candidates;
    }
    let title_len = char_len(&title);

    candidates
        .into_iter()
        .filter(|h| {
            let text = h.text.trim().to_lowercase();
            let repeats_title = text == title
                || (char_len(&text) > 10 && title.contains(&text))
                || (title_len > 10 && text.contains(&title));
            !repeats_title
        })
        .collect()
}

fn position(a: &HeadingCandidate, b: &HeadingCandidate) -> Ordering {
    a.page
        .cmp(&b.page)
        .then_with(|| a.bbox.y0.total_cmp(&b.bbox.y0))
}

/// Stable sort by page, then vertical position on the page.
pub fn sort_by_position(headings: &mut [HeadingCandidate]) {
    headings.sort_by(position);
}

/// Clamp every level to at most one deeper than the level before it.
pub fn validate_hierarchy(headings: &mut [HeadingCandidate]) {
    let mut previous: Option<HeadingLevel> = None;
    for heading in headings.iter_mut() {
        if let Some(prev) = previous {
            if heading.level.as_u8() > prev.as_u8() + 1 {
                heading.level = prev.demote();
            }
        }
        previous = Some(heading.level);
    }
}

/// Keep one entry per case-insensitive text: the most confident one, or the
/// earliest on ties. Surviving entries keep their relative order.
pub fn remove_duplicates(headings: Vec<HeadingCandidate>) -> Vec<HeadingCandidate> {
    let mut best: HashMap<String, usize> = HashMap::new();
    for (index, heading) in headings.iter().enumerate() {
        let key = heading.text.trim().to_lowercase();
        match best.get(&key) {
            Some(&kept) if headings[kept].confidence >= heading.confidence => {}
            _ => {
                best.insert(key, index);
            }
        }
    }

    headings
        .into_iter()
        .enumerate()
        .filter(|(index, heading)| best.get(&heading.text.trim().to_lowercase()) == Some(index))
        .map(|(_, heading)| heading)
        .collect()
}
