use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Bit set in [`TextBlock::font_flags`] when the run is rendered bold.
pub const FONT_FLAG_BOLD: u32 = 1 << 4;

/// Bit set in [`TextBlock::font_flags`] when the run is rendered italic.
pub const FONT_FLAG_ITALIC: u32 = 1 << 1;

/// Axis-aligned box in page space with a top-left origin: `y0` is the top
/// edge and grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        BBox { x0, y0, x1, y1 }
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn top(&self) -> f32 {
        self.y0
    }
}

/// A unit of page text with font and position metadata.
///
/// Produced by the PDF access layer. Block-level detection consumes whole
/// blocks; the span-level fallback consumes the narrower [`Span`]s that share
/// this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub font_name: String,
    pub font_size: f32,
    pub font_flags: u32,
    pub bbox: BBox,
    /// 0-based page index.
    pub page: usize,
}

/// Finer-grained text run used only by the span-level extraction path.
pub type Span = TextBlock;

impl TextBlock {
    pub fn has_bold_flag(&self) -> bool {
        self.font_flags & FONT_FLAG_BOLD != 0
    }
}

/// Outline depth. Only H1..=H3 are produced by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub const H1: Self = HeadingLevel(1);
    pub const H2: Self = HeadingLevel(2);
    pub const H3: Self = HeadingLevel(3);

    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// One step deeper, saturating at H3.
    pub fn demote(self) -> Self {
        HeadingLevel((self.0 + 1).min(3))
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = InvalidHeadingLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=3).contains(&value) {
            Ok(HeadingLevel(value))
        } else {
            Err(InvalidHeadingLevel)
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.0)
    }
}

impl Serialize for HeadingLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HeadingLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.strip_prefix('H')
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(|n| HeadingLevel::try_from(n).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid heading level `{raw}`")))
    }
}

#[derive(Debug, Error)]
#[error("Heading level must be between 1 and 3")]
pub struct InvalidHeadingLevel;

/// A scored heading hypothesis prior to post-processing.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingCandidate {
    pub text: String,
    pub level: HeadingLevel,
    pub confidence: f32,
    pub page: usize,
    pub bbox: BBox,
}

/// One entry of the final outline; internal scoring fields are stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub level: HeadingLevel,
    pub text: String,
    pub page: usize,
}

impl From<&HeadingCandidate> for OutlineEntry {
    fn from(c: &HeadingCandidate) -> Self {
        OutlineEntry {
            level: c.level,
            text: c.text.clone(),
            page: c.page,
        }
    }
}

/// Result of classifying one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOutline {
    pub title: String,
    pub outline: Vec<OutlineEntry>,
}

/// Everything the engine needs from the PDF access layer for one document.
#[derive(Debug, Clone, Default)]
pub struct DocumentInput {
    /// Blocks in document order.
    pub blocks: Vec<TextBlock>,
    /// Raw span stream in document order, for the span-level path.
    pub spans: Vec<Span>,
    pub page_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_valid() {
        assert!(HeadingLevel::try_from(1).is_ok());
        assert!(HeadingLevel::try_from(3).is_ok());
    }

    #[test]
    fn test_heading_level_invalid() {
        assert!(HeadingLevel::try_from(0).is_err());
        assert!(HeadingLevel::try_from(4).is_err());
    }

    #[test]
    fn test_heading_level_demote_saturates() {
        assert_eq!(HeadingLevel::H2.demote(), HeadingLevel::H3);
        assert_eq!(HeadingLevel::H3.demote(), HeadingLevel::H3);
    }

    #[test]
    fn test_heading_level_serializes_as_label() {
        let json = serde_json::to_string(&HeadingLevel::H2).unwrap();
        assert_eq!(json, "\"H2\"");
        let back: HeadingLevel = serde_json::from_str("\"H3\"").unwrap();
        assert_eq!(back, HeadingLevel::H3);
        assert!(serde_json::from_str::<HeadingLevel>("\"H7\"").is_err());
    }

    #[test]
    fn test_bbox_union() {
        let a = BBox::new(10.0, 20.0, 50.0, 30.0);
        let b = BBox::new(40.0, 18.0, 90.0, 28.0);
        assert_eq!(a.union(&b), BBox::new(10.0, 18.0, 90.0, 30.0));
    }

    #[test]
    fn test_outline_entry_json_shape() {
        let doc = DocumentOutline {
            title: "Report".to_string(),
            outline: vec![OutlineEntry {
                level: HeadingLevel::H1,
                text: "Introduction".to_string(),
                page: 1,
            }],
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["outline"][0]["level"], "H1");
        assert_eq!(value["outline"][0]["page"], 1);
    }
}
