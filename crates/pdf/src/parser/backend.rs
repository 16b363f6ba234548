use std::collections::BTreeMap;

use lopdf::{self, content::Content};

use crate::PdfError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// Object id of a page dictionary.
pub type PageId = (u32, u16);

/// US Letter, used when a page declares no usable MediaBox.
pub const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

// FontDescriptor /Flags bits (PDF 32000-1, table 123).
const DESCRIPTOR_ITALIC: i64 = 1 << 6;
const DESCRIPTOR_FORCE_BOLD: i64 = 1 << 18;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// What the classifier needs to know about one font resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontResource {
    /// Resource key as used by `Tf` (e.g. `b"F1"`).
    pub key: Vec<u8>,
    /// `/BaseFont` without any subset prefix.
    pub base_font: Option<String>,
    /// Bold according to the font descriptor (ForceBold or a heavy weight).
    pub descriptor_bold: bool,
    /// Italic according to the font descriptor (Italic flag or a slant).
    pub descriptor_italic: bool,
}

/// PDF object as the content interpreter sees it. Kept free of `lopdf` types
/// so tests can build pages by hand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(PageId),
}

/// One content-stream operator with its operands.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Numeric operand as `f32`.
pub fn number(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Convert a `lopdf::Object` into a [`PdfValue`]. Stream payloads are dropped.
pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(
            dict.iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Stream(stream) => PdfValue::Dict(
            stream
                .dict
                .iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

/// Best-effort decoding of PDF string bytes: UTF-16BE with BOM, then UTF-8,
/// then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = payload
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Drop the `ABCDEF+` prefix embedded subsets carry.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((prefix, rest))
            if prefix.len() == 6 && prefix.chars().all(|c| c.is_ascii_uppercase()) =>
        {
            rest
        }
        _ => name,
    }
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over the PDF parsing library, so the text state machine can be
/// tested against in-memory pages.
pub trait PdfBackend {
    /// Mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Every font referenced by the page's resources.
    fn page_fonts(&self, page: PageId) -> Result<Vec<FontResource>, PdfError>;

    /// Raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Decode the bytes of a text-showing operator drawn with `font_key`.
    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String;

    /// `(width, height)` of the page in points.
    fn page_size(&self, page: PageId) -> (f32, f32);
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// [`PdfBackend`] backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from memory. Encrypted documents are rejected.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;
        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }
        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// String entries of the trailer's Info dictionary.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();

        let Ok(info) = self.doc.trailer.get(b"Info") else {
            return meta;
        };
        let info_dict = match info {
            lopdf::Object::Reference(id) => match self.doc.get_dictionary(*id) {
                Ok(d) => d,
                Err(_) => return meta,
            },
            lopdf::Object::Dictionary(d) => d,
            _ => return meta,
        };

        let keys: &[&[u8]] = &[b"Title", b"Author", b"Subject", b"Creator", b"Producer"];
        for key in keys {
            if let Ok(lopdf::Object::String(bytes, _)) = info_dict.get(key) {
                let value = decode_text_simple(bytes);
                if !value.trim().is_empty() {
                    meta.insert(String::from_utf8_lossy(key).into_owned(), value);
                }
            }
        }
        meta
    }

    fn resolve<'a>(&'a self, obj: &'a lopdf::Object) -> &'a lopdf::Object {
        match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            other => other,
        }
    }

    /// MediaBox of the page, inherited from the page tree when absent.
    fn media_box(&self, dict: &lopdf::Dictionary) -> Option<[f32; 4]> {
        if let Ok(obj) = dict.get(b"MediaBox") {
            if let Ok(arr) = self.resolve(obj).as_array() {
                let nums: Vec<f32> = arr
                    .iter()
                    .filter_map(|o| match self.resolve(o) {
                        lopdf::Object::Integer(i) => Some(*i as f32),
                        lopdf::Object::Real(f) => Some(*f),
                        _ => None,
                    })
                    .collect();
                if nums.len() == 4 {
                    return Some([nums[0], nums[1], nums[2], nums[3]]);
                }
            }
        }

        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        let parent_dict = self.doc.get_dictionary(parent).ok()?;
        self.media_box(parent_dict)
    }

    fn font_resource(&self, key: &[u8], font: &lopdf::Dictionary) -> FontResource {
        let base_font = font
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| strip_subset_prefix(&String::from_utf8_lossy(n)).to_string());

        let descriptor = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| self.resolve(o).as_dict().ok());

        let (descriptor_bold, descriptor_italic) = match descriptor {
            Some(d) => {
                let flags = d.get(b"Flags").ok().and_then(|o| o.as_i64().ok()).unwrap_or(0);
                let weight = d
                    .get(b"FontWeight")
                    .ok()
                    .and_then(|o| o.as_float().ok())
                    .unwrap_or(0.0);
                let angle = d
                    .get(b"ItalicAngle")
                    .ok()
                    .and_then(|o| o.as_float().ok())
                    .unwrap_or(0.0);
                (
                    flags & DESCRIPTOR_FORCE_BOLD != 0 || weight >= 600.0,
                    flags & DESCRIPTOR_ITALIC != 0 || angle != 0.0,
                )
            }
            None => (false, false),
        };

        FontResource {
            key: key.to_vec(),
            base_font,
            descriptor_bold,
            descriptor_italic,
        }
    }

    fn font_encoding(&self, page: PageId, font_key: &[u8]) -> Option<String> {
        let fonts = self.doc.get_page_fonts(page).ok()?;
        match fonts.get(font_key)?.get(b"Encoding").ok()? {
            lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
            _ => None,
        }
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontResource>, PdfError> {
        let fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {e}")))?;
        Ok(fonts
            .iter()
            .map(|(key, dict)| self.font_resource(key, dict))
            .collect())
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {e}")))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {e}")))?;
        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(&self, page: PageId, font_key: &[u8], bytes: &[u8]) -> String {
        // Identity-H/V fonts use two-byte codes; try them as UTF-16BE first.
        let identity = self
            .font_encoding(page, font_key)
            .is_some_and(|enc| enc.contains("Identity"));
        if identity && bytes.len() >= 2 && bytes.len() % 2 == 0 {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            let decoded = String::from_utf16_lossy(&units);
            if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                return decoded;
            }
        }
        decode_text_simple(bytes)
    }

    fn page_size(&self, page: PageId) -> (f32, f32) {
        self.doc
            .get_dictionary(page)
            .ok()
            .and_then(|dict| self.media_box(dict))
            .map(|[x0, y0, x1, y1]| ((x1 - x0).abs(), (y1 - y0).abs()))
            .filter(|(w, h)| *w > 0.0 && *h > 0.0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_text_simple_variants() {
        assert_eq!(decode_text_simple(b"Overview"), "Overview");
        assert_eq!(decode_text_simple(&[0x63, 0x61, 0x66, 0xE9]), "caf\u{00E9}");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42]), "AB");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x41, 0x00]), "A");
        assert_eq!(decode_text_simple(&[]), "");
    }

    #[test]
    fn number_accepts_integers_and_reals() {
        assert_eq!(number(&PdfValue::Integer(12)), Some(12.0));
        assert_eq!(number(&PdfValue::Real(10.5)), Some(10.5));
        assert_eq!(number(&PdfValue::Name(b"F1".to_vec())), None);
    }

    #[test]
    fn subset_prefix_is_stripped() {
        assert_eq!(strip_subset_prefix("ABCDEF+Arial-BoldMT"), "Arial-BoldMT");
        assert_eq!(strip_subset_prefix("Arial-BoldMT"), "Arial-BoldMT");
        assert_eq!(strip_subset_prefix("abc+Font"), "abc+Font");
    }

    #[test]
    fn convert_nested_dictionary() {
        let mut dict = lopdf::Dictionary::new();
        dict.set(
            "MediaBox",
            lopdf::Object::Array(vec![
                lopdf::Object::Integer(0),
                lopdf::Object::Integer(0),
                lopdf::Object::Real(612.0),
                lopdf::Object::Real(792.0),
            ]),
        );
        match convert_object(&lopdf::Object::Dictionary(dict)) {
            PdfValue::Dict(entries) => {
                assert_eq!(entries[0].0, b"MediaBox");
                assert_eq!(
                    entries[0].1,
                    PdfValue::Array(vec![
                        PdfValue::Integer(0),
                        PdfValue::Integer(0),
                        PdfValue::Real(612.0),
                        PdfValue::Real(792.0),
                    ])
                );
            }
            other => panic!("expected Dict, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_garbage() {
        assert!(matches!(
            LopdfBackend::load_bytes(b"not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }
}
