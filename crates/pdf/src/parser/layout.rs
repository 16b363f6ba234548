//! Text extraction and block assembly.
//!
//! Content-stream operators are replayed through a small text-state machine
//! to produce positioned runs. Runs are converted to top-left-origin spans,
//! grouped into lines, and lines into blocks:
//!
//! ```text
//! content ops  ->  RawRun[]  ->  Span[]  ->  Line[]  ->  TextBlock[]
//!   (per page)     extract       to_span     group       group_lines
//! ```

use pdfoutline_core::types::{BBox, Span, TextBlock, FONT_FLAG_BOLD, FONT_FLAG_ITALIC};

use super::backend::{number, FontResource, PageId, PdfBackend, PdfValue};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Runs whose baselines differ by at most this many points share a line.
const BASELINE_TOLERANCE: f32 = 1.0;

/// Approximate glyph width as a fraction of the font size; no glyph metrics
/// are read.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Minimum horizontal gap (points) between runs before a space is inserted.
const MIN_WORD_GAP: f32 = 1.5;

/// A baseline distance larger than this multiple of the font size starts a
/// new block.
const BLOCK_GAP_FACTOR: f32 = 1.4;

/// Lines whose dominant sizes differ by at least this much never share a block.
const BLOCK_SIZE_BREAK: f32 = 1.0;

const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One shown string in PDF user space (origin bottom-left, `y` is the baseline).
#[derive(Debug, Clone, PartialEq)]
pub struct RawRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub font_name: String,
    pub bold: bool,
    pub italic: bool,
}

/// Runs on one baseline, merged into same-style spans, left to right.
#[derive(Debug, Clone)]
pub struct Line {
    pub spans: Vec<Span>,
    pub bbox: BBox,
}

impl Line {
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Font size covering the most characters.
    pub fn font_size(&self) -> f32 {
        self.spans
            .iter()
            .max_by_key(|s| s.text.chars().count())
            .map(|s| s.font_size)
            .unwrap_or(0.0)
    }

    fn baseline(&self) -> f32 {
        self.bbox.y1
    }

    fn bold(&self) -> bool {
        self.spans.iter().any(|s| s.has_bold_flag())
    }
}

// ---------------------------------------------------------------------------
// Spaceless scripts
// ---------------------------------------------------------------------------

/// Scripts written without inter-word spaces (CJK, Thai, and similar).
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF
            | 0x3400..=0x4DBF
            | 0x20000..=0x2A6DF
            | 0xF900..=0xFAFF
            | 0x3040..=0x30FF
            | 0x31F0..=0x31FF
            | 0xAC00..=0xD7AF
            | 0x1100..=0x11FF
            | 0x3130..=0x318F
            | 0x3000..=0x303F
            | 0xFF00..=0xFFEF
            | 0x0E00..=0x0EFF
            | 0x1000..=0x109F
            | 0x1780..=0x17FF
            | 0x0F00..=0x0FFF
    )
}

// ---------------------------------------------------------------------------
// Text-state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_name: String,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
    bold: bool,
    italic: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
            bold: false,
            italic: false,
        }
    }
}

impl TextState {
    fn x(&self) -> f32 {
        self.text_matrix[4]
    }

    fn y(&self) -> f32 {
        self.text_matrix[5] + self.text_rise
    }

    /// Rendered size: `font_size * sqrt(b^2 + d^2)`.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    fn char_width(&self) -> f32 {
        self.effective_font_size() * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        let m = self.line_matrix;
        self.line_matrix[4] = m[0] * tx + m[2] * ty + m[4];
        self.line_matrix[5] = m[1] * tx + m[3] * ty + m[5];
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    fn set_font(&mut self, key: Vec<u8>, resource: Option<&FontResource>, size: f32) {
        let name = resource
            .and_then(|r| r.base_font.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(&key).into_owned());
        let upper = name.to_uppercase();

        self.bold = resource.is_some_and(|r| r.descriptor_bold)
            || ["BOLD", "BLACK", "HEAVY"].iter().any(|m| upper.contains(m));
        self.italic = resource.is_some_and(|r| r.descriptor_italic)
            || upper.contains("ITALIC")
            || upper.contains("OBLIQUE");
        self.font_key = key;
        self.font_name = name;
        self.font_size = size;
    }

    /// Advance past `text` and return the horizontal displacement.
    fn advance_after_show(&mut self, text: &str) -> f32 {
        let width = self.char_width();
        let dx: f32 = text
            .chars()
            .map(|c| {
                let spacing = if c == ' ' { self.word_spacing } else { 0.0 };
                width + self.char_spacing + spacing
            })
            .sum();
        self.advance_x(dx);
        dx
    }

    fn run(&self, text: String, x: f32, y: f32, width: f32) -> RawRun {
        RawRun {
            text,
            x,
            y,
            width,
            font_size: self.effective_font_size(),
            font_name: self.font_name.clone(),
            bold: self.bold,
            italic: self.italic,
        }
    }
}

fn decode_string(val: &PdfValue, backend: &dyn PdfBackend, page: PageId, font_key: &[u8]) -> String {
    match val {
        PdfValue::Str(bytes) => backend.decode_text(page, font_key, bytes),
        _ => String::new(),
    }
}

/// Replay one page's content stream and collect every shown string.
///
/// Handles `BT`, `Tf`, `Tm`, `Td`, `TD`, `T*`, `TL`, `Tc`, `Tw`, `Tz`, `Ts`,
/// `Tj`, `TJ`, `'` and `"`. Everything else is ignored.
pub fn extract_page_runs(backend: &dyn PdfBackend, page: PageId) -> Result<Vec<RawRun>, PdfError> {
    let raw = backend.page_content(page)?;
    let ops = backend.decode_content(&raw)?;
    let fonts = backend.page_fonts(page).unwrap_or_default();

    let mut state = TextState::default();
    let mut runs = Vec::new();

    for op in &ops {
        let first = op.operands.first();
        match op.operator.as_str() {
            "BT" => {
                state.text_matrix = IDENTITY_MATRIX;
                state.line_matrix = IDENTITY_MATRIX;
            }
            "Tf" => {
                if let (Some(PdfValue::Name(key)), Some(size)) =
                    (first, op.operands.get(1).and_then(number))
                {
                    let resource = fonts.iter().find(|f| &f.key == key);
                    state.set_font(key.clone(), resource, size);
                }
            }
            "Tm" => {
                let vals: Vec<f32> = op.operands.iter().take(6).filter_map(number).collect();
                if let [a, b, c, d, e, f] = vals[..] {
                    state.text_matrix = [a, b, c, d, e, f];
                    state.line_matrix = state.text_matrix;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (
                    first.and_then(number),
                    op.operands.get(1).and_then(number),
                ) {
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.translate_line(tx, ty);
                }
            }
            "T*" => state.next_line(),
            "TL" => {
                if let Some(v) = first.and_then(number) {
                    state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = first.and_then(number) {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = first.and_then(number) {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = first.and_then(number) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = first.and_then(number) {
                    state.text_rise = v;
                }
            }
            "Tj" => {
                if let Some(operand) = first {
                    show_string(operand, backend, page, &mut state, &mut runs);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = first {
                    show_array(items, backend, page, &mut state, &mut runs);
                }
            }
            "'" => {
                state.next_line();
                if let Some(operand) = first {
                    show_string(operand, backend, page, &mut state, &mut runs);
                }
            }
            "\"" => {
                if let [aw, ac, operand, ..] = &op.operands[..] {
                    if let Some(v) = number(aw) {
                        state.word_spacing = v;
                    }
                    if let Some(v) = number(ac) {
                        state.char_spacing = v;
                    }
                    state.next_line();
                    show_string(operand, backend, page, &mut state, &mut runs);
                }
            }
            _ => {}
        }
    }

    Ok(runs)
}

fn show_string(
    operand: &PdfValue,
    backend: &dyn PdfBackend,
    page: PageId,
    state: &mut TextState,
    runs: &mut Vec<RawRun>,
) {
    let text = decode_string(operand, backend, page, &state.font_key);
    if text.trim().is_empty() {
        state.advance_after_show(&text);
        return;
    }
    let (x, y) = (state.x(), state.y());
    let width = state.advance_after_show(&text);
    runs.push(state.run(text, x, y, width));
}

/// `TJ`: strings interleaved with kerning adjustments in thousandths of a
/// text-space unit. Adjustments wide enough to be a word gap become spaces.
fn show_array(
    items: &[PdfValue],
    backend: &dyn PdfBackend,
    page: PageId,
    state: &mut TextState,
    runs: &mut Vec<RawRun>,
) {
    let mut buf = String::new();
    let (start_x, start_y) = (state.x(), state.y());

    for item in items {
        if let PdfValue::Str(_) = item {
            let fragment = decode_string(item, backend, page, &state.font_key);
            buf.push_str(&fragment);
            state.advance_after_show(&fragment);
        } else if let Some(adjust) = number(item) {
            let dx = -adjust / 1000.0 * state.effective_font_size() * state.horiz_scale;
            if dx > state.char_width() * 0.3 && !buf.is_empty() && !buf.ends_with(' ') {
                buf.push(' ');
            }
            state.advance_x(dx);
        }
    }

    let text = buf.trim();
    if !text.is_empty() {
        let width = state.x() - start_x;
        runs.push(state.run(text.to_string(), start_x, start_y, width));
    }
}

// ---------------------------------------------------------------------------
// Coordinate conversion
// ---------------------------------------------------------------------------

/// Convert a run to a span with a top-left-origin box on a page of
/// `page_height` points. The box spans one font size above the baseline.
pub fn to_span(run: RawRun, page: usize, page_height: f32) -> Span {
    let mut flags = 0;
    if run.bold {
        flags |= FONT_FLAG_BOLD;
    }
    if run.italic {
        flags |= FONT_FLAG_ITALIC;
    }

    let bottom = page_height - run.y;
    Span {
        text: run.text,
        font_name: run.font_name,
        font_size: run.font_size,
        font_flags: flags,
        bbox: BBox::new(
            run.x,
            bottom - run.font_size,
            run.x + run.width.max(0.0),
            bottom,
        ),
        page,
    }
}

// ---------------------------------------------------------------------------
// Spans -> lines
// ---------------------------------------------------------------------------

fn same_style(a: &Span, b: &Span) -> bool {
    a.font_name == b.font_name && a.font_flags == b.font_flags && (a.font_size - b.font_size).abs() < 0.5
}

fn boundary_is_spaceless(prev: &str, next: &str) -> bool {
    match (prev.chars().next_back(), next.chars().next()) {
        (Some(l), Some(f)) => is_spaceless_script_char(l) && is_spaceless_script_char(f),
        _ => false,
    }
}

/// Group one page's spans into lines, top to bottom. Within a line, adjacent
/// same-style spans are merged into one.
pub fn group_spans_into_lines(mut spans: Vec<Span>) -> Vec<Line> {
    spans.sort_by(|a, b| {
        a.bbox
            .y1
            .total_cmp(&b.bbox.y1)
            .then_with(|| a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut rows: Vec<Vec<Span>> = Vec::new();
    for span in spans {
        match rows.last_mut() {
            Some(row) if (row[0].bbox.y1 - span.bbox.y1).abs() <= BASELINE_TOLERANCE => {
                row.push(span)
            }
            _ => rows.push(vec![span]),
        }
    }

    rows.into_iter().map(assemble_line).collect()
}

fn assemble_line(mut row: Vec<Span>) -> Line {
    row.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));

    let mut merged: Vec<Span> = Vec::with_capacity(row.len());
    for span in row {
        if let Some(prev) = merged.last_mut() {
            let gap = span.bbox.x0 - prev.bbox.x1;
            if same_style(prev, &span) && gap > -prev.font_size && gap < prev.font_size * 2.0 {
                if gap >= MIN_WORD_GAP && !boundary_is_spaceless(&prev.text, &span.text) {
                    prev.text.push(' ');
                }
                prev.text.push_str(&span.text);
                prev.bbox = prev.bbox.union(&span.bbox);
                continue;
            }
        }
        merged.push(span);
    }

    let bbox = merged
        .iter()
        .skip(1)
        .fold(merged[0].bbox, |acc, s| acc.union(&s.bbox));
    Line {
        spans: merged,
        bbox,
    }
}

// ---------------------------------------------------------------------------
// Lines -> blocks
// ---------------------------------------------------------------------------

/// Group one page's lines into blocks. A block ends at a vertical gap wider
/// than [`BLOCK_GAP_FACTOR`] times the font size, or where the line style
/// (size or weight) changes.
pub fn group_lines_into_blocks(lines: &[Line], page: usize) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<&Line> = Vec::new();

    for line in lines {
        if let Some(prev) = current.last() {
            let gap = line.baseline() - prev.baseline();
            let breaks = gap > prev.font_size() * BLOCK_GAP_FACTOR
                || (line.font_size() - prev.font_size()).abs() >= BLOCK_SIZE_BREAK
                || line.bold() != prev.bold();
            if breaks {
                blocks.push(build_block(&current, page));
                current.clear();
            }
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(build_block(&current, page));
    }
    blocks
}

/// Block text is the line texts joined by spaces. Size is the mean span
/// size; font and flags are the most frequent among spans.
fn build_block(lines: &[&Line], page: usize) -> TextBlock {
    let spans: Vec<&Span> = lines.iter().flat_map(|l| l.spans.iter()).collect();
    let text = lines
        .iter()
        .map(|l| l.text())
        .collect::<Vec<_>>()
        .join(" ");
    let font_size = spans.iter().map(|s| s.font_size).sum::<f32>() / spans.len() as f32;
    let bbox = lines
        .iter()
        .skip(1)
        .fold(lines[0].bbox, |acc, l| acc.union(&l.bbox));

    TextBlock {
        text,
        font_name: most_frequent(spans.iter().map(|s| s.font_name.clone())).unwrap_or_default(),
        font_size,
        font_flags: most_frequent(spans.iter().map(|s| s.font_flags)).unwrap_or(0),
        bbox,
        page,
    }
}

/// Most frequent item; ties go to the one seen first.
fn most_frequent<T: PartialEq>(items: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }
    let best = counts.iter().map(|(_, n)| *n).max()?;
    counts.into_iter().find(|(_, n)| *n == best).map(|(item, _)| item)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
