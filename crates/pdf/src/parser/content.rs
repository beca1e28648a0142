//! Content-stream interpretation: text runs and ruling segments.
//!
//! A simplified PDF rendering state machine. Text operators produce
//! [`TextSpan`]s positioned in default user space, path operators produce
//! [`Segment`]s once the path is painted. Glyph metrics are not consulted;
//! widths are approximated from the font size.
//!
//! ```text
//! content ops  ->  (TextSpan[], Segment[])
//!   (per page)       interpret_page
//! ```

use super::backend::{get_number_from_value, ContentOp, PageId, PdfBackend, PdfValue};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single run of text at a baseline position, in user space (y grows up).
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    pub baseline: f32,
    pub width: f32,
    pub font_size: f32,
}

/// A painted straight segment, in user space (y grows up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// Everything read from one page's content stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub spans: Vec<TextSpan>,
    pub segments: Vec<Segment>,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Approximate character width as a fraction of font size.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Kerning displacement, as a fraction of one character width, that counts
/// as a word gap inside a `TJ` array.
const KERN_GAP_RATIO: f32 = 0.3;

/// The identity 2x3 matrix: [a, b, c, d, e, f].
const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// Matrix helpers
// ---------------------------------------------------------------------------

/// `m1 x m2` in PDF row-vector convention.
fn multiply(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn apply(m: &[f32; 6], x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn matrix_operands(operands: &[PdfValue]) -> Option<[f32; 6]> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = [0.0; 6];
    for (slot, value) in m.iter_mut().zip(operands) {
        *slot = get_number_from_value(value)?;
    }
    Some(m)
}

// ---------------------------------------------------------------------------
// Text state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    /// Resource key of the current font (e.g. `b"F1"`).
    font_key: Vec<u8>,
    /// Current font size in text-space units.
    font_size: f32,
    text_matrix: [f32; 6],
    /// Text line matrix, set by BT and updated by Td/TD/T*/Tm.
    line_matrix: [f32; 6],
    /// Horizontal scaling factor (percent / 100).
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn char_width(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        let (x, y) = apply(&self.line_matrix, tx, ty);
        self.line_matrix[4] = x;
        self.line_matrix[5] = y;
        self.text_matrix = self.line_matrix;
    }

    /// Advance past `text` and return the text-space displacement.
    fn advance_after_show(&mut self, text: &str) -> f32 {
        let mut total_dx = 0.0;
        for ch in text.chars() {
            total_dx += self.char_width() + self.char_spacing;
            if ch == ' ' {
                total_dx += self.word_spacing;
            }
        }
        self.advance_x(total_dx);
        total_dx
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

struct Interpreter<'a> {
    backend: &'a dyn PdfBackend,
    page_id: PageId,
    ctm: [f32; 6],
    stack: Vec<[f32; 6]>,
    text: TextState,
    current_point: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
    pending: Vec<Segment>,
    out: PageContent,
}

impl<'a> Interpreter<'a> {
    fn new(backend: &'a dyn PdfBackend, page_id: PageId) -> Self {
        Self {
            backend,
            page_id,
            ctm: IDENTITY_MATRIX,
            stack: Vec::new(),
            text: TextState::default(),
            current_point: None,
            subpath_start: None,
            pending: Vec::new(),
            out: PageContent::default(),
        }
    }

    fn run(mut self, ops: &[ContentOp]) -> PageContent {
        for op in ops {
            self.step(op);
        }
        self.out
    }

    fn step(&mut self, op: &ContentOp) {
        match op.operator.as_str() {
            // -- Graphics state -----------------------------------------
            "q" => self.stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operands(&op.operands) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }

            // -- Path construction --------------------------------------
            "m" => {
                if let Some([x, y]) = op.numbers::<2>() {
                    let p = apply(&self.ctm, x, y);
                    self.current_point = Some(p);
                    self.subpath_start = Some(p);
                }
            }
            "l" => {
                if let Some([x, y]) = op.numbers::<2>() {
                    let p = apply(&self.ctm, x, y);
                    if let Some(from) = self.current_point {
                        self.push_segment(from, p);
                    }
                    self.current_point = Some(p);
                }
            }
            "h" => {
                if let (Some(from), Some(to)) = (self.current_point, self.subpath_start) {
                    if from != to {
                        self.push_segment(from, to);
                    }
                    self.current_point = Some(to);
                }
            }
            "re" => {
                if let Some([x, y, w, h]) = op.numbers::<4>() {
                    self.push_rect(x, y, w, h);
                }
            }

            // -- Path painting ------------------------------------------
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                self.out.segments.append(&mut self.pending);
                self.end_path();
            }
            "n" => {
                self.pending.clear();
                self.end_path();
            }

            // -- Text object delimiters ---------------------------------
            "BT" => {
                self.text.text_matrix = IDENTITY_MATRIX;
                self.text.line_matrix = IDENTITY_MATRIX;
            }
            "ET" => {}

            // -- Text state ---------------------------------------------
            "Tf" => {
                if let (Some(PdfValue::Name(key)), Some(size)) = (
                    op.operands.first(),
                    op.operands.get(1).and_then(get_number_from_value),
                ) {
                    self.text.font_key = key.clone();
                    self.text.font_size = size;
                }
            }
            "Tm" => {
                if let Some(m) = matrix_operands(&op.operands) {
                    self.text.text_matrix = m;
                    self.text.line_matrix = m;
                }
            }
            "Td" => {
                if let Some([tx, ty]) = op.numbers::<2>() {
                    self.text.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = op.numbers::<2>() {
                    self.text.leading = -ty;
                    self.text.translate_line(tx, ty);
                }
            }
            "T*" => {
                let leading = self.text.leading;
                self.text.translate_line(0.0, -leading);
            }
            "TL" => {
                if let Some([v]) = op.numbers::<1>() {
                    self.text.leading = v;
                }
            }
            "Tc" => {
                if let Some([v]) = op.numbers::<1>() {
                    self.text.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some([v]) = op.numbers::<1>() {
                    self.text.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some([v]) = op.numbers::<1>() {
                    self.text.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some([v]) = op.numbers::<1>() {
                    self.text.text_rise = v;
                }
            }

            // -- Text showing -------------------------------------------
            "Tj" => {
                if let Some(operand) = op.operands.first() {
                    self.show_string(operand);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    self.show_array(items);
                }
            }
            "'" => {
                let leading = self.text.leading;
                self.text.translate_line(0.0, -leading);
                if let Some(operand) = op.operands.first() {
                    self.show_string(operand);
                }
            }
            "\"" => {
                if op.operands.len() >= 3 {
                    if let Some(aw) = get_number_from_value(&op.operands[0]) {
                        self.text.word_spacing = aw;
                    }
                    if let Some(ac) = get_number_from_value(&op.operands[1]) {
                        self.text.char_spacing = ac;
                    }
                    let leading = self.text.leading;
                    self.text.translate_line(0.0, -leading);
                    self.show_string(&op.operands[2]);
                }
            }

            _ => {}
        }
    }

    fn end_path(&mut self) {
        self.current_point = None;
        self.subpath_start = None;
    }

    fn push_segment(&mut self, from: (f32, f32), to: (f32, f32)) {
        self.pending.push(Segment {
            x0: from.0,
            y0: from.1,
            x1: to.0,
            y1: to.1,
        });
    }

    /// A wide rectangle rules along its bottom edge, a tall one along its
    /// left edge.
    fn push_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let left = x.min(x + w);
        let bottom = y.min(y + h);
        let (from, to) = if w.abs() > h.abs() {
            ((left, bottom), (left + w.abs(), bottom))
        } else {
            ((left, bottom), (left, bottom + h.abs()))
        };
        let from = apply(&self.ctm, from.0, from.1);
        let to = apply(&self.ctm, to.0, to.1);
        self.push_segment(from, to);
        let origin = apply(&self.ctm, x, y);
        self.current_point = Some(origin);
        self.subpath_start = Some(origin);
    }

    fn decode(&self, operand: &PdfValue) -> String {
        match operand {
            PdfValue::Str(bytes) => {
                let decoded = self
                    .backend
                    .decode_text(self.page_id, &self.text.font_key, bytes);
                if decoded.is_empty() {
                    super::backend::decode_text_simple(bytes)
                } else {
                    decoded
                }
            }
            _ => String::new(),
        }
    }

    /// Text rendering matrix origin and scale for the current text position.
    fn rendering_matrix(&self) -> [f32; 6] {
        multiply(&self.text.text_matrix, &self.ctm)
    }

    fn emit(&mut self, text: &str, text_space_width: f32, matrix: [f32; 6]) {
        let trimmed = text.trim_end();
        if trimmed.trim_start().is_empty() {
            return;
        }
        let (x, baseline) = apply(&matrix, 0.0, self.text.text_rise);
        let x_scale = (matrix[0].powi(2) + matrix[1].powi(2)).sqrt();
        let y_scale = (matrix[2].powi(2) + matrix[3].powi(2)).sqrt();
        let kept = trimmed.chars().count() as f32 / text.chars().count().max(1) as f32;
        self.out.spans.push(TextSpan {
            text: trimmed.to_string(),
            x,
            baseline,
            width: text_space_width * kept * x_scale,
            font_size: (self.text.font_size * y_scale).abs(),
        });
    }

    fn show_string(&mut self, operand: &PdfValue) {
        let text = self.decode(operand);
        if text.is_empty() {
            return;
        }
        let matrix = self.rendering_matrix();
        let width = self.text.advance_after_show(&text);
        self.emit(&text, width, matrix);
    }

    /// Contiguous strings form one span; a large kerning gap becomes a space.
    fn show_array(&mut self, items: &[PdfValue]) {
        let mut buf = String::new();
        let mut start: Option<[f32; 6]> = None;
        let mut width = 0.0;

        for item in items {
            match item {
                PdfValue::Str(_) => {
                    let fragment = self.decode(item);
                    if start.is_none() {
                        start = Some(self.rendering_matrix());
                    }
                    buf.push_str(&fragment);
                    width += self.text.advance_after_show(&fragment);
                }
                other => {
                    if let Some(adj) = get_number_from_value(other) {
                        let dx = -adj / 1000.0 * self.text.font_size * self.text.horiz_scale;
                        if dx > self.text.char_width() * KERN_GAP_RATIO && !buf.is_empty() {
                            buf.push(' ');
                        }
                        if start.is_some() {
                            width += dx;
                        }
                        self.text.advance_x(dx);
                    }
                }
            }
        }

        if let Some(matrix) = start {
            self.emit(&buf, width, matrix);
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Walk a single page's content stream.
///
/// | Operator | Action |
/// |----------|--------|
/// | `q` `Q` `cm` | Save, restore, concatenate the CTM |
/// | `m` `l` `h` `re` | Build path segments |
/// | `S` `s` `f` `F` `f*` `B` `B*` `b` `b*` | Paint: keep pending segments |
/// | `n` | End path without painting: drop pending segments |
/// | `BT` `ET` | Text object delimiters |
/// | `Tf` `Tm` `Td` `TD` `T*` `TL` | Font and text position |
/// | `Tc` `Tw` `Tz` `Ts` | Spacing, scaling and rise |
/// | `Tj` `TJ` `'` `"` | Show text |
pub fn interpret_page(backend: &dyn PdfBackend, page_id: PageId) -> Result<PageContent, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    Ok(Interpreter::new(backend, page_id).run(&ops))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
