//! Text-row grouping and token-shape helpers shared by the locator, the
//! data-column estimator and the reconstructor.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::PositionedWord;

/// One visual line of text: words sharing (roughly) the same top edge,
/// ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRow {
    pub words: Vec<PositionedWord>,
}

impl TextRow {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Mean vertical midpoint of the row's words.
    pub fn y_center(&self) -> f32 {
        if self.words.is_empty() {
            return 0.0;
        }
        self.words.iter().map(|w| w.mid_y()).sum::<f32>() / self.words.len() as f32
    }

    pub fn y_min(&self) -> f32 {
        self.words.iter().map(|w| w.y0).fold(f32::INFINITY, f32::min)
    }

    pub fn y_max(&self) -> f32 {
        self.words.iter().map(|w| w.y1).fold(f32::NEG_INFINITY, f32::max)
    }

    /// Space-joined trimmed word texts.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn lower_text(&self) -> String {
        self.text().to_lowercase()
    }

    /// Lowercased, trimmed word texts.
    pub fn tokens(&self) -> Vec<String> {
        self.words.iter().map(|w| w.text.trim().to_lowercase()).collect()
    }

    pub fn numeric_count(&self) -> usize {
        self.words.iter().filter(|w| is_numeric_token(&w.text)).count()
    }

    pub fn numeric_ratio(&self) -> f64 {
        if self.words.is_empty() {
            return 0.0;
        }
        self.numeric_count() as f64 / self.words.len() as f64
    }

    /// Mean font size; words with no font size count as zero.
    pub fn average_font_size(&self) -> f32 {
        if self.words.is_empty() {
            return 0.0;
        }
        self.words.iter().map(|w| w.font_size).sum::<f32>() / self.words.len() as f32
    }
}

/// Group words into rows by vertical proximity.
///
/// Words are visited in (y0, x0) order. A word joins the current row when its
/// `y0` lies within `tolerance` of the `y0` of the row's first word; otherwise
/// it starts a new row. Rows come back top-down, each sorted by `x0`.
pub fn group_into_rows(words: &[PositionedWord], tolerance: f32) -> Vec<TextRow> {
    if words.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<&PositionedWord> = words.iter().collect();
    sorted.sort_by(|a, b| compare_reading_order(a, b));

    let mut rows: Vec<TextRow> = Vec::new();
    let mut current: Vec<PositionedWord> = Vec::new();
    let mut reference_y = sorted[0].y0;

    for word in sorted {
        if !current.is_empty() && (word.y0 - reference_y).abs() > tolerance {
            rows.push(finish_row(std::mem::take(&mut current)));
        }
        if current.is_empty() {
            reference_y = word.y0;
        }
        current.push(word.clone());
    }
    if !current.is_empty() {
        rows.push(finish_row(current));
    }
    rows
}

fn finish_row(mut words: Vec<PositionedWord>) -> TextRow {
    words.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal));
    TextRow { words }
}

/// Order by `y0`, then `x0`.
pub fn compare_reading_order(a: &PositionedWord, b: &PositionedWord) -> Ordering {
    a.y0.partial_cmp(&b.y0)
        .unwrap_or(Ordering::Equal)
        .then(a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
}

/// Distinct integer `y0` keys of a word set, ascending.
pub fn distinct_y_keys(words: &[PositionedWord]) -> Vec<i64> {
    let mut keys: Vec<i64> = words.iter().map(|w| w.y0.floor() as i64).collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// Median of positive font sizes (upper median), or 0 when none are known.
pub fn median_font_size(words: &[PositionedWord]) -> f32 {
    let mut sizes: Vec<f32> = words
        .iter()
        .map(|w| w.font_size)
        .filter(|s| *s > 0.0)
        .collect();
    if sizes.is_empty() {
        return 0.0;
    }
    sizes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sizes[sizes.len() / 2]
}

/// Upper median of a slice of gaps.
pub fn upper_median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted[sorted.len() / 2]
}

// ---------------------------------------------------------------------------
// Token shapes
// ---------------------------------------------------------------------------

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+\.?\d*$").expect("valid regex"))
}

fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}$").expect("valid regex"))
}

fn date_range_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}\s*[-–]\s*\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}")
            .expect("valid regex")
    })
}

/// A number (thousands separators allowed) or a day-month-year date.
pub fn is_numeric_token(text: &str) -> bool {
    let t = text.trim().replace(',', "");
    number_pattern().is_match(&t) || date_pattern().is_match(&t)
}

// ---------------------------------------------------------------------------
// Row classification
// ---------------------------------------------------------------------------

/// "Page 1 of 3", "Page No. 2".
pub fn is_page_row(row: &TextRow) -> bool {
    let lower = row.lower_text();
    lower.contains("page") && (lower.contains("of") || lower.contains("no."))
}

/// Grand total, subtotal and other total-like lines, judged on text alone.
pub fn is_total_row(row: &TextRow) -> bool {
    if row.is_empty() {
        return true;
    }
    let lower = row.lower_text();
    if lower.contains("grand") && lower.contains("total") {
        return true;
    }
    if matches!(
        lower.trim(),
        "total" | "grand total" | "sub total" | "subtotal"
    ) {
        return true;
    }
    if row.len() <= 3 {
        let tokens = row.tokens();
        if tokens.iter().any(|t| t == "total" || t == "grand") {
            return true;
        }
    }
    false
}

/// A total row, or a row that is at least half numeric (summary or data).
pub fn is_footer_or_total_row(row: &TextRow) -> bool {
    if is_total_row(row) {
        return true;
    }
    row.len() >= 3 && row.numeric_ratio() >= 0.5
}

/// Company names, report titles, date ranges and letter-spaced banners.
pub fn is_title_row(row: &TextRow) -> bool {
    if row.len() < 4 {
        return false;
    }
    let text = row.text();
    let lower = text.to_lowercase();
    if lower.contains("analysis") && (lower.contains("stock") || lower.contains("sales")) {
        return true;
    }
    if lower.contains("ltd.") || lower.contains("limited") || lower.contains("pvt.") {
        return true;
    }
    if date_range_pattern().is_match(&text) {
        return true;
    }
    row.len() >= 8 && row.words.iter().all(|w| w.text.trim().chars().count() == 1)
}
