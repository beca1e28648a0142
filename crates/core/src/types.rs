//! Shared value types for the header inference pipeline.
//!
//! Geometry uses a top-left origin: `y` grows down the page, so a smaller
//! `y0` means "higher up". All types are plain values; derived geometry is
//! computed on read and never cached.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Extractor input
// ---------------------------------------------------------------------------

/// A single word with its bounding box, as produced by the PDF extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedWord {
    pub text: String,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub font_size: f32,
    pub page: usize,
}

impl PositionedWord {
    pub fn new(text: impl Into<String>, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            text: text.into(),
            x0,
            y0,
            x1,
            y1,
            font_size: 0.0,
            page: 0,
        }
    }

    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn on_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn mid_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn mid_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// A straight segment from the page's vector graphics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawnLine {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl DrawnLine {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// A segment is horizontal when it spans more x than y.
    pub fn is_horizontal(&self) -> bool {
        (self.y1 - self.y0).abs() < (self.x1 - self.x0).abs()
    }

    pub fn is_vertical(&self) -> bool {
        !self.is_horizontal()
    }

    /// Vertical midpoint of the segment.
    pub fn y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }
}

/// Everything the extractor yields for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// Zero-based page index.
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub words: Vec<PositionedWord>,
    pub lines: Vec<DrawnLine>,
}

impl PageLayout {
    pub fn horizontal_lines(&self) -> impl Iterator<Item = &DrawnLine> {
        self.lines.iter().filter(|l| l.is_horizontal())
    }
}

/// Extractor output for a whole document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentLayout {
    pub pages: Vec<PageLayout>,
}

impl DocumentLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn word_count(&self) -> usize {
        self.pages.iter().map(|p| p.words.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Intermediate stage values
// ---------------------------------------------------------------------------

/// The page region hypothesised to hold the column headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderZone {
    pub page: usize,
    pub y_min: f32,
    pub y_max: f32,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub reason: String,
    pub words: Vec<PositionedWord>,
}

impl HeaderZone {
    pub fn summary(&self) -> ZoneSummary {
        ZoneSummary {
            page: self.page,
            y_min: self.y_min,
            y_max: self.y_max,
            confidence: self.confidence,
            reason: self.reason.clone(),
        }
    }
}

/// One reconstructed column header, possibly assembled from several words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructedHeaderColumn {
    pub index: usize,
    pub text: String,
    pub x_min: f32,
    pub x_max: f32,
    pub words: Vec<PositionedWord>,
    pub score: f64,
}

impl ReconstructedHeaderColumn {
    /// Build a column from its contributing words. The text joins words in
    /// reading order (row, then x) with single spaces.
    pub fn from_words(mut words: Vec<PositionedWord>, score: f64) -> Self {
        words.sort_by(|a, b| {
            a.y0.partial_cmp(&b.y0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal))
        });
        let text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();
        let x_min = words.iter().map(|w| w.x0).fold(f32::INFINITY, f32::min);
        let x_max = words.iter().map(|w| w.x1).fold(f32::NEG_INFINITY, f32::max);
        Self {
            index: 0,
            text,
            x_min,
            x_max,
            words,
            score,
        }
    }

    pub fn mid_x(&self) -> f32 {
        (self.x_min + self.x_max) / 2.0
    }
}

/// Re-order columns left-to-right by `x_min` and assign dense indices.
///
/// Must run after every structural change (merge, split, filter).
pub fn reindex_columns(columns: &mut [ReconstructedHeaderColumn]) {
    columns.sort_by(|a, b| a.x_min.total_cmp(&b.x_min));
    for (i, col) in columns.iter_mut().enumerate() {
        col.index = i;
    }
}

/// Value shape of a data column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Date,
    Decimal,
    Integer,
    Alphanumeric,
    Text,
    Unknown,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::Date => "date",
            ValueType::Decimal => "decimal",
            ValueType::Integer => "integer",
            ValueType::Alphanumeric => "alphanumeric",
            ValueType::Text => "text",
            ValueType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Inferred profile of the values under one header column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDataProfile {
    pub column: usize,
    pub samples: Vec<String>,
    pub value_type: ValueType,
    pub match_ratio: f64,
    pub validation_score: f64,
}

/// The five component scores of a candidate, each within `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub visual: f64,
    pub reconstruction: f64,
    pub semantic: f64,
    pub data_validation: f64,
    pub consensus: f64,
}

/// A header hypothesis passed between the reconstruction, gate and
/// consensus stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderCandidate {
    pub headers: Vec<String>,
    pub scores: ComponentScores,
    pub confidence: f64,
    pub source_pages: Vec<usize>,
    /// Diagnostics only. Nothing reads this when scoring.
    pub diagnostics: Vec<Diagnostic>,
}

impl HeaderCandidate {
    pub fn first_page(&self) -> usize {
        self.source_pages.first().copied().unwrap_or(usize::MAX)
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Where the locator put the header zone on one page, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub page: usize,
    pub y_min: f32,
    pub y_max: f32,
    pub confidence: f64,
    pub reason: String,
}

/// Why a page's candidate was discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    ReconstructEmpty,
    AllFilteredNoise,
    TooFewColumns { columns: usize },
    ColumnCountMismatch { header: usize, data: usize, diff: usize },
    EvidenceBelowThreshold { evidence: f64, threshold: f64 },
    FooterLikeHeaders { headers: Vec<String> },
}

impl RejectReason {
    /// Stable snake_case code of the reason.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::ReconstructEmpty => "reconstruct_empty",
            RejectReason::AllFilteredNoise => "all_filtered_noise",
            RejectReason::TooFewColumns { .. } => "too_few_columns",
            RejectReason::ColumnCountMismatch { .. } => "column_count_mismatch",
            RejectReason::EvidenceBelowThreshold { .. } => "evidence_below_threshold",
            RejectReason::FooterLikeHeaders { .. } => "footer_like_headers",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TooFewColumns { columns } => write!(f, "{}: {}", self.code(), columns),
            RejectReason::ColumnCountMismatch { header, data, diff } => write!(
                f,
                "{}: header={} data={} diff={}",
                self.code(),
                header,
                data,
                diff
            ),
            RejectReason::EvidenceBelowThreshold {
                evidence,
                threshold,
            } => write!(f, "{}: {:.2} < {:.2}", self.code(), evidence, threshold),
            _ => write!(f, "{}", self.code()),
        }
    }
}

/// Evidence breakdown computed by the gate for one candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceReport {
    pub column_gate: String,
    pub keyword: f64,
    pub column_alignment: f64,
    pub data_validation: f64,
    pub lexical_purity: f64,
    pub multi_page_presence: f64,
    pub total: f64,
    pub penalties: PenaltyBreakdown,
    pub adjusted_confidence: f64,
}

/// Penalties subtracted from the combined confidence of an accepted candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltyBreakdown {
    pub merged_column: f64,
    pub noise_words: f64,
    pub type_mismatch: f64,
    pub title_zone: f64,
}

impl PenaltyBreakdown {
    pub fn total(&self) -> f64 {
        self.merged_column + self.noise_words + self.type_mismatch + self.title_zone
    }
}

/// One structured diagnostic record. Serialised with a `kind` tag so the
/// debug dump stays inspectable as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    ZoneDetected(ZoneSummary),
    DataColumns {
        page: usize,
        count: usize,
    },
    Merge {
        page: usize,
        merged: Vec<String>,
        into: String,
    },
    Split {
        page: usize,
        from: String,
        into: String,
        interval: usize,
    },
    NoiseRemoved {
        page: usize,
        text: String,
    },
    /// Reconstructed texts and the canonical names they normalised to.
    Headers {
        page: usize,
        raw: Vec<String>,
        canonical: Vec<String>,
    },
    Evidence {
        page: usize,
        report: EvidenceReport,
    },
    Rejected {
        page: usize,
        reason: RejectReason,
    },
    Consensus {
        voted: Vec<String>,
        per_page: Vec<Vec<String>>,
    },
    Empty {
        reason: String,
    },
    Failed {
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Terminal result
// ---------------------------------------------------------------------------

/// Summary of one accepted per-page candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub page: usize,
    pub headers: Vec<String>,
    pub confidence: f64,
    pub data_columns: usize,
}

/// Final outcome for one document. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub source: String,
    pub headers: Vec<String>,
    pub confidence: f64,
    pub breakdown: ComponentScores,
    pub candidates: Vec<CandidateSummary>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExtractionResult {
    /// A zero-confidence result with no headers.
    pub fn empty(source: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            source: source.into(),
            headers: Vec::new(),
            confidence: 0.0,
            breakdown: ComponentScores::default(),
            candidates: Vec::new(),
            diagnostics,
        }
    }

    /// A zero-confidence result recording a document-level failure.
    pub fn failed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::empty(
            source,
            vec![Diagnostic::Failed {
                reason: reason.into(),
            }],
        )
    }

    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty() && self.confidence > 0.0
    }

    pub fn zones(&self) -> impl Iterator<Item = &ZoneSummary> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::ZoneDetected(z) => Some(z),
            _ => None,
        })
    }

    pub fn rejections(&self) -> impl Iterator<Item = (usize, &RejectReason)> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::Rejected { page, reason } => Some((*page, reason)),
            _ => None,
        })
    }

    pub fn failure(&self) -> Option<&str> {
        self.diagnostics.iter().find_map(|d| match d {
            Diagnostic::Failed { reason } => Some(reason.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(text: &str, x_min: f32, x_max: f32) -> ReconstructedHeaderColumn {
        ReconstructedHeaderColumn::from_words(
            vec![PositionedWord::new(text, x_min, 10.0, x_max, 20.0)],
            1.0,
        )
    }

    #[test]
    fn word_derived_geometry() {
        let w = PositionedWord::new("Qty", 10.0, 20.0, 30.0, 28.0);
        assert_eq!(w.mid_x(), 20.0);
        assert_eq!(w.mid_y(), 24.0);
        assert_eq!(w.width(), 20.0);
        assert_eq!(w.height(), 8.0);
    }

    #[test]
    fn line_orientation() {
        assert!(DrawnLine::new(0.0, 100.0, 200.0, 100.5).is_horizontal());
        assert!(DrawnLine::new(50.0, 0.0, 50.0, 300.0).is_vertical());
    }

    #[test]
    fn column_text_stacks_rows_top_down() {
        let col = ReconstructedHeaderColumn::from_words(
            vec![
                PositionedWord::new("Qty", 10.0, 22.0, 30.0, 30.0),
                PositionedWord::new("Closing", 8.0, 10.0, 40.0, 18.0),
            ],
            1.0,
        );
        assert_eq!(col.text, "Closing Qty");
        assert_eq!(col.x_min, 8.0);
        assert_eq!(col.x_max, 40.0);
    }

    #[test]
    fn reindex_orders_by_x_min() {
        let mut cols = vec![column("C", 90.0, 100.0), column("A", 0.0, 10.0), column("B", 40.0, 50.0)];
        reindex_columns(&mut cols);
        let texts: Vec<_> = cols.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
        let indices: Vec<_> = cols.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn reject_reason_display_carries_code() {
        let reason = RejectReason::ColumnCountMismatch {
            header: 10,
            data: 12,
            diff: 2,
        };
        assert_eq!(reason.to_string(), "column_count_mismatch: header=10 data=12 diff=2");
        assert_eq!(RejectReason::FooterLikeHeaders { headers: vec![] }.code(), "footer_like_headers");
    }

    #[test]
    fn diagnostics_serialise_with_kind_tag() {
        let diag = Diagnostic::Rejected {
            page: 1,
            reason: RejectReason::TooFewColumns { columns: 2 },
        };
        let value = serde_json::to_value(&diag).unwrap();
        assert_eq!(value["kind"], "rejected");
        assert_eq!(value["page"], 1);

        let back: Diagnostic = serde_json::from_value(value).unwrap();
        assert_eq!(back, diag);
    }

    #[test]
    fn failed_result_is_empty() {
        let result = ExtractionResult::failed("broken.pdf", "PDF parsing error: eof");
        assert!(result.headers.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.failure(), Some("PDF parsing error: eof"));
        assert!(!result.has_headers());
    }
}
