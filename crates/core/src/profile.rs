//! Column-data profiling: infers what kind of values sit under each header
//! column and scores how well that agrees with the header's canonical name.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;

use crate::config::PipelineConfig;
use crate::data_columns::words_below_zone;
use crate::lexicon::{expected_type, is_domain_priority};
use crate::rows::compare_reading_order;
use crate::types::{ColumnDataProfile, HeaderZone, PositionedWord, ValueType};

/// Sample values kept on each profile for diagnostics.
const KEPT_SAMPLES: usize = 5;

/// Score reported when there is no data to judge.
const NEUTRAL_SCORE: f64 = 0.5;

/// Longest value still treated as an alphanumeric code.
const MAX_CODE_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfileReport {
    pub profiles: Vec<ColumnDataProfile>,
    /// Mean validation score in `[0, 1]`.
    pub score: f64,
    /// Columns whose values clearly contradict their header.
    pub type_mismatches: usize,
}

impl ColumnProfileReport {
    fn neutral() -> Self {
        Self {
            profiles: Vec::new(),
            score: NEUTRAL_SCORE,
            type_mismatches: 0,
        }
    }
}

pub trait ColumnProfiler: Send + Sync {
    /// Profile the values below `zone` for the given column intervals, with
    /// `headers` holding the canonical name of each column.
    fn profile(
        &self,
        words: &[PositionedWord],
        zone: &HeaderZone,
        intervals: &[(f32, f32)],
        headers: &[String],
    ) -> ColumnProfileReport;
}

/// Default profiler: samples cells by x-position and infers value types with
/// fixed patterns.
#[derive(Debug, Clone)]
pub struct TypeProfiler {
    word_sample: usize,
    cells_per_column: usize,
    domain_boost: f64,
}

impl TypeProfiler {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            word_sample: config.profile_word_sample,
            cells_per_column: config.sample_cells_per_column,
            domain_boost: config.domain_boost,
        }
    }
}

impl ColumnProfiler for TypeProfiler {
    fn profile(
        &self,
        words: &[PositionedWord],
        zone: &HeaderZone,
        intervals: &[(f32, f32)],
        headers: &[String],
    ) -> ColumnProfileReport {
        let mut below: Vec<&PositionedWord> = words_below_zone(words, zone).collect();
        if below.is_empty() || intervals.is_empty() {
            return ColumnProfileReport::neutral();
        }
        below.sort_by(|a, b| compare_reading_order(a, b));
        below.truncate(self.word_sample);

        let mut samples: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for word in below {
            let cells = samples.entry(column_for(word.mid_x(), intervals)).or_default();
            if cells.len() < self.cells_per_column {
                cells.push(word.text.clone());
            }
        }

        // Columns up to the right-most one that received any value.
        let last = samples.keys().next_back().copied().unwrap_or(0);
        let mut profiles = Vec::with_capacity(last + 1);
        let mut mismatches = 0;
        for column in 0..=last {
            let cells = samples.remove(&column).unwrap_or_default();
            let header = headers.get(column).map(String::as_str);
            let (profile, mismatch) = self.profile_column(column, cells, header);
            if mismatch {
                mismatches += 1;
            }
            profiles.push(profile);
        }

        let score = profiles.iter().map(|p| p.validation_score).sum::<f64>() / profiles.len() as f64;
        ColumnProfileReport {
            profiles,
            score: score.min(1.0),
            type_mismatches: mismatches,
        }
    }
}

impl TypeProfiler {
    fn profile_column(
        &self,
        column: usize,
        cells: Vec<String>,
        header: Option<&str>,
    ) -> (ColumnDataProfile, bool) {
        if cells.is_empty() {
            return (
                ColumnDataProfile {
                    column,
                    samples: Vec::new(),
                    value_type: ValueType::Unknown,
                    match_ratio: 0.0,
                    validation_score: NEUTRAL_SCORE,
                },
                false,
            );
        }

        let (value_type, match_ratio) = dominant_type(&cells);
        let expected = header.map_or(ValueType::Unknown, expected_type);
        let (mut score, mismatch) = match (expected, value_type) {
            (ValueType::Unknown, _) => (0.5 + match_ratio * 0.3, false),
            (e, v) if e == v => (0.7 + match_ratio * 0.3, false),
            (ValueType::Decimal, ValueType::Integer) => (0.6, false),
            (ValueType::Integer, ValueType::Decimal) => (0.5, false),
            _ => (0.3, true),
        };
        if header.is_some_and(is_domain_priority) {
            score = (score + self.domain_boost).min(1.0);
        }

        let mut samples = cells;
        samples.truncate(KEPT_SAMPLES);
        (
            ColumnDataProfile {
                column,
                samples,
                value_type,
                match_ratio,
                validation_score: score,
            },
            mismatch,
        )
    }
}

/// Interval containing `x`, else the interval with the nearest edge.
fn column_for(x: f32, intervals: &[(f32, f32)]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (i, (a, b)) in intervals.iter().enumerate() {
        if (*a..=*b).contains(&x) {
            return i;
        }
        let dist = (x - a).abs().min((x - b).abs());
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

/// Most common value type (first seen wins ties) and its share.
fn dominant_type(cells: &[String]) -> (ValueType, f64) {
    let mut counts: HashMap<ValueType, usize> = HashMap::new();
    let mut order: Vec<ValueType> = Vec::new();
    for cell in cells {
        let t = infer_value_type(cell);
        let count = counts.entry(t).or_insert(0);
        if *count == 0 {
            order.push(t);
        }
        *count += 1;
    }
    let mut dominant = order[0];
    for t in &order {
        if counts[t] > counts[&dominant] {
            dominant = *t;
        }
    }
    (dominant, counts[&dominant] as f64 / cells.len() as f64)
}

fn patterns() -> &'static [(ValueType, Regex)] {
    static RE: OnceLock<Vec<(ValueType, Regex)>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            (ValueType::Date, r"^\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}$"),
            (ValueType::Date, r"^\d{4}[/\-.]\d{1,2}[/\-.]\d{1,2}$"),
            (ValueType::Decimal, r"^-?\d+\.\d+$"),
            (ValueType::Decimal, r"^-?\d+,\d{2}$"),
            (ValueType::Decimal, r"^-?\d+\.\d*$"),
            (ValueType::Integer, r"^-?\d+$"),
        ]
        .into_iter()
        .map(|(t, p)| (t, Regex::new(p).expect("valid regex")))
        .collect()
    })
}

fn code_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9\-/]+$").expect("valid regex"))
}

/// Shape of a single cell value. Empty values are text.
pub fn infer_value_type(value: &str) -> ValueType {
    let v = value.trim();
    if v.is_empty() {
        return ValueType::Text;
    }
    if let Some((t, _)) = patterns().iter().find(|(_, re)| re.is_match(v)) {
        return *t;
    }
    if code_pattern().is_match(v) && v.chars().count() <= MAX_CODE_CHARS {
        return ValueType::Alphanumeric;
    }
    ValueType::Text
}
