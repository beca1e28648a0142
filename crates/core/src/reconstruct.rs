//! Header reconstructor: turns the scattered words of a header zone into
//! ordered column labels.
//!
//! Stacked headers ("Closing" over "Qty") recombine because every word is
//! assigned to an x-interval and each interval's words are read top-down.

use std::collections::BTreeMap;

use log::debug;

use crate::config::PipelineConfig;
use crate::lexicon::COMPOUND_LABELS;
use crate::rows::group_into_rows;
use crate::types::{reindex_columns, Diagnostic, HeaderZone, PositionedWord, ReconstructedHeaderColumn};

/// Column count at which the coverage term of the score saturates.
const EXPECTED_COLUMNS: f64 = 15.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub columns: Vec<ReconstructedHeaderColumn>,
    /// Overall reconstruction score in `[0, 1]`.
    pub score: f64,
    /// One `Diagnostic::Merge` per compound merge performed.
    pub merges: Vec<Diagnostic>,
}

impl Reconstruction {
    fn empty() -> Self {
        Self {
            columns: Vec::new(),
            score: 0.0,
            merges: Vec::new(),
        }
    }
}

pub fn reconstruct_header(zone: &HeaderZone, config: &PipelineConfig) -> Reconstruction {
    if zone.words.is_empty() {
        return Reconstruction::empty();
    }

    let rows = group_into_rows(&zone.words, config.y_proximity);
    let intervals = if rows.len() == 1 && zone.words.len() >= 3 {
        let mut per_word: Vec<(f32, f32)> = zone.words.iter().map(|w| (w.x0, w.x1)).collect();
        per_word.sort_by(|a, b| a.0.total_cmp(&b.0));
        per_word
    } else {
        merge_intervals(&zone.words, config.interval_merge_gap)
    };

    let mut by_interval: BTreeMap<usize, Vec<PositionedWord>> = BTreeMap::new();
    for word in &zone.words {
        by_interval
            .entry(assign_interval(word, &intervals))
            .or_default()
            .push(word.clone());
    }

    let mut columns: Vec<ReconstructedHeaderColumn> = by_interval
        .into_values()
        .map(|words| {
            let score = column_score(words.len());
            ReconstructedHeaderColumn::from_words(words, score)
        })
        .collect();
    reindex_columns(&mut columns);

    let mut merges = Vec::new();
    if config.compound_merge {
        columns = merge_compounds(columns, zone.page, &mut merges);
    }

    let score = overall_score(&columns);
    debug!(
        "page {}: reconstructed {} columns (score {:.2}): {:?}",
        zone.page,
        columns.len(),
        score,
        columns.iter().take(10).map(|c| c.text.as_str()).collect::<Vec<_>>()
    );
    Reconstruction {
        columns,
        score,
        merges,
    }
}

/// Merge overlapping or touching word x-ranges into column intervals.
fn merge_intervals(words: &[PositionedWord], gap: f32) -> Vec<(f32, f32)> {
    let mut pairs: Vec<(f32, f32)> = words.iter().map(|w| (w.x0, w.x1)).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f32, f32)> = Vec::new();
    for (a, b) in pairs {
        match merged.last_mut() {
            Some(last) if a <= last.1 + gap => last.1 = last.1.max(b),
            _ => merged.push((a, b)),
        }
    }
    merged
}

/// Interval with the largest horizontal overlap; the nearest interval
/// midpoint when the word overlaps none.
fn assign_interval(word: &PositionedWord, intervals: &[(f32, f32)]) -> usize {
    let mut best = 0;
    let mut best_overlap = 0.0_f32;
    for (i, (a, b)) in intervals.iter().enumerate() {
        let overlap = (word.x1.min(*b) - word.x0.max(*a)).max(0.0);
        if overlap > best_overlap {
            best_overlap = overlap;
            best = i;
        }
    }
    if best_overlap > 0.0 {
        return best;
    }

    let mid = word.mid_x();
    let mut best_dist = f32::INFINITY;
    for (i, (a, b)) in intervals.iter().enumerate() {
        let dist = (mid - (a + b) / 2.0).abs();
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

/// Many contributing tokens dilute a label: `1 / (1 + 0.1 (n - 1)) + 0.2`,
/// capped at 1.
fn column_score(tokens: usize) -> f64 {
    let n = tokens.max(1) as f64;
    (1.0 / (1.0 + (n - 1.0) * 0.1) + 0.2).min(1.0)
}

fn overall_score(columns: &[ReconstructedHeaderColumn]) -> f64 {
    if columns.is_empty() {
        return 0.0;
    }
    let average = columns.iter().map(|c| c.score).sum::<f64>() / columns.len() as f64;
    let coverage = (columns.len() as f64 / EXPECTED_COLUMNS).min(1.0);
    (average * 0.7 + coverage * 0.3).min(1.0)
}

/// Merge runs of adjacent columns that spell a known compound label,
/// scanning left to right. The first matching table entry wins.
fn merge_compounds(
    columns: Vec<ReconstructedHeaderColumn>,
    page: usize,
    merges: &mut Vec<Diagnostic>,
) -> Vec<ReconstructedHeaderColumn> {
    if columns.len() < 2 {
        return columns;
    }

    let mut out: Vec<ReconstructedHeaderColumn> = Vec::with_capacity(columns.len());
    let mut i = 0;
    while i < columns.len() {
        let matched = COMPOUND_LABELS.iter().find(|(tokens, _)| {
            i + tokens.len() <= columns.len()
                && tokens
                    .iter()
                    .enumerate()
                    .all(|(j, t)| columns[i + j].text.trim().to_lowercase() == *t)
        });

        match matched {
            Some((tokens, label)) => {
                let parts = &columns[i..i + tokens.len()];
                let words: Vec<PositionedWord> =
                    parts.iter().flat_map(|c| c.words.iter().cloned()).collect();
                let x_min = parts.iter().map(|c| c.x_min).fold(f32::INFINITY, f32::min);
                let x_max = parts.iter().map(|c| c.x_max).fold(f32::NEG_INFINITY, f32::max);
                merges.push(Diagnostic::Merge {
                    page,
                    merged: parts.iter().map(|c| c.text.clone()).collect(),
                    into: label.to_string(),
                });
                out.push(ReconstructedHeaderColumn {
                    index: out.len(),
                    text: label.to_string(),
                    x_min,
                    x_max,
                    words,
                    score: 1.0,
                });
                i += tokens.len();
            }
            None => {
                let mut column = columns[i].clone();
                column.index = out.len();
                out.push(column);
                i += 1;
            }
        }
    }
    reindex_columns(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x0: f32, x1: f32, y0: f32) -> PositionedWord {
        PositionedWord::new(text, x0, y0, x1, y0 + 8.0)
    }

    fn zone(words: Vec<PositionedWord>) -> HeaderZone {
        HeaderZone {
            page: 0,
            y_min: words.iter().map(|w| w.y0).fold(f32::INFINITY, f32::min),
            y_max: words.iter().map(|w| w.y1).fold(f32::NEG_INFINITY, f32::max),
            confidence: 0.9,
            reason: String::new(),
            words,
        }
    }

    fn texts(r: &Reconstruction) -> Vec<&str> {
        r.columns.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn single_row_keeps_one_column_per_word() {
        let z = zone(vec![
            word("Qty", 100.0, 120.0, 10.0),
            word("Pack", 50.0, 80.0, 10.0),
            word("Batch", 0.0, 40.0, 10.0),
        ]);
        let r = reconstruct_header(&z, &PipelineConfig::default());
        assert_eq!(texts(&r), vec!["Batch", "Pack", "Qty"]);
        assert!(r.merges.is_empty());
    }

    #[test]
    fn product_name_compound_merges() {
        let z = zone(vec![
            word("Product", 0.0, 40.0, 10.0),
            word("Name", 45.0, 80.0, 10.0),
            word("Qty", 120.0, 140.0, 10.0),
        ]);
        let r = reconstruct_header(&z, &PipelineConfig::default());
        assert_eq!(texts(&r), vec!["Product Name", "Qty"]);
        assert_eq!(r.columns[0].score, 1.0);
        assert_eq!(r.columns[0].x_min, 0.0);
        assert_eq!(r.columns[0].x_max, 80.0);
        assert_eq!(
            r.merges,
            vec![Diagnostic::Merge {
                page: 0,
                merged: vec!["Product".to_string(), "Name".to_string()],
                into: "Product Name".to_string(),
            }]
        );
    }

    #[test]
    fn compound_merge_can_be_disabled() {
        let z = zone(vec![
            word("Product", 0.0, 40.0, 10.0),
            word("Name", 45.0, 80.0, 10.0),
            word("Qty", 120.0, 140.0, 10.0),
        ]);
        let config = PipelineConfig {
            compound_merge: false,
            ..PipelineConfig::default()
        };
        let r = reconstruct_header(&z, &config);
        assert_eq!(texts(&r), vec!["Product", "Name", "Qty"]);
    }

    #[test]
    fn stacked_rows_join_top_down() {
        let z = zone(vec![
            word("Closing", 100.0, 140.0, 10.0),
            word("Qty", 108.0, 125.0, 22.0),
            word("Batch", 0.0, 40.0, 10.0),
            word("No", 5.0, 20.0, 22.0),
        ]);
        let r = reconstruct_header(&z, &PipelineConfig::default());
        assert_eq!(texts(&r), vec!["Batch No", "Closing Qty"]);
        // Two tokens per column: 1 / 1.1 + 0.2 caps at 1.
        assert_eq!(r.columns[0].score, 1.0);
    }

    #[test]
    fn indices_are_dense_after_reconstruction() {
        let z = zone(vec![
            word("Cl", 200.0, 212.0, 10.0),
            word("Qty", 216.0, 236.0, 10.0),
            word("Op", 100.0, 112.0, 10.0),
            word("Item", 0.0, 30.0, 10.0),
        ]);
        let r = reconstruct_header(&z, &PipelineConfig::default());
        assert_eq!(texts(&r), vec!["Item", "Op", "Cl Qty"]);
        let indices: Vec<_> = r.columns.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn overall_score_rewards_column_count() {
        let z = zone(vec![
            word("A1", 0.0, 10.0, 10.0),
            word("B1", 20.0, 30.0, 10.0),
            word("C1", 40.0, 50.0, 10.0),
        ]);
        let r = reconstruct_header(&z, &PipelineConfig::default());
        // Per-column 1.0 each; coverage 3 / 15.
        assert!((r.score - (0.7 + 0.3 * 0.2)).abs() < 1e-9);
    }

    #[test]
    fn empty_zone_reconstructs_nothing() {
        let r = reconstruct_header(&zone(vec![]), &PipelineConfig::default());
        assert!(r.columns.is_empty());
        assert_eq!(r.score, 0.0);
    }

    #[test]
    fn column_score_decays_with_tokens() {
        assert_eq!(column_score(1), 1.0);
        assert!((column_score(5) - (1.0 / 1.4 + 0.2)).abs() < 1e-12);
    }
}
