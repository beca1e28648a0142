//! Column-count repair: splits header columns that straddle several data
//! columns when the header under-counts the table body.

use log::debug;

use crate::types::{reindex_columns, Diagnostic, PositionedWord, ReconstructedHeaderColumn};

/// Split columns whose x-extent overlaps two or more data intervals.
///
/// No-op when the header already has at least as many columns as there are
/// intervals, or when there are no intervals. Returns the repaired columns
/// (densely re-indexed) and one `Diagnostic::Split` per emitted piece.
pub fn split_by_data_columns(
    columns: Vec<ReconstructedHeaderColumn>,
    intervals: &[(f32, f32)],
    page: usize,
) -> (Vec<ReconstructedHeaderColumn>, Vec<Diagnostic>) {
    let mut splits = Vec::new();
    if intervals.is_empty() || columns.is_empty() || columns.len() >= intervals.len() {
        return (columns, splits);
    }

    let mut out: Vec<ReconstructedHeaderColumn> = Vec::with_capacity(intervals.len());
    for column in columns {
        let overlapping: Vec<usize> = intervals
            .iter()
            .enumerate()
            .filter(|(_, (a, b))| !(column.x_max < *a || column.x_min > *b))
            .map(|(i, _)| i)
            .collect();
        if overlapping.len() <= 1 {
            out.push(column);
            continue;
        }

        for idx in overlapping {
            let (a, b) = intervals[idx];
            let words = words_for_interval(&column.words, a, b);
            if words.is_empty() {
                continue;
            }
            let mut piece = ReconstructedHeaderColumn::from_words(words, column.score);
            if piece.text.is_empty() {
                piece.text = column.text.clone();
            }
            splits.push(Diagnostic::Split {
                page,
                from: column.text.clone(),
                into: piece.text.clone(),
                interval: idx,
            });
            out.push(piece);
        }
    }

    reindex_columns(&mut out);
    if !splits.is_empty() {
        debug!("page {}: {} header splits, now {} columns", page, splits.len(), out.len());
    }
    (out, splits)
}

/// Words whose midpoint falls inside `[a, b]`, else the single word nearest
/// the interval midpoint.
fn words_for_interval(words: &[PositionedWord], a: f32, b: f32) -> Vec<PositionedWord> {
    let inside: Vec<PositionedWord> = words
        .iter()
        .filter(|w| (a..=b).contains(&w.mid_x()))
        .cloned()
        .collect();
    if !inside.is_empty() {
        return inside;
    }
    let center = (a + b) / 2.0;
    words
        .iter()
        .min_by(|x, y| {
            (x.mid_x() - center)
                .abs()
                .total_cmp(&(y.mid_x() - center).abs())
        })
        .cloned()
        .into_iter()
        .collect()
}
