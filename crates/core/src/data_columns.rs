//! Data-column estimator: how many columns does the table body below a
//! header zone have?
//!
//! The estimate is used twice: by the evidence gate to sanity-check the
//! header's column count, and by the repair stage, which partitions the
//! sampled word midpoints into that many x-intervals.

use std::collections::HashMap;

use log::debug;

use crate::config::PipelineConfig;
use crate::rows::{group_into_rows, is_page_row, upper_median, TextRow};
use crate::types::{HeaderZone, PositionedWord};

/// Rows estimating more columns than this are treated as noise.
const MAX_COLUMNS_PER_ROW: usize = 50;

/// Rows with at least this many words count as "dense".
const DENSE_ROW_WORDS: usize = 5;

/// Minimum gap (points) between word midpoints that separates two columns.
const MIN_COLUMN_GAP: f32 = 3.0;

/// Outcome of the estimate: the column count (0 when nothing usable was
/// found) and the sampled rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataColumnEstimate {
    pub count: usize,
    pub rows: Vec<TextRow>,
}

/// Words strictly below the zone on its page.
pub fn words_below_zone<'a>(
    words: &'a [PositionedWord],
    zone: &HeaderZone,
) -> impl Iterator<Item = &'a PositionedWord> {
    let y_max = zone.y_max;
    words.iter().filter(move |w| w.y0 > y_max)
}

/// Estimate the data column count from the first text rows below `zone`.
pub fn estimate_data_columns(
    words: &[PositionedWord],
    zone: &HeaderZone,
    config: &PipelineConfig,
) -> DataColumnEstimate {
    let below: Vec<PositionedWord> = words_below_zone(words, zone).cloned().collect();
    let mut rows = group_into_rows(&below, config.data_row_tolerance);
    rows.truncate(config.data_row_sample);
    if rows.is_empty() {
        return DataColumnEstimate::default();
    }

    // (column count, word count) per usable row.
    let counts: Vec<(usize, usize)> = rows
        .iter()
        .filter(|row| row.len() >= 2 && !is_page_row(row))
        .map(|row| (row_column_count(row), row.len()))
        .filter(|(n, _)| (1..=MAX_COLUMNS_PER_ROW).contains(n))
        .collect();
    if counts.is_empty() {
        return DataColumnEstimate::default();
    }

    let dense: Vec<(usize, usize)> = counts
        .iter()
        .copied()
        .filter(|(_, words)| *words >= DENSE_ROW_WORDS)
        .collect();
    let used = if dense.len() >= 2 { dense } else { counts };

    let count = stable_count(&used);
    debug!(
        "page {}: {} data columns from {} sampled rows",
        zone.page,
        count,
        used.len()
    );
    DataColumnEstimate { count, rows }
}

/// Columns in one row: one more than the number of midpoint gaps wider
/// than `max(0.7 * median gap, 3)`.
pub fn row_column_count(row: &TextRow) -> usize {
    match row.len() {
        0 => 0,
        1 => 1,
        _ => {
            let mids: Vec<f32> = row.words.iter().map(|w| w.mid_x()).collect();
            let gaps: Vec<f32> = mids.windows(2).map(|p| p[1] - p[0]).collect();
            let threshold = (upper_median(&gaps) * 0.7).max(MIN_COLUMN_GAP);
            1 + gaps.iter().filter(|g| **g > threshold).count()
        }
    }
}

/// The largest count occurring in at least `max(2, rows / 4)` rows, or the
/// most frequent count (first seen wins ties) when none is that stable.
fn stable_count(used: &[(usize, usize)]) -> usize {
    let mut frequency: HashMap<usize, usize> = HashMap::new();
    let mut first_seen: Vec<usize> = Vec::new();
    for (n, _) in used {
        let entry = frequency.entry(*n).or_insert(0);
        if *entry == 0 {
            first_seen.push(*n);
        }
        *entry += 1;
    }

    let min_occurrences = (used.len() / 4).max(2);
    let stable = frequency
        .iter()
        .filter(|(_, c)| **c >= min_occurrences)
        .map(|(n, _)| *n)
        .max();
    if let Some(n) = stable {
        return n;
    }

    let mut mode = first_seen[0];
    for n in &first_seen {
        if frequency[n] > frequency[&mode] {
            mode = *n;
        }
    }
    mode
}

/// Partition the sampled midpoints into `estimate.count` equal-count
/// buckets. Boundaries sit halfway between neighbouring bucket edges; the
/// outer edges are padded by two points. Empty when there are fewer
/// midpoints than columns.
pub fn data_column_intervals(estimate: &DataColumnEstimate) -> Vec<(f32, f32)> {
    let k = estimate.count;
    if k == 0 || estimate.rows.is_empty() {
        return Vec::new();
    }

    let mut mids: Vec<f32> = estimate
        .rows
        .iter()
        .flat_map(|row| row.words.iter().map(|w| w.mid_x()))
        .collect();
    if mids.len() < k {
        return Vec::new();
    }
    mids.sort_by(|a, b| a.total_cmp(b));

    let n = mids.len();
    let step = n / k;
    let boundaries: Vec<f32> = (1..k)
        .map(|i| i * step)
        .filter(|idx| *idx < n)
        .map(|idx| (mids[idx - 1] + mids[idx]) / 2.0)
        .collect();

    let mut intervals = Vec::with_capacity(k);
    let mut lo = mids[0] - 2.0;
    for b in boundaries {
        intervals.push((lo, b));
        lo = b;
    }
    intervals.push((lo, mids[n - 1] + 2.0));
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x0: f32, y0: f32) -> PositionedWord {
        PositionedWord::new(text, x0, y0, x0 + 20.0, y0 + 8.0)
    }

    fn zone(y_max: f32) -> HeaderZone {
        HeaderZone {
            page: 0,
            y_min: 0.0,
            y_max,
            confidence: 0.9,
            reason: String::new(),
            words: Vec::new(),
        }
    }

    /// A data row with one word at each x position.
    fn data_row(xs: &[f32], y: f32) -> Vec<PositionedWord> {
        xs.iter().map(|x| word("10", *x, y)).collect()
    }

    #[test]
    fn row_column_count_splits_wide_gaps() {
        let row = TextRow {
            words: vec![
                word("a", 0.0, 0.0),
                word("b", 100.0, 0.0),
                word("c", 200.0, 0.0),
                word("d", 300.0, 0.0),
            ],
        };
        assert_eq!(row_column_count(&row), 4);
    }

    #[test]
    fn row_column_count_single_word() {
        let row = TextRow {
            words: vec![word("a", 0.0, 0.0)],
        };
        assert_eq!(row_column_count(&row), 1);
    }

    #[test]
    fn estimate_takes_largest_stable_count() {
        let xs6 = [0.0, 60.0, 120.0, 180.0, 240.0, 300.0];
        let xs5 = [0.0, 60.0, 120.0, 180.0, 240.0];
        let mut words = Vec::new();
        for i in 0..4 {
            words.extend(data_row(&xs5, 100.0 + i as f32 * 12.0));
        }
        for i in 0..3 {
            words.extend(data_row(&xs6, 200.0 + i as f32 * 12.0));
        }
        let estimate = estimate_data_columns(&words, &zone(50.0), &PipelineConfig::default());
        // 5 occurs 4 times, 6 occurs 3 times; both are stable.
        assert_eq!(estimate.count, 6);
        assert_eq!(estimate.rows.len(), 7);
    }

    #[test]
    fn estimate_ignores_words_above_zone_and_page_rows() {
        let mut words = data_row(&[0.0, 60.0, 120.0, 180.0], 10.0);
        words.extend(vec![
            word("Page", 0.0, 300.0),
            word("1", 60.0, 300.0),
            word("of", 120.0, 300.0),
            word("2", 180.0, 300.0),
        ]);
        let estimate = estimate_data_columns(&words, &zone(50.0), &PipelineConfig::default());
        assert_eq!(estimate.count, 0);
    }

    #[test]
    fn estimate_empty_below_zone() {
        let words = data_row(&[0.0, 60.0], 10.0);
        let estimate = estimate_data_columns(&words, &zone(50.0), &PipelineConfig::default());
        assert_eq!(estimate, DataColumnEstimate::default());
    }

    #[test]
    fn estimate_caps_sampled_rows() {
        let mut words = Vec::new();
        for i in 0..30 {
            words.extend(data_row(&[0.0, 60.0, 120.0], 100.0 + i as f32 * 12.0));
        }
        let estimate = estimate_data_columns(&words, &zone(50.0), &PipelineConfig::default());
        assert_eq!(estimate.rows.len(), 20);
        assert_eq!(estimate.count, 3);
    }

    #[test]
    fn intervals_partition_midpoints() {
        let mut words = Vec::new();
        for i in 0..3 {
            words.extend(data_row(&[0.0, 100.0, 200.0], 100.0 + i as f32 * 12.0));
        }
        let estimate = estimate_data_columns(&words, &zone(50.0), &PipelineConfig::default());
        assert_eq!(estimate.count, 3);
        let intervals = data_column_intervals(&estimate);
        assert_eq!(intervals, vec![(8.0, 60.0), (60.0, 160.0), (160.0, 212.0)]);
    }

    #[test]
    fn intervals_empty_without_estimate() {
        assert!(data_column_intervals(&DataColumnEstimate::default()).is_empty());
    }
}
