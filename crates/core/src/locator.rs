//! Row/zone locator: finds the band of a page most likely to hold the
//! column headers.
//!
//! Two strategies run in order and the first hit wins:
//!
//! 1. **Row-based.** Group words into text rows, find the first data row
//!    (mostly numbers) and take the keyword-richest row above it. Without a
//!    data row, fall back to keyword rows near the top and finally to the
//!    row with the largest font.
//! 2. **Band-based.** Slide an overlapping band down the page, score by word
//!    density, font boost and closeness to the top, and cap the winner to a
//!    handful of text rows.

use log::debug;

use crate::config::PipelineConfig;
use crate::lexicon::keyword_hits;
use crate::rows::{
    distinct_y_keys, group_into_rows, is_footer_or_total_row, is_page_row, is_title_row,
    median_font_size, TextRow,
};
use crate::types::{HeaderZone, PageLayout, PositionedWord};

/// Page height assumed when the extractor could not read a MediaBox (A4).
const DEFAULT_PAGE_HEIGHT: f32 = 842.0;

/// Font size assumed for band scoring when the page carries no sizes.
const DEFAULT_FONT_SIZE: f32 = 10.0;

/// Slack added to the last kept row when capping a band-based zone.
const ZONE_ROW_CAP_SLACK: f32 = 15.0;

/// Confidence of the last-resort "first text rows" zone.
const FALLBACK_CONFIDENCE: f64 = 0.4;

/// Locate the header zone of one page, or `None` when the page has no
/// plausible header region.
pub fn locate_header_zone(page: &PageLayout, config: &PipelineConfig) -> Option<HeaderZone> {
    let page_height = effective_page_height(page);
    let words = candidate_words(&page.words, page_height, config);
    if words.is_empty() {
        debug!("page {}: no candidate words for header zone", page.index);
        return None;
    }

    let zone = locate_by_rows(&words, page.index, page_height, config)
        .or_else(|| locate_by_bands(page, &words, page_height, config))?;
    debug!(
        "page {}: header zone y={:.1}-{:.1} confidence={:.2} reason={}",
        zone.page, zone.y_min, zone.y_max, zone.confidence, zone.reason
    );
    Some(zone)
}

/// Number of zone words sitting on rows that look like report titles.
pub fn title_zone_tokens(zone: &HeaderZone, config: &PipelineConfig) -> usize {
    group_into_rows(&zone.words, config.row_y_tolerance)
        .iter()
        .filter(|row| is_title_row(row))
        .map(|row| row.len())
        .sum()
}

fn effective_page_height(page: &PageLayout) -> f32 {
    if page.height > 0.0 {
        page.height
    } else {
        DEFAULT_PAGE_HEIGHT
    }
}

/// Drop footer-band words and font-size outliers (logos, watermarks).
fn candidate_words(
    words: &[PositionedWord],
    page_height: f32,
    config: &PipelineConfig,
) -> Vec<PositionedWord> {
    let footer_y = page_height * config.footer_band_ratio;
    let in_body: Vec<PositionedWord> = words.iter().filter(|w| w.y0 < footer_y).cloned().collect();

    let median = median_font_size(&in_body);
    if median <= 0.0 {
        return in_body;
    }
    let (lo, hi) = (median * config.font_band_min, median * config.font_band_max);
    in_body
        .into_iter()
        .filter(|w| {
            let size = if w.font_size > 0.0 { w.font_size } else { median };
            (lo..=hi).contains(&size)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Row-based strategy
// ---------------------------------------------------------------------------

fn locate_by_rows(
    words: &[PositionedWord],
    page: usize,
    page_height: f32,
    config: &PipelineConfig,
) -> Option<HeaderZone> {
    let rows = group_into_rows(words, config.row_y_tolerance);
    if rows.is_empty() {
        return None;
    }

    if let Some(data_idx) = first_data_row(&rows) {
        debug!("page {}: first data row at index {}", page, data_idx);
        if data_idx > 0 {
            if let Some(zone) = header_above_data_row(&rows, data_idx, page) {
                return Some(zone);
            }
        }
    }

    let y_min_page = words.iter().map(|w| w.y0).fold(f32::INFINITY, f32::min);
    let y_max_page = words.iter().map(|w| w.y1).fold(f32::NEG_INFINITY, f32::max);
    let span = y_max_page - y_min_page;
    let cut = |ratio: f32| {
        if span > 0.0 {
            y_min_page + span * ratio
        } else {
            page_height * ratio
        }
    };
    let keyword_cut = cut(config.keyword_search_ratio);
    let font_cut = cut(config.font_search_ratio);

    let eligible = |row: &&TextRow, limit: f32| {
        row.y_center() <= limit && !is_footer_or_total_row(row) && !is_title_row(row)
    };

    // Best keyword row in the top of the content.
    let mut best: Option<(f64, &TextRow, usize)> = None;
    for row in rows.iter().filter(|r| eligible(r, keyword_cut)) {
        let n = row.len();
        if !(3..=25).contains(&n) {
            continue;
        }
        let kw = keyword_hits(row.words.iter().map(|w| w.text.as_str()));
        let bonus = if (4..=15).contains(&n) { 1.0 } else { 0.7 };
        let score = kw as f64 * bonus;
        if best.map_or(true, |(s, _, _)| score > s) {
            best = Some((score, row, kw));
        }
    }
    if let Some((score, row, kw)) = best {
        if score >= 1.0 {
            return Some(zone_from_row(
                row,
                page,
                (0.5 + score * 0.1).min(0.9),
                format!("header_keywords={} tokens={}", kw, row.len()),
            ));
        }
    }

    // First wide row carrying any keyword.
    if let Some(row) = rows.iter().filter(|r| eligible(r, keyword_cut)).find(|r| {
        r.len() >= 5 && keyword_hits(r.words.iter().map(|w| w.text.as_str())) >= 1
    }) {
        return Some(zone_from_row(row, page, 0.6, "first_multi_token_with_keyword".to_string()));
    }

    // Largest average font near the top.
    let mut best_font: Option<(f32, &TextRow)> = None;
    for row in rows.iter().filter(|r| eligible(r, font_cut)) {
        if row.len() < 3 {
            continue;
        }
        let avg = row.average_font_size();
        if avg > best_font.map_or(0.0, |(f, _)| f) {
            best_font = Some((avg, row));
        }
    }
    best_font.map(|(_, row)| zone_from_row(row, page, 0.5, "largest_font_top".to_string()))
}

/// Index of the first row that reads as table data: at least four words,
/// at least four of them numeric, and a numeric share of at least 35%.
/// Footer-shaped rows (totals, or at least half numeric) and page footers
/// are skipped, so the first data row sits in the 35-50% numeric range.
fn first_data_row(rows: &[TextRow]) -> Option<usize> {
    rows.iter().position(|row| {
        row.len() >= 4
            && !is_footer_or_total_row(row)
            && !is_page_row(row)
            && row.numeric_count() >= 4
            && row.numeric_ratio() >= 0.35
    })
}

fn header_above_data_row(rows: &[TextRow], data_idx: usize, page: usize) -> Option<HeaderZone> {
    let mut best: Option<(usize, &TextRow)> = None;
    // Nearest row wins ties: strictly greater only.
    for row in rows[..data_idx].iter().rev() {
        if row.len() < 2 || is_footer_or_total_row(row) || is_title_row(row) {
            continue;
        }
        let kw = keyword_hits(row.words.iter().map(|w| w.text.as_str()));
        if best.map_or(true, |(b, _)| kw > b) {
            best = Some((kw, row));
        }
    }
    if let Some((kw, row)) = best {
        if kw >= 1 {
            return Some(zone_from_row(
                row,
                page,
                0.92,
                format!("above_first_data_row_keywords={}", kw),
            ));
        }
    }

    let above = &rows[data_idx - 1];
    if above.len() >= 2 && !is_footer_or_total_row(above) && !is_title_row(above) {
        return Some(zone_from_row(above, page, 0.75, "above_first_data_row".to_string()));
    }
    None
}

fn zone_from_row(row: &TextRow, page: usize, confidence: f64, reason: String) -> HeaderZone {
    HeaderZone {
        page,
        y_min: row.y_min(),
        y_max: row.y_max(),
        confidence,
        reason,
        words: row.words.clone(),
    }
}

// ---------------------------------------------------------------------------
// Band-based strategy
// ---------------------------------------------------------------------------

struct BandScore {
    center: f32,
    score: f64,
    reason: String,
}

fn locate_by_bands(
    page: &PageLayout,
    words: &[PositionedWord],
    page_height: f32,
    config: &PipelineConfig,
) -> Option<HeaderZone> {
    let median = match median_font_size(words) {
        m if m > 0.0 => m,
        _ => DEFAULT_FONT_SIZE,
    };
    let y_min_page = words.iter().map(|w| w.y0).fold(f32::INFINITY, f32::min);
    let y_max_page = words.iter().map(|w| w.y1).fold(f32::NEG_INFINITY, f32::max);
    let span = y_max_page - y_min_page;
    let band = config.band_height;
    let step = config.band_step();
    let stop = (y_max_page + band).min(page_height);

    let mut best: Option<BandScore> = None;
    let mut y = y_min_page;
    while y < stop {
        let y_end = y + band;
        let in_band: Vec<&PositionedWord> =
            words.iter().filter(|w| w.y0 < y_end && w.y1 > y).collect();
        if in_band.len() >= config.min_words_in_band {
            let density = in_band.len() as f64 / (band as f64 / 20.0);
            let avg_font = in_band
                .iter()
                .map(|w| if w.font_size > 0.0 { w.font_size } else { median })
                .sum::<f32>()
                / in_band.len() as f32;
            let font_boost = if avg_font >= median * config.font_boost_threshold {
                config.font_boost
            } else {
                1.0
            };
            let top_penalty = if span > 0.0 {
                ((y - y_min_page) / span) as f64
            } else {
                0.0
            };
            let position = 1.0 - top_penalty * 0.5;
            let score = density * font_boost * position;
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(BandScore {
                    center: y + band / 2.0,
                    score,
                    reason: format!(
                        "density={:.1} font_boost={:.1} top_score={:.2}",
                        density, font_boost, position
                    ),
                });
            }
        }
        if step <= 0.0 {
            break;
        }
        y += step;
    }

    let Some(best) = best else {
        return fallback_first_rows(words, page.index);
    };

    let half = page_height * config.band_max_height_ratio / 2.0;
    let mut y_min = (best.center - half).max(0.0);
    let mut y_max = (best.center + half).min(page_height);

    let mut zone_words: Vec<PositionedWord> = words
        .iter()
        .filter(|w| {
            let mid = w.mid_y();
            mid >= y_min - config.zone_margin_above && mid <= y_max + config.zone_margin_below
        })
        .cloned()
        .collect();
    if !zone_words.is_empty() {
        let keys = distinct_y_keys(&zone_words);
        if keys.len() > config.max_zone_rows && config.max_zone_rows > 0 {
            let y_cut = keys[config.max_zone_rows - 1] as f32 + ZONE_ROW_CAP_SLACK;
            zone_words.retain(|w| w.y0 <= y_cut);
        }
        if !zone_words.is_empty() {
            y_min = zone_words.iter().map(|w| w.y0).fold(f32::INFINITY, f32::min);
            y_max = zone_words.iter().map(|w| w.y1).fold(f32::NEG_INFINITY, f32::max);
        }
    }

    let mut score = best.score;
    let mut reason = best.reason;
    if page
        .horizontal_lines()
        .any(|line| y_min <= line.y() && line.y() <= y_max + config.separator_proximity)
    {
        score *= config.separator_boost;
        reason.push_str("; separator_below");
    }

    Some(HeaderZone {
        page: page.index,
        y_min,
        y_max,
        confidence: (score / 10.0).clamp(0.0, 1.0),
        reason,
        words: zone_words,
    })
}

/// The first few distinct text lines, at a fixed low confidence.
fn fallback_first_rows(words: &[PositionedWord], page: usize) -> Option<HeaderZone> {
    const FALLBACK_ROWS: usize = 5;

    let keys = distinct_y_keys(words);
    let taken = &keys[..keys.len().min(FALLBACK_ROWS)];
    let mut zone_words: Vec<PositionedWord> = words
        .iter()
        .filter(|w| taken.contains(&(w.y0.floor() as i64)))
        .cloned()
        .collect();
    if zone_words.is_empty() {
        return None;
    }
    zone_words.sort_by(crate::rows::compare_reading_order);
    Some(HeaderZone {
        page,
        y_min: zone_words.iter().map(|w| w.y0).fold(f32::INFINITY, f32::min),
        y_max: zone_words.iter().map(|w| w.y1).fold(f32::NEG_INFINITY, f32::max),
        confidence: FALLBACK_CONFIDENCE,
        reason: "fallback_first_lines".to_string(),
        words: zone_words,
    })
}
