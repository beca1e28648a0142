//! Cross-page consensus: reduces the accepted per-page candidates of one
//! document to a single header.
//!
//! This is a pure reduction over immutable candidates, so the per-page phase
//! that produces them can run in any order.

use std::cmp::Ordering;

use log::debug;

use crate::config::ConfidenceWeights;
use crate::types::{ComponentScores, Diagnostic, HeaderCandidate};

/// Weighted sum of the five component scores.
pub fn combine_confidence(scores: &ComponentScores, weights: &ConfidenceWeights) -> f64 {
    weights.visual * scores.visual
        + weights.reconstruction * scores.reconstruction
        + weights.semantic * scores.semantic
        + weights.data_validation * scores.data_validation
        + weights.consensus * scores.consensus
}

/// Highest combined confidence; the earliest source page breaks ties.
pub fn select_best(candidates: &[HeaderCandidate]) -> Option<&HeaderCandidate> {
    candidates.iter().min_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then(a.first_page().cmp(&b.first_page()))
    })
}

/// Reconcile per-page candidates into one.
///
/// With equal column counts everywhere, each column is decided by a
/// confidence-weighted vote and the consensus score becomes the share of
/// voted columns that agree with the best single candidate. Otherwise the
/// best single candidate is returned as-is.
pub fn build_consensus(
    candidates: &[HeaderCandidate],
    weights: &ConfidenceWeights,
) -> Option<HeaderCandidate> {
    let best = select_best(candidates)?;
    if candidates.len() == 1 {
        return Some(best.clone());
    }

    let width = best.headers.len();
    if width == 0 || candidates.iter().any(|c| c.headers.len() != width) {
        debug!("column counts differ across pages, keeping best single candidate");
        return Some(best.clone());
    }

    let voted: Vec<String> = (0..width)
        .map(|column| vote(candidates, column))
        .collect();
    let agreeing = voted
        .iter()
        .zip(&best.headers)
        .filter(|(v, b)| v == b)
        .count();
    let consensus = agreeing as f64 / width as f64;

    let scores = ComponentScores {
        consensus,
        ..best.scores
    };
    let confidence = combine_confidence(&scores, weights);
    debug!(
        "consensus over {} pages: agreement {:.2}, confidence {:.2}",
        candidates.len(),
        consensus,
        confidence
    );

    Some(HeaderCandidate {
        headers: voted.clone(),
        scores,
        confidence,
        source_pages: candidates.iter().filter_map(|c| c.source_pages.first().copied()).collect(),
        diagnostics: vec![Diagnostic::Consensus {
            voted,
            per_page: candidates.iter().map(|c| c.headers.clone()).collect(),
        }],
    })
}

/// Text with the largest summed confidence at `column`; the first text seen
/// wins ties.
fn vote(candidates: &[HeaderCandidate], column: usize) -> String {
    let mut tally: Vec<(&str, f64)> = Vec::new();
    for candidate in candidates {
        let text = candidate.headers[column].as_str();
        match tally.iter_mut().find(|(t, _)| *t == text) {
            Some(entry) => entry.1 += candidate.confidence,
            None => tally.push((text, candidate.confidence)),
        }
    }

    let mut winner = tally[0];
    for entry in &tally[1..] {
        if entry.1 > winner.1 {
            winner = *entry;
        }
    }
    winner.0.to_string()
}
