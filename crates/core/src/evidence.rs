//! Evidence gate: decides whether a page's header candidate is trusted.
//!
//! The gate never relies on the candidate's own combined confidence alone.
//! Hard rules reject outright; otherwise an independent evidence score must
//! clear the threshold, and accepted candidates get a penalty-adjusted
//! confidence.

use log::debug;

use crate::config::PipelineConfig;
use crate::lexicon::{is_domain_priority, is_header_keyword, FOOTER_LIKE_HEADERS, HEADER_KEYWORDS};
use crate::types::{EvidenceReport, PenaltyBreakdown, RejectReason};

/// Everything the gate looks at for one candidate.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub headers: &'a [String],
    /// Combined confidence before penalties.
    pub confidence: f64,
    pub data_validation: f64,
    /// Estimated data columns; 0 when unknown.
    pub data_columns: usize,
    pub page_count: usize,
    /// Pages the candidate was observed on.
    pub source_pages: usize,
    pub noise_tokens: usize,
    pub type_mismatches: usize,
    pub title_zone_tokens: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Accepted(EvidenceReport),
    Rejected {
        reason: RejectReason,
        report: EvidenceReport,
    },
}

impl GateDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateDecision::Accepted(_))
    }

    pub fn report(&self) -> &EvidenceReport {
        match self {
            GateDecision::Accepted(report) | GateDecision::Rejected { report, .. } => report,
        }
    }
}

pub fn evaluate_evidence(input: &GateInput<'_>, config: &PipelineConfig) -> GateDecision {
    let header_columns = input.headers.len();
    let mut report = EvidenceReport::default();

    if header_columns < config.min_header_columns {
        report.column_gate = "too_few_columns".to_string();
        return GateDecision::Rejected {
            reason: RejectReason::TooFewColumns {
                columns: header_columns,
            },
            report,
        };
    }

    match column_count_gate(header_columns, input.data_columns, config) {
        Ok(message) => report.column_gate = message,
        Err(reason) => {
            report.column_gate = reason.to_string();
            return GateDecision::Rejected { reason, report };
        }
    }

    report.penalties = penalties(input, config);
    report.adjusted_confidence = (input.confidence - report.penalties.total()).clamp(0.0, 1.0);

    report.keyword = keyword_score(input.headers);
    report.column_alignment =
        column_alignment_score(header_columns, input.data_columns, config.column_diff_tolerance);
    report.data_validation = input.data_validation;
    report.lexical_purity = lexical_purity(input.headers, input.noise_tokens, config.domain_boost);
    report.multi_page_presence = if input.page_count <= 1 {
        1.0
    } else {
        input.source_pages as f64 / input.page_count as f64
    };

    let w = &config.evidence_weights;
    report.total = (report.keyword * w.keyword
        + report.column_alignment * w.column_alignment
        + report.data_validation * w.data_validation
        + report.lexical_purity * w.lexical_purity
        + report.multi_page_presence * w.multi_page)
        .clamp(0.0, 1.0);

    if report.total < config.evidence_threshold {
        debug!(
            "evidence {:.2} below threshold {:.2}",
            report.total, config.evidence_threshold
        );
        return GateDecision::Rejected {
            reason: RejectReason::EvidenceBelowThreshold {
                evidence: report.total,
                threshold: config.evidence_threshold,
            },
            report,
        };
    }
    GateDecision::Accepted(report)
}

/// Hard column-count consistency rule. `Ok` carries a short description of
/// why the counts are acceptable.
pub fn column_count_gate(
    header: usize,
    data: usize,
    config: &PipelineConfig,
) -> Result<String, RejectReason> {
    if data == 0 {
        return Ok("no_data_to_compare".to_string());
    }
    let diff = header.abs_diff(data);
    if diff <= config.column_diff_tolerance {
        return Ok(format!("column_count_ok: header={} data={}", header, data));
    }
    // Data rows with merged cells under-count; tolerate a wider header.
    if header >= data
        && header - data <= config.excess_tolerance
        && (config.header_range_min..=config.header_range_max).contains(&header)
    {
        return Ok(format!(
            "column_count_ok_header_ge_data: header={} data={}",
            header, data
        ));
    }
    Err(RejectReason::ColumnCountMismatch { header, data, diff })
}

/// Share of header tokens (two characters or longer) that are, or contain, a
/// header keyword. 0.5 when no token qualifies, 0 for no headers.
pub fn keyword_score(headers: &[String]) -> f64 {
    if headers.is_empty() {
        return 0.0;
    }
    let mut total = 0usize;
    let mut hits = 0usize;
    for token in headers.iter().flat_map(|h| h.split_whitespace()) {
        let token = token.to_lowercase();
        if token.chars().count() < 2 {
            continue;
        }
        total += 1;
        if is_header_keyword(&token) || HEADER_KEYWORDS.iter().any(|kw| token.contains(kw)) {
            hits += 1;
        }
    }
    if total == 0 {
        return 0.5;
    }
    hits as f64 / total as f64
}

/// 1.0 for an exact match, sliding down with the difference, 0 past the
/// tolerance, and 0.5 without a data estimate.
pub fn column_alignment_score(header: usize, data: usize, tolerance: usize) -> f64 {
    if data == 0 {
        return 0.5;
    }
    let diff = header.abs_diff(data);
    if diff > tolerance {
        return 0.0;
    }
    if diff == 0 {
        return 1.0;
    }
    1.0 - (diff as f64 / (tolerance as f64 + 1.0)) * 0.5
}

/// Lower when noise was removed, higher for known domain headers.
pub fn lexical_purity(headers: &[String], noise_tokens: usize, domain_boost: f64) -> f64 {
    const NOISE_PENALTY: f64 = 0.12;

    if headers.is_empty() {
        return 0.0;
    }
    let boost = headers.iter().filter(|h| is_domain_priority(h)).count() as f64 * domain_boost;
    (1.0 - noise_tokens as f64 * NOISE_PENALTY + boost).clamp(0.0, 1.0)
}

fn penalties(input: &GateInput<'_>, config: &PipelineConfig) -> PenaltyBreakdown {
    let capped = |count: usize, per: f64| {
        if count == 0 {
            0.0
        } else {
            (count as f64 * per).min(config.penalty_cap)
        }
    };
    PenaltyBreakdown {
        merged_column: if input.data_columns > 0 && input.headers.len() != input.data_columns {
            config.merged_column_penalty
        } else {
            0.0
        },
        noise_words: capped(input.noise_tokens, config.noise_word_penalty),
        type_mismatch: capped(input.type_mismatches, config.type_mismatch_penalty),
        title_zone: capped(input.title_zone_tokens, config.title_zone_penalty),
    }
}

/// Header sets shaped like a total row: two or fewer columns, or leading
/// texts matching a "grand total" tuple.
pub fn is_footer_like(headers: &[String]) -> bool {
    if headers.len() <= 2 {
        return true;
    }
    let leading: Vec<String> = headers.iter().take(5).map(|h| h.trim().to_lowercase()).collect();
    FOOTER_LIKE_HEADERS
        .iter()
        .any(|tuple| tuple.len() == leading.len() && tuple.iter().zip(&leading).all(|(a, b)| a == b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn input(headers: &[String], data_columns: usize) -> GateInput<'_> {
        GateInput {
            headers,
            confidence: 0.8,
            data_validation: 0.8,
            data_columns,
            page_count: 1,
            source_pages: 1,
            noise_tokens: 0,
            type_mismatches: 0,
            title_zone_tokens: 0,
        }
    }

    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Qty {}", i)).collect()
    }

    #[test]
    fn rejects_fewer_than_three_columns() {
        let h = headers(&["Product", "Qty"]);
        let decision = evaluate_evidence(&input(&h, 2), &PipelineConfig::default());
        match decision {
            GateDecision::Rejected { reason, .. } => {
                assert_eq!(reason, RejectReason::TooFewColumns { columns: 2 });
                assert_eq!(reason.to_string(), "too_few_columns: 2");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn header_ten_data_twelve_is_a_mismatch() {
        let h = numbered(10);
        let decision = evaluate_evidence(&input(&h, 12), &PipelineConfig::default());
        match decision {
            GateDecision::Rejected { reason, .. } => {
                assert!(reason.to_string().contains("column_count_mismatch"));
                assert_eq!(
                    reason,
                    RejectReason::ColumnCountMismatch {
                        header: 10,
                        data: 12,
                        diff: 2
                    }
                );
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn header_fourteen_data_eight_passes_hard_gate() {
        let gate = column_count_gate(14, 8, &PipelineConfig::default()).unwrap();
        assert!(gate.starts_with("column_count_ok_header_ge_data"));
        let h = numbered(14);
        let decision = evaluate_evidence(&input(&h, 8), &PipelineConfig::default());
        assert!(decision.is_accepted());
    }

    #[test]
    fn excess_rule_needs_header_in_range() {
        let config = PipelineConfig::default();
        assert!(column_count_gate(4, 1, &config).is_err());
        assert!(column_count_gate(26, 20, &config).is_err());
        assert!(column_count_gate(20, 11, &config).is_err());
        assert!(column_count_gate(13, 12, &config).is_ok());
        assert!(column_count_gate(7, 0, &config).is_ok());
    }

    #[test]
    fn keyword_scores() {
        assert_eq!(keyword_score(&headers(&["Product Name", "Zzz Yyy"])), 0.5);
        // "no" is two characters but matches nothing.
        assert_eq!(keyword_score(&headers(&["Batch No"])), 0.5);
        assert_eq!(keyword_score(&headers(&["a", "b", "c"])), 0.5);
        assert_eq!(keyword_score(&[]), 0.0);
    }

    #[test]
    fn alignment_scores() {
        assert_eq!(column_alignment_score(5, 0, 1), 0.5);
        assert_eq!(column_alignment_score(5, 5, 1), 1.0);
        assert_eq!(column_alignment_score(6, 5, 1), 0.75);
        assert_eq!(column_alignment_score(7, 5, 1), 0.0);
    }

    #[test]
    fn purity_penalises_noise_and_boosts_domain() {
        let h = headers(&["Zzz", "Yyy", "Xxx"]);
        assert!((lexical_purity(&h, 2, 0.08) - 0.76).abs() < 1e-12);
        let domain = headers(&["Batch No", "MRP", "Rate"]);
        assert_eq!(lexical_purity(&domain, 1, 0.08), 1.0);
        assert_eq!(lexical_purity(&[], 0, 0.08), 0.0);
    }

    #[test]
    fn penalties_adjust_confidence() {
        let h = headers(&["Product Name", "Batch No", "Quantity", "MRP", "Rate"]);
        let mut gate_input = input(&h, 6);
        gate_input.noise_tokens = 4;
        gate_input.type_mismatches = 1;
        let decision = evaluate_evidence(&gate_input, &PipelineConfig::default());
        let report = decision.report();
        assert_eq!(report.penalties.merged_column, 0.15);
        // Four noise tokens at 0.15 cap at 0.4.
        assert_eq!(report.penalties.noise_words, 0.4);
        assert_eq!(report.penalties.type_mismatch, 0.2);
        assert_eq!(report.penalties.title_zone, 0.0);
        assert!((report.adjusted_confidence - 0.05).abs() < 1e-9);
    }

    #[test]
    fn low_evidence_is_rejected() {
        let h = headers(&["Zzz", "Yyy", "Xxx"]);
        let mut gate_input = input(&h, 3);
        gate_input.data_validation = 0.0;
        gate_input.noise_tokens = 9;
        gate_input.page_count = 10;
        let decision = evaluate_evidence(&gate_input, &PipelineConfig::default());
        match decision {
            GateDecision::Rejected { reason, report } => {
                assert_eq!(reason.code(), "evidence_below_threshold");
                // keyword 0, alignment 1, data 0, purity 0, presence 0.1
                assert!((report.total - 0.26).abs() < 1e-9);
                assert_eq!(reason.to_string(), "evidence_below_threshold: 0.26 < 0.35");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn footer_like_headers() {
        assert!(is_footer_like(&headers(&["Grand", "Total"])));
        assert!(is_footer_like(&headers(&["Total"])));
        assert!(!is_footer_like(&headers(&["Product", "Qty", "Rate"])));
    }
}
