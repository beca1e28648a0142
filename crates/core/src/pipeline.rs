//! Document-level orchestration.
//!
//! Phase one evaluates every page on its own and yields at most one accepted
//! [`HeaderCandidate`] per page. Phase two reduces those candidates to the
//! final header with [`build_consensus`]. No page reads another page's
//! state, so phase one is free to run in any order.

use log::{debug, info};

use crate::config::PipelineConfig;
use crate::consensus::{build_consensus, combine_confidence};
use crate::data_columns::{data_column_intervals, estimate_data_columns};
use crate::evidence::{evaluate_evidence, is_footer_like, GateDecision, GateInput};
use crate::filter::filter_noise;
use crate::locator::{locate_header_zone, title_zone_tokens};
use crate::normalize::{normalize_all, DictionaryNormalizer, Normalizer};
use crate::profile::{ColumnProfiler, TypeProfiler};
use crate::reconstruct::reconstruct_header;
use crate::repair::split_by_data_columns;
use crate::types::{
    CandidateSummary, ComponentScores, Diagnostic, DocumentLayout, ExtractionResult,
    HeaderCandidate, PageLayout, RejectReason,
};

/// Consensus component of a page candidate before cross-page voting.
const SINGLE_PAGE_CONSENSUS: f64 = 1.0;
const MULTI_PAGE_CONSENSUS: f64 = 0.5;

/// What phase one produced for a single page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub page: usize,
    /// Estimated data columns below the zone; 0 when unknown.
    pub data_columns: usize,
    /// The accepted candidate, if the page produced one.
    pub candidate: Option<HeaderCandidate>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PageOutcome {
    fn new(page: usize) -> Self {
        Self {
            page,
            data_columns: 0,
            candidate: None,
            diagnostics: Vec::new(),
        }
    }

    fn reject(mut self, reason: RejectReason) -> Self {
        debug!("page {}: rejected, {}", self.page, reason);
        self.diagnostics.push(Diagnostic::Rejected {
            page: self.page,
            reason,
        });
        self
    }
}

/// The header inference pipeline bound to one configuration and a pair of
/// normalization and profiling services.
#[derive(Debug, Clone)]
pub struct Pipeline<N = DictionaryNormalizer, P = TypeProfiler> {
    config: PipelineConfig,
    normalizer: N,
    profiler: P,
}

impl Pipeline {
    /// Pipeline with the default dictionary normalizer and type profiler.
    pub fn new(config: PipelineConfig) -> Self {
        let normalizer = DictionaryNormalizer::new(&config);
        let profiler = TypeProfiler::new(&config);
        Self {
            config,
            normalizer,
            profiler,
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl<N: Normalizer, P: ColumnProfiler> Pipeline<N, P> {
    pub fn with_services(config: PipelineConfig, normalizer: N, profiler: P) -> Self {
        Self {
            config,
            normalizer,
            profiler,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Infer the header of one document.
    ///
    /// Never fails: missing words, missing zones and rejected candidates all
    /// end in a zero-confidence result whose diagnostics say why.
    pub fn extract(&self, source: &str, document: &DocumentLayout) -> ExtractionResult {
        if document.word_count() == 0 {
            debug!("{}: no words extracted", source);
            return ExtractionResult::empty(
                source,
                vec![Diagnostic::Empty {
                    reason: "no_words".to_string(),
                }],
            );
        }

        let page_count = document.page_count();
        let outcomes: Vec<PageOutcome> = document
            .pages
            .iter()
            .map(|page| self.evaluate_page(page, page_count))
            .collect();

        let mut diagnostics: Vec<Diagnostic> = outcomes
            .iter()
            .flat_map(|o| o.diagnostics.iter().cloned())
            .collect();
        let summaries: Vec<CandidateSummary> = outcomes
            .iter()
            .filter_map(|o| {
                o.candidate.as_ref().map(|c| CandidateSummary {
                    page: o.page,
                    headers: c.headers.clone(),
                    confidence: c.confidence,
                    data_columns: o.data_columns,
                })
            })
            .collect();
        let candidates: Vec<HeaderCandidate> =
            outcomes.into_iter().filter_map(|o| o.candidate).collect();

        let Some(chosen) = build_consensus(&candidates, &self.config.weights) else {
            info!("{}: no accepted header candidate", source);
            diagnostics.push(Diagnostic::Empty {
                reason: "no_accepted_candidate".to_string(),
            });
            return ExtractionResult::empty(source, diagnostics);
        };
        if candidates.len() > 1 {
            diagnostics.extend(chosen.diagnostics.iter().cloned());
        }

        let confidence = chosen.confidence.clamp(0.0, 1.0);
        info!(
            "{}: {} headers, confidence {:.2}, first {:?}",
            source,
            chosen.headers.len(),
            confidence,
            chosen.headers.iter().take(5).collect::<Vec<_>>()
        );

        ExtractionResult {
            source: source.to_string(),
            headers: chosen.headers,
            confidence,
            breakdown: chosen.scores,
            candidates: summaries,
            diagnostics,
        }
    }

    /// Run stages one to six on a single page.
    pub fn evaluate_page(&self, page: &PageLayout, page_count: usize) -> PageOutcome {
        let config = &self.config;
        let index = page.index;
        let mut outcome = PageOutcome::new(index);

        let Some(zone) = locate_header_zone(page, config) else {
            debug!("page {}: no header zone", index);
            return outcome;
        };
        outcome.diagnostics.push(Diagnostic::ZoneDetected(zone.summary()));

        let estimate = estimate_data_columns(&page.words, &zone, config);
        outcome.data_columns = estimate.count;
        outcome.diagnostics.push(Diagnostic::DataColumns {
            page: index,
            count: estimate.count,
        });

        let reconstruction = reconstruct_header(&zone, config);
        outcome.diagnostics.extend(reconstruction.merges.iter().cloned());
        if reconstruction.columns.is_empty() {
            return outcome.reject(RejectReason::ReconstructEmpty);
        }
        let reconstruction_score = reconstruction.score;

        let filtered = filter_noise(reconstruction.columns);
        outcome.diagnostics.extend(filtered.diagnostics(index));
        if filtered.columns.is_empty() {
            return outcome.reject(RejectReason::AllFilteredNoise);
        }
        let noise_tokens = filtered.noise.len();

        let columns = if estimate.count > 0 && filtered.columns.len() < estimate.count {
            let intervals = data_column_intervals(&estimate);
            let (columns, splits) = split_by_data_columns(filtered.columns, &intervals, index);
            outcome.diagnostics.extend(splits);
            columns
        } else {
            filtered.columns
        };

        let raw: Vec<&str> = columns.iter().map(|c| c.text.as_str()).collect();
        let (normalized, semantic) = normalize_all(&self.normalizer, &raw);
        let headers: Vec<String> = normalized.into_iter().map(|n| n.canonical).collect();
        outcome.diagnostics.push(Diagnostic::Headers {
            page: index,
            raw: raw.iter().map(|s| s.to_string()).collect(),
            canonical: headers.clone(),
        });

        let intervals: Vec<(f32, f32)> = columns.iter().map(|c| (c.x_min, c.x_max)).collect();
        let profile = self
            .profiler
            .profile(&page.words, &zone, &intervals, &headers);

        let scores = ComponentScores {
            visual: zone.confidence,
            reconstruction: reconstruction_score,
            semantic,
            data_validation: profile.score,
            consensus: if page_count > 1 {
                MULTI_PAGE_CONSENSUS
            } else {
                SINGLE_PAGE_CONSENSUS
            },
        };
        let confidence = combine_confidence(&scores, &config.weights);

        let input = GateInput {
            headers: &headers,
            confidence,
            data_validation: profile.score,
            data_columns: estimate.count,
            page_count,
            source_pages: 1,
            noise_tokens,
            type_mismatches: profile.type_mismatches,
            title_zone_tokens: title_zone_tokens(&zone, config),
        };
        match evaluate_evidence(&input, config) {
            GateDecision::Rejected { reason, report } => {
                outcome.diagnostics.push(Diagnostic::Evidence {
                    page: index,
                    report,
                });
                outcome.reject(reason)
            }
            GateDecision::Accepted(report) => {
                if is_footer_like(&headers) {
                    return outcome.reject(RejectReason::FooterLikeHeaders { headers });
                }
                let adjusted = report.adjusted_confidence;
                let evidence = Diagnostic::Evidence {
                    page: index,
                    report,
                };
                outcome.diagnostics.push(evidence.clone());
                debug!(
                    "page {}: accepted {} headers, confidence {:.2} adjusted {:.2}",
                    index,
                    headers.len(),
                    confidence,
                    adjusted
                );
                outcome.candidate = Some(HeaderCandidate {
                    headers,
                    scores,
                    confidence: adjusted,
                    source_pages: vec![index],
                    diagnostics: vec![evidence],
                });
                outcome
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PositionedWord;

    fn word(text: &str, x0: f32, y0: f32) -> PositionedWord {
        let width = 6.0 * text.chars().count() as f32;
        PositionedWord::new(text, x0, y0, x0 + width, y0 + 10.0).with_font_size(10.0)
    }

    /// A stock statement with a title, a five column header and data rows.
    fn stock_page(index: usize) -> PageLayout {
        let xs = [40.0, 200.0, 280.0, 360.0, 440.0];
        let mut words = vec![word("SUNRISE", 40.0, 40.0), word("PHARMA", 100.0, 40.0)];
        for (x, text) in xs.iter().zip(["Product", "Pack", "Batch", "Qty", "Rate"]) {
            words.push(word(text, *x, 100.0));
        }
        for (i, name) in ["Crocin", "Dolo", "Zincovit", "Calpol"].iter().enumerate() {
            let y = 130.0 + 20.0 * i as f32;
            words.push(word(name, xs[0], y));
            for (x, value) in xs[1..].iter().zip(["10", "2231", "40", "12.50"]) {
                words.push(word(value, *x, y));
            }
        }
        PageLayout {
            index,
            width: 595.0,
            height: 842.0,
            words: words.into_iter().map(|w| w.on_page(index)).collect(),
            lines: Vec::new(),
        }
    }

    #[test]
    fn empty_document_is_empty_result() {
        let result = Pipeline::default().extract("empty.pdf", &DocumentLayout::default());
        assert!(result.headers.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(
            result.diagnostics,
            vec![Diagnostic::Empty {
                reason: "no_words".to_string()
            }]
        );
    }

    #[test]
    fn single_page_stock_statement() {
        let document = DocumentLayout {
            pages: vec![stock_page(0)],
        };
        let result = Pipeline::default().extract("stock.pdf", &document);
        assert_eq!(
            result.headers,
            vec!["Product Name", "Pack", "Batch No", "Quantity", "Rate"]
        );
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
        assert_eq!(result.breakdown.consensus, 1.0);
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].data_columns, 5);
        assert_eq!(result.zones().count(), 1);
    }

    #[test]
    fn page_outcome_records_zone_and_headers() {
        let pipeline = Pipeline::default();
        let outcome = pipeline.evaluate_page(&stock_page(2), 3);
        let candidate = outcome.candidate.expect("accepted");
        assert_eq!(candidate.source_pages, vec![2]);
        assert_eq!(candidate.scores.consensus, 0.5);
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Headers { page: 2, .. })));
    }

    #[test]
    fn two_column_page_is_rejected_as_too_few_columns() {
        let mut words = vec![word("Product", 40.0, 100.0), word("Qty", 200.0, 100.0)];
        for i in 0..4 {
            let y = 130.0 + 20.0 * i as f32;
            words.push(word("Crocin", 40.0, y));
            words.push(word("10", 200.0, y));
        }
        let document = DocumentLayout {
            pages: vec![PageLayout {
                index: 0,
                width: 595.0,
                height: 842.0,
                words,
                lines: Vec::new(),
            }],
        };
        let result = Pipeline::default().extract("short.pdf", &document);
        assert!(!result.has_headers());
        assert!(result
            .rejections()
            .any(|(_, reason)| reason.code() == "too_few_columns"));
    }

    #[test]
    fn multi_page_documents_vote() {
        let document = DocumentLayout {
            pages: vec![stock_page(0), stock_page(1)],
        };
        let result = Pipeline::default().extract("two.pdf", &document);
        assert_eq!(result.candidates.len(), 2);
        assert_eq!(result.breakdown.consensus, 1.0);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Consensus { .. })));
    }
}
