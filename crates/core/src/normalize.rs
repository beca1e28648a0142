//! Semantic normalization: maps raw reconstructed header text to a
//! canonical column name ("Qty" -> "Quantity", "Batch" -> "Batch No").
//!
//! The pipeline only depends on the [`Normalizer`] trait. The default
//! [`DictionaryNormalizer`] is an offline synonym table with a fuzzy
//! fallback.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::lexicon::{DOMAIN_SYNONYMS, SHORT_COLUMN_TOKENS};

/// Where a canonical name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// Kept as written (empty text or a short column abbreviation).
    Exact,
    /// Dictionary hit, whole key or containment.
    Domain,
    /// Closest dictionary key by edit similarity.
    Fuzzy,
    /// No match; cleaned-up original text.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    pub original: String,
    pub canonical: String,
    /// Semantic confidence in `[0, 1]`.
    pub score: f64,
    pub source: MatchSource,
}

pub trait Normalizer: Send + Sync {
    fn normalize(&self, raw: &str) -> Normalized;
}

/// Normalize every text and return the results with the mean score (0 for
/// no input).
pub fn normalize_all<N: Normalizer + ?Sized>(normalizer: &N, texts: &[&str]) -> (Vec<Normalized>, f64) {
    let normalized: Vec<Normalized> = texts.iter().map(|t| normalizer.normalize(t)).collect();
    let mean = if normalized.is_empty() {
        0.0
    } else {
        normalized.iter().map(|n| n.score).sum::<f64>() / normalized.len() as f64
    };
    (normalized, mean.min(1.0))
}

/// Dictionary-backed normalizer over the domain synonym table.
#[derive(Debug, Clone)]
pub struct DictionaryNormalizer {
    /// Normalised key and canonical name, in table order.
    entries: Vec<(String, String)>,
    min_similarity: f64,
}

impl DictionaryNormalizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::from_synonyms(DOMAIN_SYNONYMS, config.fuzzy_min_similarity)
    }

    /// Build from an explicit synonym list. Later entries for an already-seen
    /// normalised key replace its canonical name in place.
    pub fn from_synonyms(synonyms: &[(&str, &str)], min_similarity: f64) -> Self {
        let mut entries: Vec<(String, String)> = Vec::with_capacity(synonyms.len());
        for (surface, canonical) in synonyms {
            let key = normalize_key(surface);
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = canonical.to_string(),
                None => entries.push((key, canonical.to_string())),
            }
        }
        Self {
            entries,
            min_similarity,
        }
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Normalizer for DictionaryNormalizer {
    fn normalize(&self, raw: &str) -> Normalized {
        let key = normalize_key(raw);
        let result = |canonical: String, score: f64, source: MatchSource| Normalized {
            original: raw.to_string(),
            canonical,
            score,
            source,
        };

        if key.is_empty() {
            return result(raw.to_string(), 0.5, MatchSource::Exact);
        }
        if let Some(canonical) = self.lookup(&key) {
            return result(canonical.to_string(), 1.0, MatchSource::Domain);
        }
        // Very short keys would match too much ("in" inside "invoice no").
        if key.chars().count() > 3 {
            if let Some((_, canonical)) = self
                .entries
                .iter()
                .find(|(k, _)| key.contains(k.as_str()) || k.contains(key.as_str()))
            {
                return result(canonical.clone(), 0.95, MatchSource::Domain);
            }
        }
        if SHORT_COLUMN_TOKENS.contains(&key.as_str()) {
            return result(raw.trim().to_string(), 1.0, MatchSource::Exact);
        }

        if self.min_similarity > 0.0 {
            let mut best: Option<(f64, &str)> = None;
            for (k, canonical) in &self.entries {
                let similarity = strsim::normalized_levenshtein(&key, k);
                if similarity >= self.min_similarity
                    && best.map_or(true, |(s, _)| similarity > s)
                {
                    best = Some((similarity, canonical.as_str()));
                }
            }
            if let Some((similarity, canonical)) = best {
                return result(canonical.to_string(), similarity, MatchSource::Fuzzy);
            }
        }

        let trimmed = raw.trim();
        let starts_upper = trimmed.chars().next().is_some_and(|c| c.is_uppercase());
        let cleaned = if trimmed.chars().count() > 1 && starts_upper {
            trimmed.to_string()
        } else {
            title_case(trimmed)
        };
        result(cleaned, 0.6, MatchSource::Passthrough)
    }
}

fn punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid regex"))
}

/// Lowercase, punctuation to spaces, whitespace collapsed.
pub fn normalize_key(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let spaced = punctuation().replace_all(&lower, " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> DictionaryNormalizer {
        DictionaryNormalizer::new(&PipelineConfig::default())
    }

    #[test]
    fn key_normalisation() {
        assert_eq!(normalize_key("  Batch  No. "), "batch no");
        assert_eq!(normalize_key("M.R.P"), "m r p");
        assert_eq!(normalize_key("Stk.Value"), "stk value");
    }

    #[test]
    fn exact_domain_hits() {
        let n = normalizer();
        let qty = n.normalize("Qty");
        assert_eq!(qty.canonical, "Quantity");
        assert_eq!(qty.score, 1.0);
        assert_eq!(qty.source, MatchSource::Domain);
        assert_eq!(n.normalize("Batch No.").canonical, "Batch No");
        assert_eq!(n.normalize("M.R.P").canonical, "MRP");
    }

    #[test]
    fn later_synonym_overrides_earlier_key() {
        // "exp." first maps to Expiry Date, then to Exp.
        assert_eq!(normalizer().normalize("Exp.").canonical, "Exp");
        assert_eq!(normalizer().normalize("Out").canonical, "Out.");
    }

    #[test]
    fn containment_match_for_longer_keys() {
        let n = normalizer().normalize("Net Qty Sold");
        // "qty" is the first table key contained in the text.
        assert_eq!(n.canonical, "Quantity");
        assert_eq!(n.score, 0.95);
    }

    #[test]
    fn fuzzy_match_above_threshold() {
        let n = normalizer().normalize("Discont");
        assert_eq!(n.canonical, "Discount");
        assert_eq!(n.source, MatchSource::Fuzzy);
        assert!(n.score >= 0.8 && n.score < 1.0);
    }

    #[test]
    fn passthrough_title_cases_lowercase_text() {
        let n = normalizer().normalize("zzqx wvy");
        assert_eq!(n.canonical, "Zzqx Wvy");
        assert_eq!(n.score, 0.6);
        assert_eq!(n.source, MatchSource::Passthrough);
        assert_eq!(normalizer().normalize("Zzqx").canonical, "Zzqx");
    }

    #[test]
    fn empty_text_scores_half() {
        let n = normalizer().normalize("  ");
        assert_eq!(n.score, 0.5);
        assert_eq!(n.source, MatchSource::Exact);
    }

    #[test]
    fn mean_score_over_columns() {
        let (normalized, mean) = normalize_all(&normalizer(), &["Qty", "zzqx wvy"]);
        assert_eq!(normalized.len(), 2);
        assert!((mean - 0.8).abs() < 1e-12);
        let (_, empty) = normalize_all(&normalizer(), &[]);
        assert_eq!(empty, 0.0);
    }
}
