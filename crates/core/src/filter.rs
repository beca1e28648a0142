//! Anti-noise filter: drops reconstructed columns whose text is structurally
//! not a header (page numbers, titles, stray data, company names).

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::lexicon::{ALLOWED_COMPOUNDS, NEGATIVE_LEXICON, SKIP_EXACT};
use crate::types::{reindex_columns, Diagnostic, ReconstructedHeaderColumn};

/// Longest text still considered a header label.
const MAX_HEADER_CHARS: usize = 120;

/// Most space-separated tokens in one header label.
const MAX_HEADER_TOKENS: usize = 12;

/// Mixed-case text longer than this reads as a company name.
const MAX_MIXED_CASE_CHARS: usize = 40;

/// Columns that survived the filter plus the raw texts removed as noise.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub columns: Vec<ReconstructedHeaderColumn>,
    pub noise: Vec<String>,
}

impl FilterOutcome {
    pub fn diagnostics(&self, page: usize) -> Vec<Diagnostic> {
        self.noise
            .iter()
            .map(|text| Diagnostic::NoiseRemoved {
                page,
                text: text.clone(),
            })
            .collect()
    }
}

pub fn filter_noise(columns: Vec<ReconstructedHeaderColumn>) -> FilterOutcome {
    let mut noise = Vec::new();
    let mut kept: Vec<ReconstructedHeaderColumn> = Vec::with_capacity(columns.len());
    for column in columns {
        if is_likely_header(&column.text) {
            kept.push(column);
        } else {
            debug!("dropping noise column {:?}", column.text);
            noise.push(column.text.trim().to_string());
        }
    }
    reindex_columns(&mut kept);
    FilterOutcome {
        columns: kept,
        noise,
    }
}

/// Whether `text` can plausibly be a column header.
pub fn is_likely_header(text: &str) -> bool {
    let t = text.trim();
    if t.is_empty() || t.chars().count() > MAX_HEADER_CHARS {
        return false;
    }
    let lower = t.to_lowercase();
    if SKIP_EXACT.contains(&lower.as_str()) {
        return false;
    }
    if skip_patterns().iter().any(|re| re.is_match(&lower)) {
        return false;
    }
    let mut chars = t.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_digit() || c.is_alphabetic() {
            return false;
        }
    }
    if t.split_whitespace().count() > MAX_HEADER_TOKENS {
        return false;
    }
    !is_isolated_noise(&lower) && !fails_header_shape(t)
}

fn skip_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            r"^page\s*\d*$",
            r"^\d+$",
            r"^:$",
            r"^\.$",
            r"^\d+\s*/\s*\d+$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    })
}

/// A negative-lexicon word standing alone, unless it belongs to a known
/// compound header ("invoice date").
fn is_isolated_noise(lower: &str) -> bool {
    let t = lower.trim();
    if t.is_empty() {
        return true;
    }
    if ALLOWED_COMPOUNDS
        .iter()
        .any(|c| c.contains(t) || t.contains(c))
    {
        return false;
    }
    if NEGATIVE_LEXICON.contains(&t) {
        return true;
    }
    let mut tokens = t.split_whitespace();
    matches!((tokens.next(), tokens.next()), (Some(only), None) if NEGATIVE_LEXICON.contains(&only))
}

fn date_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            r"\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}",
            r"\d{4}[/\-.]\d{1,2}[/\-.]\d{1,2}",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
    })
}

fn page_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^page\s*\d+|^\d+\s*/\s*\d+$").expect("valid regex"))
}

/// Sentences, embedded dates, page numbering and long mixed-case text.
fn fails_header_shape(t: &str) -> bool {
    if t.ends_with('.') && t.split_whitespace().count() >= 5 {
        return true;
    }
    if date_patterns().iter().any(|re| re.is_match(t)) {
        return true;
    }
    if page_prefix().is_match(&t.to_lowercase()) {
        return true;
    }
    t.chars().count() > MAX_MIXED_CASE_CHARS && t != t.to_uppercase() && t != t.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PositionedWord;

    fn column(text: &str, x0: f32) -> ReconstructedHeaderColumn {
        ReconstructedHeaderColumn::from_words(
            vec![PositionedWord::new(text, x0, 10.0, x0 + 40.0, 18.0)],
            1.0,
        )
    }

    #[test]
    fn removes_page_numbers_and_digits_keeps_batch_no() {
        let outcome = filter_noise(vec![
            column("Page 1 of 5", 0.0),
            column("3", 50.0),
            column("Batch No", 100.0),
        ]);
        let texts: Vec<_> = outcome.columns.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Batch No"]);
        assert_eq!(outcome.noise, vec!["Page 1 of 5".to_string(), "3".to_string()]);
        assert_eq!(outcome.columns[0].index, 0);
    }

    #[test]
    fn skip_set_and_patterns() {
        for text in ["page", ":", ".", "", "Page 2", "12", "3 / 10", "x", "7"] {
            assert!(!is_likely_header(text), "{text:?} should be noise");
        }
    }

    #[test]
    fn negative_lexicon_isolated_words() {
        assert!(!is_likely_header("Duplicate"));
        assert!(!is_likely_header("GSTIN"));
        assert!(!is_likely_header("Confidential"));
        assert!(!is_likely_header("Sales Report"));
        assert!(is_likely_header("Invoice Date"));
        assert!(is_likely_header("Stock Statement"));
        // "stock" is contained in the allowed compound "stock report".
        assert!(is_likely_header("Stock"));
    }

    #[test]
    fn shape_failures() {
        assert!(!is_likely_header("This report was generated by the system."));
        assert!(!is_likely_header("As on 01/11/2025"));
        assert!(!is_likely_header("Page1"));
        assert!(!is_likely_header("Sunrise Healthcare Distributors Private Co Ltd"));
        assert!(is_likely_header("SUNRISE HEALTHCARE DISTRIBUTORS PRIVATE LTD"));
    }

    #[test]
    fn too_many_tokens_is_a_data_row() {
        assert!(!is_likely_header("a b c d e f g h i j k l m"));
        assert!(is_likely_header("Cl Qty"));
    }

    #[test]
    fn noise_diagnostics_carry_page() {
        let outcome = filter_noise(vec![column("Page", 0.0), column("Qty", 50.0)]);
        assert_eq!(
            outcome.diagnostics(4),
            vec![Diagnostic::NoiseRemoved {
                page: 4,
                text: "Page".to_string()
            }]
        );
    }
}
