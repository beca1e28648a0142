//! Pipeline configuration.
//!
//! A single immutable [`PipelineConfig`] is threaded by reference into every
//! stage. The defaults carry the tuned constants; a TOML file may override any
//! subset of them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Weights of the five component scores in the combined confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub visual: f64,
    pub reconstruction: f64,
    pub semantic: f64,
    pub data_validation: f64,
    pub consensus: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            visual: 0.25,
            reconstruction: 0.25,
            semantic: 0.20,
            data_validation: 0.20,
            consensus: 0.10,
        }
    }
}

impl ConfidenceWeights {
    pub fn sum(&self) -> f64 {
        self.visual + self.reconstruction + self.semantic + self.data_validation + self.consensus
    }
}

/// Weights of the independent evidence signals used by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceWeights {
    pub keyword: f64,
    pub column_alignment: f64,
    pub data_validation: f64,
    pub lexical_purity: f64,
    pub multi_page: f64,
}

impl Default for EvidenceWeights {
    fn default() -> Self {
        Self {
            keyword: 0.25,
            column_alignment: 0.25,
            data_validation: 0.25,
            lexical_purity: 0.15,
            multi_page: 0.10,
        }
    }
}

impl EvidenceWeights {
    pub fn sum(&self) -> f64 {
        self.keyword + self.column_alignment + self.data_validation + self.lexical_purity + self.multi_page
    }
}

/// Tuning knobs for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // -- Row/zone locator --
    /// Words whose top lies below this fraction of the page height are footer.
    pub footer_band_ratio: f32,
    /// Lower bound of the accepted font band, as a multiple of the median.
    pub font_band_min: f32,
    /// Upper bound of the accepted font band, as a multiple of the median.
    pub font_band_max: f32,
    /// Maximum vertical distance (points) between words of one text row.
    pub row_y_tolerance: f32,
    /// Fraction of content height searched by the keyword fallbacks.
    pub keyword_search_ratio: f32,
    /// Fraction of content height searched by the largest-font fallback.
    pub font_search_ratio: f32,
    /// Height of one scanning band.
    pub band_height: f32,
    /// Overlap between consecutive bands, as a fraction of `band_height`.
    pub band_overlap: f32,
    /// Maximum band-based zone height as a fraction of page height.
    pub band_max_height_ratio: f32,
    /// Minimum words a band needs to be scored.
    pub min_words_in_band: usize,
    /// A band gets the font boost when its mean font is at least this
    /// multiple of the page median.
    pub font_boost_threshold: f32,
    pub font_boost: f64,
    /// Distinct text rows a band-based zone may span.
    pub max_zone_rows: usize,
    /// Slack above a band window within which word midpoints still belong
    /// to the zone.
    pub zone_margin_above: f32,
    /// Slack below a band window within which stacked header lines still
    /// belong to the zone.
    pub zone_margin_below: f32,
    /// How far below a band a horizontal rule may sit and still count.
    pub separator_proximity: f32,
    pub separator_boost: f64,

    // -- Reconstruction --
    /// Same-row tolerance used when reconstructing columns.
    pub y_proximity: f32,
    /// Intervals closer than this are merged when inferring column bounds.
    pub interval_merge_gap: f32,
    /// Merge adjacent columns that spell a known compound label.
    pub compound_merge: bool,

    // -- Data columns --
    /// Text rows below the zone sampled for the data-column estimate.
    pub data_row_sample: usize,
    /// Same-row tolerance for data rows.
    pub data_row_tolerance: f32,

    // -- Semantic normalization --
    /// Minimum normalized similarity for a fuzzy dictionary hit.
    pub fuzzy_min_similarity: f64,

    // -- Data validation --
    /// Words below the zone sampled by the profiler.
    pub profile_word_sample: usize,
    /// Cells sampled per column.
    pub sample_cells_per_column: usize,

    // -- Evidence gate --
    /// Maximum tolerated |header - data| column difference.
    pub column_diff_tolerance: usize,
    /// Excess header columns tolerated when the header outnumbers the data.
    pub excess_tolerance: usize,
    pub header_range_min: usize,
    pub header_range_max: usize,
    pub min_header_columns: usize,
    pub evidence_threshold: f64,
    pub evidence_weights: EvidenceWeights,
    pub merged_column_penalty: f64,
    pub noise_word_penalty: f64,
    pub type_mismatch_penalty: f64,
    pub title_zone_penalty: f64,
    /// Cap applied to each per-token penalty family.
    pub penalty_cap: f64,
    pub domain_boost: f64,

    // -- Combination --
    pub weights: ConfidenceWeights,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            footer_band_ratio: 0.85,
            font_band_min: 0.3,
            font_band_max: 3.0,
            row_y_tolerance: 5.0,
            keyword_search_ratio: 0.55,
            font_search_ratio: 0.40,
            band_height: 15.0,
            band_overlap: 0.5,
            band_max_height_ratio: 0.25,
            min_words_in_band: 2,
            font_boost_threshold: 1.15,
            font_boost: 1.5,
            max_zone_rows: 5,
            zone_margin_above: 10.0,
            zone_margin_below: 12.0,
            separator_proximity: 20.0,
            separator_boost: 1.1,
            y_proximity: 5.0,
            interval_merge_gap: 2.0,
            compound_merge: true,
            data_row_sample: 20,
            data_row_tolerance: 5.0,
            fuzzy_min_similarity: 0.80,
            profile_word_sample: 200,
            sample_cells_per_column: 50,
            column_diff_tolerance: 1,
            excess_tolerance: 8,
            header_range_min: 5,
            header_range_max: 25,
            min_header_columns: 3,
            evidence_threshold: 0.35,
            evidence_weights: EvidenceWeights::default(),
            merged_column_penalty: 0.15,
            noise_word_penalty: 0.15,
            type_mismatch_penalty: 0.20,
            title_zone_penalty: 0.30,
            penalty_cap: 0.4,
            domain_boost: 0.08,
            weights: ConfidenceWeights::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a (possibly partial) TOML document on top of the defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const EPSILON: f64 = 1e-3;

        let weights = self.weights.sum();
        if (weights - 1.0).abs() > EPSILON {
            return Err(ConfigError::Invalid(format!(
                "confidence weights must sum to 1.0, got {:.3}",
                weights
            )));
        }
        let evidence = self.evidence_weights.sum();
        if (evidence - 1.0).abs() > EPSILON {
            return Err(ConfigError::Invalid(format!(
                "evidence weights must sum to 1.0, got {:.3}",
                evidence
            )));
        }
        for (name, value) in [
            ("row_y_tolerance", self.row_y_tolerance),
            ("y_proximity", self.y_proximity),
            ("data_row_tolerance", self.data_row_tolerance),
            ("band_height", self.band_height),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("column_diff_tolerance", self.column_diff_tolerance),
            ("excess_tolerance", self.excess_tolerance),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        if !(0.0..1.0).contains(&self.band_overlap) {
            return Err(ConfigError::Invalid(format!(
                "band_overlap must be in [0, 1), got {}",
                self.band_overlap
            )));
        }
        if self.font_band_min >= self.font_band_max {
            return Err(ConfigError::Invalid(format!(
                "font band is inverted: {} >= {}",
                self.font_band_min, self.font_band_max
            )));
        }
        if self.header_range_min > self.header_range_max {
            return Err(ConfigError::Invalid(format!(
                "header range is inverted: {} > {}",
                self.header_range_min, self.header_range_max
            )));
        }
        Ok(())
    }

    /// Step between consecutive band origins.
    pub fn band_step(&self) -> f32 {
        self.band_height * (1.0 - self.band_overlap)
    }
}
