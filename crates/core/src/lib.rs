//! Core library for tabhead
//!
//! This crate implements the **Functional Core** of tabhead: inferring the
//! column-header row of a tabular PDF report from positioned words and drawn
//! lines alone.
//!
//! # Architecture Overview
//!
//! - **`tabhead_core`** (this crate): the inference pipeline, pure functions with zero I/O
//! - **`tabhead_pdf`**: content-stream extraction into [`types::DocumentLayout`]
//! - **`tabhead`**: batch discovery, parallel execution and report writing (the Imperative Shell)
//!
//! Every stage is a function of `(input data, &PipelineConfig)` returning
//! output data plus typed [`types::Diagnostic`] records. Nothing here reads
//! the environment or the filesystem, except [`config::PipelineConfig::from_path`].
//!
//! # Pipeline
//!
//! Per page, top to bottom:
//!
//! 1. [`locator`]: find the header row or band
//! 2. [`data_columns`]: estimate the table's column count below it
//! 3. [`reconstruct`]: join zone words into column labels
//! 4. [`filter`]: drop page numbers, titles and other non-headers
//! 5. [`repair`]: split under-counted header columns along data columns
//! 6. [`normalize`] and [`profile`]: canonical names and value-type evidence
//! 7. [`evidence`]: hard gates, evidence score and penalty-adjusted confidence
//!
//! Across pages, [`consensus`] reduces the accepted candidates to one header.
//! [`pipeline::Pipeline`] wires the two phases together.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use tabhead_core::{DocumentLayout, Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let result = pipeline.extract("stock.pdf", &layout);
//!
//! if result.has_headers() {
//!     println!("{:?} ({:.2})", result.headers, result.confidence);
//! }
//! for (page, reason) in result.rejections() {
//!     println!("page {page}: {reason}");
//! }
//! ```

pub mod config;
pub mod consensus;
pub mod data_columns;
pub mod evidence;
pub mod filter;
pub mod lexicon;
pub mod locator;
pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod reconstruct;
pub mod repair;
pub mod rows;
pub mod types;

pub use config::{ConfigError, PipelineConfig};
pub use normalize::{DictionaryNormalizer, Normalizer};
pub use pipeline::Pipeline;
pub use profile::{ColumnProfiler, TypeProfiler};
pub use types::{
    Diagnostic, DocumentLayout, DrawnLine, ExtractionResult, PageLayout, PositionedWord,
    RejectReason,
};
