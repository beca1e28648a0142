use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use colored::Colorize;
use prettytable::row;
use regex::Regex;
use tabhead_core::ExtractionResult;

use crate::prelude::{println, *};

// ---------------------------------------------------------------------------
// CSV report
// ---------------------------------------------------------------------------

/// Write one row per document: file name, confidence, then the headers,
/// padded with empty cells to the widest row.
pub fn write_csv<W: std::io::Write>(writer: W, results: &[ExtractionResult]) -> Result<()> {
    let width = results.iter().map(|r| r.headers.len()).max().unwrap_or(0);

    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["file_name".to_string(), "confidence".to_string()];
    header.extend((1..=width).map(|i| f!("header_{i}")));
    csv.write_record(&header)?;

    for result in results {
        let mut record = vec![result.source.clone(), f!("{:.3}", result.confidence)];
        record.extend(result.headers.iter().cloned());
        record.resize(width + 2, String::new());
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

pub fn write_csv_file(path: &Path, results: &[ExtractionResult]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| f!("Failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .wrap_err_with(|| f!("Failed to create report {}", path.display()))?;
    write_csv(file, results)
}

// ---------------------------------------------------------------------------
// Debug dumps
// ---------------------------------------------------------------------------

/// File stem with every character outside `[A-Za-z0-9._-]` replaced by `_`.
pub fn sanitize_stem(source: &str) -> String {
    static RE_UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = RE_UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex"));

    let stem = Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string());
    re.replace_all(&stem, "_").into_owned()
}

/// Write the full result as pretty JSON to `<dir>/<sanitised stem>_debug.json`.
pub fn write_debug_dump(dir: &Path, result: &ExtractionResult) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).wrap_err_with(|| f!("Failed to create {}", dir.display()))?;
    let path = dir.join(f!("{}_debug.json", sanitize_stem(&result.source)));
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(&path, json).wrap_err_with(|| f!("Failed to write {}", path.display()))?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Console output
// ---------------------------------------------------------------------------

/// Short status for a document: its failure, its first rejection, or "ok".
pub fn status(result: &ExtractionResult) -> String {
    if let Some(reason) = result.failure() {
        return f!("failed: {reason}");
    }
    if result.has_headers() {
        return "ok".to_string();
    }
    match result.rejections().next() {
        Some((page, reason)) => f!("page {}: {}", page + 1, reason),
        None => "no headers".to_string(),
    }
}

pub fn print_summary(results: &[ExtractionResult]) {
    let mut table = new_table();
    table.add_row(row![
        "Document".bold().cyan(),
        "Confidence".bold().cyan(),
        "Headers".bold().cyan(),
        "Status".bold().cyan()
    ]);

    for result in results {
        let confidence = f!("{:.2}", result.confidence);
        let confidence = if result.has_headers() {
            confidence.green()
        } else {
            confidence.red()
        };
        table.add_row(row![
            result.source,
            confidence,
            result.headers.join(" | "),
            status(result).bright_black()
        ]);
    }

    table.printstd();
}

pub fn summary_line(results: &[ExtractionResult]) -> String {
    let with_headers = results.iter().filter(|r| r.has_headers()).count();
    f!("processed {}, {} with headers", results.len(), with_headers)
}

pub fn print_summary_line(results: &[ExtractionResult]) {
    println!("{}", summary_line(results).bold());
}
