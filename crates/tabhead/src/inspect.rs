use std::path::PathBuf;

use colored::Colorize;
use prettytable::row;
use tabhead_core::{Diagnostic, ExtractionResult, Pipeline};

use crate::prelude::{println, *};
use crate::{report, runner};

#[derive(Debug, clap::Args, Clone)]
pub struct InspectOptions {
    /// Path to the PDF file
    path: PathBuf,

    /// Output the full result as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(options: InspectOptions, global: crate::Global) -> Result<()> {
    let config = global.pipeline_config()?;
    let path = options.path.clone();

    let result = tokio::task::spawn_blocking(move || {
        runner::process_document(&path, &Pipeline::new(config))
    })
    .await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        output_formatted(&result);
    }

    Ok(())
}

fn output_formatted(result: &ExtractionResult) {
    println!("\n{} {}\n", "==".bold().cyan(), result.source.bold());

    let mut table = new_table();
    table.add_row(row!["#".bold().cyan(), "Header".bold().cyan()]);
    for (i, header) in result.headers.iter().enumerate() {
        table.add_row(row![i + 1, header.bright_white()]);
    }
    table.printstd();

    let scores = &result.breakdown;
    let mut breakdown = new_table();
    breakdown.add_row(row!["Confidence".bold().cyan(), f!("{:.3}", result.confidence)]);
    breakdown.add_row(row!["Visual".bold().cyan(), f!("{:.3}", scores.visual)]);
    breakdown.add_row(row![
        "Reconstruction".bold().cyan(),
        f!("{:.3}", scores.reconstruction)
    ]);
    breakdown.add_row(row!["Semantic".bold().cyan(), f!("{:.3}", scores.semantic)]);
    breakdown.add_row(row![
        "Data validation".bold().cyan(),
        f!("{:.3}", scores.data_validation)
    ]);
    breakdown.add_row(row!["Consensus".bold().cyan(), f!("{:.3}", scores.consensus)]);
    println!();
    breakdown.printstd();

    println!("\n{}", "Reasons".bold().cyan());
    for line in reasons(result) {
        println!("  {}", line);
    }
    println!("\n{}", report::status(result));
}

/// One line per zone choice, rejection or failure, in diagnostic order.
fn reasons(result: &ExtractionResult) -> Vec<String> {
    result
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            Diagnostic::ZoneDetected(zone) => Some(f!(
                "page {}: zone {:.1}..{:.1} ({})",
                zone.page + 1,
                zone.y_min,
                zone.y_max,
                zone.reason
            )),
            Diagnostic::Rejected { page, reason } => {
                Some(f!("page {}: rejected, {}", page + 1, reason))
            }
            Diagnostic::Empty { reason } => Some(f!("empty: {reason}")),
            Diagnostic::Failed { reason } => Some(f!("failed: {reason}")),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabhead_core::RejectReason;

    #[test]
    fn test_reasons_list_rejections_and_failures() {
        let mut result = ExtractionResult::empty(
            "stock.pdf",
            vec![
                Diagnostic::Rejected {
                    page: 0,
                    reason: RejectReason::TooFewColumns { columns: 2 },
                },
                Diagnostic::Empty {
                    reason: "no_accepted_candidate".to_string(),
                },
            ],
        );
        assert_eq!(
            reasons(&result),
            vec![
                f!("page 1: rejected, {}", RejectReason::TooFewColumns { columns: 2 }),
                "empty: no_accepted_candidate".to_string(),
            ]
        );

        result = ExtractionResult::failed("stock.pdf", "Document is encrypted");
        assert_eq!(reasons(&result), vec!["failed: Document is encrypted"]);
    }
}
