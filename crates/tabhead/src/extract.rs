use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tabhead_core::Pipeline;

use crate::prelude::{eprintln, *};
use crate::{discovery, report, runner};

#[derive(Debug, clap::Args, Clone)]
pub struct ExtractOptions {
    /// Folder holding the PDF reports (not searched recursively)
    #[clap(env = "TABHEAD_INPUT")]
    folder: PathBuf,

    /// CSV report path
    #[arg(short, long, env = "TABHEAD_OUTPUT", default_value = "headers.csv")]
    output: PathBuf,

    /// Write one JSON dump per document into this directory
    #[arg(long, env = "TABHEAD_DEBUG_DIR")]
    debug_dir: Option<PathBuf>,

    /// Process at most this many documents
    #[arg(long, env = "TABHEAD_MAX_DOCS")]
    max_docs: Option<usize>,

    /// Documents processed concurrently
    #[arg(short, long, env = "TABHEAD_JOBS", default_value = "4")]
    jobs: usize,

    /// Skip the per-document summary table
    #[arg(long)]
    quiet: bool,
}

pub async fn run(options: ExtractOptions, global: crate::Global) -> Result<()> {
    if options.jobs == 0 {
        return Err(Error::ZeroJobs.into());
    }

    let config = global.pipeline_config()?;
    let documents = discovery::discover_documents(&options.folder, options.max_docs)?;
    if documents.is_empty() {
        return Err(Error::NoDocuments(options.folder.clone()).into());
    }
    log::info!(
        "processing {} documents with {} jobs",
        documents.len(),
        options.jobs
    );

    let progress = ProgressBar::new(documents.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .wrap_err("Invalid progress template")?
            .progress_chars("=> "),
    );

    let pipeline = Arc::new(Pipeline::new(config));
    let results = runner::run_batch(documents, pipeline, options.jobs, &progress).await;
    progress.finish_and_clear();

    report::write_csv_file(&options.output, &results)?;
    log::info!("wrote {}", options.output.display());

    if let Some(dir) = &options.debug_dir {
        for result in &results {
            let path = report::write_debug_dump(dir, result)?;
            log::debug!("wrote {}", path.display());
        }
    }

    if !options.quiet {
        report::print_summary(&results);
    }
    report::print_summary_line(&results);

    let failed = results.iter().filter(|r| r.failure().is_some()).count();
    if failed > 0 {
        eprintln!("{} documents could not be read", failed);
    }

    Ok(())
}
