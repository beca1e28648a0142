use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tabhead_core::{ExtractionResult, Pipeline};

use crate::prelude::*;

/// The name a document is reported under.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read one document and run the pipeline over it.
///
/// Extraction failures never escape: they become a failed, zero-confidence
/// result so the rest of the batch carries on.
pub fn process_document(path: &Path, pipeline: &Pipeline) -> ExtractionResult {
    let source = source_name(path);
    match tabhead_pdf::read_layout_from_path(path) {
        Ok(layout) => pipeline.extract(&source, &layout),
        Err(e) => {
            log::warn!("{}: {}", source, e);
            ExtractionResult::failed(source, e.to_string())
        }
    }
}

/// Process documents on the blocking pool, at most `jobs` at a time.
///
/// Results come back in the order of `paths`.
pub async fn run_batch(
    paths: Vec<PathBuf>,
    pipeline: Arc<Pipeline>,
    jobs: usize,
    progress: &ProgressBar,
) -> Vec<ExtractionResult> {
    stream::iter(paths)
        .map(|path| {
            let pipeline = Arc::clone(&pipeline);
            async move {
                let source = source_name(&path);
                match tokio::task::spawn_blocking(move || process_document(&path, &pipeline)).await
                {
                    Ok(result) => result,
                    Err(e) => {
                        log::warn!("{}: worker failed: {}", source, e);
                        ExtractionResult::failed(source, f!("worker failed: {e}"))
                    }
                }
            }
        })
        .buffered(jobs.max(1))
        .inspect(|result| {
            progress.set_message(result.source.clone());
            progress.inc(1);
        })
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_unreadable_document_is_a_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"not a pdf").unwrap();

        let result = process_document(&path, &Pipeline::default());
        assert_eq!(result.source, "broken.pdf");
        assert!(result.headers.is_empty());
        assert_eq!(result.confidence, 0.0);
        assert!(result.failure().is_some());
    }

    #[test]
    fn test_missing_document_is_a_failed_result() {
        let result = process_document(Path::new("/nonexistent/stock.pdf"), &Pipeline::default());
        assert_eq!(result.source, "stock.pdf");
        assert!(result.failure().is_some());
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["a.pdf", "b.pdf", "c.pdf", "d.pdf", "e.pdf"];
        let paths: Vec<PathBuf> = names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                fs::write(&path, b"garbage").unwrap();
                path
            })
            .collect();

        let progress = ProgressBar::hidden();
        let results = run_batch(paths, Arc::new(Pipeline::default()), 3, &progress).await;

        let sources: Vec<_> = results.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, names);
        assert!(results.iter().all(|r| r.failure().is_some()));
        assert_eq!(progress.position(), 5);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let progress = ProgressBar::hidden();
        let results = run_batch(Vec::new(), Arc::new(Pipeline::default()), 4, &progress).await;
        assert!(results.is_empty());
    }
}
