use std::path::{Path, PathBuf};

use crate::prelude::*;

/// PDF files directly inside `folder`, sorted case-insensitively by file
/// name and optionally truncated to `max_docs`.
pub fn discover_documents(folder: &Path, max_docs: Option<usize>) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(Error::NotADirectory(folder.to_path_buf()).into());
    }

    let walker = ignore::WalkBuilder::new(folder)
        .max_depth(Some(1))
        .standard_filters(false)
        .build();

    let mut documents = Vec::new();
    for entry in walker {
        let entry = entry.wrap_err_with(|| f!("Failed to list {}", folder.display()))?;
        let path = entry.path();
        let is_file = entry.file_type().is_some_and(|t| t.is_file());
        if is_file && is_pdf(path) {
            documents.push(path.to_path_buf());
        }
    }

    documents.sort_by_key(|p| sort_key(p));
    if let Some(limit) = max_docs {
        documents.truncate(limit);
    }

    log::debug!(
        "discovered {} documents in {}",
        documents.len(),
        folder.display()
    );
    Ok(documents)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn sort_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_discovers_pdfs_case_insensitively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_stock.PDF"), b"").unwrap();
        fs::write(dir.path().join("A_sales.pdf"), b"").unwrap();
        fs::write(dir.path().join("c_notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("d.pdf"), b"").unwrap();

        let found = discover_documents(dir.path(), None).unwrap();
        assert_eq!(names(&found), vec!["A_sales.pdf", "b_stock.PDF"]);
    }

    #[test]
    fn test_max_docs_limits_after_sorting() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.pdf", "a.pdf", "b.pdf"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let found = discover_documents(dir.path(), Some(2)).unwrap();
        assert_eq!(names(&found), vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_documents(&dir.path().join("missing"), None).is_err());
    }

    #[test]
    fn test_empty_folder_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_documents(dir.path(), None).unwrap().is_empty());
    }
}
