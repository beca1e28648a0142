use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("No PDF documents found in {0}")]
    NoDocuments(PathBuf),

    #[error("--jobs must be at least 1")]
    ZeroJobs,
}
