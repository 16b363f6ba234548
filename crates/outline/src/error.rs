#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("Path does not exist: {0}")]
    MissingPath(String),

    #[error("Not a PDF file: {0}")]
    NotPdf(String),

    #[error("No PDF files found in {0}")]
    NoInput(String),

    #[error("Cannot read configuration file {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("{failed} of {total} files failed to process")]
    BatchFailed { failed: usize, total: usize },
}
