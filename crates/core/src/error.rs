use thiserror::Error;

/// Failure taxonomy shared by every layer of the outline pipeline.
///
/// The engine itself never retries: classification is a pure function of its
/// input, so a retry without new input reproduces the same failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutlineError {
    /// The input was rejected before classification started (missing file,
    /// not a document, empty, encrypted, unreadable first page).
    #[error("Invalid document: {0}")]
    Validation(String),

    /// The underlying PDF access layer failed while reading the document.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// The engine configuration is malformed.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}
