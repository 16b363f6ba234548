use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use pdfoutline_core::pipeline::{Analysis, ProgressObserver, Stage};
use pdfoutline_core::profile::{DocumentType, Strategy};
use pdfoutline_core::{DocumentOutline, ExtractorConfig, OutlineEngine, OutlineError};
use pdfoutline_pdf::{DocumentMetadata, PdfDocument};

/// How many fonts to report in the metadata section.
const DOMINANT_FONTS: usize = 3;

/// Classification output for one file, optionally with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineResult {
    #[serde(flatten)]
    pub outline: DocumentOutline,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResultMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    #[serde(flatten)]
    pub document: DocumentMetadata,
    pub file_size: u64,
    pub processing_time_ms: u64,
    pub headings_count: usize,
    pub extraction_timestamp: String,
    pub extractor_version: String,
    pub document_type: DocumentType,
    pub strategy: Strategy,
    pub dominant_fonts: Vec<(String, usize)>,
}

/// Cumulative counters across every call to [`OutlineExtractor::extract_file`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingStats {
    pub files_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_headings: usize,
    pub total_time: Duration,
}

impl ProcessingStats {
    /// Percentage of processed files that succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.files_processed == 0 {
            return 0.0;
        }
        self.successful as f64 / self.files_processed as f64 * 100.0
    }

    pub fn avg_headings_per_file(&self) -> f64 {
        if self.successful == 0 {
            return 0.0;
        }
        self.total_headings as f64 / self.successful as f64
    }

    pub fn avg_time_per_file(&self) -> Duration {
        match u32::try_from(self.files_processed) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_time / n,
        }
    }
}

/// Front-end that turns a PDF path into an [`OutlineResult`].
///
/// Shared by reference across worker threads; only the statistics are
/// mutable and they sit behind a mutex.
#[derive(Debug)]
pub struct OutlineExtractor {
    engine: OutlineEngine,
    stats: Mutex<ProcessingStats>,
}

impl OutlineExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, OutlineError> {
        Ok(OutlineExtractor {
            engine: OutlineEngine::new(config)?,
            stats: Mutex::new(ProcessingStats::default()),
        })
    }

    pub fn engine(&self) -> &OutlineEngine {
        &self.engine
    }

    /// Validate, load and classify the PDF at `path`.
    pub fn extract_file(
        &self,
        path: &Path,
        include_metadata: bool,
        observer: &dyn ProgressObserver,
    ) -> Result<OutlineResult, OutlineError> {
        let started = Instant::now();
        let outcome = self.run(path, include_metadata, observer, started);
        let elapsed = started.elapsed();

        let mut stats = self.lock_stats();
        stats.files_processed += 1;
        stats.total_time += elapsed;
        match &outcome {
            Ok(result) => {
                stats.successful += 1;
                stats.total_headings += result.outline.outline.len();
                log::info!(
                    "extracted {} headings from {} in {:.2?}",
                    result.outline.outline.len(),
                    path.display(),
                    elapsed
                );
            }
            Err(e) => {
                stats.failed += 1;
                log::error!("error extracting outline from {}: {e}", path.display());
            }
        }
        outcome
    }

    /// Snapshot of the cumulative statistics.
    pub fn stats(&self) -> ProcessingStats {
        self.lock_stats().clone()
    }

    fn run(
        &self,
        path: &Path,
        include_metadata: bool,
        observer: &dyn ProgressObserver,
        started: Instant,
    ) -> Result<OutlineResult, OutlineError> {
        observer.on_stage(Stage::ExtractingBlocks);
        let document = PdfDocument::open(path)?;
        let input = document.extract_input();
        let analysis = self.engine.analyze(&input, observer);

        let metadata = include_metadata.then(|| {
            let file_size = std::fs::metadata(path).map_or(0, |m| m.len());
            build_metadata(&document, &analysis, file_size, started.elapsed())
        });

        Ok(OutlineResult {
            outline: analysis.outline,
            metadata,
        })
    }

    fn lock_stats(&self) -> MutexGuard<'_, ProcessingStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn build_metadata(
    document: &PdfDocument,
    analysis: &Analysis,
    file_size: u64,
    elapsed: Duration,
) -> ResultMetadata {
    ResultMetadata {
        document: document.metadata(),
        file_size,
        processing_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        headings_count: analysis.outline.outline.len(),
        extraction_timestamp: Utc::now().to_rfc3339(),
        extractor_version: env!("CARGO_PKG_VERSION").to_string(),
        document_type: analysis.profile.doc_type,
        strategy: analysis.profile.strategy,
        dominant_fonts: analysis.stats.dominant_fonts(DOMINANT_FONTS),
    }
}

#[cfg(test)]
mod tests {
    use pdfoutline_core::pipeline::NoopObserver;

    use super::*;
    use crate::testutil::{report_lines, write_pdf};

    fn make_extractor() -> OutlineExtractor {
        OutlineExtractor::new(&ExtractorConfig::default()).unwrap()
    }

    #[test]
    fn test_extract_file_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "report.pdf", &report_lines());

        let extractor = make_extractor();
        let result = extractor.extract_file(&path, false, &NoopObserver).unwrap();

        assert_eq!(result.outline.title, "Annual Report");
        assert!(result.metadata.is_none());
        assert!(result
            .outline
            .outline
            .iter()
            .all(|entry| entry.page == 0 && entry.text != "Annual Report"));
    }

    #[test]
    fn test_metadata_attached_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "report.pdf", &report_lines());

        let result = make_extractor()
            .extract_file(&path, true, &NoopObserver)
            .unwrap();
        let metadata = result.metadata.unwrap();

        assert_eq!(metadata.document.page_count, 1);
        assert_eq!(metadata.headings_count, result.outline.outline.len());
        assert_eq!(metadata.extractor_version, env!("CARGO_PKG_VERSION"));
        assert!(metadata.file_size > 0);
        assert!(!metadata.dominant_fonts.is_empty());
    }

    #[test]
    fn test_missing_file_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = make_extractor();

        let err = extractor
            .extract_file(&dir.path().join("nope.pdf"), false, &NoopObserver)
            .unwrap_err();
        assert!(matches!(err, OutlineError::Validation(_)));
    }

    #[test]
    fn test_stats_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_pdf(dir.path(), "report.pdf", &report_lines());
        let bad = dir.path().join("broken.pdf");
        std::fs::write(&bad, b"not a pdf at all").unwrap();

        let extractor = make_extractor();
        let headings = extractor
            .extract_file(&good, false, &NoopObserver)
            .unwrap()
            .outline
            .outline
            .len();
        assert!(extractor.extract_file(&bad, false, &NoopObserver).is_err());

        let stats = extractor.stats();
        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_headings, headings);
        assert_eq!(stats.success_rate(), 50.0);
        assert_eq!(stats.avg_headings_per_file(), headings as f64);
    }

    #[test]
    fn test_empty_stats() {
        let stats = ProcessingStats::default();
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.avg_headings_per_file(), 0.0);
        assert_eq!(stats.avg_time_per_file(), Duration::ZERO);
    }
}
