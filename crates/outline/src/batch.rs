use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::Serialize;

use pdfoutline_core::pipeline::NoopObserver;
use pdfoutline_core::{OutlineEntry, ProgressObserver};

use crate::cache::{hash_file, ResultCache};
use crate::extractor::{OutlineExtractor, OutlineResult, ResultMetadata};
use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Outcome for one input file. Failures carry an empty title and outline.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub filename: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub status: Status,
    pub cached: bool,
    pub title: String,
    pub outline: Vec<OutlineEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResultMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    fn success(path: PathBuf, result: OutlineResult, cached: bool) -> Self {
        FileReport {
            filename: file_label(&path),
            path,
            status: Status::Success,
            cached,
            title: result.outline.title,
            outline: result.outline.outline,
            metadata: result.metadata,
            error: None,
        }
    }

    fn failure(path: PathBuf, error: String) -> Self {
        FileReport {
            filename: file_label(&path),
            path,
            status: Status::Error,
            cached: false,
            title: String::new(),
            outline: Vec::new(),
            metadata: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchStats {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub cached: usize,
    pub total_headings: usize,
    pub start_time: String,
    pub end_time: String,
}

impl BatchStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total_files as f64 * 100.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub statistics: BatchStats,
    pub results: Vec<FileReport>,
}

pub struct BatchOptions {
    /// Upper bound on documents processed at once.
    pub workers: usize,
    pub include_metadata: bool,
    /// Per-document stage observer.
    pub observer: Arc<dyn ProgressObserver>,
    /// Advanced once per finished file.
    pub progress: ProgressBar,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            workers: 4,
            include_metadata: false,
            observer: Arc::new(NoopObserver),
            progress: ProgressBar::hidden(),
        }
    }
}

// ---------------------------------------------------------------------------
// Batch runner
// ---------------------------------------------------------------------------

/// Process `paths` on a bounded pool of blocking workers.
///
/// Cache lookups happen before dispatch and cache writes happen here, on
/// the coordinating task, as each worker finishes. Results come back in
/// input order. One file failing never affects the others.
pub async fn run_batch(
    extractor: Arc<OutlineExtractor>,
    paths: Vec<PathBuf>,
    mut cache: Option<&mut ResultCache>,
    options: &BatchOptions,
) -> BatchOutcome {
    let start_time = Utc::now().to_rfc3339();
    let total_files = paths.len();
    let mut slots: Vec<Option<FileReport>> = vec![None; total_files];
    let mut pending = Vec::new();

    for (index, path) in paths.into_iter().enumerate() {
        let hash = cache.as_ref().and_then(|_| match hash_file(&path) {
            Ok(hash) => Some(hash),
            Err(e) => {
                log::debug!("not hashing {}: {e}", path.display());
                None
            }
        });

        let hit = match (&cache, &hash) {
            (Some(cache), Some(hash)) => cache
                .get(hash)
                .filter(|entry| !options.include_metadata || entry.result.metadata.is_some())
                .map(|entry| entry.result.clone()),
            _ => None,
        };

        match hit {
            Some(mut result) => {
                log::info!("using cached result for {}", path.display());
                if !options.include_metadata {
                    result.metadata = None;
                }
                slots[index] = Some(FileReport::success(path, result, true));
                options.progress.inc(1);
            }
            None => pending.push((index, path, hash)),
        }
    }

    let workers = options.workers.max(1);
    let include_metadata = options.include_metadata;
    let mut finished = stream::iter(pending.into_iter().map(|(index, path, hash)| {
        let extractor = extractor.clone();
        let observer = options.observer.clone();
        async move {
            let job_path = path.clone();
            let joined = tokio::task::spawn_blocking(move || {
                extractor.extract_file(&job_path, include_metadata, observer.as_ref())
            })
            .await;
            (index, path, hash, joined)
        }
    }))
    .buffer_unordered(workers);

    while let Some((index, path, hash, joined)) = finished.next().await {
        options.progress.set_message(file_label(&path));
        options.progress.inc(1);

        let report = match joined {
            Ok(Ok(result)) => {
                if let (Some(cache), Some(hash)) = (cache.as_deref_mut(), hash) {
                    cache.insert(hash, file_label(&path), result.clone());
                }
                FileReport::success(path, result, false)
            }
            Ok(Err(e)) => FileReport::failure(path, e.to_string()),
            Err(e) => FileReport::failure(path, Error::Worker(e.to_string()).to_string()),
        };
        slots[index] = Some(report);
    }
    options.progress.finish_and_clear();

    let results: Vec<FileReport> = slots.into_iter().flatten().collect();
    let successful = results.iter().filter(|r| r.is_success()).count();
    let statistics = BatchStats {
        total_files,
        successful,
        failed: results.len() - successful,
        cached: results.iter().filter(|r| r.cached).count(),
        total_headings: results.iter().map(|r| r.outline.len()).sum(),
        start_time,
        end_time: Utc::now().to_rfc3339(),
    };
    log::info!(
        "batch complete: {}/{} successful, {} cached",
        statistics.successful,
        statistics.total_files,
        statistics.cached
    );

    BatchOutcome { statistics, results }
}

/// Expand files and directories into the PDF files to process.
///
/// Directories are walked recursively for `*.pdf` (any case); the result is
/// sorted so batches are reproducible.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.exists() {
            return Err(Error::MissingPath(input.display().to_string()).into());
        }
        if input.is_file() {
            if !has_pdf_extension(input) {
                return Err(Error::NotPdf(input.display().to_string()).into());
            }
            files.push(input.clone());
            continue;
        }

        let before = files.len();
        for entry in ignore::WalkBuilder::new(input).standard_filters(false).build() {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && has_pdf_extension(path) {
                files.push(path.to_path_buf());
            }
        }
        if files.len() == before {
            return Err(Error::NoInput(input.display().to_string()).into());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

#[cfg(test)]
mod tests {
    use pdfoutline_core::ExtractorConfig;

    use super::*;
    use crate::testutil::{report_lines, write_pdf};

    fn make_extractor() -> Arc<OutlineExtractor> {
        Arc::new(OutlineExtractor::new(&ExtractorConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_pdf(dir.path(), "a_report.pdf", &report_lines());
        let broken = dir.path().join("b_broken.pdf");
        std::fs::write(&broken, b"this is not a pdf").unwrap();
        let second = write_pdf(dir.path(), "c_report.pdf", &report_lines());

        let outcome = run_batch(
            make_extractor(),
            vec![first, broken, second],
            None,
            &BatchOptions::default(),
        )
        .await;

        let names: Vec<&str> = outcome.results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a_report.pdf", "b_broken.pdf", "c_report.pdf"]);
        assert_eq!(outcome.statistics.total_files, 3);
        assert_eq!(outcome.statistics.successful, 2);
        assert_eq!(outcome.statistics.failed, 1);
        assert_eq!(outcome.statistics.cached, 0);

        let failure = &outcome.results[1];
        assert_eq!(failure.status, Status::Error);
        assert!(failure.error.is_some());
        assert!(failure.title.is_empty() && failure.outline.is_empty());
    }

    #[tokio::test]
    async fn test_second_run_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "report.pdf", &report_lines());
        let mut cache = ResultCache::load(dir.path().join("cache.json"));
        let extractor = make_extractor();

        let first = run_batch(
            extractor.clone(),
            vec![path.clone()],
            Some(&mut cache),
            &BatchOptions::default(),
        )
        .await;
        assert_eq!(first.statistics.cached, 0);
        assert_eq!(cache.len(), 1);

        let second = run_batch(
            extractor.clone(),
            vec![path],
            Some(&mut cache),
            &BatchOptions::default(),
        )
        .await;
        assert_eq!(second.statistics.cached, 1);
        assert!(second.results[0].cached);
        assert_eq!(second.results[0].title, first.results[0].title);
        assert_eq!(second.results[0].outline, first.results[0].outline);
        // Only the first run reached the extractor.
        assert_eq!(extractor.stats().files_processed, 1);
    }

    #[tokio::test]
    async fn test_cache_without_metadata_misses_when_metadata_requested() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "report.pdf", &report_lines());
        let mut cache = ResultCache::load(dir.path().join("cache.json"));
        let extractor = make_extractor();

        run_batch(extractor.clone(), vec![path.clone()], Some(&mut cache), &BatchOptions::default()).await;

        let options = BatchOptions {
            include_metadata: true,
            ..BatchOptions::default()
        };
        let outcome = run_batch(extractor, vec![path], Some(&mut cache), &options).await;
        assert_eq!(outcome.statistics.cached, 0);
        assert!(outcome.results[0].metadata.is_some());
    }

    #[test]
    fn test_collect_inputs_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF-").unwrap();
        std::fs::write(nested.join("a.PDF"), b"%PDF-").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"text").unwrap();

        let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files, vec![dir.path().join("b.pdf"), nested.join("a.PDF")]);
    }

    #[test]
    fn test_collect_inputs_rejects_bad_paths() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_inputs(&[dir.path().join("missing.pdf")]).is_err());
        assert!(collect_inputs(&[dir.path().to_path_buf()]).is_err());

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"text").unwrap();
        assert!(collect_inputs(&[text]).is_err());
    }
}
