use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;

use pdfoutline_core::pipeline::NoopObserver;
use pdfoutline_core::ProgressObserver;

use crate::batch::{collect_inputs, run_batch, BatchOptions, BatchOutcome};
use crate::cache::{self, ResultCache};
use crate::config::{self, Overrides};
use crate::extractor::OutlineExtractor;
use crate::output::{write_outputs, OutputFormat};
use crate::prelude::{eprintln, println, *};
use crate::progress::{file_bar, StageSpinner};

const DEFAULT_WORKERS: usize = 4;
const FAST_WORKERS: usize = 6;

#[derive(Debug, clap::Args)]
pub struct App {
    /// PDF files or directories (searched recursively for *.pdf)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output directory for the result files
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Output formats to write
    #[arg(long, value_enum, value_delimiter = ',', default_value = "json")]
    pub format: Vec<OutputFormat>,

    /// Number of documents processed at once
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Use a larger worker pool
    #[arg(long)]
    pub fast: bool,

    /// Attach PDF metadata, timings and font analysis to each result
    #[arg(long)]
    pub include_metadata: bool,

    /// Ignore and do not update the result cache
    #[arg(long)]
    pub no_cache: bool,

    /// Minimum heading length in characters
    #[arg(long)]
    pub min_heading_length: Option<usize>,

    /// Maximum heading length in words
    #[arg(long)]
    pub max_heading_words: Option<usize>,

    /// Print the batch results as JSON instead of a summary table
    #[arg(long)]
    pub json: bool,
}

impl App {
    fn worker_count(&self) -> usize {
        match self.workers {
            Some(n) => n.max(1),
            None if self.fast => FAST_WORKERS,
            None => DEFAULT_WORKERS,
        }
    }
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let overrides = Overrides {
        min_heading_length: app.min_heading_length,
        max_heading_words: app.max_heading_words,
        no_cache: app.no_cache,
    };
    let config = config::load(global.config.as_deref(), &overrides)?;
    let extractor = Arc::new(OutlineExtractor::new(&config)?);

    let files = collect_inputs(&app.paths)?;
    let total = files.len();
    if !app.json {
        println!("Found {} PDF file(s)", total.to_string().bold());
    }

    let mut cache = if config.enable_cache {
        Some(ResultCache::load(cache::resolve_path(global.cache_file.as_deref())?))
    } else {
        None
    };

    // Stage spinners only make sense for one document at a time.
    let single = total == 1;
    let spinner = (single && global.verbose && !app.json)
        .then(|| Arc::new(StageSpinner::new(file_label(&files[0]))));
    let observer: Arc<dyn ProgressObserver> = match &spinner {
        Some(spinner) => spinner.clone() as Arc<dyn ProgressObserver>,
        None => Arc::new(NoopObserver),
    };
    let progress = if single || app.json {
        indicatif::ProgressBar::hidden()
    } else {
        file_bar(total)
    };
    let workers = if single { 1 } else { app.worker_count() };
    if !single && !app.json {
        println!("Using parallel processing with {workers} workers");
    }

    let options = BatchOptions {
        workers,
        include_metadata: app.include_metadata,
        observer,
        progress,
    };
    let outcome = run_batch(extractor.clone(), files, cache.as_mut(), &options).await;
    if let Some(spinner) = &spinner {
        spinner.finish();
    }

    if let Some(cache) = &cache {
        if let Err(e) = cache.save() {
            log::warn!("could not save cache: {e:#}");
        }
    }

    write_outputs(&outcome.results, &app.output, &app.format)?;

    if app.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome, &app);
        let stats = extractor.stats();
        log::info!(
            "extractor: {} processed, {:.1} headings per file, {:.2?} per file",
            stats.files_processed,
            stats.avg_headings_per_file(),
            stats.avg_time_per_file()
        );
    }

    let failed = outcome.statistics.failed;
    if failed > 0 {
        return Err(Error::BatchFailed {
            failed,
            total: outcome.statistics.total_files,
        }
        .into());
    }
    Ok(())
}

fn print_summary(outcome: &BatchOutcome, app: &App) {
    let mut table = crate::prelude::new_table();
    table.add_row(prettytable::row![
        "File".bold().cyan(),
        "Status".bold().cyan(),
        "Title".bold().cyan(),
        "Headings".bold().cyan()
    ]);

    for report in &outcome.results {
        let status = if !report.is_success() {
            "error".bright_red()
        } else if report.cached {
            "cached".bright_blue()
        } else {
            "ok".bright_green()
        };
        table.add_row(prettytable::row![
            report.filename.bright_white(),
            status,
            report.title,
            report.outline.len().to_string().bright_yellow()
        ]);
    }
    table.printstd();

    let stats = &outcome.statistics;
    println!("\nProcessing complete");
    println!("   Processed:      {}/{} files", stats.successful, stats.total_files);
    println!("   Success rate:   {:.0}%", stats.success_rate());
    println!("   Cached:         {}", stats.cached);
    println!("   Headings found: {}", stats.total_headings);
    println!("   Output folder:  {}", app.output.display());

    if stats.failed > 0 {
        eprintln!("\n{} files failed to process:", stats.failed.to_string().red());
        for report in outcome.results.iter().filter(|r| !r.is_success()) {
            eprintln!(
                "   - {}: {}",
                report.filename,
                report.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, clap::Parser)]
    struct TestCli {
        #[command(flatten)]
        app: App,
    }

    #[test]
    fn test_worker_count() {
        let cli = TestCli::parse_from(["test", "docs/"]);
        assert_eq!(cli.app.worker_count(), DEFAULT_WORKERS);

        let cli = TestCli::parse_from(["test", "docs/", "--fast"]);
        assert_eq!(cli.app.worker_count(), FAST_WORKERS);

        let cli = TestCli::parse_from(["test", "docs/", "--fast", "--workers", "2"]);
        assert_eq!(cli.app.worker_count(), 2);
    }

    #[test]
    fn test_format_list() {
        let cli = TestCli::parse_from(["test", "a.pdf", "--format", "json,md"]);
        assert_eq!(cli.app.format, vec![OutputFormat::Json, OutputFormat::Md]);

        let cli = TestCli::parse_from(["test", "a.pdf"]);
        assert_eq!(cli.app.format, vec![OutputFormat::Json]);
    }
}
