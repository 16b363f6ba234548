use std::path::PathBuf;

use colored::Colorize;
use serde::Serialize;

use pdfoutline_core::pipeline::NoopObserver;
use pdfoutline_core::profile::DocumentProfile;
use pdfoutline_core::DocumentOutline;
use pdfoutline_pdf::{DocumentMetadata, PdfDocument};

use crate::config::{self, Overrides};
use crate::extractor::OutlineExtractor;
use crate::prelude::{println, *};

/// Print document metadata and how the classifier sees the document
#[derive(Debug, clap::Args)]
pub struct App {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct DocumentReport {
    metadata: DocumentMetadata,
    profile: DocumentProfile,
    median_font_size: f32,
    dominant_fonts: Vec<(String, usize)>,
    #[serde(flatten)]
    outline: DocumentOutline,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let config = config::load(global.config.as_deref(), &Overrides::default())?;
    let extractor = OutlineExtractor::new(&config)?;

    let path = app.path.clone();
    let report = tokio::task::spawn_blocking(move || -> Result<DocumentReport> {
        let document = PdfDocument::open(&path).map_err(|e| eyre!(e))?;
        let input = document.extract_input();
        let analysis = extractor.engine().analyze(&input, &NoopObserver);
        Ok(DocumentReport {
            metadata: document.metadata(),
            median_font_size: analysis.stats.median,
            dominant_fonts: analysis.stats.dominant_fonts(3),
            profile: analysis.profile,
            outline: analysis.outline,
        })
    })
    .await
    .map_err(|e| Error::Worker(e.to_string()))??;

    if app.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let DocumentReport {
        metadata,
        profile,
        median_font_size,
        dominant_fonts,
        outline,
    } = report;
    let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    let fonts = dominant_fonts
        .iter()
        .map(|(name, count)| f!("{name} ({count})"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut table = crate::prelude::new_table();
    table.add_row(prettytable::row!["Title".bold().cyan(), outline.title]);
    table.add_row(prettytable::row!["Pages".bold().cyan(), metadata.page_count]);
    table.add_row(prettytable::row!["Author".bold().cyan(), or_dash(metadata.author)]);
    table.add_row(prettytable::row!["Subject".bold().cyan(), or_dash(metadata.subject)]);
    table.add_row(prettytable::row!["Creator".bold().cyan(), or_dash(metadata.creator)]);
    table.add_row(prettytable::row!["Producer".bold().cyan(), or_dash(metadata.producer)]);
    table.add_row(prettytable::row![
        "Document type".bold().cyan(),
        f!("{:?}", profile.doc_type).to_lowercase()
    ]);
    table.add_row(prettytable::row!["Strategy".bold().cyan(), profile.strategy]);
    table.add_row(prettytable::row!["Blocks".bold().cyan(), profile.block_count]);
    table.add_row(prettytable::row!["Characters".bold().cyan(), profile.total_chars]);
    table.add_row(prettytable::row!["Median size".bold().cyan(), f!("{median_font_size:.1}")]);
    table.add_row(prettytable::row!["Fonts".bold().cyan(), fonts]);
    table.add_row(prettytable::row!["Headings".bold().cyan(), outline.outline.len()]);
    table.printstd();

    Ok(())
}
