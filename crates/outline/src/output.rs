//! Result writers: per-file JSON outlines plus text and Markdown summaries.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use pdfoutline_core::DocumentOutline;

use crate::batch::FileReport;
use crate::prelude::*;

const TEXT_REPORT: &str = "extraction_results.txt";
const MARKDOWN_REPORT: &str = "extraction_results.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One `<stem>.json` per document with the title and outline
    Json,
    /// Indented outline of every document in one text file
    Txt,
    /// Markdown summary of every document
    Md,
}

/// Write every requested format into `dir` and return the files created.
pub fn write_outputs(reports: &[FileReport], dir: &Path, formats: &[OutputFormat]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).wrap_err_with(|| f!("Failed to create output directory {}", dir.display()))?;

    let mut written = Vec::new();
    for format in formats {
        match format {
            OutputFormat::Json => written.extend(write_json(reports, dir)?),
            OutputFormat::Txt => {
                let path = dir.join(TEXT_REPORT);
                fs::write(&path, render_text(reports))?;
                written.push(path);
            }
            OutputFormat::Md => {
                let path = dir.join(MARKDOWN_REPORT);
                fs::write(&path, render_markdown(reports))?;
                written.push(path);
            }
        }
    }
    for path in &written {
        log::info!("saved {}", path.display());
    }
    Ok(written)
}

/// Failed documents get no JSON file.
fn write_json(reports: &[FileReport], dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for report in reports.iter().filter(|r| r.is_success()) {
        let outline = DocumentOutline {
            title: report.title.clone(),
            outline: report.outline.clone(),
        };
        let path = dir.join(json_name(&report.filename));
        fs::write(&path, serde_json::to_string_pretty(&outline)?)
            .wrap_err_with(|| f!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

fn json_name(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    f!("{stem}.json")
}

pub fn render_text(reports: &[FileReport]) -> String {
    let mut out = String::new();
    out.push_str("PDF Outline Extraction Results\n");
    out.push_str(&"=".repeat(50));
    out.push_str("\n\n");

    for report in reports.iter().filter(|r| r.is_success()) {
        let _ = writeln!(out, "File: {}", report.filename);
        let title = if report.title.is_empty() {
            "No title"
        } else {
            &report.title
        };
        let _ = writeln!(out, "Title: {title}");
        out.push_str(&"-".repeat(30));
        out.push('\n');

        for entry in &report.outline {
            let indent = "  ".repeat(usize::from(entry.level.as_u8()) - 1);
            let _ = writeln!(out, "{indent}- {} (Page {})", entry.text, entry.page);
        }
        out.push('\n');
    }
    out
}

pub fn render_markdown(reports: &[FileReport]) -> String {
    let mut out = String::from("# PDF Outline Extraction Results\n\n");

    for report in reports {
        let _ = writeln!(out, "## {}\n", escape_markdown(&report.filename));
        if let Some(error) = &report.error {
            let _ = writeln!(out, "**Error:** {}\n", escape_markdown(error));
            out.push_str("---\n\n");
            continue;
        }
        if !report.title.is_empty() {
            let _ = writeln!(out, "**Title:** {}\n", escape_markdown(&report.title));
        }

        out.push_str("### Outline\n\n");
        if report.outline.is_empty() {
            out.push_str("_No headings found._\n");
        }
        for entry in &report.outline {
            let indent = "  ".repeat(usize::from(entry.level.as_u8()) - 1);
            let _ = writeln!(
                out,
                "{indent}- {} *(page {})*",
                escape_markdown(&entry.text),
                entry.page
            );
        }
        out.push_str("\n---\n\n");
    }
    out
}

/// Backslash-escape characters Markdown would otherwise interpret.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '`' | '*' | '_' | '{' | '}' | '[' | ']' | '(' | ')' | '#' | '+' | '!' | '|' | '<' | '>'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pdfoutline_core::types::HeadingLevel;
    use pdfoutline_core::OutlineEntry;

    use super::*;

    fn make_entry(level: HeadingLevel, text: &str, page: usize) -> OutlineEntry {
        OutlineEntry {
            level,
            text: text.to_string(),
            page,
        }
    }

    fn make_success() -> FileReport {
        FileReport {
            filename: "annual_report.pdf".to_string(),
            path: PathBuf::from("in/annual_report.pdf"),
            status: crate::batch::Status::Success,
            cached: false,
            title: "Annual Report".to_string(),
            outline: vec![
                make_entry(HeadingLevel::H1, "Introduction", 0),
                make_entry(HeadingLevel::H2, "1.1 Scope_and*Aims", 1),
            ],
            metadata: None,
            error: None,
        }
    }

    fn make_failure() -> FileReport {
        FileReport {
            filename: "broken.pdf".to_string(),
            path: PathBuf::from("in/broken.pdf"),
            status: crate::batch::Status::Error,
            cached: false,
            title: String::new(),
            outline: Vec::new(),
            metadata: None,
            error: Some("File is not a PDF".to_string()),
        }
    }

    #[test]
    fn test_json_contains_only_title_and_outline() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_outputs(&[make_success(), make_failure()], dir.path(), &[OutputFormat::Json]).unwrap();

        assert_eq!(written, vec![dir.path().join("annual_report.json")]);
        let raw = fs::read_to_string(&written[0]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "title": "Annual Report",
                "outline": [
                    {"level": "H1", "text": "Introduction", "page": 0},
                    {"level": "H2", "text": "1.1 Scope_and*Aims", "page": 1},
                ]
            })
        );
    }

    #[test]
    fn test_text_report_indents_levels() {
        let text = render_text(&[make_success(), make_failure()]);
        assert!(text.starts_with("PDF Outline Extraction Results\n"));
        assert!(text.contains("File: annual_report.pdf\nTitle: Annual Report\n"));
        assert!(text.contains("- Introduction (Page 0)\n"));
        assert!(text.contains("  - 1.1 Scope_and*Aims (Page 1)\n"));
        assert!(!text.contains("broken.pdf"));
    }

    #[test]
    fn test_markdown_escapes_text() {
        let md = render_markdown(&[make_success(), make_failure()]);
        assert!(md.contains("## annual\\_report.pdf"));
        assert!(md.contains("  - 1.1 Scope\\_and\\*Aims *(page 1)*"));
        assert!(md.contains("**Error:** File is not a PDF"));
    }

    #[test]
    fn test_all_formats_written() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_outputs(
            &[make_success()],
            dir.path(),
            &[OutputFormat::Json, OutputFormat::Txt, OutputFormat::Md],
        )
        .unwrap();
        assert_eq!(written.len(), 3);
        assert!(dir.path().join(TEXT_REPORT).exists());
        assert!(dir.path().join(MARKDOWN_REPORT).exists());
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a*b_c"), "a\\*b\\_c");
        assert_eq!(escape_markdown("plain text"), "plain text");
    }
}
