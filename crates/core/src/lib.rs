//! Core library for pdfoutline
//!
//! This crate implements the **Functional Core** of pdfoutline: it turns the
//! text runs of a document into a title and a hierarchical outline (H1..H3)
//! without touching the filesystem or any PDF library.
//!
//! # Architecture Overview
//!
//! The project is split into three crates:
//!
//! - **`pdfoutline_core`** (this crate): heading classification as pure functions
//! - **`pdfoutline_pdf`**: reads PDF files and produces [`types::DocumentInput`]
//! - **`pdfoutline`**: the command line, batch runner, cache and writers
//!
//! Every function here is deterministic. Given the same
//! [`types::DocumentInput`] and configuration, [`pipeline::OutlineEngine`]
//! returns the same outline, byte for byte once serialised.
//!
//! # Pipeline
//!
//! 1. [`stats`]: font-size statistics and adaptive heading thresholds
//! 2. [`detect`]: two-pass block classification, using [`noise`] and [`scoring`]
//! 3. [`title`]: first-page title selection
//! 4. [`profile`]: document type and extraction strategy
//! 5. [`hierarchy`]: ordering, de-duplication and level repair
//! 6. [`strategy`]: choice between the block outline and the [`spans`] outline
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use pdfoutline_core::config::ExtractorConfig;
//! use pdfoutline_core::pipeline::{NoopObserver, OutlineEngine};
//!
//! let engine = OutlineEngine::new(&ExtractorConfig::default())?;
//! let outline = engine.extract(&input, &NoopObserver);
//! println!("{}", serde_json::to_string_pretty(&outline)?);
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod exceptions;
pub mod hierarchy;
pub mod noise;
pub mod normalize;
pub mod patterns;
pub mod pipeline;
pub mod profile;
pub mod scoring;
pub mod spans;
pub mod stats;
pub mod strategy;
pub mod title;
pub mod types;

pub use config::ExtractorConfig;
pub use error::OutlineError;
pub use pipeline::{OutlineEngine, ProgressObserver, Stage};
pub use types::{DocumentInput, DocumentOutline, OutlineEntry};
