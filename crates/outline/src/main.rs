use std::path::PathBuf;

use crate::prelude::*;
use clap::Parser;

mod batch;
mod cache;
mod config;
mod error;
mod extract;
mod extractor;
mod info;
mod output;
mod prelude;
mod progress;

#[cfg(test)]
mod testutil;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Extract a title and a flat H1-H3 outline from PDF documents"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// TOML file with extractor settings
    #[clap(long, env = "PDFOUTLINE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Result cache location
    #[clap(long, env = "PDFOUTLINE_CACHE_FILE", global = true)]
    cache_file: Option<PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "PDFOUTLINE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Extract outlines from PDF files or directories
    Extract(crate::extract::App),

    /// Show metadata and the document profile of one PDF
    Info(crate::info::App),

    /// Inspect or clear the result cache
    Cache(crate::cache::App),
}

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();

    let default_level = if app.global.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    color_eyre::install()?;

    match app.command {
        SubCommands::Extract(sub_app) => crate::extract::run(sub_app, app.global).await,
        SubCommands::Info(sub_app) => crate::info::run(sub_app, app.global).await,
        SubCommands::Cache(sub_app) => crate::cache::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
