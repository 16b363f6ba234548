use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::extractor::OutlineResult;
use crate::prelude::{println, *};

#[derive(Debug, clap::Parser)]
#[command(name = "cache")]
#[command(about = "Inspect or clear the result cache")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Print the cache location and entry count
    Show,
    /// Remove every cached result
    Clear,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let path = resolve_path(global.cache_file.as_deref())?;
    let mut cache = ResultCache::load(path);

    match app.command {
        Commands::Show => {
            println!("{}", cache.path().display());
            if cache.is_empty() {
                println!("Cache is empty");
            } else {
                println!("{} cached results", cache.len());
            }
        }
        Commands::Clear => {
            let removed = cache.len();
            cache.clear();
            cache.save()?;
            println!("Removed {removed} cached results");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Cache store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub filename: String,
    pub result: OutlineResult,
    pub timestamp: String,
}

/// Extraction results keyed by the SHA-256 of the file content.
///
/// Only the coordinating task mutates the cache; workers hand their
/// results back and never touch it.
#[derive(Debug)]
pub struct ResultCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
}

/// `--cache-file` when given, otherwise `<user cache dir>/pdfoutline/cache.json`.
pub fn resolve_path(cache_file: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cache_file {
        return Ok(path.to_path_buf());
    }
    let cache_dir = dirs_next::cache_dir().ok_or_eyre("Unable to determine cache directory")?;
    Ok(cache_dir.join("pdfoutline").join("cache.json"))
}

impl ResultCache {
    /// Read the cache at `path`. A missing or corrupt file yields an empty cache.
    pub fn load(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("ignoring unreadable cache {}: {e}", path.display());
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                log::warn!("could not read cache {}: {e}", path.display());
                BTreeMap::new()
            }
        };
        ResultCache { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, hash: &str) -> Option<&CacheEntry> {
        self.entries.get(hash)
    }

    pub fn insert(&mut self, hash: String, filename: String, result: OutlineResult) {
        let entry = CacheEntry {
            filename,
            result,
            timestamp: Utc::now().to_rfc3339(),
        };
        self.entries.insert(hash, entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| f!("Failed to create cache directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)
            .wrap_err_with(|| f!("Failed to write cache {}", self.path.display()))?;
        log::debug!("saved {} cache entries to {}", self.len(), self.path.display());
        Ok(())
    }
}

/// Hex SHA-256 of the file content.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(f!("{:x}", hasher.finalize()))
}
