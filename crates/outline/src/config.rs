use std::path::Path;

use pdfoutline_core::ExtractorConfig;

use crate::prelude::*;

/// Flag values that override the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub min_heading_length: Option<usize>,
    pub max_heading_words: Option<usize>,
    pub no_cache: bool,
}

/// Load the TOML configuration at `path`, or the defaults, then apply `overrides`.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<ExtractorConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            ExtractorConfig::from_toml_str(&raw).map_err(|e| Error::Config {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        }
        None => ExtractorConfig::default(),
    };

    if let Some(n) = overrides.min_heading_length {
        config.min_heading_length = n;
    }
    if let Some(n) = overrides.max_heading_words {
        config.max_heading_words = n;
    }
    if overrides.no_cache {
        config.enable_cache = false;
    }
    log::debug!("effective configuration: {config:?}");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = load(None, &Overrides::default()).unwrap();
        assert_eq!(config, ExtractorConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pdfoutline.toml");
        std::fs::write(&path, "min_heading_length = 5\nmax_heading_words = 12\n").unwrap();

        let from_file = load(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(from_file.min_heading_length, 5);
        assert_eq!(from_file.max_heading_words, 12);

        let overrides = Overrides {
            max_heading_words: Some(30),
            no_cache: true,
            ..Overrides::default()
        };
        let config = load(Some(&path), &overrides).unwrap();
        assert_eq!(config.min_heading_length, 5);
        assert_eq!(config.max_heading_words, 30);
        assert!(!config.enable_cache);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("absent.toml")), &Overrides::default()).is_err());
    }
}
