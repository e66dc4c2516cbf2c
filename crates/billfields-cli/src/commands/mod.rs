//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod extract;
pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use billfields_core::{BillConfig, BillFieldExtractor, DocumentExtractor, ExtractionReport};
use tracing::debug;

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("billfields")
        .join("config.json")
}

/// The configuration file a command works on: `--config` or the default.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration, falling back to defaults when the default file does
/// not exist. An explicit `--config` path must exist.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<BillConfig> {
    if let Some(path) = config_path {
        return Ok(BillConfig::from_file(Path::new(path))?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading configuration from {}", path.display());
        Ok(BillConfig::from_file(&path)?)
    } else {
        Ok(BillConfig::default())
    }
}

/// Build an extractor from configuration, with an optional threshold
/// override.
pub fn load_extractor(config_path: Option<&str>, threshold: Option<f32>) -> anyhow::Result<BillFieldExtractor> {
    let mut config = load_config(config_path)?;
    if let Some(threshold) = threshold {
        config.extraction.confidence_threshold = threshold;
    }

    Ok(BillFieldExtractor::from_config(&config)?)
}

/// Extract from one file: plain text when `as_text` is set or the file ends
/// in `.txt`, a JSON fragment dump otherwise.
pub fn extract_file(extractor: &BillFieldExtractor, path: &Path, as_text: bool) -> anyhow::Result<ExtractionReport> {
    let content = fs::read_to_string(path)?;
    let is_text = as_text
        || path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"));

    if is_text {
        return Ok(extractor.extract_from_text(&content));
    }

    let value: serde_json::Value = serde_json::from_str(&content)?;
    Ok(extractor.extract_value(&value)?)
}
