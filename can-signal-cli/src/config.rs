//! Configuration loading and parsing
//!
//! Optional TOML file holding defaults for the command line options.

use anyhow::{Context, Result};
use can_signal_decoder::DecoderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub filtering: FilteringConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SchemaConfig {
    /// JSON signal table file
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub skip_malformed: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub bits: bool,
    #[serde(default)]
    pub verbosity: u8,
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilteringConfig {
    pub message_ids: Option<Vec<u32>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { jobs: default_jobs() }
    }
}

fn default_jobs() -> usize {
    1
}

impl AppConfig {
    /// Decoder library settings derived from this configuration
    pub fn decoder_config(&self) -> DecoderConfig {
        let config = DecoderConfig::new().with_skip_malformed_records(self.schema.skip_malformed);
        match &self.filtering.message_ids {
            Some(ids) => config.with_message_filter(ids.clone()),
            None => config,
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
