use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedsConfig {
    pub countries: PathBuf,
    pub admin1: PathBuf,
    pub admin2: PathBuf,
    /// First-pass city extract.
    pub cities: PathBuf,
    /// Broader files processed after the city pass.
    #[serde(default)]
    pub places: Vec<PathBuf>,
    pub alternates: Option<PathBuf>,
    pub postal: Option<PathBuf>,
    /// Timezone polygon GeoJSON, plain or gzipped.
    pub timezones: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Records from this 2-letter country are processed first.
    #[serde(default = "default_priority_country")]
    pub priority_country: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            priority_country: default_priority_country(),
        }
    }
}

fn default_priority_country() -> String {
    "US".to_string()
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
