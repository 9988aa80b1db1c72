use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

impl Config {
    /// Reads a config file. JSON is valid YAML, so both formats load.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            bail!("base_url must not be empty");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        Ok(())
    }

    /// Ids to fetch: `[start_id, start_id + total_nfts)`.
    pub fn fetch_range(&self) -> Range<u64> {
        self.start_id..self.start_id.saturating_add(self.total_nfts)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub total_nfts: u64,
    pub folder_path: PathBuf,
    pub start_id: u64,
    pub batch_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
