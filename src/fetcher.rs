use crate::config::Config;
use crate::metadata::NftMetadata;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Something that can hand back the raw metadata document for a token id.
pub trait MetadataSource: Sync {
    /// One attempt, no retry. Any `Err` means "no result" for this id.
    fn fetch(&self, id: u64) -> Result<String>;
}

/// Fetches `<base_url>/<id>` over HTTP.
#[derive(Debug)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, id: u64) -> String {
        format!("{}/{}", self.base_url, id)
    }
}

impl MetadataSource for HttpSource {
    fn fetch(&self, id: u64) -> Result<String> {
        let url = self.url_for(id);
        let resp = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("request failed: {url}"))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("GET {url} returned {status}");
        }

        resp.text()
            .with_context(|| format!("failed to read response body: {url}"))
    }
}

/// Fetches one document, parses it and writes the raw body to `path`.
///
/// Returns `None` (after a warning) when the fetch or parse fails. A failed
/// write is only warned about; the parsed item is still returned.
pub fn fetch_and_persist(source: &dyn MetadataSource, id: u64, path: &Path) -> Option<NftMetadata> {
    let body = match source.fetch(id) {
        Ok(body) => body,
        Err(err) => {
            log::warn!("failed to download metadata for {}: {err:#}", path.display());
            return None;
        }
    };

    let metadata: NftMetadata = match serde_json::from_str(&body) {
        Ok(m) => m,
        Err(err) => {
            log::warn!("metadata for token {id} is not valid JSON: {err}");
            return None;
        }
    };

    match fs::write(path, &body) {
        Ok(()) => log::info!("downloaded {}", path.display()),
        Err(err) => log::warn!("failed to write {}: {err}", path.display()),
    }

    Some(metadata)
}
