//! Fetches the ratio document and caches the table parsed from it.

use crate::core::cache::Cache;
use crate::core::extract::{ExtractedRatios, ExtractionPolicy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Where the ratio document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// The configured default location.
    Default,
    Url(String),
    /// Bytes supplied by the user.
    Upload(Vec<u8>),
}

impl DocumentSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        std::fs::read(path)
            .map(DocumentSource::Upload)
            .map_err(|source| SourceError::Upload {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Identity of the source for caching. Uploads are keyed by content hash so
    /// that identical bytes share an entry.
    pub fn cache_key(&self) -> String {
        match self {
            DocumentSource::Default => "default".to_string(),
            DocumentSource::Url(url) => format!("url:{url}"),
            DocumentSource::Upload(bytes) => format!("upload:{}", blake3::hash(bytes).to_hex()),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error {status} fetching {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("Timed out fetching {url}")]
    Timeout { url: String },
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },
    #[error("Could not read {}: {source}", .path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout {
                url: url.to_string(),
            }
        } else {
            SourceError::Network {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}

pub struct SourceLoader {
    default_url: String,
    timeout: Duration,
    ttl: Duration,
    policy: ExtractionPolicy,
    cache: Arc<dyn Cache<String, ExtractedRatios>>,
}

impl SourceLoader {
    pub fn new(
        default_url: &str,
        timeout: Duration,
        policy: ExtractionPolicy,
        cache: Arc<dyn Cache<String, ExtractedRatios>>,
        ttl: Duration,
    ) -> Self {
        Self {
            default_url: default_url.to_string(),
            timeout,
            ttl,
            policy,
            cache,
        }
    }

    /// Returns the document bytes. No retry on failure.
    pub async fn fetch_bytes(&self, source: &DocumentSource) -> Result<Vec<u8>, SourceError> {
        match source {
            DocumentSource::Default => self.fetch_url(&self.default_url).await,
            DocumentSource::Url(url) => self.fetch_url(url).await,
            DocumentSource::Upload(bytes) => Ok(bytes.clone()),
        }
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        debug!("Requesting ratio document from {}", url);
        let client = reqwest::Client::builder()
            .user_agent("cedear/1.0")
            .timeout(self.timeout)
            .build()
            .map_err(|e| SourceError::from_reqwest(url, e))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(url, e))?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status(),
                url: url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::from_reqwest(url, e))?;
        debug!(bytes = bytes.len(), "Received ratio document");
        Ok(bytes.to_vec())
    }

    /// Forgets the cached table for `source` so the next load fetches it again.
    pub async fn invalidate(&self, source: &DocumentSource) {
        self.cache.invalidate(&source.cache_key()).await;
    }

    /// Loads the ratio table for `source`, reusing a cached table while it is fresh.
    pub async fn load(&self, source: &DocumentSource) -> Result<ExtractedRatios, SourceError> {
        let key = source.cache_key();
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let bytes = self.fetch_bytes(source).await?;
        let extracted = self.policy.run(&bytes);
        info!(
            source = %key,
            symbols = extracted.table.len(),
            strategy = extracted.strategy,
            "Loaded ratio table"
        );

        self.cache.put(key, extracted.clone(), Some(self.ttl)).await;
        Ok(extracted)
    }
}
