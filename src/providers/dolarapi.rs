use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::cache::Cache;
use crate::core::currency::{ExchangeRateProvider, RateKind};

/// Dollar quotes from dolarapi.com, cached per kind.
pub struct DolarApiProvider {
    base_url: String,
    timeout: Duration,
    cache: Arc<dyn Cache<RateKind, f64>>,
    ttl: Duration,
}

impl DolarApiProvider {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        cache: Arc<dyn Cache<RateKind, f64>>,
        ttl: Duration,
    ) -> Self {
        DolarApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            cache,
            ttl,
        }
    }

    fn endpoint(kind: RateKind) -> &'static str {
        match kind {
            RateKind::Ccl => "/v1/dolares/contadoconliqui",
            RateKind::Mep => "/v1/dolares/bolsa",
        }
    }
}

#[derive(Debug, Deserialize)]
struct DolarResponse {
    venta: f64,
}

#[async_trait]
impl ExchangeRateProvider for DolarApiProvider {
    #[instrument(name = "DolarApiRateFetch", skip(self), fields(kind = %kind))]
    async fn get_rate(&self, kind: RateKind) -> Result<f64> {
        if let Some(cached) = self.cache.get(&kind).await {
            return Ok(cached);
        }

        let url = format!("{}{}", self.base_url, Self::endpoint(kind));
        debug!("Requesting dollar rate from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("cedear/1.0")
            .timeout(self.timeout)
            .build()?;

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for rate: {}", e, kind))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for rate: {}",
                response.status(),
                kind
            ));
        }

        let text = response.text().await?;
        let data: DolarResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", kind, e))?;

        self.cache.put(kind, data.venta, Some(self.ttl)).await;
        Ok(data.venta)
    }
}
