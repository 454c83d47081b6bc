use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::calculator::round_cents;
use crate::core::price::{PriceProvider, PriceResult};

// YahooFinanceProvider implementation for PriceProvider
pub struct YahooFinanceProvider {
    base_url: String,
    timeout: Duration,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[derive(Deserialize, Debug)]
struct YahooPriceResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Option<Vec<PriceChartItem>>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: PriceChartMeta,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    currency: Option<String>,
}

fn latest_close(item: &PriceChartItem) -> Option<f64> {
    item.indicators
        .as_ref()
        .and_then(|inds| inds.quote.first())
        .and_then(|q| q.close.as_ref())
        .and_then(|closes| closes.iter().rev().find_map(|c| *c))
        .or(item.meta.regular_market_price)
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooPriceFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_price(&self, symbol: &str) -> Result<PriceResult> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url, symbol
        );
        debug!("Requesting price data from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("cedear/1.0")
            .timeout(self.timeout)
            .build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: YahooPriceResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let item = data
            .chart
            .result
            .as_ref()
            .and_then(|items| items.first())
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

        let price = latest_close(item)
            .ok_or_else(|| anyhow!("No close price found for symbol: {}", symbol))?;

        Ok(PriceResult {
            price: round_cents(price),
            currency: item.meta.currency.clone().unwrap_or_else(|| "USD".to_string()),
        })
    }
}
