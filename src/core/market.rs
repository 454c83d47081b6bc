//! Live inputs for a calculation, degraded to `0.0` when a source fails.

use crate::core::calculator::{RateMode, Rates};
use crate::core::currency::{ExchangeRateProvider, RateKind};
use crate::core::price::PriceProvider;
use std::sync::Arc;
use tracing::warn;

/// Combines the underlying price source with the dollar rate source.
#[derive(Clone)]
pub struct MarketDataClient {
    prices: Arc<dyn PriceProvider>,
    rates: Arc<dyn ExchangeRateProvider>,
}

impl MarketDataClient {
    pub fn new(prices: Arc<dyn PriceProvider>, rates: Arc<dyn ExchangeRateProvider>) -> Self {
        Self { prices, rates }
    }

    /// Latest close in USD, or `0.0` if it could not be fetched.
    /// A quote in another currency is used as is, with a warning.
    pub async fn underlying_price(&self, symbol: &str) -> f64 {
        match self.prices.fetch_price(symbol).await {
            Ok(result) => {
                if result.currency != "USD" {
                    warn!(
                        symbol,
                        currency = %result.currency,
                        "Underlying is not quoted in USD"
                    );
                }
                result.price
            }
            Err(e) => {
                warn!(symbol, error = %e, "Underlying price unavailable");
                0.0
            }
        }
    }

    /// Sale rate for `kind`, or `0.0` if it could not be fetched.
    pub async fn rate(&self, kind: RateKind) -> f64 {
        match self.rates.get_rate(kind).await {
            Ok(rate) => rate,
            Err(e) => {
                warn!(%kind, error = %e, "Dollar rate unavailable");
                0.0
            }
        }
    }

    pub async fn rates(&self, mode: RateMode) -> Rates {
        let ccl = self.rate(RateKind::Ccl).await;
        let mep = match mode {
            RateMode::Single => None,
            RateMode::Dual => Some(self.rate(RateKind::Mep).await),
        };
        Rates { ccl, mep }
    }
}
