//! Theoretical CEDEAR price from an underlying price, a ratio and dollar rates.
//!
//! Every derived value is rounded to cents as soon as it is computed, using
//! round-half-even on the exact binary value of the float.

use crate::core::currency::RateKind;
use crate::core::market::MarketDataClient;
use crate::core::ratios::RatioTable;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::debug;

/// Rounds to two decimals, half to even.
pub fn round_cents(value: f64) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Uppercases and trims user input into the table's key form.
pub fn canonical_symbol(input: &str) -> String {
    input.trim().to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateMode {
    /// CCL only.
    #[default]
    Single,
    /// CCL for pesos, adjusted by the MEP/CCL spread.
    Dual,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rates {
    pub ccl: f64,
    pub mep: Option<f64>,
}

/// Derived prices, present only when every input was positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedPrices {
    pub adjustment_factor: Option<f64>,
    /// Theoretical CEDEAR price in USD.
    pub receipt_price: f64,
    /// Theoretical CEDEAR price in ARS.
    pub home_price: f64,
}

pub fn theoretical_prices(underlying_price: f64, ratio: u32, rates: &Rates) -> Option<DerivedPrices> {
    if underlying_price <= 0.0 || ratio == 0 || rates.ccl <= 0.0 {
        return None;
    }
    let per_unit = underlying_price / f64::from(ratio);

    let (adjustment_factor, receipt_price) = match rates.mep {
        None => (None, round_cents(per_unit)),
        Some(mep) if mep > 0.0 => {
            let factor = mep / rates.ccl;
            (Some(factor), round_cents(per_unit * factor))
        }
        Some(_) => return None,
    };
    let home_price = round_cents(receipt_price * rates.ccl);

    Some(DerivedPrices {
        adjustment_factor,
        receipt_price,
        home_price,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    pub symbol: String,
    pub underlying_price: f64,
    pub ratio: u32,
    pub rates: Rates,
    pub derived: Option<DerivedPrices>,
}

/// An input that was zero, so no price could be derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    UnderlyingPrice,
    Ratio,
    Rate(RateKind),
}

impl Display for MissingInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingInput::UnderlyingPrice => write!(f, "underlying price (USD)"),
            MissingInput::Ratio => write!(f, "ratio"),
            MissingInput::Rate(kind) => write!(f, "dollar {kind}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalculationOutcome {
    /// The symbol is not in the loaded table; nothing was fetched.
    UnknownSymbol(String),
    /// Inputs were fetched but at least one is zero.
    Incomplete {
        result: CalculationResult,
        missing: Vec<MissingInput>,
    },
    Complete(CalculationResult),
}

fn missing_inputs(underlying_price: f64, ratio: u32, rates: &Rates) -> Vec<MissingInput> {
    let mut missing = Vec::new();
    if underlying_price <= 0.0 {
        missing.push(MissingInput::UnderlyingPrice);
    }
    if ratio == 0 {
        missing.push(MissingInput::Ratio);
    }
    if rates.ccl <= 0.0 {
        missing.push(MissingInput::Rate(RateKind::Ccl));
    }
    if rates.mep.is_some_and(|mep| mep <= 0.0) {
        missing.push(MissingInput::Rate(RateKind::Mep));
    }
    missing
}

pub struct PriceCalculator {
    market: MarketDataClient,
    mode: RateMode,
}

impl PriceCalculator {
    pub fn new(market: MarketDataClient, mode: RateMode) -> Self {
        Self { market, mode }
    }

    pub async fn compute(&self, symbol: &str, table: &RatioTable) -> CalculationOutcome {
        let symbol = canonical_symbol(symbol);
        let Some(ratio) = table.get(&symbol) else {
            debug!(%symbol, "Symbol not in ratio table");
            return CalculationOutcome::UnknownSymbol(symbol);
        };

        let underlying_price = self.market.underlying_price(&symbol).await;
        let rates = self.market.rates(self.mode).await;

        let missing = missing_inputs(underlying_price, ratio, &rates);
        let result = CalculationResult {
            derived: theoretical_prices(underlying_price, ratio, &rates),
            symbol,
            underlying_price,
            ratio,
            rates,
        };

        if missing.is_empty() {
            CalculationOutcome::Complete(result)
        } else {
            CalculationOutcome::Incomplete { result, missing }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::ExchangeRateProvider;
    use crate::core::price::{PriceProvider, PriceResult};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockPrices {
        price: Option<f64>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceProvider for MockPrices {
        async fn fetch_price(&self, _symbol: &str) -> Result<PriceResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.price
                .map(|price| PriceResult {
                    price,
                    currency: "USD".to_string(),
                })
                .ok_or_else(|| anyhow!("No price data found"))
        }
    }

    struct MockRates {
        ccl: f64,
        mep: f64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExchangeRateProvider for MockRates {
        async fn get_rate(&self, kind: RateKind) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match kind {
                RateKind::Ccl => self.ccl,
                RateKind::Mep => self.mep,
            })
        }
    }

    fn setup(
        price: Option<f64>,
        ccl: f64,
        mep: f64,
        mode: RateMode,
    ) -> (PriceCalculator, Arc<MockPrices>, Arc<MockRates>) {
        let prices = Arc::new(MockPrices {
            price,
            calls: AtomicUsize::new(0),
        });
        let rates = Arc::new(MockRates {
            ccl,
            mep,
            calls: AtomicUsize::new(0),
        });
        let market = MarketDataClient::new(prices.clone(), rates.clone());
        (PriceCalculator::new(market, mode), prices, rates)
    }

    fn table() -> RatioTable {
        [("AAPL".to_string(), 10), ("KO".to_string(), 5)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_round_cents_half_even_on_binary_value() {
        assert_eq!(round_cents(15.0), 15.0);
        assert_eq!(round_cents(14.249999), 14.25);
        assert_eq!(round_cents(0.125), 0.12);
        assert_eq!(round_cents(0.375), 0.38);
        // 2.675 is stored as 2.67499999...
        assert_eq!(round_cents(2.675), 2.67);
    }

    #[test]
    fn test_single_rate_prices() {
        let rates = Rates {
            ccl: 1000.0,
            mep: None,
        };
        let derived = theoretical_prices(150.0, 10, &rates).unwrap();
        assert_eq!(derived.receipt_price, 15.0);
        assert_eq!(derived.home_price, 15000.0);
        assert!(derived.adjustment_factor.is_none());
    }

    #[test]
    fn test_dual_rate_prices() {
        let rates = Rates {
            ccl: 1000.0,
            mep: Some(950.0),
        };
        let derived = theoretical_prices(150.0, 10, &rates).unwrap();
        assert_eq!(derived.adjustment_factor, Some(0.95));
        assert_eq!(derived.receipt_price, 14.25);
        assert_eq!(derived.home_price, 14250.0);
    }

    #[test]
    fn test_intermediate_rounding_is_applied() {
        // 100 / 3 = 33.333.. is rounded to 33.33 before conversion.
        let rates = Rates {
            ccl: 1000.0,
            mep: None,
        };
        let derived = theoretical_prices(100.0, 3, &rates).unwrap();
        assert_eq!(derived.receipt_price, 33.33);
        assert_eq!(derived.home_price, 33330.0);
    }

    #[test]
    fn test_zero_inputs_have_no_prices() {
        let rates = Rates {
            ccl: 1000.0,
            mep: None,
        };
        assert!(theoretical_prices(0.0, 10, &rates).is_none());
        assert!(theoretical_prices(150.0, 0, &rates).is_none());
        let no_ccl = Rates { ccl: 0.0, mep: None };
        assert!(theoretical_prices(150.0, 10, &no_ccl).is_none());
        let no_mep = Rates {
            ccl: 1000.0,
            mep: Some(0.0),
        };
        assert!(theoretical_prices(150.0, 10, &no_mep).is_none());
    }

    #[tokio::test]
    async fn test_unknown_symbol_never_fetches() {
        let (calculator, prices, rates) = setup(Some(150.0), 1000.0, 950.0, RateMode::Dual);

        let outcome = calculator.compute("MSFT", &table()).await;
        assert_eq!(outcome, CalculationOutcome::UnknownSymbol("MSFT".to_string()));
        assert_eq!(prices.calls.load(Ordering::SeqCst), 0);
        assert_eq!(rates.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_complete_single_rate() {
        let (calculator, _, rates) = setup(Some(150.0), 1000.0, 950.0, RateMode::Single);

        let outcome = calculator.compute(" aapl ", &table()).await;
        let CalculationOutcome::Complete(result) = outcome else {
            panic!("Expected complete outcome, got {outcome:?}");
        };
        assert_eq!(result.symbol, "AAPL");
        assert_eq!(result.ratio, 10);
        assert_eq!(result.rates.mep, None);
        let derived = result.derived.unwrap();
        assert_eq!(derived.receipt_price, 15.0);
        assert_eq!(derived.home_price, 15000.0);
        // Only CCL is fetched in single mode.
        assert_eq!(rates.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_complete_dual_rate() {
        let (calculator, _, _) = setup(Some(150.0), 1000.0, 950.0, RateMode::Dual);

        let CalculationOutcome::Complete(result) = calculator.compute("AAPL", &table()).await
        else {
            panic!("Expected complete outcome");
        };
        let derived = result.derived.unwrap();
        assert_eq!(derived.receipt_price, 14.25);
        assert_eq!(derived.home_price, 14250.0);
    }

    #[tokio::test]
    async fn test_failed_price_is_incomplete() {
        let (calculator, _, _) = setup(None, 1000.0, 950.0, RateMode::Single);

        let outcome = calculator.compute("KO", &table()).await;
        let CalculationOutcome::Incomplete { result, missing } = outcome else {
            panic!("Expected incomplete outcome, got {outcome:?}");
        };
        assert_eq!(missing, vec![MissingInput::UnderlyingPrice]);
        assert_eq!(result.underlying_price, 0.0);
        assert_eq!(result.ratio, 5);
        assert_eq!(result.rates.ccl, 1000.0);
        assert!(result.derived.is_none());
    }

    #[tokio::test]
    async fn test_zero_rates_are_named() {
        let (calculator, _, _) = setup(Some(60.0), 0.0, 0.0, RateMode::Dual);

        let CalculationOutcome::Incomplete { missing, .. } = calculator.compute("KO", &table()).await
        else {
            panic!("Expected incomplete outcome");
        };
        assert_eq!(
            missing,
            vec![
                MissingInput::Rate(RateKind::Ccl),
                MissingInput::Rate(RateKind::Mep)
            ]
        );
    }
}
