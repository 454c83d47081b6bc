//! The context injected into every user action, and the per-session state.

use crate::core::cache::Cache;
use crate::core::calculator::{
    CalculationOutcome, CalculationResult, MissingInput, PriceCalculator, RateMode,
};
use crate::core::config::AppConfig;
use crate::core::currency::{ExchangeRateProvider, RateKind};
use crate::core::extract::{ExtractedRatios, ExtractionPolicy};
use crate::core::history::{ExportFormat, HistoryEntry, SessionHistory};
use crate::core::market::MarketDataClient;
use crate::core::price::PriceProvider;
use crate::core::ratios::RatioParser;
use crate::core::source::{DocumentSource, SourceError, SourceLoader};
use crate::providers::dolarapi::DolarApiProvider;
use crate::providers::pdf_text::default_strategies;
use crate::providers::yahoo_finance::YahooFinanceProvider;
use crate::store::memory::MemoryCache;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Services shared by all actions: the cached loader and the calculator.
pub struct AppContext {
    pub loader: SourceLoader,
    pub calculator: PriceCalculator,
    pub export_dir: PathBuf,
    pub export_format: ExportFormat,
}

impl AppContext {
    /// Builds the production context, with `mode` overriding the configured rate mode.
    pub fn from_config(config: &AppConfig, mode: Option<RateMode>) -> Self {
        let policy = ExtractionPolicy::new(
            default_strategies(),
            RatioParser::new(config.parser.fallback_pass()),
            config.parser.quality_threshold,
        );
        Self::with_policy(config, policy, mode)
    }

    pub fn with_policy(config: &AppConfig, policy: ExtractionPolicy, mode: Option<RateMode>) -> Self {
        let ratio_cache: Arc<dyn Cache<String, ExtractedRatios>> =
            Arc::new(MemoryCache::<String, ExtractedRatios>::new());
        let loader = SourceLoader::new(
            &config.source.default_url,
            config.source_timeout(),
            policy,
            ratio_cache,
            config.source_ttl(),
        );

        let yahoo = &config.providers.yahoo;
        let prices: Arc<dyn PriceProvider> = Arc::new(YahooFinanceProvider::new(
            &yahoo.base_url,
            Duration::from_secs(yahoo.timeout_secs),
        ));

        let dolar = &config.providers.dolarapi;
        let rate_cache: Arc<dyn Cache<RateKind, f64>> = Arc::new(MemoryCache::<RateKind, f64>::new());
        let rates: Arc<dyn ExchangeRateProvider> = Arc::new(DolarApiProvider::new(
            &dolar.base_url,
            Duration::from_secs(dolar.timeout_secs),
            rate_cache,
            Duration::from_secs(dolar.cache_ttl_secs),
        ));

        let mode = mode.unwrap_or(config.pricing.rate_mode);
        Self {
            loader,
            calculator: PriceCalculator::new(MarketDataClient::new(prices, rates), mode),
            export_dir: config.export_dir(),
            export_format: config.export_format,
        }
    }
}

fn describe_missing(missing: &[MissingInput]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why a calculation request produced no price.
#[derive(Debug, Error)]
pub enum CalculationError {
    #[error("No ratios loaded; check the ratio document source")]
    NoRatiosLoaded,
    #[error("{0} is not in the loaded BYMA ratio table")]
    UnknownSymbol(String),
    #[error("Could not fetch all inputs for {}: {}", .result.symbol, describe_missing(.missing))]
    IncompleteInputs {
        result: CalculationResult,
        missing: Vec<MissingInput>,
    },
}

/// One user session: the loaded table and the calculations made so far.
pub struct Session<'a> {
    context: &'a AppContext,
    ratios: Option<ExtractedRatios>,
    history: SessionHistory,
}

impl<'a> Session<'a> {
    pub fn new(context: &'a AppContext) -> Self {
        Self {
            context,
            ratios: None,
            history: SessionHistory::new(),
        }
    }

    pub fn ratios(&self) -> Option<&ExtractedRatios> {
        self.ratios.as_ref()
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    /// Loads (or reuses from cache) the ratio table for `source`. On failure the
    /// previously loaded table is dropped.
    pub async fn load(&mut self, source: &DocumentSource) -> Result<&ExtractedRatios, SourceError> {
        self.ratios = None;
        let extracted = self.context.loader.load(source).await?;
        if extracted.low_quality {
            warn!(
                symbols = extracted.table.len(),
                "Few symbols detected; the document may have an unusual layout"
            );
        }
        Ok(self.ratios.insert(extracted))
    }

    /// Drops the cached table for `source` and loads it again.
    pub async fn reload(&mut self, source: &DocumentSource) -> Result<&ExtractedRatios, SourceError> {
        self.context.loader.invalidate(source).await;
        self.load(source).await
    }

    /// Computes `symbol` and records it in the history when complete.
    pub async fn calculate(&mut self, symbol: &str) -> Result<&HistoryEntry, CalculationError> {
        let ratios = match &self.ratios {
            Some(ratios) if !ratios.table.is_empty() => ratios,
            _ => return Err(CalculationError::NoRatiosLoaded),
        };

        match self.context.calculator.compute(symbol, &ratios.table).await {
            CalculationOutcome::UnknownSymbol(symbol) => Err(CalculationError::UnknownSymbol(symbol)),
            CalculationOutcome::Incomplete { result, missing } => {
                debug!(symbol = %result.symbol, ?missing, "Calculation incomplete");
                Err(CalculationError::IncompleteInputs { result, missing })
            }
            CalculationOutcome::Complete(result) => Ok(self.history.record(result)),
        }
    }

    pub fn export(&self) -> anyhow::Result<PathBuf> {
        self.history
            .export(&self.context.export_dir, self.context.export_format)
    }
}
