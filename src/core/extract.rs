//! Text extraction strategies and the policy that ranks them.

use crate::core::ratios::{RatioParser, RatioTable};
use anyhow::Result;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, info, warn};

/// Turns raw document bytes into plain text.
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// Runs `extractor`, turning any error or panic into an empty string.
///
/// The process panic hook is left alone, so a panicking extractor still has its
/// message printed to stderr by the default hook before it is caught here.
pub fn extract_or_empty(extractor: &dyn TextExtractor, bytes: &[u8]) -> String {
    match catch_unwind(AssertUnwindSafe(|| extractor.extract(bytes))) {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            debug!(strategy = extractor.name(), error = %e, "Text extraction failed");
            String::new()
        }
        Err(payload) => {
            warn!(
                strategy = extractor.name(),
                panic = panic_message(payload.as_ref()),
                "Text extraction panicked"
            );
            String::new()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// The ratio table read from a document, with the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRatios {
    pub table: RatioTable,
    pub strategy: &'static str,
    pub low_quality: bool,
}

/// Ranked extraction strategies plus the quality bar that decides whether the
/// next one is tried.
pub struct ExtractionPolicy {
    strategies: Vec<Box<dyn TextExtractor>>,
    parser: RatioParser,
    quality_threshold: usize,
}

impl ExtractionPolicy {
    /// `strategies` are tried in the given order.
    pub fn new(
        strategies: Vec<Box<dyn TextExtractor>>,
        parser: RatioParser,
        quality_threshold: usize,
    ) -> Self {
        Self {
            strategies,
            parser,
            quality_threshold,
        }
    }

    /// Parses the document with each strategy until one clears the quality bar.
    /// A later strategy replaces the current best only with strictly more symbols.
    pub fn run(&self, bytes: &[u8]) -> ExtractedRatios {
        let mut best: Option<(RatioTable, &'static str)> = None;

        for extractor in &self.strategies {
            let text = extract_or_empty(extractor.as_ref(), bytes);
            let table = self.parser.parse(&text);
            debug!(
                strategy = extractor.name(),
                chars = text.len(),
                symbols = table.len(),
                "Extraction strategy finished"
            );

            if best
                .as_ref()
                .is_none_or(|(current, _)| table.len() > current.len())
            {
                best = Some((table, extractor.name()));
            }
            if best
                .as_ref()
                .is_some_and(|(current, _)| !current.is_low_quality(self.quality_threshold))
            {
                break;
            }
        }

        let (table, strategy) = best.unwrap_or_else(|| (RatioTable::new(), "none"));
        let low_quality = table.is_low_quality(self.quality_threshold);
        info!(strategy, symbols = table.len(), low_quality, "Ratio table ready");

        ExtractedRatios {
            table,
            strategy,
            low_quality,
        }
    }
}
