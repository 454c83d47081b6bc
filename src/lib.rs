pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::cli::SourceArg;
pub use crate::core::config;

use crate::core::calculator::RateMode;
use crate::core::session::AppContext;
use anyhow::Result;
use tracing::{debug, info};

/// A user action, independent of how it was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Load the ratio table and show it, or one symbol's ratio.
    Ratios {
        source: SourceArg,
        symbol: Option<String>,
    },
    /// Price each symbol within one session.
    Calc {
        symbols: Vec<String>,
        source: SourceArg,
        dual: bool,
        export: bool,
    },
    /// Interactive session over stdin.
    Session { source: SourceArg, dual: bool },
}

fn mode_override(dual: bool) -> Option<RateMode> {
    dual.then_some(RateMode::Dual)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("cedear starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Ratios { source, symbol } => {
            let context = AppContext::from_config(&config, None);
            cli::ratios::run(&context, &source, symbol.as_deref()).await
        }
        AppCommand::Calc {
            symbols,
            source,
            dual,
            export,
        } => {
            let context = AppContext::from_config(&config, mode_override(dual));
            cli::calc::run(&context, &source, &symbols, export).await
        }
        AppCommand::Session { source, dual } => {
            let context = AppContext::from_config(&config, mode_override(dual));
            cli::session::run(&context, &source).await
        }
    }
}
