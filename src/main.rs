use anyhow::Result;
use cedear::SourceArg;
use cedear::core::log::init_logging;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where to read the BYMA ratio document from. Defaults to the configured URL.
#[derive(Args)]
struct SourceOptions {
    /// Ratio document URL
    #[arg(long, conflicts_with = "file")]
    url: Option<String>,

    /// Local ratio document
    #[arg(long)]
    file: Option<PathBuf>,
}

impl From<SourceOptions> for SourceArg {
    fn from(options: SourceOptions) -> SourceArg {
        SourceArg::from_options(options.url, options.file)
    }
}

impl From<Commands> for cedear::AppCommand {
    fn from(cmd: Commands) -> cedear::AppCommand {
        match cmd {
            Commands::Ratios { source, symbol } => cedear::AppCommand::Ratios {
                source: source.into(),
                symbol,
            },
            Commands::Calc {
                symbols,
                source,
                dual,
                export,
            } => cedear::AppCommand::Calc {
                symbols,
                source: source.into(),
                dual,
                export,
            },
            Commands::Session { source, dual } => cedear::AppCommand::Session {
                source: source.into(),
                dual,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show the CEDEAR ratio table
    Ratios {
        #[command(flatten)]
        source: SourceOptions,

        /// Show only this symbol
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Compute theoretical CEDEAR prices
    Calc {
        /// Underlying symbols, e.g. AAPL KO
        #[arg(required = true)]
        symbols: Vec<String>,

        #[command(flatten)]
        source: SourceOptions,

        /// Adjust by the MEP/CCL spread
        #[arg(long)]
        dual: bool,

        /// Write the results to a CSV file
        #[arg(long)]
        export: bool,
    },
    /// Price symbols interactively
    Session {
        #[command(flatten)]
        source: SourceOptions,

        /// Adjust by the MEP/CCL spread
        #[arg(long)]
        dual: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => cedear::cli::setup::setup(),
        Some(cmd) => cedear::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
