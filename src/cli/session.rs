use super::calc::{calculate_and_print, export_history};
use super::{SourceArg, load_ratios, ui};
use crate::core::session::{AppContext, Session};
use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

/// One line of interactive input.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Empty,
    Calculate(String),
    History,
    Export,
    Ratios,
    Reload,
    Quit,
}

impl ReplCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => ReplCommand::Empty,
            "history" => ReplCommand::History,
            "export" => ReplCommand::Export,
            "ratios" => ReplCommand::Ratios,
            "reload" => ReplCommand::Reload,
            "quit" | "exit" | "q" => ReplCommand::Quit,
            _ => ReplCommand::Calculate(line.to_string()),
        }
    }
}

fn print_help() {
    println!(
        "{}",
        ui::style_text(
            "Type a symbol to price it, or: history, export, ratios, reload, quit",
            ui::StyleType::Subtle
        )
    );
}

pub async fn run(context: &AppContext, source: &SourceArg) -> Result<()> {
    run_with_input(context, source, BufReader::new(tokio::io::stdin())).await
}

/// Runs the session loop over `input` until it ends or `quit` is read.
pub async fn run_with_input<R>(context: &AppContext, source: &SourceArg, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut session = Session::new(context);
    load_ratios(&mut session, source, false).await;
    debug!(session = %session.history().session_id(), "Session started");
    print_help();

    let mut lines = input.lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Calculate(symbol) => calculate_and_print(&mut session, &symbol).await,
            ReplCommand::History if session.history().is_empty() => {
                println!("No calculations yet.");
            }
            ReplCommand::History => println!("{}", ui::history_table(session.history())),
            ReplCommand::Export => {
                if let Err(e) = export_history(&session) {
                    println!("{}", ui::style_text(&format!("{e:#}"), ui::StyleType::Error));
                }
            }
            ReplCommand::Ratios => match session.ratios() {
                Some(extracted) => println!("{}", ui::ratios_table(&extracted.table, None)),
                None => println!(
                    "{}",
                    ui::style_text("No ratios loaded", ui::StyleType::Error)
                ),
            },
            ReplCommand::Reload => {
                load_ratios(&mut session, source, true).await;
            }
            ReplCommand::Quit => break,
        }
    }

    debug!(calculations = session.history().len(), "Session ended");
    Ok(())
}
