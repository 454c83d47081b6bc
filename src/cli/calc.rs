use super::{SourceArg, load_ratios, ui};
use crate::core::session::{AppContext, Session};
use anyhow::Result;

/// Computes `symbol`, printing its card or the reason no price was derived.
pub async fn calculate_and_print(session: &mut Session<'_>, symbol: &str) {
    match session.calculate(symbol).await {
        Ok(entry) => println!("{}", ui::result_card(entry)),
        Err(e) => println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error)),
    }
}

/// Writes the session history to the export directory, if there is any.
pub fn export_history(session: &Session<'_>) -> Result<()> {
    if session.history().is_empty() {
        println!("History is empty; nothing to export.");
        return Ok(());
    }
    let path = session.export()?;
    println!(
        "{} {}",
        ui::style_text("Exported:", ui::StyleType::Label),
        path.display()
    );
    Ok(())
}

pub async fn run(
    context: &AppContext,
    source: &SourceArg,
    symbols: &[String],
    export: bool,
) -> Result<()> {
    let mut session = Session::new(context);
    load_ratios(&mut session, source, false).await;

    for symbol in symbols {
        calculate_and_print(&mut session, symbol).await;
    }

    if !session.history().is_empty() {
        ui::print_separator();
        println!(
            "{}\n{}",
            ui::style_text("History", ui::StyleType::Title),
            ui::history_table(session.history())
        );
    }
    if export {
        export_history(&session)?;
    }
    Ok(())
}
