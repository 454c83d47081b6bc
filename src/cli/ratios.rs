use super::{SourceArg, load_ratios, ui};
use crate::core::calculator::canonical_symbol;
use crate::core::session::{AppContext, Session};
use anyhow::Result;

pub async fn run(context: &AppContext, source: &SourceArg, symbol: Option<&str>) -> Result<()> {
    let mut session = Session::new(context);
    if !load_ratios(&mut session, source, false).await {
        return Ok(());
    }
    let Some(extracted) = session.ratios() else {
        return Ok(());
    };

    match symbol.map(canonical_symbol) {
        Some(symbol) if !extracted.table.contains(&symbol) => {
            println!(
                "{}",
                ui::style_text(
                    &format!("{symbol} is not in the loaded BYMA ratio table"),
                    ui::StyleType::Error
                )
            );
        }
        only => println!("{}", ui::ratios_table(&extracted.table, only.as_deref())),
    }
    Ok(())
}
