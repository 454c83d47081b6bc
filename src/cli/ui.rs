use crate::core::history::{HistoryEntry, SessionHistory};
use crate::core::ratios::RatioTable;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Label,
    Value,
    Warning,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Value => style(text).green().bold(),
        StyleType::Warning => style(text).yellow(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| Cell::new(format_fn(v)).set_alignment(CellAlignment::Right),
    )
}

fn number_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Formats a value as `1.234.567,89`, the way prices are quoted in pesos.
pub fn format_ars(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped},{frac_part}")
}

/// Renders one calculation as a two-column card.
pub fn result_card(entry: &HistoryEntry) -> String {
    let result = &entry.result;
    let mut table = new_styled_table();
    table.set_header(vec![header_cell(&result.symbol), header_cell("Value")]);

    table.add_row(vec![
        Cell::new("Underlying (USD)"),
        number_cell(format!("{:.2}", result.underlying_price)),
    ]);
    table.add_row(vec![
        Cell::new("Ratio"),
        number_cell(format!("{}:1", result.ratio)),
    ]);
    table.add_row(vec![
        Cell::new("Dollar CCL"),
        number_cell(format_ars(result.rates.ccl)),
    ]);
    if let Some(mep) = result.rates.mep {
        table.add_row(vec![Cell::new("Dollar MEP"), number_cell(format_ars(mep))]);
        table.add_row(vec![
            Cell::new("MEP/CCL factor"),
            format_optional_cell(
                result.derived.and_then(|d| d.adjustment_factor),
                |f| format!("{f:.4}"),
            ),
        ]);
    }
    table.add_row(vec![
        Cell::new("CEDEAR (USD)").add_attribute(Attribute::Bold),
        format_optional_cell(result.derived.map(|d| d.receipt_price), |p| format!("{p:.2}")),
    ]);
    table.add_row(vec![
        Cell::new("CEDEAR (ARS)").add_attribute(Attribute::Bold),
        format_optional_cell(result.derived.map(|d| d.home_price), format_ars).fg(Color::Green),
    ]);

    format!(
        "{}\n{}",
        table,
        style_text(
            &entry.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            StyleType::Subtle
        )
    )
}

/// Renders the session history, oldest first.
pub fn history_table(history: &SessionHistory) -> String {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Time"),
        header_cell("Symbol"),
        header_cell("Underlying (USD)"),
        header_cell("Ratio"),
        header_cell("CCL"),
        header_cell("MEP"),
        header_cell("CEDEAR (USD)"),
        header_cell("CEDEAR (ARS)"),
    ]);

    for entry in history.entries() {
        let result = &entry.result;
        table.add_row(vec![
            Cell::new(entry.recorded_at.format("%H:%M:%S").to_string()),
            Cell::new(&result.symbol),
            number_cell(format!("{:.2}", result.underlying_price)),
            number_cell(result.ratio.to_string()),
            number_cell(format_ars(result.rates.ccl)),
            format_optional_cell(result.rates.mep, format_ars),
            format_optional_cell(result.derived.map(|d| d.receipt_price), |p| format!("{p:.2}")),
            format_optional_cell(result.derived.map(|d| d.home_price), format_ars),
        ]);
    }
    table.to_string()
}

/// Renders the ratio table, or only the row for `only`.
pub fn ratios_table(table: &RatioTable, only: Option<&str>) -> String {
    let mut out = new_styled_table();
    out.set_header(vec![header_cell("Symbol"), header_cell("Ratio")]);
    for (symbol, ratio) in table.iter().filter(|(s, _)| only.is_none_or(|o| *s == o)) {
        out.add_row(vec![Cell::new(symbol), number_cell(format!("{ratio}:1"))]);
    }
    out.to_string()
}

/// Creates a spinner shown while a slow operation runs.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(spinner_style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}
