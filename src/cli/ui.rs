use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::core::AssetType;

pub enum StyleType {
    Title,
    Error,
    Subtle,
}

pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Price with its currency code. Prices left in their native currency
/// because no exchange rate was found are shown in yellow.
pub fn price_cell(price: f64, currency: &str, target_currency: &str) -> Cell {
    let cell = Cell::new(format!("{price:.2} {currency}")).set_alignment(CellAlignment::Right);
    if currency.eq_ignore_ascii_case(target_currency) {
        cell
    } else {
        cell.fg(Color::Yellow)
    }
}

pub fn asset_type_cell(asset_type: AssetType) -> Cell {
    let color = match asset_type {
        AssetType::Stock => Color::Blue,
        AssetType::Etf => Color::Green,
        AssetType::Crypto => Color::Magenta,
        AssetType::Fund => Color::DarkCyan,
        AssetType::Other => Color::DarkGrey,
    };
    Cell::new(asset_type.to_string()).fg(color)
}

/// `None` and zero dividends are both displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| Cell::new(format_fn(v)).set_alignment(CellAlignment::Right),
    )
}

pub fn na_cell(has_error: bool) -> Cell {
    let color = if has_error {
        Color::Red
    } else {
        Color::DarkGrey
    };
    Cell::new("N/A").fg(color)
}

/// Spinner plus bar drawn on stderr while quotes resolve.
pub fn new_progress_bar(len: u64) -> ProgressBar {
    let template = "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}";

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}
