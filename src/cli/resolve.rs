use super::ui;
use crate::core::QuoteResult;
use crate::resolver::QuoteResolver;
use anyhow::{Result, bail};
use comfy_table::Cell;
use futures::future::join_all;
use tracing::info;

/// Renders resolved quotes; unresolved symbols keep their row with "N/A".
pub fn display_as_table(results: &[(String, Option<QuoteResult>)], target_currency: &str) -> String {
    let mut table = ui::new_styled_table();

    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Type"),
        ui::header_cell("Price"),
        ui::header_cell("Div. Rate"),
        ui::header_cell("Yield (%)"),
        ui::header_cell("Next Payment"),
    ]);

    let mut unresolved = 0;
    for (requested, quote) in results {
        match quote {
            Some(q) => {
                table.add_row(vec![
                    Cell::new(&q.symbol),
                    Cell::new(&q.name),
                    ui::asset_type_cell(q.asset_type),
                    ui::price_cell(q.price, &q.currency, target_currency),
                    ui::format_optional_cell(
                        Some(q.annual_dividend_rate).filter(|r| *r > 0.0),
                        |r| format!("{r:.2}"),
                    ),
                    ui::format_optional_cell(
                        Some(q.dividend_yield).filter(|y| *y > 0.0),
                        |y| format!("{:.2}%", y * 100.0),
                    ),
                    ui::format_optional_cell(q.next_payment_date, |d| d.to_string()),
                ]);
            }
            None => {
                unresolved += 1;
                table.add_row(vec![
                    Cell::new(requested),
                    ui::na_cell(true),
                    ui::na_cell(false),
                    ui::na_cell(true),
                    ui::na_cell(false),
                    ui::na_cell(false),
                    ui::na_cell(false),
                ]);
            }
        }
    }

    let mut output = format!(
        "Quotes ({})\n\n",
        ui::style_text(target_currency, ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    if unresolved > 0 {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(
                &format!("{unresolved} symbol(s) could not be priced"),
                ui::StyleType::Error
            )
        ));
    }
    output
}

/// Resolves all symbols concurrently; the resolver itself imposes no limit.
pub async fn resolve_all(
    resolver: &QuoteResolver,
    symbols: &[String],
    target_currency: &str,
    on_done: &(dyn Fn() + Sync),
) -> Vec<(String, Option<QuoteResult>)> {
    let futures = symbols.iter().map(|symbol| async move {
        let quote = resolver.resolve(symbol, target_currency).await;
        on_done();
        (symbol.clone(), quote)
    });
    join_all(futures).await
}

pub async fn run(
    resolver: &QuoteResolver,
    symbols: &[String],
    target_currency: &str,
    json: bool,
) -> Result<()> {
    if symbols.is_empty() {
        bail!("No symbols given and no watch list configured");
    }
    let target_currency = target_currency.trim().to_uppercase();
    info!(count = symbols.len(), currency = %target_currency, "Resolving quotes");

    let pb = ui::new_progress_bar(symbols.len() as u64);
    pb.set_message("Fetching quotes...");
    let results = resolve_all(resolver, symbols, &target_currency, &|| pb.inc(1)).await;
    pb.finish_and_clear();

    if json {
        let quotes: Vec<&QuoteResult> = results.iter().filter_map(|(_, q)| q.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&quotes)?);
    } else {
        println!("{}", display_as_table(&results, &target_currency));
    }
    Ok(())
}
