pub mod cli;
pub mod converter;
pub mod core;
pub mod providers;
pub mod resolver;

pub use crate::core::{AssetType, QuoteResult};
pub use crate::resolver::QuoteResolver;

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Resolve {
        symbols: Vec<String>,
        currency: Option<String>,
        json: bool,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("xquote starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let resolver = QuoteResolver::from_config(&config)?;

    match command {
        AppCommand::Resolve {
            symbols,
            currency,
            json,
        } => {
            let symbols = if symbols.is_empty() {
                config.symbols.clone()
            } else {
                symbols
            };
            let currency = currency.unwrap_or_else(|| config.currency.clone());
            cli::resolve::run(&resolver, &symbols, &currency, json).await
        }
    }
}
