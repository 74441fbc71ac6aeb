//! Currency conversion abstractions

use async_trait::async_trait;

use super::error::Result;

/// Live exchange rates, e.g. from the primary provider's synthetic `XXXYYY=X` pairs.
#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}

/// Reads a currency pair's rate from its rendered quote page.
///
/// `depth` counts how many scrapes deep the caller already is; implementations
/// must refuse anything beyond the converter's maximum and never convert the
/// scraped value further.
#[async_trait]
pub trait PageRateSource: Send + Sync {
    async fn scrape_rate(&self, pair_symbol: &str, depth: u8) -> Option<f64>;
}
