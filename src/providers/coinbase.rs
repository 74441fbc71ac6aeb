//! Crypto spot price fallback.
//!
//! Quotes the base asset directly in the target currency, so no conversion
//! step is needed.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::util::{check_status, classify_error};
use crate::core::error::{QuoteError, Result};
use crate::core::quote::{AssetType, FallbackStrategy, QuoteResult, is_valid_price};
use crate::core::symbol::{crypto_base, infer_type};

const PROVIDER: &str = "coinbase";

#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: SpotPrice,
}

/// Amounts arrive as decimal strings, e.g. `"61234.12"`.
#[derive(Debug, Deserialize)]
struct SpotPrice {
    amount: String,
    base: Option<String>,
    currency: String,
}

pub struct CoinbaseSpotProvider {
    base_url: String,
    client: Client,
}

impl CoinbaseSpotProvider {
    pub fn new(base_url: &str, client: Client) -> Self {
        CoinbaseSpotProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl FallbackStrategy for CoinbaseSpotProvider {
    fn name(&self) -> &'static str {
        "crypto-spot"
    }

    fn applies_to(&self, symbol: &str) -> bool {
        infer_type(symbol) == AssetType::Crypto
    }

    #[instrument(name = "CoinbaseSpotFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch(&self, symbol: &str, target_currency: &str) -> Result<QuoteResult> {
        let base = crypto_base(symbol).to_uppercase();
        let pair = format!("{}-{}", base, target_currency.to_uppercase());
        let url = format!("{}/v2/prices/{}/spot", self.base_url, pair);
        debug!("Requesting spot price from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| classify_error(e, PROVIDER))?;
        let response = check_status(response, PROVIDER)?;

        let spot = response
            .json::<SpotResponse>()
            .await
            .map_err(|e| QuoteError::parse(format!("Failed to parse spot price for {pair}: {e}")))?
            .data;

        let price = spot
            .amount
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| is_valid_price(*p))
            .ok_or_else(|| QuoteError::parse(format!("Invalid spot amount for {pair}: {}", spot.amount)))?;

        let name = spot.base.unwrap_or(base);
        Ok(QuoteResult::new(
            &pair,
            price,
            Some(&name),
            &spot.currency.to_uppercase(),
            AssetType::Crypto,
        ))
    }
}
