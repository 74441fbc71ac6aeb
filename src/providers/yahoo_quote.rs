//! Primary structured quote provider.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::util::{check_status, classify_error};
use crate::core::currency::CurrencyRateProvider;
use crate::core::error::{QuoteError, Result};
use crate::core::quote::{AssetType, QuoteProvider, RawQuote, is_valid_price};

const PROVIDER: &str = "yahoo";

pub(crate) fn timestamp_to_date(ts: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

pub struct YahooQuoteProvider {
    base_url: String,
    client: Client,
}

impl YahooQuoteProvider {
    pub fn new(base_url: &str, client: Client) -> Self {
        YahooQuoteProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct YahooQuoteResponse {
    quote_response: QuoteResponseBody,
}

#[derive(Deserialize, Debug)]
struct QuoteResponseBody {
    #[serde(default)]
    result: Vec<QuoteItem>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QuoteItem {
    symbol: Option<String>,
    regular_market_price: Option<f64>,
    currency: Option<String>,
    short_name: Option<String>,
    long_name: Option<String>,
    quote_type: Option<String>,
    dividend_date: Option<i64>,
    trailing_annual_dividend_rate: Option<f64>,
    trailing_annual_dividend_yield: Option<f64>,
}

impl QuoteItem {
    fn into_raw_quote(self, requested: &str) -> Result<RawQuote> {
        let price = self
            .regular_market_price
            .filter(|p| is_valid_price(*p))
            .ok_or_else(|| QuoteError::parse(format!("No tradable price for symbol: {requested}")))?;
        let currency = self
            .currency
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| QuoteError::parse(format!("No currency for symbol: {requested}")))?;
        let symbol = self.symbol.unwrap_or_else(|| requested.to_string());
        let name = self
            .long_name
            .or(self.short_name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| symbol.clone());

        Ok(RawQuote {
            symbol,
            price,
            currency,
            name,
            asset_type: self.quote_type.as_deref().map(AssetType::from_quote_type),
            dividend_date: self.dividend_date.and_then(timestamp_to_date),
            trailing_dividend_rate: self.trailing_annual_dividend_rate,
            trailing_dividend_yield: self.trailing_annual_dividend_yield,
        })
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteProvider {
    #[instrument(name = "YahooQuoteFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_quote(&self, symbol: &str) -> Result<RawQuote> {
        let url = Url::parse_with_params(
            &format!("{}/v7/finance/quote", self.base_url),
            &[("symbols", symbol)],
        )
        .map_err(|e| QuoteError::parse(format!("Invalid quote URL for {symbol}: {e}")))?;
        debug!("Requesting quote from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(e, PROVIDER))?;
        let response = check_status(response, PROVIDER)?;

        let data = response
            .json::<YahooQuoteResponse>()
            .await
            .map_err(|e| QuoteError::parse(format!("Failed to parse quote for {symbol}: {e}")))?;
        let item = data
            .quote_response
            .result
            .into_iter()
            .next()
            .ok_or_else(|| QuoteError::NotFound(symbol.to_string()))?;

        item.into_raw_quote(symbol)
    }
}

#[async_trait]
impl CurrencyRateProvider for YahooQuoteProvider {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let symbol = format!("{from}{to}=X");
        let quote = self.fetch_quote(&symbol).await?;
        Ok(quote.price)
    }
}
