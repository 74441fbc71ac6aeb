//! Quote abstractions and core types

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Etf,
    Crypto,
    Fund,
    Other,
}

impl AssetType {
    /// Maps the primary provider's `quoteType` classification.
    pub fn from_quote_type(quote_type: &str) -> Self {
        match quote_type.to_uppercase().as_str() {
            "EQUITY" => AssetType::Stock,
            "ETF" => AssetType::Etf,
            "CRYPTOCURRENCY" => AssetType::Crypto,
            "MUTUALFUND" => AssetType::Fund,
            _ => AssetType::Other,
        }
    }
}

impl Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                AssetType::Stock => "stock",
                AssetType::Etf => "etf",
                AssetType::Crypto => "crypto",
                AssetType::Fund => "fund",
                AssetType::Other => "other",
            }
        )
    }
}

/// The resolved price and metadata handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    pub symbol: String,
    pub price: f64,
    pub name: String,
    pub currency: String,
    pub asset_type: AssetType,
    pub annual_dividend_rate: f64,
    pub dividend_yield: f64,
    pub next_payment_date: Option<NaiveDate>,
    pub image_url: Option<String>,
}

impl QuoteResult {
    /// A bare quote with no dividend or logo data.
    pub fn new(symbol: &str, price: f64, name: Option<&str>, currency: &str, asset_type: AssetType) -> Self {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(symbol);
        QuoteResult {
            symbol: symbol.to_string(),
            price,
            name: name.to_string(),
            currency: currency.to_string(),
            asset_type,
            annual_dividend_rate: 0.0,
            dividend_yield: 0.0,
            next_payment_date: None,
            image_url: None,
        }
    }
}

/// Validated quote from the primary provider, in its native currency.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuote {
    pub symbol: String,
    pub price: f64,
    pub currency: String,
    pub name: String,
    pub asset_type: Option<AssetType>,
    pub dividend_date: Option<NaiveDate>,
    pub trailing_dividend_rate: Option<f64>,
    pub trailing_dividend_yield: Option<f64>,
}

/// Accepts only prices that can be shown to a user.
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<RawQuote>;
}

/// Best-effort metadata augmentation; must never fail a resolution.
#[async_trait]
pub trait QuoteEnricher: Send + Sync {
    async fn enrich(&self, quote: QuoteResult, raw: &RawQuote) -> QuoteResult;
}

/// One link of the fallback chain tried when the primary provider fails.
#[async_trait]
pub trait FallbackStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the strategy should be attempted for this symbol at all.
    fn applies_to(&self, _symbol: &str) -> bool {
        true
    }

    /// Produces a quote in `target_currency`, or in the source's native
    /// currency when no conversion was possible.
    async fn fetch(&self, symbol: &str, target_currency: &str) -> Result<QuoteResult>;
}
