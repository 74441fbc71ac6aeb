use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::util::{check_status, classify_error};
use crate::converter::{CurrencyConverter, RateOptions};
use crate::core::error::{QuoteError, Result};
use crate::core::quote::{AssetType, FallbackStrategy, QuoteResult, is_valid_price};
use crate::core::symbol::infer_type;

const PROVIDER: &str = "yahoo-chart";

/// Latest close that is actually present; trailing bars are often null intraday.
fn last_close(chart_item: &PriceChartItem) -> Option<f64> {
    chart_item
        .indicators
        .as_ref()
        .and_then(|inds| inds.quote.first())
        .and_then(|q| q.close.as_ref())
        .and_then(|closes| closes.iter().rev().find_map(|c| *c))
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Option<Vec<PriceChartItem>>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: PriceChartMeta,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    currency: Option<String>,
    #[serde(alias = "shortName")]
    short_name: Option<String>,
    #[serde(alias = "longName")]
    long_name: Option<String>,
    #[serde(alias = "instrumentType")]
    instrument_type: Option<String>,
}

/// Price as read from the chart endpoint, before conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartQuote {
    pub price: f64,
    pub currency: String,
    pub name: Option<String>,
    pub asset_type: Option<AssetType>,
}

pub struct YahooChartProvider {
    base_url: String,
    client: Client,
    converter: CurrencyConverter,
}

impl YahooChartProvider {
    pub fn new(base_url: &str, client: Client, converter: CurrencyConverter) -> Self {
        YahooChartProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            converter,
        }
    }

    #[instrument(name = "YahooChartFetch", skip(self), fields(symbol = %symbol))]
    pub async fn fetch_chart(&self, symbol: &str) -> Result<ChartQuote> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=5d",
            self.base_url, symbol
        );
        debug!("Requesting chart data from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_error(e, PROVIDER))?;
        let response = check_status(response, PROVIDER)?;

        let data = response
            .json::<YahooChartResponse>()
            .await
            .map_err(|e| QuoteError::parse(format!("Failed to parse chart for {symbol}: {e}")))?;
        let item = data
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| QuoteError::NotFound(symbol.to_string()))?;

        let price = item
            .meta
            .regular_market_price
            .filter(|p| is_valid_price(*p))
            .or_else(|| last_close(&item).filter(|p| is_valid_price(*p)))
            .ok_or_else(|| QuoteError::parse(format!("No chart price for symbol: {symbol}")))?;
        let currency = item
            .meta
            .currency
            .ok_or_else(|| QuoteError::parse(format!("No chart currency for symbol: {symbol}")))?;

        Ok(ChartQuote {
            price,
            currency,
            name: item.meta.short_name.or(item.meta.long_name),
            asset_type: item
                .meta
                .instrument_type
                .as_deref()
                .map(AssetType::from_quote_type),
        })
    }
}

#[async_trait]
impl FallbackStrategy for YahooChartProvider {
    fn name(&self) -> &'static str {
        "chart"
    }

    async fn fetch(&self, symbol: &str, target_currency: &str) -> Result<QuoteResult> {
        let chart = self.fetch_chart(symbol).await?;
        let asset_type = chart.asset_type.unwrap_or_else(|| infer_type(symbol));

        let options = RateOptions {
            bound_api_rate: true,
            page: None,
        };
        let (price, currency) = match self
            .converter
            .convert_with(chart.price, &chart.currency, target_currency, options)
            .await
        {
            Some(converted) => (converted, target_currency.to_uppercase()),
            None => {
                warn!(symbol, from = %chart.currency, to = target_currency, "Keeping native currency");
                (chart.price, chart.currency)
            }
        };

        Ok(QuoteResult::new(
            symbol,
            price,
            chart.name.as_deref(),
            &currency,
            asset_type,
        ))
    }
}
