//! Last-resort fallback that reads the rendered public quote page.
//!
//! The page is also the tier 2 exchange-rate source: a currency pair's own
//! quote page is read one level deep and never converted further.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, instrument, warn};

use super::util::{BROWSER_USER_AGENT, check_status, classify_error, parse_display_number};
use crate::converter::{CurrencyConverter, MAX_SCRAPE_DEPTH, RateOptions};
use crate::core::currency::PageRateSource;
use crate::core::error::{QuoteError, Result};
use crate::core::quote::{FallbackStrategy, QuoteResult, is_valid_price};
use crate::core::symbol::infer_type;

const PROVIDER: &str = "yahoo-page";

/// Currency assumed when the page carries no `Currency in XXX` marker.
pub const BASELINE_CURRENCY: &str = "USD";

const PAGE_CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "GBp", "CHF", "JPY", "CAD", "AUD", "HKD", "SEK", "NOK", "DKK",
];

static CURRENCY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Currency in ([A-Za-z]{3})").expect("valid currency regex"));

static TICKER_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^()]*\)\s*$").expect("valid ticker suffix regex"));

const LIVE_PRICE: &str = r#"fin-streamer[data-field="regularMarketPrice"]"#;
const TEST_ID_PRICE: &str = r#"[data-testid="qsp-price"]"#;
const META_PRICE: &str = r#"meta[itemprop="price"]"#;

/// What could be read off a quote page, in the page's own currency.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedQuote {
    pub price: f64,
    pub name: Option<String>,
    pub currency: String,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| QuoteError::parse(format!("Invalid selector {css}: {e}")))
}

fn element_value(element: ElementRef<'_>) -> Option<f64> {
    let attr = element
        .value()
        .attr("data-value")
        .or_else(|| element.value().attr("value"))
        .or_else(|| element.value().attr("content"));
    let text = match attr {
        Some(value) => value.to_string(),
        None => element.text().collect::<String>(),
    };
    parse_display_number(&text).filter(|p| is_valid_price(*p))
}

fn extract_price(document: &Html, symbol: &str) -> Result<Option<f64>> {
    let live = selector(LIVE_PRICE)?;

    let matching_symbol = document
        .select(&live)
        .filter(|el| {
            el.value()
                .attr("data-symbol")
                .is_some_and(|s| s.eq_ignore_ascii_case(symbol))
        })
        .find_map(element_value);
    if matching_symbol.is_some() {
        return Ok(matching_symbol);
    }

    if let Some(price) = document.select(&live).find_map(element_value) {
        return Ok(Some(price));
    }

    for css in [TEST_ID_PRICE, META_PRICE] {
        if let Some(price) = document.select(&selector(css)?).find_map(element_value) {
            return Ok(Some(price));
        }
    }
    Ok(None)
}

fn extract_name(document: &Html) -> Result<Option<String>> {
    let heading = selector("h1")?;
    Ok(document
        .select(&heading)
        .next()
        .map(|h| h.text().collect::<String>())
        .map(|text| TICKER_SUFFIX.replace(text.trim(), "").trim().to_string())
        .filter(|name| !name.is_empty()))
}

fn extract_currency(html: &str) -> String {
    CURRENCY_MARKER
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|code| PAGE_CURRENCIES.contains(code))
        .unwrap_or(BASELINE_CURRENCY)
        .to_string()
}

/// Reads price, name and currency from a rendered quote page.
pub fn parse_quote_page(html: &str, symbol: &str) -> Result<ScrapedQuote> {
    let document = Html::parse_document(html);
    let price = extract_price(&document, symbol)?
        .ok_or_else(|| QuoteError::parse(format!("No price on quote page for {symbol}")))?;

    Ok(ScrapedQuote {
        price,
        name: extract_name(&document)?,
        currency: extract_currency(html),
    })
}

pub struct YahooPageScraper {
    base_url: String,
    client: Client,
    converter: CurrencyConverter,
}

impl YahooPageScraper {
    pub fn new(base_url: &str, client: Client, converter: CurrencyConverter) -> Self {
        YahooPageScraper {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            converter,
        }
    }

    #[instrument(name = "YahooPageFetch", skip(self), fields(symbol = %symbol))]
    pub async fn fetch_page(&self, symbol: &str) -> Result<ScrapedQuote> {
        let url = format!("{}/quote/{}/", self.base_url, symbol);
        debug!("Requesting quote page from {}", url);

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| classify_error(e, PROVIDER))?;
        let response = check_status(response, PROVIDER)?;
        let html = response.text().await.map_err(|e| classify_error(e, PROVIDER))?;

        parse_quote_page(&html, symbol)
    }
}

#[async_trait]
impl PageRateSource for YahooPageScraper {
    async fn scrape_rate(&self, pair_symbol: &str, depth: u8) -> Option<f64> {
        if depth > MAX_SCRAPE_DEPTH {
            warn!(pair_symbol, depth, "Refusing to scrape beyond maximum depth");
            return None;
        }
        match self.fetch_page(pair_symbol).await {
            Ok(page) => Some(page.price),
            Err(e) => {
                debug!(pair_symbol, error = %e, "Pair page unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl FallbackStrategy for YahooPageScraper {
    fn name(&self) -> &'static str {
        "html"
    }

    async fn fetch(&self, symbol: &str, target_currency: &str) -> Result<QuoteResult> {
        let page = self.fetch_page(symbol).await?;

        let options = RateOptions {
            bound_api_rate: false,
            page: Some((self as &dyn PageRateSource, 0)),
        };
        let (price, currency) = match self
            .converter
            .convert_with(page.price, &page.currency, target_currency, options)
            .await
        {
            Some(converted) => (converted, target_currency.to_uppercase()),
            None => {
                warn!(symbol, from = %page.currency, to = target_currency, "Keeping native currency");
                (page.price, page.currency)
            }
        };

        Ok(QuoteResult::new(
            symbol,
            price,
            page.name.as_deref(),
            &currency,
            infer_type(symbol),
        ))
    }
}
