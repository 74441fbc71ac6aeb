//! Best-effort dividend and logo enrichment from the quote summary API.
//!
//! Yahoo returns numeric fields as `{"raw": 1.23, "fmt": "1.23"}` objects and
//! empty `{}` objects when there is no data. Every sub-fetch here degrades to
//! default values on failure; enrichment never fails a resolution.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::util::{check_status, classify_error};
use super::yahoo_quote::timestamp_to_date;
use crate::core::error::{QuoteError, Result};
use crate::core::quote::{QuoteEnricher, QuoteResult, RawQuote};

const PROVIDER: &str = "yahoo-summary";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse<T> {
    quote_summary: QuoteSummary<T>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary<T> {
    #[serde(default = "Vec::new")]
    result: Vec<T>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
struct RawValue {
    raw: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
struct RawTimestamp {
    raw: Option<i64>,
}

impl RawTimestamp {
    fn date(self) -> Option<NaiveDate> {
        self.raw.and_then(timestamp_to_date)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DividendModules {
    summary_detail: Option<SummaryDetail>,
    calendar_events: Option<CalendarEvents>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(default)]
    dividend_rate: RawValue,
    #[serde(default)]
    dividend_yield: RawValue,
    #[serde(default)]
    ex_dividend_date: RawTimestamp,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CalendarEvents {
    #[serde(default)]
    dividend_date: RawTimestamp,
    #[serde(default)]
    ex_dividend_date: RawTimestamp,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileModules {
    asset_profile: Option<AssetProfile>,
}

#[derive(Debug, Deserialize)]
struct AssetProfile {
    website: Option<String>,
}

/// Dividend fields as reported, in the quote's native currency.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DividendInfo {
    pub annual_rate: f64,
    pub yield_ratio: f64,
    pub next_payment_date: Option<NaiveDate>,
}

fn non_negative(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0)
}

/// Derives a logo URL from a company website's host.
pub fn logo_url(website: &str, template: &str) -> Option<String> {
    let website = website.trim();
    let url = if website.contains("://") {
        Url::parse(website).ok()?
    } else {
        Url::parse(&format!("https://{website}")).ok()?
    };
    let host = url.host_str()?;
    let domain = host.strip_prefix("www.").unwrap_or(host);
    if domain.is_empty() {
        return None;
    }
    Some(template.replace("{domain}", domain))
}

pub struct YahooSummaryEnricher {
    base_url: String,
    client: Client,
    logo_template: String,
}

impl YahooSummaryEnricher {
    pub fn new(base_url: &str, client: Client, logo_template: &str) -> Self {
        YahooSummaryEnricher {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            logo_template: logo_template.to_string(),
        }
    }

    async fn fetch_modules<T: DeserializeOwned>(&self, symbol: &str, modules: &str) -> Result<T> {
        let url = Url::parse_with_params(
            &format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol),
            &[("modules", modules)],
        )
        .map_err(|e| QuoteError::parse(format!("Invalid summary URL for {symbol}: {e}")))?;
        debug!("Requesting quote summary from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(e, PROVIDER))?;
        let response = check_status(response, PROVIDER)?;

        let data = response
            .json::<QuoteSummaryResponse<T>>()
            .await
            .map_err(|e| QuoteError::parse(format!("Failed to parse summary for {symbol}: {e}")))?;
        data.quote_summary
            .result
            .into_iter()
            .next()
            .ok_or_else(|| QuoteError::parse(format!("Empty summary for {symbol}")))
    }

    /// Dividend rate, yield and the next payment date.
    ///
    /// The date is taken from the payment date, then the ex-dividend date,
    /// then the quote-level dividend date, whichever is present first.
    pub async fn fetch_dividends(&self, raw: &RawQuote) -> DividendInfo {
        let modules = match self
            .fetch_modules::<DividendModules>(&raw.symbol, "summaryDetail,calendarEvents")
            .await
        {
            Ok(modules) => Some(modules),
            Err(e) => {
                warn!(symbol = %raw.symbol, error = %e, "Dividend lookup failed");
                None
            }
        };
        let (detail, calendar) = modules
            .map(|m| {
                (
                    m.summary_detail.unwrap_or_default(),
                    m.calendar_events.unwrap_or_default(),
                )
            })
            .unwrap_or_default();

        let next_payment_date = calendar
            .dividend_date
            .date()
            .or_else(|| calendar.ex_dividend_date.date())
            .or_else(|| detail.ex_dividend_date.date())
            .or(raw.dividend_date);

        DividendInfo {
            annual_rate: non_negative(detail.dividend_rate.raw.or(raw.trailing_dividend_rate)),
            yield_ratio: non_negative(detail.dividend_yield.raw.or(raw.trailing_dividend_yield)),
            next_payment_date,
        }
    }

    pub async fn fetch_logo(&self, symbol: &str) -> Option<String> {
        match self.fetch_modules::<ProfileModules>(symbol, "assetProfile").await {
            Ok(modules) => modules
                .asset_profile
                .and_then(|p| p.website)
                .and_then(|w| logo_url(&w, &self.logo_template)),
            Err(e) => {
                warn!(symbol, error = %e, "Profile lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl QuoteEnricher for YahooSummaryEnricher {
    /// Fills dividend and logo fields of a quote still in `raw`'s native currency.
    #[instrument(name = "YahooEnrich", skip(self, quote, raw), fields(symbol = %raw.symbol))]
    async fn enrich(&self, mut quote: QuoteResult, raw: &RawQuote) -> QuoteResult {
        let dividends = self.fetch_dividends(raw).await;
        quote.annual_dividend_rate = dividends.annual_rate;
        quote.dividend_yield = dividends.yield_ratio;
        quote.next_payment_date = dividends.next_payment_date;
        quote.image_url = self.fetch_logo(&raw.symbol).await;
        quote
    }
}
