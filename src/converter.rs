//! Three-tier exchange rate resolution: live API, quote page scrape, static table.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::currency::{CurrencyRateProvider, PageRateSource};

/// Scraped rates outside this range are parse errors, not market data.
pub const MIN_PLAUSIBLE_RATE: f64 = 0.005;
pub const MAX_PLAUSIBLE_RATE: f64 = 200.0;

/// A pair page may be scraped at most this many levels below the original quote page.
pub const MAX_SCRAPE_DEPTH: u8 = 1;

/// Approximate rates used only when every live source fails.
const STATIC_RATES: &[(&str, &str, f64)] = &[
    ("USD", "EUR", 0.92),
    ("GBP", "EUR", 1.17),
    ("CHF", "EUR", 1.05),
    ("JPY", "EUR", 0.0062),
    ("CAD", "EUR", 0.68),
    ("AUD", "EUR", 0.61),
    ("SEK", "EUR", 0.087),
    ("DKK", "EUR", 0.134),
    ("NOK", "EUR", 0.086),
    ("HKD", "EUR", 0.118),
    ("GBP", "USD", 1.27),
    ("CHF", "USD", 1.13),
    ("USD", "JPY", 150.0),
    ("USD", "CAD", 1.36),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    Api,
    Scrape,
    Table,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FxRate {
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub source: RateSource,
}

pub fn is_plausible_rate(rate: f64) -> bool {
    rate.is_finite() && (MIN_PLAUSIBLE_RATE..=MAX_PLAUSIBLE_RATE).contains(&rate)
}

/// Looks up the static table directly or through the inverse pair.
pub fn static_rate(from: &str, to: &str) -> Option<f64> {
    STATIC_RATES.iter().find_map(|(f, t, rate)| {
        if f.eq_ignore_ascii_case(from) && t.eq_ignore_ascii_case(to) {
            Some(*rate)
        } else if f.eq_ignore_ascii_case(to) && t.eq_ignore_ascii_case(from) {
            Some(1.0 / rate)
        } else {
            None
        }
    })
}

/// Rewrites pence quotes (`GBp`, `GBX`) into pounds.
pub fn normalize_minor_units(amount: f64, currency: &str) -> (f64, String) {
    match currency {
        "GBp" | "GBX" | "GBx" => (amount / 100.0, "GBP".to_string()),
        other => (amount, other.to_uppercase()),
    }
}

/// How a caller wants the rate resolved.
#[derive(Clone, Copy, Default)]
pub struct RateOptions<'a> {
    /// Apply the plausibility bound to API rates too.
    pub bound_api_rate: bool,
    /// Tier 2 source and the depth the caller is already at.
    pub page: Option<(&'a dyn PageRateSource, u8)>,
}

#[derive(Clone)]
pub struct CurrencyConverter {
    rates: Arc<dyn CurrencyRateProvider>,
}

impl CurrencyConverter {
    pub fn new(rates: Arc<dyn CurrencyRateProvider>) -> Self {
        CurrencyConverter { rates }
    }

    /// Converts through the live API, then the static table.
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        self.convert_with(amount, from, to, RateOptions::default()).await
    }

    pub async fn convert_with(
        &self,
        amount: f64,
        from: &str,
        to: &str,
        options: RateOptions<'_>,
    ) -> Option<f64> {
        let (amount, from) = normalize_minor_units(amount, from);
        let fx = self.rate(&from, to, options).await?;
        Some(amount * fx.rate)
    }

    pub async fn rate(&self, from: &str, to: &str, options: RateOptions<'_>) -> Option<FxRate> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        let found = |rate: f64, source: RateSource| FxRate {
            from: from.clone(),
            to: to.clone(),
            rate,
            source,
        };

        if from == to {
            return Some(found(1.0, RateSource::Api));
        }

        match self.rates.get_rate(&from, &to).await {
            Ok(rate) if rate.is_finite() && rate > 0.0 => {
                if !options.bound_api_rate || is_plausible_rate(rate) {
                    debug!(%from, %to, rate, "Using live exchange rate");
                    return Some(found(rate, RateSource::Api));
                }
                warn!(%from, %to, rate, "Rejecting implausible live exchange rate");
            }
            Ok(rate) => warn!(%from, %to, rate, "Live exchange rate is not usable"),
            Err(e) => debug!(%from, %to, error = %e, "Live exchange rate unavailable"),
        }

        if let Some((page, depth)) = options.page {
            if depth < MAX_SCRAPE_DEPTH {
                let pair = format!("{from}{to}=X");
                match page.scrape_rate(&pair, depth + 1).await {
                    Some(rate) if is_plausible_rate(rate) => {
                        debug!(%pair, rate, "Using scraped exchange rate");
                        return Some(found(rate, RateSource::Scrape));
                    }
                    Some(rate) => warn!(%pair, rate, "Rejecting implausible scraped exchange rate"),
                    None => debug!(%pair, "Scraped exchange rate unavailable"),
                }
            }
        }

        if let Some(rate) = static_rate(&from, &to) {
            warn!(%from, %to, rate, "Falling back to approximate static exchange rate");
            return Some(found(rate, RateSource::Table));
        }

        warn!(%from, %to, "No exchange rate available");
        None
    }
}
