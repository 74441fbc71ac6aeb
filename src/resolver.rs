//! Orchestrates normalization, the primary provider, enrichment, conversion
//! and the fallback chain into a single `resolve` call.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::converter::{CurrencyConverter, RateOptions, normalize_minor_units};
use crate::core::config::AppConfig;
use crate::core::error::QuoteError;
use crate::core::quote::{
    FallbackStrategy, QuoteEnricher, QuoteProvider, QuoteResult, RawQuote, is_valid_price,
};
use crate::core::symbol::{DEFAULT_QUOTE_CURRENCY, infer_type, normalize, repair_pair};
use crate::providers::coinbase::CoinbaseSpotProvider;
use crate::providers::util::http_client;
use crate::providers::yahoo_chart::YahooChartProvider;
use crate::providers::yahoo_page::YahooPageScraper;
use crate::providers::yahoo_quote::YahooQuoteProvider;
use crate::providers::yahoo_summary::YahooSummaryEnricher;

pub struct QuoteResolver {
    primary: Arc<dyn QuoteProvider>,
    enricher: Arc<dyn QuoteEnricher>,
    converter: CurrencyConverter,
    fallbacks: Vec<Box<dyn FallbackStrategy>>,
    default_currency: String,
}

impl QuoteResolver {
    /// `fallbacks` are tried in the given order.
    pub fn new(
        primary: Arc<dyn QuoteProvider>,
        enricher: Arc<dyn QuoteEnricher>,
        converter: CurrencyConverter,
        fallbacks: Vec<Box<dyn FallbackStrategy>>,
        default_currency: &str,
    ) -> Self {
        QuoteResolver {
            primary,
            enricher,
            converter,
            fallbacks,
            default_currency: default_currency.trim().to_uppercase(),
        }
    }

    /// Wires the public providers: crypto spot, then chart, then quote page.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let client = http_client(Duration::from_secs(config.timeout_secs))?;
        let providers = &config.providers;

        let yahoo = Arc::new(YahooQuoteProvider::new(providers.yahoo_url(), client.clone()));
        let converter = CurrencyConverter::new(yahoo.clone());
        let enricher = Arc::new(YahooSummaryEnricher::new(
            providers.yahoo_url(),
            client.clone(),
            &config.logo_url_template,
        ));

        let fallbacks: Vec<Box<dyn FallbackStrategy>> = vec![
            Box::new(CoinbaseSpotProvider::new(providers.crypto_url(), client.clone())),
            Box::new(YahooChartProvider::new(
                providers.chart_url(),
                client.clone(),
                converter.clone(),
            )),
            Box::new(YahooPageScraper::new(
                providers.page_url(),
                client,
                converter.clone(),
            )),
        ];

        Ok(Self::new(
            yahoo,
            enricher,
            converter,
            fallbacks,
            &config.currency,
        ))
    }

    fn target_currency(&self, requested: &str) -> String {
        let requested = requested.trim().to_uppercase();
        if requested.is_empty() {
            self.default_currency.clone()
        } else {
            requested
        }
    }

    /// Resolves a price for `symbol` in `target_currency`.
    ///
    /// Returns `None` only when every strategy failed; callers should treat
    /// that as temporarily unpriceable rather than as a zero price.
    #[instrument(name = "Resolve", skip(self))]
    pub async fn resolve(&self, symbol: &str, target_currency: &str) -> Option<QuoteResult> {
        let symbol = normalize(symbol);
        if symbol.is_empty() {
            return None;
        }
        let target = self.target_currency(target_currency);
        debug!(%symbol, %target, "Normalized request");

        if target != DEFAULT_QUOTE_CURRENCY {
            if let Some(repaired) = repair_pair(&symbol, &target) {
                if let Some(quote) = self.try_direct_repair(&repaired, &target).await {
                    return Some(quote);
                }
            }
        }

        match self.try_primary(&symbol, &target).await {
            Ok(quote) => return Some(quote),
            Err(e) => warn!(%symbol, error = %e, "Primary provider failed, trying fallbacks"),
        }

        for strategy in &self.fallbacks {
            if !strategy.applies_to(&symbol) {
                debug!(%symbol, strategy = strategy.name(), "Strategy does not apply");
                continue;
            }
            match strategy.fetch(&symbol, &target).await {
                Ok(quote) if is_valid_price(quote.price) => {
                    info!(%symbol, strategy = strategy.name(), price = quote.price, "Resolved by fallback");
                    return Some(quote);
                }
                Ok(quote) => {
                    warn!(%symbol, strategy = strategy.name(), price = quote.price, "Ignoring implausible price")
                }
                Err(e) => warn!(%symbol, strategy = strategy.name(), error = %e, "Fallback failed"),
            }
        }

        warn!(error = %QuoteError::NotFound(symbol), "Giving up");
        None
    }

    /// A pair already quoted in the target currency needs no conversion.
    async fn try_direct_repair(&self, repaired: &str, target: &str) -> Option<QuoteResult> {
        match self.primary.fetch_quote(repaired).await {
            Ok(raw) if raw.currency.eq_ignore_ascii_case(target) => {
                info!(%repaired, "Resolved re-paired symbol directly");
                let asset_type = raw.asset_type.unwrap_or_else(|| infer_type(repaired));
                Some(QuoteResult::new(
                    repaired,
                    raw.price,
                    Some(&raw.name),
                    &raw.currency.to_uppercase(),
                    asset_type,
                ))
            }
            Ok(raw) => {
                debug!(%repaired, currency = %raw.currency, "Re-paired symbol is not quoted in target");
                None
            }
            Err(e) => {
                debug!(%repaired, error = %e, "Re-paired symbol unavailable");
                None
            }
        }
    }

    async fn try_primary(&self, symbol: &str, target: &str) -> Result<QuoteResult, QuoteError> {
        let raw = self.primary.fetch_quote(symbol).await?;
        let asset_type = raw.asset_type.unwrap_or_else(|| infer_type(symbol));
        let quote = QuoteResult::new(&raw.symbol, raw.price, Some(&raw.name), &raw.currency, asset_type);
        let quote = self.enricher.enrich(quote, &raw).await;

        let quote = self.convert(quote, &raw, target).await;
        if !is_valid_price(quote.price) {
            return Err(QuoteError::parse(format!(
                "Implausible converted price for {symbol}: {}",
                quote.price
            )));
        }
        Ok(quote)
    }

    /// Converts price and dividend rate; keeps the native currency when no rate exists.
    async fn convert(&self, mut quote: QuoteResult, raw: &RawQuote, target: &str) -> QuoteResult {
        let (amount, from) = normalize_minor_units(raw.price, &raw.currency);
        let unit_factor = amount / raw.price;

        match self.converter.rate(&from, target, RateOptions::default()).await {
            Some(fx) => {
                debug!(symbol = %raw.symbol, from = %fx.from, to = %fx.to, rate = fx.rate, source = ?fx.source, "Converting quote");
                quote.price = amount * fx.rate;
                quote.annual_dividend_rate *= unit_factor * fx.rate;
                quote.currency = target.to_string();
            }
            None => {
                let err = QuoteError::ConversionUnavailable {
                    from: raw.currency.clone(),
                    to: target.to_string(),
                };
                warn!(symbol = %raw.symbol, error = %err, "Returning native currency");
            }
        }
        quote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::tests::FixedRates;
    use crate::core::quote::AssetType;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockPrimary {
        quotes: HashMap<String, RawQuote>,
        calls: Mutex<Vec<String>>,
    }

    impl MockPrimary {
        fn new(quotes: Vec<RawQuote>) -> Arc<Self> {
            Arc::new(MockPrimary {
                quotes: quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuoteProvider for MockPrimary {
        async fn fetch_quote(&self, symbol: &str) -> crate::core::error::Result<RawQuote> {
            self.calls.lock().unwrap().push(symbol.to_string());
            self.quotes
                .get(symbol)
                .cloned()
                .ok_or_else(|| QuoteError::NotFound(symbol.to_string()))
        }
    }

    struct NoopEnricher;

    #[async_trait]
    impl QuoteEnricher for NoopEnricher {
        async fn enrich(&self, mut quote: QuoteResult, _raw: &RawQuote) -> QuoteResult {
            quote.annual_dividend_rate = 1.0;
            quote
        }
    }

    struct MockStrategy {
        name: &'static str,
        crypto_only: bool,
        price: Option<f64>,
        log: Arc<Mutex<Vec<&'static str>>>,
        calls: AtomicUsize,
    }

    impl MockStrategy {
        fn boxed(
            name: &'static str,
            crypto_only: bool,
            price: Option<f64>,
            log: &Arc<Mutex<Vec<&'static str>>>,
        ) -> Box<dyn FallbackStrategy> {
            Box::new(MockStrategy {
                name,
                crypto_only,
                price,
                log: log.clone(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FallbackStrategy for MockStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn applies_to(&self, symbol: &str) -> bool {
            !self.crypto_only || infer_type(symbol) == AssetType::Crypto
        }

        async fn fetch(&self, symbol: &str, target: &str) -> crate::core::error::Result<QuoteResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(self.name);
            match self.price {
                Some(price) => Ok(QuoteResult::new(symbol, price, None, target, AssetType::Other)),
                None => Err(QuoteError::parse("mock failure")),
            }
        }
    }

    fn raw(symbol: &str, price: f64, currency: &str, asset_type: Option<AssetType>) -> RawQuote {
        RawQuote {
            symbol: symbol.to_string(),
            price,
            currency: currency.to_string(),
            name: format!("{symbol} name"),
            asset_type,
            dividend_date: None,
            trailing_dividend_rate: None,
            trailing_dividend_yield: None,
        }
    }

    fn resolver(
        primary: Arc<MockPrimary>,
        rate: Option<f64>,
        fallbacks: Vec<Box<dyn FallbackStrategy>>,
    ) -> QuoteResolver {
        QuoteResolver::new(
            primary,
            Arc::new(NoopEnricher),
            CurrencyConverter::new(FixedRates::new(rate)),
            fallbacks,
            "EUR",
        )
    }

    fn failing_chain(log: &Arc<Mutex<Vec<&'static str>>>) -> Vec<Box<dyn FallbackStrategy>> {
        vec![
            MockStrategy::boxed("crypto-spot", true, None, log),
            MockStrategy::boxed("chart", false, None, log),
            MockStrategy::boxed("html", false, None, log),
        ]
    }

    #[tokio::test]
    async fn test_primary_with_conversion() {
        let primary = MockPrimary::new(vec![raw("AAPL", 180.0, "USD", Some(AssetType::Stock))]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let resolver = resolver(primary, Some(0.92), failing_chain(&log));

        let quote = resolver.resolve("aapl", "EUR").await.unwrap();
        assert!((quote.price - 165.6).abs() < 1e-9);
        assert_eq!(quote.currency, "EUR");
        assert_eq!(quote.asset_type, AssetType::Stock);
        assert_eq!(quote.name, "AAPL name");
        assert!((quote.annual_dividend_rate - 0.92).abs() < 1e-9);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_primary_without_rate_keeps_native_currency() {
        let primary = MockPrimary::new(vec![raw("PETR4.SA", 35.0, "BRL", None)]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let resolver = resolver(primary, None, failing_chain(&log));

        let quote = resolver.resolve("PETR4.SA", "EUR").await.unwrap();
        assert_eq!(quote.price, 35.0);
        assert_eq!(quote.currency, "BRL");
        // Inferred when the provider gives no classification
        assert_eq!(quote.asset_type, AssetType::Stock);
    }

    #[tokio::test]
    async fn test_pence_quote_is_converted_in_pounds() {
        let primary = MockPrimary::new(vec![raw("VUAG.L", 8000.0, "GBp", Some(AssetType::Etf))]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let resolver = resolver(primary.clone(), Some(1.2), failing_chain(&log));

        let quote = resolver.resolve("VUAG", "EUR").await.unwrap();
        assert!((quote.price - 96.0).abs() < 1e-9);
        assert_eq!(quote.currency, "EUR");
        assert_eq!(primary.calls(), vec!["VUAG.L"]);
    }

    #[tokio::test]
    async fn test_direct_repair_skips_conversion() {
        let primary = MockPrimary::new(vec![
            raw("BTC-USD", 60000.0, "USD", Some(AssetType::Crypto)),
            raw("BTC-EUR", 55000.0, "EUR", Some(AssetType::Crypto)),
        ]);
        let rates = FixedRates::new(Some(0.5));
        let resolver = QuoteResolver::new(
            primary.clone(),
            Arc::new(NoopEnricher),
            CurrencyConverter::new(rates.clone()),
            Vec::new(),
            "EUR",
        );

        let quote = resolver.resolve("btc-usd", "eur").await.unwrap();
        assert_eq!(quote.symbol, "BTC-EUR");
        assert_eq!(quote.price, 55000.0);
        assert_eq!(quote.currency, "EUR");
        assert_eq!(quote.asset_type, AssetType::Crypto);
        assert_eq!(primary.calls(), vec!["BTC-EUR"]);
        assert_eq!(rates.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_direct_repair_not_attempted_for_default_quote_currency() {
        let primary = MockPrimary::new(vec![raw("BTC-EUR", 55000.0, "EUR", Some(AssetType::Crypto))]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let resolver = resolver(primary.clone(), Some(1.1), failing_chain(&log));

        let quote = resolver.resolve("BTC-EUR", "USD").await.unwrap();
        assert_eq!(primary.calls(), vec!["BTC-EUR"]);
        assert!((quote.price - 60500.0).abs() < 1e-6);
        assert_eq!(quote.currency, "USD");
    }

    #[tokio::test]
    async fn test_failed_repair_falls_through_to_primary() {
        let primary = MockPrimary::new(vec![raw("ETH-USD", 3000.0, "USD", Some(AssetType::Crypto))]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let resolver = resolver(primary.clone(), Some(0.9), failing_chain(&log));

        let quote = resolver.resolve("ETH-USD", "EUR").await.unwrap();
        assert_eq!(primary.calls(), vec!["ETH-EUR", "ETH-USD"]);
        assert_eq!(quote.symbol, "ETH-USD");
        assert!((quote.price - 2700.0).abs() < 1e-9);
        assert_eq!(quote.currency, "EUR");
    }

    #[tokio::test]
    async fn test_fallback_order_for_crypto_symbol() {
        let primary = MockPrimary::new(Vec::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let resolver = resolver(primary, None, failing_chain(&log));

        assert!(resolver.resolve("DOGE-USD", "USD").await.is_none());
        assert_eq!(*log.lock().unwrap(), vec!["crypto-spot", "chart", "html"]);
    }

    #[tokio::test]
    async fn test_crypto_fallback_skipped_for_stocks() {
        let primary = MockPrimary::new(Vec::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let resolver = resolver(primary, None, failing_chain(&log));

        assert!(resolver.resolve("UNKNOWN123", "EUR").await.is_none());
        assert_eq!(*log.lock().unwrap(), vec!["chart", "html"]);
    }

    #[tokio::test]
    async fn test_first_successful_fallback_stops_the_chain() {
        let primary = MockPrimary::new(Vec::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let fallbacks = vec![
            MockStrategy::boxed("crypto-spot", true, Some(1.0), &log),
            MockStrategy::boxed("chart", false, Some(42.0), &log),
            MockStrategy::boxed("html", false, Some(43.0), &log),
        ];
        let resolver = resolver(primary, None, fallbacks);

        let quote = resolver.resolve("MSFT", "EUR").await.unwrap();
        assert_eq!(quote.price, 42.0);
        assert_eq!(*log.lock().unwrap(), vec!["chart"]);
    }

    #[tokio::test]
    async fn test_implausible_fallback_price_is_skipped() {
        let primary = MockPrimary::new(Vec::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let fallbacks = vec![
            MockStrategy::boxed("chart", false, Some(0.0), &log),
            MockStrategy::boxed("html", false, Some(12.5), &log),
        ];
        let resolver = resolver(primary, None, fallbacks);

        let quote = resolver.resolve("XYZ", "EUR").await.unwrap();
        assert_eq!(quote.price, 12.5);
        assert_eq!(*log.lock().unwrap(), vec!["chart", "html"]);
    }

    #[tokio::test]
    async fn test_empty_target_uses_default_currency() {
        let primary = MockPrimary::new(vec![raw("SAP.DE", 200.0, "EUR", Some(AssetType::Stock))]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let resolver = resolver(primary, None, failing_chain(&log));

        let quote = resolver.resolve("SAP.DE", "  ").await.unwrap();
        assert_eq!(quote.currency, "EUR");
        assert_eq!(quote.price, 200.0);
    }

    #[tokio::test]
    async fn test_blank_symbol_is_not_resolved() {
        let primary = MockPrimary::new(Vec::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let resolver = resolver(primary.clone(), None, failing_chain(&log));

        assert!(resolver.resolve("   ", "EUR").await.is_none());
        assert!(primary.calls().is_empty());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_calls_are_consistent() {
        let primary = MockPrimary::new(vec![raw("SPY", 500.0, "USD", None)]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let resolver = resolver(primary.clone(), Some(0.9), failing_chain(&log));

        let first = resolver.resolve("SPY", "EUR").await.unwrap();
        let second = resolver.resolve("SPY", "EUR").await.unwrap();
        assert_eq!(first.asset_type, AssetType::Etf);
        assert_eq!(first.asset_type, second.asset_type);
        assert_eq!(first.currency, second.currency);
        // No caching: both calls hit the provider
        assert_eq!(primary.calls().len(), 2);
    }

    #[test]
    fn test_from_config_rejects_zero_timeout() {
        let config = AppConfig {
            timeout_secs: 0,
            ..AppConfig::default()
        };
        assert!(QuoteResolver::from_config(&config).is_err());
    }
}
