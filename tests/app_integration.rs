use chrono::NaiveDate;
use std::fs;
use tempfile::TempDir;
use tracing::info;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xquote::core::config::{AppConfig, ProviderConfig, ProvidersConfig};
use xquote::{AppCommand, AssetType, QuoteResolver};

mod test_utils {
    use super::*;

    pub fn config_for(mock_server: &MockServer, currency: &str) -> AppConfig {
        let provider = || {
            Some(ProviderConfig {
                base_url: mock_server.uri(),
            })
        };
        AppConfig {
            currency: currency.to_string(),
            timeout_secs: 5,
            providers: ProvidersConfig {
                yahoo: provider(),
                chart: provider(),
                page: provider(),
                crypto: provider(),
            },
            ..AppConfig::default()
        }
    }

    pub fn quote_body(symbol: &str, price: f64, currency: &str, quote_type: &str) -> String {
        format!(
            r#"{{"quoteResponse":{{"result":[{{
                "symbol":"{symbol}",
                "regularMarketPrice":{price},
                "currency":"{currency}",
                "longName":"{symbol} Holdings",
                "quoteType":"{quote_type}"
            }}],"error":null}}}}"#
        )
    }

    pub const EMPTY_QUOTE: &str = r#"{"quoteResponse":{"result":[],"error":null}}"#;

    pub async fn mount_quote(mock_server: &MockServer, symbol: &str, body: String, expected: u64) {
        Mock::given(method("GET"))
            .and(path("/v7/finance/quote"))
            .and(query_param("symbols", symbol))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected)
            .mount(mock_server)
            .await;
    }
}

use test_utils::*;

#[test_log::test(tokio::test)]
async fn test_stock_converted_and_enriched() {
    let mock_server = MockServer::start().await;
    mount_quote(&mock_server, "AAPL", quote_body("AAPL", 180.0, "USD", "EQUITY"), 1).await;
    mount_quote(&mock_server, "USDEUR=X", quote_body("USDEUR=X", 0.92, "EUR", "CURRENCY"), 1).await;

    let summary = r#"{"quoteSummary":{"result":[{
        "summaryDetail":{"dividendRate":{"raw":1.0,"fmt":"1.00"},"dividendYield":{"raw":0.0055,"fmt":"0.55%"}},
        "calendarEvents":{"dividendDate":{"raw":1739404800,"fmt":"2025-02-13"}},
        "assetProfile":{"website":"https://www.apple.com"}
    }],"error":null}}"#;
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_string(summary))
        .mount(&mock_server)
        .await;

    let resolver = QuoteResolver::from_config(&config_for(&mock_server, "EUR")).unwrap();
    let quote = resolver.resolve("aapl", "").await.expect("AAPL should resolve");
    info!(?quote, "Resolved quote");

    assert_eq!(quote.symbol, "AAPL");
    assert_eq!(quote.name, "AAPL Holdings");
    assert_eq!(quote.currency, "EUR");
    assert_eq!(quote.asset_type, AssetType::Stock);
    assert!((quote.price - 165.6).abs() < 1e-9);
    assert!((quote.annual_dividend_rate - 0.92).abs() < 1e-9);
    assert!((quote.dividend_yield - 0.0055).abs() < 1e-12);
    assert_eq!(quote.next_payment_date, NaiveDate::from_ymd_opt(2025, 2, 13));
    assert_eq!(
        quote.image_url.as_deref(),
        Some("https://www.google.com/s2/favicons?domain=apple.com&sz=128")
    );
}

#[test_log::test(tokio::test)]
async fn test_crypto_pair_repaired_to_target() {
    let mock_server = MockServer::start().await;
    mount_quote(
        &mock_server,
        "BTC-EUR",
        quote_body("BTC-EUR", 55000.0, "EUR", "CRYPTOCURRENCY"),
        1,
    )
    .await;
    mount_quote(&mock_server, "BTC-USD", quote_body("BTC-USD", 60000.0, "USD", "CRYPTOCURRENCY"), 0).await;

    let resolver = QuoteResolver::from_config(&config_for(&mock_server, "EUR")).unwrap();
    let quote = resolver.resolve("BTC-USD", "EUR").await.expect("pair should resolve");

    assert_eq!(quote.symbol, "BTC-EUR");
    assert_eq!(quote.price, 55000.0);
    assert_eq!(quote.currency, "EUR");
    assert_eq!(quote.asset_type, AssetType::Crypto);
}

#[test_log::test(tokio::test)]
async fn test_alias_quoted_in_pence() {
    let mock_server = MockServer::start().await;
    mount_quote(&mock_server, "VUAG.L", quote_body("VUAG.L", 8000.0, "GBp", "ETF"), 1).await;

    let resolver = QuoteResolver::from_config(&config_for(&mock_server, "EUR")).unwrap();
    let quote = resolver.resolve(" vuag ", "GBP").await.expect("alias should resolve");

    assert_eq!(quote.symbol, "VUAG.L");
    assert_eq!(quote.currency, "GBP");
    assert_eq!(quote.asset_type, AssetType::Etf);
    assert!((quote.price - 80.0).abs() < 1e-9);
}

#[test_log::test(tokio::test)]
async fn test_unknown_symbol_walks_every_applicable_strategy() {
    let mock_server = MockServer::start().await;
    mount_quote(&mock_server, "UNKNOWN123", EMPTY_QUOTE.to_string(), 1).await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/UNKNOWN123"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quote/UNKNOWN123/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v2/prices/.*"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let resolver = QuoteResolver::from_config(&config_for(&mock_server, "EUR")).unwrap();
    assert!(resolver.resolve("UNKNOWN123", "EUR").await.is_none());
}

#[test_log::test(tokio::test)]
async fn test_crypto_spot_used_when_primary_fails() {
    let mock_server = MockServer::start().await;
    mount_quote(&mock_server, "DOGE-USD", EMPTY_QUOTE.to_string(), 1).await;

    Mock::given(method("GET"))
        .and(path("/v2/prices/DOGE-USD/spot"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"data":{"amount":"0.1234","base":"DOGE","currency":"USD"}}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/DOGE-USD"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&mock_server)
        .await;

    let resolver = QuoteResolver::from_config(&config_for(&mock_server, "USD")).unwrap();
    let quote = resolver.resolve("DOGE-USD", "USD").await.expect("spot should resolve");

    assert_eq!(quote.symbol, "DOGE-USD");
    assert_eq!(quote.name, "DOGE");
    assert_eq!(quote.price, 0.1234);
    assert_eq!(quote.asset_type, AssetType::Crypto);
}

#[test_log::test(tokio::test)]
async fn test_quote_page_is_last_resort() {
    let mock_server = MockServer::start().await;
    mount_quote(&mock_server, "XYZ", EMPTY_QUOTE.to_string(), 1).await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/XYZ"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = r#"<html><body>
        <h1>Xyz Industries (XYZ)</h1>
        <span>NYSE - Delayed Quote. Currency in USD</span>
        <fin-streamer data-symbol="XYZ" data-field="regularMarketPrice" data-value="1,234.56">1,234.56</fin-streamer>
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/quote/XYZ/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = QuoteResolver::from_config(&config_for(&mock_server, "USD")).unwrap();
    let quote = resolver.resolve("XYZ", "USD").await.expect("page should resolve");

    assert_eq!(quote.price, 1234.56);
    assert_eq!(quote.currency, "USD");
    assert_eq!(quote.name, "Xyz Industries");
}

#[test_log::test(tokio::test)]
async fn test_run_command_with_watch_list() {
    let mock_server = MockServer::start().await;
    mount_quote(&mock_server, "MSFT", quote_body("MSFT", 400.0, "USD", "EQUITY"), 1).await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    let mut config = config_for(&mock_server, "USD");
    config.symbols = vec!["MSFT".to_string()];
    fs::write(&config_path, serde_yaml::to_string(&config).unwrap()).unwrap();

    let command = AppCommand::Resolve {
        symbols: Vec::new(),
        currency: None,
        json: true,
    };
    let result = xquote::run_command(command, config_path.to_str()).await;
    assert!(result.is_ok(), "run_command failed: {result:?}");
}

#[test_log::test(tokio::test)]
async fn test_run_command_without_symbols_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "currency: EUR\n").unwrap();

    let command = AppCommand::Resolve {
        symbols: Vec::new(),
        currency: None,
        json: false,
    };
    let result = xquote::run_command(command, config_path.to_str()).await;
    assert!(result.is_err());
}
