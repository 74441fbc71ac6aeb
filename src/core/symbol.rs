//! Symbol canonicalization and asset-type heuristics.

use super::quote::AssetType;

/// Quote currency assumed for `BASE-QUOTE` pairs when none is requested.
pub const DEFAULT_QUOTE_CURRENCY: &str = "USD";

const PAIR_SEPARATOR: char = '-';

/// Short tickers that resolve to the wrong listing without an exchange suffix.
const SYMBOL_ALIASES: &[(&str, &str)] = &[
    ("VUAG", "VUAG.L"),
    ("VWRL", "VWRL.L"),
    ("VUSA", "VUSA.L"),
    ("CSPX", "CSPX.L"),
    ("IWDA", "IWDA.AS"),
    ("EUNL", "EUNL.DE"),
    ("VWCE", "VWCE.DE"),
];

const KNOWN_ETFS: &[&str] = &[
    "SPY", "VOO", "IVV", "VTI", "QQQ", "DIA", "IWM", "VEA", "VWO", "EEM", "AGG", "BND", "GLD",
    "SLV", "TLT", "VIG", "SCHD", "VYM", "VUAG", "VWRL", "VUSA", "CSPX", "IWDA", "EUNL", "VWCE",
    "SXR8", "XDWD",
];

const KNOWN_CRYPTO: &[&str] = &[
    "BTC", "ETH", "SOL", "ADA", "XRP", "DOGE", "DOT", "LTC", "BNB", "AVAX", "LINK", "MATIC",
    "TRX", "XLM", "ATOM", "UNI", "SHIB", "USDT", "USDC",
];

/// Trims, uppercases and applies the alias table.
pub fn normalize(input: &str) -> String {
    let symbol = input.trim().to_uppercase();
    SYMBOL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == symbol)
        .map_or(symbol, |(_, canonical)| canonical.to_string())
}

/// The part of a symbol before any exchange suffix (`VUAG.L` -> `VUAG`).
fn base_ticker(symbol: &str) -> &str {
    symbol.split('.').next().unwrap_or(symbol)
}

pub fn is_pair(symbol: &str) -> bool {
    symbol.contains(PAIR_SEPARATOR)
}

/// Heuristic classification, used only when a provider supplies none.
pub fn infer_type(symbol: &str) -> AssetType {
    let symbol = symbol.trim().to_uppercase();
    let base = base_ticker(&symbol);
    if KNOWN_ETFS.contains(&base) {
        AssetType::Etf
    } else if is_pair(&symbol) || KNOWN_CRYPTO.contains(&base) {
        AssetType::Crypto
    } else {
        AssetType::Stock
    }
}

/// Base asset of a crypto-like symbol (`BTC-USD` -> `BTC`).
pub fn crypto_base(symbol: &str) -> &str {
    symbol.split(PAIR_SEPARATOR).next().unwrap_or(symbol)
}

/// Re-quotes a `BASE-QUOTE` pair in `target` when it is not already quoted there.
pub fn repair_pair(symbol: &str, target: &str) -> Option<String> {
    let (base, quote) = symbol.split_once(PAIR_SEPARATOR)?;
    if base.is_empty() || quote.eq_ignore_ascii_case(target) {
        return None;
    }
    Some(format!("{base}{PAIR_SEPARATOR}{}", target.to_uppercase()))
}
