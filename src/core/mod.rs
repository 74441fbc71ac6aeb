//! Core business logic abstractions

pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod quote;
pub mod symbol;

// Re-export main types for cleaner imports
pub use currency::{CurrencyRateProvider, PageRateSource};
pub use error::QuoteError;
pub use quote::{AssetType, FallbackStrategy, QuoteEnricher, QuoteProvider, QuoteResult, RawQuote};
