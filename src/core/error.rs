//! Failure kinds raised inside the resolution engine.
//!
//! None of these cross `QuoteResolver::resolve`; they are logged at the
//! boundary of the strategy or sub-fetch that produced them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("No usable price found for symbol: {0}")]
    NotFound(String),

    #[error("{provider} is blocking requests")]
    UpstreamBlocked { provider: &'static str },

    #[error("Failed to parse response: {0}")]
    ParseFailure(String),

    #[error("No exchange rate available for {from} to {to}")]
    ConversionUnavailable { from: String, to: String },

    #[error("HTTP error: {status} from {provider}")]
    Http {
        provider: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

impl QuoteError {
    pub fn parse(message: impl Into<String>) -> Self {
        QuoteError::ParseFailure(message.into())
    }
}

pub type Result<T, E = QuoteError> = std::result::Result<T, E>;
