use reqwest::Client;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::debug;

use crate::core::error::{QuoteError, Result};

pub const USER_AGENT: &str = "xquote/1.0";

/// Quote pages serve a consent wall or 404 to non-browser agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Builds the client shared by every provider of one engine.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .build()?)
}

/// Redirect loops and broken header blocks are how the quote pages turn bots away.
pub fn is_blocking_error(err: &reqwest::Error) -> bool {
    if err.is_redirect() {
        return true;
    }
    let mut source = err.source();
    while let Some(inner) = source {
        let message = inner.to_string().to_lowercase();
        if message.contains("header") || message.contains("too large") {
            return true;
        }
        source = inner.source();
    }
    false
}

/// Maps a transport error, singling out anti-bot blocking.
pub fn classify_error(err: reqwest::Error, provider: &'static str) -> QuoteError {
    if is_blocking_error(&err) {
        debug!(provider, error = %err, "Upstream appears to be blocking");
        QuoteError::UpstreamBlocked { provider }
    } else {
        QuoteError::Request(err)
    }
}

/// Fails with `QuoteError::Http` on a non-success status.
pub fn check_status(response: reqwest::Response, provider: &'static str) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(QuoteError::Http { provider, status });
    }
    Ok(response)
}

/// Parses a displayed number such as `1,234.56`.
pub fn parse_display_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
