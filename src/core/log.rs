//! Tracing setup shared by the binary.
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, fmt::format::FmtSpan,
    prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Logs go to stderr so `--json` output on stdout stays parseable.
///
/// Verbose mode also reports when each provider span closes, which shows
/// how long every step of the fallback chain took.
pub fn init_logging(verbose: bool) {
    let (level_filter, level, span_events) = if verbose {
        (LevelFilter::DEBUG, "debug", FmtSpan::CLOSE)
    } else {
        (LevelFilter::WARN, "warn", FmtSpan::NONE)
    };
    let app_filter = Targets::new().with_target("xquote", level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let layer = fmt::layer()
        .compact()
        .without_time()
        .with_span_events(span_events)
        .with_writer(std::io::stderr);

    // A second initialization (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(app_filter)
        .with(env_filter)
        .try_init();
}
