//! Logging initialization
//!
//! Optional helper for binaries embedding this crate; the library itself
//! only emits `tracing` events and never installs a subscriber.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the tracing subscriber. Level comes from `RUST_LOG`
/// (default `info`); set `LOG_FORMAT=json` for structured output.
/// Safe to call once per process.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if use_json {
        fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}
