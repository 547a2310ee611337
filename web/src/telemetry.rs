//! Tracing subscriber setup for the server binary.

use crate::config::DEFAULT_LOG_FILTER;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global fmt subscriber filtered by `directives`.
///
/// Unparseable directives fall back to [`DEFAULT_LOG_FILTER`]. Calling it
/// twice is harmless; the second call is ignored.
pub fn init_tracing(directives: &str) {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
