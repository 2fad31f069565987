use std::env;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding a full `tracing` filter directive
pub(crate) const LOG_ENV: &str = "FLIGHTLOG_LOG";

fn default_directive(debug: bool) -> &'static str {
    if debug { "flightlog=debug" } else { "warn" }
}

/// Install the global subscriber. Diagnostics go to stderr so stdout stays
/// clean for tables and JSON.
pub(crate) fn init_logger(debug: bool) {
    let filter = env::var(LOG_ENV)
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(debug)));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(false);

    // No-op when a subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_selects_crate_debug() {
        assert_eq!(default_directive(true), "flightlog=debug");
        assert_eq!(default_directive(false), "warn");
    }
}
