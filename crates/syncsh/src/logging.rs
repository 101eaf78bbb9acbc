//! Diagnostics for the wrapper itself.
//!
//! Everything goes to stderr; stdout belongs to the recipes. The default
//! level is `warn` so a healthy build prints nothing extra.

use std::io::{self, IsTerminal};

use tracing_subscriber::EnvFilter;

/// Filter directives, same syntax as `RUST_LOG`.
pub const LOG_VAR: &str = "SYNCSH_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let filter =
        EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .without_time()
        .try_init();

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
