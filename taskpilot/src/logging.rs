//! Tracing setup shared by the CLI and the server.
//!
//! Diagnostics go to stderr and are filtered by `RUST_LOG`. Command results
//! are printed to stdout by the CLI and never go through tracing.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, falling back to `default_filter` if unset.
///
/// # Example
/// ```bash
/// RUST_LOG=taskpilot=debug taskpilot generate "count lines in /data/notes.txt"
/// ```
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
