//! Logging setup for binaries.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing-subscriber` fmt layer filtered by `RUST_LOG`
/// (default `info`).
///
/// Calling it again, or after another subscriber was installed, does
/// nothing.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
