//! Structured logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber. `RUST_LOG` controls filtering;
/// defaults to `info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
