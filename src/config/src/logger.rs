use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes the process-wide tracing subscriber. Safe to call more than
/// once (subsequent calls are no-ops) so tests can call it freely.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
