//! Diagnostic logging setup.
//!
//! Chat output owns stdout, so diagnostics go to stderr. `RUST_LOG` wins
//! over the configured level.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Build the filter: `RUST_LOG` if set and valid, else the configured
/// level, else `warn`.
pub fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(config: &LoggingConfig) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(config))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
