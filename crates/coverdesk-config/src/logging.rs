//! Logging initialization.

use crate::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing for the daemon.
///
/// `RUST_LOG` wins over the configured level; the configured level is the
/// fallback filter. Safe to call once per process.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.json_logs {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(filter).with_target(true).init();
    }
}
