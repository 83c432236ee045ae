// src/utils/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Sets up the logging framework using tracing_subscriber.
/// Reads log level filters from the `RUST_LOG` environment variable.
/// Defaults to "info" if `RUST_LOG` is not set, which is enough to see the
/// per-document progress lines.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info")); // RUST_LOG=debug shows extracted records and copy targets

    fmt()
        .with_env_filter(filter)
        .with_target(false) // single binary, module paths only add noise to progress lines
        // RUST_LOG=trace also shows which date pattern and category root matched
        .init();

    tracing::debug!("Logging setup complete.");
}
