//! Logging initialization for the kiosk clients.

use tracing_subscriber::EnvFilter;

/// Initialize the logging system.
///
/// Sets up tracing with human-readable output on stderr. The RUST_LOG env
/// var takes precedence over the provided default level.
///
/// # Example
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("Loader started");
/// ```
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
