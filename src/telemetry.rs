//! Process-wide `tracing` subscriber set-up.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "TASKHUB_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

/// Installs the global subscriber writing to stderr.
///
/// The filter comes from [`LOG_ENV`], defaulting to `info`. With `json` set
/// every event is emitted as one JSON object per line.
///
/// # Errors
///
/// Returns an error when a global subscriber is already installed.
pub fn init_logging(json: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()
    }
}
