use tracing_subscriber::EnvFilter;

use crate::config::RuntimeMode;

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber: JSON lines under Lambda so CloudWatch keeps
/// the structured fields, compact text when running locally.
pub fn init(mode: RuntimeMode) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // A second call (tests, repeated init) keeps the first subscriber.
    let _ = match mode {
        RuntimeMode::Lambda => builder.json().flatten_event(true).try_init(),
        RuntimeMode::Local => builder.compact().try_init(),
    };
}
