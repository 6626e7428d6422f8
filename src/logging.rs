//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `config.level` when set. Returns `false` if a subscriber
/// was already installed (tests, embedding applications), which is not an error.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
            .is_ok(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true))
            .try_init()
            .is_ok(),
    }
}
