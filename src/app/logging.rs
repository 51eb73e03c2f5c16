use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use super::error::AppError;
use crate::config::{LogConfig, LogFormat};

/// Install the global tracing subscriber
///
/// Events go to stderr so stdout stays clean for command output. `RUST_LOG`
/// directives are honoured on top of the configured level. Call once at
/// startup; a second call fails.
pub fn init_logging(config: &LogConfig) -> Result<(), AppError> {
    let filter = EnvFilter::from_default_env().add_directive(config.level.to_tracing_level().into());
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init(),
    };

    installed.map_err(|e| AppError::Logging(e.to_string()))
}
