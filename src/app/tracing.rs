use super::config::{LogFormat, LogLevel};
use crate::error::AppError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const QUIET_DEPENDENCIES: &str = "hyper=warn,reqwest=warn,h2=warn,tower=warn";

/// Build the filter: `RUST_LOG` wins when set, otherwise the configured level
/// with chatty HTTP dependencies held at warn.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},{QUIET_DEPENDENCIES}", level.as_str()))
    })
}

/// Initialize the tracing subscriber. JSON is the production default.
pub fn init_tracing(level: LogLevel, format: LogFormat) -> Result<(), AppError> {
    let filter = env_filter(level);

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true),
            )
            .with(filter)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().pretty())
            .with(filter)
            .try_init(),
    };

    result.map_err(|e| AppError::Logging(e.to_string()))
}
