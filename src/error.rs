use crate::app::config::ConfigError;
use crate::sender::DispatchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Bulk dispatcher error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Failed to bind to address {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}
