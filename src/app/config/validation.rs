use super::{Config, ConfigError};
use crate::buffer::{MAX_FLUSH_INTERVAL, MAX_QUEUE_CAPACITY};
use crate::sender::MAX_REQUEST_TIMEOUT;
use crate::sender::client::bulk_url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate endpoint URL
        bulk_url(&self.es_host, self.es_timeout)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid ES host: {e}")))?;

        if self.http_port == 0 {
            return Err(ConfigError::InvalidConfig(
                "HTTP port cannot be 0".to_string(),
            ));
        }

        // Validate timeouts
        if self.es_timeout_seconds == 0 || self.es_timeout_seconds > MAX_REQUEST_TIMEOUT.as_secs() {
            return Err(ConfigError::InvalidConfig(format!(
                "ES timeout must be between 1 and {} seconds",
                MAX_REQUEST_TIMEOUT.as_secs()
            )));
        }

        if self.flush_interval_seconds == 0
            || self.flush_interval_seconds > MAX_FLUSH_INTERVAL.as_secs()
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Flush interval must be between 1 and {} seconds",
                MAX_FLUSH_INTERVAL.as_secs()
            )));
        }

        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::InvalidConfig(format!(
                "Queue capacity must be between 1 and {MAX_QUEUE_CAPACITY}"
            )));
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::InvalidConfig(
                "Max body size must be greater than 0".to_string(),
            ));
        }

        // Basic auth is both-or-neither
        let has_username = self.es_username.as_deref().is_some_and(|u| !u.is_empty());
        let has_password = self.es_password.as_deref().is_some_and(|p| !p.is_empty());
        if has_username != has_password {
            return Err(ConfigError::InvalidConfig(
                "ES username and password must be set together".to_string(),
            ));
        }

        Ok(())
    }
}
