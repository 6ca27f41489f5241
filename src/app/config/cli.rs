use super::{ConfigError, LogFormat, LogLevel};
use crate::handler::cors::CorsPolicy;
use crate::handler::ingest::DEFAULT_MAX_BODY_BYTES;
use crate::sender::{ClientConfig, Credentials, DispatcherConfig};
use clap::Parser;
use clap::builder::{BoolishValueParser, FalseyValueParser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(
    author,
    version,
    about = "Buffers ingested documents and forwards them as Elasticsearch _bulk requests",
    long_about = None
)]
#[serde(default)]
pub struct Config {
    /// Port the ingestion server listens on
    #[arg(long, env = "ESB_HTTP_PORT", default_value = "8889")]
    pub http_port: u16,

    /// Elasticsearch base URL (protocol + host)
    #[arg(long, env = "ESB_ES_HOST", default_value = "http://localhost:9200")]
    pub es_host: String,

    /// Basic-auth username for the _bulk endpoint
    #[arg(long, env = "ESB_ES_USERNAME")]
    pub es_username: Option<String>,

    /// Basic-auth password for the _bulk endpoint
    #[arg(long, env = "ESB_ES_PASSWORD", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub es_password: Option<String>,

    /// Bulk request timeout in seconds
    #[arg(long, env = "ESB_ES_TIMEOUT_SECONDS", default_value = "60")]
    pub es_timeout_seconds: u64,

    /// Interval between flushes in seconds
    #[arg(long, env = "ESB_FLUSH_INTERVAL_SECONDS", default_value = "60")]
    pub flush_interval_seconds: u64,

    /// Flushed batches that may wait for delivery before flushing blocks
    #[arg(long, env = "ESB_QUEUE_CAPACITY", default_value = "16")]
    pub queue_capacity: usize,

    /// Largest accepted ingest request body in bytes
    #[arg(long, env = "ESB_MAX_BODY_BYTES", default_value = "16777216")]
    pub max_body_bytes: usize,

    /// Echo any request Origin back in CORS responses
    #[arg(
        long,
        env = "ESB_ALLOW_ALL_ORIGINS",
        default_value = "true",
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub allow_all_origins: bool,

    /// Comma-separated origins allowed when allow-all is off
    #[arg(long, env = "ESB_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Enable trace logging (overrides --log-level)
    #[arg(long, env = "ESB_DEBUG", value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// Log level
    #[arg(long, env = "ESB_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "ESB_LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,

    /// TOML configuration file; replaces CLI and environment values
    #[arg(long, env = "ESB_CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub es_timeout: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub flush_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8889,
            es_host: "http://localhost:9200".to_string(),
            es_username: None,
            es_password: None,
            es_timeout_seconds: 60,
            flush_interval_seconds: 60,
            queue_capacity: crate::buffer::DEFAULT_QUEUE_CAPACITY,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            allow_all_origins: true,
            allowed_origins: Vec::new(),
            debug: false,
            log_level: LogLevel::Info,
            log_format: LogFormat::Json,
            config_file: None,
            es_timeout: Duration::from_secs(60),
            flush_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Parse the process arguments and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(std::env::args_os())
    }

    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::try_parse_from(args)?;

        if let Some(config_file) = config.config_file.take() {
            return Self::from_file(config_file);
        }

        config.post_process();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.post_process();
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) {
        self.es_timeout = Duration::from_secs(self.es_timeout_seconds);
        self.flush_interval = Duration::from_secs(self.flush_interval_seconds);
        self.allowed_origins = self
            .allowed_origins
            .iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
    }

    pub fn effective_log_level(&self) -> LogLevel {
        if self.debug {
            LogLevel::Trace
        } else {
            self.log_level
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.es_username, &self.es_password) {
            (Some(username), Some(password)) => Credentials::new(username, password),
            _ => None,
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            client: ClientConfig {
                endpoint: self.es_host.clone(),
                timeout: self.es_timeout,
                credentials: self.credentials(),
                ..ClientConfig::default()
            },
            flush_interval: self.flush_interval,
            queue_capacity: self.queue_capacity,
        }
    }

    pub fn cors_policy(&self) -> CorsPolicy {
        CorsPolicy::new(self.allow_all_origins, self.allowed_origins.iter().cloned())
    }
}
