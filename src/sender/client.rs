use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, ClientBuilder, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;
use url::Url;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Longest accepted bulk request timeout (one day).
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Basic-auth pair. Only constructible with both halves present.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Returns `None` unless both username and password are non-empty.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Option<Self> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base address of the document store, e.g. `http://localhost:9200`.
    pub endpoint: String,
    /// Bound on a whole bulk request; also sent as the `timeout` query parameter.
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub max_connections: usize,
    pub keep_alive_timeout: Duration,
    pub user_agent: String,
    pub credentials: Option<Credentials>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200".to_string(),
            timeout: Duration::from_secs(60),
            connection_timeout: Duration::from_secs(10),
            max_connections: 10,
            keep_alive_timeout: Duration::from_secs(60),
            user_agent: format!("bulk-batcher/{}", env!("CARGO_PKG_VERSION")),
            credentials: None,
        }
    }
}

/// HTTP client bound to one `_bulk` endpoint.
///
/// Clones share the connection pool and the credential slot, so credentials
/// replaced through any clone apply to the next request of every clone.
#[derive(Debug, Clone)]
pub struct BulkClient {
    client: Client,
    config: ClientConfig,
    bulk_url: Url,
    credentials: Arc<RwLock<Option<Credentials>>>,
}

impl BulkClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.timeout.is_zero() || config.timeout > MAX_REQUEST_TIMEOUT {
            return Err(ClientError::InvalidConfiguration(format!(
                "Request timeout must be between 1s and {}s",
                MAX_REQUEST_TIMEOUT.as_secs()
            )));
        }

        let bulk_url = bulk_url(&config.endpoint, config.timeout)?;

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .pool_max_idle_per_host(config.max_connections)
            .pool_idle_timeout(config.keep_alive_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let credentials = Arc::new(RwLock::new(config.credentials.clone()));

        Ok(Self {
            client,
            config,
            bulk_url,
            credentials,
        })
    }

    /// Fully resolved `{endpoint}/_bulk?timeout={N}s` target.
    pub fn bulk_url(&self) -> &Url {
        &self.bulk_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Replace the stored credentials. Authentication is disabled unless both
    /// halves are non-empty. Returns whether authentication is now enabled.
    pub fn set_credentials(&self, username: &str, password: &str) -> bool {
        let credentials = Credentials::new(username, password);
        let enabled = credentials.is_some();
        *self.credentials.write() = credentials;

        trace!(username, auth_enabled = enabled, "Updated bulk client credentials");
        enabled
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials.read().clone()
    }

    /// Build the bulk POST for a rendered payload.
    pub(crate) fn bulk_request(&self, payload: Bytes) -> RequestBuilder {
        let request = self
            .client
            .post(self.bulk_url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static(NDJSON_CONTENT_TYPE))
            .body(payload);

        match self.credentials() {
            Some(credentials) => {
                request.basic_auth(credentials.username(), Some(credentials.password()))
            }
            None => request,
        }
    }
}

/// Resolve the bulk target for a base endpoint, keeping any path prefix.
pub fn bulk_url(endpoint: &str, timeout: Duration) -> Result<Url, ClientError> {
    let mut url = Url::parse(endpoint).map_err(|e| {
        ClientError::InvalidConfiguration(format!("Invalid endpoint URL '{endpoint}': {e}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ClientError::InvalidConfiguration(format!(
            "Endpoint must be an http(s) URL, got '{endpoint}'"
        )));
    }

    let path = format!("{}/_bulk", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(Some(&format!("timeout={}s", timeout.as_secs())));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_url_appends_path_and_timeout() {
        let url = bulk_url("http://localhost:9200", Duration::from_secs(60)).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/_bulk?timeout=60s");
    }

    #[test]
    fn bulk_url_keeps_path_prefix() {
        let url = bulk_url("https://search.example.com/es/", Duration::from_secs(5)).unwrap();
        assert_eq!(url.as_str(), "https://search.example.com/es/_bulk?timeout=5s");
    }

    #[test]
    fn bulk_url_rejects_non_http_endpoints() {
        assert!(bulk_url("localhost:9200", Duration::from_secs(5)).is_err());
        assert!(bulk_url("ftp://example.com", Duration::from_secs(5)).is_err());
        assert!(bulk_url("not a url", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn credentials_require_both_halves() {
        assert!(Credentials::new("elastic", "changeme").is_some());
        assert!(Credentials::new("", "changeme").is_none());
        assert!(Credentials::new("elastic", "").is_none());
        assert!(Credentials::new("", "").is_none());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials::new("elastic", "changeme").unwrap();
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("elastic"));
        assert!(!rendered.contains("changeme"));
    }

    #[test]
    fn set_credentials_is_shared_between_clones() {
        let client = BulkClient::new(ClientConfig::default()).unwrap();
        let clone = client.clone();

        assert!(client.set_credentials("elastic", "changeme"));
        assert_eq!(clone.credentials().unwrap().username(), "elastic");

        assert!(!client.set_credentials("elastic", ""));
        assert!(clone.credentials().is_none());
    }

    #[test]
    fn out_of_range_timeout_is_rejected() {
        for timeout in [Duration::ZERO, MAX_REQUEST_TIMEOUT + Duration::from_secs(1)] {
            let config = ClientConfig {
                timeout,
                ..Default::default()
            };
            assert!(matches!(
                BulkClient::new(config),
                Err(ClientError::InvalidConfiguration(_))
            ));
        }
    }
}
