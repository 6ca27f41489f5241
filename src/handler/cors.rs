//! CORS and server identification headers for the ingestion route.

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use std::collections::HashSet;
use std::sync::Arc;

pub const X_SERVER_NAME: HeaderName = HeaderName::from_static("x-server-name");
pub const X_SERVER_UNIX_TIMESTAMP: HeaderName =
    HeaderName::from_static("x-server-unix-timestamp");

const ALLOWED_HEADERS: &str = "Content-Type, X-Server-Name, X-Server-Unix-Timestamp";
const ALLOWED_METHODS: &str = "POST, OPTIONS";

#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allow_all_origins: bool,
    allowed_origins: HashSet<String>,
}

impl CorsPolicy {
    pub fn new(allow_all_origins: bool, allowed_origins: impl IntoIterator<Item = String>) -> Self {
        Self {
            allow_all_origins,
            allowed_origins: allowed_origins
                .into_iter()
                .filter(|origin| !origin.is_empty())
                .collect(),
        }
    }

    pub fn allow_all() -> Self {
        Self::new(true, std::iter::empty())
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allow_all_origins || self.allowed_origins.contains(origin)
    }

    /// Write the CORS and identification headers onto a response. The
    /// request origin is echoed back only when the policy admits it.
    pub fn apply(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        let admitted =
            origin.filter(|origin| origin.to_str().is_ok_and(|value| self.allows(value)));
        if let Some(origin) = admitted {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        }

        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(X_SERVER_NAME, server_name());
        headers.insert(
            X_SERVER_UNIX_TIMESTAMP,
            HeaderValue::from(chrono::Utc::now().timestamp()),
        );
    }
}

fn server_name() -> HeaderValue {
    HeaderValue::from_str(&format!("Elasticsearch-Batcher/{}", crate::VERSION))
        .unwrap_or_else(|_| HeaderValue::from_static("Elasticsearch-Batcher"))
}

/// Middleware applying [`CorsPolicy`] to every response of the wrapped routes.
pub async fn cors_layer(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request.headers().get(ORIGIN).cloned();
    let mut response = next.run(request).await;
    policy.apply(origin.as_ref(), response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_all_echoes_any_origin() {
        let mut headers = HeaderMap::new();
        let origin = HeaderValue::from_static("https://anywhere.example");
        CorsPolicy::allow_all().apply(Some(&origin), &mut headers);

        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], origin);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert!(headers.contains_key(X_SERVER_UNIX_TIMESTAMP));
    }

    #[test]
    fn listed_origin_is_echoed_and_others_are_not() {
        let policy = CorsPolicy::new(false, ["https://app.example".to_string()]);
        assert!(policy.allows("https://app.example"));
        assert!(!policy.allows("https://evil.example"));

        let mut headers = HeaderMap::new();
        policy.apply(
            Some(&HeaderValue::from_static("https://evil.example")),
            &mut headers,
        );
        assert!(!headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], ALLOWED_METHODS);
    }

    #[test]
    fn server_name_carries_version() {
        let value = server_name();
        assert!(value.to_str().unwrap().starts_with("Elasticsearch-Batcher/"));
    }
}
