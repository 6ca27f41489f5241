use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum_test::TestServer;
use bulk_batcher::app::router::main_router;
use bulk_batcher::app::state::AppState;
use bulk_batcher::handler::cors::CorsPolicy;
use bulk_batcher::handler::ingest::SyncResponse;
use bulk_batcher::{ClientConfig, Dispatcher, DispatcherConfig};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOC: &str = "{\"index\":{\"_index\":\"events\"}}\n{\"event\":\"click\"}\n";

fn test_dispatcher(endpoint: &str) -> Arc<Dispatcher> {
    Arc::new(
        Dispatcher::new(DispatcherConfig {
            client: ClientConfig {
                endpoint: endpoint.to_string(),
                timeout: Duration::from_secs(5),
                ..ClientConfig::default()
            },
            flush_interval: Duration::from_secs(3600),
            queue_capacity: 4,
        })
        .unwrap(),
    )
}

fn test_server(dispatcher: Arc<Dispatcher>, cors: CorsPolicy) -> TestServer {
    TestServer::new(main_router(AppState::new(dispatcher, cors))).unwrap()
}

#[tokio::test]
async fn test_health_and_banner() {
    let server = test_server(test_dispatcher("http://localhost:9200"), CorsPolicy::allow_all());

    let response = server.get("/v1/health").await;
    response.assert_status_ok();
    response.assert_text("Healthy");

    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("Elasticsearch Batcher");
}

#[tokio::test]
async fn test_ingest_queues_body_and_returns_created() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(body_string(format!("{DOC}{DOC}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"errors":false}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dispatcher = test_dispatcher(&mock_server.uri());
    let server = test_server(Arc::clone(&dispatcher), CorsPolicy::allow_all());

    for _ in 0..2 {
        let response = server.post("/ingest/v1").text(DOC).await;
        response.assert_status(StatusCode::CREATED);
    }
    assert_eq!(dispatcher.pending_len(), 2);

    // stop drains the two queued bodies as a single bulk request
    dispatcher.stop().await.unwrap();
    assert_eq!(dispatcher.stats().batches_accepted, 1);
}

#[tokio::test]
async fn test_empty_body_returns_server_time() {
    let dispatcher = test_dispatcher("http://localhost:9200");
    let server = test_server(Arc::clone(&dispatcher), CorsPolicy::allow_all());

    let before = chrono::Utc::now().timestamp();
    let response = server.post("/ingest/v1").await;
    response.assert_status_ok();

    let sync: SyncResponse = response.json();
    assert!(sync.t >= before);
    assert_eq!(dispatcher.pending_len(), 0);
}

#[tokio::test]
async fn test_ingest_after_stop_returns_service_unavailable() {
    let dispatcher = test_dispatcher("http://localhost:9200");
    dispatcher.stop().await.unwrap();
    let server = test_server(dispatcher, CorsPolicy::allow_all());

    let response = server.post("/ingest/v1").text(DOC).await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_preflight_and_unsupported_methods() {
    let server = test_server(test_dispatcher("http://localhost:9200"), CorsPolicy::allow_all());

    let response = server.method(Method::OPTIONS, "/ingest/v1").await;
    response.assert_status_ok();
    assert_eq!(
        response.headers()["access-control-allow-methods"],
        "POST, OPTIONS"
    );

    let response = server.get("/ingest/v1").await;
    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_cors_headers_follow_policy() {
    let server = test_server(
        test_dispatcher("http://localhost:9200"),
        CorsPolicy::new(false, ["https://app.example".to_string()]),
    );

    let response = server
        .post("/ingest/v1")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("https://app.example"),
        )
        .await;
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "https://app.example");
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(
        headers["access-control-allow-headers"],
        "Content-Type, X-Server-Name, X-Server-Unix-Timestamp"
    );
    assert!(
        headers["x-server-name"]
            .to_str()
            .unwrap()
            .starts_with("Elasticsearch-Batcher/")
    );
    assert!(headers.contains_key("x-server-unix-timestamp"));

    let response = server
        .post("/ingest/v1")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("https://other.example"),
        )
        .await;
    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_health_route_has_no_cors_headers() {
    let server = test_server(test_dispatcher("http://localhost:9200"), CorsPolicy::allow_all());

    let response = server.get("/v1/health").await;
    assert!(!response.headers().contains_key("x-server-name"));
}

#[tokio::test]
async fn test_body_over_limit_is_rejected() {
    let dispatcher = test_dispatcher("http://localhost:9200");
    let state = AppState::new(Arc::clone(&dispatcher), CorsPolicy::allow_all())
        .with_max_body_bytes(DOC.len());
    let server = TestServer::new(main_router(state)).unwrap();

    let response = server.post("/ingest/v1").text(DOC).await;
    response.assert_status(StatusCode::CREATED);

    let response = server.post("/ingest/v1").text(format!("{DOC}{DOC}")).await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(dispatcher.pending_len(), 1);
}
