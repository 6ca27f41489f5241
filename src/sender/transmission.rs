use super::client::BulkClient;
use super::payload;
use super::response::BulkOutcome;
use crate::buffer::Batch;
use bytes::Bytes;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum TransmissionError {
    #[error("Bulk request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Connection to bulk endpoint failed: {0}")]
    Connection(#[source] reqwest::Error),
    #[error("Bulk request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("Failed to read bulk response body: {0}")]
    ResponseBody(#[source] reqwest::Error),
}

impl TransmissionError {
    fn from_send(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Connection(err)
        } else {
            Self::Request(err)
        }
    }

    fn from_body(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::ResponseBody(err)
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransmissionResult {
    pub batch_id: String,
    pub sequence: u64,
    pub item_count: usize,
    pub bytes_sent: usize,
    pub status_code: u16,
    pub latency: Duration,
    pub outcome: BulkOutcome,
    /// The request body, kept so partial failures can be reported with it.
    pub payload: Bytes,
}

#[derive(Debug, Clone)]
pub struct BatchTransmitter {
    client: BulkClient,
}

impl BatchTransmitter {
    pub fn new(client: BulkClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &BulkClient {
        &self.client
    }

    /// Send one batch as a single bulk request and classify the answer.
    /// Only transport-level failures are returned as errors.
    pub async fn send_batch(&self, batch: &Batch) -> Result<TransmissionResult, TransmissionError> {
        let start = Instant::now();
        let timeout = self.client.config().timeout;
        let payload = payload::render(batch);
        let bytes_sent = payload.len();

        debug!(
            batch_id = batch.id(),
            sequence = batch.sequence(),
            count = batch.len(),
            bytes = bytes_sent,
            age_ms = batch.created_at().elapsed().as_millis() as u64,
            "Sending bulk request"
        );

        let response = self
            .client
            .bulk_request(payload.clone())
            .send()
            .await
            .map_err(|e| TransmissionError::from_send(e, timeout))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransmissionError::from_body(e, timeout))?;
        let latency = start.elapsed();

        Ok(TransmissionResult {
            batch_id: batch.id().to_string(),
            sequence: batch.sequence(),
            item_count: batch.len(),
            bytes_sent,
            status_code: status.as_u16(),
            latency,
            outcome: BulkOutcome::classify(status, &body),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::client::ClientConfig;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transmitter(endpoint: &str, timeout: Duration) -> BatchTransmitter {
        BatchTransmitter::new(
            BulkClient::new(ClientConfig {
                endpoint: endpoint.to_string(),
                timeout,
                ..ClientConfig::default()
            })
            .unwrap(),
        )
    }

    fn batch() -> Batch {
        let item = Bytes::from_static(b"{\"delete\":{\"_id\":\"1\"}}\n");
        let len = item.len();
        Batch::new(3, vec![item], len)
    }

    #[tokio::test]
    async fn result_carries_batch_metadata_and_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"took":2,"errors":false,"items":[{}]}"#))
            .mount(&server)
            .await;

        let batch = batch();
        let result = transmitter(&server.uri(), Duration::from_secs(5))
            .send_batch(&batch)
            .await
            .unwrap();

        assert_eq!(result.batch_id, batch.id());
        assert_eq!(result.sequence, 3);
        assert_eq!(result.status_code, 200);
        assert_eq!(result.bytes_sent, batch.byte_len());
        assert_eq!(result.payload, batch.items()[0]);
        assert_eq!(
            result.outcome,
            BulkOutcome::Accepted {
                took_ms: Some(2),
                action_count: Some(1)
            }
        );
    }

    #[tokio::test]
    async fn slow_response_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let err = transmitter(&server.uri(), Duration::from_secs(1))
            .send_batch(&batch())
            .await
            .unwrap_err();
        assert!(matches!(err, TransmissionError::Timeout(t) if t == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        let err = transmitter("http://127.0.0.1:1", Duration::from_secs(2))
            .send_batch(&batch())
            .await
            .unwrap_err();
        assert!(matches!(err, TransmissionError::Connection(_)));
    }
}
