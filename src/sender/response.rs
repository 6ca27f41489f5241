use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

/// How the bulk endpoint answered a delivered batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOutcome {
    /// 2xx without a reported `errors: true`.
    Accepted {
        took_ms: Option<u64>,
        action_count: Option<usize>,
    },
    /// 2xx, but the store flagged failures for individual actions.
    PartialFailure {
        failed_actions: usize,
        response_body: String,
    },
    /// Non-2xx status; nothing in the batch is assumed to be applied.
    Rejected { status: u16, response_body: String },
}

impl BulkOutcome {
    pub fn classify(status: StatusCode, body: &[u8]) -> Self {
        if !status.is_success() {
            return Self::Rejected {
                status: status.as_u16(),
                response_body: String::from_utf8_lossy(body).into_owned(),
            };
        }

        let parsed: Value = match serde_json::from_slice(body) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "Bulk response is not JSON, treating batch as accepted");
                return Self::Accepted {
                    took_ms: None,
                    action_count: None,
                };
            }
        };

        let actions = parsed.get("items").and_then(Value::as_array);

        if parsed.get("errors").and_then(Value::as_bool) == Some(true) {
            let failed_actions =
                actions.map_or(0, |actions| actions.iter().filter(|a| action_failed(a)).count());
            return Self::PartialFailure {
                failed_actions,
                response_body: String::from_utf8_lossy(body).into_owned(),
            };
        }

        Self::Accepted {
            took_ms: parsed.get("took").and_then(Value::as_u64),
            action_count: actions.map(Vec::len),
        }
    }
}

// Each entry looks like `{"index": {"status": 400, "error": {...}}}`.
fn action_failed(action: &Value) -> bool {
    action
        .as_object()
        .is_some_and(|ops| ops.values().any(|result| result.get("error").is_some()))
}
