use crate::handler::cors::CorsPolicy;
use crate::handler::ingest::DEFAULT_MAX_BODY_BYTES;
use crate::sender::Dispatcher;
use std::sync::Arc;

/// Shared application state handed to the routers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub cors: Arc<CorsPolicy>,
    pub max_body_bytes: usize,
}

impl AppState {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, cors: CorsPolicy) -> Self {
        Self {
            dispatcher,
            cors: Arc::new(cors),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}
