pub mod client;
pub mod dispatcher;
pub mod payload;
pub mod response;
pub mod stats;
pub mod transmission;

pub use client::{
    BulkClient, ClientConfig, ClientError, Credentials, MAX_REQUEST_TIMEOUT, NDJSON_CONTENT_TYPE,
};
pub use dispatcher::{DispatchError, Dispatcher, DispatcherConfig, DispatcherState};
pub use response::BulkOutcome;
pub use stats::{DispatchStats, DispatchStatsSnapshot};
pub use transmission::{BatchTransmitter, TransmissionError, TransmissionResult};
