#![warn(rust_2018_idioms)]
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
#![allow(
    clippy::cast_possible_truncation, // Millisecond latencies fit in u64
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. BatcherError in buffer module
    clippy::must_use_candidate        // Annotated selectively on critical APIs
)]

pub mod app;
pub mod buffer;
pub mod error;
pub mod handler;
pub mod sender;

pub use buffer::{Batch, Batcher, BatcherError, BatcherState, Item};
pub use error::AppError;
pub use sender::{
    BulkClient, BulkOutcome, ClientConfig, Credentials, DispatchError, DispatchStatsSnapshot,
    Dispatcher, DispatcherConfig, DispatcherState,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
