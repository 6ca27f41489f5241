pub mod batch;
pub mod batcher;
pub mod error;

pub use batch::{Batch, Item};
pub use batcher::{
    Batcher, BatcherState, DEFAULT_QUEUE_CAPACITY, MAX_FLUSH_INTERVAL, MAX_QUEUE_CAPACITY,
};
pub use error::BatcherError;
