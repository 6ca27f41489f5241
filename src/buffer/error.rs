use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatcherError {
    #[error("Batcher is already running")]
    AlreadyStarted,

    #[error("Batcher has been stopped")]
    AlreadyStopped,

    #[error("Invalid flush interval: must be greater than zero and at most one week")]
    InvalidInterval,

    #[error("Invalid queue capacity {0}: must be between 1 and 65536")]
    InvalidCapacity(usize),
}
