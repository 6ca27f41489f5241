//! Time-driven batching buffer.
//!
//! Producers append items under a short synchronous lock. A ticker task, an
//! explicit [`Batcher::flush`] or [`Batcher::stop`] snapshots and clears the
//! buffer in one critical section and hands the resulting [`Batch`] to a
//! bounded channel. When the consumer falls behind, the flush trigger waits
//! for channel capacity while `add` keeps accepting items.

use super::batch::{Batch, Item};
use super::error::BatcherError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Batches that may wait in the hand-off channel before flushing blocks.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Upper bound on the hand-off channel capacity.
pub const MAX_QUEUE_CAPACITY: usize = 65_536;

/// Longest accepted flush interval (one week).
pub const MAX_FLUSH_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatcherState {
    Idle,
    Running,
    Stopped,
}

#[derive(Default)]
struct Pending {
    items: Vec<Item>,
    byte_len: usize,
    next_sequence: u64,
    sealed: bool,
}

impl Pending {
    fn take(&mut self) -> Option<Batch> {
        if self.items.is_empty() {
            return None;
        }

        let items = std::mem::take(&mut self.items);
        let byte_len = std::mem::take(&mut self.byte_len);
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        Some(Batch::new(sequence, items, byte_len))
    }
}

struct Shared {
    pending: Mutex<Pending>,
    // Held across snapshot and send so batches enter the channel in arrival
    // order. `None` once the batcher has stopped.
    emitter: AsyncMutex<Option<mpsc::Sender<Batch>>>,
}

impl Shared {
    async fn flush(&self) -> usize {
        let emitter = self.emitter.lock().await;
        let Some(sender) = emitter.as_ref() else {
            return 0;
        };

        let batch = self.pending.lock().take();
        match batch {
            Some(batch) => emit(sender, batch).await,
            None => {
                trace!("Flush skipped, buffer is empty");
                0
            }
        }
    }
}

async fn emit(sender: &mpsc::Sender<Batch>, batch: Batch) -> usize {
    let count = batch.len();
    debug!(
        batch_id = batch.id(),
        sequence = batch.sequence(),
        count,
        bytes = batch.byte_len(),
        "Emitting batch"
    );

    if sender.send(batch).await.is_err() {
        warn!(count, "Batch receiver dropped, discarding batch");
    }
    count
}

struct Lifecycle {
    state: BatcherState,
    shutdown: CancellationToken,
    ticker: Option<JoinHandle<()>>,
}

/// In-memory FIFO buffer that emits its contents as [`Batch`]es.
///
/// An `add` racing with `stop` is linearized on the buffer lock: it either
/// lands in the final batch or fails with [`BatcherError::AlreadyStopped`].
pub struct Batcher {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

impl Batcher {
    /// Create an idle batcher and the receiving end of its batch channel.
    /// `queue_capacity` must be within `1..=MAX_QUEUE_CAPACITY`.
    pub fn new(queue_capacity: usize) -> Result<(Self, mpsc::Receiver<Batch>), BatcherError> {
        if queue_capacity == 0 || queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(BatcherError::InvalidCapacity(queue_capacity));
        }
        let (sender, receiver) = mpsc::channel(queue_capacity);

        let batcher = Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(Pending::default()),
                emitter: AsyncMutex::new(Some(sender)),
            }),
            lifecycle: Mutex::new(Lifecycle {
                state: BatcherState::Idle,
                shutdown: CancellationToken::new(),
                ticker: None,
            }),
        };

        Ok((batcher, receiver))
    }

    /// Begin flushing every `interval`, which must be within
    /// `(0, MAX_FLUSH_INTERVAL]`. Must be called inside a Tokio runtime.
    pub fn start(&self, interval: Duration) -> Result<(), BatcherError> {
        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            BatcherState::Running => return Err(BatcherError::AlreadyStarted),
            BatcherState::Stopped => return Err(BatcherError::AlreadyStopped),
            BatcherState::Idle => {}
        }
        if interval.is_zero() || interval > MAX_FLUSH_INTERVAL {
            return Err(BatcherError::InvalidInterval);
        }

        let ticker = tokio::spawn(run_ticker(
            Arc::clone(&self.shared),
            interval,
            lifecycle.shutdown.clone(),
        ));
        lifecycle.ticker = Some(ticker);
        lifecycle.state = BatcherState::Running;

        info!(interval_ms = interval.as_millis() as u64, "Batcher started");
        Ok(())
    }

    /// Append an item to the tail of the buffer.
    pub fn add(&self, item: impl Into<Item>) -> Result<(), BatcherError> {
        let item = item.into();
        let mut pending = self.shared.pending.lock();
        if pending.sealed {
            return Err(BatcherError::AlreadyStopped);
        }

        pending.byte_len += item.len();
        pending.items.push(item);
        Ok(())
    }

    /// Emit everything buffered so far. Returns the number of items emitted,
    /// zero when the buffer was empty or the batcher has stopped.
    pub async fn flush(&self) -> usize {
        self.shared.flush().await
    }

    /// Stop the ticker, emit the residual items as a final batch and close
    /// the channel. Returns the number of items in the final batch.
    pub async fn stop(&self) -> Result<usize, BatcherError> {
        let ticker = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state == BatcherState::Stopped {
                return Err(BatcherError::AlreadyStopped);
            }
            lifecycle.state = BatcherState::Stopped;
            lifecycle.shutdown.cancel();
            lifecycle.ticker.take()
        };

        if let Some(ticker) = ticker {
            if let Err(e) = ticker.await {
                warn!(error = %e, "Batcher ticker task ended abnormally");
            }
        }

        let mut emitter = self.shared.emitter.lock().await;
        let residual = {
            let mut pending = self.shared.pending.lock();
            pending.sealed = true;
            pending.take()
        };

        let Some(sender) = emitter.take() else {
            return Ok(0);
        };
        let count = match residual {
            Some(batch) => emit(&sender, batch).await,
            None => 0,
        };

        info!(count, "Batcher stopped after final flush");
        Ok(count)
    }

    pub fn state(&self) -> BatcherState {
        self.lifecycle.lock().state
    }

    /// Number of items waiting for the next emission.
    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().items.len()
    }
}

impl Drop for Batcher {
    fn drop(&mut self) {
        self.lifecycle.get_mut().shutdown.cancel();
    }
}

impl std::fmt::Debug for Batcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batcher")
            .field("state", &self.state())
            .field("pending_len", &self.pending_len())
            .finish()
    }
}

async fn run_ticker(shared: Arc<Shared>, period: Duration, shutdown: CancellationToken) {
    let Some(first_tick) = Instant::now().checked_add(period) else {
        warn!(period_secs = period.as_secs(), "Flush interval overflows the clock, ticker not started");
        return;
    };
    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                shared.flush().await;
            }
        }
    }

    debug!("Batcher ticker stopped");
}
