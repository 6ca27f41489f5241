//! Bulk dispatcher: owns a [`Batcher`] and the single task that turns each
//! emitted batch into one `_bulk` request.
//!
//! Delivery outcomes never reach the caller of [`Dispatcher::enqueue`]; by
//! the time a batch is sent the ingestion request has long been answered.
//! They are reported through logs and [`DispatchStats`].

use super::client::{BulkClient, ClientConfig, ClientError};
use super::response::BulkOutcome;
use super::stats::{DispatchStats, DispatchStatsSnapshot};
use super::transmission::{BatchTransmitter, TransmissionResult};
use crate::buffer::{Batch, Batcher, BatcherError, DEFAULT_QUEUE_CAPACITY, Item};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
    #[error("Batcher error: {0}")]
    Batcher(#[from] BatcherError),
    #[error("Dispatcher has been stopped")]
    AlreadyStopped,
    #[error("Consumption loop failed: {0}")]
    Consumer(#[from] tokio::task::JoinError),
}

impl DispatchError {
    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            Self::AlreadyStopped | Self::Batcher(BatcherError::AlreadyStopped)
        )
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub client: ClientConfig,
    pub flush_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            flush_interval: Duration::from_secs(60),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Construction is the `Idle -> Running` transition, so a dispatcher is
/// never observed idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Running,
    /// `stop` called; the final batch may still be in flight.
    Draining,
    Stopped,
}

pub struct Dispatcher {
    batcher: Batcher,
    client: BulkClient,
    stats: Arc<DispatchStats>,
    state: Mutex<DispatcherState>,
    consumer: AsyncMutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Build the client, start the batcher and spawn the consumption loop.
    /// Must be called inside a Tokio runtime.
    pub fn new(config: DispatcherConfig) -> Result<Self, DispatchError> {
        let client = BulkClient::new(config.client)?;
        let (batcher, batches) = Batcher::new(config.queue_capacity)?;
        batcher.start(config.flush_interval)?;

        let stats = Arc::new(DispatchStats::new());
        let consumer = tokio::spawn(consume(
            batches,
            BatchTransmitter::new(client.clone()),
            Arc::clone(&stats),
        ));

        info!(
            endpoint = %client.bulk_url(),
            flush_interval_secs = config.flush_interval.as_secs(),
            queue_capacity = config.queue_capacity,
            auth_enabled = client.credentials().is_some(),
            "Bulk dispatcher started"
        );

        Ok(Self {
            batcher,
            client,
            stats,
            state: Mutex::new(DispatcherState::Running),
            consumer: AsyncMutex::new(Some(consumer)),
        })
    }

    /// Queue one pre-framed item for the next bulk request.
    pub fn enqueue(&self, item: impl Into<Item>) -> Result<(), DispatchError> {
        self.batcher.add(item).map_err(|e| match e {
            BatcherError::AlreadyStopped => DispatchError::AlreadyStopped,
            other => DispatchError::Batcher(other),
        })
    }

    /// Emit the buffered items now instead of waiting for the next tick.
    pub async fn flush(&self) -> usize {
        self.batcher.flush().await
    }

    /// Replace the basic-auth pair used by subsequent requests. A pair with
    /// an empty half disables authentication.
    pub fn set_credentials(&self, username: &str, password: &str) {
        let enabled = self.client.set_credentials(username, password);
        if !enabled {
            warn!("Bulk dispatcher credentials cleared, requests will be sent without auth");
        }
    }

    /// Flush the residual items and wait until the consumption loop has
    /// delivered (or given up on) every emitted batch. Concurrent and repeat
    /// callers all return only once draining has finished.
    pub async fn stop(&self) -> Result<(), DispatchError> {
        // Held for the whole drain so later callers wait for it to finish
        let mut consumer = self.consumer.lock().await;
        {
            let mut state = self.state.lock();
            if *state == DispatcherState::Stopped {
                debug!("Dispatcher already stopped, ignoring");
                return Ok(());
            }
            *state = DispatcherState::Draining;
        }
        info!("Bulk dispatcher draining");

        let final_items = match self.batcher.stop().await {
            Ok(count) => count,
            Err(BatcherError::AlreadyStopped) => 0,
            Err(e) => return Err(e.into()),
        };

        let joined = match consumer.take() {
            Some(handle) => handle.await,
            None => Ok(()),
        };
        *self.state.lock() = DispatcherState::Stopped;

        let stats = self.stats();
        info!(
            final_items,
            batches_dispatched = stats.batches_dispatched,
            items_dispatched = stats.items_dispatched,
            batches_accepted = stats.batches_accepted,
            partial_failures = stats.partial_failures,
            batches_rejected = stats.batches_rejected,
            transport_failures = stats.transport_failures,
            "Bulk dispatcher stopped"
        );

        joined.map_err(DispatchError::from)
    }

    pub fn state(&self) -> DispatcherState {
        *self.state.lock()
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn bulk_url(&self) -> &Url {
        self.client.bulk_url()
    }

    pub fn pending_len(&self) -> usize {
        self.batcher.pending_len()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("bulk_url", self.client.bulk_url())
            .field("state", &self.state())
            .field("batcher", &self.batcher)
            .finish_non_exhaustive()
    }
}

// One batch at a time: the next recv only happens after the previous
// request completed or failed.
async fn consume(
    mut batches: mpsc::Receiver<Batch>,
    transmitter: BatchTransmitter,
    stats: Arc<DispatchStats>,
) {
    debug!("Bulk consumption loop started");

    while let Some(batch) = batches.recv().await {
        dispatch(&transmitter, &stats, batch).await;
    }

    debug!("Batch channel closed, consumption loop exiting");
}

async fn dispatch(transmitter: &BatchTransmitter, stats: &DispatchStats, batch: Batch) {
    let start = Instant::now();
    match transmitter.send_batch(&batch).await {
        Ok(result) => {
            stats.record_result(&result);
            report_outcome(transmitter.client().bulk_url(), &result);
        }
        Err(e) => {
            stats.record_transport_failure(batch.len(), start.elapsed());
            error!(
                endpoint = %transmitter.client().bulk_url(),
                batch_id = batch.id(),
                count = batch.len(),
                error = %e,
                "Bulk request failed, dropping batch"
            );
        }
    }
}

pub(crate) fn report_outcome(endpoint: &Url, result: &TransmissionResult) {
    match &result.outcome {
        BulkOutcome::Accepted { took_ms, .. } => {
            info!(
                batch_id = %result.batch_id,
                sequence = result.sequence,
                status_code = result.status_code,
                count = result.item_count,
                bytes = result.bytes_sent,
                latency_ms = result.latency.as_millis() as u64,
                took_ms = ?took_ms,
                "Bulk request accepted"
            );
        }
        BulkOutcome::Rejected {
            status,
            response_body,
        } => {
            error!(
                endpoint = %endpoint,
                status_code = *status,
                batch_id = %result.batch_id,
                count = result.item_count,
                response_body = %response_body,
                "Bulk request rejected, dropping batch"
            );
        }
        BulkOutcome::PartialFailure {
            failed_actions,
            response_body,
        } => {
            error!(
                endpoint = %endpoint,
                batch_id = %result.batch_id,
                count = result.item_count,
                failed_actions = *failed_actions,
                request_payload = %String::from_utf8_lossy(&result.payload),
                response_body = %response_body,
                "Bulk endpoint reported errors with payload"
            );
        }
    }
}
