// remote_destination.rs
// Purpose: Batched remote sink with timed flushes and exponential-backoff retry

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::console_destination::console_warn;
use crate::destination::{Destination, DestinationGate};
use crate::errors::{LogshipResult, SafeLock};
use crate::record::{LogLevel, LogRecord};
use crate::transport::{BatchPayload, LogTransport};

/// Batching and retry parameters.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            batch_size: 10,
            flush_interval: Duration::from_millis(5000),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
        }
    }
}

/// Buffer and retry counter share one lock: the swap that starts a flush and
/// the requeue that follows a failure are both atomic with concurrent
/// delivers, so a record is always in exactly one place.
struct BufferState {
    buffer: Vec<LogRecord>,
    retry_count: u32,
}

struct RemoteInner {
    gate: DestinationGate,
    config: RemoteConfig,
    transport: Arc<dyn LogTransport>,
    state: Mutex<BufferState>,
    timer: Mutex<Option<JoinHandle<()>>>,
    // Serializes network sends so batches leave in buffer order.
    send_serial: Mutex<()>,
    handle: Handle,
}

impl RemoteInner {
    /// Schedule a single-shot flush after `delay`. With `replace` false an
    /// already-pending timer wins (idempotent scheduling from `deliver`);
    /// with `replace` true the pending timer is cancelled first (backoff
    /// rescheduling after a failed send).
    fn schedule_flush(self: &Arc<Self>, delay: Duration, replace: bool) {
        let Ok(mut slot) = self.timer.safe_lock() else {
            return;
        };
        let pending = slot.as_ref().map(|task| !task.is_finished()).unwrap_or(false);
        if pending {
            if !replace {
                return;
            }
            if let Some(task) = slot.take() {
                task.abort();
            }
        }

        let inner = Arc::clone(self);
        *slot = Some(self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            inner.spawn_flush();
        }));
    }

    fn cancel_timer(&self) {
        if let Ok(mut slot) = self.timer.safe_lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }

    /// Kick off a flush worker on a blocking-allowed thread.
    fn spawn_flush(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.handle.spawn_blocking(move || inner.flush_observed());
    }

    /// Observed flush: drain the buffer in batch-sized chunks and send each,
    /// resetting the retry counter on success, requeuing with backoff on
    /// failure, or discarding after exhausting retries.
    fn flush_observed(self: &Arc<Self>) {
        // Serialize sends; batches leave in buffer order.
        let Ok(_serial) = self.send_serial.safe_lock() else {
            return;
        };
        self.cancel_timer();

        loop {
            let batch: Vec<LogRecord> = {
                let Ok(mut state) = self.state.safe_lock() else {
                    return;
                };
                if state.buffer.is_empty() {
                    return;
                }
                let take = state.buffer.len().min(self.config.batch_size);
                state.buffer.drain(..take).collect()
            };

            let payload = BatchPayload::new(batch);
            match self.transport.send_batch(&payload) {
                Ok(()) => {
                    if let Ok(mut state) = self.state.safe_lock() {
                        state.retry_count = 0;
                    }
                }
                Err(e) => {
                    self.handle_send_failure(payload.logs, e);
                    return;
                }
            }
        }
    }

    fn handle_send_failure(self: &Arc<Self>, batch: Vec<LogRecord>, error: crate::errors::LogshipError) {
        let Ok(mut state) = self.state.safe_lock() else {
            return;
        };

        if state.retry_count < self.config.max_retries {
            let delay = self.config.retry_base_delay * 2u32.pow(state.retry_count);
            state.retry_count += 1;
            log::debug!(
                "remote batch send failed (attempt {}), retrying in {:?}: {}",
                state.retry_count,
                delay,
                error
            );

            // Failed records go back in front of anything newer.
            let mut requeued = batch;
            requeued.append(&mut state.buffer);
            state.buffer = requeued;
            drop(state);

            self.schedule_flush(delay, true);
        } else {
            let discarded = batch.len();
            state.retry_count = 0;
            let remainder_buffered = !state.buffer.is_empty();
            drop(state);
            console_warn(&format!(
                "remote destination discarded {} record(s) after {} failed retries: {}",
                discarded, self.config.max_retries, error
            ));
            // Newer records that arrived during the retry window still need
            // a flush trigger of their own.
            if remainder_buffered {
                self.schedule_flush(self.config.flush_interval, false);
            }
        }
    }

    /// Teardown flush: swap everything out and hand it to the transport's
    /// fire-and-forget path without observing the outcome.
    fn flush_teardown(&self) {
        self.cancel_timer();
        let batch = {
            let Ok(mut state) = self.state.safe_lock() else {
                return;
            };
            if state.buffer.is_empty() {
                return;
            }
            std::mem::take(&mut state.buffer)
        };

        let payload = BatchPayload::new(batch);
        if !self.transport.send_unobserved(&payload) {
            log::debug!(
                "transport has no fire-and-forget path; {} record(s) sent best-effort",
                payload.logs.len()
            );
            let transport = Arc::clone(&self.transport);
            std::thread::spawn(move || {
                let _ = transport.send_batch(&payload);
            });
        }
    }
}

/// Remote batched sink. Requires a running tokio runtime for its timers and
/// flush workers; the handle is captured at construction.
pub struct RemoteDestination {
    inner: Arc<RemoteInner>,
}

impl RemoteDestination {
    pub fn new(
        min_level: LogLevel,
        config: RemoteConfig,
        transport: Arc<dyn LogTransport>,
        handle: Handle,
    ) -> Self {
        RemoteDestination {
            inner: Arc::new(RemoteInner {
                gate: DestinationGate::new(min_level),
                config,
                transport,
                state: Mutex::new(BufferState {
                    buffer: Vec::new(),
                    retry_count: 0,
                }),
                timer: Mutex::new(None),
                send_serial: Mutex::new(()),
                handle,
            }),
        }
    }

    /// Number of records currently buffered (diagnostics and tests).
    pub fn buffered(&self) -> usize {
        self.inner
            .state
            .safe_lock()
            .map(|state| state.buffer.len())
            .unwrap_or(0)
    }

    /// Run one observed flush to completion. Used at shutdown when the
    /// caller can still await, and by tests.
    pub async fn flush_and_wait(&self) {
        let inner = Arc::clone(&self.inner);
        let worker = self.inner.handle.spawn_blocking(move || inner.flush_observed());
        let _ = worker.await;
    }
}

impl Destination for RemoteDestination {
    fn name(&self) -> &str {
        "remote"
    }

    fn enabled(&self) -> bool {
        self.inner.gate.enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.inner.gate.set_enabled(enabled);
    }

    fn min_level(&self) -> LogLevel {
        self.inner.gate.min_level()
    }

    fn set_min_level(&self, level: LogLevel) {
        self.inner.gate.set_min_level(level);
    }

    /// Buffer the record; error/fatal and a full buffer flush immediately,
    /// anything else makes sure one flush timer is pending.
    fn deliver(&self, record: &LogRecord) -> LogshipResult<()> {
        let urgent = record.level.is_urgent();
        let full = {
            let mut state = self.inner.state.safe_lock()?;
            state.buffer.push(record.clone());
            state.buffer.len() >= self.inner.config.batch_size
        };

        if urgent || full {
            self.inner.spawn_flush();
        } else {
            self.inner
                .schedule_flush(self.inner.config.flush_interval, false);
        }
        Ok(())
    }

    fn flush(&self, synchronous: bool) {
        if synchronous {
            self.inner.flush_teardown();
        } else {
            self.inner.spawn_flush();
        }
    }
}
