//! # Worker Pool Module
//!
//! A pool of dispatch worker coroutines in front of a shared [`Dispatcher`].
//!
//! ## Features
//!
//! - **Shared Queue**: all workers pull from one unbounded `may` MPSC channel,
//!   so load balances itself
//! - **Reply Channels**: every submission gets its own channel carrying the
//!   dispatch result back to the transport
//! - **Failure Isolation**: a failing listener only fails its own message
//! - **Metrics**: queue depth, submitted, completed and failed counts
//!
//! ## Configuration
//!
//! - `RQUEUE_WORKERS`: number of worker coroutines (default: 4)
//! - `RQUEUE_STACK_SIZE`: stack size per worker (default: `0x10000`)

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::DispatchError;
use crate::ids::MessageId;
use crate::message::InboundMessage;
use crate::runtime_config::RuntimeConfig;
use may::sync::mpsc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Result delivered on a submission's reply channel
pub type DispatchResult = Result<DispatchOutcome, DispatchError>;

/// Configuration for a worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of worker coroutines
    pub num_workers: usize,
    /// Stack size for worker coroutines
    pub stack_size: usize,
}

impl WorkerPoolConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let runtime = RuntimeConfig::from_env();
        Self::new(runtime.workers, runtime.stack_size)
    }

    /// Create a custom configuration; at least one worker is always spawned
    pub fn new(num_workers: usize, stack_size: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
            stack_size,
        }
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        let runtime = RuntimeConfig::default();
        Self::new(runtime.workers, runtime.stack_size)
    }
}

/// Metrics for a worker pool
#[derive(Debug, Default)]
pub struct WorkerPoolMetrics {
    /// Current queue depth (approximate)
    pub queue_depth: AtomicUsize,
    /// Total messages submitted
    pub submitted_count: AtomicU64,
    /// Total messages whose dispatch finished, successfully or not
    pub completed_count: AtomicU64,
    /// Messages whose dispatch returned an error
    pub failed_count: AtomicU64,
}

impl WorkerPoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submit(&self) {
        self.submitted_count.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self, failed: bool) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed_count.fetch_add(1, Ordering::Relaxed);
        }
        self.queue_depth.fetch_sub(1, Ordering::Relaxed);
    }

    /// Undo a submission that never reached the queue
    fn record_rejected(&self) {
        self.submitted_count.fetch_sub(1, Ordering::Relaxed);
        self.queue_depth.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get_queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }

    pub fn get_submitted_count(&self) -> u64 {
        self.submitted_count.load(Ordering::Relaxed)
    }

    pub fn get_completed_count(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }

    pub fn get_failed_count(&self) -> u64 {
        self.failed_count.load(Ordering::Relaxed)
    }
}

/// The pool could not accept a message.
#[derive(Debug, Error)]
pub enum WorkerPoolError {
    #[error("worker pool is shut down; message {message_id} was not queued")]
    Disconnected { message_id: MessageId },
}

struct Job {
    message: InboundMessage,
    reply_tx: mpsc::Sender<DispatchResult>,
}

/// Dispatch workers sharing one [`Dispatcher`].
pub struct WorkerPool {
    config: WorkerPoolConfig,
    sender: mpsc::Sender<Job>,
    metrics: Arc<WorkerPoolMetrics>,
}

impl WorkerPool {
    /// Spawn `config.num_workers` worker coroutines.
    ///
    /// Workers exit once the pool is dropped and the queue is drained.
    ///
    /// # Safety
    ///
    /// Spawns coroutines with `may::coroutine::Builder::spawn()`, which is
    /// unsafe in the `may` runtime. Listeners must not rely on thread-local
    /// state across blocking calls.
    pub unsafe fn new(config: WorkerPoolConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(rx);
        let metrics = Arc::new(WorkerPoolMetrics::new());

        info!(
            num_workers = config.num_workers,
            stack_size = config.stack_size,
            queues = ?dispatcher.registry().destinations(),
            "Creating worker pool"
        );

        for worker_id in 0..config.num_workers {
            let rx = Arc::clone(&rx);
            let dispatcher = Arc::clone(&dispatcher);
            let metrics = Arc::clone(&metrics);

            let builder = may::coroutine::Builder::new()
                .name(format!("rqueue-worker-{worker_id}"))
                .stack_size(config.stack_size);
            let spawn_result = unsafe {
                builder.spawn(move || {
                    debug!(worker_id, "Worker coroutine started");

                    while let Ok(job) = rx.recv() {
                        debug!(
                            worker_id,
                            message_id = %job.message.id,
                            "Worker processing message"
                        );
                        let result = dispatcher.dispatch(&job.message);
                        metrics.record_completion(result.is_err());
                        if job.reply_tx.send(result).is_err() {
                            debug!(
                                worker_id,
                                message_id = %job.message.id,
                                "Reply receiver dropped"
                            );
                        }
                    }

                    debug!(worker_id, "Worker coroutine exiting");
                })
            };

            if let Err(e) = spawn_result {
                error!(worker_id, error = %e, "Failed to spawn worker coroutine");
            }
        }

        Self {
            config,
            sender: tx,
            metrics,
        }
    }

    /// Queue `message` for dispatch.
    ///
    /// The returned receiver yields exactly one [`DispatchResult`].
    pub fn submit(
        &self,
        message: InboundMessage,
    ) -> Result<mpsc::Receiver<DispatchResult>, WorkerPoolError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let message_id = message.id;

        self.metrics.record_submit();
        if let Err(e) = self.sender.send(Job { message, reply_tx }) {
            self.metrics.record_rejected();
            error!(message_id = %message_id, error = %e, "Worker pool channel disconnected");
            return Err(WorkerPoolError::Disconnected { message_id });
        }
        Ok(reply_rx)
    }

    pub fn metrics(&self) -> &Arc<WorkerPoolMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }
}
