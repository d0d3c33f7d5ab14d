//! # Task Management System
//!
//! A fixed-size pool of worker threads that executes [`Task`]s and funnels every
//! output into one channel, drained by exactly one consumer.
//!
//! ## Architecture Overview
//! - `WorkerPool`: spawns workers, distributes tasks round-robin, joins on shutdown
//! - `Task`: a unit of work and its output type
//!
//! Each worker owns a bounded queue fed by the submitting thread.
//!
//! ## Task Lifecycle
//! 1. Tasks are submitted via `WorkerPool::submit()`
//! 2. The pool hands the task to the next worker whose queue has room, round-robin
//! 3. If every queue is full, `submit()` blocks on the next worker (backpressure)
//! 4. Workers process tasks and send outputs to the shared output channel
//! 5. `WorkerPool::close()` stops intake; `WorkerPool::join()` also waits for
//!    every worker to drain its queue
//!
//! Workers never wait on the consumer beyond the channel send, so integration
//! speed does not throttle height computation.
//!
//! ## Cancellation
//! Workers check the pool's [`CancellationToken`] before each task. Once it
//! is set, queued tasks are dropped without running and counted as abandoned;
//! nothing is sent for them.
//!
//! ## Example Usage
//! ```rust
//! use std::sync::mpsc::channel;
//! use topoblock::core::CancellationToken;
//! use topoblock::task_management::{task::Task, PoolSettings, WorkerPool};
//!
//! struct Square(u64);
//!
//! impl Task for Square {
//!     type Output = u64;
//!     fn process(&self) -> u64 { self.0 * self.0 }
//!     fn recover(&self, _panic_message: String) -> u64 { 0 }
//! }
//!
//! let (output_tx, output_rx) = channel();
//! let settings = PoolSettings::new(2, 8, CancellationToken::new());
//! let mut pool = WorkerPool::spawn(settings, output_tx).unwrap();
//! for i in 0..10 {
//!     pool.submit(Square(i)).ok().unwrap();
//! }
//! let stats = pool.join().unwrap();
//! assert_eq!(stats.completed, 10);
//! assert_eq!(output_rx.iter().sum::<u64>(), 285);
//! ```

pub mod task;

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{sync_channel, Sender, SyncSender, TrySendError},
        Arc,
    },
    thread::{self, JoinHandle},
};

use log::{debug, info};
use task::Task;

use crate::{core::CancellationToken, error::BuildError};

/// Called by a worker after each finished task with the running completed count.
pub type CompletionHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Default number of tasks buffered per worker before `submit()` blocks.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Number of workers to use when none is configured: the hardware parallelism.
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}

/// How a [`WorkerPool`] is sized and observed.
#[derive(Clone)]
pub struct PoolSettings {
    pub worker_count: usize,
    pub queue_depth: usize,
    pub cancel: CancellationToken,
    pub on_complete: Option<CompletionHook>,
}

impl PoolSettings {
    pub fn new(worker_count: usize, queue_depth: usize, cancel: CancellationToken) -> Self {
        Self {
            worker_count,
            queue_depth,
            cancel,
            on_complete: None,
        }
    }

    pub fn with_completion_hook(mut self, hook: CompletionHook) -> Self {
        self.on_complete = Some(hook);
        self
    }
}

impl fmt::Debug for PoolSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolSettings")
            .field("worker_count", &self.worker_count)
            .field("queue_depth", &self.queue_depth)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Counters shared between the pool handle and its workers.
#[derive(Debug, Default)]
pub struct PoolCounters {
    completed: AtomicUsize,
    abandoned: AtomicUsize,
    recovered: AtomicUsize,
}

impl PoolCounters {
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::Acquire)
    }

    pub fn recovered(&self) -> usize {
        self.recovered.load(Ordering::Acquire)
    }
}

/// Totals reported when the pool shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks accepted by `submit()`.
    pub submitted: usize,
    /// Tasks whose output (normal or recovered) was produced.
    pub completed: usize,
    /// Tasks dropped unprocessed after cancellation.
    pub abandoned: usize,
    /// Tasks that panicked and were answered by `Task::recover`.
    pub recovered: usize,
}

/// Fixed-size pool of worker threads with a single output channel.
///
/// # Implementation Notes
/// - Each worker owns a bounded `sync_channel`; a full queue is backpressure
/// - Workers share one clone each of the output `Sender`; the channel closes
///   once every worker has exited, which is how the consumer learns the pool is done
/// - A panicking task is caught and answered with `Task::recover`, so one bad
///   unit cannot take its worker down
pub struct WorkerPool<T: Task> {
    /// Bounded queue into each worker, indexed like `workers`. Emptied by `close()`.
    task_senders: Vec<SyncSender<T>>,
    workers: Vec<JoinHandle<()>>,
    current_channel: usize,
    submitted: usize,
    counters: Arc<PoolCounters>,
    cancel: CancellationToken,
}

impl<T: Task> WorkerPool<T> {
    /// Spawns `settings.worker_count` workers sending outputs to `output`.
    ///
    /// # Errors
    /// [`BuildError::WorkerSpawn`] if a thread cannot be created. Workers
    /// already spawned exit on their own once their queues are dropped.
    pub fn spawn(settings: PoolSettings, output: Sender<T::Output>) -> Result<Self, BuildError> {
        let PoolSettings {
            worker_count,
            queue_depth,
            cancel,
            on_complete,
        } = settings;

        info!(
            "Starting worker pool: {} workers, queue depth {} (available parallelism: {:?})",
            worker_count,
            queue_depth,
            thread::available_parallelism()
        );

        let counters = Arc::new(PoolCounters::default());
        let mut task_senders = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);

        for index in 0..worker_count {
            let (task_tx, task_rx) = sync_channel::<T>(queue_depth);
            let output = output.clone();
            let counters = counters.clone();
            let cancel = cancel.clone();
            let on_complete = on_complete.clone();

            let worker_loop = move || {
                while let Ok(task) = task_rx.recv() {
                    if cancel.is_cancelled() {
                        counters.abandoned.fetch_add(1, Ordering::AcqRel);
                        continue;
                    }

                    let result = match panic::catch_unwind(AssertUnwindSafe(|| task.process())) {
                        Ok(result) => result,
                        Err(payload) => {
                            counters.recovered.fetch_add(1, Ordering::AcqRel);
                            task.recover(panic_message(payload.as_ref()))
                        }
                    };

                    let completed = counters.completed.fetch_add(1, Ordering::AcqRel) + 1;
                    if output.send(result).is_err() {
                        debug!("Worker {index}: output channel closed, exiting");
                        break;
                    }
                    if let Some(hook) = &on_complete {
                        hook(completed);
                    }
                }
            };

            let worker = thread::Builder::new()
                .name(format!("topoblock-worker-{index}"))
                .spawn(worker_loop)
                .map_err(BuildError::WorkerSpawn)?;

            task_senders.push(task_tx);
            workers.push(worker);
        }

        Ok(Self {
            task_senders,
            workers,
            current_channel: 0,
            submitted: 0,
            counters,
            cancel,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn counters(&self) -> Arc<PoolCounters> {
        self.counters.clone()
    }

    /// Hands `task` to a worker.
    ///
    /// Tries each worker round-robin without blocking, starting after the last
    /// one used. If every queue is full, blocks until the next worker in turn
    /// has room.
    ///
    /// # Returns
    /// - `Ok(())` once a worker has accepted the task
    /// - `Err(task)` if the pool is cancelled, closed, or every worker has exited
    pub fn submit(&mut self, task: T) -> Result<(), T> {
        if self.cancel.is_cancelled() || self.task_senders.is_empty() {
            return Err(task);
        }

        let channel_count = self.task_senders.len();
        let mut task = task;

        for offset in 0..channel_count {
            let channel_idx = (self.current_channel + offset) % channel_count;
            match self.task_senders[channel_idx].try_send(task) {
                Ok(()) => {
                    self.accepted(channel_idx);
                    return Ok(());
                }
                Err(TrySendError::Full(rejected)) | Err(TrySendError::Disconnected(rejected)) => {
                    task = rejected;
                }
            }
        }

        // Every queue is full: wait for the next worker in turn.
        let channel_idx = self.current_channel;
        match self.task_senders[channel_idx].send(task) {
            Ok(()) => {
                self.accepted(channel_idx);
                Ok(())
            }
            Err(rejected) => Err(rejected.0),
        }
    }

    fn accepted(&mut self, channel_idx: usize) {
        self.submitted += 1;
        self.current_channel = (channel_idx + 1) % self.task_senders.len();
    }

    /// Stops accepting tasks; queued tasks are abandoned by the workers.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stops accepting tasks without waiting. Workers finish whatever is
    /// already queued and then exit, which closes the output channel.
    pub fn close(&mut self) {
        self.task_senders.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.task_senders.is_empty()
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Closes every queue and waits for the workers to drain them and exit.
    ///
    /// # Errors
    /// [`BuildError::WorkerPanicked`] if a worker thread died outside a task.
    pub fn join(mut self) -> Result<PoolStats, BuildError> {
        self.close();

        let mut panicked = false;
        for worker in self.workers.drain(..) {
            panicked |= worker.join().is_err();
        }
        if panicked {
            return Err(BuildError::WorkerPanicked);
        }

        let stats = PoolStats {
            submitted: self.submitted,
            completed: self.counters.completed(),
            abandoned: self.counters.abandoned(),
            recovered: self.counters.recovered(),
        };
        info!("Worker pool stopped: {:?}", stats);
        Ok(stats)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}
