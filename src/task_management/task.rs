//! # Task System Core Trait
//!
//! A `Task` is one self-contained unit of work executed on a pool worker.
//!
//! ## Task Lifecycle
//! 1. A `Task` is submitted via `WorkerPool::submit()`
//! 2. A worker thread calls `process()`
//! 3. The output is sent down the pool's output channel to its single consumer
//! 4. If `process()` panics, the worker calls `recover()` instead and sends that
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred to a worker
//! - `Task::Output` must be `Send` to be transferred to the consumer
//! - Tasks should own (or share immutably) everything they read

/// A unit of work executed on a worker thread.
///
/// Tasks should be independent of each other: the pool gives no ordering
/// guarantees between outputs of different tasks.
pub trait Task: Send + 'static {
    /// What the consumer receives for this task.
    type Output: Send + 'static;

    /// Performs the work. Runs on a worker thread.
    ///
    /// Expected failures should be encoded in `Output` rather than panicking.
    fn process(&self) -> Self::Output;

    /// Output to send when `process()` panicked, so the consumer still hears
    /// about this unit and the worker keeps running.
    fn recover(&self, panic_message: String) -> Self::Output;
}
