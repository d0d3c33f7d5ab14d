//! # Block Sink
//!
//! The single consumer of a build. Workers send [`CellOutcome`]s down one
//! channel; exactly one thread drains it and is the only code that ever touches
//! the [`BlockSink`]. Sinks therefore need no internal locking, and a
//! non-thread-safe aggregate like [`WorldGrid`] can be mutated directly.
//!
//! The channel is unbounded, so a worker's hand-off never waits for an
//! integration to finish.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::Receiver,
        Arc,
    },
    thread::{self, JoinHandle},
};

use log::{debug, warn};

use super::{
    block::BlockDescriptor,
    tasks::cell_generation_task::{CellOutcome, SkippedCell},
    world_grid::WorldGrid,
};
use crate::{
    core::MtResource,
    error::{BuildError, WorldGridError},
};

/// Receives every generated block of a build, one at a time, on the sink thread.
///
/// Implemented for [`WorldGrid`], [`SharedWorldGrid`], and any
/// `FnMut(BlockDescriptor)` closure.
pub trait BlockSink: Send + 'static {
    /// Integrates one block. An error is recorded in the build report and the
    /// build carries on.
    fn integrate(&mut self, block: BlockDescriptor) -> Result<(), WorldGridError>;
}

impl<F> BlockSink for F
where
    F: FnMut(BlockDescriptor) + Send + 'static,
{
    fn integrate(&mut self, block: BlockDescriptor) -> Result<(), WorldGridError> {
        self(block);
        Ok(())
    }
}

impl BlockSink for WorldGrid {
    fn integrate(&mut self, block: BlockDescriptor) -> Result<(), WorldGridError> {
        self.insert(block)
    }
}

/// A [`WorldGrid`] that other threads may read while it is being filled.
///
/// Only the sink thread takes the write lock. Readers call
/// [`SharedWorldGrid::snapshot`] to get a consistent copy at any point.
#[derive(Debug, Clone)]
pub struct SharedWorldGrid {
    grid: MtResource<WorldGrid>,
}

impl SharedWorldGrid {
    pub fn new(size: usize) -> Self {
        Self {
            grid: MtResource::new(WorldGrid::new(size)),
        }
    }

    pub fn snapshot(&self) -> WorldGrid {
        self.grid.snapshot()
    }

    pub fn len(&self) -> usize {
        self.grid.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.get().is_empty()
    }
}

impl BlockSink for SharedWorldGrid {
    fn integrate(&mut self, block: BlockDescriptor) -> Result<(), WorldGridError> {
        self.grid.get_mut().insert(block)
    }
}

/// What the sink thread saw over a whole build.
#[derive(Debug, Default)]
pub struct SinkLog {
    pub integrated: usize,
    pub skipped: Vec<SkippedCell>,
    pub rejected: Vec<WorldGridError>,
}

/// The thread that owns the sink for the duration of a build.
pub struct SinkThread<S: BlockSink> {
    handle: JoinHandle<(S, SinkLog)>,
}

impl<S: BlockSink> SinkThread<S> {
    /// Moves `sink` onto a new thread that drains `outcomes` until every sender
    /// is gone. `integrated` is bumped after each accepted block.
    pub fn spawn(
        mut sink: S,
        outcomes: Receiver<CellOutcome>,
        integrated: Arc<AtomicUsize>,
    ) -> Result<Self, BuildError> {
        let drain = move || {
            let mut log = SinkLog::default();

            for outcome in outcomes {
                match outcome {
                    CellOutcome::Generated(block) => match sink.integrate(block) {
                        Ok(()) => {
                            log.integrated += 1;
                            integrated.fetch_add(1, Ordering::AcqRel);
                        }
                        Err(err) => {
                            warn!("Block rejected by sink: {err}");
                            log.rejected.push(err);
                        }
                    },
                    CellOutcome::Skipped(cell) => {
                        warn!("Skipped cell ({}, {}): {}", cell.x, cell.y, cell.reason);
                        log.skipped.push(cell);
                    }
                }
            }

            debug!(
                "Sink drained: {} integrated, {} skipped, {} rejected",
                log.integrated,
                log.skipped.len(),
                log.rejected.len()
            );
            (sink, log)
        };

        let handle = thread::Builder::new()
            .name("topoblock-sink".to_string())
            .spawn(drain)
            .map_err(BuildError::SinkSpawn)?;

        Ok(Self { handle })
    }

    /// True once the channel has closed and the sink has processed everything.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the drain to finish and hands the sink back.
    pub fn join(self) -> Result<(S, SinkLog), BuildError> {
        self.handle.join().map_err(|_| BuildError::SinkPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::RasterError,
        world::{block::BlockSize, tasks::cell_generation_task::SkipReason},
    };
    use std::sync::mpsc::channel;

    fn generated(x: usize, y: usize) -> CellOutcome {
        CellOutcome::Generated(BlockDescriptor::new(x, y, 1, BlockSize::default()))
    }

    #[test]
    fn drains_into_world_grid() {
        let (tx, rx) = channel();
        let integrated = Arc::new(AtomicUsize::new(0));
        let sink = SinkThread::spawn(WorldGrid::new(2), rx, integrated.clone()).unwrap();

        tx.send(generated(0, 0)).unwrap();
        tx.send(generated(1, 1)).unwrap();
        tx.send(generated(1, 1)).unwrap();
        tx.send(CellOutcome::Skipped(SkippedCell {
            x: 0,
            y: 1,
            reason: SkipReason::Raster(RasterError::OutOfBounds {
                x: 0,
                y: 1,
                width: 1,
                height: 1,
            }),
        }))
        .unwrap();
        drop(tx);

        let (grid, log) = sink.join().unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(log.integrated, 2);
        assert_eq!(integrated.load(Ordering::Acquire), 2);
        assert_eq!(log.rejected, vec![WorldGridError::DuplicateCell { x: 1, y: 1 }]);
        assert_eq!(log.skipped.len(), 1);
    }

    #[test]
    fn closure_sink_runs_on_the_sink_thread() {
        let (tx, rx) = channel();
        let names = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink_names = names.clone();
        let sink = SinkThread::spawn(
            move |_block: BlockDescriptor| {
                sink_names
                    .lock()
                    .unwrap()
                    .push(thread::current().name().map(str::to_string));
            },
            rx,
            Arc::new(AtomicUsize::new(0)),
        )
        .unwrap();
        tx.send(generated(0, 0)).unwrap();
        tx.send(generated(0, 1)).unwrap();
        drop(tx);

        let (_closure, log) = sink.join().unwrap();
        assert_eq!(log.integrated, 2);
        let names = names.lock().unwrap();
        assert_eq!(names.len(), 2);
        assert!(names
            .iter()
            .all(|name| name.as_deref() == Some("topoblock-sink")));
    }

    #[test]
    fn shared_grid_snapshot_is_readable_during_build() {
        let shared = SharedWorldGrid::new(4);
        let (tx, rx) = channel();
        let sink = SinkThread::spawn(shared.clone(), rx, Arc::new(AtomicUsize::new(0))).unwrap();

        tx.send(generated(2, 3)).unwrap();
        drop(tx);
        sink.join().unwrap();

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.get(2, 3).unwrap().height, 1);
        assert_eq!(shared.len(), 1);
    }
}
