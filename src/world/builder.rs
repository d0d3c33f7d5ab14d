//! # Grid World Builder
//!
//! Drives one generation pass over a square grid.
//!
//! ## Data Flow
//!
//! 1. `build` walks the grid, `x` outer and `y` inner, submitting one
//!    [`CellGenerationTask`] per cell to a fixed-size [`WorkerPool`]
//! 2. Workers sample the shared [`ElevationSampler`] and build block descriptors
//!    in parallel
//! 3. Every outcome goes down one channel to the [`SinkThread`], the only thread
//!    that touches the caller's [`BlockSink`]
//! 4. `build` returns a [`GenerationHandle`] once everything is submitted; the
//!    handle reports progress and `wait()` blocks until the world is ready
//!
//! A cell that fails (outside the raster, or a panic while generating it) is
//! skipped and listed in the [`BuildReport`]; the rest of the build is unaffected.

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::channel,
        Arc,
    },
    time::Duration,
};

use log::{error, info, trace, warn};
use web_time::Instant;

use super::{
    sink::{BlockSink, SinkThread},
    tasks::cell_generation_task::{CellGenerationTask, CellOutcome, SkippedCell},
    world_grid::WorldGrid,
};
use crate::{
    config::GenerationConfig,
    core::CancellationToken,
    error::{BuildError, ConfigError, WorldGridError},
    raster::ElevationSampler,
    task_management::{PoolCounters, PoolSettings, PoolStats, WorkerPool},
};

/// Called with `(completed, total)` as units finish. Runs on worker threads.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Point-in-time counts for a running build. Eventually consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Units processed by a worker.
    pub completed: usize,
    /// Blocks accepted by the sink.
    pub integrated: usize,
    pub total: usize,
}

impl Progress {
    /// Processed share in `[0, 1]`; an empty build counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Outcome of a finished build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub grid_size: usize,
    /// `grid_size²`.
    pub total: usize,
    /// Units accepted by the pool.
    pub dispatched: usize,
    /// Blocks the sink accepted.
    pub integrated: usize,
    /// Cells that produced no block.
    pub skipped: Vec<SkippedCell>,
    /// Blocks the sink refused.
    pub rejected: Vec<WorldGridError>,
    /// Dispatched units dropped unprocessed after cancellation.
    pub abandoned: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl BuildReport {
    /// True when every cell of the grid was integrated.
    pub fn is_complete(&self) -> bool {
        self.integrated == self.total
    }

    /// Units never handed to the pool because the build was cancelled first.
    pub fn not_dispatched(&self) -> usize {
        self.total - self.dispatched
    }
}

/// Generates block worlds from elevation samplers.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use topoblock::{config::GenerationConfig, raster::ElevationSampler, world::GridWorldBuilder};
///
/// let sampler = ElevationSampler::initialize(vec![0.0, 10.0, 20.0, 30.0], 2, 2).unwrap();
/// let builder = GridWorldBuilder::new(GenerationConfig::default().with_worker_count(2)).unwrap();
/// let (world, report) = builder.build_world(Arc::new(sampler)).unwrap();
///
/// assert!(report.is_complete());
/// assert_eq!(world.get(1, 0).unwrap().height, 107);
/// ```
pub struct GridWorldBuilder {
    config: GenerationConfig,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl GridWorldBuilder {
    /// # Errors
    /// [`BuildError::InvalidConfig`] if the configuration does not validate.
    pub fn new(config: GenerationConfig) -> Result<Self, BuildError> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
            progress: None,
        })
    }

    pub fn with_progress(mut self, callback: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Token shared by every build from this builder. Cancelling it stops the
    /// current build, including a `build` call blocked on backpressure, and
    /// every later one.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Configured grid size, or `min(width, height)` of the raster.
    pub fn grid_size_for(&self, sampler: &ElevationSampler) -> usize {
        self.config
            .grid_size
            .unwrap_or_else(|| sampler.square_grid_size())
    }

    /// Checks the configuration against `sampler` and returns the grid size.
    ///
    /// The grid may overhang the shorter raster side (those cells are skipped
    /// and reported) but never the longer one, where whole rows would be empty.
    ///
    /// # Errors
    /// [`BuildError::InvalidConfig`] if the configured output range differs from
    /// the sampler's, or the grid size exceeds `max(width, height)`.
    pub fn resolve_grid_size(&self, sampler: &ElevationSampler) -> Result<usize, BuildError> {
        let output = sampler.output_range();
        if self.config.output_range != output {
            return Err(ConfigError::Invalid(format!(
                "output_range {}..={} does not match the sampler's {}..={}",
                self.config.output_range.min, self.config.output_range.max, output.min, output.max
            ))
            .into());
        }

        let grid_size = self.grid_size_for(sampler);
        let limit = sampler.width().max(sampler.height());
        if grid_size > limit {
            return Err(ConfigError::Invalid(format!(
                "grid_size {} exceeds the {}x{} raster",
                grid_size,
                sampler.width(),
                sampler.height()
            ))
            .into());
        }

        Ok(grid_size)
    }

    /// Starts a build that feeds `sink`, returning once every unit is submitted.
    ///
    /// Submission blocks whenever all worker queues are full. The sink is
    /// returned from [`GenerationHandle::wait`].
    ///
    /// # Errors
    /// - [`BuildError::InvalidConfig`] from [`resolve_grid_size`](Self::resolve_grid_size)
    /// - [`BuildError::SinkSpawn`] or [`BuildError::WorkerSpawn`] if a thread
    ///   cannot be created
    ///
    /// All of these are returned before any unit is submitted.
    pub fn build<S: BlockSink>(
        &self,
        sampler: Arc<ElevationSampler>,
        sink: S,
    ) -> Result<GenerationHandle<S>, BuildError> {
        let started = Instant::now();
        let grid_size = self.resolve_grid_size(&sampler)?;
        let total = grid_size.saturating_mul(grid_size);
        let worker_count = self.config.resolved_worker_count();
        let block_size = self.config.block_size;

        info!(
            "Generating {}x{} world ({} cells) from {}x{} raster on {} workers",
            grid_size,
            grid_size,
            total,
            sampler.width(),
            sampler.height(),
            worker_count
        );

        let (outcome_tx, outcome_rx) = channel::<CellOutcome>();
        let integrated = Arc::new(AtomicUsize::new(0));
        let sink_thread = SinkThread::spawn(sink, outcome_rx, integrated.clone())?;

        if total == 0 {
            drop(outcome_tx);
            return Ok(GenerationHandle {
                pool: None,
                counters: None,
                sink_thread,
                integrated,
                cancel: self.cancel.clone(),
                grid_size,
                total,
                dispatched: 0,
                started,
            });
        }

        let mut settings =
            PoolSettings::new(worker_count, self.config.queue_depth, self.cancel.clone());
        if let Some(callback) = &self.progress {
            let callback = callback.clone();
            let interval = self.config.resolved_progress_interval(total);
            settings = settings.with_completion_hook(Arc::new(move |completed| {
                if completed % interval == 0 || completed == total {
                    callback(completed, total);
                }
            }));
        }

        let mut pool = WorkerPool::spawn(settings, outcome_tx)?;

        'submit: for x in 0..grid_size {
            for y in 0..grid_size {
                let task = CellGenerationTask::new(sampler.clone(), x, y, block_size);
                if pool.submit(task).is_err() {
                    if self.cancel.is_cancelled() {
                        warn!("Stopped submitting at cell ({x}, {y}): build cancelled");
                    } else {
                        error!("Stopped submitting at cell ({x}, {y}): every worker has exited");
                    }
                    break 'submit;
                }
            }
            trace!("Submitted column x = {x}");
        }
        pool.close();

        let dispatched = pool.submitted();
        Ok(GenerationHandle {
            counters: Some(pool.counters()),
            pool: Some(pool),
            sink_thread,
            integrated,
            cancel: self.cancel.clone(),
            grid_size,
            total,
            dispatched,
            started,
        })
    }

    /// Builds into a fresh [`WorldGrid`] and waits for it to be complete.
    pub fn build_world(
        &self,
        sampler: Arc<ElevationSampler>,
    ) -> Result<(WorldGrid, BuildReport), BuildError> {
        let grid = WorldGrid::new(self.resolve_grid_size(&sampler)?);
        self.build(sampler, grid)?.wait()
    }
}

impl fmt::Debug for GridWorldBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridWorldBuilder")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// A build whose units have all been submitted.
///
/// Dropping the handle without calling [`wait`](Self::wait) lets the build run
/// to completion in the background and discards the sink.
pub struct GenerationHandle<S: BlockSink> {
    pool: Option<WorkerPool<CellGenerationTask>>,
    counters: Option<Arc<PoolCounters>>,
    sink_thread: SinkThread<S>,
    integrated: Arc<AtomicUsize>,
    cancel: CancellationToken,
    grid_size: usize,
    total: usize,
    dispatched: usize,
    started: Instant,
}

impl<S: BlockSink> GenerationHandle<S> {
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self
                .counters
                .as_ref()
                .map_or(0, |counters| counters.completed()),
            integrated: self.integrated.load(Ordering::Acquire),
            total: self.total,
        }
    }

    /// True once the sink has integrated every outcome; `wait()` will not block.
    pub fn is_finished(&self) -> bool {
        self.sink_thread.is_finished()
    }

    /// Abandons every unit not yet started. Blocks already sent still reach the sink.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits until every worker has finished and the sink has drained, then
    /// returns the sink and the report.
    ///
    /// # Errors
    /// [`BuildError::WorkerPanicked`] or [`BuildError::SinkPanicked`] if a
    /// pipeline thread died.
    pub fn wait(self) -> Result<(S, BuildReport), BuildError> {
        let stats = match self.pool {
            Some(pool) => pool.join()?,
            None => PoolStats::default(),
        };
        let (sink, log) = self.sink_thread.join()?;

        let report = BuildReport {
            grid_size: self.grid_size,
            total: self.total,
            dispatched: self.dispatched,
            integrated: log.integrated,
            skipped: log.skipped,
            rejected: log.rejected,
            abandoned: stats.abandoned,
            cancelled: self.cancel.is_cancelled(),
            elapsed: self.started.elapsed(),
        };

        info!(
            "World ready: {}/{} cells integrated, {} skipped, {} rejected, {} abandoned in {:.2?}",
            report.integrated,
            report.total,
            report.skipped.len(),
            report.rejected.len(),
            report.abandoned + report.not_dispatched(),
            report.elapsed
        );

        Ok((sink, report))
    }
}
