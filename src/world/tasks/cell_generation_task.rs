//! # Cell Generation Task
//!
//! The unit of work for one grid coordinate: sample the height, build the
//! block descriptor, hand it to the sink. Runs on a pool worker and only reads
//! the shared sampler.

use std::{fmt, sync::Arc};

use crate::{
    error::RasterError,
    raster::ElevationSampler,
    task_management::task::Task,
    world::block::{BlockDescriptor, BlockSize},
};

/// Why a cell produced no block.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Raster(RasterError),
    Panicked(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Raster(err) => write!(f, "{err}"),
            SkipReason::Panicked(message) => write!(f, "generation panicked: {message}"),
        }
    }
}

/// A grid cell that was skipped, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCell {
    pub x: usize,
    pub y: usize,
    pub reason: SkipReason,
}

/// What a worker sends to the sink for one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    Generated(BlockDescriptor),
    Skipped(SkippedCell),
}

/// Generates the block for grid cell `(x, y)`.
pub struct CellGenerationTask {
    sampler: Arc<ElevationSampler>,
    x: usize,
    y: usize,
    block_size: BlockSize,
}

impl CellGenerationTask {
    pub fn new(sampler: Arc<ElevationSampler>, x: usize, y: usize, block_size: BlockSize) -> Self {
        Self {
            sampler,
            x,
            y,
            block_size,
        }
    }

    fn skipped(&self, reason: SkipReason) -> CellOutcome {
        CellOutcome::Skipped(SkippedCell {
            x: self.x,
            y: self.y,
            reason,
        })
    }
}

impl Task for CellGenerationTask {
    type Output = CellOutcome;

    fn process(&self) -> CellOutcome {
        match self.sampler.elevation_at(self.x, self.y) {
            Ok(height) => {
                CellOutcome::Generated(BlockDescriptor::new(self.x, self.y, height, self.block_size))
            }
            Err(err) => self.skipped(SkipReason::Raster(err)),
        }
    }

    fn recover(&self, panic_message: String) -> CellOutcome {
        self.skipped(SkipReason::Panicked(panic_message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler() -> Arc<ElevationSampler> {
        Arc::new(ElevationSampler::initialize(vec![0.0, 10.0, 20.0, 30.0], 2, 2).unwrap())
    }

    #[test]
    fn generates_block_for_valid_cell() {
        let task = CellGenerationTask::new(sampler(), 1, 0, BlockSize::default());
        match task.process() {
            CellOutcome::Generated(block) => {
                assert_eq!((block.grid_x, block.grid_y, block.height), (1, 0, 107));
                assert_eq!(block.position.y, 53.0);
            }
            other => panic!("expected a block, got {other:?}"),
        }
    }

    #[test]
    fn skips_cell_outside_raster() {
        let task = CellGenerationTask::new(sampler(), 0, 2, BlockSize::default());
        assert_eq!(
            task.process(),
            CellOutcome::Skipped(SkippedCell {
                x: 0,
                y: 2,
                reason: SkipReason::Raster(RasterError::OutOfBounds {
                    x: 0,
                    y: 2,
                    width: 2,
                    height: 2
                }),
            })
        );
    }

    #[test]
    fn recovery_reports_the_cell() {
        let task = CellGenerationTask::new(sampler(), 1, 1, BlockSize::default());
        let outcome = task.recover("boom".to_string());
        match outcome {
            CellOutcome::Skipped(cell) => {
                assert_eq!((cell.x, cell.y), (1, 1));
                assert_eq!(cell.reason.to_string(), "generation panicked: boom");
            }
            other => panic!("expected a skip, got {other:?}"),
        }
    }
}
