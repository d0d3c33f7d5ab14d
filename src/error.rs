//! # Error Types
//!
//! Every fallible operation in the crate returns one of the enums below.
//! Raster and configuration errors are fatal to a build; per-cell errors are
//! collected into the [`BuildReport`](crate::world::builder::BuildReport)
//! instead of aborting the pass.

use std::io;

use thiserror::Error;

/// Errors raised while constructing or querying an elevation raster.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RasterError {
    /// The sample buffer does not match the declared dimensions, or a dimension is zero.
    #[error("invalid raster: {len} samples for a {width}x{height} grid")]
    InvalidRaster {
        len: usize,
        width: usize,
        height: usize,
    },

    /// A coordinate fell outside the raster extent.
    #[error("coordinate ({x}, {y}) is outside the {width}x{height} raster")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    /// The requested output range has `min > max`.
    #[error("invalid output range {min}..={max}")]
    InvalidOutputRange { min: i32, max: i32 },
}

/// Errors raised when inserting into a [`WorldGrid`](crate::world::world_grid::WorldGrid).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldGridError {
    #[error("cell ({x}, {y}) was already integrated")]
    DuplicateCell { x: usize, y: usize },

    #[error("cell ({x}, {y}) lies outside the {size}x{size} grid")]
    OutsideGrid { x: usize, y: usize, size: usize },
}

/// Errors that prevent a build from starting or finishing.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] io::Error),

    #[error("failed to spawn sink thread: {0}")]
    SinkSpawn(#[source] io::Error),

    #[error("worker thread panicked outside a task")]
    WorkerPanicked,

    #[error("sink thread panicked while integrating blocks")]
    SinkPanicked,

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

/// Errors raised while loading or validating a [`GenerationConfig`](crate::config::GenerationConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by the raster source adapters.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read raster file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to decode raster image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Raster(#[from] RasterError),
}
