//! # World Generation
//!
//! Turns an [`ElevationSampler`](crate::raster::ElevationSampler) into a grid
//! of block columns.
//!
//! * **BlockDescriptor**: one generated column, its height and placement
//! * **WorldGrid**: the output aggregate, keyed by grid cell
//! * **BlockSink**: where generated blocks go; always driven from one thread
//! * **GridWorldBuilder**: runs a build across the worker pool
//! * **Tasks**: the per-cell unit of work
//!
//! ## Thread Safety
//!
//! Workers only read the sampler. The sink, and whatever world structure it
//! wraps, is owned by a single sink thread for the whole build, so no two
//! threads ever integrate blocks at the same time.

pub mod block;
pub mod builder;
pub mod sink;
pub mod tasks;
pub mod world_grid;

pub use block::{BlockDescriptor, BlockSize};
pub use builder::{BuildReport, GenerationHandle, GridWorldBuilder, Progress};
pub use sink::{BlockSink, SharedWorldGrid};
pub use tasks::cell_generation_task::{SkipReason, SkippedCell};
pub use world_grid::{HeightStats, WorldGrid};
