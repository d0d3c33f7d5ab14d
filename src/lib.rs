#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Topoblock
//!
//! Converts elevation rasters into grids of voxel block columns.
//!
//! A raster of `f32` height samples is normalized into a bounded integer
//! range (by default `0..=320`, a voxel build ceiling). Each grid cell is then
//! generated on a worker pool, and the resulting blocks are handed to a single
//! sink thread that owns the output world.
//!
//! ## Key Modules
//!
//! * `raster` - Sample buffers, elevation range scanning, normalization, and file sources
//! * `world` - Block descriptors, the world grid, sinks, and the grid world builder
//! * `task_management` - The worker pool that runs per-cell tasks
//! * `core` - Shared concurrency primitives
//! * `config` - JSON-loadable build configuration
//!
//! ## Architecture
//!
//! ```text
//! GridWorldBuilder ──submit──▶ WorkerPool (N threads) ──CellOutcome──▶ SinkThread ──▶ BlockSink
//!                                  │
//!                                  └── reads Arc<ElevationSampler> (immutable)
//! ```
//!
//! Height computation runs in parallel; integration into the world is strictly
//! single-threaded.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use topoblock::{config::GenerationConfig, raster::ElevationSampler, world::GridWorldBuilder};
//!
//! let sampler = ElevationSampler::initialize(vec![0.0, 10.0, 20.0, 30.0], 2, 2).unwrap();
//! let builder = GridWorldBuilder::new(GenerationConfig::default()).unwrap();
//! let (world, report) = builder.build_world(Arc::new(sampler)).unwrap();
//!
//! assert!(report.is_complete());
//! assert_eq!(world.len(), 4);
//! ```

use std::process::ExitCode;

use log::{error, info};

pub mod app;
pub mod config;
pub mod core;
pub mod error;
pub mod raster;
pub mod task_management;
pub mod world;

pub use config::GenerationConfig;
pub use error::{BuildError, ConfigError, RasterError, SourceError, WorldGridError};
pub use raster::{ElevationSampler, OutputRange, RasterSamples};
pub use world::{BlockDescriptor, BlockSink, BuildReport, GridWorldBuilder, WorldGrid};

/// Binary entry point: sets up logging and runs the command line application.
pub fn run() -> ExitCode {
    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    match app::run(app::Args::parse(std::env::args().skip(1))) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
