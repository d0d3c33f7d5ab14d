//! # Raster Module
//!
//! Elevation input for the block pipeline.
//!
//! * **RasterSamples**: immutable, bounds-checked row-major `f32` buffer
//! * **ElevationRange**: min/max of the finite samples, scanned once
//! * **OutputRange**: inclusive integer range block heights are mapped into
//! * **ElevationSampler**: coordinate to block height
//! * **source**: adapters that load samples from files or generate them
//!
//! ## Thread Safety
//!
//! Nothing in this module mutates after construction. Samplers are shared with
//! worker threads behind an `Arc` and read without locking.

mod range;
mod sampler;
mod samples;
pub mod source;

pub use range::{ElevationRange, OutputRange, DEFAULT_OUTPUT_MAX, DEFAULT_OUTPUT_MIN};
pub use sampler::ElevationSampler;
pub use samples::RasterSamples;
