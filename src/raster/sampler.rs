//! # Elevation Sampler
//!
//! Maps grid coordinates to bounded integer block heights.
//!
//! The elevation range is scanned exactly once, when the sampler is created.
//! After that the sampler is immutable: `elevation_at` and `normalize` are pure
//! reads, so a single `Arc<ElevationSampler>` can be queried from every worker
//! thread at once without any synchronization.

use super::{ElevationRange, OutputRange, RasterSamples};
use crate::error::RasterError;

/// Converts raw raster samples into block heights in an [`OutputRange`].
///
/// # Examples
/// ```
/// use topoblock::raster::ElevationSampler;
///
/// let sampler = ElevationSampler::initialize(vec![0.0, 10.0, 20.0, 30.0], 2, 2).unwrap();
/// assert_eq!(sampler.elevation_at(0, 0).unwrap(), 0);
/// assert_eq!(sampler.elevation_at(1, 0).unwrap(), 107);
/// assert_eq!(sampler.elevation_at(0, 1).unwrap(), 213);
/// assert_eq!(sampler.elevation_at(1, 1).unwrap(), 320);
/// ```
#[derive(Debug, Clone)]
pub struct ElevationSampler {
    raster: RasterSamples,
    range: ElevationRange,
    output: OutputRange,
}

impl ElevationSampler {
    /// Builds a sampler with the default `0..=320` output range.
    ///
    /// # Errors
    /// [`RasterError::InvalidRaster`] if the buffer does not match `width * height`
    /// or either dimension is zero.
    pub fn initialize(samples: Vec<f32>, width: usize, height: usize) -> Result<Self, RasterError> {
        Self::with_output_range(samples, width, height, OutputRange::default())
    }

    pub fn with_output_range(
        samples: Vec<f32>,
        width: usize,
        height: usize,
        output: OutputRange,
    ) -> Result<Self, RasterError> {
        let raster = RasterSamples::new(samples, width, height)?;
        Self::from_raster(raster, output)
    }

    /// Builds a sampler over an already validated raster.
    pub fn from_raster(raster: RasterSamples, output: OutputRange) -> Result<Self, RasterError> {
        output.validate()?;
        let range = ElevationRange::scan(raster.as_slice());

        log::debug!(
            "Elevation sampler over {}x{} raster, range {:?} -> {}..={}",
            raster.width(),
            raster.height(),
            range,
            output.min,
            output.max
        );

        Ok(Self {
            raster,
            range,
            output,
        })
    }

    /// Normalized block height at `(x, y)`.
    ///
    /// # Errors
    /// [`RasterError::OutOfBounds`] if the coordinate is outside the raster.
    pub fn elevation_at(&self, x: usize, y: usize) -> Result<i32, RasterError> {
        let value = self.raster.get(x, y)?;
        Ok(self.normalize(value))
    }

    /// Linearly rescales `value` from the cached elevation range into the output range.
    ///
    /// Rounds to nearest with ties away from zero and clamps to the output bounds.
    /// A flat raster maps everything to [`OutputRange::midpoint`]; a non-finite
    /// value maps to the output minimum.
    pub fn normalize(&self, value: f32) -> i32 {
        if !value.is_finite() {
            return self.output.min;
        }
        if self.range.is_degenerate() {
            return self.output.midpoint();
        }

        let out_min = self.output.min as f64;
        let out_max = self.output.max as f64;
        let span = self.range.max as f64 - self.range.min as f64;
        let t = (value as f64 - self.range.min as f64) / span;
        let scaled = out_min + t * (out_max - out_min);

        scaled.round().clamp(out_min, out_max) as i32
    }

    pub fn range(&self) -> ElevationRange {
        self.range
    }

    pub fn output_range(&self) -> OutputRange {
        self.output
    }

    pub fn width(&self) -> usize {
        self.raster.width()
    }

    pub fn height(&self) -> usize {
        self.raster.height()
    }

    /// Side length of the largest square grid the raster covers, `min(width, height)`.
    /// Non-square rasters are truncated to this square.
    pub fn square_grid_size(&self) -> usize {
        self.width().min(self.height())
    }
}
