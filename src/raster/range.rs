use serde::{Deserialize, Serialize};

use crate::error::RasterError;

/// Default lower bound of the block height range.
pub const DEFAULT_OUTPUT_MIN: i32 = 0;
/// Default upper bound of the block height range, the voxel build ceiling.
pub const DEFAULT_OUTPUT_MAX: i32 = 320;

/// The extremes of a raster's finite samples.
///
/// Computed once by [`ElevationRange::scan`]. Non-finite samples (NaN no-data
/// markers, infinities) are ignored; a raster with no finite samples yields the
/// degenerate range `0.0..=0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationRange {
    pub min: f32,
    pub max: f32,
}

impl ElevationRange {
    /// Single pass over the buffer.
    pub fn scan(samples: &[f32]) -> Self {
        let extremes = samples
            .iter()
            .copied()
            .filter(|value| value.is_finite())
            .fold(None, |acc: Option<(f32, f32)>, value| match acc {
                None => Some((value, value)),
                Some((min, max)) => Some((min.min(value), max.max(value))),
            });

        match extremes {
            Some((min, max)) => Self { min, max },
            None => Self { min: 0.0, max: 0.0 },
        }
    }

    /// True when every finite sample is equal, so the linear rescale has no domain.
    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

/// Inclusive integer range that normalized heights are mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRange {
    pub min: i32,
    pub max: i32,
}

impl OutputRange {
    /// # Errors
    /// [`RasterError::InvalidOutputRange`] if `min > max`.
    pub fn new(min: i32, max: i32) -> Result<Self, RasterError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), RasterError> {
        if self.min > self.max {
            return Err(RasterError::InvalidOutputRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// `round((min + max) / 2)`, used for flat rasters.
    pub fn midpoint(&self) -> i32 {
        ((self.min as f64 + self.max as f64) / 2.0).round() as i32
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl Default for OutputRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_OUTPUT_MIN,
            max: DEFAULT_OUTPUT_MAX,
        }
    }
}
