use std::sync::Arc;

use crate::error::RasterError;

/// A dense, row-major grid of elevation samples.
///
/// The buffer is immutable once constructed and reference counted, so clones
/// are cheap and can be handed to any number of worker threads without locking.
/// Every read goes through [`RasterSamples::get`], which rejects coordinates
/// outside the raster instead of reading into the neighbouring row.
///
/// # Examples
/// ```
/// use topoblock::raster::RasterSamples;
///
/// let raster = RasterSamples::new(vec![0.0, 10.0, 20.0, 30.0], 2, 2).unwrap();
/// assert_eq!(raster.get(1, 1).unwrap(), 30.0);
/// assert!(raster.get(2, 0).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RasterSamples {
    samples: Arc<[f32]>,
    width: usize,
    height: usize,
}

impl RasterSamples {
    /// Wraps a sample buffer after checking it against the declared dimensions.
    ///
    /// # Errors
    /// [`RasterError::InvalidRaster`] if either dimension is zero or
    /// `samples.len() != width * height`.
    pub fn new(samples: Vec<f32>, width: usize, height: usize) -> Result<Self, RasterError> {
        let expected = width.checked_mul(height);
        if width == 0 || height == 0 || expected != Some(samples.len()) {
            return Err(RasterError::InvalidRaster {
                len: samples.len(),
                width,
                height,
            });
        }

        Ok(Self {
            samples: samples.into(),
            width,
            height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// The whole buffer in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Flat index of `(x, y)`, i.e. `y * width + x`.
    ///
    /// # Errors
    /// [`RasterError::OutOfBounds`] if `x >= width` or `y >= height`.
    pub fn index(&self, x: usize, y: usize) -> Result<usize, RasterError> {
        if x >= self.width || y >= self.height {
            return Err(RasterError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y * self.width + x)
    }

    /// The raw sample at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Result<f32, RasterError> {
        let index = self.index(x, y)?;
        Ok(self.samples[index])
    }
}
