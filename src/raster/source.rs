//! # Raster Sources
//!
//! Thin adapters that produce [`RasterSamples`] from outside the core:
//! decoded images, raw little-endian `f32` dumps, and a synthetic Perlin field
//! for runs without an input file.
//!
//! Image decoding converts to single-channel `f32` luminance. Integer images are
//! scaled into `[0, 1]` by the decoder; since normalization only depends on the
//! relative range, block heights come out the same as with metre values.

use std::{fs, path::Path};

use noise::{NoiseFn, Perlin};

use super::RasterSamples;
use crate::error::{RasterError, SourceError};

/// Default spacing between Perlin samples, in noise units per cell.
pub const PERLIN_SCALE_FACTOR: f64 = 0.02;

/// Number of octaves summed by [`perlin`].
const PERLIN_OCTAVES: u32 = 4;

/// Decodes a PNG or TIFF heightmap.
pub fn from_image(path: impl AsRef<Path>) -> Result<RasterSamples, SourceError> {
    let path = path.as_ref();
    let image = image::open(path)?;
    let luma = image.to_luma32f();
    let (width, height) = luma.dimensions();

    log::info!(
        "Decoded {}x{} heightmap from {}",
        width,
        height,
        path.display()
    );

    Ok(RasterSamples::new(
        luma.into_raw(),
        width as usize,
        height as usize,
    )?)
}

/// Reads a headerless file of little-endian `f32` samples.
pub fn from_raw_file(
    path: impl AsRef<Path>,
    width: usize,
    height: usize,
) -> Result<RasterSamples, SourceError> {
    let bytes = fs::read(path)?;
    Ok(from_raw_f32_le(&bytes, width, height)?)
}

/// Interprets `bytes` as row-major little-endian `f32` samples.
///
/// # Errors
/// [`RasterError::InvalidRaster`] if the byte count is not `4 * width * height`.
pub fn from_raw_f32_le(bytes: &[u8], width: usize, height: usize) -> Result<RasterSamples, RasterError> {
    if bytes.len() % 4 != 0 {
        return Err(RasterError::InvalidRaster {
            len: bytes.len() / 4,
            width,
            height,
        });
    }

    let samples = bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    RasterSamples::new(samples, width, height)
}

/// Synthetic elevation field: fractal Perlin noise in roughly `[-1, 1]`.
pub fn perlin(width: usize, height: usize, seed: u32, scale: f64) -> Result<RasterSamples, RasterError> {
    let noise = Perlin::new(seed);
    let mut samples = Vec::with_capacity(width.saturating_mul(height));

    for y in 0..height {
        for x in 0..width {
            let mut amplitude = 1.0;
            let mut frequency = scale;
            let mut value = 0.0;
            for _ in 0..PERLIN_OCTAVES {
                value += amplitude * noise.get([x as f64 * frequency, y as f64 * frequency]);
                amplitude *= 0.5;
                frequency *= 2.0;
            }
            samples.push(value as f32);
        }
    }

    RasterSamples::new(samples, width, height)
}
