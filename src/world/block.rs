//! # Block Descriptors
//!
//! One generated grid cell: its discrete height and where the renderer should
//! place it.

use cgmath::{Point2, Vector3};
use serde::{Deserialize, Serialize};

/// World-unit size of one block along each axis.
///
/// `width` spans grid `x`, `depth` spans grid `y`, and `height` is the world
/// size of one unit of block height. The axes are named rather than positional
/// so a caller can stretch terrain vertically without touching the footprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockSize {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl BlockSize {
    pub fn uniform(size: f32) -> Self {
        Self {
            width: size,
            height: size,
            depth: size,
        }
    }

    /// True when every axis is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        [self.width, self.height, self.depth]
            .iter()
            .all(|axis| axis.is_finite() && *axis > 0.0)
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}

/// A generated column for one grid cell.
///
/// Immutable once built; moved from the worker that produced it to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub grid_x: usize,
    pub grid_y: usize,
    /// Normalized height in block units.
    pub height: i32,
    /// Placement in world space, y up. `y` is the integer half height
    /// (`height / 2`, truncated) scaled by the block height.
    pub position: Vector3<f32>,
    /// Full size of the extruded column in world space.
    pub extent: Vector3<f32>,
}

impl BlockDescriptor {
    /// Places a column of `height` blocks at grid cell `(grid_x, grid_y)`.
    ///
    /// The column is placed at `(x * width, (height / 2) * block.height, y * depth)`.
    /// The half height is integer division, so odd heights round toward zero.
    pub fn new(grid_x: usize, grid_y: usize, height: i32, block_size: BlockSize) -> Self {
        let column_height = height as f32 * block_size.height;
        let half_height = (height / 2) as f32 * block_size.height;

        Self {
            grid_x,
            grid_y,
            height,
            position: Vector3::new(
                grid_x as f32 * block_size.width,
                half_height,
                grid_y as f32 * block_size.depth,
            ),
            extent: Vector3::new(block_size.width, column_height, block_size.depth),
        }
    }

    pub fn key(&self) -> Point2<usize> {
        Point2::new(self.grid_x, self.grid_y)
    }
}
