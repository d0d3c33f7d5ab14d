//! # World Grid
//!
//! The sink-side output of a build: one [`BlockDescriptor`] per grid cell,
//! keyed by `(grid_x, grid_y)`.
//!
//! A `WorldGrid` is a plain, non-synchronized aggregate. During a build it is
//! owned by the sink thread; anyone else reads it after
//! [`GenerationHandle::wait`](super::builder::GenerationHandle::wait) returns it,
//! or through a [`SharedWorldGrid`](super::sink::SharedWorldGrid) snapshot.

use std::{collections::HashMap, io::Write};

use bitvec::prelude::BitVec;
use cgmath::Point2;
use serde::Serialize;

use super::block::BlockDescriptor;
use crate::error::WorldGridError;

/// Summary of the block heights in a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightStats {
    pub min: i32,
    pub max: i32,
    pub mean: f64,
}

/// Square grid of generated blocks.
#[derive(Debug, Clone)]
pub struct WorldGrid {
    size: usize,
    /// One bit per cell, `x * size + y`, set once the cell is integrated.
    occupancy: BitVec,
    blocks: HashMap<Point2<usize>, BlockDescriptor>,
}

#[derive(Serialize)]
struct WorldExport<'a> {
    grid_size: usize,
    blocks: Vec<&'a BlockDescriptor>,
}

impl WorldGrid {
    /// Creates an empty `size x size` grid.
    pub fn new(size: usize) -> Self {
        let cells = size.saturating_mul(size);
        Self {
            size,
            occupancy: BitVec::repeat(false, cells),
            blocks: HashMap::with_capacity(cells),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Adds a block. Each cell accepts exactly one block per grid.
    ///
    /// # Errors
    /// - [`WorldGridError::OutsideGrid`] if the block's cell is not in the grid
    /// - [`WorldGridError::DuplicateCell`] if the cell already holds a block
    pub fn insert(&mut self, block: BlockDescriptor) -> Result<(), WorldGridError> {
        let (x, y) = (block.grid_x, block.grid_y);
        if x >= self.size || y >= self.size {
            return Err(WorldGridError::OutsideGrid {
                x,
                y,
                size: self.size,
            });
        }

        let bit = x * self.size + y;
        if self.occupancy[bit] {
            return Err(WorldGridError::DuplicateCell { x, y });
        }

        self.occupancy.set(bit, true);
        self.blocks.insert(block.key(), block);
        Ok(())
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&BlockDescriptor> {
        self.blocks.get(&Point2::new(x, y))
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size && self.occupancy[x * self.size + y]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// True when every cell holds a block.
    pub fn is_complete(&self) -> bool {
        self.occupancy.all()
    }

    /// Cells without a block, `x` outer and `y` inner.
    pub fn missing_cells(&self) -> Vec<(usize, usize)> {
        self.occupancy
            .iter_zeros()
            .map(|bit| (bit / self.size, bit % self.size))
            .collect()
    }

    /// Blocks in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockDescriptor> {
        self.blocks.values()
    }

    pub fn height_stats(&self) -> Option<HeightStats> {
        if self.blocks.is_empty() {
            return None;
        }

        let mut min = i32::MAX;
        let mut max = i32::MIN;
        let mut sum = 0.0;
        for block in self.blocks.values() {
            min = min.min(block.height);
            max = max.max(block.height);
            sum += block.height as f64;
        }

        Some(HeightStats {
            min,
            max,
            mean: sum / self.blocks.len() as f64,
        })
    }

    /// Writes `{ "grid_size": n, "blocks": [...] }`, blocks sorted by `(x, y)`.
    pub fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        let mut blocks: Vec<_> = self.blocks.values().collect();
        blocks.sort_unstable_by_key(|block| (block.grid_x, block.grid_y));
        serde_json::to_writer(
            writer,
            &WorldExport {
                grid_size: self.size,
                blocks,
            },
        )
    }
}
