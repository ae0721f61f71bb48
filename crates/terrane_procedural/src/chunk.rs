//! # Chunk Geometry
//!
//! Chunks tile the world on the `(x, z)` plane. Each chunk has fixed
//! [`ChunkDimensions`]; a voxel index is flattened x-fastest, then y, then z:
//!
//! ```text
//!   i = x + size_x * (y + size_y * z)
//!   column(i) = z * size_x + x
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ProceduralError, ProceduralResult};

/// Chunk extents in blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkDimensions {
    /// Width along X.
    pub size_x: u32,
    /// Height along Y.
    pub size_y: u32,
    /// Depth along Z.
    pub size_z: u32,
}

impl Default for ChunkDimensions {
    fn default() -> Self {
        Self {
            size_x: 16,
            size_y: 64,
            size_z: 16,
        }
    }
}

impl ChunkDimensions {
    /// Creates dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`ProceduralError::InvalidConfig`] if any extent is zero or
    /// does not fit an `i32` world coordinate.
    pub fn new(size_x: u32, size_y: u32, size_z: u32) -> ProceduralResult<Self> {
        let dims = Self {
            size_x,
            size_y,
            size_z,
        };
        dims.validate()?;
        Ok(dims)
    }

    /// Checks that every extent is at least 1.
    ///
    /// # Errors
    ///
    /// Returns [`ProceduralError::InvalidConfig`] on a zero or oversized extent.
    pub fn validate(&self) -> ProceduralResult<()> {
        for (axis, size) in [("x", self.size_x), ("y", self.size_y), ("z", self.size_z)] {
            if size == 0 || i32::try_from(size).is_err() {
                return Err(ProceduralError::InvalidConfig(format!(
                    "chunk size_{axis} must be in 1..=i32::MAX, got {size}"
                )));
            }
        }
        Ok(())
    }

    /// Total voxel count.
    #[inline]
    #[must_use]
    pub const fn volume(&self) -> usize {
        self.size_x as usize * self.size_y as usize * self.size_z as usize
    }

    /// Number of `(x, z)` columns.
    #[inline]
    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.size_x as usize * self.size_z as usize
    }

    /// Splits a flattened voxel index into `(x, y, z)`.
    #[inline]
    #[must_use]
    pub const fn coords(&self, index: usize) -> (usize, usize, usize) {
        let sx = self.size_x as usize;
        let sy = self.size_y as usize;
        (index % sx, (index / sx) % sy, index / (sx * sy))
    }

    /// Flattens `(x, y, z)`. Callers must pass in-range coordinates.
    #[inline]
    #[must_use]
    pub const fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.size_x as usize * (y + self.size_y as usize * z)
    }

    /// Column index of a flattened voxel index.
    #[inline]
    #[must_use]
    pub const fn column_of(&self, index: usize) -> usize {
        let (x, _, z) = self.coords(index);
        z * self.size_x as usize + x
    }

    /// Returns true if `(x, y, z)` lies inside the chunk.
    #[inline]
    #[must_use]
    pub const fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.size_x as usize && y < self.size_y as usize && z < self.size_z as usize
    }
}

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not blocks).
    pub x: i32,
    /// Z coordinate (in chunks, not blocks).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk containing world block `(block_x, block_z)`.
    #[inline]
    #[must_use]
    pub const fn from_block_pos(block_x: i32, block_z: i32, dims: &ChunkDimensions) -> Self {
        Self {
            x: block_x.div_euclid(dims.size_x as i32),
            z: block_z.div_euclid(dims.size_z as i32),
        }
    }

    /// World X of the chunk's minimum corner.
    #[inline]
    #[must_use]
    pub const fn world_x(self, dims: &ChunkDimensions) -> i32 {
        self.x.wrapping_mul(dims.size_x as i32)
    }

    /// World Z of the chunk's minimum corner.
    #[inline]
    #[must_use]
    pub const fn world_z(self, dims: &ChunkDimensions) -> i32 {
        self.z.wrapping_mul(dims.size_z as i32)
    }

    /// Origin of the chunk's height field, `(world_x, world_z)`.
    #[inline]
    #[must_use]
    pub const fn field_origin(self, dims: &ChunkDimensions) -> [i32; 2] {
        [self.world_x(dims), self.world_z(dims)]
    }

    /// Every chunk within Chebyshev distance `radius` of `self`, row by row.
    #[must_use]
    pub fn square(self, radius: u32) -> Vec<Self> {
        let r = radius.min(i32::MAX as u32) as i32;
        (-r..=r)
            .flat_map(|dz| (-r..=r).map(move |dx| Self::new(self.x + dx, self.z + dz)))
            .collect()
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}
