//! # Chunk Volumes
//!
//! Dense voxel storage for one chunk plus its RLE form.

use crate::chunk::ChunkDimensions;
use crate::error::{ProceduralError, ProceduralResult};
use crate::registry::VoxelBlock;
use crate::rle::{self, RleNode};

/// One chunk's voxels, flattened x-fastest. `None` is empty space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkVolume {
    dims: ChunkDimensions,
    voxels: Vec<Option<VoxelBlock>>,
}

impl ChunkVolume {
    /// An all-empty volume.
    #[must_use]
    pub fn empty(dims: ChunkDimensions) -> Self {
        Self {
            voxels: vec![None; dims.volume()],
            dims,
        }
    }

    /// Wraps an existing voxel array.
    ///
    /// # Errors
    ///
    /// Returns [`ProceduralError::DimensionMismatch`] if the length is not the
    /// chunk volume.
    pub fn from_voxels(dims: ChunkDimensions, voxels: Vec<Option<VoxelBlock>>) -> ProceduralResult<Self> {
        if voxels.len() != dims.volume() {
            return Err(ProceduralError::DimensionMismatch {
                expected: dims.volume(),
                actual: voxels.len(),
            });
        }
        Ok(Self { dims, voxels })
    }

    /// Chunk extents.
    #[must_use]
    pub const fn dims(&self) -> &ChunkDimensions {
        &self.dims
    }

    /// Flattened voxels.
    #[must_use]
    pub fn voxels(&self) -> &[Option<VoxelBlock>] {
        &self.voxels
    }

    /// Voxel at local `(x, y, z)`; `None` for empty space or out of range.
    #[must_use]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<VoxelBlock> {
        if !self.dims.contains(x, y, z) {
            return None;
        }
        self.voxels.get(self.dims.index(x, y, z)).copied().flatten()
    }

    /// Number of non-empty voxels.
    #[must_use]
    pub fn solid_count(&self) -> usize {
        self.voxels.iter().filter(|v| v.is_some()).count()
    }

    /// Highest solid `y` in column `(x, z)`.
    #[must_use]
    pub fn column_top(&self, x: usize, z: usize) -> Option<usize> {
        (0..self.dims.size_y as usize).rev().find(|&y| self.get(x, y, z).is_some())
    }

    /// RLE-encodes the voxels, seeded with empty space.
    #[must_use]
    pub fn encode(&self) -> Vec<RleNode<Option<VoxelBlock>>> {
        rle::compress(self.voxels.iter().copied(), None).collect()
    }

    /// Rebuilds a volume from RLE nodes.
    ///
    /// # Errors
    ///
    /// Returns [`ProceduralError::DimensionMismatch`] if the decoded length is
    /// not the chunk volume.
    pub fn decode(dims: ChunkDimensions, nodes: &[RleNode<Option<VoxelBlock>>]) -> ProceduralResult<Self> {
        let expected = dims.volume();
        let actual = rle::decoded_len(nodes);
        if actual != expected {
            return Err(ProceduralError::DimensionMismatch { expected, actual });
        }
        Ok(Self {
            voxels: rle::decompress(nodes.iter().copied()).collect(),
            dims,
        })
    }
}
