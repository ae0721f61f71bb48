//! # Voxel Synthesis
//!
//! Turns a ready [`NoiseField`] into a chunk's block array. Every voxel is
//! classified independently from its column height, so the map runs as a
//! rayon parallel iterator with no shared mutable state.
//!
//! ## Classification
//!
//! With `t = round(height * size_y)`:
//!
//! ```text
//!   y >  t                      empty
//!   y == t  or  y == size_y-1   surface
//!   t-5 < y < t                 subsurface
//!   y <= t-5                    deep
//! ```

use rayon::prelude::*;

use crate::chunk::ChunkDimensions;
use crate::error::{ProceduralError, ProceduralResult};
use crate::field::NoiseField;
use crate::registry::{BlockRegistry, MaterialNames, MaterialPalette, VoxelBlock};
use crate::volume::ChunkVolume;

/// Depth of the subsurface band below the surface block.
pub const SUBSURFACE_DEPTH: i64 = 5;

/// Surface height of a column with normalized height `noise`.
#[inline]
#[must_use]
pub fn target_height(noise: f32, size_y: u32) -> i64 {
    (f64::from(noise) * f64::from(size_y)).round() as i64
}

/// Block for layer `y` of a column whose surface is at `target`.
#[inline]
#[must_use]
pub fn classify(y: i64, target: i64, size_y: u32, palette: &MaterialPalette) -> Option<VoxelBlock> {
    if y > target {
        None
    } else if y == target || y == i64::from(size_y) - 1 {
        Some(palette.surface)
    } else if y > target - SUBSURFACE_DEPTH {
        Some(palette.subsurface)
    } else {
        Some(palette.deep)
    }
}

/// Data-parallel column classifier for chunks of fixed dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoxelSynthesizer {
    dims: ChunkDimensions,
}

impl VoxelSynthesizer {
    /// Creates a synthesizer.
    ///
    /// # Errors
    ///
    /// Returns [`ProceduralError::InvalidConfig`] for a zero extent.
    pub fn new(dims: ChunkDimensions) -> ProceduralResult<Self> {
        dims.validate()?;
        Ok(Self { dims })
    }

    /// Chunk extents.
    #[must_use]
    pub const fn dims(&self) -> &ChunkDimensions {
        &self.dims
    }

    /// Classifies every voxel of the chunk above `field`.
    ///
    /// # Errors
    ///
    /// Returns [`ProceduralError::NotReady`] if the field is not ready and
    /// [`ProceduralError::DimensionMismatch`] if its column count differs from
    /// the chunk footprint.
    pub fn synthesize(&self, field: &NoiseField, palette: &MaterialPalette) -> ProceduralResult<ChunkVolume> {
        let heights = field.heights().ok_or(ProceduralError::NotReady)?;
        let expected = self.dims.column_count();
        if heights.len() != expected || field.size_x() != self.dims.size_x as usize {
            return Err(ProceduralError::DimensionMismatch {
                expected,
                actual: heights.len(),
            });
        }

        let dims = self.dims;
        let size_y = dims.size_y;
        let voxels: Vec<Option<VoxelBlock>> = (0..dims.volume())
            .into_par_iter()
            .map(|i| {
                let (_, y, _) = dims.coords(i);
                let target = target_height(heights[dims.column_of(i)], size_y);
                classify(y as i64, target, size_y, palette)
            })
            .collect();

        ChunkVolume::from_voxels(dims, voxels)
    }

    /// Resolves the material names once, then synthesizes.
    ///
    /// # Errors
    ///
    /// As [`synthesize`](Self::synthesize), plus
    /// [`ProceduralError::UnknownMaterial`].
    pub fn synthesize_with(
        &self,
        field: &NoiseField,
        registry: &dyn BlockRegistry,
        names: &MaterialNames,
    ) -> ProceduralResult<ChunkVolume> {
        let palette = MaterialPalette::resolve(registry, names)?;
        self.synthesize(field, &palette)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticBlockRegistry;

    const GRASS: VoxelBlock = VoxelBlock::new(1);
    const STONE: VoxelBlock = VoxelBlock::new(2);
    const DIRT: VoxelBlock = VoxelBlock::new(3);

    fn palette() -> MaterialPalette {
        MaterialPalette {
            surface: GRASS,
            subsurface: DIRT,
            deep: STONE,
        }
    }

    fn flat_field(size_x: i32, size_z: i32, height: f32) -> NoiseField {
        let mut field = NoiseField::new([0, 0], [size_x, size_z]).unwrap();
        field.heights_mut().fill(height);
        field.mark_ready();
        field
    }

    #[test]
    fn test_classification_layers() {
        let p = palette();
        assert_eq!(classify(11, 10, 16, &p), None);
        assert_eq!(classify(10, 10, 16, &p), Some(GRASS));
        for y in 6..=9 {
            assert_eq!(classify(y, 10, 16, &p), Some(DIRT), "y={y} should be subsurface");
        }
        for y in 0..=5 {
            assert_eq!(classify(y, 10, 16, &p), Some(STONE), "y={y} should be deep");
        }
    }

    #[test]
    fn test_top_layer_is_surface_when_not_above_target() {
        let p = palette();
        assert_eq!(classify(15, 15, 16, &p), Some(GRASS));
        assert_eq!(classify(15, 16, 16, &p), Some(GRASS), "top layer under a tall column");
        assert_eq!(classify(15, 20, 16, &p), Some(GRASS));
        assert_eq!(classify(15, 10, 16, &p), None, "empty rule comes first");
    }

    #[test]
    fn test_target_height_rounds() {
        assert_eq!(target_height(0.625, 16), 10);
        assert_eq!(target_height(0.65, 16), 10);
        assert_eq!(target_height(0.66, 16), 11);
        assert_eq!(target_height(0.0, 16), 0);
        assert_eq!(target_height(1.0, 16), 16);
    }

    #[test]
    fn test_synthesize_flat_chunk() {
        let dims = ChunkDimensions::new(4, 16, 3).unwrap();
        let field = flat_field(4, 3, 0.625);
        let volume = VoxelSynthesizer::new(dims).unwrap().synthesize(&field, &palette()).unwrap();

        for z in 0..3 {
            for x in 0..4 {
                assert_eq!(volume.get(x, 11, z), None);
                assert_eq!(volume.get(x, 10, z), Some(GRASS));
                assert_eq!(volume.get(x, 7, z), Some(DIRT));
                assert_eq!(volume.get(x, 5, z), Some(STONE));
                assert_eq!(volume.column_top(x, z), Some(10));
            }
        }
        assert_eq!(volume.solid_count(), 4 * 3 * 11);
    }

    #[test]
    fn test_synthesize_uses_column_heights() {
        let dims = ChunkDimensions::new(2, 8, 2).unwrap();
        let mut field = NoiseField::new([0, 0], [2, 2]).unwrap();
        // Column index is z * size_x + x
        field.heights_mut().copy_from_slice(&[0.0, 0.25, 0.5, 1.0]);
        field.mark_ready();

        let volume = VoxelSynthesizer::new(dims).unwrap().synthesize(&field, &palette()).unwrap();
        assert_eq!(volume.column_top(0, 0), Some(0));
        assert_eq!(volume.column_top(1, 0), Some(2));
        assert_eq!(volume.column_top(0, 1), Some(4));
        assert_eq!(volume.column_top(1, 1), Some(7));
        assert_eq!(volume.get(1, 7, 1), Some(GRASS), "top layer of a full column");
    }

    #[test]
    fn test_rejects_unready_field() {
        let dims = ChunkDimensions::new(2, 8, 2).unwrap();
        let field = NoiseField::new([0, 0], [2, 2]).unwrap();
        assert_eq!(
            VoxelSynthesizer::new(dims).unwrap().synthesize(&field, &palette()),
            Err(ProceduralError::NotReady)
        );
    }

    #[test]
    fn test_rejects_mismatched_field() {
        let dims = ChunkDimensions::new(4, 8, 4).unwrap();
        let field = flat_field(2, 2, 0.5);
        assert_eq!(
            VoxelSynthesizer::new(dims).unwrap().synthesize(&field, &palette()),
            Err(ProceduralError::DimensionMismatch {
                expected: 16,
                actual: 4
            })
        );
    }

    #[test]
    fn test_synthesize_with_registry() {
        let dims = ChunkDimensions::new(2, 16, 2).unwrap();
        let field = flat_field(2, 2, 0.5);
        let volume = VoxelSynthesizer::new(dims)
            .unwrap()
            .synthesize_with(&field, &StaticBlockRegistry::default(), &MaterialNames::default())
            .unwrap();
        assert_eq!(volume.get(0, 8, 0), Some(GRASS));
        assert_eq!(volume.get(0, 4, 0), Some(DIRT));
        assert_eq!(volume.get(0, 0, 0), Some(STONE));
    }
}
