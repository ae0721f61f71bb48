//! # Noise Fields
//!
//! A bounded 2D height map, one `f32` per `(x, z)` column, laid out
//! x-fastest (`index = z * size_x + x`).
//!
//! ## Ownership
//!
//! ```text
//!   generator task (exclusive, &mut) ──mark_ready──▶ synthesizer (shared, &)
//!                                                          │
//!                                                       release
//! ```
//!
//! Heights are hidden until the field is ready. Every lookup is checked
//! against the field's [`BoundedRegion`] before indexing.

use terrane_core::BoundedRegion;

use crate::chunk::{ChunkCoord, ChunkDimensions};
use crate::error::{ProceduralError, ProceduralResult};

/// Bounded 2D height field.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseField {
    /// `(x, 0, z)` origin, `(size_x, 1, size_z)` size.
    region: BoundedRegion,
    heights: Vec<f32>,
    ready: bool,
    released: bool,
}

impl NoiseField {
    /// Allocates a zeroed, not-ready field.
    ///
    /// # Errors
    ///
    /// Returns [`ProceduralError::Core`] if an extent is negative.
    pub fn new(origin: [i32; 2], size: [i32; 2]) -> ProceduralResult<Self> {
        let region = BoundedRegion::new([origin[0], 0, origin[1]], [size[0], 1, size[1]])?;
        Ok(Self {
            heights: vec![0.0; region.volume()],
            region,
            ready: false,
            released: false,
        })
    }

    /// Allocates the field covering one chunk's footprint.
    ///
    /// # Errors
    ///
    /// Returns [`ProceduralError::InvalidConfig`] for bad dimensions.
    pub fn for_chunk(coord: ChunkCoord, dims: &ChunkDimensions) -> ProceduralResult<Self> {
        dims.validate()?;
        Self::new(
            coord.field_origin(dims),
            [dims.size_x as i32, dims.size_z as i32],
        )
    }

    /// World-space bounds.
    #[must_use]
    pub const fn region(&self) -> &BoundedRegion {
        &self.region
    }

    /// `(x, z)` of the minimum corner.
    #[must_use]
    pub const fn origin(&self) -> [i32; 2] {
        let origin = self.region.origin();
        [origin[0], origin[2]]
    }

    /// Width along X.
    #[must_use]
    pub const fn size_x(&self) -> usize {
        self.region.size()[0] as usize
    }

    /// Depth along Z.
    #[must_use]
    pub const fn size_z(&self) -> usize {
        self.region.size()[2] as usize
    }

    /// Number of columns.
    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.size_x() * self.size_z()
    }

    /// Returns true once generation has completed and the buffer is live.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready && !self.released
    }

    /// Returns true once [`release`](Self::release) has run.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }

    /// All heights, or `None` before the field is ready.
    #[must_use]
    pub fn heights(&self) -> Option<&[f32]> {
        self.is_ready().then_some(self.heights.as_slice())
    }

    /// Height of world column `(x, z)`.
    #[must_use]
    pub fn height_at(&self, x: i32, z: i32) -> Option<f32> {
        if !self.is_ready() {
            return None;
        }
        let index = self.region.linear_index([x, 0, z]).ok()?;
        self.heights.get(index).copied()
    }

    /// Copies the `size` columns starting at world `position`, row by row.
    ///
    /// Returns `None` (and logs a warning) unless the whole section lies
    /// inside the field and the field is ready.
    #[must_use]
    pub fn get_section(&self, position: [i32; 2], size: [i32; 2]) -> Option<Vec<f32>> {
        match self.try_get_section(position, size) {
            Ok(section) => Some(section),
            Err(err) => {
                tracing::warn!("section request rejected: {}", err);
                None
            }
        }
    }

    /// Fallible form of [`get_section`](Self::get_section).
    ///
    /// # Errors
    ///
    /// Returns [`ProceduralError::NotReady`] before the field is ready and
    /// [`ProceduralError::OutOfBounds`] if any requested column is outside.
    pub fn try_get_section(&self, position: [i32; 2], size: [i32; 2]) -> ProceduralResult<Vec<f32>> {
        if !self.is_ready() {
            return Err(ProceduralError::NotReady);
        }
        if !self
            .region
            .contains_box([position[0], 0, position[1]], [size[0], 1, size[1]])
        {
            return Err(ProceduralError::OutOfBounds { position, size });
        }

        let [local_x, _, local_z] = self.region.to_local([position[0], 0, position[1]])?;
        let (width, depth) = (size[0] as usize, size[1] as usize);
        let row = self.size_x();

        let mut section = Vec::with_capacity(width * depth);
        for z in local_z..local_z + depth {
            let start = z * row + local_x;
            match self.heights.get(start..start + width) {
                Some(slice) => section.extend_from_slice(slice),
                None => return Err(ProceduralError::OutOfBounds { position, size }),
            }
        }
        Ok(section)
    }

    /// Frees the height buffer.
    ///
    /// Returns false if the buffer was already released; a second release is
    /// a no-op.
    pub fn release(&mut self) -> bool {
        if self.released {
            tracing::debug!("noise field at {:?} already released", self.origin());
            return false;
        }
        self.released = true;
        self.heights = Vec::new();
        true
    }

    /// Mutable access for the generating task.
    pub(crate) fn heights_mut(&mut self) -> &mut [f32] {
        &mut self.heights
    }

    /// Publishes the heights. Never reverts.
    pub(crate) fn mark_ready(&mut self) {
        self.ready = true;
    }
}
