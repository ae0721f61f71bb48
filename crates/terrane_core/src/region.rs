//! # Bounded Regions
//!
//! Integer axis-aligned boxes in world space. Every lookup into a
//! region-backed array goes through [`BoundedRegion::to_local`] or
//! [`BoundedRegion::linear_index`], which fail instead of wrapping.

use crate::error::{CoreError, CoreResult};

/// An integer box: `origin` inclusive, `origin + size` exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BoundedRegion {
    origin: [i32; 3],
    size: [i32; 3],
}

impl BoundedRegion {
    /// Creates a region.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRegion`] if any extent is negative.
    pub const fn new(origin: [i32; 3], size: [i32; 3]) -> CoreResult<Self> {
        if size[0] < 0 || size[1] < 0 || size[2] < 0 {
            return Err(CoreError::InvalidRegion { size });
        }
        Ok(Self { origin, size })
    }

    /// Region origin (inclusive minimum corner).
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> [i32; 3] {
        self.origin
    }

    /// Region extents.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> [i32; 3] {
        self.size
    }

    /// Number of integer cells inside the region.
    #[must_use]
    pub const fn volume(&self) -> usize {
        self.size[0] as usize * self.size[1] as usize * self.size[2] as usize
    }

    /// Returns true if the region has no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size[0] == 0 || self.size[1] == 0 || self.size[2] == 0
    }

    /// Returns true if `position` lies inside the region.
    #[must_use]
    pub fn contains(&self, position: [i32; 3]) -> bool {
        (0..3).all(|axis| {
            // i64 so that origin + size cannot overflow
            let p = i64::from(position[axis]);
            let lo = i64::from(self.origin[axis]);
            p >= lo && p < lo + i64::from(self.size[axis])
        })
    }

    /// Returns true if the box `(position, size)` lies entirely inside the region.
    ///
    /// An empty box is contained only if its corner is inside.
    #[must_use]
    pub fn contains_box(&self, position: [i32; 3], size: [i32; 3]) -> bool {
        if size.iter().any(|&s| s < 0) || !self.contains(position) {
            return false;
        }
        (0..3).all(|axis| {
            let end = i64::from(position[axis]) + i64::from(size[axis]);
            end <= i64::from(self.origin[axis]) + i64::from(self.size[axis])
        })
    }

    /// Translates a world position into region-local coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfBounds`] if the position is outside the region.
    pub fn to_local(&self, position: [i32; 3]) -> CoreResult<[usize; 3]> {
        if !self.contains(position) {
            return Err(self.out_of_bounds(position));
        }
        Ok([
            (position[0] - self.origin[0]) as usize,
            (position[1] - self.origin[1]) as usize,
            (position[2] - self.origin[2]) as usize,
        ])
    }

    /// Flattened x-fastest index of a world position (`x + sx * (y + sy * z)`).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfBounds`] if the position is outside the region.
    pub fn linear_index(&self, position: [i32; 3]) -> CoreResult<usize> {
        let [x, y, z] = self.to_local(position)?;
        let sx = self.size[0] as usize;
        let sy = self.size[1] as usize;
        Ok(x + sx * (y + sy * z))
    }

    /// Builds the out-of-bounds error for `position`.
    #[must_use]
    pub const fn out_of_bounds(&self, position: [i32; 3]) -> CoreError {
        CoreError::OutOfBounds {
            position,
            origin: self.origin,
            size: self.size,
        }
    }
}
