//! # Block Registry
//!
//! Name to id lookup for block materials. The game owns the real registry;
//! generation only needs [`BlockRegistry::block_id`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ProceduralError, ProceduralResult};

/// A placed block: just its material id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelBlock {
    /// Material id.
    pub id: u16,
}

impl VoxelBlock {
    /// Creates a block.
    #[inline]
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self { id }
    }
}

/// Name to id lookup.
pub trait BlockRegistry: Send + Sync {
    /// Id registered for `name`, if any.
    fn block_id(&self, name: &str) -> Option<u16>;
}

/// In-memory registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticBlockRegistry {
    ids: HashMap<String, u16>,
}

impl Default for StaticBlockRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("Air", 0);
        registry.register("Grass", 1);
        registry.register("Stone", 2);
        registry.register("Dirt", 3);
        registry
    }
}

impl StaticBlockRegistry {
    /// Registry with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ids: HashMap::new(),
        }
    }

    /// Adds or replaces an entry. Returns the previous id.
    pub fn register(&mut self, name: impl Into<String>, id: u16) -> Option<u16> {
        self.ids.insert(name.into(), id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl BlockRegistry for StaticBlockRegistry {
    fn block_id(&self, name: &str) -> Option<u16> {
        self.ids.get(name).copied()
    }
}

/// Material names for the three terrain layers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialNames {
    /// Top block of a column.
    pub surface: String,
    /// The few blocks under the surface.
    pub subsurface: String,
    /// Everything deeper.
    pub deep: String,
}

impl Default for MaterialNames {
    fn default() -> Self {
        Self {
            surface: "Grass".to_string(),
            subsurface: "Dirt".to_string(),
            deep: "Stone".to_string(),
        }
    }
}

/// Resolved layer blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialPalette {
    /// Top block of a column.
    pub surface: VoxelBlock,
    /// The few blocks under the surface.
    pub subsurface: VoxelBlock,
    /// Everything deeper.
    pub deep: VoxelBlock,
}

impl MaterialPalette {
    /// Looks all three names up once.
    ///
    /// # Errors
    ///
    /// Returns [`ProceduralError::UnknownMaterial`] for the first name the
    /// registry does not know.
    pub fn resolve(registry: &dyn BlockRegistry, names: &MaterialNames) -> ProceduralResult<Self> {
        let lookup = |name: &str| {
            registry.block_id(name).map(VoxelBlock::new).ok_or_else(|| {
                tracing::warn!("block registry has no material named {:?}", name);
                ProceduralError::UnknownMaterial(name.to_string())
            })
        };
        Ok(Self {
            surface: lookup(&names.surface)?,
            subsurface: lookup(&names.subsurface)?,
            deep: lookup(&names.deep)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ids() {
        let registry = StaticBlockRegistry::default();
        assert_eq!(registry.block_id("Air"), Some(0));
        assert_eq!(registry.block_id("Grass"), Some(1));
        assert_eq!(registry.block_id("Stone"), Some(2));
        assert_eq!(registry.block_id("Dirt"), Some(3));
        assert_eq!(registry.block_id("Lava"), None);
    }

    #[test]
    fn test_resolve_palette() {
        let palette =
            MaterialPalette::resolve(&StaticBlockRegistry::default(), &MaterialNames::default()).unwrap();
        assert_eq!(palette.surface, VoxelBlock::new(1));
        assert_eq!(palette.subsurface, VoxelBlock::new(3));
        assert_eq!(palette.deep, VoxelBlock::new(2));
    }

    #[test]
    fn test_unknown_material() {
        let names = MaterialNames {
            deep: "Basalt".to_string(),
            ..MaterialNames::default()
        };
        assert_eq!(
            MaterialPalette::resolve(&StaticBlockRegistry::default(), &names),
            Err(ProceduralError::UnknownMaterial("Basalt".to_string()))
        );
    }
}
