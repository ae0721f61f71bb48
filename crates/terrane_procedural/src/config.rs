//! # Generation Config
//!
//! Everything a [`ChunkPipeline`](crate::ChunkPipeline) needs, loadable from
//! TOML. Missing tables and keys take their defaults.
//!
//! ```toml
//! [scheduler]
//! core_utilization = 0.75
//!
//! [chunk]
//! size_x = 16
//! size_y = 64
//! size_z = 16
//!
//! [noise]
//! algorithm = "fractal"
//! seed = 1337
//! octaves = 5
//!
//! [materials]
//! surface = "Grass"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use terrane_core::SchedulerConfig;

use crate::chunk::ChunkDimensions;
use crate::error::{ProceduralError, ProceduralResult};
use crate::generate::FractalSettings;
use crate::noise::WorldSeed;
use crate::registry::MaterialNames;

/// Which generator fills the height fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseAlgorithm {
    /// Two-pass min/max-normalized simplex.
    #[default]
    Simplex,
    /// Octave-summed Perlin.
    Fractal,
}

/// Noise parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// Generator choice.
    pub algorithm: NoiseAlgorithm,
    /// World seed.
    pub seed: u64,
    /// Horizontal stretch, both algorithms.
    pub scale: f64,
    /// Fractal layer count.
    pub octaves: u32,
    /// Fractal amplitude multiplier per octave.
    pub persistence: f64,
    /// Fractal frequency multiplier per octave.
    pub lacunarity: f64,
    /// Fractal coordinate divisor applied before `scale`.
    pub sample_divisor: f64,
    /// Fractal fixed-range normalization on/off.
    pub normalize: bool,
    /// Fractal normalization range `R` in `[-R, R]`.
    pub normalization_range: f64,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        let fractal = FractalSettings::default();
        Self {
            algorithm: NoiseAlgorithm::default(),
            seed: WorldSeed::default().value(),
            scale: fractal.scale,
            octaves: fractal.octaves,
            persistence: fractal.persistence,
            lacunarity: fractal.lacunarity,
            sample_divisor: fractal.sample_divisor,
            normalize: fractal.normalize,
            normalization_range: fractal.normalization_range,
        }
    }
}

impl NoiseSettings {
    /// The world seed.
    #[must_use]
    pub const fn world_seed(&self) -> WorldSeed {
        WorldSeed::new(self.seed)
    }

    /// Fractal generator parameters.
    #[must_use]
    pub const fn fractal(&self) -> FractalSettings {
        FractalSettings {
            octaves: self.octaves,
            persistence: self.persistence,
            lacunarity: self.lacunarity,
            scale: self.scale,
            sample_divisor: self.sample_divisor,
            normalize: self.normalize,
            normalization_range: self.normalization_range,
        }
    }

    /// Checks value ranges.
    ///
    /// Scale and divisor are floored rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ProceduralError::InvalidConfig`] for non-finite values, or
    /// zero octaves with the fractal algorithm.
    pub fn validate(&self) -> ProceduralResult<()> {
        let finite = [
            ("scale", self.scale),
            ("persistence", self.persistence),
            ("lacunarity", self.lacunarity),
            ("sample_divisor", self.sample_divisor),
            ("normalization_range", self.normalization_range),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ProceduralError::InvalidConfig(format!(
                "noise.{name} must be finite, got {value}"
            )));
        }
        if self.algorithm == NoiseAlgorithm::Fractal && self.octaves == 0 {
            return Err(ProceduralError::InvalidConfig(
                "noise.octaves must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level generation config.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Worker pool.
    pub scheduler: SchedulerConfig,
    /// Chunk extents.
    pub chunk: ChunkDimensions,
    /// Height noise.
    pub noise: NoiseSettings,
    /// Layer materials.
    pub materials: MaterialNames,
}

impl GenerationConfig {
    /// Parses a TOML document and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ProceduralError::Config`] for malformed TOML and
    /// [`ProceduralError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> ProceduralResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// As [`from_toml_str`](Self::from_toml_str), plus
    /// [`ProceduralError::Io`] if the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> ProceduralResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        tracing::debug!("loaded generation config from {}", path.display());
        Self::from_toml_str(&source)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns the first section's error.
    pub fn validate(&self) -> ProceduralResult<()> {
        self.scheduler.validate()?;
        self.chunk.validate()?;
        self.noise.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = GenerationConfig::from_toml_str("").unwrap();
        assert_eq!(config, GenerationConfig::default());
    }

    #[test]
    fn test_partial_tables() {
        let config = GenerationConfig::from_toml_str(
            r#"
            [scheduler]
            workers = 3

            [chunk]
            size_y = 128

            [noise]
            algorithm = "fractal"
            seed = 1337
            octaves = 6

            [materials]
            deep = "Basalt"
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.workers, Some(3));
        assert_eq!(config.chunk.size_y, 128);
        assert_eq!(config.chunk.size_x, 16, "unset keys keep defaults");
        assert_eq!(config.noise.algorithm, NoiseAlgorithm::Fractal);
        assert_eq!(config.noise.world_seed(), WorldSeed::new(1337));
        assert_eq!(config.noise.fractal().octaves, 6);
        assert_eq!(config.materials.deep, "Basalt");
        assert_eq!(config.materials.surface, "Grass");
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            GenerationConfig::from_toml_str("[chunk\nsize_x = 1"),
            Err(ProceduralError::Config(_))
        ));
    }

    #[test]
    fn test_out_of_range_values() {
        assert!(matches!(
            GenerationConfig::from_toml_str("[chunk]\nsize_x = 0"),
            Err(ProceduralError::InvalidConfig(_))
        ));
        assert!(matches!(
            GenerationConfig::from_toml_str("[noise]\nalgorithm = \"fractal\"\noctaves = 0"),
            Err(ProceduralError::InvalidConfig(_))
        ));
        assert!(matches!(
            GenerationConfig::from_toml_str("[scheduler]\ncore_utilization = 0.0"),
            Err(ProceduralError::Core(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            GenerationConfig::from_path("/definitely/not/here.toml"),
            Err(ProceduralError::Io(_))
        ));
    }
}
