//! # Procedural Error Types
//!
//! All errors that can occur while building fields, synthesizing voxels and
//! loading generation config.

use terrane_core::CoreError;
use thiserror::Error;

/// Errors that can occur in procedural generation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProceduralError {
    /// A section request reaches outside the field.
    #[error("section at {position:?} with size {size:?} is outside the field")]
    OutOfBounds {
        /// Requested `(x, z)` corner in world space.
        position: [i32; 2],
        /// Requested `(x, z)` extents.
        size: [i32; 2],
    },

    /// The field has not finished generating, or was released.
    #[error("noise field is not ready")]
    NotReady,

    /// Field and chunk footprints disagree.
    #[error("dimension mismatch: expected {expected} columns, got {actual}")]
    DimensionMismatch {
        /// Columns the chunk needs.
        expected: usize,
        /// Columns the field has.
        actual: usize,
    },

    /// The block registry has no entry for a material name.
    #[error("unknown material: {0}")]
    UnknownMaterial(String),

    /// A config value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The config document could not be parsed.
    #[error("config parse error: {0}")]
    Config(String),

    /// The config file could not be read.
    #[error("i/o error: {0}")]
    Io(String),

    /// Error from the task and scheduling layer.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<toml::de::Error> for ProceduralError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for ProceduralError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for procedural operations.
pub type ProceduralResult<T> = Result<T, ProceduralError>;
