//! # TERRANE Procedural Generation
//!
//! Deterministic chunk generation on top of the `terrane_core` scheduler.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed always produces the same terrain
//! 2. **Chunked**: Terrain is generated in fixed-size chunks
//! 3. **Cancellable**: Generators poll their token between columns
//! 4. **Read-only handoff**: A ready field is never written again
//!
//! ## Core Components
//!
//! - `SimplexNoise` / `PerlinNoise`: Seed-keyed base noise
//! - `NoiseField`: Bounded height map with checked section reads
//! - `SimplexFieldTask` / `FractalFieldTask`: Field generators run as tasks
//! - `VoxelSynthesizer`: Parallel column classification into blocks
//! - `rle`: Run-length codec for voxel arrays
//! - `ChunkPipeline`: Request chunks, receive `ChunkEvent`s
//!
//! ## Example
//!
//! ```rust,ignore
//! use terrane_procedural::{ChunkCoord, ChunkEvent, ChunkPipeline, GenerationConfig, StaticBlockRegistry};
//!
//! let pipeline = ChunkPipeline::new(&GenerationConfig::default(), &StaticBlockRegistry::default())?;
//! pipeline.request(ChunkCoord::new(0, 0))?;
//!
//! if let ChunkEvent::Generated(chunk) = pipeline.events().recv()? {
//!     println!("{} solid voxels", chunk.volume.solid_count());
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod chunk;
pub mod config;
pub mod error;
pub mod field;
pub mod generate;
pub mod noise;
pub mod pipeline;
pub mod registry;
pub mod rle;
pub mod synth;
pub mod volume;

pub use chunk::{ChunkCoord, ChunkDimensions};
pub use config::{GenerationConfig, NoiseAlgorithm, NoiseSettings};
pub use error::{ProceduralError, ProceduralResult};
pub use field::NoiseField;
pub use generate::{
    inverse_lerp, FieldGenerator, FractalFieldTask, FractalSettings, HeightCurve, SimplexFieldTask,
};
pub use noise::{NoiseSource, PerlinNoise, SimplexNoise, WorldSeed};
pub use pipeline::{ChunkEvent, ChunkPipeline, GeneratedChunk};
pub use registry::{BlockRegistry, MaterialNames, MaterialPalette, StaticBlockRegistry, VoxelBlock};
pub use rle::{compress, compress_with_limit, decompress, RleNode, MAX_RUN};
pub use synth::{classify, target_height, VoxelSynthesizer};
pub use volume::ChunkVolume;
