//! # TERRANE
//!
//! Background chunk generation for voxel worlds.
//!
//! ## Crates
//!
//! | Crate                | Contents                                              |
//! |----------------------|-------------------------------------------------------|
//! | `terrane_core`       | Tasks, cancellation, worker-pool scheduler, regions   |
//! | `terrane_procedural` | Noise, height fields, voxel synthesis, RLE, pipeline  |
//!
//! This crate re-exports both and adds [`batch`], the square-of-chunks driver
//! behind the `chunkgen` binary.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod batch;

pub use terrane_core;
pub use terrane_procedural;

pub use batch::{generate_square, BatchSummary, ChunkLine};

/// Everything needed to drive generation.
pub mod prelude {
    pub use terrane_core::{
        CancellationToken, Scheduler, SchedulerConfig, Task, TaskError, TaskHandle, TaskId,
        TaskOutcome, TaskReport, TaskState,
    };
    pub use terrane_procedural::{
        BlockRegistry, ChunkCoord, ChunkDimensions, ChunkEvent, ChunkPipeline, ChunkVolume,
        GenerationConfig, HeightCurve, NoiseAlgorithm, NoiseField, StaticBlockRegistry, VoxelBlock,
        WorldSeed,
    };

    pub use crate::batch::{generate_square, BatchSummary};
}
