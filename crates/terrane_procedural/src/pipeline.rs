//! # Chunk Pipeline
//!
//! Scheduler-driven chunk generation.
//!
//! ## Flow
//!
//! ```text
//!   request(coord)
//!       │
//!       ▼
//!   FieldGenerator task ──(worker)──▶ finished notification
//!                                         │
//!                          Completed ─────┼───── Cancelled / Faulted
//!                              │          │              │
//!                        synthesize       │              │
//!                        RLE encode       │              │
//!                        release field    │              │
//!                              ▼          ▼              ▼
//!                          ChunkEvent on the events channel
//! ```
//!
//! Synthesis runs inside the finished notification on the worker that ran
//! the generator, so `abort(true)` also guarantees no event is sent after it
//! returns.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use terrane_core::{
    CancellationToken, Scheduler, TaskFaultReport, TaskHandle, TaskId, TaskOutcome, TaskReport,
    TimingBuffer,
};
use web_time::Instant;

use crate::chunk::{ChunkCoord, ChunkDimensions};
use crate::config::{GenerationConfig, NoiseAlgorithm, NoiseSettings};
use crate::error::ProceduralResult;
use crate::field::NoiseField;
use crate::generate::{FieldGenerator, FractalFieldTask, HeightCurve, SimplexFieldTask};
use crate::noise::{PerlinNoise, SimplexNoise, PERLIN_PURPOSE, SIMPLEX_PURPOSE};
use crate::registry::{BlockRegistry, MaterialPalette, VoxelBlock};
use crate::rle::RleNode;
use crate::synth::VoxelSynthesizer;
use crate::volume::ChunkVolume;

/// A finished chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedChunk {
    /// Where it sits.
    pub coord: ChunkCoord,
    /// Dense voxels.
    pub volume: ChunkVolume,
    /// RLE form of `volume`.
    pub encoded: Vec<RleNode<Option<VoxelBlock>>>,
    /// Time spent in the noise generator.
    pub noise_time: Duration,
    /// Time spent classifying and encoding.
    pub synthesis_time: Duration,
}

impl GeneratedChunk {
    /// Voxels per RLE node.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.encoded.is_empty() {
            return 0.0;
        }
        self.volume.voxels().len() as f64 / self.encoded.len() as f64
    }
}

/// Outcome of one chunk request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkEvent {
    /// The chunk is ready.
    Generated(Box<GeneratedChunk>),
    /// The request was cancelled before the field was ready.
    Cancelled(ChunkCoord),
    /// The generator faulted or synthesis failed.
    Failed {
        /// The chunk.
        coord: ChunkCoord,
        /// What went wrong.
        reason: String,
    },
}

impl ChunkEvent {
    /// Chunk this event is about.
    #[must_use]
    pub fn coord(&self) -> ChunkCoord {
        match self {
            Self::Generated(chunk) => chunk.coord,
            Self::Cancelled(coord) | Self::Failed { coord, .. } => *coord,
        }
    }
}

/// State shared with the finished notifications.
struct Stage {
    synthesizer: VoxelSynthesizer,
    palette: MaterialPalette,
    events: Sender<ChunkEvent>,
}

impl Stage {
    fn finish(&self, coord: ChunkCoord, handle: &TaskHandle<FieldGenerator>, report: &TaskReport) {
        let event = match &report.outcome {
            TaskOutcome::Completed => match handle.take_task() {
                Some(generator) => self.build(coord, generator.into_field(), report.elapsed),
                None => ChunkEvent::Failed {
                    coord,
                    reason: "generator output was already taken".to_string(),
                },
            },
            TaskOutcome::Cancelled => ChunkEvent::Cancelled(coord),
            TaskOutcome::Faulted(err) => ChunkEvent::Failed {
                coord,
                reason: err.to_string(),
            },
        };
        // Receiver gone means nobody is listening any more
        let _ = self.events.send(event);
    }

    fn build(&self, coord: ChunkCoord, mut field: NoiseField, noise_time: Duration) -> ChunkEvent {
        if !field.is_ready() {
            // A generator that saw the token trip mid-run returns Ok
            return ChunkEvent::Cancelled(coord);
        }

        let start = Instant::now();
        let result = self.synthesizer.synthesize(&field, &self.palette);
        field.release();

        match result {
            Ok(volume) => {
                let encoded = volume.encode();
                let synthesis_time = start.elapsed();
                tracing::debug!(
                    "chunk {} generated: {} solid voxels, {} rle nodes, {:?} noise, {:?} synthesis",
                    coord,
                    volume.solid_count(),
                    encoded.len(),
                    noise_time,
                    synthesis_time
                );
                ChunkEvent::Generated(Box::new(GeneratedChunk {
                    coord,
                    volume,
                    encoded,
                    noise_time,
                    synthesis_time,
                }))
            }
            Err(err) => ChunkEvent::Failed {
                coord,
                reason: err.to_string(),
            },
        }
    }
}

/// Generates chunks on a worker pool and reports them as [`ChunkEvent`]s.
pub struct ChunkPipeline {
    scheduler: Scheduler,
    dims: ChunkDimensions,
    noise: NoiseSettings,
    simplex: Arc<SimplexNoise>,
    perlin: Arc<PerlinNoise>,
    curve: Option<HeightCurve>,
    stage: Arc<Stage>,
    event_receiver: Receiver<ChunkEvent>,
}

impl ChunkPipeline {
    /// Starts the worker pool and resolves the layer materials.
    ///
    /// # Errors
    ///
    /// Returns config validation errors,
    /// [`UnknownMaterial`](crate::error::ProceduralError::UnknownMaterial) or a
    /// wrapped scheduler start failure.
    pub fn new(config: &GenerationConfig, registry: &dyn BlockRegistry) -> ProceduralResult<Self> {
        config.validate()?;

        let palette = MaterialPalette::resolve(registry, &config.materials)?;
        let synthesizer = VoxelSynthesizer::new(config.chunk)?;
        let scheduler = Scheduler::new(&config.scheduler)?;
        let seed = config.noise.world_seed();
        let (events, event_receiver) = unbounded();

        tracing::info!(
            "chunk pipeline ready: {:?} noise, seed {}, chunk {}x{}x{}",
            config.noise.algorithm,
            seed.value(),
            config.chunk.size_x,
            config.chunk.size_y,
            config.chunk.size_z
        );

        Ok(Self {
            scheduler,
            dims: config.chunk,
            noise: config.noise.clone(),
            simplex: Arc::new(SimplexNoise::new(seed.derive(SIMPLEX_PURPOSE))),
            perlin: Arc::new(PerlinNoise::new(seed.derive(PERLIN_PURPOSE))),
            curve: None,
            stage: Arc::new(Stage {
                synthesizer,
                palette,
                events,
            }),
            event_receiver,
        })
    }

    /// Applies `curve` to every field generated from now on.
    #[must_use]
    pub fn with_curve(mut self, curve: HeightCurve) -> Self {
        self.curve = Some(curve);
        self
    }

    /// Chunk extents.
    #[must_use]
    pub const fn dims(&self) -> &ChunkDimensions {
        &self.dims
    }

    /// Builds the configured generator for `coord` without scheduling it.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](crate::error::ProceduralError::InvalidConfig)
    /// if the footprint is invalid.
    pub fn generator(&self, coord: ChunkCoord) -> ProceduralResult<FieldGenerator> {
        let field = NoiseField::for_chunk(coord, &self.dims)?;
        let generator: FieldGenerator = match self.noise.algorithm {
            NoiseAlgorithm::Simplex => {
                let task = SimplexFieldTask::new(Arc::clone(&self.simplex), field, self.noise.scale);
                match &self.curve {
                    Some(curve) => task.with_curve(curve.clone()).into(),
                    None => task.into(),
                }
            }
            NoiseAlgorithm::Fractal => {
                let task = FractalFieldTask::new(Arc::clone(&self.perlin), field, self.noise.fractal());
                match &self.curve {
                    Some(curve) => task.with_curve(curve.clone()).into(),
                    None => task.into(),
                }
            }
        };
        Ok(generator)
    }

    /// Schedules generation of `coord`.
    ///
    /// The returned handle is for cancellation and waiting; the chunk itself
    /// arrives on [`events`](Self::events).
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`terrane_core::CoreError::SchedulerAborted`] after an
    /// abort, until [`reset`](Self::reset).
    pub fn request(&self, coord: ChunkCoord) -> ProceduralResult<TaskHandle<FieldGenerator>> {
        self.request_with_token(coord, CancellationToken::new())
    }

    /// As [`request`](Self::request), with a caller-supplied token (for
    /// deadlines or group cancellation through child tokens).
    ///
    /// # Errors
    ///
    /// As [`request`](Self::request).
    pub fn request_with_token(
        &self,
        coord: ChunkCoord,
        cancel: CancellationToken,
    ) -> ProceduralResult<TaskHandle<FieldGenerator>> {
        let handle = TaskHandle::new(TaskId::next(), cancel, self.generator(coord)?);
        self.scheduler.enqueue(&handle)?;

        // Registered after enqueue so a refused request leaves nothing behind;
        // a task that already finished notifies on this thread instead.
        let stage = Arc::clone(&self.stage);
        let observed = handle.clone();
        handle.on_finished(move |report| stage.finish(coord, &observed, report));

        Ok(handle)
    }

    /// Receiver for chunk events. Clones share one queue.
    #[must_use]
    pub fn events(&self) -> Receiver<ChunkEvent> {
        self.event_receiver.clone()
    }

    /// Raw generator faults, as caught by the workers.
    #[must_use]
    pub fn faults(&self) -> Receiver<TaskFaultReport> {
        self.scheduler.faults()
    }

    /// Generator timing samples.
    #[must_use]
    pub fn timings(&self) -> Arc<TimingBuffer> {
        self.scheduler.timings()
    }

    /// Cancels all outstanding requests; see [`Scheduler::abort`].
    pub fn abort(&self, wait_for_completion: bool) {
        self.scheduler.abort(wait_for_completion);
    }

    /// Accepts requests again after an abort.
    pub fn reset(&self) {
        self.scheduler.reset();
    }

    /// Blocks until every request has produced its event.
    pub fn wait_idle(&self) {
        self.scheduler.wait_idle();
    }

    /// The underlying scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}
