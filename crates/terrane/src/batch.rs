//! # Batch Generation
//!
//! Requests a square of chunks from a [`ChunkPipeline`], collects one event
//! per chunk and summarizes them. If the events do not all arrive before the
//! deadline, the pipeline is aborted and whatever was still outstanding is
//! counted as timed out.

use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use terrane_procedural::{ChunkCoord, ChunkEvent, ChunkPipeline, ProceduralResult};
use web_time::Instant;

/// Per-chunk stats for a generated chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkLine {
    /// The chunk.
    pub coord: ChunkCoord,
    /// Non-empty voxels.
    pub solid: usize,
    /// RLE node count.
    pub nodes: usize,
    /// Voxels per RLE node.
    pub ratio: f64,
    /// Noise generator time.
    pub noise_time: Duration,
    /// Synthesis and encoding time.
    pub synthesis_time: Duration,
}

/// Result of one batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchSummary {
    /// Generated chunks, in arrival order.
    pub lines: Vec<ChunkLine>,
    /// Requests that ended cancelled.
    pub cancelled: Vec<ChunkCoord>,
    /// Requests that failed, with the reason.
    pub failed: Vec<(ChunkCoord, String)>,
    /// Requests with no event before the deadline.
    pub timed_out: usize,
    /// Timing samples the diagnostics buffer had to drop.
    pub dropped_timings: u64,
    /// Mean generator task time over the buffered samples.
    pub mean_task_time: Option<Duration>,
}

impl BatchSummary {
    /// Number of chunks requested.
    #[must_use]
    pub fn requested(&self) -> usize {
        self.lines.len() + self.cancelled.len() + self.failed.len() + self.timed_out
    }

    /// Voxels per RLE node over the whole batch.
    #[must_use]
    pub fn overall_ratio(&self) -> f64 {
        let nodes: usize = self.lines.iter().map(|l| l.nodes).sum();
        if nodes == 0 {
            return 0.0;
        }
        let voxels: f64 = self.lines.iter().map(|l| l.ratio * l.nodes as f64).sum();
        voxels / nodes as f64
    }

    /// Mean synthesis time of the generated chunks.
    #[must_use]
    pub fn mean_synthesis_time(&self) -> Option<Duration> {
        let count = u32::try_from(self.lines.len()).ok().filter(|&n| n > 0)?;
        Some(self.lines.iter().map(|l| l.synthesis_time).sum::<Duration>() / count)
    }

    fn record(&mut self, event: ChunkEvent) {
        match event {
            ChunkEvent::Generated(chunk) => self.lines.push(ChunkLine {
                coord: chunk.coord,
                solid: chunk.volume.solid_count(),
                nodes: chunk.encoded.len(),
                ratio: chunk.compression_ratio(),
                noise_time: chunk.noise_time,
                synthesis_time: chunk.synthesis_time,
            }),
            ChunkEvent::Cancelled(coord) => self.cancelled.push(coord),
            ChunkEvent::Failed { coord, reason } => {
                tracing::warn!("chunk {} failed: {}", coord, reason);
                self.failed.push((coord, reason));
            }
        }
    }
}

/// Generates every chunk within `radius` of `center` and waits up to
/// `timeout` for the results.
///
/// The pipeline should have no other requests in flight; their events
/// would be counted here.
///
/// # Errors
///
/// Returns the first request error (for example an aborted pipeline).
pub fn generate_square(
    pipeline: &ChunkPipeline,
    center: ChunkCoord,
    radius: u32,
    timeout: Duration,
) -> ProceduralResult<BatchSummary> {
    let coords = center.square(radius);
    let events = pipeline.events();
    let deadline = Instant::now() + timeout;

    tracing::info!("requesting {} chunks around {}", coords.len(), center);
    for &coord in &coords {
        pipeline.request(coord)?;
    }

    let mut summary = BatchSummary::default();
    let mut outstanding = coords.len();
    while outstanding > 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(event) => {
                summary.record(event);
                outstanding -= 1;
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
        }
    }

    if outstanding > 0 {
        tracing::warn!("{} chunks still outstanding at deadline, aborting", outstanding);
        pipeline.abort(true);
        for event in events.try_iter() {
            summary.record(event);
            outstanding = outstanding.saturating_sub(1);
        }
        pipeline.reset();
    }
    summary.timed_out = outstanding;

    let timings = pipeline.timings();
    summary.dropped_timings = timings.dropped();
    summary.mean_task_time = timings.mean_elapsed();

    Ok(summary)
}
