//! `chunkgen`: generate a square of chunks and report compression and timing.
//!
//! Run with: cargo run --release --bin chunkgen -- --radius 4 --config crates/terrane/config/chunkgen.toml

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use terrane::generate_square;
use terrane_procedural::{
    ChunkCoord, ChunkPipeline, GenerationConfig, HeightCurve, NoiseAlgorithm, StaticBlockRegistry,
};

#[derive(Parser)]
#[command(name = "chunkgen", about = "Generate terrain chunks in the background and summarize them")]
struct Cli {
    /// TOML generation config; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chunks generated on each side of the center chunk
    #[arg(short, long, default_value = "2")]
    radius: u32,

    /// Center chunk X
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    center_x: i32,

    /// Center chunk Z
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    center_z: i32,

    /// Override the config seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Use the fractal generator regardless of config
    #[arg(long)]
    fractal: bool,

    /// Apply a smoothstep height curve
    #[arg(long)]
    smooth: bool,

    /// Give up after this many seconds
    #[arg(long, default_value = "60")]
    timeout: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = match &cli.config {
        Some(path) => GenerationConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => GenerationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.noise.seed = seed;
    }
    if cli.fractal {
        config.noise.algorithm = NoiseAlgorithm::Fractal;
    }

    let mut pipeline = ChunkPipeline::new(&config, &StaticBlockRegistry::default())
        .context("starting chunk pipeline")?;
    if cli.smooth {
        pipeline = pipeline.with_curve(HeightCurve::smoothstep());
    }

    println!(
        "chunkgen v{}: {:?} noise, seed {}, {} workers, chunk {}x{}x{}",
        env!("CARGO_PKG_VERSION"),
        config.noise.algorithm,
        config.noise.seed,
        pipeline.scheduler().worker_count(),
        config.chunk.size_x,
        config.chunk.size_y,
        config.chunk.size_z
    );

    let center = ChunkCoord::new(cli.center_x, cli.center_z);
    let summary = generate_square(&pipeline, center, cli.radius, Duration::from_secs(cli.timeout))
        .context("generating chunks")?;

    let mut lines = summary.lines.clone();
    lines.sort_by_key(|l| l.coord);
    for line in &lines {
        println!(
            "chunk {:>12}  solid {:>7}  rle nodes {:>6}  ratio {:>7.2}  noise {:>9.3?}  synth {:>9.3?}",
            line.coord.to_string(),
            line.solid,
            line.nodes,
            line.ratio,
            line.noise_time,
            line.synthesis_time
        );
    }

    println!();
    println!(
        "generated {} / {} chunks, {} cancelled, {} failed, {} timed out",
        summary.lines.len(),
        summary.requested(),
        summary.cancelled.len(),
        summary.failed.len(),
        summary.timed_out
    );
    println!("overall compression ratio: {:.2}", summary.overall_ratio());
    if let Some(mean) = summary.mean_task_time {
        println!("average generator time: {mean:.3?}");
    }
    if let Some(mean) = summary.mean_synthesis_time() {
        println!("average synthesis time: {mean:.3?}");
    }
    println!("diagnostics samples dropped: {}", summary.dropped_timings);

    for fault in pipeline.faults().try_iter() {
        println!("fault in task {}: {}", fault.id, fault.error);
    }

    if !summary.failed.is_empty() {
        anyhow::bail!("{} chunks failed", summary.failed.len());
    }
    Ok(())
}
