// src/main.rs

mod config;
mod detection;
mod overlay;
mod pipeline;
mod track_store;
mod trail_renderer;
mod types;
mod video;

use anyhow::Result;
use clap::Parser;
use detection::{ConfidenceFiltered, Detector, YoloTracker};
use pipeline::Pipeline;
use std::path::PathBuf;
use track_store::TrackStore;
use trail_renderer::TrailRenderer;
use tracing::info;
use types::Config;
use video::{VideoSink, VideoSource};

#[derive(Parser)]
#[command(about = "Track objects across a video and render their motion trails")]
struct Args {
    /// Path to the input video
    video: PathBuf,

    /// YOLO ONNX model to use
    #[arg(long, default_value = "yolov8n.onnx")]
    model: String,

    /// Minimum detection confidence; selects the confidence-filtered tracker
    #[arg(long)]
    confidence: Option<f32>,

    /// Optional YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "trail_tracker={},ort=warn",
            config.logging.level
        ))
        .init();

    info!("🎬 Object Trail Tracker Starting");

    let mut source = VideoSource::open(&args.video)?;

    let output_path = video::derive_output_path(&args.video, &args.model);
    let mut sink = VideoSink::create(&output_path, source.fps, source.width, source.height)?;

    let yolo = YoloTracker::new(&args.model)?;
    let threshold = args
        .confidence
        .or(config.detection.confidence_threshold);
    let detector: Box<dyn Detector> = match threshold {
        Some(threshold) => {
            info!("Confidence filter enabled: {:.2}", threshold);
            Box::new(ConfidenceFiltered::new(yolo, threshold))
        }
        None => Box::new(yolo),
    };

    let store = TrackStore::new(config.trail.max_history);
    let renderer = TrailRenderer::new(&config.trail);

    let mut pipeline = Pipeline::new(detector, store, renderer);
    let stats = pipeline.run(&mut source, &mut sink)?;

    info!(
        "✓ Wrote {} ({} frames, peak {} tracks)",
        output_path.display(),
        stats.frames,
        stats.tracks_peak
    );
    Ok(())
}
