// src/pipeline.rs

use crate::detection::Detector;
use crate::overlay;
use crate::track_store::{Observation, TrackStore};
use crate::trail_renderer::TrailRenderer;
use crate::types::Frame;
use anyhow::{Context, Result};
use opencv::core::Mat;
use tracing::{debug, info, warn};

/// Frame supply. `Ok(None)` means the stream is exhausted, which is the
/// pipeline's sole normal termination condition.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Frame persistence. A write failure is fatal to the pipeline.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Mat) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStats {
    pub frames: usize,
    pub detector_failures: usize,
    pub tracks_peak: usize,
}

/// The per-frame control loop: Fetch -> Detect -> Update -> Render -> Emit.
///
/// Frames are processed strictly sequentially in arrival order; the track
/// store is the only cross-frame state. The detector is injected at
/// construction and owned here.
pub struct Pipeline<D: Detector> {
    detector: D,
    store: TrackStore,
    renderer: TrailRenderer,
}

impl<D: Detector> Pipeline<D> {
    pub fn new(detector: D, store: TrackStore, renderer: TrailRenderer) -> Self {
        Self {
            detector,
            store,
            renderer,
        }
    }

    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    /// Run until the source is exhausted. Source and sink handles are
    /// released on every exit path: the sink is closed explicitly on the
    /// normal path and both fall back to their `Drop` impls on error.
    pub fn run(
        &mut self,
        source: &mut impl FrameSource,
        sink: &mut impl FrameSink,
    ) -> Result<PipelineStats> {
        let mut stats = PipelineStats::default();

        while let Some(frame) = source.next_frame()? {
            stats.frames += 1;
            let mut annotated = overlay::to_bgr_mat(&frame)?;

            match self.detector.detect(&frame) {
                Ok(detections) => {
                    let observations: Vec<Observation> = detections
                        .iter()
                        .map(|det| Observation {
                            track_id: det.track_id,
                            position: det.center(),
                        })
                        .collect();

                    self.store.update(&observations);
                    stats.tracks_peak = stats.tracks_peak.max(self.store.len());

                    overlay::draw_detections(&mut annotated, &detections)?;
                    self.renderer.render(&mut annotated, &self.store)?;

                    debug!(
                        "Frame {}: {} detections, {} active tracks",
                        frame.index,
                        detections.len(),
                        self.store.len()
                    );
                }
                Err(err) => {
                    // Per-frame recoverable: leave the store untouched and
                    // emit the raw frame unannotated.
                    stats.detector_failures += 1;
                    warn!("Detector failed on frame {}: {:#}", frame.index, err);
                }
            }

            sink.write_frame(&annotated)
                .context("Failed to write output frame")?;
        }

        sink.close().context("Failed to finalize output video")?;

        info!(
            "Pipeline finished: {} frames, {} detector failures, peak {} tracks",
            stats.frames, stats.detector_failures, stats.tracks_peak
        );
        Ok(stats)
    }
}
