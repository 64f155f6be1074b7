// src/detection/mod.rs

mod assigner;
mod yolo;

pub use assigner::TrackIdAssigner;
pub use yolo::{class_name, YoloTracker};

use crate::types::Frame;
use anyhow::Result;

/// One detected object on a single frame.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Stable identity assigned by the tracker; `None` means the detection
    /// has no persistent identity and must not feed a trail.
    pub track_id: Option<i64>,
    /// [x1, y1, x2, y2] in frame coordinates.
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: usize,
}

impl Detection {
    /// Box center, the position a trail is anchored to.
    pub fn center(&self) -> (f32, f32) {
        (
            (self.bbox[0] + self.bbox[2]) / 2.0,
            (self.bbox[1] + self.bbox[3]) / 2.0,
        )
    }
}

/// Detection-and-tracking backend, injected into the pipeline at
/// construction. Implementations own whatever model state they need.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }
}

/// Wraps a detector and drops detections below a confidence threshold.
pub struct ConfidenceFiltered<D> {
    inner: D,
    threshold: f32,
}

impl<D: Detector> ConfidenceFiltered<D> {
    pub fn new(inner: D, threshold: f32) -> Self {
        Self { inner, threshold }
    }
}

impl<D: Detector> Detector for ConfidenceFiltered<D> {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let mut detections = self.inner.detect(frame)?;
        detections.retain(|det| det.confidence >= self.threshold);
        Ok(detections)
    }
}

pub(crate) fn iou(box1: &[f32; 4], box2: &[f32; 4]) -> f32 {
    let x1 = box1[0].max(box2[0]);
    let y1 = box1[1].max(box2[1]);
    let x2 = box1[2].min(box2[2]);
    let y2 = box1[3].min(box2[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area1 = (box1[2] - box1[0]) * (box1[3] - box1[1]);
    let area2 = (box2[2] - box2[0]) * (box2[3] - box2[1]);
    let union = area1 + area2 - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
