// src/video.rs

use crate::pipeline::{FrameSink, FrameSource};
use crate::types::Frame;
use anyhow::Result;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureTraitConst, VideoWriter},
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Frame supply backed by an OpenCV `VideoCapture`.
pub struct VideoSource {
    cap: VideoCapture,
    pub fps: f64,
    pub total_frames: i32,
    pub width: i32,
    pub height: i32,
    current_frame: i32,
}

impl VideoSource {
    /// Open an input video. Failure here is fatal to the caller; the
    /// pipeline must never start against an unopenable source.
    pub fn open(path: &Path) -> Result<Self> {
        info!("Opening video: {}", path.display());

        let cap = VideoCapture::from_file(path.to_str().unwrap_or_default(), videoio::CAP_ANY)?;

        if !cap.is_opened()? {
            anyhow::bail!("Failed to open video file {}", path.display());
        }

        let fps = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FPS)?;
        let total_frames = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_COUNT)? as i32;
        let width = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = VideoCaptureTraitConst::get(&cap, videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

        info!(
            "Video properties: {}x{} @ {:.1} FPS, {} frames",
            width, height, fps, total_frames
        );

        Ok(Self {
            cap,
            fps,
            total_frames,
            width,
            height,
            current_frame: 0,
        })
    }
}

impl FrameSource for VideoSource {
    /// `None` ends the pipeline normally; a failed read is treated as end
    /// of stream rather than an error.
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        use opencv::videoio::VideoCaptureTrait;

        let mut mat = Mat::default();
        let ok = match VideoCaptureTrait::read(&mut self.cap, &mut mat) {
            Ok(ok) => ok,
            Err(err) => {
                warn!(
                    "Frame read failed after {} frames, stopping: {}",
                    self.current_frame, err
                );
                false
            }
        };

        if !ok || mat.empty() {
            return Ok(None);
        }

        let mut rgb_mat = Mat::default();
        imgproc::cvt_color(&mat, &mut rgb_mat, imgproc::COLOR_BGR2RGB, 0)?;
        let data = rgb_mat.data_bytes()?.to_vec();

        let frame = Frame {
            data,
            width: self.width as usize,
            height: self.height as usize,
            index: self.current_frame,
        };
        self.current_frame += 1;

        Ok(Some(frame))
    }
}

/// Frame persistence backed by an OpenCV `VideoWriter`. The container is
/// finalized by `close`; `Drop` covers every early exit path.
pub struct VideoSink {
    writer: VideoWriter,
    closed: bool,
}

impl VideoSink {
    pub fn create(path: &Path, fps: f64, width: i32, height: i32) -> Result<Self> {
        info!("Output video: {}", path.display());

        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = VideoWriter::new(
            path.to_str().unwrap_or_default(),
            fourcc,
            fps,
            core::Size::new(width, height),
            true,
        )?;

        if !writer.is_opened()? {
            anyhow::bail!("Failed to create output video {}", path.display());
        }

        Ok(Self {
            writer,
            closed: false,
        })
    }
}

impl FrameSink for VideoSink {
    fn write_frame(&mut self, frame: &Mat) -> Result<()> {
        use opencv::videoio::VideoWriterTrait;

        VideoWriterTrait::write(&mut self.writer, frame)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        use opencv::videoio::VideoWriterTrait;

        self.writer.release()?;
        self.closed = true;
        Ok(())
    }
}

impl Drop for VideoSink {
    fn drop(&mut self) {
        use opencv::videoio::VideoWriterTrait;

        if !self.closed {
            let _ = self.writer.release();
        }
    }
}

/// Output path next to the input, named after the input and the model:
/// `{input_stem}_{model_stem}_tracked.mp4`.
pub fn derive_output_path(input: &Path, model: &str) -> PathBuf {
    let input_stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let model_stem = Path::new(model)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");

    let file_name = format!("{}_{}_tracked.mp4", input_stem, model_stem);
    match input.parent() {
        Some(parent) if parent != Path::new("") => parent.join(file_name),
        _ => PathBuf::from(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_output_path() {
        let path = derive_output_path(Path::new("clips/traffic.mp4"), "yolov8n.onnx");
        assert_eq!(path, PathBuf::from("clips/traffic_yolov8n_tracked.mp4"));
    }

    #[test]
    fn test_derive_output_path_bare_input() {
        let path = derive_output_path(Path::new("traffic.avi"), "models/yolo11m.onnx");
        assert_eq!(path, PathBuf::from("traffic_yolo11m_tracked.mp4"));
    }
}
