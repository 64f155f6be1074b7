// src/detection/yolo.rs

use super::{iou, Detection, Detector, TrackIdAssigner};
use crate::types::Frame;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{debug, info};

const YOLO_INPUT_SIZE: usize = 640;
const YOLO_CLASSES: usize = 80;
const YOLO_PREDICTIONS: usize = 8400;

// Ultralytics defaults.
const BASE_CONFIDENCE: f32 = 0.25;
const NMS_IOU_THRESHOLD: f32 = 0.45;

/// YOLOv8-family detector with frame-to-frame identity assignment.
pub struct YoloTracker {
    session: Session,
    assigner: TrackIdAssigner,
}

impl YoloTracker {
    pub fn new(model_path: &str) -> Result<Self> {
        info!("Loading YOLO model: {}", model_path);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(model_path)
            .context("Failed to load model")?;

        info!("✓ YOLO detector initialized");
        Ok(Self {
            session,
            assigner: TrackIdAssigner::new(),
        })
    }

    fn preprocess(&self, frame: &Frame) -> (Vec<f32>, f32, f32, f32) {
        let (src_w, src_h) = (frame.width, frame.height);
        let target_size = YOLO_INPUT_SIZE;

        // Scale to fit inside 640x640 while keeping the aspect ratio.
        let scale = (target_size as f32 / src_w as f32).min(target_size as f32 / src_h as f32);
        let scaled_w = (src_w as f32 * scale) as usize;
        let scaled_h = (src_h as f32 * scale) as usize;

        let pad_x = (target_size - scaled_w) as f32 / 2.0;
        let pad_y = (target_size - scaled_h) as f32 / 2.0;

        let resized = resize_bilinear(&frame.data, src_w, src_h, scaled_w, scaled_h);

        // Gray letterbox canvas with the frame centered.
        let mut canvas = vec![114u8; target_size * target_size * 3];
        for y in 0..scaled_h {
            for x in 0..scaled_w {
                let src_idx = (y * scaled_w + x) * 3;
                let dst_x = x + pad_x as usize;
                let dst_y = y + pad_y as usize;
                let dst_idx = (dst_y * target_size + dst_x) * 3;
                canvas[dst_idx..dst_idx + 3].copy_from_slice(&resized[src_idx..src_idx + 3]);
            }
        }

        // Normalize [0, 255] -> [0, 1] and convert HWC -> CHW.
        let mut input = vec![0.0f32; 3 * target_size * target_size];
        for c in 0..3 {
            for h in 0..target_size {
                for w in 0..target_size {
                    let hwc_idx = (h * target_size + w) * 3 + c;
                    let chw_idx = c * target_size * target_size + h * target_size + w;
                    input[chw_idx] = canvas[hwc_idx] as f32 / 255.0;
                }
            }
        }

        (input, scale, pad_x, pad_y)
    }

    fn infer(&mut self, input: Vec<f32>) -> Result<Vec<f32>> {
        let shape = [1, 3, YOLO_INPUT_SIZE, YOLO_INPUT_SIZE];
        let input_value =
            ort::value::Value::from_array((shape.as_slice(), input.into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs!["images" => input_value])?;
        let output = &outputs[0];
        let (_, data) = output.try_extract_tensor::<f32>()?;

        Ok(data.to_vec())
    }

    fn postprocess(&self, output: &[f32], scale: f32, pad_x: f32, pad_y: f32) -> Vec<Detection> {
        let mut detections = Vec::new();

        // Output layout [1, 84, 8400]: per prediction
        // [x, y, w, h, class0_conf, ..., class79_conf].
        for i in 0..YOLO_PREDICTIONS {
            let cx = output[i];
            let cy = output[YOLO_PREDICTIONS + i];
            let w = output[YOLO_PREDICTIONS * 2 + i];
            let h = output[YOLO_PREDICTIONS * 3 + i];

            let mut max_conf = 0.0f32;
            let mut best_class = 0;
            for c in 0..YOLO_CLASSES {
                let conf = output[YOLO_PREDICTIONS * (4 + c) + i];
                if conf > max_conf {
                    max_conf = conf;
                    best_class = c;
                }
            }

            if max_conf < BASE_CONFIDENCE {
                continue;
            }

            // Center format to corners, then reverse the letterbox transform.
            let x1 = (cx - w / 2.0 - pad_x) / scale;
            let y1 = (cy - h / 2.0 - pad_y) / scale;
            let x2 = (cx + w / 2.0 - pad_x) / scale;
            let y2 = (cy + h / 2.0 - pad_y) / scale;

            detections.push(Detection {
                track_id: None,
                bbox: [x1, y1, x2, y2],
                confidence: max_conf,
                class_id: best_class,
            });
        }

        nms(detections, NMS_IOU_THRESHOLD)
    }
}

impl Detector for YoloTracker {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let (input, scale, pad_x, pad_y) = self.preprocess(frame);
        let output = self.infer(input)?;

        let mut detections = self.postprocess(&output, scale, pad_x, pad_y);
        self.assigner.assign(&mut detections);

        debug!(
            "Frame {}: {} detections after NMS",
            frame.index,
            detections.len()
        );
        Ok(detections)
    }
}

fn resize_bilinear(src: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    let mut dst = vec![0u8; dst_h * dst_w * 3];
    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx as f32 * x_ratio;
            let sy = dy as f32 * y_ratio;
            let sx0 = sx.floor() as usize;
            let sy0 = sy.floor() as usize;
            let sx1 = (sx0 + 1).min(src_w - 1);
            let sy1 = (sy0 + 1).min(src_h - 1);
            let fx = sx - sx0 as f32;
            let fy = sy - sy0 as f32;

            for c in 0..3 {
                let p00 = src[(sy0 * src_w + sx0) * 3 + c] as f32;
                let p10 = src[(sy0 * src_w + sx1) * 3 + c] as f32;
                let p01 = src[(sy1 * src_w + sx0) * 3 + c] as f32;
                let p11 = src[(sy1 * src_w + sx1) * 3 + c] as f32;

                let val = p00 * (1.0 - fx) * (1.0 - fy)
                    + p10 * fx * (1.0 - fy)
                    + p01 * (1.0 - fx) * fy
                    + p11 * fx * fy;

                dst[(dy * dst_w + dx) * 3 + c] = val.round() as u8;
            }
        }
    }
    dst
}

fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    while !detections.is_empty() {
        let current = detections.remove(0);
        detections.retain(|det| iou(&current.bbox, &det.bbox) < iou_threshold);
        keep.push(current);
    }

    keep
}

pub fn class_name(class_id: usize) -> &'static str {
    COCO_CLASSES.get(class_id).copied().unwrap_or("object")
}

// COCO class names (80 classes).
const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nms_suppresses_overlapping_boxes() {
        let detections = vec![
            Detection {
                track_id: None,
                bbox: [10.0, 10.0, 50.0, 50.0],
                confidence: 0.9,
                class_id: 0,
            },
            Detection {
                track_id: None,
                bbox: [12.0, 12.0, 52.0, 52.0],
                confidence: 0.6,
                class_id: 0,
            },
            Detection {
                track_id: None,
                bbox: [200.0, 200.0, 240.0, 240.0],
                confidence: 0.8,
                class_id: 2,
            },
        ];

        let kept = nms(detections, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.8);
    }

    #[test]
    fn test_resize_preserves_solid_color() {
        let src = vec![200u8; 8 * 8 * 3];
        let dst = resize_bilinear(&src, 8, 8, 4, 4);
        assert_eq!(dst.len(), 4 * 4 * 3);
        assert!(dst.iter().all(|&v| v == 200));
    }

    #[test]
    fn test_class_names() {
        assert_eq!(class_name(0), "person");
        assert_eq!(class_name(2), "car");
        assert_eq!(class_name(79), "toothbrush");
        assert_eq!(class_name(999), "object");
    }
}
