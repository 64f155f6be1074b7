// src/overlay.rs

use crate::detection::{class_name, Detection};
use crate::types::Frame;
use anyhow::Result;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};

/// Build a drawable BGR `Mat` from a frame's RGB byte buffer.
pub fn to_bgr_mat(frame: &Frame) -> Result<Mat> {
    let mat = Mat::from_slice(&frame.data)?;
    let mat = mat.reshape(3, frame.height as i32)?;

    let mut bgr = Mat::default();
    imgproc::cvt_color(&mat, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

/// Draw bounding boxes and class/ID labels for one frame's detections.
pub fn draw_detections(frame: &mut Mat, detections: &[Detection]) -> Result<()> {
    let (cols, rows) = (frame.cols(), frame.rows());
    let box_color = core::Scalar::new(0.0, 255.0, 0.0, 0.0);
    let text_color = core::Scalar::new(255.0, 255.0, 255.0, 0.0);

    for det in detections {
        let x1 = (det.bbox[0] as i32).clamp(0, cols - 1);
        let y1 = (det.bbox[1] as i32).clamp(0, rows - 1);
        let x2 = (det.bbox[2] as i32).clamp(0, cols - 1);
        let y2 = (det.bbox[3] as i32).clamp(0, rows - 1);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        imgproc::rectangle(
            frame,
            core::Rect::new(x1, y1, x2 - x1, y2 - y1),
            box_color,
            2,
            imgproc::LINE_8,
            0,
        )?;

        let label = match det.track_id {
            Some(id) => format!("{} #{} {:.2}", class_name(det.class_id), id, det.confidence),
            None => format!("{} {:.2}", class_name(det.class_id), det.confidence),
        };

        let mut baseline = 0;
        let text_size = imgproc::get_text_size(
            &label,
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.5,
            1,
            &mut baseline,
        )?;

        // Filled background so the label stays readable over the scene.
        let text_y = (y1 - 5).max(text_size.height + 2);
        imgproc::rectangle(
            frame,
            core::Rect::new(
                x1,
                text_y - text_size.height - 2,
                text_size.width,
                text_size.height + baseline,
            ),
            box_color,
            -1,
            imgproc::LINE_8,
            0,
        )?;

        imgproc::put_text(
            frame,
            &label,
            core::Point::new(x1, text_y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.5,
            text_color,
            1,
            imgproc::LINE_8,
            false,
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: usize, height: usize) -> Frame {
        Frame {
            data: vec![0; width * height * 3],
            width,
            height,
            index: 0,
        }
    }

    fn pixel_sum(mat: &Mat) -> f64 {
        let sums = core::sum_elems(mat).unwrap();
        sums[0] + sums[1] + sums[2]
    }

    #[test]
    fn test_to_bgr_mat_geometry() {
        let mat = to_bgr_mat(&frame(8, 6)).unwrap();
        assert_eq!(mat.cols(), 8);
        assert_eq!(mat.rows(), 6);
        assert_eq!(mat.channels(), 3);
    }

    #[test]
    fn test_draw_detections_marks_pixels() {
        let mut mat = to_bgr_mat(&frame(100, 100)).unwrap();
        let detections = vec![Detection {
            track_id: Some(4),
            bbox: [20.0, 20.0, 70.0, 80.0],
            confidence: 0.87,
            class_id: 0,
        }];

        draw_detections(&mut mat, &detections).unwrap();
        assert!(pixel_sum(&mat) > 0.0);
    }

    #[test]
    fn test_degenerate_box_is_skipped() {
        let mut mat = to_bgr_mat(&frame(100, 100)).unwrap();
        let detections = vec![Detection {
            track_id: Some(1),
            bbox: [-50.0, -50.0, -10.0, -10.0],
            confidence: 0.9,
            class_id: 0,
        }];

        draw_detections(&mut mat, &detections).unwrap();
        assert_eq!(pixel_sum(&mat), 0.0);
    }
}
