// src/trail_renderer.rs

use crate::track_store::TrackStore;
use crate::types::TrailConfig;
use anyhow::Result;
use opencv::{
    core::{self, Mat},
    imgproc,
};

/// Draws each track's stored history as an open polyline.
pub struct TrailRenderer {
    color: core::Scalar,
    thickness: i32,
}

impl TrailRenderer {
    pub fn new(config: &TrailConfig) -> Self {
        Self {
            color: core::Scalar::new(config.color[0], config.color[1], config.color[2], 0.0),
            thickness: config.thickness.max(1),
        }
    }

    /// Draw every trail with at least two positions onto `frame` in place.
    /// Shorter trails are skipped; a polyline needs two points.
    pub fn render(&self, frame: &mut Mat, store: &TrackStore) -> Result<()> {
        for (_, trail) in store.iter() {
            if trail.len() < 2 {
                continue;
            }

            let points: Vec<(f32, f32)> = trail.iter().copied().collect();
            for pair in points.windows(2) {
                let pt1 = core::Point::new(pair[0].0 as i32, pair[0].1 as i32);
                let pt2 = core::Point::new(pair[1].0 as i32, pair[1].1 as i32);
                imgproc::line(
                    frame,
                    pt1,
                    pt2,
                    self.color,
                    self.thickness,
                    imgproc::LINE_AA,
                    0,
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track_store::Observation;
    use opencv::prelude::*;

    fn blank_frame() -> Mat {
        Mat::new_rows_cols_with_default(100, 100, core::CV_8UC3, core::Scalar::all(0.0)).unwrap()
    }

    fn pixel_sum(mat: &Mat) -> f64 {
        let sums = core::sum_elems(mat).unwrap();
        sums[0] + sums[1] + sums[2]
    }

    fn obs(id: i64, x: f32, y: f32) -> Observation {
        Observation {
            track_id: Some(id),
            position: (x, y),
        }
    }

    #[test]
    fn test_single_position_draws_nothing() {
        let renderer = TrailRenderer::new(&TrailConfig::default());
        let mut store = TrackStore::new(5);
        store.update(&[obs(1, 50.0, 50.0)]);

        let mut frame = blank_frame();
        renderer.render(&mut frame, &store).unwrap();
        assert_eq!(pixel_sum(&frame), 0.0);
    }

    #[test]
    fn test_two_positions_draw_a_line() {
        let renderer = TrailRenderer::new(&TrailConfig::default());
        let mut store = TrackStore::new(5);
        store.update(&[obs(1, 10.0, 10.0)]);
        store.update(&[obs(1, 80.0, 80.0)]);

        let mut frame = blank_frame();
        renderer.render(&mut frame, &store).unwrap();
        assert!(pixel_sum(&frame) > 0.0);
    }

    #[test]
    fn test_polyline_passes_through_stored_points() {
        let renderer = TrailRenderer::new(&TrailConfig::default());
        let mut store = TrackStore::new(5);
        store.update(&[obs(1, 10.0, 50.0)]);
        store.update(&[obs(1, 90.0, 50.0)]);

        let mut frame = blank_frame();
        renderer.render(&mut frame, &store).unwrap();

        // The segment midpoint is on the trail, the opposite corner is not.
        let on_line: &core::Vec3b = frame.at_2d(50, 50).unwrap();
        let off_line: &core::Vec3b = frame.at_2d(10, 10).unwrap();
        assert!(on_line[2] > 0, "red channel set on the trail");
        assert_eq!(*off_line, core::Vec3b::default());
    }

    #[test]
    fn test_empty_store_is_a_no_op() {
        let renderer = TrailRenderer::new(&TrailConfig::default());
        let store = TrackStore::new(5);

        let mut frame = blank_frame();
        renderer.render(&mut frame, &store).unwrap();
        assert_eq!(pixel_sum(&frame), 0.0);
    }
}
