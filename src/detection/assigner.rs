// src/detection/assigner.rs

use super::{iou, Detection};

const MATCH_IOU_THRESHOLD: f32 = 0.3;

/// Carries detections' identities across frames by greedy IoU matching
/// against the previous frame's boxes. Matched detections keep their ID,
/// unmatched ones get a fresh monotonically increasing ID. IDs are never
/// reused once their object is gone.
pub struct TrackIdAssigner {
    previous: Vec<(i64, [f32; 4])>,
    next_id: i64,
}

impl TrackIdAssigner {
    pub fn new() -> Self {
        Self {
            previous: Vec::new(),
            next_id: 1,
        }
    }

    pub fn assign(&mut self, detections: &mut [Detection]) {
        let mut used = vec![false; self.previous.len()];

        // Higher-confidence detections pick their match first.
        let mut order: Vec<usize> = (0..detections.len()).collect();
        order.sort_by(|&a, &b| {
            detections[b]
                .confidence
                .partial_cmp(&detections[a].confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for i in order {
            let mut best: Option<(usize, f32)> = None;
            for (j, (_, prev_box)) in self.previous.iter().enumerate() {
                if used[j] {
                    continue;
                }
                let overlap = iou(&detections[i].bbox, prev_box);
                if overlap >= MATCH_IOU_THRESHOLD && best.map_or(true, |(_, b)| overlap > b) {
                    best = Some((j, overlap));
                }
            }

            detections[i].track_id = Some(match best {
                Some((j, _)) => {
                    used[j] = true;
                    self.previous[j].0
                }
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    id
                }
            });
        }

        self.previous = detections
            .iter()
            .filter_map(|det| det.track_id.map(|id| (id, det.bbox)))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(bbox: [f32; 4], confidence: f32) -> Detection {
        Detection {
            track_id: None,
            bbox,
            confidence,
            class_id: 0,
        }
    }

    #[test]
    fn test_ids_stay_stable_under_small_motion() {
        let mut assigner = TrackIdAssigner::new();

        let mut frame1 = vec![det([10.0, 10.0, 50.0, 50.0], 0.9)];
        assigner.assign(&mut frame1);
        let id = frame1[0].track_id.unwrap();

        let mut frame2 = vec![det([14.0, 12.0, 54.0, 52.0], 0.85)];
        assigner.assign(&mut frame2);
        assert_eq!(frame2[0].track_id, Some(id));
    }

    #[test]
    fn test_new_object_gets_fresh_id() {
        let mut assigner = TrackIdAssigner::new();

        let mut frame1 = vec![det([10.0, 10.0, 50.0, 50.0], 0.9)];
        assigner.assign(&mut frame1);

        let mut frame2 = vec![
            det([10.0, 10.0, 50.0, 50.0], 0.9),
            det([200.0, 200.0, 240.0, 260.0], 0.8),
        ];
        assigner.assign(&mut frame2);

        let id1 = frame2[0].track_id.unwrap();
        let id2 = frame2[1].track_id.unwrap();
        assert_eq!(id1, frame1[0].track_id.unwrap());
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_disappeared_id_is_not_reused() {
        let mut assigner = TrackIdAssigner::new();

        let mut frame1 = vec![det([10.0, 10.0, 50.0, 50.0], 0.9)];
        assigner.assign(&mut frame1);
        let old_id = frame1[0].track_id.unwrap();

        // Object gone, a different one appears elsewhere.
        let mut frame2 = vec![det([300.0, 300.0, 340.0, 340.0], 0.9)];
        assigner.assign(&mut frame2);
        assert_ne!(frame2[0].track_id.unwrap(), old_id);
    }

    #[test]
    fn test_empty_frame_resets_matches() {
        let mut assigner = TrackIdAssigner::new();

        let mut frame1 = vec![det([10.0, 10.0, 50.0, 50.0], 0.9)];
        assigner.assign(&mut frame1);

        let mut empty: Vec<Detection> = Vec::new();
        assigner.assign(&mut empty);

        // Same box as frame 1, but the lineage was broken.
        let mut frame3 = vec![det([10.0, 10.0, 50.0, 50.0], 0.9)];
        assigner.assign(&mut frame3);
        assert_ne!(frame3[0].track_id, frame1[0].track_id);
    }
}
