// src/track_store.rs

use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A single frame's detection record for one track. The ID comes from the
/// detector; `None` marks a detection with no persistent identity.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub track_id: Option<i64>,
    pub position: (f32, f32),
}

/// Per-track bounded position history, keyed by detector-assigned track ID.
///
/// The store mirrors the current frame exactly: after `update`, it contains
/// precisely the IDs observed in that frame's batch, each with a non-empty
/// history of at most `max_history` positions (oldest first). Trails do not
/// persist through a frame where the object is not re-detected.
pub struct TrackStore {
    tracks: BTreeMap<i64, VecDeque<(f32, f32)>>,
    max_history: usize,
}

impl TrackStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            tracks: BTreeMap::new(),
            max_history: max_history.max(1),
        }
    }

    /// Apply one frame's observation batch.
    ///
    /// An empty batch clears the store entirely ("nothing detected this
    /// frame"). Otherwise each observation appends its position to the
    /// track's history (creating the track on first sight), histories are
    /// trimmed to the last `max_history` entries, and every track whose ID
    /// is absent from the batch is removed regardless of accumulated
    /// history. Observations with a missing ID or a non-finite position are
    /// skipped. A duplicate ID within one batch overwrites the position it
    /// appended earlier in the same batch.
    pub fn update(&mut self, observations: &[Observation]) {
        if observations.is_empty() {
            self.tracks.clear();
            return;
        }

        let mut seen: BTreeSet<i64> = BTreeSet::new();

        for obs in observations {
            let Some(id) = obs.track_id else { continue };
            let (x, y) = obs.position;
            if !x.is_finite() || !y.is_finite() {
                continue;
            }

            let trail = self.tracks.entry(id).or_default();
            if seen.insert(id) {
                trail.push_back((x, y));
                while trail.len() > self.max_history {
                    trail.pop_front();
                }
            } else if let Some(last) = trail.back_mut() {
                // Same ID twice in one batch: last write wins.
                *last = (x, y);
            }
        }

        self.tracks.retain(|id, _| seen.contains(id));
    }

    /// Tracks in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &VecDeque<(f32, f32)>)> {
        self.tracks.iter().map(|(id, trail)| (*id, trail))
    }

    pub fn history(&self, track_id: i64) -> Option<&VecDeque<(f32, f32)>> {
        self.tracks.get(&track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
