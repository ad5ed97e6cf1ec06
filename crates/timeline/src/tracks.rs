//! Track list operations on [`ItemStore`].
//!
//! Tracks are ordered by their fractional `order`; lower values stack on top.
//! Removing a track never touches its items.

use std::sync::Arc;

use tracing::debug;

use crate::error::{TimelineError, TimelineResult};
use crate::generate_id;
use crate::items::ItemStore;
use crate::types::{TimelineTrack, TrackPatch};

impl ItemStore {
    /// Tracks in stacking order, top first.
    pub fn tracks(&self) -> Vec<&TimelineTrack> {
        let mut tracks: Vec<&TimelineTrack> = self.tracks.iter().collect();
        tracks.sort_by(|a, b| a.order.total_cmp(&b.order));
        tracks
    }

    pub fn get_track(&self, id: &str) -> Option<&TimelineTrack> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn is_track_locked(&self, id: &str) -> bool {
        self.get_track(id).is_some_and(|t| t.locked)
    }

    /// Order value one step below the bottom-most track.
    pub fn next_track_order(&self) -> f64 {
        self.tracks
            .iter()
            .map(|t| t.order)
            .fold(None, |acc: Option<f64>, o| Some(acc.map_or(o, |a| a.max(o))))
            .map_or(0.0, |max| max.floor() + 1.0)
    }

    /// Append a track. An empty id is replaced with a generated one.
    pub fn add_track(&mut self, mut track: TimelineTrack) -> String {
        if track.id.is_empty() {
            track.id = generate_id();
        }
        let id = track.id.clone();
        Arc::make_mut(&mut self.tracks).push(track);
        id
    }

    /// Create a track stacked directly below `above` (or at the top when
    /// `None`), using a fractional order between its neighbors.
    pub fn insert_track_below(
        &mut self,
        name: impl Into<String>,
        above: Option<&str>,
    ) -> TimelineResult<String> {
        let sorted = self.tracks();
        let (upper, lower) = match above {
            Some(id) => {
                let pos = sorted
                    .iter()
                    .position(|t| t.id == id)
                    .ok_or_else(|| TimelineError::track(id))?;
                (Some(sorted[pos].order), sorted.get(pos + 1).map(|t| t.order))
            }
            None => (None, sorted.first().map(|t| t.order)),
        };
        let order = match (upper, lower) {
            (Some(u), Some(l)) => (u + l) / 2.0,
            (Some(u), None) => u + 1.0,
            (None, Some(l)) => l - 1.0,
            (None, None) => 0.0,
        };
        let id = self.add_track(TimelineTrack::new("", name, order));
        debug!(track_id = %id, order, "Inserted track");
        Ok(id)
    }

    pub fn update_track(&mut self, id: &str, patch: &TrackPatch) -> TimelineResult<bool> {
        let idx = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TimelineError::track(id))?;
        let mut next = self.tracks[idx].clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(order) = patch.order {
            if order.is_finite() {
                next.order = order;
            }
        }
        if let Some(locked) = patch.locked {
            next.locked = locked;
        }
        if let Some(visible) = patch.visible {
            next.visible = visible;
        }
        if let Some(muted) = patch.muted {
            next.muted = muted;
        }
        if let Some(solo) = patch.solo {
            next.solo = solo;
        }
        if let Some(parent) = &patch.parent_track_id {
            next.parent_track_id = parent.clone();
        }
        if next == self.tracks[idx] {
            return Ok(false);
        }
        Arc::make_mut(&mut self.tracks)[idx] = next;
        Ok(true)
    }

    /// Remove a track. Items on it are left in place.
    pub fn remove_track(&mut self, id: &str) -> TimelineResult<TimelineTrack> {
        let idx = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TimelineError::track(id))?;
        let track = Arc::make_mut(&mut self.tracks).remove(idx);
        debug!(track_id = id, "Removed track");
        Ok(track)
    }

    /// Replace the whole track list.
    pub fn set_tracks(&mut self, tracks: Vec<TimelineTrack>) {
        self.tracks = Arc::new(tracks);
    }
}
