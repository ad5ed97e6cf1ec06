//! Track verbs.

use splice_timeline::{generate_id, TimelineError, TimelineTrack, TrackPatch};

use crate::engine::TimelineEngine;
use crate::error::EngineResult;

impl TimelineEngine {
    /// Append a track below all existing ones.
    pub fn add_track(&mut self, name: &str) -> EngineResult<String> {
        self.execute("Add track", |e| {
            let order = e.state.items.next_track_order();
            Ok(e.state.items.add_track(TimelineTrack::new(generate_id(), name, order)))
        })
    }

    /// Insert a track directly below `above`, or at the top for `None`.
    pub fn insert_track_below(&mut self, name: &str, above: Option<&str>) -> EngineResult<String> {
        self.execute("Insert track", |e| Ok(e.state.items.insert_track_below(name, above)?))
    }

    /// Update flags or name. Allowed on locked tracks so they can be unlocked.
    pub fn update_track(&mut self, id: &str, patch: &TrackPatch) -> EngineResult<bool> {
        self.execute("Update track", |e| Ok(e.state.items.update_track(id, patch)?))
    }

    /// Remove a track record only. Its items are left in place.
    pub fn remove_track(&mut self, id: &str) -> EngineResult<TimelineTrack> {
        self.execute("Remove track", |e| Ok(e.state.items.remove_track(id)?))
    }

    /// Remove tracks together with their items. Returns the number of items
    /// deleted.
    pub fn delete_tracks(&mut self, ids: &[String]) -> EngineResult<usize> {
        for id in ids {
            let track = self
                .state
                .items
                .get_track(id)
                .ok_or_else(|| TimelineError::TrackNotFound { track_id: id.clone() })?;
            if track.locked {
                return Err(TimelineError::TrackLocked { track_id: id.clone() }.into());
            }
        }
        let doomed: Vec<String> = self
            .state
            .items
            .items()
            .iter()
            .filter(|i| ids.contains(&i.track_id))
            .map(|i| i.id.clone())
            .collect();

        self.execute("Delete tracks", |e| {
            let out = e.state.items.remove_items(&doomed);
            let removed = e.apply(out);
            for id in ids {
                e.state.items.remove_track(id)?;
            }
            Ok(removed.len())
        })
    }
}
