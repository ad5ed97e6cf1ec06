//! Sub-composition registry.
//!
//! A sub-composition is an independent timeline document referenced by one
//! or more `composition` items on an ancestor timeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use splice_common::{Frame, MIN_DURATION};

use crate::error::{TimelineError, TimelineResult};
use crate::state::TimelineState;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubComposition {
    pub id: String,
    pub name: String,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub duration_in_frames: Frame,
    #[serde(flatten)]
    pub state: TimelineState,
}

impl SubComposition {
    /// Store edited contents, growing or shrinking the duration to fit.
    pub fn set_state(&mut self, state: TimelineState) {
        self.duration_in_frames = state.items.content_end().max(MIN_DURATION);
        self.state = state;
    }
}

/// All sub-compositions of a project.
#[derive(Clone, Debug, Default)]
pub struct CompositionStore {
    compositions: Arc<Vec<SubComposition>>,
}

impl PartialEq for CompositionStore {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.compositions, &other.compositions)
            || self.compositions == other.compositions
    }
}

impl CompositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(compositions: Vec<SubComposition>) -> Self {
        Self {
            compositions: Arc::new(compositions),
        }
    }

    pub fn all(&self) -> &[SubComposition] {
        &self.compositions
    }

    pub fn get(&self, id: &str) -> Option<&SubComposition> {
        self.compositions.iter().find(|c| c.id == id)
    }

    pub fn require(&self, id: &str) -> TimelineResult<&SubComposition> {
        self.get(id).ok_or_else(|| TimelineError::CompositionNotFound {
            composition_id: id.to_string(),
        })
    }

    pub fn insert(&mut self, composition: SubComposition) {
        let list = Arc::make_mut(&mut self.compositions);
        list.retain(|c| c.id != composition.id);
        list.push(composition);
    }

    pub fn remove(&mut self, id: &str) -> Option<SubComposition> {
        let idx = self.compositions.iter().position(|c| c.id == id)?;
        Some(Arc::make_mut(&mut self.compositions).remove(idx))
    }

    /// Write edited contents back into a record. No-op when unchanged.
    pub fn update_state(&mut self, id: &str, state: &TimelineState) -> TimelineResult<()> {
        let idx = self
            .compositions
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| TimelineError::CompositionNotFound {
                composition_id: id.to_string(),
            })?;
        if self.compositions[idx].state == *state {
            return Ok(());
        }
        Arc::make_mut(&mut self.compositions)[idx].set_state(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimelineItem;

    fn comp(id: &str) -> SubComposition {
        SubComposition {
            id: id.into(),
            name: "Pre-comp".into(),
            fps: 30.0,
            width: 1920,
            height: 1080,
            duration_in_frames: 30,
            state: TimelineState::new(),
        }
    }

    #[test]
    fn update_state_refreshes_duration() {
        let mut store = CompositionStore::new();
        store.insert(comp("c1"));

        let mut state = TimelineState::new();
        let _ = state.items.add_item(TimelineItem::text("x", "t", 10, 80, "hi"));
        store.update_state("c1", &state).unwrap();
        assert_eq!(store.get("c1").unwrap().duration_in_frames, 90);
        assert!(store.update_state("missing", &state).is_err());
    }

    #[test]
    fn unchanged_update_keeps_sharing() {
        let mut store = CompositionStore::new();
        store.insert(comp("c1"));
        let before = store.clone();
        let state = store.get("c1").unwrap().state.clone();
        store.update_state("c1", &state).unwrap();
        assert!(Arc::ptr_eq(&before.compositions, &store.compositions));
    }

    #[test]
    fn serialized_record_is_flat() {
        let json = serde_json::to_value(comp("c1")).unwrap();
        assert_eq!(json["durationInFrames"], 30);
        assert!(json["items"].as_array().unwrap().is_empty());
        let back: SubComposition = serde_json::from_value(json).unwrap();
        assert_eq!(back, comp("c1"));
    }
}
