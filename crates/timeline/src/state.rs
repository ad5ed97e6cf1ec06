//! The editable collections of one timeline context.

use serde::{Deserialize, Serialize};

use crate::items::ItemStore;
use crate::keyframe::{ItemKeyframes, KeyframeStore};
use crate::transition::{Transition, TransitionStore};
use crate::types::{TimelineItem, TimelineTrack};

/// Items, tracks, transitions and keyframes of the root timeline or of an
/// open sub-composition.
///
/// Cloning is a handful of reference-count bumps; equality short-circuits on
/// shared collections.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TimelineData", into = "TimelineData")]
pub struct TimelineState {
    pub items: ItemStore,
    pub transitions: TransitionStore,
    pub keyframes: KeyframeStore,
}

/// Plain serialized shape of a [`TimelineState`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimelineData {
    pub items: Vec<TimelineItem>,
    pub tracks: Vec<TimelineTrack>,
    pub transitions: Vec<Transition>,
    pub keyframes: Vec<ItemKeyframes>,
}

impl From<TimelineData> for TimelineState {
    fn from(data: TimelineData) -> Self {
        Self {
            items: ItemStore::from_parts(data.items, data.tracks),
            transitions: TransitionStore::from_vec(data.transitions),
            keyframes: KeyframeStore::from_vec(data.keyframes),
        }
    }
}

impl From<TimelineState> for TimelineData {
    fn from(state: TimelineState) -> Self {
        Self {
            items: state.items.items().to_vec(),
            tracks: state.items.tracks.to_vec(),
            transitions: state.transitions.all().to_vec(),
            keyframes: state.keyframes.all().to_vec(),
        }
    }
}

impl TimelineState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::{AnimatableProperty, Keyframe};

    #[test]
    fn json_shape_round_trips() {
        let mut state = TimelineState::new();
        state.items.add_track(TimelineTrack::new("t1", "V1", 0.0));
        let _ = state
            .items
            .add_item(TimelineItem::text("x", "t1", 0, 30, "hello"));
        let _ = state
            .keyframes
            .add_keyframe("x", &AnimatableProperty::Opacity, Keyframe::new(0, 1.0));

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["items"][0]["id"], "x");
        assert_eq!(json["tracks"][0]["id"], "t1");

        let restored: TimelineState = serde_json::from_value(json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn clone_shares_until_written() {
        let mut state = TimelineState::new();
        let _ = state
            .items
            .add_item(TimelineItem::text("x", "t1", 0, 30, "hello"));
        let snapshot = state.clone();
        assert_eq!(snapshot, state);
        let _ = state.items.shift_items(&["x".to_string()], 10);
        assert_ne!(snapshot, state);
    }
}
