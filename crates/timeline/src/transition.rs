//! Overlap transitions between adjacent clips on one track.
//!
//! The store is a plain list: adding, updating or removing a record never
//! repositions clips. Overlap geometry is the engine's job.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use splice_common::{normalize_duration, Frame};
use tracing::debug;

use crate::error::{TimelineError, TimelineResult};
use crate::generate_id;

/// Kinds of transitions between clips.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionType {
    /// Cross-dissolve between outgoing and incoming clips.
    Crossfade,
    Wipe,
    Slide,
    Flip,
    ClockWipe,
    Iris,
}

impl TransitionType {
    /// Duration used when a caller adds a transition without one.
    pub fn default_duration(self) -> Frame {
        match self {
            Self::Crossfade => 20,
            Self::Wipe | Self::Slide | Self::ClockWipe | Self::Iris => 30,
            Self::Flip => 40,
        }
    }
}

/// Progress curve of a transition.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionTiming {
    #[default]
    Linear,
    Spring,
    EaseIn,
    EaseOut,
    EaseInOut,
}

/// Direction for directional transitions (wipe, slide, flip).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionDirection {
    FromLeft,
    FromRight,
    FromTop,
    FromBottom,
}

/// A transition licensing an overlap between `left_clip_id`'s tail and
/// `right_clip_id`'s head.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub id: String,
    pub left_clip_id: String,
    pub right_clip_id: String,
    pub track_id: String,
    #[serde(rename = "type")]
    pub transition_type: TransitionType,
    pub duration_in_frames: Frame,
    /// Renderer-specific presentation name.
    pub presentation: String,
    #[serde(default)]
    pub timing: TransitionTiming,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<TransitionDirection>,
    /// Cubic-bezier control points `[x1, y1, x2, y2]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bezier_points: Option<[f64; 4]>,
}

impl Transition {
    pub fn involves(&self, item_id: &str) -> bool {
        self.left_clip_id == item_id || self.right_clip_id == item_id
    }
}

/// Parameters for a new transition; `duration_in_frames = None` takes the
/// per-type default.
#[derive(Clone, Debug, PartialEq)]
pub struct NewTransition {
    pub transition_type: TransitionType,
    pub duration_in_frames: Option<Frame>,
    pub presentation: Option<String>,
    pub timing: TransitionTiming,
    pub direction: Option<TransitionDirection>,
    pub bezier_points: Option<[f64; 4]>,
}

impl Default for NewTransition {
    fn default() -> Self {
        Self::of(TransitionType::Crossfade)
    }
}

impl NewTransition {
    pub fn of(transition_type: TransitionType) -> Self {
        Self {
            transition_type,
            duration_in_frames: None,
            presentation: None,
            timing: TransitionTiming::default(),
            direction: None,
            bezier_points: None,
        }
    }

    pub fn with_duration(mut self, duration: Frame) -> Self {
        self.duration_in_frames = Some(duration);
        self
    }
}

/// Partial transition update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransitionPatch {
    pub transition_type: Option<TransitionType>,
    pub duration_in_frames: Option<Frame>,
    pub presentation: Option<String>,
    pub timing: Option<TransitionTiming>,
    pub direction: Option<Option<TransitionDirection>>,
    pub bezier_points: Option<Option<[f64; 4]>>,
}

/// The transition list.
#[derive(Clone, Debug, Default)]
pub struct TransitionStore {
    transitions: Arc<Vec<Transition>>,
}

impl PartialEq for TransitionStore {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.transitions, &other.transitions) || self.transitions == other.transitions
    }
}

impl TransitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(transitions: Vec<Transition>) -> Self {
        Self {
            transitions: Arc::new(transitions),
        }
    }

    pub fn all(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.id == id)
    }

    pub fn between(&self, left_clip_id: &str, right_clip_id: &str) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| t.left_clip_id == left_clip_id && t.right_clip_id == right_clip_id)
    }

    fn list_mut(&mut self) -> &mut Vec<Transition> {
        Arc::make_mut(&mut self.transitions)
    }

    /// Record a transition. Rejects a second transition on the same pair.
    pub fn add(
        &mut self,
        left_clip_id: &str,
        right_clip_id: &str,
        track_id: &str,
        params: NewTransition,
    ) -> TimelineResult<String> {
        if self.between(left_clip_id, right_clip_id).is_some() {
            return Err(TimelineError::TransitionExists {
                left_clip_id: left_clip_id.to_string(),
                right_clip_id: right_clip_id.to_string(),
            });
        }
        let duration = normalize_duration(
            params
                .duration_in_frames
                .unwrap_or_else(|| params.transition_type.default_duration()),
        );
        let transition = Transition {
            id: generate_id(),
            left_clip_id: left_clip_id.to_string(),
            right_clip_id: right_clip_id.to_string(),
            track_id: track_id.to_string(),
            transition_type: params.transition_type,
            duration_in_frames: duration,
            presentation: params.presentation.unwrap_or_else(|| "default".to_string()),
            timing: params.timing,
            direction: params.direction,
            bezier_points: params.bezier_points,
        };
        let id = transition.id.clone();
        debug!(transition_id = %id, left_clip_id, right_clip_id, duration, "Added transition");
        self.list_mut().push(transition);
        Ok(id)
    }

    /// Insert a fully-formed record (used when migrating between timelines).
    pub fn insert(&mut self, transition: Transition) {
        self.list_mut().push(transition);
    }

    pub fn update(&mut self, id: &str, patch: &TransitionPatch) -> TimelineResult<bool> {
        let idx = self.index_of(id)?;
        let mut next = self.transitions[idx].clone();
        if let Some(t) = patch.transition_type {
            next.transition_type = t;
        }
        if let Some(d) = patch.duration_in_frames {
            next.duration_in_frames = normalize_duration(d);
        }
        if let Some(p) = &patch.presentation {
            next.presentation = p.clone();
        }
        if let Some(t) = patch.timing {
            next.timing = t;
        }
        if let Some(d) = patch.direction {
            next.direction = d;
        }
        if let Some(b) = patch.bezier_points {
            next.bezier_points = b;
        }
        if next == self.transitions[idx] {
            return Ok(false);
        }
        self.list_mut()[idx] = next;
        Ok(true)
    }

    pub fn set_duration(&mut self, id: &str, duration: Frame) -> TimelineResult<()> {
        let idx = self.index_of(id)?;
        let duration = normalize_duration(duration);
        if self.transitions[idx].duration_in_frames != duration {
            self.list_mut()[idx].duration_in_frames = duration;
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> TimelineResult<Transition> {
        let idx = self.index_of(id)?;
        Ok(self.list_mut().remove(idx))
    }

    /// Remove every transition matching `pred`, returning them.
    pub fn remove_where(&mut self, pred: impl Fn(&Transition) -> bool) -> Vec<Transition> {
        if !self.transitions.iter().any(&pred) {
            return Vec::new();
        }
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.transitions.iter().cloned().partition(|t| pred(t));
        self.transitions = Arc::new(kept);
        removed
    }

    /// Cascade helper: drop transitions referencing any of `item_ids`.
    pub fn remove_for_items(&mut self, item_ids: &[String]) -> Vec<Transition> {
        self.remove_where(|t| {
            item_ids.contains(&t.left_clip_id) || item_ids.contains(&t.right_clip_id)
        })
    }

    /// Point transitions whose left clip is `old` at `new` instead.
    pub fn replace_left_clip(&mut self, old: &str, new: &str) {
        if !self.transitions.iter().any(|t| t.left_clip_id == old) {
            return;
        }
        for t in self.list_mut().iter_mut() {
            if t.left_clip_id == old {
                t.left_clip_id = new.to_string();
            }
        }
    }

    /// Keep the track id in step with a clip that changed tracks.
    pub fn set_track_for_clip(&mut self, item_id: &str, track_id: &str) {
        if !self
            .transitions
            .iter()
            .any(|t| t.involves(item_id) && t.track_id != track_id)
        {
            return;
        }
        for t in self.list_mut().iter_mut() {
            if t.involves(item_id) {
                t.track_id = track_id.to_string();
            }
        }
    }

    fn index_of(&self, id: &str) -> TimelineResult<usize> {
        self.transitions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TimelineError::TransitionNotFound {
                transition_id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_durations_per_type() {
        assert_eq!(TransitionType::Crossfade.default_duration(), 20);
        assert_eq!(TransitionType::Wipe.default_duration(), 30);
        assert_eq!(TransitionType::Flip.default_duration(), 40);
    }

    #[test]
    fn add_uses_default_and_rejects_duplicate_pair() {
        let mut store = TransitionStore::new();
        let id = store
            .add("a", "b", "t1", NewTransition::of(TransitionType::Iris))
            .unwrap();
        assert_eq!(store.get(&id).unwrap().duration_in_frames, 30);

        let err = store.add("a", "b", "t1", NewTransition::default()).unwrap_err();
        assert!(matches!(err, TimelineError::TransitionExists { .. }));
        // The reverse pair is a different ordered pair.
        assert!(store.add("b", "a", "t1", NewTransition::default()).is_ok());
    }

    #[test]
    fn update_and_remove() {
        let mut store = TransitionStore::new();
        let id = store
            .add("a", "b", "t1", NewTransition::default().with_duration(12))
            .unwrap();
        let patch = TransitionPatch {
            duration_in_frames: Some(0),
            timing: Some(TransitionTiming::EaseIn),
            ..Default::default()
        };
        assert!(store.update(&id, &patch).unwrap());
        assert_eq!(store.get(&id).unwrap().duration_in_frames, 1);
        assert!(!store.update(&id, &patch).unwrap());

        store.remove(&id).unwrap();
        assert!(store.is_empty());
        assert!(store.remove(&id).is_err());
    }

    #[test]
    fn cascade_and_retarget() {
        let mut store = TransitionStore::new();
        store.add("a", "b", "t1", NewTransition::default()).unwrap();
        store.add("b", "c", "t1", NewTransition::default()).unwrap();

        store.replace_left_clip("b", "b2");
        assert!(store.between("b2", "c").is_some());
        assert!(store.between("a", "b").is_some());

        let removed = store.remove_for_items(&["a".to_string()]);
        assert_eq!(removed.len(), 1);
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn serializes_type_field() {
        let mut store = TransitionStore::new();
        let id = store.add("a", "b", "t1", NewTransition::default()).unwrap();
        let json = serde_json::to_value(store.get(&id).unwrap()).unwrap();
        assert_eq!(json["type"], "crossfade");
        assert_eq!(json["leftClipId"], "a");
        assert!(json.get("direction").is_none());
    }
}
