//! Transition verbs using the overlap model.
//!
//! A transition of duration `d` between two butted clips slides the right
//! clip (and everything after it on the track) left by `d`, so the right
//! clip's head overlaps the left clip's tail. Removing it slides them back.

use splice_common::Frame;
use splice_timeline::{NewTransition, TimelineError, TimelineItem, Transition, TransitionPatch};
use tracing::debug;

use crate::engine::TimelineEngine;
use crate::error::EngineResult;

/// Longest transition two clips can carry.
fn capacity(left: &TimelineItem, right: &TimelineItem) -> Frame {
    left.duration_in_frames.min(right.duration_in_frames) - 1
}

impl TimelineEngine {
    pub fn add_transition(
        &mut self,
        left_id: &str,
        right_id: &str,
        params: NewTransition,
    ) -> EngineResult<String> {
        let left = self.ensure_item_editable(left_id)?.clone();
        let right = self.ensure_item_editable(right_id)?.clone();
        if left.track_id != right.track_id || right.from != left.end() {
            return Err(TimelineError::ClipsNotAdjacent {
                left_clip_id: left_id.to_string(),
                right_clip_id: right_id.to_string(),
            }
            .into());
        }
        if self.state.transitions.between(left_id, right_id).is_some() {
            return Err(TimelineError::TransitionExists {
                left_clip_id: left_id.to_string(),
                right_clip_id: right_id.to_string(),
            }
            .into());
        }

        let max = capacity(&left, &right);
        let duration = match params.duration_in_frames {
            Some(d) if d < 1 || d > max => {
                return Err(TimelineError::TransitionTooLong { requested: d, max }.into());
            }
            Some(d) => d,
            None => {
                if max < 1 {
                    let requested = params.transition_type.default_duration();
                    return Err(TimelineError::TransitionTooLong { requested, max }.into());
                }
                params.transition_type.default_duration().min(max)
            }
        };

        let downstream = self.items_from(&right.track_id, right.from, &[]);
        self.execute("Add transition", |e| {
            let out = e.state.items.shift_items(&downstream, -duration);
            e.apply(out);
            let id = e.state.transitions.add(
                left_id,
                right_id,
                &right.track_id,
                NewTransition {
                    duration_in_frames: Some(duration),
                    ..params
                },
            )?;
            debug!(transition_id = %id, left_id, right_id, duration, "Overlapped clips");
            Ok(id)
        })
    }

    /// Remove a transition and slide the right clip back out of the overlap.
    pub fn remove_transition(&mut self, id: &str) -> EngineResult<Transition> {
        let transition = self.require_transition(id)?.clone();
        let right = self.ensure_item_editable(&transition.right_clip_id)?.clone();
        let downstream = self.items_from(&right.track_id, right.from, &[]);
        self.execute("Remove transition", |e| {
            let removed = e.state.transitions.remove(id)?;
            let out = e.state.items.shift_items(&downstream, removed.duration_in_frames);
            e.apply(out);
            Ok(removed)
        })
    }

    /// Patch a transition. A duration change of `Δ` slides the right clip
    /// and its followers by `-Δ`.
    pub fn update_transition(&mut self, id: &str, patch: &TransitionPatch) -> EngineResult<bool> {
        let transition = self.require_transition(id)?.clone();
        let left = self.ensure_item_editable(&transition.left_clip_id)?.clone();
        let right = self.ensure_item_editable(&transition.right_clip_id)?.clone();

        let mut delta = 0;
        if let Some(requested) = patch.duration_in_frames {
            // The current overlap is part of both clips, so capacity is
            // measured on the clips as they stand.
            let max = capacity(&left, &right);
            if requested < 1 || requested > max {
                return Err(TimelineError::TransitionTooLong { requested, max }.into());
            }
            delta = requested - transition.duration_in_frames;
        }

        let downstream = self.items_from(&right.track_id, right.from, &[]);
        self.execute("Update transition", |e| {
            if delta != 0 {
                let out = e.state.items.shift_items(&downstream, -delta);
                e.apply(out);
            }
            Ok(e.state.transitions.update(id, patch)?)
        })
    }

    fn require_transition(&self, id: &str) -> EngineResult<&Transition> {
        Ok(self
            .state
            .transitions
            .get(id)
            .ok_or_else(|| TimelineError::TransitionNotFound {
                transition_id: id.to_string(),
            })?)
    }
}
