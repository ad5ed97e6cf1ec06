//! Effect dispatcher.
//!
//! Item-store mutations report [`StoreEvent`]s. This module folds them into
//! the dependent collections: removed items take their transitions and
//! keyframes with them, splits and joins re-point transitions, trims and
//! retimes move keyframes. Geometry-dependent transition checks run once
//! per command over every item an event touched (see
//! [`repair_transitions`]).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use splice_timeline::{StoreEvent, TimelineState, Transition, TrimEdge};
use tracing::{debug, warn};

/// Why a transition was taken off the timeline by an unrelated edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakageReason {
    /// One of the two clips no longer exists.
    ClipMissing,
    ClipsOnDifferentTracks,
    /// The clips no longer overlap.
    NoOverlap,
    /// The overlap is longer than the shorter clip allows.
    ExceedsClipCapacity,
}

/// A transition removed by repair, kept for user notification.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionBreakage {
    pub transition: Transition,
    pub reason: BreakageReason,
}

/// Fold `events` into transitions and keyframes, collecting every item whose
/// geometry changed into `touched`.
pub fn apply_events(state: &mut TimelineState, events: &[StoreEvent], touched: &mut BTreeSet<String>) {
    for event in events {
        match event {
            StoreEvent::ItemsRemoved { item_ids } => {
                let transitions = state.transitions.remove_for_items(item_ids);
                let keyframes = state.keyframes.remove_for_items(item_ids);
                if !transitions.is_empty() || !keyframes.is_empty() {
                    debug!(
                        items = item_ids.len(),
                        transitions = transitions.len(),
                        keyframe_entries = keyframes.len(),
                        "Cascade-deleted dependents of removed items"
                    );
                }
                for id in item_ids {
                    touched.remove(id);
                }
            }
            StoreEvent::ItemTrimmed {
                item_id,
                edge,
                delta,
            } => {
                let Some(duration) = state.items.get(item_id).map(|i| i.duration_in_frames) else {
                    continue;
                };
                match edge {
                    TrimEdge::Start => state.keyframes.shift_for_item(item_id, -delta, duration),
                    TrimEdge::End => state.keyframes.truncate_for_item(item_id, duration),
                }
            }
            StoreEvent::ItemSplit {
                left_id,
                right_id,
                offset,
            } => {
                state.transitions.replace_left_clip(left_id, right_id);
                state.keyframes.split_for_item(left_id, right_id, *offset);
            }
            StoreEvent::ItemsJoined {
                survivor_id,
                absorbed_ids,
            } => {
                let joined: Vec<&String> =
                    std::iter::once(survivor_id).chain(absorbed_ids).collect();
                state.transitions.remove_where(|t| {
                    joined.contains(&&t.left_clip_id) && joined.contains(&&t.right_clip_id)
                });
                for absorbed in absorbed_ids {
                    state.transitions.replace_left_clip(absorbed, survivor_id);
                }
                state.transitions.remove_for_items(absorbed_ids);
                state.keyframes.remove_for_items(absorbed_ids);
                for id in absorbed_ids {
                    touched.remove(id);
                }
            }
            StoreEvent::ItemRetimed {
                item_id,
                old_duration,
                new_duration,
            } => {
                state
                    .keyframes
                    .scale_for_item(item_id, *old_duration, *new_duration);
            }
            StoreEvent::ItemsAdded { .. }
            | StoreEvent::ItemsMoved { .. }
            | StoreEvent::ItemsUpdated { .. } => {}
        }
        touched.extend(event.touched_items().into_iter().map(str::to_string));
    }
}

/// Re-validate every transition touching an item in `touched`.
///
/// A transition whose clips still overlap by `1..=min(durations) - 1` frames
/// is resized to the overlap. Anything else is removed and reported.
pub fn repair_transitions(state: &mut TimelineState, touched: &BTreeSet<String>) -> Vec<TransitionBreakage> {
    let candidates: BTreeSet<String> = state
        .transitions
        .all()
        .iter()
        .filter(|t| touched.contains(&t.left_clip_id) || touched.contains(&t.right_clip_id))
        .map(|t| t.id.clone())
        .collect();

    let mut breakages = Vec::new();
    for id in candidates {
        let Some(transition) = state.transitions.get(&id).cloned() else {
            continue;
        };
        let left = state.items.get(&transition.left_clip_id);
        let right = state.items.get(&transition.right_clip_id);
        let (left, right) = match (left, right) {
            (Some(l), Some(r)) => (l.clone(), r.clone()),
            _ => {
                breakages.push(break_transition(state, transition, BreakageReason::ClipMissing));
                continue;
            }
        };
        if left.track_id != right.track_id {
            breakages.push(break_transition(
                state,
                transition,
                BreakageReason::ClipsOnDifferentTracks,
            ));
            continue;
        }

        let overlap = left.end() - right.from;
        let capacity = left.duration_in_frames.min(right.duration_in_frames) - 1;
        if overlap < 1 {
            breakages.push(break_transition(state, transition, BreakageReason::NoOverlap));
            continue;
        }
        if overlap > capacity {
            breakages.push(break_transition(
                state,
                transition,
                BreakageReason::ExceedsClipCapacity,
            ));
            continue;
        }

        if transition.duration_in_frames != overlap {
            // Ids come from the store, so this cannot fail.
            let _ = state.transitions.set_duration(&id, overlap);
            debug!(
                transition_id = %id,
                from = transition.duration_in_frames,
                to = overlap,
                "Resized transition to overlap"
            );
        }
        if transition.track_id != left.track_id {
            state.transitions.set_track_for_clip(&left.id, &left.track_id);
        }
    }
    breakages
}

fn break_transition(
    state: &mut TimelineState,
    transition: Transition,
    reason: BreakageReason,
) -> TransitionBreakage {
    let _ = state.transitions.remove(&transition.id);
    warn!(
        transition_id = %transition.id,
        left_clip_id = %transition.left_clip_id,
        right_clip_id = %transition.right_clip_id,
        ?reason,
        "Transition broken by edit"
    );
    TransitionBreakage { transition, reason }
}
