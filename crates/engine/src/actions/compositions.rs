//! Pre-compositions and sub-composition navigation.
//!
//! Each open timeline keeps its own undo history. Entering parks the parent
//! history; leaving restores it and records the sub-composition's edits as
//! one "Edit composition" command there.

use std::collections::{BTreeMap, HashSet};

use splice_common::{spans_overlap, Frame};
use splice_timeline::{
    find_reference, frame_into, frame_out_of, generate_id, ItemStore, KeyframeStore,
    SubComposition, TimelineError, TimelineItem, TimelineState, TimelineTrack, Transition,
    TransitionStore,
};
use tracing::{debug, info};

use crate::dispatch::{BreakageReason, TransitionBreakage};
use crate::engine::TimelineEngine;
use crate::error::EngineResult;
use crate::history::HistoryManager;

/// Ids produced by [`TimelineEngine::create_precomp`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedPrecomp {
    pub composition_id: String,
    /// The composition item placed on the host timeline.
    pub item_id: String,
}

/// Where a sub-composition track lands when dissolving.
enum TrackTarget {
    Existing(String),
    New(String),
}

impl TimelineEngine {
    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Open a sub-composition for editing.
    pub fn enter_composition(&mut self, composition_id: &str) -> EngineResult<()> {
        self.navigator.check_enter(composition_id)?;
        let composition = self.compositions.require(composition_id)?.clone();

        self.playback.pause();
        self.end_batch();
        let parent_frame = self.playback.current_frame();
        let local_frame = find_reference(&self.state, composition_id)
            .map(|item| frame_into(item, parent_frame))
            .unwrap_or(0);

        self.navigator
            .enter(composition_id, &composition.name, self.state.clone(), parent_frame)?;
        self.state = composition.state;
        let parent_history = std::mem::replace(
            &mut self.history,
            HistoryManager::new(self.config.max_history_entries),
        );
        self.history_stash.push(parent_history);
        self.selection.clear();
        self.playback.set_current_frame(local_frame);
        info!(composition_id, local_frame, "Opened composition");
        Ok(())
    }

    /// Return to the parent timeline. Returns false at the root.
    pub fn exit_composition(&mut self) -> EngineResult<bool> {
        if self.navigator.is_root() {
            return Ok(false);
        }
        self.playback.pause();
        self.end_batch();
        let local_frame = self.playback.current_frame();
        let working = self.state.clone();
        let Some(exited) = self.navigator.exit() else {
            return Ok(false);
        };

        self.state = exited.parent.state;
        self.history = self
            .history_stash
            .pop()
            .unwrap_or_else(|| HistoryManager::new(self.config.max_history_entries));
        self.selection.clear();
        let parent_frame = find_reference(&self.state, &exited.composition_id)
            .map(|item| frame_out_of(item, local_frame))
            .unwrap_or(exited.parent.current_frame);
        self.playback.set_current_frame(parent_frame);

        let composition_id = exited.composition_id;
        self.execute("Edit composition", |e| {
            Ok(e.compositions.update_state(&composition_id, &working)?)
        })?;
        info!(composition_id = %composition_id, parent_frame, "Closed composition");
        Ok(true)
    }

    /// Jump to a breadcrumb; index 0 is the root.
    pub fn navigate_to(&mut self, index: usize) -> EngineResult<()> {
        while self.navigator.depth() > index + 1 {
            if !self.exit_composition()? {
                break;
            }
        }
        Ok(())
    }

    pub fn reset_to_root(&mut self) -> EngineResult<()> {
        self.navigate_to(0)
    }

    /// Delete a composition record nothing refers to any more.
    pub fn delete_composition(&mut self, composition_id: &str) -> EngineResult<SubComposition> {
        self.compositions.require(composition_id)?;
        if self.navigator.is_open(composition_id) || self.composition_in_use(composition_id) {
            return Err(TimelineError::invalid(format!(
                "composition {composition_id} is still in use"
            ))
            .into());
        }
        self.execute("Delete composition", |e| {
            e.compositions
                .remove(composition_id)
                .ok_or_else(|| {
                    TimelineError::CompositionNotFound {
                        composition_id: composition_id.to_string(),
                    }
                    .into()
                })
        })
    }

    /// Whether any composition item on any timeline references the id.
    fn composition_in_use(&self, composition_id: &str) -> bool {
        let references = |state: &TimelineState| {
            state
                .items
                .items()
                .iter()
                .any(|i| i.composition_id() == Some(composition_id))
        };
        references(&self.state)
            || self.navigator.stashed().iter().any(|s| references(&s.state))
            || self
                .compositions
                .all()
                .iter()
                .filter(|c| c.id != composition_id && !self.navigator.is_open(&c.id))
                .any(|c| references(&c.state))
    }

    // ------------------------------------------------------------------
    // Create / dissolve
    // ------------------------------------------------------------------

    /// Move the given items into a new sub-composition and put one
    /// composition item spanning them on the bottom-most source track.
    pub fn create_precomp(&mut self, item_ids: &[String], name: &str) -> EngineResult<CreatedPrecomp> {
        if item_ids.is_empty() {
            return Err(TimelineError::invalid("no items to pre-compose").into());
        }
        if !self.navigator.can_nest() {
            return Err(TimelineError::NestingTooDeep {
                max_depth: self.navigator.max_depth(),
                composition_id: name.to_string(),
            }
            .into());
        }
        self.ensure_items_editable(item_ids)?;

        let selected: Vec<TimelineItem> = item_ids
            .iter()
            .filter_map(|id| self.state.items.get(id).cloned())
            .collect();
        if selected.iter().any(|i| i.composition_id().is_some())
            && self.navigator.depth() + 2 > self.navigator.max_depth()
        {
            return Err(TimelineError::invalid("composition items cannot be nested that deep").into());
        }
        let start = selected.iter().map(|i| i.from).min().unwrap_or(0);
        let end = selected.iter().map(TimelineItem::end).max().unwrap_or(start);

        // Source tracks top to bottom; the new tracks mirror that order.
        let source_tracks: Vec<TimelineTrack> = self
            .state
            .items
            .tracks()
            .into_iter()
            .filter(|t| selected.iter().any(|i| i.track_id == t.id))
            .cloned()
            .collect();
        let Some(host_track) = source_tracks.last().map(|t| t.id.clone()) else {
            return Err(TimelineError::invalid("selected items have no track").into());
        };
        let track_map: BTreeMap<String, String> = source_tracks
            .iter()
            .map(|t| (t.id.clone(), generate_id()))
            .collect();
        let inner_tracks: Vec<TimelineTrack> = source_tracks
            .iter()
            .enumerate()
            .map(|(order, t)| {
                let mut track = TimelineTrack::new(track_map[&t.id].clone(), t.name.clone(), order as f64);
                track.visible = t.visible;
                track.muted = t.muted;
                track
            })
            .collect();

        let collides = self
            .state
            .items
            .items_on_track(&host_track)
            .into_iter()
            .any(|o| !item_ids.contains(&o.id) && spans_overlap(o.from, o.duration_in_frames, start, end - start));
        if collides {
            return Err(TimelineError::invalid(format!(
                "track {host_track} is occupied between {start} and {end}"
            ))
            .into());
        }

        let inner_items: Vec<TimelineItem> = selected
            .iter()
            .map(|i| {
                let mut item = i.clone();
                item.from -= start;
                item.track_id = track_map[&i.track_id].clone();
                item
            })
            .collect();
        let (inner_transitions, severed): (Vec<Transition>, Vec<Transition>) = self
            .state
            .transitions
            .all()
            .iter()
            .filter(|t| item_ids.contains(&t.left_clip_id) || item_ids.contains(&t.right_clip_id))
            .cloned()
            .partition(|t| item_ids.contains(&t.left_clip_id) && item_ids.contains(&t.right_clip_id));
        let inner_transitions = inner_transitions
            .into_iter()
            .map(|mut t| {
                if let Some(track) = track_map.get(&t.track_id) {
                    t.track_id = track.clone();
                }
                t
            })
            .collect();
        let inner_keyframes = self
            .state
            .keyframes
            .all()
            .iter()
            .filter(|k| item_ids.contains(&k.item_id))
            .cloned()
            .collect();

        let composition = SubComposition {
            id: generate_id(),
            name: name.to_string(),
            fps: self.fps(),
            width: self.project.settings.width,
            height: self.project.settings.height,
            duration_in_frames: end - start,
            state: TimelineState {
                items: ItemStore::from_parts(inner_items, inner_tracks),
                transitions: TransitionStore::from_vec(inner_transitions),
                keyframes: KeyframeStore::from_vec(inner_keyframes),
            },
        };
        let composition_id = composition.id.clone();
        let reference = TimelineItem::composition(generate_id(), host_track, start, end - start, &composition_id)
            .with_label(name);

        let created = self.execute("Create pre-composition", |e| {
            let out = e.state.items.remove_items(item_ids);
            e.apply(out);
            for transition in severed {
                e.pending_breakages.push(TransitionBreakage {
                    transition,
                    reason: BreakageReason::ClipMissing,
                });
            }
            e.compositions.insert(composition);
            let out = e.state.items.add_item(reference);
            let item_id = e.apply(out);
            Ok(CreatedPrecomp {
                composition_id,
                item_id,
            })
        })?;
        debug!(
            composition_id = %created.composition_id,
            items = item_ids.len(),
            "Created pre-composition"
        );
        self.select(std::slice::from_ref(&created.item_id));
        Ok(created)
    }

    /// Replace a composition item with the contents of its composition.
    ///
    /// Restored items get fresh ids. Each inner track reuses the item's own
    /// track or a free track above it, otherwise a new track is inserted.
    /// The composition record is deleted once nothing references it.
    pub fn dissolve_precomp(&mut self, item_id: &str) -> EngineResult<Vec<String>> {
        let item = self.ensure_item_editable(item_id)?.clone();
        let Some(composition_id) = item.composition_id().map(str::to_string) else {
            return Err(TimelineError::invalid(format!("item {item_id} is not a composition")).into());
        };
        let composition = self.compositions.require(&composition_id)?.clone();
        let inner = &composition.state;

        let host_tracks: Vec<String> = self
            .state
            .items
            .tracks()
            .into_iter()
            .map(|t| t.id.clone())
            .collect();
        let own = host_tracks
            .iter()
            .position(|t| *t == item.track_id)
            .ok_or_else(|| TimelineError::TrackNotFound {
                track_id: item.track_id.clone(),
            })?;
        // Own track first, then upwards.
        let candidates: Vec<String> = host_tracks[..=own].iter().rev().cloned().collect();
        let above_own = own.checked_sub(1).map(|i| host_tracks[i].clone());

        // Bottom to top, so new tracks stack in the inner order.
        let mut used = HashSet::new();
        let mut targets: Vec<(String, TrackTarget)> = Vec::new();
        for inner_track in inner.items.tracks().into_iter().rev() {
            let spans: Vec<(Frame, Frame)> = inner
                .items
                .items_on_track(&inner_track.id)
                .into_iter()
                .map(|i| (item.from + i.from, i.duration_in_frames))
                .collect();
            let free = candidates.iter().find(|host| {
                !used.contains(host.as_str())
                    && !self.state.items.is_track_locked(host)
                    && self
                        .state
                        .items
                        .items_on_track(host)
                        .into_iter()
                        .filter(|o| o.id != item.id)
                        .all(|o| {
                            spans
                                .iter()
                                .all(|&(from, dur)| !spans_overlap(o.from, o.duration_in_frames, from, dur))
                        })
            });
            let target = match free {
                Some(host) => {
                    used.insert(host.clone());
                    TrackTarget::Existing(host.clone())
                }
                None => TrackTarget::New(inner_track.name.clone()),
            };
            targets.push((inner_track.id.clone(), target));
        }

        let id_map: BTreeMap<String, String> = inner
            .items
            .items()
            .iter()
            .map(|i| (i.id.clone(), generate_id()))
            .collect();

        let restored = self.execute("Dissolve pre-composition", |e| {
            let out = e.state.items.remove_items(&[item.id.clone()]);
            e.apply(out);

            let mut track_map = BTreeMap::new();
            for (inner_id, target) in targets {
                let host = match target {
                    TrackTarget::Existing(id) => id,
                    TrackTarget::New(name) => e.state.items.insert_track_below(name, above_own.as_deref())?,
                };
                track_map.insert(inner_id, host);
            }

            let items: Vec<TimelineItem> = inner
                .items
                .items()
                .iter()
                .filter_map(|i| {
                    let mut restored = i.clone();
                    restored.id = id_map.get(&i.id)?.clone();
                    restored.from += item.from;
                    restored.track_id = track_map.get(&i.track_id)?.clone();
                    Some(restored)
                })
                .collect();
            let out = e.state.items.add_items(items);
            let restored = e.apply(out);

            for transition in inner.transitions.all() {
                let (Some(left), Some(right)) = (
                    id_map.get(&transition.left_clip_id),
                    id_map.get(&transition.right_clip_id),
                ) else {
                    continue;
                };
                let Some(track) = e
                    .state
                    .items
                    .get(right)
                    .map(|i| i.track_id.clone())
                else {
                    continue;
                };
                e.state.transitions.insert(Transition {
                    id: generate_id(),
                    left_clip_id: left.clone(),
                    right_clip_id: right.clone(),
                    track_id: track,
                    ..transition.clone()
                });
            }
            for entry in inner.keyframes.all() {
                if let Some(new_id) = id_map.get(&entry.item_id) {
                    e.state.keyframes.insert(entry.duplicate_for(new_id));
                }
            }

            if !e.composition_in_use(&composition_id) {
                e.compositions.remove(&composition_id);
            }
            Ok(restored)
        })?;
        debug!(composition_id = %composition_id, items = restored.len(), "Dissolved pre-composition");
        self.select(&restored);
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::PlaybackState;
    use splice_timeline::{AnimatableProperty, Keyframe, NewTransition, TrackPatch};

    fn engine() -> TimelineEngine {
        let mut engine = TimelineEngine::default();
        engine.state.items.add_track(TimelineTrack::new("t1", "V1", 0.0));
        engine.state.items.add_track(TimelineTrack::new("t2", "V2", 1.0));
        for (id, track, from) in [("a", "t1", 30), ("b", "t2", 40), ("c", "t2", 100), ("z", "t1", 200)] {
            let _ = engine
                .state
                .items
                .add_item(TimelineItem::text(id, track, from, 60, id));
        }
        engine
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn create_moves_items_into_composition() {
        let mut engine = engine();
        let _ = engine
            .state
            .keyframes
            .add_keyframe("b", &AnimatableProperty::Opacity, Keyframe::new(10, 0.2));
        let created = engine.create_precomp(&ids(&["a", "b", "c"]), "Group").unwrap();

        let reference = engine.item(&created.item_id).unwrap();
        assert_eq!((reference.from, reference.duration_in_frames), (30, 130));
        assert_eq!(reference.track_id, "t2");
        assert!(engine.item("a").is_none());
        assert!(engine.item("z").is_some());
        assert_eq!(engine.selection().selected_item_ids(), vec![created.item_id.clone()]);

        let comp = engine.compositions().get(&created.composition_id).unwrap();
        assert_eq!(comp.duration_in_frames, 130);
        let inner_a = comp.state.items.get("a").unwrap();
        assert_eq!(inner_a.from, 0);
        let tracks = comp.state.items.tracks();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].name, "V1");
        assert_eq!(inner_a.track_id, tracks[0].id);
        assert!(comp.state.keyframes.get("b").is_some());
        assert!(engine.state().keyframes.get("b").is_none());

        assert!(engine.undo());
        assert!(engine.compositions().all().is_empty());
        assert!(engine.item("a").is_some());
    }

    #[test]
    fn create_rejects_collision_on_host_track() {
        let mut engine = engine();
        // b sits on t2 inside the 30..260 span.
        let _ = engine
            .state
            .items
            .add_item(TimelineItem::text("d", "t2", 200, 60, "d"));
        let err = engine.create_precomp(&ids(&["a", "d"]), "Group").unwrap_err();
        assert!(err.is_rejection());
        assert!(engine.compositions().all().is_empty());
    }

    #[test]
    fn nesting_is_capped() {
        let mut engine = engine();
        let created = engine.create_precomp(&ids(&["a"]), "Inner").unwrap();
        engine.enter_composition(&created.composition_id).unwrap();
        assert!(engine.create_precomp(&ids(&["a"]), "Deeper").is_err());
    }

    #[test]
    fn dissolve_restores_positions_with_new_ids() {
        let mut engine = engine();
        let created = engine.create_precomp(&ids(&["a", "b", "c"]), "Group").unwrap();
        let restored = engine.dissolve_precomp(&created.item_id).unwrap();
        assert_eq!(restored.len(), 3);
        assert!(engine.compositions().all().is_empty());
        assert!(engine.item(&created.item_id).is_none());

        let mut spans: Vec<(Frame, String)> = restored
            .iter()
            .map(|id| {
                let i = engine.item(id).unwrap();
                (i.from, i.track_id.clone())
            })
            .collect();
        spans.sort();
        // Both inner tracks find room on their original host tracks.
        assert_eq!(
            spans,
            vec![(30, "t1".to_string()), (40, "t2".to_string()), (100, "t2".to_string())]
        );
        assert_eq!(engine.state().items.tracks().len(), 2);
        assert_eq!(engine.selection().selected_item_ids(), restored);
    }

    #[test]
    fn dissolve_inserts_track_when_host_is_busy() {
        let mut engine = engine();
        let created = engine.create_precomp(&ids(&["a", "b"]), "Pair").unwrap();
        // Occupy t1 where a used to be.
        let _ = engine
            .state
            .items
            .add_item(TimelineItem::text("x", "t1", 30, 60, "x"));
        engine
            .update_track("t2", &TrackPatch {
                locked: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert!(engine.dissolve_precomp(&created.item_id).is_err());
        engine
            .update_track("t2", &TrackPatch {
                locked: Some(false),
                ..Default::default()
            })
            .unwrap();

        let restored = engine.dissolve_precomp(&created.item_id).unwrap();
        let track_of = |from: Frame| {
            let id = restored
                .iter()
                .find(|id| engine.item(id).unwrap().from == from)
                .unwrap();
            engine.item(id).unwrap().track_id.clone()
        };
        // b takes the composition item's own track; a needs a new one
        // stacked between t1 and t2.
        assert_eq!(track_of(40), "t2");
        let inserted = track_of(30);
        let order: Vec<String> = engine
            .state()
            .items
            .tracks()
            .iter()
            .map(|t| t.id.clone())
            .collect();
        assert_eq!(order, vec!["t1".to_string(), inserted, "t2".to_string()]);
    }

    #[test]
    fn dissolve_keeps_shared_composition() {
        let mut engine = engine();
        let created = engine.create_precomp(&ids(&["a"]), "Shared").unwrap();
        engine
            .add_item(TimelineItem::composition("copy", "t1", 400, 60, &created.composition_id))
            .unwrap();
        engine.dissolve_precomp(&created.item_id).unwrap();
        assert!(engine.compositions().get(&created.composition_id).is_some());
        assert!(engine.delete_composition(&created.composition_id).is_err());

        engine.remove_items(&ids(&["copy"])).unwrap();
        engine.delete_composition(&created.composition_id).unwrap();
        assert!(engine.compositions().all().is_empty());
    }

    #[test]
    fn transitions_follow_their_clips() {
        let mut engine = engine();
        let _ = engine
            .state
            .items
            .add_item(TimelineItem::text("b2", "t2", 100, 60, "b2"));
        engine.remove_items(&ids(&["c"])).unwrap();
        engine
            .add_transition("b", "b2", NewTransition::default().with_duration(10))
            .unwrap();
        engine.take_pending_breakages();

        let created = engine.create_precomp(&ids(&["b", "b2"]), "Pair").unwrap();
        let comp = engine.compositions().get(&created.composition_id).unwrap();
        assert_eq!(comp.state.transitions.all().len(), 1);
        assert!(engine.state().transitions.is_empty());

        let restored = engine.dissolve_precomp(&created.item_id).unwrap();
        let transitions = engine.state().transitions.all();
        assert_eq!(transitions.len(), 1);
        assert!(restored.contains(&transitions[0].left_clip_id));
        assert!(engine.take_pending_breakages().is_empty());
    }

    #[test]
    fn enter_and_exit_map_playhead_and_history() {
        let mut engine = engine();
        let created = engine.create_precomp(&ids(&["b", "c"]), "Group").unwrap();
        engine.playback_mut().set_current_frame(70);
        let root_undo = engine.undo_count();

        engine.enter_composition(&created.composition_id).unwrap();
        assert_eq!(engine.playback().current_frame(), 30);
        assert_eq!(engine.navigator().depth(), 2);
        assert_eq!(engine.navigator().breadcrumbs()[1].name, "Group");
        assert!(!engine.can_undo());
        assert!(engine.enter_composition(&created.composition_id).is_err());

        engine.move_item("c", 80, None).unwrap();
        assert_eq!(engine.undo_count(), 1);
        engine.playback_mut().set_current_frame(5);

        assert!(engine.exit_composition().unwrap());
        assert_eq!(engine.playback().current_frame(), 45);
        assert_eq!(engine.undo_count(), root_undo + 1);
        assert_eq!(engine.undo_label(), Some("Edit composition"));
        let comp = engine.compositions().get(&created.composition_id).unwrap();
        assert_eq!(comp.state.items.get("c").unwrap().from, 80);
        assert_eq!(comp.duration_in_frames, 140);

        assert!(engine.undo());
        let comp = engine.compositions().get(&created.composition_id).unwrap();
        assert_eq!(comp.state.items.get("c").unwrap().from, 60);
        assert!(!engine.exit_composition().unwrap());
    }

    #[test]
    fn switching_compositions_pauses_playback() {
        let playing_at = |frame: Frame| {
            let mut state = PlaybackState {
                current_frame: frame,
                ..Default::default()
            };
            state.play();
            Box::new(state)
        };
        let mut engine = engine();
        let created = engine.create_precomp(&ids(&["b", "c"]), "Group").unwrap();

        engine.playback = playing_at(70);
        assert!(engine.playback().is_playing());
        engine.enter_composition(&created.composition_id).unwrap();
        assert!(!engine.playback().is_playing());
        assert_eq!(engine.playback().current_frame(), 30);

        engine.playback = playing_at(5);
        assert!(engine.playback().is_playing());
        assert!(engine.exit_composition().unwrap());
        assert!(!engine.playback().is_playing());
        assert_eq!(engine.playback().current_frame(), 45);
    }

    #[test]
    fn unchanged_visit_records_nothing() {
        let mut engine = engine();
        let created = engine.create_precomp(&ids(&["a"]), "Group").unwrap();
        let before = engine.undo_count();
        engine.enter_composition(&created.composition_id).unwrap();
        engine.reset_to_root().unwrap();
        assert!(engine.navigator().is_root());
        assert_eq!(engine.undo_count(), before);
    }
}
