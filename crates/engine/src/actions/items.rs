//! Item verbs: add, remove, move, duplicate, update.

use std::collections::BTreeMap;

use splice_common::{source_to_timeline, Frame, TransformPatch};
use splice_timeline::{
    generate_id, ItemMove, ItemPatch, MediaSource, TimelineError, TimelineItem, TimelineResult,
};
use tracing::debug;

use super::magnetic::Gap;
use crate::collaborators::MediaLibrary;
use crate::engine::TimelineEngine;
use crate::error::EngineResult;

impl TimelineEngine {
    /// A target track must exist and be unlocked.
    pub(crate) fn ensure_target_track(&self, track_id: &str) -> TimelineResult<()> {
        if self.state.items.get_track(track_id).is_none() {
            return Err(TimelineError::TrackNotFound {
                track_id: track_id.to_string(),
            });
        }
        self.ensure_track_unlocked(track_id)
    }

    pub fn add_item(&mut self, item: TimelineItem) -> EngineResult<String> {
        self.ensure_target_track(&item.track_id)?;
        self.execute("Add item", |e| {
            let out = e.state.items.add_item(item);
            Ok(e.apply(out))
        })
    }

    pub fn add_items(&mut self, items: Vec<TimelineItem>) -> EngineResult<Vec<String>> {
        for item in &items {
            self.ensure_target_track(&item.track_id)?;
        }
        self.execute("Add items", |e| {
            let out = e.state.items.add_items(items);
            Ok(e.apply(out))
        })
    }

    /// Place a video or audio clip for `media_id` spanning the whole media.
    pub fn add_media_item(
        &mut self,
        library: &impl MediaLibrary,
        media_id: &str,
        track_id: &str,
        from: Frame,
        audio: bool,
    ) -> EngineResult<String> {
        let metadata = library
            .metadata(media_id)
            .ok_or_else(|| TimelineError::invalid(format!("unknown media {media_id}")))?;
        let source = MediaSource::new(media_id, metadata.duration_in_frames, metadata.fps);
        let duration = source_to_timeline(metadata.duration_in_frames, source.rate(self.fps()));
        let item = if audio {
            TimelineItem::audio(generate_id(), track_id, from, duration, source)
        } else {
            TimelineItem::video(generate_id(), track_id, from, duration, source)
        };
        self.add_item(item)
    }

    /// Delete items and everything hanging off them. In magnetic mode each
    /// vacated span is closed. Unknown ids are ignored.
    pub fn remove_items(&mut self, ids: &[String]) -> EngineResult<usize> {
        let existing: Vec<String> = ids
            .iter()
            .filter(|id| self.state.items.contains(id))
            .cloned()
            .collect();
        if existing.is_empty() {
            return Ok(0);
        }
        self.ensure_items_editable(&existing)?;

        let count = self.execute("Delete items", |e| {
            let out = e.state.items.remove_items(&existing);
            let removed = e.apply(out);
            if e.magnetic {
                let gaps = removed
                    .iter()
                    .map(|i| Gap::new(i.track_id.clone(), i.from, i.duration_in_frames))
                    .collect();
                e.close_gaps(gaps);
            }
            Ok(removed.len())
        })?;

        let remaining: Vec<String> = self
            .selection
            .selected_item_ids()
            .into_iter()
            .filter(|id| !existing.contains(id))
            .collect();
        self.select(&remaining);
        Ok(count)
    }

    /// Reposition items. Cross-track moves close the vacated span in magnetic
    /// mode; same-track moves never do.
    pub fn move_items(&mut self, moves: &[ItemMove]) -> EngineResult<()> {
        let mut vacated = Vec::new();
        for mv in moves {
            let item = self.ensure_item_editable(&mv.item_id)?;
            if let Some(track_id) = &mv.track_id {
                if *track_id != item.track_id {
                    vacated.push(Gap::new(item.track_id.clone(), item.from, item.duration_in_frames));
                }
                self.ensure_target_track(track_id)?;
            }
        }

        self.execute("Move items", |e| {
            let out = e.state.items.move_items(moves)?;
            e.apply(out);
            if e.magnetic && !vacated.is_empty() {
                e.close_gaps(vacated);
            }
            Ok(())
        })
    }

    pub fn move_item(&mut self, id: &str, from: Frame, track_id: Option<&str>) -> EngineResult<()> {
        self.move_items(&[ItemMove {
            item_id: id.to_string(),
            from,
            track_id: track_id.map(str::to_string),
        }])
    }

    /// Copy items (with effects and keyframes) to the first free position
    /// after the group on their own tracks. Selects the copies.
    pub fn duplicate_items(&mut self, ids: &[String]) -> EngineResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_items_editable(ids)?;
        let originals: Vec<TimelineItem> = ids
            .iter()
            .filter_map(|id| self.state.items.get(id).cloned())
            .collect();
        let group_start = originals.iter().map(|i| i.from).min().unwrap_or(0);
        let group_end = originals.iter().map(TimelineItem::end).max().unwrap_or(0);

        let mut offset = group_end - group_start;
        loop {
            let pushed = originals
                .iter()
                .flat_map(|orig| {
                    let from = orig.from + offset;
                    let end = from + orig.duration_in_frames;
                    self.state
                        .items
                        .items_on_track(&orig.track_id)
                        .into_iter()
                        .filter(move |o| o.from < end && from < o.end())
                        .map(move |o| o.end() - orig.from)
                })
                .max();
            match pushed {
                Some(next) if next > offset => offset = next,
                _ => break,
            }
        }

        let mut pairs = Vec::with_capacity(originals.len());
        let copies: Vec<TimelineItem> = originals
            .iter()
            .map(|orig| {
                let mut copy = orig.clone();
                copy.id = generate_id();
                copy.from += offset;
                let mut effect_ids = BTreeMap::new();
                for effect in &mut copy.effects {
                    let fresh = generate_id();
                    effect_ids.insert(std::mem::replace(&mut effect.id, fresh.clone()), fresh);
                }
                pairs.push((orig.id.clone(), copy.id.clone(), effect_ids));
                copy
            })
            .collect();

        let new_ids = self.execute("Duplicate items", |e| {
            let out = e.state.items.add_items(copies);
            let new_ids = e.apply(out);
            for (source, target, effect_ids) in &pairs {
                e.state.keyframes.duplicate(source, target, effect_ids);
            }
            Ok(new_ids)
        })?;
        debug!(count = new_ids.len(), offset, "Duplicated items");
        self.select(&new_ids);
        Ok(new_ids)
    }

    pub fn update_item(&mut self, id: &str, patch: &ItemPatch) -> EngineResult<()> {
        self.ensure_item_editable(id)?;
        if let Some(track_id) = &patch.track_id {
            self.ensure_target_track(track_id)?;
        }
        self.execute("Update item", |e| {
            let out = e.state.items.update_item(id, patch)?;
            e.apply(out);
            Ok(())
        })
    }

    /// Returns false when the patch changed nothing.
    pub fn update_transform(&mut self, id: &str, patch: &TransformPatch) -> EngineResult<bool> {
        self.ensure_item_editable(id)?;
        self.execute("Transform item", |e| Ok(e.state.items.update_transform(id, patch)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MediaMetadata;
    use splice_common::{EffectCategory, ItemEffect};
    use splice_timeline::{AnimatableProperty, Keyframe, TimelineTrack, TrackPatch};

    fn engine() -> TimelineEngine {
        let mut engine = TimelineEngine::default();
        engine.state.items.add_track(TimelineTrack::new("t1", "V1", 0.0));
        engine.state.items.add_track(TimelineTrack::new("t2", "V2", 1.0));
        for (id, from) in [("a", 0), ("b", 30), ("c", 60)] {
            let _ = engine
                .state
                .items
                .add_item(TimelineItem::text(id, "t1", from, 30, id));
        }
        engine
    }

    struct Library;

    impl MediaLibrary for Library {
        fn metadata(&self, media_id: &str) -> Option<MediaMetadata> {
            (media_id == "clip.mp4").then_some(MediaMetadata {
                fps: 60.0,
                width: 1920,
                height: 1080,
                duration_in_frames: 600,
            })
        }
    }

    #[test]
    fn add_item_requires_unlocked_track() {
        let mut engine = engine();
        let err = engine
            .add_item(TimelineItem::text("x", "missing", 0, 10, "x"))
            .unwrap_err();
        assert!(err.is_rejection());

        engine
            .update_track("t2", &TrackPatch {
                locked: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert!(engine.add_item(TimelineItem::text("x", "t2", 0, 10, "x")).is_err());
        assert!(engine.item("x").is_none());
    }

    #[test]
    fn media_item_duration_follows_metadata() {
        let mut engine = engine();
        let id = engine.add_media_item(&Library, "clip.mp4", "t2", 0, false).unwrap();
        // 600 frames at 60fps on a 30fps timeline.
        assert_eq!(engine.item(&id).unwrap().duration_in_frames, 300);
        assert!(engine.add_media_item(&Library, "nope", "t2", 0, false).is_err());
    }

    #[test]
    fn remove_without_magnetic_leaves_gap() {
        let mut engine = engine();
        assert_eq!(engine.remove_items(&["b".to_string(), "zz".to_string()]).unwrap(), 1);
        assert_eq!(engine.item("c").unwrap().from, 60);
        assert_eq!(engine.remove_items(&["zz".to_string()]).unwrap(), 0);
    }

    #[test]
    fn magnetic_remove_closes_gap() {
        let mut engine = engine();
        engine.set_magnetic_mode(true);
        engine.remove_items(&["b".to_string()]).unwrap();
        assert_eq!(engine.item("c").unwrap().from, 30);
        assert_eq!(engine.undo_count(), 1);
        engine.undo();
        assert_eq!(engine.item("c").unwrap().from, 60);
        assert!(engine.item("b").is_some());
    }

    #[test]
    fn same_track_move_never_closes_gap() {
        let mut engine = engine();
        engine.set_magnetic_mode(true);
        engine.move_item("b", 200, None).unwrap();
        assert_eq!(engine.item("c").unwrap().from, 60);
    }

    #[test]
    fn cross_track_move_closes_vacated_span() {
        let mut engine = engine();
        engine.set_magnetic_mode(true);
        engine.move_item("b", 30, Some("t2")).unwrap();
        assert_eq!(engine.item("b").unwrap().track_id, "t2");
        assert_eq!(engine.item("c").unwrap().from, 30);
    }

    #[test]
    fn duplicate_finds_free_space_and_copies_keyframes() {
        let mut engine = engine();
        let _ = engine
            .state
            .keyframes
            .add_keyframe("a", &AnimatableProperty::Opacity, Keyframe::new(5, 0.5));
        let copies = engine.duplicate_items(&["a".to_string()]).unwrap();
        assert_eq!(copies.len(), 1);
        // b and c occupy 30..90, so the copy lands at 90.
        assert_eq!(engine.item(&copies[0]).unwrap().from, 90);
        assert!(engine.state().keyframes.get(&copies[0]).is_some());
        assert_eq!(engine.selection().selected_item_ids(), copies);
    }

    #[test]
    fn shortening_through_update_drops_keyframes_past_the_end() {
        let mut engine = engine();
        let _ = engine
            .state
            .items
            .add_item(TimelineItem::text("long", "t2", 0, 60, "long"));
        for frame in [10, 50] {
            let _ = engine.state.keyframes.add_keyframe(
                "long",
                &AnimatableProperty::Opacity,
                Keyframe::new(frame, 0.5),
            );
        }

        engine
            .update_item(
                "long",
                &ItemPatch {
                    duration_in_frames: Some(30),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(engine.item("long").unwrap().duration_in_frames, 30);
        let frames: Vec<Frame> = engine
            .state()
            .keyframes
            .property("long", &AnimatableProperty::Opacity)
            .map(|p| p.keyframes.iter().map(|k| k.frame).collect())
            .unwrap_or_default();
        assert!(frames.iter().all(|f| (0..30).contains(f)), "{frames:?}");
    }

    #[test]
    fn duplicate_retargets_effect_keyframes() {
        let mut engine = engine();
        let mut blurred = TimelineItem::text("fx", "t2", 0, 30, "fx");
        blurred.effects.push(ItemEffect::new("fx1", "gaussianBlur", EffectCategory::Blur));
        let _ = engine.state.items.add_item(blurred);
        let radius = |effect_id: &str| AnimatableProperty::EffectParam {
            effect_id: effect_id.to_string(),
            param: "radius".into(),
        };
        let _ = engine
            .state
            .keyframes
            .add_keyframe("fx", &radius("fx1"), Keyframe::new(0, 4.0));

        let copies = engine.duplicate_items(&["fx".to_string()]).unwrap();
        let copy = engine.item(&copies[0]).unwrap();
        assert_eq!(copy.effects.len(), 1);
        let copied_effect = copy.effects[0].id.clone();
        assert_ne!(copied_effect, "fx1");

        let entry = engine.state().keyframes.get(&copies[0]).unwrap();
        assert!(entry.property(&radius(&copied_effect)).is_some());
        assert!(entry.property(&radius("fx1")).is_none());
        // The original still animates its own effect.
        assert!(engine
            .state()
            .keyframes
            .property("fx", &radius("fx1"))
            .is_some());
    }

    #[test]
    fn update_item_rejects_locked_target() {
        let mut engine = engine();
        engine
            .update_track("t2", &TrackPatch {
                locked: Some(true),
                ..Default::default()
            })
            .unwrap();
        let patch = ItemPatch {
            track_id: Some("t2".into()),
            ..Default::default()
        };
        assert!(engine.update_item("a", &patch).is_err());
        let patch = ItemPatch {
            label: Some("Title".into()),
            ..Default::default()
        };
        engine.update_item("a", &patch).unwrap();
        assert_eq!(engine.item("a").unwrap().label, "Title");
    }

    #[test]
    fn transform_noop_records_nothing() {
        let mut engine = engine();
        let patch = TransformPatch {
            opacity: Some(0.5),
            ..Default::default()
        };
        assert!(engine.update_transform("a", &patch).unwrap());
        assert!(!engine.update_transform("a", &patch).unwrap());
        assert_eq!(engine.undo_count(), 1);
    }
}
