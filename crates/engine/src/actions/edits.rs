//! Split, join, slip, slide and rate stretch.

use splice_common::Frame;
use splice_timeline::{RateStretch, SplitResult, TimelineItem};
use tracing::debug;

use super::trim::NEIGHBOR_TRIM;
use crate::engine::TimelineEngine;
use crate::error::EngineResult;

impl TimelineEngine {
    /// Cut an item at an absolute frame strictly inside it. Both halves end
    /// up selected.
    pub fn split_item(&mut self, id: &str, frame: Frame) -> EngineResult<SplitResult> {
        self.ensure_item_editable(id)?;
        let fps = self.fps();
        let result = self.execute("Split item", |e| {
            let out = e.state.items.split_item(id, frame, fps)?;
            Ok(e.apply(out))
        })?;
        self.select(&[result.left_id.clone(), result.right_id.clone()]);
        Ok(result)
    }

    /// Split at the playhead: the selected items if any are selected,
    /// otherwise every item under the playhead on an unlocked track.
    pub fn split_at_playhead(&mut self) -> EngineResult<Vec<SplitResult>> {
        let frame = self.playback.current_frame();
        let selected = self.selection.selected_item_ids();
        let targets: Vec<String> = self
            .state
            .items
            .items()
            .iter()
            .filter(|i| selected.is_empty() || selected.contains(&i.id))
            .filter(|i| frame > i.from && frame < i.end())
            .filter(|i| !self.state.items.is_track_locked(&i.track_id))
            .map(|i| i.id.clone())
            .collect();
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let fps = self.fps();
        let results = self.execute("Split at playhead", |e| {
            let mut results = Vec::with_capacity(targets.len());
            for id in &targets {
                let out = e.state.items.split_item(id, frame, fps)?;
                results.push(e.apply(out));
            }
            Ok(results)
        })?;
        let halves: Vec<String> = results
            .iter()
            .flat_map(|r| [r.left_id.clone(), r.right_id.clone()])
            .collect();
        self.select(&halves);
        Ok(results)
    }

    /// Merge contiguous same-kind items on one track into the earliest.
    pub fn join_items(&mut self, ids: &[String]) -> EngineResult<String> {
        self.ensure_items_editable(ids)?;
        let survivor = self.execute("Join items", |e| {
            let out = e.state.items.join_items(ids)?;
            Ok(e.apply(out))
        })?;
        self.select(std::slice::from_ref(&survivor));
        Ok(survivor)
    }

    /// Shift which source frames play without moving the item. Returns the
    /// applied shift in source frames.
    pub fn slip_item(&mut self, id: &str, delta: Frame) -> EngineResult<Frame> {
        self.ensure_item_editable(id)?;
        let fps = self.fps();
        self.execute("Slip item", |e| {
            let out = e.state.items.slip_item(id, delta, fps)?;
            Ok(e.apply(out))
        })
    }

    /// Move an item by `delta` while the clips touching its edges absorb
    /// the change. Without a neighbor on a side, the move is bounded by the
    /// nearest item (or frame 0) on that side. Returns the applied delta.
    pub fn slide_item(&mut self, id: &str, delta: Frame) -> EngineResult<Frame> {
        let item = self.ensure_item_editable(id)?.clone();
        if delta == 0 {
            return Ok(0);
        }
        let fps = self.fps();
        let siblings: Vec<TimelineItem> = self
            .state
            .items
            .items_on_track(&item.track_id)
            .into_iter()
            .filter(|o| o.id != item.id)
            .cloned()
            .collect();
        let left = siblings.iter().find(|o| o.end() == item.from);
        let right = siblings.iter().find(|o| o.from == item.end());

        let applied = if delta > 0 {
            let mut limit = delta;
            match right {
                Some(r) => limit = limit.min(r.duration_in_frames - 1),
                None => {
                    if let Some(next) = siblings.iter().filter(|o| o.from >= item.end()).map(|o| o.from).min() {
                        limit = limit.min(next - item.end());
                    }
                }
            }
            if let Some(l) = left {
                let (_, hi) = self.state.items.end_trim_bounds(&l.id, fps, NEIGHBOR_TRIM)?;
                limit = limit.min(hi);
            }
            limit.max(0)
        } else {
            let mut limit = delta;
            match left {
                Some(l) => limit = limit.max(-(l.duration_in_frames - 1)),
                None => {
                    let prev_end = siblings
                        .iter()
                        .filter(|o| o.end() <= item.from)
                        .map(TimelineItem::end)
                        .max()
                        .unwrap_or(0);
                    limit = limit.max(prev_end - item.from);
                }
            }
            if let Some(r) = right {
                let (lo, _) = self.state.items.start_trim_bounds(&r.id, fps, NEIGHBOR_TRIM)?;
                limit = limit.max(lo);
            }
            limit.min(0)
        };
        if applied == 0 {
            return Ok(0);
        }

        let left_id = left.map(|l| l.id.clone());
        let right_id = right.map(|r| r.id.clone());
        self.execute("Slide item", |e| {
            if applied > 0 {
                if let Some(r) = &right_id {
                    let out = e.state.items.trim_item_start(r, applied, fps, NEIGHBOR_TRIM)?;
                    e.apply(out);
                }
                let out = e.state.items.move_item(id, item.from + applied, None)?;
                e.apply(out);
                if let Some(l) = &left_id {
                    let out = e.state.items.trim_item_end(l, applied, fps, NEIGHBOR_TRIM)?;
                    e.apply(out);
                }
            } else {
                if let Some(l) = &left_id {
                    let out = e.state.items.trim_item_end(l, applied, fps, NEIGHBOR_TRIM)?;
                    e.apply(out);
                }
                let out = e.state.items.move_item(id, item.from + applied, None)?;
                e.apply(out);
                if let Some(r) = &right_id {
                    let out = e.state.items.trim_item_start(r, applied, fps, NEIGHBOR_TRIM)?;
                    e.apply(out);
                }
            }
            debug!(item_id = id, requested = delta, applied, "Slid item");
            Ok(applied)
        })
    }

    /// Retime an item; keyframes rescale with the duration.
    pub fn rate_stretch_item(
        &mut self,
        id: &str,
        new_from: Frame,
        new_duration: Frame,
        new_speed: f64,
    ) -> EngineResult<RateStretch> {
        self.ensure_item_editable(id)?;
        let fps = self.fps();
        let limits = self.speed_limits();
        self.execute("Rate stretch", |e| {
            let out = e
                .state
                .items
                .rate_stretch_item(id, new_from, new_duration, new_speed, fps, limits)?;
            Ok(e.apply(out))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_timeline::{AnimatableProperty, Keyframe, MediaSource, TimelineTrack};

    fn engine() -> TimelineEngine {
        let mut engine = TimelineEngine::default();
        engine.state.items.add_track(TimelineTrack::new("t1", "V1", 0.0));
        let src = MediaSource::new("m", 1000, 30.0);
        for (id, from, start) in [("a", 0, 100), ("b", 60, 300), ("c", 120, 500)] {
            let _ = engine.state.items.add_item(TimelineItem::video(
                id,
                "t1",
                from,
                60,
                src.clone().with_bounds(start, start + 60),
            ));
        }
        engine
    }

    fn span(engine: &TimelineEngine, id: &str) -> (Frame, Frame) {
        let item = engine.item(id).unwrap();
        (item.from, item.duration_in_frames)
    }

    #[test]
    fn split_then_join_restores_item() {
        let mut engine = engine();
        let original = engine.item("b").unwrap().clone();
        let split = engine.split_item("b", 80).unwrap();
        assert_eq!(
            engine.selection().selected_item_ids(),
            vec![split.left_id.clone(), split.right_id.clone()]
        );

        let survivor = engine
            .join_items(&[split.left_id.clone(), split.right_id.clone()])
            .unwrap();
        let joined = engine.item(&survivor).unwrap();
        assert_eq!(joined.from, original.from);
        assert_eq!(joined.duration_in_frames, original.duration_in_frames);
        assert_eq!(
            joined.source().unwrap().source_start,
            original.source().unwrap().source_start
        );
        assert_eq!(
            joined.source().unwrap().source_end,
            original.source().unwrap().source_end
        );
    }

    #[test]
    fn split_outside_item_is_rejected() {
        let mut engine = engine();
        assert!(engine.split_item("b", 60).is_err());
        assert!(!engine.can_undo());
    }

    #[test]
    fn split_at_playhead_uses_selection() {
        let mut engine = engine();
        engine.playback_mut().set_current_frame(90);
        let results = engine.split_at_playhead().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(span(&engine, "b"), (60, 30));

        engine.selection_mut().select_items(&["a".to_string()]);
        engine.playback_mut().set_current_frame(30);
        assert_eq!(engine.split_at_playhead().unwrap().len(), 1);
        engine.selection_mut().select_items(&["c".to_string()]);
        assert!(engine.split_at_playhead().unwrap().is_empty());
    }

    #[test]
    fn slip_keeps_position() {
        let mut engine = engine();
        assert_eq!(engine.slip_item("b", -20).unwrap(), -20);
        assert_eq!(span(&engine, "b"), (60, 60));
        assert_eq!(engine.item("b").unwrap().source().unwrap().source_start, 280);
        assert_eq!(engine.slip_item("b", 0).unwrap(), 0);
        assert_eq!(engine.undo_count(), 1);
    }

    #[test]
    fn slide_right_neighbors_absorb() {
        let mut engine = engine();
        assert_eq!(engine.slide_item("b", 10).unwrap(), 10);
        assert_eq!(span(&engine, "a"), (0, 70));
        assert_eq!(span(&engine, "b"), (70, 60));
        assert_eq!(span(&engine, "c"), (130, 50));
        assert_eq!(engine.item("c").unwrap().source().unwrap().source_start, 510);
    }

    #[test]
    fn slide_left_clamps_to_neighbor_duration() {
        let mut engine = engine();
        assert_eq!(engine.slide_item("b", -100).unwrap(), -59);
        assert_eq!(span(&engine, "a"), (0, 1));
        assert_eq!(span(&engine, "b"), (1, 60));
        assert_eq!(span(&engine, "c"), (61, 119));
    }

    #[test]
    fn slide_without_neighbor_stops_at_gap() {
        let mut engine = engine();
        // c has no right neighbor and nothing after it.
        assert_eq!(engine.slide_item("c", 25).unwrap(), 25);
        assert_eq!(span(&engine, "b"), (60, 85));
        assert_eq!(span(&engine, "c"), (145, 60));
        assert_eq!(engine.slide_item("b", 0).unwrap(), 0);
    }

    #[test]
    fn rate_stretch_rescales_keyframes() {
        let mut engine = engine();
        let _ = engine
            .state
            .keyframes
            .add_keyframe("c", &AnimatableProperty::Opacity, Keyframe::new(59, 0.0));
        let applied = engine.rate_stretch_item("c", 120, 120, 0.5).unwrap();
        assert_eq!(applied.duration_in_frames, 120);
        let kfs = engine
            .state()
            .keyframes
            .property("c", &AnimatableProperty::Opacity)
            .unwrap();
        assert_eq!(kfs.keyframes[0].frame, 118);
    }
}
