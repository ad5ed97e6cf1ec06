//! Trim verbs: plain, ripple and rolling.

use splice_common::Frame;
use splice_timeline::{TimelineError, TrimEdge, TrimOptions};
use tracing::debug;

use super::magnetic::Gap;
use crate::engine::TimelineEngine;
use crate::error::EngineResult;

/// Neighbor-aware edits compute their own bounds, so the primitive only
/// keeps source and origin clamps.
pub(crate) const NEIGHBOR_TRIM: TrimOptions = TrimOptions {
    skip_adjacent_clamp: true,
    skip_origin_clamp: false,
};

impl TimelineEngine {
    /// Move an item's start edge by `delta` (positive shrinks). Returns the
    /// clamped amount applied. In magnetic mode an inward trim pulls the
    /// rest of the track left.
    pub fn trim_item_start(&mut self, id: &str, delta: Frame) -> EngineResult<Frame> {
        let item = self.ensure_item_editable(id)?.clone();
        let fps = self.fps();
        self.execute("Trim item start", |e| {
            let out = e.state.items.trim_item_start(id, delta, fps, TrimOptions::CLAMPED)?;
            let applied = e.apply(out);
            if e.magnetic && applied > 0 {
                e.close_gap(&Gap::new(item.track_id.clone(), item.from, applied));
            }
            Ok(applied)
        })
    }

    /// Move an item's end edge by `delta` (positive extends).
    pub fn trim_item_end(&mut self, id: &str, delta: Frame) -> EngineResult<Frame> {
        let item = self.ensure_item_editable(id)?.clone();
        let fps = self.fps();
        self.execute("Trim item end", |e| {
            let out = e.state.items.trim_item_end(id, delta, fps, TrimOptions::CLAMPED)?;
            let applied = e.apply(out);
            if e.magnetic && applied < 0 {
                e.close_gap(&Gap::new(item.track_id.clone(), item.end() + applied, -applied));
            }
            Ok(applied)
        })
    }

    /// Trim one edge and shift every later item on the track by the change
    /// in duration. The item's own `from` never moves.
    pub fn ripple_trim_item(&mut self, id: &str, edge: TrimEdge, delta: Frame) -> EngineResult<Frame> {
        let item = self.ensure_item_editable(id)?.clone();
        if delta == 0 {
            return Ok(0);
        }
        let fps = self.fps();
        self.execute("Ripple trim", |e| {
            let applied = match edge {
                TrimEdge::Start => {
                    let out = e.state.items.trim_item_start(id, delta, fps, TrimOptions::RIPPLE)?;
                    let applied = e.apply(out);
                    let out = e.state.items.move_item(id, item.from, None)?;
                    e.apply(out);
                    applied
                }
                TrimEdge::End => {
                    let out = e.state.items.trim_item_end(id, delta, fps, TrimOptions::RIPPLE)?;
                    e.apply(out)
                }
            };

            let new_duration = e.require_item(id)?.duration_in_frames;
            let shift = new_duration - item.duration_in_frames;
            if shift != 0 {
                let later: Vec<String> = e
                    .state
                    .items
                    .items_on_track(&item.track_id)
                    .into_iter()
                    .filter(|o| o.id != id && o.from > item.from)
                    .map(|o| o.id.clone())
                    .collect();
                let out = e.state.items.shift_items(&later, shift);
                e.apply(out);
            }
            debug!(item_id = id, ?edge, applied, shift, "Ripple trimmed");
            Ok(applied)
        })
    }

    /// Move the cut between two adjacent clips by `delta` frames without
    /// changing their combined duration. Returns the applied delta.
    pub fn rolling_trim_items(&mut self, left_id: &str, right_id: &str, delta: Frame) -> EngineResult<Frame> {
        let left = self.ensure_item_editable(left_id)?.clone();
        let right = self.ensure_item_editable(right_id)?.clone();
        let adjacent = left.track_id == right.track_id
            && right.from > left.from
            && right.from <= left.end();
        if !adjacent {
            return Err(TimelineError::ClipsNotAdjacent {
                left_clip_id: left_id.to_string(),
                right_clip_id: right_id.to_string(),
            }
            .into());
        }
        if delta == 0 {
            return Ok(0);
        }

        let fps = self.fps();
        let (left_lo, left_hi) = self.state.items.end_trim_bounds(left_id, fps, NEIGHBOR_TRIM)?;
        let (right_lo, right_hi) = self.state.items.start_trim_bounds(right_id, fps, NEIGHBOR_TRIM)?;
        let applied = if delta > 0 {
            delta.min(left_hi).min(right_hi)
        } else {
            delta.max(left_lo).max(right_lo)
        };
        if applied == 0 {
            return Ok(0);
        }

        self.execute("Rolling edit", |e| {
            // The side that loses frames goes first.
            if applied > 0 {
                let out = e.state.items.trim_item_start(right_id, applied, fps, NEIGHBOR_TRIM)?;
                e.apply(out);
                let out = e.state.items.trim_item_end(left_id, applied, fps, NEIGHBOR_TRIM)?;
                e.apply(out);
            } else {
                let out = e.state.items.trim_item_end(left_id, applied, fps, NEIGHBOR_TRIM)?;
                e.apply(out);
                let out = e.state.items.trim_item_start(right_id, applied, fps, NEIGHBOR_TRIM)?;
                e.apply(out);
            }
            debug!(left_id, right_id, requested = delta, applied, "Rolling edit");
            Ok(applied)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_timeline::{MediaSource, TimelineItem, TimelineTrack};

    fn engine() -> TimelineEngine {
        let mut engine = TimelineEngine::default();
        engine.state.items.add_track(TimelineTrack::new("t1", "V1", 0.0));
        let src = MediaSource::new("m", 1000, 30.0);
        let _ = engine
            .state
            .items
            .add_item(TimelineItem::video("l", "t1", 100, 40, src.clone().with_bounds(0, 40)));
        let _ = engine.state.items.add_item(TimelineItem::video(
            "r",
            "t1",
            140,
            80,
            src.clone().with_bounds(50, 130),
        ));
        let _ = engine
            .state
            .items
            .add_item(TimelineItem::video("z", "t1", 300, 30, src.with_bounds(0, 30)));
        engine
    }

    fn span(engine: &TimelineEngine, id: &str) -> (Frame, Frame) {
        let item = engine.item(id).unwrap();
        (item.from, item.duration_in_frames)
    }

    #[test]
    fn plain_trim_clamps_at_neighbor() {
        let mut engine = engine();
        // l cannot grow into r.
        assert_eq!(engine.trim_item_end("l", 20).unwrap(), 0);
        assert!(!engine.can_undo());
        assert_eq!(engine.trim_item_end("l", -10).unwrap(), -10);
        assert_eq!(span(&engine, "l"), (100, 30));
    }

    #[test]
    fn magnetic_inward_trims_close_gap() {
        let mut engine = engine();
        engine.set_magnetic_mode(true);
        engine.trim_item_end("l", -10).unwrap();
        assert_eq!(span(&engine, "r"), (130, 80));

        engine.trim_item_start("r", 20).unwrap();
        assert_eq!(span(&engine, "r"), (130, 60));
        // The 80-frame gap between r and z is kept.
        assert_eq!(span(&engine, "z"), (270, 30));
    }

    #[test]
    fn ripple_end_shifts_later_items() {
        let mut engine = engine();
        let applied = engine.ripple_trim_item("l", TrimEdge::End, 15).unwrap();
        assert_eq!(applied, 15);
        assert_eq!(span(&engine, "l"), (100, 55));
        assert_eq!(span(&engine, "r"), (155, 80));
        assert_eq!(span(&engine, "z"), (315, 30));
    }

    #[test]
    fn ripple_start_keeps_from() {
        let mut engine = engine();
        let applied = engine.ripple_trim_item("r", TrimEdge::Start, 30).unwrap();
        assert_eq!(applied, 30);
        assert_eq!(span(&engine, "r"), (140, 50));
        assert_eq!(engine.item("r").unwrap().source().unwrap().source_start, 80);
        assert_eq!(span(&engine, "z"), (270, 30));

        // Extending past available source is clamped to 80 frames.
        let applied = engine.ripple_trim_item("r", TrimEdge::Start, -500).unwrap();
        assert_eq!(applied, -80);
        assert_eq!(span(&engine, "r"), (140, 130));
    }

    #[test]
    fn rolling_edit_conserves_duration() {
        let mut engine = engine();
        let applied = engine.rolling_trim_items("l", "r", -30).unwrap();
        assert_eq!(applied, -30);
        assert_eq!(span(&engine, "l"), (100, 10));
        assert_eq!(span(&engine, "r"), (110, 110));
        assert_eq!(engine.item("r").unwrap().source().unwrap().source_start, 20);

        // Clamped by l's minimum duration.
        let applied = engine.rolling_trim_items("l", "r", -60).unwrap();
        assert_eq!(applied, -9);
        let (_, l) = span(&engine, "l");
        let (_, r) = span(&engine, "r");
        assert_eq!(l + r, 120);
    }

    #[test]
    fn rolling_edit_requires_adjacent_clips() {
        let mut engine = engine();
        let err = engine.rolling_trim_items("l", "z", 5).unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(engine.rolling_trim_items("l", "r", 0).unwrap(), 0);
    }
}
