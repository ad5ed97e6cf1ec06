//! Items & tracks store: primitive, non-cascading mutations.
//!
//! Nothing here touches transitions or keyframes. Every mutation returns an
//! [`Outcome`] whose events the engine folds into the other stores.
//!
//! Collections sit behind `Arc` so a history snapshot is a pointer copy;
//! the first write after a snapshot clones the affected collection.

use std::sync::Arc;

use splice_common::{
    normalize_duration, normalize_frame, round_duration, source_to_timeline, timeline_to_source,
    Frame, TransformPatch,
};
use tracing::debug;

use crate::error::{TimelineError, TimelineResult};
use crate::event::{Outcome, StoreEvent, TrimEdge};
use crate::generate_id;
use crate::types::{ItemKind, ItemMove, ItemPatch, TimelineItem, TimelineTrack};

/// Clamp policy for primitive trims.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TrimOptions {
    /// Allow the trimmed edge to cross into a neighbor's span. Ripple-style
    /// callers set this because they shift the neighbor afterwards.
    pub skip_adjacent_clamp: bool,
    /// Allow a start-edge extension past frame 0. Used by ripple trims,
    /// which restore `from` after the primitive trim.
    pub skip_origin_clamp: bool,
}

impl TrimOptions {
    /// Default policy: source, minimum-duration and adjacency clamps.
    pub const CLAMPED: Self = Self {
        skip_adjacent_clamp: false,
        skip_origin_clamp: false,
    };

    /// Policy for ripple edits.
    pub const RIPPLE: Self = Self {
        skip_adjacent_clamp: true,
        skip_origin_clamp: true,
    };
}

/// Ids of the two halves produced by a split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitResult {
    pub left_id: String,
    pub right_id: String,
}

/// Geometry and rate actually applied by a rate stretch.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RateStretch {
    pub from: Frame,
    pub duration_in_frames: Frame,
    pub speed: f64,
}

/// Bounds for derived playback speeds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpeedLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for SpeedLimits {
    fn default() -> Self {
        Self {
            min: 0.1,
            max: 10.0,
        }
    }
}

impl SpeedLimits {
    fn clamp(self, speed: f64) -> f64 {
        if !speed.is_finite() {
            return 1.0;
        }
        speed.clamp(self.min, self.max)
    }
}

/// Canonical list of timeline items and tracks.
#[derive(Clone, Debug, Default)]
pub struct ItemStore {
    pub(crate) items: Arc<Vec<TimelineItem>>,
    pub(crate) tracks: Arc<Vec<TimelineTrack>>,
}

impl PartialEq for ItemStore {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.items, &other.items) || self.items == other.items)
            && (Arc::ptr_eq(&self.tracks, &other.tracks) || self.tracks == other.tracks)
    }
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from plain collections, normalizing every item.
    pub fn from_parts(mut items: Vec<TimelineItem>, tracks: Vec<TimelineTrack>) -> Self {
        for item in &mut items {
            item.normalize();
        }
        Self {
            items: Arc::new(items),
            tracks: Arc::new(tracks),
        }
    }

    pub fn items(&self) -> &[TimelineItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&TimelineItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Items on a track, sorted by start frame.
    pub fn items_on_track(&self, track_id: &str) -> Vec<&TimelineItem> {
        let mut items: Vec<&TimelineItem> =
            self.items.iter().filter(|i| i.track_id == track_id).collect();
        items.sort_by_key(|i| (i.from, i.end()));
        items
    }

    /// Exclusive end of the last item on the timeline.
    pub fn content_end(&self) -> Frame {
        self.items.iter().map(TimelineItem::end).max().unwrap_or(0)
    }

    fn index_of(&self, id: &str) -> TimelineResult<usize> {
        self.items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| TimelineError::item(id))
    }

    fn require(&self, id: &str) -> TimelineResult<&TimelineItem> {
        self.get(id).ok_or_else(|| TimelineError::item(id))
    }

    pub(crate) fn items_mut(&mut self) -> &mut Vec<TimelineItem> {
        Arc::make_mut(&mut self.items)
    }

    /// End of the closest item on the same track that ends at or before
    /// `item.from`.
    fn previous_end(&self, item: &TimelineItem) -> Option<Frame> {
        self.items
            .iter()
            .filter(|o| o.track_id == item.track_id && o.id != item.id && o.end() <= item.from)
            .map(TimelineItem::end)
            .max()
    }

    /// Start of the closest item on the same track that starts at or after
    /// `item.end()`.
    fn next_start(&self, item: &TimelineItem) -> Option<Frame> {
        let end = item.end();
        self.items
            .iter()
            .filter(|o| o.track_id == item.track_id && o.id != item.id && o.from >= end)
            .map(|o| o.from)
            .min()
    }

    // ------------------------------------------------------------------
    // Add / update / remove
    // ------------------------------------------------------------------

    /// Insert an item. An empty id is replaced with a generated one.
    pub fn add_item(&mut self, mut item: TimelineItem) -> Outcome<String> {
        if item.id.is_empty() {
            item.id = generate_id();
        }
        item.normalize();
        let id = item.id.clone();
        self.items_mut().push(item);
        Outcome::new(
            id.clone(),
            StoreEvent::ItemsAdded {
                item_ids: vec![id],
            },
        )
    }

    pub fn add_items(&mut self, items: Vec<TimelineItem>) -> Outcome<Vec<String>> {
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            let out = self.add_item(item);
            ids.push(out.value);
        }
        if ids.is_empty() {
            return Outcome::unchanged(ids);
        }
        Outcome::new(
            ids.clone(),
            StoreEvent::ItemsAdded { item_ids: ids },
        )
    }

    /// Apply a partial update; frame fields are normalized on write.
    pub fn update_item(&mut self, id: &str, patch: &ItemPatch) -> TimelineResult<Outcome<()>> {
        let idx = self.index_of(id)?;
        if let Some(track_id) = &patch.track_id {
            if !self.tracks.is_empty() && self.get_track(track_id).is_none() {
                return Err(TimelineError::track(track_id));
            }
        }

        let before = self.items[idx].clone();
        let item = &mut self.items_mut()[idx];
        if let Some(track_id) = &patch.track_id {
            item.track_id = track_id.clone();
        }
        if let Some(from) = patch.from {
            item.from = from;
        }
        if let Some(duration) = patch.duration_in_frames {
            item.duration_in_frames = duration;
        }
        if let Some(label) = &patch.label {
            item.label = label.clone();
        }
        if let Some(source) = item.source_mut() {
            if let Some(start) = patch.source_start {
                source.source_start = start;
            }
            if let Some(end) = patch.source_end {
                source.source_end = end;
            }
            if let Some(speed) = patch.speed {
                source.speed = speed;
            }
        }
        match &mut item.kind {
            ItemKind::Audio { volume, .. } => {
                if let Some(v) = patch.volume {
                    *volume = v.max(0.0);
                }
            }
            ItemKind::Text { text, .. } => {
                if let Some(t) = &patch.text {
                    *text = t.clone();
                }
            }
            _ => {}
        }
        item.normalize();

        if *item == before {
            return Ok(Outcome::unchanged(()));
        }
        let mut out = Outcome::new(
            (),
            StoreEvent::ItemsUpdated {
                item_ids: vec![id.to_string()],
            },
        );
        let delta = item.duration_in_frames - before.duration_in_frames;
        if delta != 0 {
            out.events.push(StoreEvent::ItemTrimmed {
                item_id: id.to_string(),
                edge: TrimEdge::End,
                delta,
            });
        }
        Ok(out)
    }

    /// Remove items by id; unknown ids are ignored. Returns the removed items.
    pub fn remove_items(&mut self, ids: &[String]) -> Outcome<Vec<TimelineItem>> {
        if !self.items.iter().any(|i| ids.contains(&i.id)) {
            return Outcome::unchanged(Vec::new());
        }
        let (removed, kept): (Vec<TimelineItem>, Vec<TimelineItem>) =
            self.items.iter().cloned().partition(|i| ids.contains(&i.id));
        self.items = Arc::new(kept);
        let item_ids = removed.iter().map(|i| i.id.clone()).collect();
        debug!(count = removed.len(), "Items removed");
        Outcome::new(removed, StoreEvent::ItemsRemoved { item_ids })
    }

    // ------------------------------------------------------------------
    // Move
    // ------------------------------------------------------------------

    /// Reassign `from` (and optionally the track). No collision checks.
    pub fn move_item(
        &mut self,
        id: &str,
        from: Frame,
        track_id: Option<&str>,
    ) -> TimelineResult<Outcome<()>> {
        self.move_items(&[ItemMove {
            item_id: id.to_string(),
            from,
            track_id: track_id.map(str::to_string),
        }])
    }

    pub fn move_items(&mut self, moves: &[ItemMove]) -> TimelineResult<Outcome<()>> {
        for mv in moves {
            self.index_of(&mv.item_id)?;
            if let Some(track_id) = &mv.track_id {
                if self.get_track(track_id).is_none() {
                    return Err(TimelineError::track(track_id));
                }
            }
        }

        let mut moved = Vec::new();
        for mv in moves {
            let idx = self.index_of(&mv.item_id)?;
            let current = &self.items[idx];
            let from = normalize_frame(mv.from);
            let track_id = mv.track_id.as_deref().unwrap_or(&current.track_id);
            if current.from == from && current.track_id == track_id {
                continue;
            }
            let track_id = track_id.to_string();
            let item = &mut self.items_mut()[idx];
            item.from = from;
            item.track_id = track_id;
            moved.push(mv.item_id.clone());
        }

        if moved.is_empty() {
            return Ok(Outcome::unchanged(()));
        }
        Ok(Outcome::new((), StoreEvent::ItemsMoved { item_ids: moved }))
    }

    /// Shift items by `delta` frames, clamping at frame 0.
    pub fn shift_items(&mut self, ids: &[String], delta: Frame) -> Outcome<()> {
        if delta == 0 {
            return Outcome::unchanged(());
        }
        let mut moved = Vec::new();
        for item in self.items_mut().iter_mut() {
            if ids.contains(&item.id) {
                let from = normalize_frame(item.from + delta);
                if from != item.from {
                    item.from = from;
                    moved.push(item.id.clone());
                }
            }
        }
        if moved.is_empty() {
            return Outcome::unchanged(());
        }
        Outcome::new((), StoreEvent::ItemsMoved { item_ids: moved })
    }

    // ------------------------------------------------------------------
    // Trim
    // ------------------------------------------------------------------

    /// Legal range for a start-edge delta (positive = shrink).
    pub fn start_trim_bounds(
        &self,
        id: &str,
        timeline_fps: f64,
        opts: TrimOptions,
    ) -> TimelineResult<(Frame, Frame)> {
        let item = self.require(id)?;
        let upper = item.duration_in_frames - 1;
        let mut lower = Frame::MIN;
        if !opts.skip_origin_clamp {
            lower = lower.max(-item.from);
        }
        if let Some(source) = item.source() {
            let available = source_to_timeline(source.available_before(), source.rate(timeline_fps));
            lower = lower.max(-available);
        }
        if !opts.skip_adjacent_clamp {
            if let Some(prev_end) = self.previous_end(item) {
                lower = lower.max(prev_end - item.from);
            }
        }
        Ok((lower.min(0), upper.max(0)))
    }

    /// Legal range for an end-edge delta (positive = extend).
    pub fn end_trim_bounds(
        &self,
        id: &str,
        timeline_fps: f64,
        opts: TrimOptions,
    ) -> TimelineResult<(Frame, Frame)> {
        let item = self.require(id)?;
        let lower = -(item.duration_in_frames - 1);
        let mut upper = Frame::MAX;
        if let Some(source) = item.source() {
            let available = source_to_timeline(source.available_after(), source.rate(timeline_fps));
            upper = upper.min(available);
        }
        if !opts.skip_adjacent_clamp {
            if let Some(next_start) = self.next_start(item) {
                upper = upper.min(next_start - item.end());
            }
        }
        Ok((lower.min(0), upper.max(0)))
    }

    /// Move the start edge by `delta` frames (positive shrinks the item).
    /// Returns the clamped delta actually applied.
    pub fn trim_item_start(
        &mut self,
        id: &str,
        delta: Frame,
        timeline_fps: f64,
        opts: TrimOptions,
    ) -> TimelineResult<Outcome<Frame>> {
        let (lower, upper) = self.start_trim_bounds(id, timeline_fps, opts)?;
        let applied = delta.clamp(lower, upper);
        if applied == 0 {
            return Ok(Outcome::unchanged(0));
        }

        let idx = self.index_of(id)?;
        let item = &mut self.items_mut()[idx];
        item.from += applied;
        item.duration_in_frames -= applied;
        if let Some(source) = item.source_mut() {
            let shift = timeline_to_source(applied, source.rate(timeline_fps));
            source.source_start = (source.source_start + shift).clamp(0, source.source_end);
        }
        item.normalize();

        debug!(item_id = id, requested = delta, applied, "Trimmed item start");
        Ok(Outcome::new(
            applied,
            StoreEvent::ItemTrimmed {
                item_id: id.to_string(),
                edge: TrimEdge::Start,
                delta: applied,
            },
        ))
    }

    /// Move the end edge by `delta` frames (positive extends the item).
    /// Returns the clamped delta actually applied.
    pub fn trim_item_end(
        &mut self,
        id: &str,
        delta: Frame,
        timeline_fps: f64,
        opts: TrimOptions,
    ) -> TimelineResult<Outcome<Frame>> {
        let (lower, upper) = self.end_trim_bounds(id, timeline_fps, opts)?;
        let applied = delta.clamp(lower, upper);
        if applied == 0 {
            return Ok(Outcome::unchanged(0));
        }

        let idx = self.index_of(id)?;
        let item = &mut self.items_mut()[idx];
        item.duration_in_frames += applied;
        if let Some(source) = item.source_mut() {
            let shift = timeline_to_source(applied, source.rate(timeline_fps));
            source.source_end =
                (source.source_end + shift).clamp(source.source_start, source.source_duration);
        }
        item.normalize();

        debug!(item_id = id, requested = delta, applied, "Trimmed item end");
        Ok(Outcome::new(
            applied,
            StoreEvent::ItemTrimmed {
                item_id: id.to_string(),
                edge: TrimEdge::End,
                delta: applied,
            },
        ))
    }

    // ------------------------------------------------------------------
    // Split / join
    // ------------------------------------------------------------------

    /// Cut an item at an absolute timeline frame strictly inside its span.
    /// The left half keeps the original id.
    pub fn split_item(
        &mut self,
        id: &str,
        frame: Frame,
        timeline_fps: f64,
    ) -> TimelineResult<Outcome<SplitResult>> {
        let idx = self.index_of(id)?;
        let original = self.items[idx].clone();
        if frame <= original.from || frame >= original.end() {
            return Err(TimelineError::SplitOutOfBounds {
                item_id: id.to_string(),
                frame,
                from: original.from,
                end: original.end(),
            });
        }

        let offset = frame - original.from;
        let mut left = original.clone();
        let mut right = original.clone();
        right.id = generate_id();
        left.duration_in_frames = offset;
        right.from = frame;
        right.duration_in_frames = original.duration_in_frames - offset;

        if let Some(source) = original.source() {
            let origin = source
                .origin_id
                .clone()
                .unwrap_or_else(|| original.id.clone());
            let cut = (source.source_start
                + timeline_to_source(offset, source.rate(timeline_fps)))
            .clamp(source.source_start, source.source_end);
            if let Some(l) = left.source_mut() {
                l.source_end = cut;
                l.origin_id = Some(origin.clone());
            }
            if let Some(r) = right.source_mut() {
                r.source_start = cut;
                r.origin_id = Some(origin);
            }
        }

        let result = SplitResult {
            left_id: left.id.clone(),
            right_id: right.id.clone(),
        };
        let items = self.items_mut();
        items[idx] = left;
        items.insert(idx + 1, right);

        debug!(item_id = id, frame, right_id = %result.right_id, "Split item");
        Ok(Outcome::new(
            result.clone(),
            StoreEvent::ItemSplit {
                left_id: result.left_id,
                right_id: result.right_id,
                offset,
            },
        ))
    }

    /// Merge contiguous items of one kind on one track into the earliest.
    pub fn join_items(&mut self, ids: &[String]) -> TimelineResult<Outcome<String>> {
        if ids.len() < 2 {
            return Err(TimelineError::JoinMismatch {
                reason: "at least two items are required".into(),
            });
        }
        let mut parts = ids
            .iter()
            .map(|id| self.require(id).cloned())
            .collect::<TimelineResult<Vec<_>>>()?;
        parts.sort_by_key(|i| i.from);

        let first = &parts[0];
        for pair in parts.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.track_id != first.track_id {
                return Err(TimelineError::JoinMismatch {
                    reason: "items are on different tracks".into(),
                });
            }
            if !next.same_kind(first) {
                return Err(TimelineError::JoinMismatch {
                    reason: format!("cannot join {} with {}", first.kind.name(), next.kind.name()),
                });
            }
            if next.media_id() != first.media_id() {
                return Err(TimelineError::JoinMismatch {
                    reason: "items reference different media".into(),
                });
            }
            if next.from != prev.end() {
                return Err(TimelineError::JoinMismatch {
                    reason: format!("{} and {} are not contiguous", prev.id, next.id),
                });
            }
        }

        let survivor_id = first.id.clone();
        let last = parts[parts.len() - 1].clone();
        let absorbed: Vec<String> = parts[1..].iter().map(|i| i.id.clone()).collect();

        let idx = self.index_of(&survivor_id)?;
        let survivor = &mut self.items_mut()[idx];
        survivor.duration_in_frames = last.end() - survivor.from;
        if let (Some(dst), Some(src)) = (survivor.source_mut(), last.source()) {
            dst.source_end = src.source_end;
        }
        survivor.normalize();
        self.items_mut().retain(|i| !absorbed.contains(&i.id));

        debug!(survivor = %survivor_id, absorbed = absorbed.len(), "Joined items");
        Ok(Outcome::new(
            survivor_id.clone(),
            StoreEvent::ItemsJoined {
                survivor_id,
                absorbed_ids: absorbed,
            },
        ))
    }

    // ------------------------------------------------------------------
    // Rate stretch / slip
    // ------------------------------------------------------------------

    /// Change an item's playback rate together with its placement.
    ///
    /// Items with explicit (split-derived) source bounds keep those bounds and
    /// re-derive `speed` from them; `new_speed` is only a hint. Open-ended
    /// items take `new_speed` and recompute `source_end`.
    pub fn rate_stretch_item(
        &mut self,
        id: &str,
        new_from: Frame,
        new_duration: Frame,
        new_speed: f64,
        timeline_fps: f64,
        limits: SpeedLimits,
    ) -> TimelineResult<Outcome<RateStretch>> {
        let idx = self.index_of(id)?;
        let before = self.items[idx].clone();
        let from = normalize_frame(new_from);
        let mut duration = normalize_duration(new_duration);
        let mut speed = limits.clamp(new_speed);

        let item = &mut self.items_mut()[idx];
        match item.source_mut() {
            Some(source) => {
                // Source frames per timeline frame at unity speed.
                let fps_ratio = source.source_fps / timeline_fps.max(f64::EPSILON);
                if source.has_explicit_bounds() {
                    let span = source.span().max(1) as f64;
                    let derived = span / (duration as f64 * fps_ratio);
                    speed = limits.clamp(derived);
                    if (speed - derived).abs() > f64::EPSILON {
                        duration = round_duration(span / (speed * fps_ratio));
                    }
                } else {
                    let needed = (duration as f64 * speed * fps_ratio).round() as Frame;
                    let end = (source.source_start + needed).min(source.source_duration);
                    if end - source.source_start < needed {
                        duration = normalize_duration(source_to_timeline(
                            end - source.source_start,
                            speed * fps_ratio,
                        ));
                    }
                    source.source_end = end.max(source.source_start);
                }
                source.speed = speed;
            }
            None => speed = 1.0,
        }
        item.from = from;
        item.duration_in_frames = duration;
        item.normalize();

        let applied = RateStretch {
            from: item.from,
            duration_in_frames: item.duration_in_frames,
            speed,
        };
        if *item == before {
            return Ok(Outcome::unchanged(applied));
        }
        debug!(item_id = id, duration, speed, "Rate-stretched item");
        Ok(Outcome::new(
            applied,
            StoreEvent::ItemRetimed {
                item_id: id.to_string(),
                old_duration: before.duration_in_frames,
                new_duration: duration,
            },
        ))
    }

    /// Shift both source bounds by `delta` timeline frames' worth of source
    /// without moving or resizing the item. Returns the applied shift in
    /// source frames; non-media items are a no-op.
    pub fn slip_item(
        &mut self,
        id: &str,
        delta: Frame,
        timeline_fps: f64,
    ) -> TimelineResult<Outcome<Frame>> {
        let idx = self.index_of(id)?;
        let Some(source) = self.items[idx].source() else {
            return Ok(Outcome::unchanged(0));
        };
        let shift = timeline_to_source(delta, source.rate(timeline_fps))
            .clamp(-source.available_before(), source.available_after());
        if shift == 0 {
            return Ok(Outcome::unchanged(0));
        }

        if let Some(source) = self.items_mut()[idx].source_mut() {
            source.source_start += shift;
            source.source_end += shift;
            source.normalize();
        }
        debug!(item_id = id, shift, "Slipped item");
        Ok(Outcome::new(
            shift,
            StoreEvent::ItemsUpdated {
                item_ids: vec![id.to_string()],
            },
        ))
    }

    /// Patch the visual transform of an item.
    pub fn update_transform(&mut self, id: &str, patch: &TransformPatch) -> TimelineResult<bool> {
        let idx = self.index_of(id)?;
        let Some(current) = self.items[idx].transform() else {
            return Err(TimelineError::invalid(format!("item {id} has no visual transform")));
        };
        let mut next = current.clone();
        next.apply(patch);
        if next == *current {
            return Ok(false);
        }
        if let Some(t) = self.items_mut()[idx].transform_mut() {
            *t = next;
        }
        Ok(true)
    }
}
