//! Timeline data model: items and tracks.
//!
//! Items are a tagged union over their kind. Only video and audio items carry
//! a [`MediaSource`]; the compiler, not runtime field probing, decides which
//! edits touch source bounds.

use serde::{Deserialize, Serialize};
use splice_common::{
    normalize_duration, normalize_frame, source_rate, Frame, ItemEffect, Transform,
};

/// Source-bound state of a video or audio item.
///
/// Frame offsets are in the source's native rate (`source_fps`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSource {
    pub media_id: String,
    /// Lineage key shared by every item produced from one split chain.
    /// `Some` means the source bounds are explicit and must be held fixed
    /// by rate stretching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,
    pub source_start: Frame,
    pub source_end: Frame,
    pub source_duration: Frame,
    pub source_fps: f64,
    pub speed: f64,
}

impl MediaSource {
    /// A source covering the whole asset at unity speed.
    pub fn new(media_id: impl Into<String>, source_duration: Frame, source_fps: f64) -> Self {
        Self {
            media_id: media_id.into(),
            origin_id: None,
            source_start: 0,
            source_end: source_duration.max(0),
            source_duration: source_duration.max(0),
            source_fps,
            speed: 1.0,
        }
    }

    pub fn with_bounds(mut self, source_start: Frame, source_end: Frame) -> Self {
        self.source_start = source_start;
        self.source_end = source_end;
        self.normalize();
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self.normalize();
        self
    }

    /// Source frames consumed per timeline frame.
    pub fn rate(&self, timeline_fps: f64) -> f64 {
        source_rate(self.speed, self.source_fps, timeline_fps)
    }

    /// Source frames between the in and out points.
    pub fn span(&self) -> Frame {
        self.source_end - self.source_start
    }

    /// Unused source frames before the in point.
    pub fn available_before(&self) -> Frame {
        self.source_start
    }

    /// Unused source frames after the out point.
    pub fn available_after(&self) -> Frame {
        (self.source_duration - self.source_end).max(0)
    }

    pub fn has_explicit_bounds(&self) -> bool {
        self.origin_id.is_some()
    }

    /// Enforce `0 <= source_start <= source_end <= source_duration` and a
    /// positive finite speed.
    pub fn normalize(&mut self) {
        self.source_duration = self.source_duration.max(0);
        self.source_start = self.source_start.clamp(0, self.source_duration);
        self.source_end = self.source_end.clamp(self.source_start, self.source_duration);
        if !(self.speed.is_finite() && self.speed > 0.0) {
            self.speed = 1.0;
        }
        if !(self.source_fps.is_finite() && self.source_fps > 0.0) {
            self.source_fps = 30.0;
        }
    }
}

/// Shape primitive drawn by a shape item.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Triangle,
    Star,
}

fn unit_volume() -> f64 {
    1.0
}

/// Kind-specific payload of a timeline item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ItemKind {
    Video {
        source: MediaSource,
        #[serde(default)]
        transform: Transform,
    },
    Audio {
        source: MediaSource,
        #[serde(default = "unit_volume")]
        volume: f64,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        media_id: String,
        #[serde(default)]
        transform: Transform,
    },
    Text {
        text: String,
        color: String,
        #[serde(default)]
        transform: Transform,
    },
    Shape {
        shape: ShapeKind,
        fill: String,
        #[serde(default)]
        transform: Transform,
    },
    #[serde(rename_all = "camelCase")]
    Composition {
        composition_id: String,
        #[serde(default)]
        transform: Transform,
    },
    Adjustment,
}

impl ItemKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Video { .. } => "video",
            Self::Audio { .. } => "audio",
            Self::Image { .. } => "image",
            Self::Text { .. } => "text",
            Self::Shape { .. } => "shape",
            Self::Composition { .. } => "composition",
            Self::Adjustment => "adjustment",
        }
    }
}

/// A single clip or element placed on a track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub id: String,
    pub track_id: String,
    /// Start frame, timeline-relative.
    pub from: Frame,
    pub duration_in_frames: Frame,
    pub label: String,
    /// Effects in render order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<ItemEffect>,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl TimelineItem {
    pub fn new(
        id: impl Into<String>,
        track_id: impl Into<String>,
        from: Frame,
        duration_in_frames: Frame,
        kind: ItemKind,
    ) -> Self {
        let mut item = Self {
            id: id.into(),
            track_id: track_id.into(),
            from,
            duration_in_frames,
            label: String::new(),
            effects: Vec::new(),
            kind,
        };
        item.label = item.kind.name().to_string();
        item.normalize();
        item
    }

    pub fn video(
        id: impl Into<String>,
        track_id: impl Into<String>,
        from: Frame,
        duration_in_frames: Frame,
        source: MediaSource,
    ) -> Self {
        Self::new(
            id,
            track_id,
            from,
            duration_in_frames,
            ItemKind::Video {
                source,
                transform: Transform::default(),
            },
        )
    }

    pub fn audio(
        id: impl Into<String>,
        track_id: impl Into<String>,
        from: Frame,
        duration_in_frames: Frame,
        source: MediaSource,
    ) -> Self {
        Self::new(
            id,
            track_id,
            from,
            duration_in_frames,
            ItemKind::Audio {
                source,
                volume: 1.0,
            },
        )
    }

    pub fn text(
        id: impl Into<String>,
        track_id: impl Into<String>,
        from: Frame,
        duration_in_frames: Frame,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            track_id,
            from,
            duration_in_frames,
            ItemKind::Text {
                text: text.into(),
                color: "#ffffff".to_string(),
                transform: Transform::default(),
            },
        )
    }

    pub fn image(
        id: impl Into<String>,
        track_id: impl Into<String>,
        from: Frame,
        duration_in_frames: Frame,
        media_id: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            track_id,
            from,
            duration_in_frames,
            ItemKind::Image {
                media_id: media_id.into(),
                transform: Transform::default(),
            },
        )
    }

    pub fn composition(
        id: impl Into<String>,
        track_id: impl Into<String>,
        from: Frame,
        duration_in_frames: Frame,
        composition_id: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            track_id,
            from,
            duration_in_frames,
            ItemKind::Composition {
                composition_id: composition_id.into(),
                transform: Transform::default(),
            },
        )
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Exclusive end frame.
    pub fn end(&self) -> Frame {
        self.from + self.duration_in_frames
    }

    pub fn contains_frame(&self, frame: Frame) -> bool {
        frame >= self.from && frame < self.end()
    }

    pub fn source(&self) -> Option<&MediaSource> {
        match &self.kind {
            ItemKind::Video { source, .. } | ItemKind::Audio { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn source_mut(&mut self) -> Option<&mut MediaSource> {
        match &mut self.kind {
            ItemKind::Video { source, .. } | ItemKind::Audio { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Media id for video, audio and image items.
    pub fn media_id(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Video { source, .. } | ItemKind::Audio { source, .. } => {
                Some(&source.media_id)
            }
            ItemKind::Image { media_id, .. } => Some(media_id),
            _ => None,
        }
    }

    pub fn transform(&self) -> Option<&Transform> {
        match &self.kind {
            ItemKind::Video { transform, .. }
            | ItemKind::Image { transform, .. }
            | ItemKind::Text { transform, .. }
            | ItemKind::Shape { transform, .. }
            | ItemKind::Composition { transform, .. } => Some(transform),
            ItemKind::Audio { .. } | ItemKind::Adjustment => None,
        }
    }

    pub fn transform_mut(&mut self) -> Option<&mut Transform> {
        match &mut self.kind {
            ItemKind::Video { transform, .. }
            | ItemKind::Image { transform, .. }
            | ItemKind::Text { transform, .. }
            | ItemKind::Shape { transform, .. }
            | ItemKind::Composition { transform, .. } => Some(transform),
            ItemKind::Audio { .. } | ItemKind::Adjustment => None,
        }
    }

    pub fn composition_id(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Composition { composition_id, .. } => Some(composition_id),
            _ => None,
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self.kind, ItemKind::Audio { .. })
    }

    /// Whether both items are the same variant.
    pub fn same_kind(&self, other: &TimelineItem) -> bool {
        std::mem::discriminant(&self.kind) == std::mem::discriminant(&other.kind)
    }

    /// Round/clamp every frame-valued field.
    pub fn normalize(&mut self) {
        self.from = normalize_frame(self.from);
        self.duration_in_frames = normalize_duration(self.duration_in_frames);
        if let Some(source) = self.source_mut() {
            source.normalize();
        }
    }
}

/// Partial item update. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemPatch {
    pub track_id: Option<String>,
    pub from: Option<Frame>,
    pub duration_in_frames: Option<Frame>,
    pub label: Option<String>,
    pub source_start: Option<Frame>,
    pub source_end: Option<Frame>,
    pub speed: Option<f64>,
    pub volume: Option<f64>,
    pub text: Option<String>,
}

impl ItemPatch {
    /// Whether the patch changes timeline geometry (position, length, track).
    pub fn touches_geometry(&self) -> bool {
        self.track_id.is_some() || self.from.is_some() || self.duration_in_frames.is_some()
    }
}

/// A target position for one item in a move.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemMove {
    pub item_id: String,
    pub from: Frame,
    /// `None` keeps the item on its current track.
    pub track_id: Option<String>,
}

/// A track: independent of its items; removal does not cascade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineTrack {
    pub id: String,
    pub name: String,
    /// Stacking order; fractional values allow insertion between tracks.
    pub order: f64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub solo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_track_id: Option<String>,
    #[serde(default)]
    pub is_group: bool,
}

fn default_true() -> bool {
    true
}

impl TimelineTrack {
    pub fn new(id: impl Into<String>, name: impl Into<String>, order: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order,
            locked: false,
            visible: true,
            muted: false,
            solo: false,
            parent_track_id: None,
            is_group: false,
        }
    }
}

/// Partial track update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackPatch {
    pub name: Option<String>,
    pub order: Option<f64>,
    pub locked: Option<bool>,
    pub visible: Option<bool>,
    pub muted: Option<bool>,
    pub solo: Option<bool>,
    pub parent_track_id: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_is_normalized() {
        let item = TimelineItem::text("t1", "track-1", -5, 0, "Title");
        assert_eq!(item.from, 0);
        assert_eq!(item.duration_in_frames, 1);
        assert_eq!(item.label, "text");
    }

    #[test]
    fn media_source_normalization() {
        let src = MediaSource::new("m1", 100, 30.0).with_bounds(80, 200);
        assert_eq!(src.source_start, 80);
        assert_eq!(src.source_end, 100);

        let src = MediaSource::new("m1", 100, 30.0).with_bounds(50, 10);
        assert_eq!(src.source_end, 50);

        let src = MediaSource::new("m1", 100, 30.0).with_speed(-2.0);
        assert_eq!(src.speed, 1.0);
    }

    #[test]
    fn accessors_follow_variant() {
        let video = TimelineItem::video("v", "t", 0, 10, MediaSource::new("m", 100, 30.0));
        assert!(video.source().is_some());
        assert!(video.transform().is_some());

        let audio = TimelineItem::audio("a", "t", 0, 10, MediaSource::new("m", 100, 30.0));
        assert!(audio.is_audio());
        assert!(audio.transform().is_none());

        let text = TimelineItem::text("x", "t", 0, 10, "hi");
        assert!(text.source().is_none());
        assert!(!text.same_kind(&video));
        assert!(video.same_kind(&video.clone()));
    }

    #[test]
    fn serialization_uses_type_tag() {
        let item = TimelineItem::composition("c", "t", 10, 20, "comp-1");
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["type"], "composition");
        assert_eq!(json["compositionId"], "comp-1");
        assert_eq!(json["durationInFrames"], 20);

        let restored: TimelineItem = serde_json::from_value(json).expect("deserialize");
        assert_eq!(restored, item);
    }

    #[test]
    fn span_helpers() {
        let item = TimelineItem::text("x", "t", 10, 5, "hi");
        assert_eq!(item.end(), 15);
        assert!(item.contains_frame(10));
        assert!(item.contains_frame(14));
        assert!(!item.contains_frame(15));
    }
}
