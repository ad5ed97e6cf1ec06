//! Markers and view state.
//!
//! Persisted with the project but outside undo history.

use splice_common::Frame;
use splice_project::Marker;
use splice_timeline::generate_id;

const MIN_ZOOM: f64 = 0.01;
const MAX_ZOOM: f64 = 100.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    markers: Vec<Marker>,
    in_point: Option<Frame>,
    out_point: Option<Frame>,
    zoom_level: f64,
    scroll_position: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            markers: Vec::new(),
            in_point: None,
            out_point: None,
            zoom_level: 1.0,
            scroll_position: 0.0,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        markers: Vec<Marker>,
        in_point: Option<Frame>,
        out_point: Option<Frame>,
        zoom_level: f64,
        scroll_position: f64,
    ) -> Self {
        let mut view = Self {
            markers,
            in_point: None,
            out_point: None,
            zoom_level: 1.0,
            scroll_position: 0.0,
        };
        view.markers.sort_by_key(|m| m.frame);
        view.set_zoom_level(zoom_level);
        view.set_scroll_position(scroll_position);
        if let Some(f) = in_point {
            view.set_in_point(f);
        }
        if let Some(f) = out_point {
            view.set_out_point(f);
        }
        view
    }

    /// Markers sorted by frame.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn add_marker(&mut self, frame: Frame, label: impl Into<String>, color: impl Into<String>) -> String {
        let marker = Marker {
            id: generate_id(),
            frame: frame.max(0),
            label: label.into(),
            color: color.into(),
            duration_in_frames: 0,
        };
        let id = marker.id.clone();
        let idx = self.markers.partition_point(|m| m.frame <= marker.frame);
        self.markers.insert(idx, marker);
        tracing::debug!(marker_id = %id, frame, "Marker added");
        id
    }

    /// Move a marker; returns false for unknown ids.
    pub fn move_marker(&mut self, id: &str, frame: Frame) -> bool {
        let Some(marker) = self.markers.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        marker.frame = frame.max(0);
        self.markers.sort_by_key(|m| m.frame);
        true
    }

    pub fn remove_marker(&mut self, id: &str) -> Option<Marker> {
        let idx = self.markers.iter().position(|m| m.id == id)?;
        Some(self.markers.remove(idx))
    }

    pub fn in_point(&self) -> Option<Frame> {
        self.in_point
    }

    pub fn out_point(&self) -> Option<Frame> {
        self.out_point
    }

    /// Set the in-point; an out-point before it is cleared.
    pub fn set_in_point(&mut self, frame: Frame) {
        let frame = frame.max(0);
        self.in_point = Some(frame);
        if self.out_point.is_some_and(|out| out <= frame) {
            self.out_point = None;
        }
    }

    /// Set the out-point; an in-point after it is cleared.
    pub fn set_out_point(&mut self, frame: Frame) {
        let frame = frame.max(0);
        self.out_point = Some(frame);
        if self.in_point.is_some_and(|i| i >= frame) {
            self.in_point = None;
        }
    }

    pub fn clear_in_out(&mut self) {
        self.in_point = None;
        self.out_point = None;
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }

    pub fn set_zoom_level(&mut self, zoom: f64) {
        self.zoom_level = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        };
    }

    pub fn scroll_position(&self) -> f64 {
        self.scroll_position
    }

    pub fn set_scroll_position(&mut self, position: f64) {
        self.scroll_position = if position.is_finite() { position.max(0.0) } else { 0.0 };
    }
}
