//! Project record: the persisted shape of a timeline document.
//!
//! Holds everything the engine hydrates on load: the root timeline
//! collections, the sub-composition registry, markers and view state.

use serde::{Deserialize, Serialize};
use splice_common::{Frame, Rational, Resolution};
use splice_timeline::{
    ItemKeyframes, SubComposition, TimelineItem, TimelineTrack, Transition,
};

/// Current project format version.
pub const CURRENT_VERSION: u32 = 1;

/// A saved project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    /// Format version.
    pub version: u32,
    /// Human-readable project name.
    pub name: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-modified timestamp.
    pub updated_at: String,
    pub settings: ProjectSettings,
    #[serde(default)]
    pub tracks: Vec<TimelineTrack>,
    #[serde(default)]
    pub items: Vec<TimelineItem>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub keyframes: Vec<ItemKeyframes>,
    #[serde(default)]
    pub compositions: Vec<SubComposition>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_point: Option<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_point: Option<Frame>,
    #[serde(default)]
    pub current_frame: Frame,
    #[serde(default = "default_zoom")]
    pub zoom_level: f64,
    #[serde(default)]
    pub scroll_position: f64,
}

fn default_zoom() -> f64 {
    1.0
}

impl ProjectRecord {
    /// Create an empty project with the given name and settings.
    pub fn new(name: impl Into<String>, settings: ProjectSettings) -> Self {
        let now = current_iso_timestamp();
        Self {
            version: CURRENT_VERSION,
            name: name.into(),
            created_at: now.clone(),
            updated_at: now,
            settings,
            tracks: Vec::new(),
            items: Vec::new(),
            transitions: Vec::new(),
            keyframes: Vec::new(),
            compositions: Vec::new(),
            markers: Vec::new(),
            in_point: None,
            out_point: None,
            current_frame: 0,
            zoom_level: default_zoom(),
            scroll_position: 0.0,
        }
    }
}

/// Timeline settings (canvas size, frame rate, sample rate).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub sample_rate: u32,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: 30.0,
            sample_rate: 48000,
        }
    }
}

impl ProjectSettings {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn fps(&self) -> Rational {
        Rational::from_f64(self.frame_rate)
    }
}

/// A user-placed timeline marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    pub frame: Frame,
    pub label: String,
    /// CSS hex color.
    pub color: String,
    /// Zero for point markers.
    #[serde(default)]
    pub duration_in_frames: Frame,
}

/// Generate a current ISO 8601 timestamp string.
fn current_iso_timestamp() -> String {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let (year, month, day, hour, min, sec) = epoch_to_datetime(dur.as_secs());
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{min:02}:{sec:02}Z")
}

/// Convert Unix epoch seconds to (year, month, day, hour, minute, second).
fn epoch_to_datetime(epoch: u64) -> (u64, u64, u64, u64, u64, u64) {
    let sec = epoch % 60;
    let min = (epoch / 60) % 60;
    let hour = (epoch / 3600) % 24;
    let mut days = epoch / 86400;

    let mut year = 1970u64;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }

    let february = if is_leap_year(year) { 29 } else { 28 };
    let days_in_months: [u64; 12] = [31, february, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let mut month = 12u64;
    for (i, &dm) in days_in_months.iter().enumerate() {
        if days < dm {
            month = i as u64 + 1;
            break;
        }
        days -= dm;
    }

    (year, month, days + 1, hour, min, sec)
}

fn is_leap_year(y: u64) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

/// Refresh `updated_at`.
pub fn touch_modified(project: &mut ProjectRecord) {
    project.updated_at = current_iso_timestamp();
}
