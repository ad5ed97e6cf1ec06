//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::types::{Frame, Rational, Resolution};

/// Top-level editing engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Undo depth; the oldest entries are dropped beyond this.
    pub max_history_entries: usize,
    /// Timeline nesting cap, counting the root timeline as level 1.
    pub max_nesting_depth: usize,
    /// Initial magnetic (gap-closing) mode.
    pub magnetic_mode: bool,
    /// Rate-stretch speed bounds.
    pub min_speed: f64,
    pub max_speed: f64,
    /// Length of a freeze-frame still inserted at the playhead.
    pub default_freeze_frame_duration: Frame,
    /// Root timeline frame rate.
    pub timeline_fps: Rational,
    /// Root timeline canvas size.
    pub resolution: Resolution,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_history_entries: 100,
            max_nesting_depth: 2,
            magnetic_mode: false,
            min_speed: 0.1,
            max_speed: 10.0,
            default_freeze_frame_duration: 60,
            timeline_fps: Rational::FPS_30,
            resolution: Resolution::HD,
        }
    }
}

impl EngineConfig {
    /// Clamp a requested playback rate into the configured bounds.
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        if !speed.is_finite() {
            return 1.0;
        }
        speed.clamp(self.min_speed, self.max_speed)
    }
}
