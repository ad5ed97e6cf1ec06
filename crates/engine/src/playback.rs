//! In-memory playhead: play/pause, scrubbing, frame position.

use serde::{Deserialize, Serialize};
use splice_common::Frame;

use crate::collaborators::PlaybackClock;

/// Current playback mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackMode {
    #[default]
    Stopped,
    Playing,
    Paused,
    /// User is dragging the playhead.
    Scrubbing,
}

/// Default [`PlaybackClock`] used when the host does not supply one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub mode: PlaybackMode,
    pub current_frame: Frame,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play(&mut self) {
        self.mode = PlaybackMode::Playing;
        tracing::debug!(frame = self.current_frame, "Playback started");
    }

    /// Stop playback and rewind to frame 0.
    pub fn stop(&mut self) {
        self.mode = PlaybackMode::Stopped;
        self.current_frame = 0;
        tracing::debug!("Playback stopped");
    }

    pub fn toggle_play_pause(&mut self) {
        match self.mode {
            PlaybackMode::Playing => PlaybackClock::pause(self),
            PlaybackMode::Paused | PlaybackMode::Stopped | PlaybackMode::Scrubbing => self.play(),
        }
    }

    /// Seek to a frame. A stopped playhead becomes paused.
    pub fn seek(&mut self, frame: Frame) {
        self.current_frame = frame.max(0);
        if self.mode == PlaybackMode::Stopped {
            self.mode = PlaybackMode::Paused;
        }
        tracing::debug!(frame = self.current_frame, "Seeked");
    }

    pub fn start_scrub(&mut self, frame: Frame) {
        self.mode = PlaybackMode::Scrubbing;
        self.current_frame = frame.max(0);
    }

    pub fn end_scrub(&mut self) {
        if self.mode == PlaybackMode::Scrubbing {
            self.mode = PlaybackMode::Paused;
        }
    }
}

impl PlaybackClock for PlaybackState {
    fn current_frame(&self) -> Frame {
        self.current_frame
    }

    fn set_current_frame(&mut self, frame: Frame) {
        self.current_frame = frame.max(0);
    }

    fn is_playing(&self) -> bool {
        matches!(self.mode, PlaybackMode::Playing | PlaybackMode::Scrubbing)
    }

    fn pause(&mut self) {
        if self.mode != PlaybackMode::Stopped {
            self.mode = PlaybackMode::Paused;
        }
        tracing::debug!(frame = self.current_frame, "Playback paused");
    }
}
