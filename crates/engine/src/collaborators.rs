//! Interfaces to the systems around the engine.
//!
//! The engine never decodes media, persists assets or owns playback and
//! selection. It talks to those through the traits here; [`PlaybackState`]
//! and [`SelectionState`] are the in-memory defaults.
//!
//! [`PlaybackState`]: crate::playback::PlaybackState
//! [`SelectionState`]: crate::selection::SelectionState

use std::future::Future;

use splice_common::Frame;

use crate::error::CollaboratorError;

/// Playhead owner. The engine pauses it before swapping timeline contexts
/// and moves it when entering or leaving a sub-composition.
pub trait PlaybackClock {
    fn current_frame(&self) -> Frame;
    fn set_current_frame(&mut self, frame: Frame);
    fn is_playing(&self) -> bool;
    fn pause(&mut self);
}

/// Selection owner. Verbs that create items select them here.
pub trait SelectionSink {
    fn select_items(&mut self, item_ids: &[String]);
    fn clear(&mut self);
    fn selected_item_ids(&self) -> Vec<String>;
}

/// Metadata for an imported media file.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaMetadata {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// Length in the media's own frames.
    pub duration_in_frames: Frame,
}

/// Resolves media ids to metadata.
pub trait MediaLibrary {
    fn metadata(&self, media_id: &str) -> Option<MediaMetadata>;
}

/// One decoded video frame, RGBA8.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedFrame {
    pub media_id: String,
    pub source_frame: Frame,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Decodes single frames out of source media.
pub trait FrameDecoder {
    fn decode_frame(
        &self,
        media_id: &str,
        source_frame: Frame,
    ) -> impl Future<Output = Result<DecodedFrame, CollaboratorError>> + Send;
}

/// Handle to a persisted still image.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredAsset {
    pub media_id: String,
}

/// Persists decoded frames as new media assets.
pub trait AssetStore {
    fn store_still(
        &self,
        frame: &DecodedFrame,
    ) -> impl Future<Output = Result<StoredAsset, CollaboratorError>> + Send;
}
