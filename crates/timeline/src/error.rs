//! Error types for timeline store mutations.
//!
//! Every variant is a validation rejection: the operation that produced it
//! has not touched any store.

use splice_common::Frame;
use thiserror::Error;

/// Errors returned by primitive store mutations and edit verbs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: String },

    #[error("Track not found: {track_id}")]
    TrackNotFound { track_id: String },

    #[error("Track is locked: {track_id}")]
    TrackLocked { track_id: String },

    #[error("Split frame {frame} is not strictly inside item {item_id} ({from}..{end})")]
    SplitOutOfBounds {
        item_id: String,
        frame: Frame,
        from: Frame,
        end: Frame,
    },

    #[error("Cannot join items: {reason}")]
    JoinMismatch { reason: String },

    #[error("Item {item_id} has no media source")]
    NotMediaItem { item_id: String },

    #[error("Transition not found: {transition_id}")]
    TransitionNotFound { transition_id: String },

    #[error("Transition already exists between {left_clip_id} and {right_clip_id}")]
    TransitionExists {
        left_clip_id: String,
        right_clip_id: String,
    },

    #[error("Transition duration {requested} exceeds clip capacity {max}")]
    TransitionTooLong { requested: Frame, max: Frame },

    #[error("Clips {left_clip_id} and {right_clip_id} are not adjacent on one track")]
    ClipsNotAdjacent {
        left_clip_id: String,
        right_clip_id: String,
    },

    #[error("Keyframe not found: {keyframe_id}")]
    KeyframeNotFound { keyframe_id: String },

    #[error("Effect not found: {effect_id}")]
    EffectNotFound { effect_id: String },

    #[error("Visual effect {effect_type} cannot be applied to audio item {item_id}")]
    IncompatibleEffect { item_id: String, effect_type: String },

    #[error("Composition not found: {composition_id}")]
    CompositionNotFound { composition_id: String },

    #[error("Composition nesting too deep (max {max_depth}): {composition_id}")]
    NestingTooDeep {
        max_depth: usize,
        composition_id: String,
    },

    #[error("Composition {composition_id} is already open")]
    CompositionCycle { composition_id: String },

    #[error("Invalid operation: {reason}")]
    InvalidOperation { reason: String },
}

impl TimelineError {
    pub(crate) fn item(id: &str) -> Self {
        Self::ItemNotFound {
            item_id: id.to_string(),
        }
    }

    pub(crate) fn track(id: &str) -> Self {
        Self::TrackNotFound {
            track_id: id.to_string(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            reason: reason.into(),
        }
    }
}

/// Convenience Result type for timeline operations.
pub type TimelineResult<T> = Result<T, TimelineError>;
