//! Error types for the editing engine.

use splice_project::ProjectError;
use splice_timeline::TimelineError;
use thiserror::Error;

/// Failure reported by an external collaborator (decoder, asset storage).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("Frame decode failed for {media_id}: {reason}")]
    Decode { media_id: String, reason: String },

    #[error("Asset storage failed: {reason}")]
    Storage { reason: String },
}

/// Errors returned by engine verbs.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A verb's preconditions were not met; nothing was changed.
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    /// An async prerequisite failed before any timeline mutation.
    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] CollaboratorError),
}

impl EngineError {
    /// Whether this error is a validation rejection from the timeline layer.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Timeline(_))
    }
}

/// Convenience Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
